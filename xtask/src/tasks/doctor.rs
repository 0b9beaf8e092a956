use anyhow::Result;

use super::targets::TARGETS;
use crate::util::repo;
use crate::util::report::Report;

pub fn run() -> Result<Report> {
    let root = repo::repo_root()?;
    let mut report = Report::new("doctor");

    for tool in ["cargo", "rustup"] {
        match which::which(tool) {
            Ok(path) => report.pass(tool, Some(path.display().to_string())),
            Err(_) => report.fail(tool, format!("missing `{tool}` in PATH")),
        }
    }
    if !report.ok {
        return Ok(report);
    }

    let output = repo::capture(
        std::process::Command::new("rustup")
            .current_dir(&root)
            .args(["target", "list", "--installed"]),
    )?;
    let installed = String::from_utf8_lossy(&output.stdout);

    // Tier-3 targets have no rustup component; they need nightly rust-src instead.
    let components = repo::capture(
        std::process::Command::new("rustup")
            .current_dir(&root)
            .args(["component", "list", "--toolchain", "nightly", "--installed"]),
    )?;
    let nightly_src = components.status.success()
        && String::from_utf8_lossy(&components.stdout)
            .lines()
            .any(|line| line.trim().starts_with("rust-src"));

    for case in TARGETS {
        if case.build_std {
            if nightly_src {
                report.pass(case.triple, Some("nightly -Zbuild-std".into()));
            } else {
                report.fail(case.triple, "rustup component add rust-src --toolchain nightly");
            }
        } else if installed.lines().any(|line| line.trim() == case.triple) {
            report.pass(case.triple, None);
        } else {
            report.fail(case.triple, format!("rustup target add {}", case.triple));
        }
    }

    Ok(report)
}
