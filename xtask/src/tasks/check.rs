//! Cross-target check.
//!
//! TEAM_500: `cargo check` per triple, reading the `los_isa` cfg back out of
//! cargo's build-script message to confirm the row the build script picked.

use std::path::Path;
use std::process::Command;

use anyhow::{Result, bail};
use los_arch_arm::IsaVariant;
use serde::Deserialize;

use super::targets::{self, TargetCase};
use crate::util::repo;
use crate::util::report::Report;

#[derive(Deserialize)]
struct BuildScriptMessage {
    reason: String,
    #[serde(default)]
    package_id: String,
    #[serde(default)]
    cfgs: Vec<String>,
}

pub fn run(only: Option<&str>) -> Result<Report> {
    let root = repo::repo_root()?;
    let cases: Vec<&TargetCase> = match only {
        Some(triple) => match targets::find(triple) {
            Some(case) => vec![case],
            None => bail!("unknown target {triple}; known: {}", known()),
        },
        None => targets::TARGETS.iter().collect(),
    };

    let mut report = Report::new("check");
    for case in cases {
        eprintln!("Checking {}...", case.triple);
        let output = repo::capture(&mut check_command(&root, case))?;
        let built = output.status.success();

        match (case.expect, built) {
            (Some(expected), true) => match selected_isa(&output.stdout) {
                Some(found) if found == expected => report.pass(case.triple, Some(found.to_string())),
                Some(found) => report.fail(case.triple, format!("selected {found}, expected {expected}")),
                None => report.fail(case.triple, "build script reported no los_isa cfg"),
            },
            (Some(_), false) => report.fail(case.triple, repo::stderr_tail(&output, 20)),
            (None, false) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                if stderr.contains("E0101") {
                    report.pass(case.triple, Some("rejected as unported".into()));
                } else {
                    report.fail(case.triple, repo::stderr_tail(&output, 20));
                }
            }
            (None, true) => report.fail(case.triple, "built but should have been rejected"),
        }
    }
    Ok(report)
}

/// Tier-2 targets use the ambient cargo; tier-3 ones need nightly to build `core`.
fn check_command(root: &Path, case: &TargetCase) -> Command {
    let mut cmd = if case.build_std {
        let mut cmd = Command::new("rustup");
        cmd.current_dir(root).args(["run", "nightly", "cargo"]);
        cmd
    } else {
        repo::cargo(root)
    };
    cmd.args(["check", "-p", "los_arch_arm", "--target", case.triple, "--message-format=json"]);
    if case.build_std {
        cmd.arg("-Zbuild-std=core");
    }
    cmd
}

fn known() -> String {
    targets::TARGETS
        .iter()
        .map(|case| case.triple)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Pull the `los_isa` value out of cargo's JSON messages.
fn selected_isa(stdout: &[u8]) -> Option<IsaVariant> {
    String::from_utf8_lossy(stdout)
        .lines()
        .filter_map(|line| serde_json::from_str::<BuildScriptMessage>(line).ok())
        .filter(|msg| msg.reason == "build-script-executed" && msg.package_id.contains("los_arch_arm"))
        .flat_map(|msg| msg.cfgs)
        .find_map(|cfg| cfg.strip_prefix("los_isa=\"")?.strip_suffix('"')?.parse().ok())
}
