use anyhow::{Result, bail};

use crate::util::report::Report;

pub fn run(cli: crate::cli::Cli) -> Result<()> {
    let report = match cli.cmd {
        crate::cli::Cmd::Test { isa } => crate::tasks::test::run(isa)?,
        crate::cli::Cmd::Check { target } => crate::tasks::check::run(target.as_deref())?,
        crate::cli::Cmd::Doctor => crate::tasks::doctor::run()?,
    };
    finish(&report, cli.json)
}

fn finish(report: &Report, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        report.print();
    }
    if !report.ok {
        bail!("{} checks failed", report.task);
    }
    Ok(())
}
