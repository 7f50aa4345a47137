// crates/cli/src/check.rs

use std::process::ExitCode;

use anyhow::Result;
use observers::FreezeGuard;
use oracle::Oracle;

use crate::{CheckOpts, EXIT_UNSAFE, ReportFormat};

pub(crate) fn run(opts: &CheckOpts) -> Result<ExitCode> {
    let _freeze = opts.oracle.freeze.then(FreezeGuard::new);
    let report = Oracle::new(opts.oracle.oracle_config()).evaluate();
    match opts.format {
        ReportFormat::Text => println!("{report}"),
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    if report.is_safe() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(EXIT_UNSAFE))
    }
}
