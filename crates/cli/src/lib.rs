// crates/cli/src/lib.rs

//! The `safefork` command: evaluate the oracle, run a command behind a
//! guarded fork, or reproduce each fork hazard.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use logging::{DebugFlag, LogFormat, SubscriberConfig};
use oracle::OracleConfig;

mod check;
mod demo;
#[cfg(unix)]
mod exec;

pub use demo::Hazard;

#[derive(Parser, Debug)]
#[command(name = "safefork", version, about = "Decide whether forking this process is safe")]
pub struct Cli {
    #[command(flatten)]
    pub log: LogOpts,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Evaluate every check and print the report
    Check(CheckOpts),
    /// Fork behind the oracle and exec CMD in the child
    Exec(ExecOpts),
    /// Reproduce a fork hazard and its remediation
    Demo {
        #[arg(value_enum)]
        hazard: Hazard,
    },
}

/// Logging flags shared by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct LogOpts {
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
    #[arg(short, long, global = true)]
    pub quiet: bool,
    #[arg(long = "log-format", value_enum, value_name = "FMT", global = true)]
    pub log_format: Option<LogFormat>,
    #[arg(long = "log-file", value_name = "FILE", global = true)]
    pub log_file: Option<PathBuf>,
    #[arg(long = "log-file-format", value_enum, value_name = "FMT", global = true)]
    pub log_file_format: Option<LogFormat>,
    /// Trace one check (repeatable, or comma separated)
    #[arg(
        long,
        value_enum,
        value_name = "CHECK",
        value_delimiter = ',',
        global = true
    )]
    pub debug: Vec<DebugFlag>,
    #[arg(long, global = true)]
    pub syslog: bool,
    #[arg(long = "syslog-path", value_name = "SOCKET", env = "SAFEFORK_SYSLOG_PATH", global = true)]
    pub syslog_path: Option<PathBuf>,
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,
    #[arg(long, global = true)]
    pub timestamps: bool,
}

impl LogOpts {
    pub fn subscriber_config(&self) -> SubscriberConfig {
        SubscriberConfig::builder()
            .format(self.log_format.unwrap_or_default())
            .verbose(self.verbose)
            .debug(&self.debug)
            .quiet(self.quiet)
            .log_file(
                self.log_file
                    .clone()
                    .map(|path| (path, self.log_file_format.unwrap_or_default())),
            )
            .syslog(self.syslog)
            .syslog_path(self.syslog_path.clone())
            .colored(!self.no_color)
            .timestamps(self.timestamps)
            .build()
    }
}

/// Flags selecting how the oracle evaluates.
#[derive(Args, Debug, Clone, Default)]
pub struct OracleOpts {
    /// Hold the allocator freeze while evaluating
    #[arg(long)]
    pub freeze: bool,
    /// Stop at the first unsafe check
    #[arg(long = "first-failure")]
    pub first_failure: bool,
    /// Treat checks that cannot be evaluated as safe
    #[arg(long = "fail-open")]
    pub fail_open: bool,
}

impl OracleOpts {
    pub fn oracle_config(&self) -> OracleConfig {
        OracleConfig::builder()
            .first_failure(self.first_failure)
            .fail_open(self.fail_open)
            .build()
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, ValueEnum)]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

#[derive(Args, Debug)]
pub struct CheckOpts {
    #[command(flatten)]
    pub oracle: OracleOpts,
    #[arg(long, value_enum, default_value = "text")]
    pub format: ReportFormat,
}

#[derive(Args, Debug)]
pub struct ExecOpts {
    #[command(flatten)]
    pub oracle: OracleOpts,
    #[arg(
        value_name = "CMD",
        required = true,
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub command: Vec<String>,
}

/// Exit status for an unsafe verdict or a refused fork.
pub const EXIT_UNSAFE: u8 = 1;
/// Exit status when the command itself fails.
pub const EXIT_ERROR: u8 = 3;

/// Parse the process arguments and run the selected subcommand.
pub fn run() -> Result<ExitCode> {
    run_with(Cli::parse())
}

pub fn run_with(cli: Cli) -> Result<ExitCode> {
    logging::init(cli.log.subscriber_config()).context("failed to set up logging")?;
    match cli.command {
        Command::Check(opts) => check::run(&opts),
        Command::Exec(opts) => run_exec(&opts),
        Command::Demo { hazard } => demo::run(hazard),
    }
}

#[cfg(unix)]
fn run_exec(opts: &ExecOpts) -> Result<ExitCode> {
    exec::run(opts)
}

#[cfg(not(unix))]
fn run_exec(_opts: &ExecOpts) -> Result<ExitCode> {
    anyhow::bail!("exec is only supported on unix")
}
