// crates/logging/src/flags.rs
#![allow(missing_docs)]

use clap::ValueEnum;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, ValueEnum, Serialize)]
#[clap(rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Raises one component's events to trace level.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, ValueEnum, Serialize)]
#[clap(rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum DebugFlag {
    Threads,
    Signals,
    Scheduler,
    Freeze,
    Oracle,
    Fork,
}

impl DebugFlag {
    pub const ALL: [DebugFlag; 6] = [
        DebugFlag::Threads,
        DebugFlag::Signals,
        DebugFlag::Scheduler,
        DebugFlag::Freeze,
        DebugFlag::Oracle,
        DebugFlag::Fork,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            DebugFlag::Threads => "threads",
            DebugFlag::Signals => "signals",
            DebugFlag::Scheduler => "scheduler",
            DebugFlag::Freeze => "freeze",
            DebugFlag::Oracle => "oracle",
            DebugFlag::Fork => "fork",
        }
    }

    pub const fn target(self) -> &'static str {
        match self {
            DebugFlag::Threads => "safefork::threads",
            DebugFlag::Signals => "safefork::signals",
            DebugFlag::Scheduler => "safefork::scheduler",
            DebugFlag::Freeze => "safefork::freeze",
            DebugFlag::Oracle => "safefork::oracle",
            DebugFlag::Fork => "safefork::fork",
        }
    }
}

impl From<&DebugFlag> for DebugFlag {
    fn from(flag: &DebugFlag) -> Self {
        *flag
    }
}

#[derive(Clone, Debug)]
pub struct SubscriberConfig {
    pub format: LogFormat,
    pub verbose: u8,
    pub debug: Vec<DebugFlag>,
    pub quiet: bool,
    pub log_file: Option<(PathBuf, LogFormat)>,
    pub syslog: bool,
    pub syslog_path: Option<PathBuf>,
    pub colored: bool,
    pub timestamps: bool,
}

impl Default for SubscriberConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Text,
            verbose: 0,
            debug: Vec::new(),
            quiet: false,
            log_file: None,
            syslog: false,
            syslog_path: None,
            colored: true,
            timestamps: false,
        }
    }
}

#[derive(Debug, Default)]
#[must_use]
pub struct SubscriberConfigBuilder {
    cfg: SubscriberConfig,
}

impl SubscriberConfig {
    pub fn builder() -> SubscriberConfigBuilder {
        SubscriberConfigBuilder::default()
    }
}

impl SubscriberConfigBuilder {
    pub fn format(mut self, format: LogFormat) -> Self {
        self.cfg.format = format;
        self
    }

    pub fn verbose(mut self, verbose: u8) -> Self {
        self.cfg.verbose = verbose;
        self
    }

    pub fn debug<I>(mut self, debug: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<DebugFlag>,
    {
        let mut debug = debug.into_iter().map(Into::into).collect::<Vec<_>>();
        debug.sort_by_key(|flag| flag.as_str());
        debug.dedup();
        self.cfg.debug = debug;
        self
    }

    pub fn quiet(mut self, quiet: bool) -> Self {
        self.cfg.quiet = quiet;
        self
    }

    pub fn log_file(mut self, log_file: Option<(PathBuf, LogFormat)>) -> Self {
        self.cfg.log_file = log_file;
        self
    }

    pub fn syslog(mut self, syslog: bool) -> Self {
        self.cfg.syslog = syslog;
        self
    }

    /// Datagram socket for the syslog layer; defaults to `$SAFEFORK_SYSLOG_PATH`
    /// or `/dev/log`.
    pub fn syslog_path(mut self, path: Option<PathBuf>) -> Self {
        self.cfg.syslog_path = path;
        self
    }

    pub fn colored(mut self, colored: bool) -> Self {
        self.cfg.colored = colored;
        self
    }

    pub fn timestamps(mut self, timestamps: bool) -> Self {
        self.cfg.timestamps = timestamps;
        self
    }

    pub fn build(self) -> SubscriberConfig {
        self.cfg
    }
}
