// src/config.rs

use logging::{DebugFlag, LogFormat};
use oracle::{IntrospectionPolicy, Mode, OracleConfig};
use std::path::PathBuf;

/// Configuration for one oracle evaluation: how to log it and how to judge.
#[derive(Clone, Debug)]
pub struct CheckConfig {
    pub log_format: LogFormat,
    pub verbose: u8,
    pub debug: Vec<DebugFlag>,
    pub quiet: bool,
    pub log_file: Option<(PathBuf, LogFormat)>,
    pub syslog: bool,
    pub syslog_path: Option<PathBuf>,
    pub colored: bool,
    pub timestamps: bool,
    pub oracle: OracleConfig,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Text,
            verbose: 0,
            debug: Vec::new(),
            quiet: false,
            log_file: None,
            syslog: false,
            syslog_path: None,
            colored: true,
            timestamps: false,
            oracle: OracleConfig::default(),
        }
    }
}

impl CheckConfig {
    /// Create a new builder for [`CheckConfig`].
    pub fn builder() -> CheckConfigBuilder {
        CheckConfigBuilder::default()
    }
}

/// Builder for [`CheckConfig`].
#[derive(Debug, Default)]
#[must_use]
pub struct CheckConfigBuilder {
    cfg: CheckConfig,
}

impl CheckConfigBuilder {
    pub fn log_format(mut self, log_format: LogFormat) -> Self {
        self.cfg.log_format = log_format;
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

    pub fn syslog(mut self, enable: bool) -> Self {
        self.cfg.syslog = enable;
        self
    }

    pub fn syslog_path(mut self, path: Option<PathBuf>) -> Self {
        self.cfg.syslog_path = path;
        self
    }

    pub fn colored(mut self, enable: bool) -> Self {
        self.cfg.colored = enable;
        self
    }

    pub fn timestamps(mut self, enable: bool) -> Self {
        self.cfg.timestamps = enable;
        self
    }

    pub fn oracle(mut self, oracle: OracleConfig) -> Self {
        self.cfg.oracle = oracle;
        self
    }

    pub fn mode(mut self, mode: Mode) -> Self {
        self.cfg.oracle.mode = mode;
        self
    }

    pub fn introspection(mut self, policy: IntrospectionPolicy) -> Self {
        self.cfg.oracle.introspection = policy;
        self
    }

    pub fn build(self) -> CheckConfig {
        self.cfg
    }
}
