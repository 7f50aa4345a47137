// crates/oracle/src/config.rs

use clap::ValueEnum;
use serde::Serialize;

/// How many observers run once one reports unsafe.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, ValueEnum, Serialize)]
#[clap(rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    /// Run every observer and diagnose every failure.
    #[default]
    Exhaustive,
    /// Stop at the first unsafe verdict.
    FirstFailure,
}

/// What an introspection failure counts as.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, ValueEnum, Serialize)]
#[clap(rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum IntrospectionPolicy {
    /// A check that cannot be answered is unsafe.
    #[default]
    FailClosed,
    /// A check that cannot be answered is reported but passes.
    FailOpen,
}

/// Configuration for an [`Oracle`](crate::Oracle).
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct OracleConfig {
    pub mode: Mode,
    pub introspection: IntrospectionPolicy,
}

impl OracleConfig {
    pub fn builder() -> OracleConfigBuilder {
        OracleConfigBuilder::default()
    }
}

/// Builder for [`OracleConfig`].
#[derive(Debug, Default)]
#[must_use]
pub struct OracleConfigBuilder {
    cfg: OracleConfig,
}

impl OracleConfigBuilder {
    pub fn mode(mut self, mode: Mode) -> Self {
        self.cfg.mode = mode;
        self
    }

    pub fn first_failure(mut self, enable: bool) -> Self {
        self.cfg.mode = if enable {
            Mode::FirstFailure
        } else {
            Mode::Exhaustive
        };
        self
    }

    pub fn introspection(mut self, policy: IntrospectionPolicy) -> Self {
        self.cfg.introspection = policy;
        self
    }

    pub fn fail_open(mut self, enable: bool) -> Self {
        self.cfg.introspection = if enable {
            IntrospectionPolicy::FailOpen
        } else {
            IntrospectionPolicy::FailClosed
        };
        self
    }

    pub fn build(self) -> OracleConfig {
        self.cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fail_closed_and_exhaustive() {
        let cfg = OracleConfig::default();
        assert_eq!(cfg.mode, Mode::Exhaustive);
        assert_eq!(cfg.introspection, IntrospectionPolicy::FailClosed);
    }

    #[test]
    fn later_calls_overwrite() {
        let cfg = OracleConfig::builder()
            .fail_open(true)
            .first_failure(true)
            .fail_open(false)
            .build();
        assert_eq!(cfg.mode, Mode::FirstFailure);
        assert_eq!(cfg.introspection, IntrospectionPolicy::FailClosed);
    }
}
