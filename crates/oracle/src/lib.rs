// crates/oracle/src/lib.rs

//! Aggregates the fork-safety observers into one go/no-go decision.
//!
//! The oracle is advisory: other threads may start, signals may arrive or a
//! scheduler may begin between a verdict and the fork that follows it.
//! Callers that need a guarantee quiesce the process first and use the oracle
//! to verify they did.

use observers::{
    CheckKind, Diagnostic, FreezeObserver, GlobalLedger, ObserveError, Observer, PendingSignals,
    SchedulerObserver, ThreadCensus, Verdict,
};

mod config;
mod fork;
mod report;

pub use config::{IntrospectionPolicy, Mode, OracleConfig, OracleConfigBuilder};
pub use fork::{ForkError, safe_fork};
pub use nix::unistd::ForkResult;
pub use report::Report;

macro_rules! at_check {
    ($level:ident, $check:expr, $($arg:tt)+) => {
        match $check {
            CheckKind::Threads => tracing::$level!(target: "safefork::threads", $($arg)+),
            CheckKind::Signals => tracing::$level!(target: "safefork::signals", $($arg)+),
            CheckKind::Scheduler => tracing::$level!(target: "safefork::scheduler", $($arg)+),
            CheckKind::Freeze => tracing::$level!(target: "safefork::freeze", $($arg)+),
        }
    };
}

/// The observers of the running process: thread census, pending signals,
/// scheduler activity and the global freeze ledger.
pub fn default_observers() -> Vec<Box<dyn Observer>> {
    vec![
        Box::new(ThreadCensus::system()),
        Box::new(PendingSignals),
        Box::new(SchedulerObserver::default()),
        Box::new(FreezeObserver::new(GlobalLedger)),
    ]
}

pub struct Oracle {
    config: OracleConfig,
    observers: Vec<Box<dyn Observer>>,
}

impl Default for Oracle {
    fn default() -> Self {
        Self::new(OracleConfig::default())
    }
}

impl Oracle {
    pub fn new(config: OracleConfig) -> Self {
        Self::with_observers(config, default_observers())
    }

    pub fn with_observers(config: OracleConfig, observers: Vec<Box<dyn Observer>>) -> Self {
        Self { config, observers }
    }

    pub fn config(&self) -> &OracleConfig {
        &self.config
    }

    /// Query every observer now and combine the verdicts.
    ///
    /// Every unsafe verdict is logged at warn level on its check's target,
    /// with remediation advice and one line per diagnostic.
    pub fn evaluate(&self) -> Report {
        let mut verdicts = Vec::with_capacity(self.observers.len());
        for observer in &self.observers {
            let verdict = match observer.observe() {
                Ok(verdict) => verdict,
                Err(err) => self.resolve(err),
            };
            log_verdict(&verdict);
            let stop = !verdict.safe && self.config.mode == Mode::FirstFailure;
            verdicts.push(verdict);
            if stop {
                break;
            }
        }
        let report = Report::new(verdicts);
        tracing::debug!(target: "safefork::oracle", safe = report.is_safe(), "evaluated");
        report
    }

    pub fn is_safe(&self) -> bool {
        self.evaluate().is_safe()
    }

    fn resolve(&self, err: ObserveError) -> Verdict {
        let check = err.check();
        let diagnostics = vec![Diagnostic::Indeterminate {
            reason: err.to_string(),
        }];
        match self.config.introspection {
            IntrospectionPolicy::FailClosed => Verdict::unsafe_with(check, diagnostics),
            IntrospectionPolicy::FailOpen => {
                at_check!(warn, check, error = %err, "introspection failed, passing check");
                Verdict {
                    check,
                    safe: true,
                    diagnostics,
                }
            }
        }
    }
}

fn log_verdict(verdict: &Verdict) {
    if verdict.safe {
        at_check!(debug, verdict.check, "safe");
        return;
    }
    at_check!(warn, verdict.check, "{}", verdict.check.remediation());
    for diagnostic in &verdict.diagnostics {
        at_check!(warn, verdict.check, "{diagnostic}");
    }
}

/// Evaluate the default oracle for the calling process.
pub fn is_safe_to_fork() -> bool {
    Oracle::default().is_safe()
}
