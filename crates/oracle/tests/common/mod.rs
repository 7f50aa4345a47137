// crates/oracle/tests/common/mod.rs
#![allow(dead_code)]

use observers::{CheckKind, Diagnostic, ObserveError, Observer, Verdict};
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// An observer whose answer the test controls.
#[derive(Clone)]
pub struct Switch {
    check: CheckKind,
    safe: Arc<AtomicBool>,
    calls: Arc<AtomicUsize>,
}

impl Switch {
    pub fn new(check: CheckKind, safe: bool) -> Self {
        Self {
            check,
            safe: Arc::new(AtomicBool::new(safe)),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn set(&self, safe: bool) {
        self.safe.store(safe, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Observer for Switch {
    fn check(&self) -> CheckKind {
        self.check
    }

    fn observe(&self) -> Result<Verdict, ObserveError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.safe.load(Ordering::SeqCst) {
            Ok(Verdict::safe(self.check))
        } else {
            let finding = match self.check {
                CheckKind::Threads => Diagnostic::Thread {
                    tid: 2,
                    name: Some("worker".into()),
                },
                CheckKind::Signals => Diagnostic::PendingSignal {
                    signo: 10,
                    name: Some("SIGUSR1".into()),
                },
                CheckKind::Scheduler => Diagnostic::SchedulerActive {
                    flavor: "test".into(),
                },
                CheckKind::Freeze => Diagnostic::NotFrozen,
            };
            Ok(Verdict::unsafe_with(self.check, vec![finding]))
        }
    }
}

/// An observer whose introspection always fails.
pub struct Broken(pub CheckKind);

impl Observer for Broken {
    fn check(&self) -> CheckKind {
        self.0
    }

    fn observe(&self) -> Result<Verdict, ObserveError> {
        Err(ObserveError::Io {
            check: self.0,
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        })
    }
}

/// One switch per check, all safe.
pub fn switches() -> Vec<Switch> {
    CheckKind::ALL
        .iter()
        .map(|&check| Switch::new(check, true))
        .collect()
}

pub fn boxed(switches: &[Switch]) -> Vec<Box<dyn Observer>> {
    switches
        .iter()
        .cloned()
        .map(|s| Box::new(s) as Box<dyn Observer>)
        .collect()
}
