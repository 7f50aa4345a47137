// crates/observers/src/lib.rs

//! Point-in-time observations of process state that make `fork(2)` unsafe.
//!
//! Each observer answers one question about the calling process and returns
//! a [`Verdict`]. Observers hold no state between calls: every call re-reads
//! the OS or runtime.

use serde::Serialize;
use std::fmt;
use std::io;
use thiserror::Error;

pub mod freeze;
pub mod scheduler;
pub mod signals;
pub mod threads;

pub use freeze::{
    FreezeGuard, FreezeObserver, FreezeSource, GlobalLedger, freeze, freeze_count, unfreeze,
};
pub use scheduler::{SchedulerObserver, SchedulerProbe};
pub use signals::PendingSignals;
pub use threads::{ThreadCensus, ThreadEntry};

/// The four independent conditions checked before forking.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    Threads,
    Signals,
    Scheduler,
    Freeze,
}

impl CheckKind {
    pub const ALL: [CheckKind; 4] = [
        CheckKind::Threads,
        CheckKind::Signals,
        CheckKind::Scheduler,
        CheckKind::Freeze,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            CheckKind::Threads => "threads",
            CheckKind::Signals => "signals",
            CheckKind::Scheduler => "scheduler",
            CheckKind::Freeze => "freeze",
        }
    }

    /// Tracing target used for events about this check.
    pub const fn target(self) -> &'static str {
        match self {
            CheckKind::Threads => "safefork::threads",
            CheckKind::Signals => "safefork::signals",
            CheckKind::Scheduler => "safefork::scheduler",
            CheckKind::Freeze => "safefork::freeze",
        }
    }

    /// What the caller should do before forking when this check fails.
    pub const fn remediation(self) -> &'static str {
        match self {
            CheckKind::Threads => {
                "active threads detected; join all threads before forking"
            }
            CheckKind::Signals => {
                "pending signals detected; they are not inherited by the child. \
                 Register signal handlers after forking, not before"
            }
            CheckKind::Scheduler => {
                "an async runtime is driving this thread; stop the event loop before forking"
            }
            CheckKind::Freeze => {
                "allocator not frozen; freeze it before forking to avoid copy-on-write holes. \
                 Pause collection before forking and unfreeze after forking"
            }
        }
    }
}

impl fmt::Display for CheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single finding reported by an observer.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    Thread { tid: i32, name: Option<String> },
    PendingSignal { signo: i32, name: Option<String> },
    SchedulerActive { flavor: String },
    NotFrozen,
    Indeterminate { reason: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::Thread { tid, name: Some(name) } => write!(f, "thread {name} (tid {tid})"),
            Diagnostic::Thread { tid, name: None } => write!(f, "thread <unnamed> (tid {tid})"),
            Diagnostic::PendingSignal {
                signo,
                name: Some(name),
            } => write!(f, "pending signal {name} ({signo})"),
            Diagnostic::PendingSignal { signo, name: None } => write!(f, "pending signal {signo}"),
            Diagnostic::SchedulerActive { flavor } => write!(f, "{flavor} scheduler active"),
            Diagnostic::NotFrozen => f.write_str("freeze count is zero"),
            Diagnostic::Indeterminate { reason } => write!(f, "introspection failed: {reason}"),
        }
    }
}

/// Outcome of one observer at one instant.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Verdict {
    pub check: CheckKind,
    pub safe: bool,
    pub diagnostics: Vec<Diagnostic>,
}

impl Verdict {
    pub fn safe(check: CheckKind) -> Self {
        Self {
            check,
            safe: true,
            diagnostics: Vec::new(),
        }
    }

    pub fn unsafe_with(check: CheckKind, diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            check,
            safe: false,
            diagnostics,
        }
    }

    /// Safe when `diagnostics` is empty, unsafe otherwise.
    pub fn from_findings(check: CheckKind, diagnostics: Vec<Diagnostic>) -> Self {
        if diagnostics.is_empty() {
            Self::safe(check)
        } else {
            Self::unsafe_with(check, diagnostics)
        }
    }

    /// True when the verdict was produced without a working introspection call.
    pub fn is_indeterminate(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::Indeterminate { .. }))
    }
}

/// Failure to query the OS or runtime.
#[derive(Debug, Error)]
pub enum ObserveError {
    #[error("{check}: {source}")]
    Io {
        check: CheckKind,
        #[source]
        source: io::Error,
    },
    #[error("{check}: not supported on this platform")]
    Unsupported { check: CheckKind },
}

impl ObserveError {
    pub fn check(&self) -> CheckKind {
        match self {
            ObserveError::Io { check, .. } | ObserveError::Unsupported { check } => *check,
        }
    }
}

pub type Result<T> = std::result::Result<T, ObserveError>;

/// A read-only query against one piece of process state.
pub trait Observer: Send + Sync {
    fn check(&self) -> CheckKind;

    fn observe(&self) -> Result<Verdict>;
}

impl<O: Observer + ?Sized> Observer for Box<O> {
    fn check(&self) -> CheckKind {
        (**self).check()
    }

    fn observe(&self) -> Result<Verdict> {
        (**self).observe()
    }
}
