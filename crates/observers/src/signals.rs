// crates/observers/src/signals.rs
#![allow(unsafe_code)]

use std::io;
use std::mem::MaybeUninit;

use libc::c_int;
use nix::sys::signal::Signal;
use tracing::{debug, trace};

use crate::{CheckKind, Diagnostic, ObserveError, Observer, Result, Verdict};

/// Detects signals raised but not yet delivered to the calling thread.
///
/// Pending signals are not inherited across `fork(2)`, so a signal in flight
/// in the parent never fires in the child.
#[derive(Clone, Copy, Debug, Default)]
pub struct PendingSignals;

impl PendingSignals {
    /// Signal numbers currently pending for the calling thread, ascending.
    pub fn pending(&self) -> Result<Vec<c_int>> {
        let mut set = MaybeUninit::<libc::sigset_t>::uninit();
        // SAFETY: `sigpending` fully initialises the set when it returns 0.
        let rc = unsafe { libc::sigpending(set.as_mut_ptr()) };
        if rc != 0 {
            return Err(ObserveError::Io {
                check: CheckKind::Signals,
                source: io::Error::last_os_error(),
            });
        }
        // SAFETY: checked `rc` above.
        let set = unsafe { set.assume_init() };
        let pending = (1..=highest_signal())
            // SAFETY: `set` is initialised and `signo` is in range.
            .filter(|&signo| unsafe { libc::sigismember(&set, signo) } == 1)
            .collect();
        Ok(pending)
    }
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn highest_signal() -> c_int {
    libc::SIGRTMAX()
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn highest_signal() -> c_int {
    31
}

/// Symbolic name for `signo`, if it has one.
pub fn signal_name(signo: c_int) -> Option<String> {
    if let Ok(sig) = Signal::try_from(signo) {
        return Some(sig.as_str().to_string());
    }
    realtime_name(signo)
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn realtime_name(signo: c_int) -> Option<String> {
    let min = libc::SIGRTMIN();
    (min..=libc::SIGRTMAX())
        .contains(&signo)
        .then(|| format!("SIGRTMIN+{}", signo - min))
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn realtime_name(_signo: c_int) -> Option<String> {
    None
}

impl Observer for PendingSignals {
    fn check(&self) -> CheckKind {
        CheckKind::Signals
    }

    fn observe(&self) -> Result<Verdict> {
        let pending = self.pending()?;
        debug!(target: "safefork::signals", count = pending.len(), "pending signals");
        let diagnostics = pending
            .into_iter()
            .map(|signo| {
                trace!(target: "safefork::signals", signo, "pending");
                Diagnostic::PendingSignal {
                    signo,
                    name: signal_name(signo),
                }
            })
            .collect();
        Ok(Verdict::from_findings(CheckKind::Signals, diagnostics))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_standard_signals() {
        assert_eq!(signal_name(libc::SIGUSR1).as_deref(), Some("SIGUSR1"));
        assert_eq!(signal_name(libc::SIGTERM).as_deref(), Some("SIGTERM"));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn names_realtime_signals() {
        let signo = libc::SIGRTMIN() + 2;
        assert_eq!(signal_name(signo).as_deref(), Some("SIGRTMIN+2"));
    }

    #[test]
    fn zero_has_no_name() {
        assert_eq!(signal_name(0), None);
    }
}
