// crates/observers/src/scheduler.rs

use tracing::debug;

use crate::{CheckKind, Diagnostic, Observer, Result, Verdict};

/// Asks one runtime whether it is driving the calling thread.
///
/// Returns the scheduler's flavor when active.
pub type SchedulerProbe = fn() -> Option<String>;

/// Detects a cooperative scheduler running on the calling thread.
///
/// A scheduler's ready queues, timers and I/O registrations are tied to file
/// descriptors that `fork(2)` does not meaningfully replicate.
#[derive(Clone, Debug)]
pub struct SchedulerObserver {
    probes: Vec<SchedulerProbe>,
}

impl Default for SchedulerObserver {
    fn default() -> Self {
        let mut probes: Vec<SchedulerProbe> = Vec::new();
        #[cfg(feature = "tokio")]
        probes.push(tokio_probe);
        Self { probes }
    }
}

impl SchedulerObserver {
    /// An observer with no probes; always safe until one is added.
    pub fn empty() -> Self {
        Self { probes: Vec::new() }
    }

    #[must_use]
    pub fn with_probe(mut self, probe: SchedulerProbe) -> Self {
        self.probes.push(probe);
        self
    }

    pub fn probes(&self) -> usize {
        self.probes.len()
    }
}

/// Reports the tokio runtime entered on this thread, if any.
#[cfg(feature = "tokio")]
pub fn tokio_probe() -> Option<String> {
    use tokio::runtime::{Handle, RuntimeFlavor};

    let handle = Handle::try_current().ok()?;
    let flavor = match handle.runtime_flavor() {
        RuntimeFlavor::CurrentThread => "tokio current_thread",
        RuntimeFlavor::MultiThread => "tokio multi_thread",
        _ => "tokio",
    };
    Some(flavor.to_string())
}

impl Observer for SchedulerObserver {
    fn check(&self) -> CheckKind {
        CheckKind::Scheduler
    }

    fn observe(&self) -> Result<Verdict> {
        let diagnostics: Vec<_> = self
            .probes
            .iter()
            .filter_map(|probe| probe())
            .map(|flavor| Diagnostic::SchedulerActive { flavor })
            .collect();
        debug!(
            target: "safefork::scheduler",
            probes = self.probes.len(),
            active = diagnostics.len(),
            "scheduler probes"
        );
        Ok(Verdict::from_findings(CheckKind::Scheduler, diagnostics))
    }
}
