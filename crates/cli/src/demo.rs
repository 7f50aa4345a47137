// crates/cli/src/demo.rs
#![allow(unsafe_code)]

//! Each demo creates one hazard while the other conditions hold, prints the
//! oracle's report, removes the hazard and prints the report again.

use std::io::{self, Write};
use std::process::ExitCode;
#[cfg(unix)]
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::ValueEnum;
use observers::{CheckKind, FreezeGuard, freeze_count};
use oracle::{Oracle, Report};
use tracing::info;

use crate::EXIT_UNSAFE;

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum Hazard {
    /// A lock held by a thread that would not exist in the child
    Threads,
    /// A blocked signal that the child would never receive
    Signals,
    /// An async runtime driving the calling thread
    Scheduler,
    /// The allocator freeze toggled off and on
    Freeze,
}

impl Hazard {
    pub fn check(self) -> CheckKind {
        match self {
            Hazard::Threads => CheckKind::Threads,
            Hazard::Signals => CheckKind::Signals,
            Hazard::Scheduler => CheckKind::Scheduler,
            Hazard::Freeze => CheckKind::Freeze,
        }
    }
}

/// The reports taken with the hazard present and after removing it.
struct Outcome {
    before: Report,
    after: Report,
}

pub(crate) fn run(hazard: Hazard) -> Result<ExitCode> {
    let oracle = Oracle::default();
    let outcome = match hazard {
        Hazard::Threads => threads(&oracle)?,
        Hazard::Signals => signals(&oracle)?,
        Hazard::Scheduler => scheduler(&oracle)?,
        Hazard::Freeze => freeze(&oracle),
    };

    let mut out = io::stdout().lock();
    writeln!(out, "with {} hazard:", hazard.check())?;
    writeln!(out, "{}", outcome.before)?;
    writeln!(out)?;
    writeln!(out, "after remediation:")?;
    writeln!(out, "{}", outcome.after)?;
    out.flush()?;

    let shown = outcome.before.unsafe_checks().eq([hazard.check()]) && outcome.after.is_safe();
    if shown {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(EXIT_UNSAFE))
    }
}

/// Re-evaluate until the thread census settles. A joined thread lingers in
/// `/proc/self/task` until the kernel reaps it.
fn settle(oracle: &Oracle) -> Report {
    let mut report = oracle.evaluate();
    for _ in 0..200 {
        if !report.unsafe_checks().any(|c| c == CheckKind::Threads) {
            break;
        }
        thread::sleep(Duration::from_millis(5));
        report = oracle.evaluate();
    }
    report
}

fn threads(oracle: &Oracle) -> Result<Outcome> {
    let _freeze = FreezeGuard::new();
    let lock = Arc::new(Mutex::new(0u32));
    let (held_tx, held_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel::<()>();

    let worker = {
        let lock = Arc::clone(&lock);
        thread::Builder::new()
            .name("lock-holder".into())
            .spawn(move || {
                let mut guard = lock.lock().unwrap_or_else(|e| e.into_inner());
                *guard += 1;
                let _ = held_tx.send(());
                let _ = release_rx.recv();
            })
            .context("failed to spawn lock holder")?
    };
    held_rx.recv().context("lock holder exited early")?;
    info!(target: "safefork::threads", "lock held by worker thread");
    let before = oracle.evaluate();

    let _ = release_tx.send(());
    worker
        .join()
        .map_err(|_| anyhow::anyhow!("lock holder panicked"))?;
    let after = settle(oracle);
    let count = *lock.lock().unwrap_or_else(|e| e.into_inner());
    info!(target: "safefork::threads", count, "lock released and thread joined");
    Ok(Outcome { before, after })
}

#[cfg(unix)]
static DELIVERED: AtomicBool = AtomicBool::new(false);

#[cfg(unix)]
extern "C" fn on_usr1(_: libc::c_int) {
    DELIVERED.store(true, Ordering::SeqCst);
}

#[cfg(unix)]
fn signals(oracle: &Oracle) -> Result<Outcome> {
    use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal, raise, sigaction};

    let _freeze = FreezeGuard::new();
    let action = SigAction::new(SigHandler::Handler(on_usr1), SaFlags::empty(), SigSet::empty());
    // SAFETY: the handler only stores to an atomic.
    let previous = unsafe { sigaction(Signal::SIGUSR1, &action) }?;

    let mut mask = SigSet::empty();
    mask.add(Signal::SIGUSR1);
    mask.thread_block()?;
    raise(Signal::SIGUSR1)?;
    info!(target: "safefork::signals", "SIGUSR1 raised while blocked");
    let before = oracle.evaluate();

    mask.thread_unblock()?;
    let after = oracle.evaluate();
    info!(
        target: "safefork::signals",
        delivered = DELIVERED.load(Ordering::SeqCst),
        "SIGUSR1 unblocked"
    );
    // SAFETY: restores the disposition saved above.
    unsafe { sigaction(Signal::SIGUSR1, &previous) }?;
    Ok(Outcome { before, after })
}

#[cfg(not(unix))]
fn signals(_oracle: &Oracle) -> Result<Outcome> {
    anyhow::bail!("the signals demo is only supported on unix")
}

#[cfg(feature = "tokio")]
fn scheduler(oracle: &Oracle) -> Result<Outcome> {
    let _freeze = FreezeGuard::new();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .context("failed to build runtime")?;
    let before = runtime.block_on(async {
        info!(target: "safefork::scheduler", "evaluating inside block_on");
        oracle.evaluate()
    });
    drop(runtime);
    let after = oracle.evaluate();
    Ok(Outcome { before, after })
}

#[cfg(not(feature = "tokio"))]
fn scheduler(_oracle: &Oracle) -> Result<Outcome> {
    anyhow::bail!("built without an async runtime probe")
}

fn freeze(oracle: &Oracle) -> Outcome {
    info!(target: "safefork::freeze", count = freeze_count(), "before freeze");
    let before = oracle.evaluate();
    let guard = FreezeGuard::new();
    info!(target: "safefork::freeze", count = freeze_count(), "frozen");
    let after = oracle.evaluate();
    drop(guard);
    Outcome { before, after }
}
