// crates/oracle/src/fork.rs
#![allow(unsafe_code)]

use nix::errno::Errno;
use nix::unistd::{ForkResult, fork};
use observers::{Observer, ThreadCensus};
use thiserror::Error;
use tracing::{info, warn};

use crate::Oracle;

#[derive(Debug, Error)]
pub enum ForkError {
    /// The oracle refused; no child was created.
    #[error("unsafe to fork")]
    Unsafe,
    #[error("fork failed: {0}")]
    Os(#[from] Errno),
}

/// True only when the OS thread census positively finds one thread.
fn single_threaded() -> bool {
    matches!(ThreadCensus::system().observe(), Ok(verdict) if verdict.safe)
}

impl Oracle {
    /// Fork the current process if the oracle reports it safe.
    ///
    /// Returns [`ForkResult::Parent`] with the child's pid in the parent and
    /// [`ForkResult::Child`] in the child, like `fork(2)`. When any check is
    /// unsafe nothing is forked and [`ForkError::Unsafe`] is returned.
    ///
    /// Right before forking the OS thread census is taken again. It must
    /// confirm a single thread regardless of the introspection policy or the
    /// observers this oracle was built with.
    pub fn fork(&self) -> Result<ForkResult, ForkError> {
        if !self.is_safe() {
            warn!(target: "safefork::fork", "refusing to fork");
            return Err(ForkError::Unsafe);
        }
        if !single_threaded() {
            warn!(
                target: "safefork::fork",
                "thread census did not confirm a single thread, refusing to fork"
            );
            return Err(ForkError::Unsafe);
        }
        // SAFETY: the census above found no thread besides the caller, so no
        // lock can be held by a thread that will be missing in the child.
        let result = unsafe { fork() }?;
        if let ForkResult::Parent { child } = result {
            info!(target: "safefork::fork", child = child.as_raw(), "forked");
        }
        Ok(result)
    }
}

/// Fork with the default oracle.
pub fn safe_fork() -> Result<ForkResult, ForkError> {
    Oracle::default().fork()
}
