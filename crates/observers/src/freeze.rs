// crates/observers/src/freeze.rs

//! Allocator freeze ledger.
//!
//! Freezing marks everything reachable right now as pre-existing so that
//! collection activity after `fork(2)` leaves those pages alone and they stay
//! shared copy-on-write between parent and child. Memory managers record
//! their freezes here, or expose their own count through [`FreezeSource`].

use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::debug;

use crate::{CheckKind, Diagnostic, Observer, Result, Verdict};

static FREEZE_COUNT: AtomicUsize = AtomicUsize::new(0);

/// Record a freeze of the process heap. Returns the new freeze count.
pub fn freeze() -> usize {
    let count = FREEZE_COUNT.fetch_add(1, Ordering::SeqCst) + 1;
    debug!(target: "safefork::freeze", count, "heap frozen");
    count
}

/// Release every recorded freeze.
pub fn unfreeze() {
    FREEZE_COUNT.store(0, Ordering::SeqCst);
    debug!(target: "safefork::freeze", "heap unfrozen");
}

pub fn freeze_count() -> usize {
    FREEZE_COUNT.load(Ordering::SeqCst)
}

/// Freezes on construction and releases that one freeze on drop. Freezes
/// held elsewhere stay in effect; [`unfreeze`] releases all of them.
///
/// Hold it across the fork in the parent:
///
/// ```
/// let guard = observers::FreezeGuard::new();
/// assert!(observers::freeze_count() > 0);
/// drop(guard);
/// assert_eq!(observers::freeze_count(), 0);
/// ```
#[derive(Debug)]
#[must_use = "the heap is unfrozen as soon as the guard is dropped"]
pub struct FreezeGuard(());

impl FreezeGuard {
    pub fn new() -> Self {
        freeze();
        Self(())
    }
}

impl Default for FreezeGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for FreezeGuard {
    fn drop(&mut self) {
        // Saturates if `unfreeze` already ran while the guard was alive.
        let previous = FREEZE_COUNT
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .unwrap_or(0);
        debug!(
            target: "safefork::freeze",
            count = previous.saturating_sub(1),
            "guard released"
        );
    }
}

/// Anything that can report how many freezes are in effect.
pub trait FreezeSource: Send + Sync {
    fn freeze_count(&self) -> usize;
}

/// The process-wide ledger behind [`freeze`] and [`unfreeze`].
#[derive(Clone, Copy, Debug, Default)]
pub struct GlobalLedger;

impl FreezeSource for GlobalLedger {
    fn freeze_count(&self) -> usize {
        freeze_count()
    }
}

/// Checks that the heap was frozen before forking.
///
/// Unlike the other checks, failing this one wastes memory rather than
/// breaking the child.
#[derive(Debug, Default)]
pub struct FreezeObserver<S = GlobalLedger> {
    source: S,
}

impl<S: FreezeSource> FreezeObserver<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }
}

impl<S: FreezeSource> Observer for FreezeObserver<S> {
    fn check(&self) -> CheckKind {
        CheckKind::Freeze
    }

    fn observe(&self) -> Result<Verdict> {
        let count = self.source.freeze_count();
        debug!(target: "safefork::freeze", count, "freeze count");
        if count == 0 {
            Ok(Verdict::unsafe_with(
                CheckKind::Freeze,
                vec![Diagnostic::NotFrozen],
            ))
        } else {
            Ok(Verdict::safe(CheckKind::Freeze))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    struct Fixed(usize);

    impl FreezeSource for Fixed {
        fn freeze_count(&self) -> usize {
            self.0
        }
    }

    #[test]
    fn custom_source() {
        assert!(!FreezeObserver::new(Fixed(0)).observe().unwrap().safe);
        assert!(FreezeObserver::new(Fixed(3)).observe().unwrap().safe);
    }

    #[test]
    #[serial(freeze)]
    fn freeze_then_unfreeze() {
        unfreeze();
        let observer = FreezeObserver::<GlobalLedger>::default();
        assert!(!observer.observe().unwrap().safe);
        assert_eq!(freeze(), 1);
        assert_eq!(freeze(), 2);
        assert!(observer.observe().unwrap().safe);
        unfreeze();
        assert!(!observer.observe().unwrap().safe);
    }

    #[test]
    #[serial(freeze)]
    fn guard_scopes_the_freeze() {
        unfreeze();
        {
            let _guard = FreezeGuard::new();
            assert_eq!(freeze_count(), 1);
        }
        assert_eq!(freeze_count(), 0);
    }

    #[test]
    #[serial(freeze)]
    fn nested_guards_release_only_their_own_freeze() {
        unfreeze();
        let outer = FreezeGuard::new();
        {
            let _inner = FreezeGuard::new();
            assert_eq!(freeze_count(), 2);
        }
        assert_eq!(freeze_count(), 1);
        assert!(FreezeObserver::<GlobalLedger>::default().observe().unwrap().safe);
        drop(outer);
        assert_eq!(freeze_count(), 0);
    }

    #[test]
    #[serial(freeze)]
    fn guard_drop_after_unfreeze_stays_at_zero() {
        unfreeze();
        let guard = FreezeGuard::new();
        unfreeze();
        drop(guard);
        assert_eq!(freeze_count(), 0);
    }
}
