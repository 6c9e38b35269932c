use std::mem::ManuallyDrop;

/// Single use deferred action.
///
/// Constructed armed. On drop the callback runs exactly once, unless
/// [`dismiss`](Self::dismiss) was called first. Drop runs on every scope
/// exit, so a panic between construction and `dismiss` triggers the
/// callback as well. That makes the guard the rollback step of a
/// multi-step operation: arm it before the risky steps, dismiss it once
/// the whole sequence succeeded.
///
/// The callback must not panic. It may run during unwinding, where a
/// second panic aborts the process. This is a caller obligation and is
/// not checked at runtime.
///
/// Not cloneable. Moving the guard moves the obligation with it, the
/// callback still runs at most once.
pub struct ScopeGuard<F: FnOnce()> {
    callback: ManuallyDrop<F>,
    active: bool,
}

impl<F: FnOnce()> ScopeGuard<F> {
    pub fn new(callback: F) -> Self {
        Self {
            callback: ManuallyDrop::new(callback),
            active: true,
        }
    }

    /// Irrevocably disarms the guard. The callback will never run.
    pub fn dismiss(&mut self) {
        self.active = false;
    }
}

impl<F: FnOnce()> Drop for ScopeGuard<F> {
    fn drop(&mut self) {
        // This is safe since drop runs at most once, so the callback is
        // taken out of the ManuallyDrop exactly once.
        let callback = unsafe { ManuallyDrop::take(&mut self.callback) };
        if self.active {
            callback();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::panic::{catch_unwind, AssertUnwindSafe};

    #[test]
    fn runs_on_drop() {
        let ran = Cell::new(0);
        {
            let _guard = ScopeGuard::new(|| ran.set(ran.get() + 1));
        }
        assert_eq!(ran.get(), 1);
    }

    #[test]
    fn dismissed_guard_is_a_noop() {
        let ran = Cell::new(0);
        {
            let mut guard = ScopeGuard::new(|| ran.set(ran.get() + 1));
            guard.dismiss();
        }
        assert_eq!(ran.get(), 0);
    }

    #[test]
    fn runs_during_unwind() {
        let ran = Cell::new(0);
        let result = catch_unwind(AssertUnwindSafe(|| {
            let _guard = ScopeGuard::new(|| ran.set(ran.get() + 1));
            panic!("boom");
        }));
        assert!(result.is_err());
        assert_eq!(ran.get(), 1);
    }

    #[test]
    fn moving_keeps_a_single_run() {
        let ran = Cell::new(0);
        {
            let guard = ScopeGuard::new(|| ran.set(ran.get() + 1));
            let _moved = guard;
        }
        assert_eq!(ran.get(), 1);
    }

    #[test]
    fn dismissed_callback_is_still_dropped() {
        struct Tally<'a>(&'a Cell<usize>);
        impl Drop for Tally<'_> {
            fn drop(&mut self) {
                self.0.set(self.0.get() + 1);
            }
        }

        let drops = Cell::new(0);
        {
            let tally = Tally(&drops);
            let mut guard = ScopeGuard::new(move || {
                let _keep = &tally;
            });
            guard.dismiss();
        }
        // The captured state is released even though the callback never ran.
        assert_eq!(drops.get(), 1);
    }
}
