//! Error collection for fan-out work.
//!
//! Jobs spawned into a `rayon::scope` report into an `ErrorGroup`. The
//! scope joins every job; the group keeps the first error and counts the
//! rest. Nothing is cancelled when a job fails.
//!
//! ```ignore
//! let group = ErrorGroup::new();
//! rayon::scope(|s| {
//!     for path in &files {
//!         s.spawn(|_| group.record(compress(path)));
//!     }
//! });
//! group.into_result()?;
//! ```

use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// First-error-wins collector shared by concurrent jobs.
pub struct ErrorGroup<E> {
    first: Mutex<Option<E>>,
    failed: AtomicUsize,
}

impl<E> ErrorGroup<E> {
    pub const fn new() -> Self {
        Self {
            first: Mutex::new(None),
            failed: AtomicUsize::new(0),
        }
    }

    /// Record a job outcome. Only the first error is retained.
    pub fn record(&self, result: Result<(), E>) {
        if let Err(e) = result {
            self.failed.fetch_add(1, Ordering::Relaxed);
            let mut first = self.first.lock();
            if first.is_none() {
                *first = Some(e);
            }
        }
    }

    /// Consume the group, yielding the first error with the failure count.
    pub fn into_result(self) -> Result<(), (E, usize)> {
        let failed = self.failed.into_inner();
        match self.first.into_inner() {
            Some(e) => Err((e, failed)),
            None => Ok(()),
        }
    }
}

impl<E> Default for ErrorGroup<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_group_is_ok() {
        let group: ErrorGroup<String> = ErrorGroup::new();
        group.record(Ok(()));
        assert!(group.into_result().is_ok());
    }

    #[test]
    fn test_first_error_wins() {
        let group = ErrorGroup::new();
        group.record(Err("first"));
        group.record(Ok(()));
        group.record(Err("second"));

        let (err, failed) = group.into_result().unwrap_err();
        assert_eq!(err, "first");
        assert_eq!(failed, 2);
    }

    #[test]
    fn test_all_jobs_run_despite_failure() {
        let group = ErrorGroup::new();
        let done = AtomicUsize::new(0);

        rayon::scope(|s| {
            for i in 0..16 {
                let (group, done) = (&group, &done);
                s.spawn(move |_| {
                    done.fetch_add(1, Ordering::Relaxed);
                    group.record(if i == 3 { Err(i) } else { Ok(()) });
                });
            }
        });

        assert_eq!(done.load(Ordering::Relaxed), 16);
        assert_eq!(group.into_result().unwrap_err(), (3, 1));
    }
}
