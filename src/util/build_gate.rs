//! Build-once gate for expensive shared results.
//!
//! The [`BuildGate`] runs a build operation at most once. The first caller
//! executes the build; callers that arrive while it is in flight wait for the
//! same outcome; later callers read the stored outcome without running anything.
//!
//! Failures are stored as well as successes, so a failed build is replayed to
//! every subsequent caller until [`BuildGate::reset`] is called.
//!
//! # Cancellation
//!
//! If the task running the build is cancelled before it finishes, the next
//! waiting caller takes over and runs the build itself.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::OnceCell;

/// A one-time build whose outcome is shared by every caller.
pub struct BuildGate<T, E> {
    outcome: OnceCell<Result<Arc<T>, E>>,
    builds: AtomicUsize,
}

impl<T, E> BuildGate<T, E>
where
    E: Clone,
{
    /// Create a gate that has not been built yet.
    pub fn new() -> Self {
        Self {
            outcome: OnceCell::new(),
            builds: AtomicUsize::new(0),
        }
    }

    /// Return the built value, running `build` if no outcome is stored yet.
    ///
    /// Concurrent first callers block until the single in-flight build finishes
    /// and all observe the same `Arc`.
    pub async fn get_or_build<F, Fut>(&self, build: F) -> Result<Arc<T>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let outcome = self
            .outcome
            .get_or_init(|| async {
                self.builds.fetch_add(1, Ordering::SeqCst);
                build().await.map(Arc::new)
            })
            .await;
        outcome.clone()
    }

    /// The stored outcome, if the build has completed.
    pub fn get(&self) -> Option<&Result<Arc<T>, E>> {
        self.outcome.get()
    }

    /// Whether a build has completed (successfully or not).
    pub fn is_built(&self) -> bool {
        self.outcome.initialized()
    }

    /// Number of times the build operation has been started.
    pub fn build_count(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }

    /// Forget the stored outcome so the next caller builds again.
    pub fn reset(&mut self) {
        self.outcome.take();
    }
}

impl<T, E> Default for BuildGate<T, E>
where
    E: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}
