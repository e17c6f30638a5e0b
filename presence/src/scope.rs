use std::future::Future;
use std::sync::{Arc, Mutex};

use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, error, info};

use crate::error::{GateError, ScopeError};

/// A cancellable lifetime for the monitoring tasks of [`PresenceGate`](crate::PresenceGate)s.
///
/// Tasks report failures as [`GateError`], so this only hosts gate monitors and is not a
/// general-purpose task scope.
///
/// Tasks launched in a scope run until they finish on their own or the scope is cancelled.
/// A scope is cancelled explicitly with [`Scope::cancel`], when one of its tasks fails,
/// or when the last handle to it is dropped.
#[derive(Clone)]
pub struct Scope(Arc<Inner>);

struct Inner {
    cancel: watch::Sender<bool>,
    tasks: Mutex<Vec<(String, JoinHandle<Result<(), GateError>>)>>,
}

/// Lets a task find out that its scope has been cancelled
#[derive(Clone)]
pub struct Cancellation(watch::Receiver<bool>);

impl Default for Scope {
    fn default() -> Self { Self::new() }
}

impl Scope {
    pub fn new() -> Self {
        let (cancel, _) = watch::channel(false);
        Self(Arc::new(Inner { cancel, tasks: Mutex::new(Vec::new()) }))
    }

    /// Spawn a task bound to this scope.
    ///
    /// If the task returns an error, the error is logged, the scope is cancelled and
    /// the error is kept for [`Scope::join`].
    ///
    /// # Panics
    /// Panics if called outside of a Tokio runtime.
    pub fn launch<F>(&self, task: impl Into<String>, future: F)
    where F: Future<Output = Result<(), GateError>> + Send + 'static {
        let task = task.into();
        debug!("Launching task {}", task);

        let scope = Arc::downgrade(&self.0);
        let name = task.clone();
        let handle = tokio::spawn(async move {
            let result = future.await;
            if let Err(e) = &result {
                error!("Task {} failed: {}", name, e);
                if let Some(inner) = scope.upgrade() {
                    inner.cancel.send_replace(true);
                }
            }
            result
        });
        self.0.tasks.lock().expect("tasks lock is poisoned").push((task, handle));
    }

    /// Cancel every task in this scope. Cancelling twice has no further effect.
    pub fn cancel(&self) {
        if !self.0.cancel.send_replace(true) {
            info!("Scope cancelled");
        }
    }

    pub fn is_cancelled(&self) -> bool { *self.0.cancel.borrow() }

    /// Get a handle that tasks can use to wait for cancellation
    pub fn cancellation(&self) -> Cancellation { Cancellation(self.0.cancel.subscribe()) }

    /// Wait for every task launched so far to finish, returning the first failure.
    ///
    /// This does not cancel the scope; a task that runs until cancellation will keep this waiting.
    pub async fn join(&self) -> Result<(), ScopeError> {
        let tasks = std::mem::take(&mut *self.0.tasks.lock().expect("tasks lock is poisoned"));

        let mut failure = None;
        for (task, handle) in tasks {
            let error = match handle.await {
                Ok(Ok(())) => {
                    debug!("Task {} completed", task);
                    continue;
                }
                Ok(Err(source)) => ScopeError::Failed { task, source },
                Err(source) => ScopeError::Join { task, source },
            };
            failure.get_or_insert(error);
        }

        match failure {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tasks = self.0.tasks.lock().map(|tasks| tasks.len()).unwrap_or_default();
        f.debug_struct("Scope").field("cancelled", &self.is_cancelled()).field("tasks", &tasks).finish()
    }
}

impl Cancellation {
    pub fn is_cancelled(&self) -> bool { *self.0.borrow() }

    /// Resolves once the scope is cancelled or dropped
    pub async fn cancelled(&mut self) {
        // An error means every scope handle is gone, which counts as cancellation
        let _ = self.0.wait_for(|cancelled| *cancelled).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transition::Activation;

    #[tokio::test]
    async fn test_cancel_wakes_tasks() {
        let scope = Scope::new();
        let mut cancellation = scope.cancellation();
        scope.launch("waiter", async move {
            cancellation.cancelled().await;
            Ok(())
        });

        assert!(!scope.is_cancelled());
        scope.cancel();
        scope.cancel();
        assert!(scope.is_cancelled());
        scope.join().await.unwrap();
    }

    #[tokio::test]
    async fn test_drop_cancels() {
        let scope = Scope::new();
        let mut cancellation = scope.cancellation();
        assert!(!cancellation.is_cancelled());
        drop(scope);
        tokio::time::timeout(std::time::Duration::from_secs(1), cancellation.cancelled()).await.unwrap();
    }

    #[tokio::test]
    async fn test_failure_cancels_scope() {
        let scope = Scope::new();
        let mut sibling = scope.cancellation();
        scope.launch("sibling", async move {
            sibling.cancelled().await;
            Ok(())
        });
        scope.launch("failing", async {
            Err(GateError::Callback { activation: Activation::Active, source: "boom".into() })
        });

        match scope.join().await {
            Err(ScopeError::Failed { task, source }) => {
                assert_eq!(task, "failing");
                assert_eq!(source.activation(), Activation::Active);
            }
            other => panic!("unexpected join result: {other:?}"),
        }
        assert!(scope.is_cancelled());
    }
}
