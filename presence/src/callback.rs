use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::error::BoxError;

/// An asynchronous, argument-less callback invoked on an activation transition.
#[derive(Clone)]
pub struct Callback(Arc<dyn Fn() -> CallbackFuture + Send + Sync + 'static>);

type CallbackFuture = BoxFuture<'static, Result<(), BoxError>>;

impl Callback {
    /// A callback that does nothing and always succeeds
    pub fn noop() -> Self { Self(Arc::new(|| -> CallbackFuture { Box::pin(async { Ok(()) }) })) }

    pub(crate) fn call(&self) -> CallbackFuture { (self.0)() }
}

impl std::fmt::Debug for Callback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.debug_struct("Callback").finish_non_exhaustive() }
}

/// Trait for types that can be converted into activation callbacks.
pub trait IntoCallback {
    fn into_callback(self) -> Callback;
}

impl IntoCallback for Callback {
    fn into_callback(self) -> Callback { self }
}

// Implementation for closures returning a fallible future
impl<F, Fut, E> IntoCallback for F
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    E: Into<BoxError>,
{
    fn into_callback(self) -> Callback {
        Callback(Arc::new(move || -> CallbackFuture {
            let fut = self();
            Box::pin(async move { fut.await.map_err(Into::into) })
        }))
    }
}
