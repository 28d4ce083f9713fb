//! The per-line callback invoked by a follower.

use futures::future::BoxFuture;
use std::future::Future;

/// Error type a line handler may return. It is logged, never propagated.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Consumer of followed lines.
///
/// A follower awaits each call before reading the next line, so a slow
/// handler applies back-pressure to the follow process.
///
/// Any `Fn(String) -> impl Future<Output = Result<(), BoxError>>` closure
/// implements this trait.
pub trait LineHandler: Send + Sync + 'static {
    fn handle(&self, line: String) -> BoxFuture<'static, Result<(), BoxError>>;
}

impl<F, Fut> LineHandler for F
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
{
    fn handle(&self, line: String) -> BoxFuture<'static, Result<(), BoxError>> {
        Box::pin(self(line))
    }
}
