use std::future::Future;

use async_trait::async_trait;
use axum::response::IntoResponse;
use bytes::Bytes;
use tower::BoxError;

/// Normalized inbound request handed to each stage: method, URI, headers and
/// a fully buffered body. Stages only ever read it; the dispatcher gives
/// every stage its own copy.
pub type Request = axum::http::Request<Bytes>;

/// Response produced by a stage (or synthesized by the dispatcher).
pub type Response = axum::response::Response;

/// What a handler decided to do with a request.
///
/// Deferral is an ordinary variant rather than a thrown signal, so it can
/// never be confused with a handler failure: failures travel on the `Err`
/// channel of [`Handler::handle`].
#[derive(Debug)]
pub enum Outcome {
    /// This stage produced the final response for the request.
    Finalize(Response),
    /// This stage declines; the next stage in the chain gets the request.
    Defer,
}

impl Outcome {
    /// Finalize with anything axum can turn into a response.
    pub fn finalize(response: impl IntoResponse) -> Self {
        Outcome::Finalize(response.into_response())
    }
}

/// Per-invocation dispatch context. Its only capability is [`Context::next`],
/// the explicit "let the next stage try" operation.
#[derive(Debug, Clone, Copy, Default)]
pub struct Context(());

impl Context {
    pub fn new() -> Self {
        Context(())
    }

    /// Decline to handle the request. Returning the result (`return
    /// ctx.next()`) hands control to the next stage.
    pub fn next(&self) -> Outcome {
        Outcome::Defer
    }
}

/// One stage in the dispatch chain.
///
/// A handler reads the normalized request and either finalizes a response or
/// defers via [`Context::next`]. Any `Err` is contained by the dispatcher
/// and answered with a generic 500; it never aborts the chain for other
/// requests and is never shown to the client.
///
/// Handlers are registered once at chain construction and must tolerate
/// concurrent invocation; the chain provides no serialization.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, request: Request, ctx: Context) -> Result<Outcome, BoxError>;
}

/// Adapt an async closure into a [`Handler`].
pub fn handler_fn<F, Fut>(f: F) -> HandlerFn<F>
where
    F: Fn(Request, Context) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Outcome, BoxError>> + Send,
{
    HandlerFn { f }
}

/// A [`Handler`] backed by a closure. Built with [`handler_fn`].
pub struct HandlerFn<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> Handler for HandlerFn<F>
where
    F: Fn(Request, Context) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Outcome, BoxError>> + Send,
{
    async fn handle(&self, request: Request, ctx: Context) -> Result<Outcome, BoxError> {
        (self.f)(request, ctx).await
    }
}
