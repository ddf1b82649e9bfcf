//! Boundary between the host transport's native request/response pair and
//! the normalized pair handlers see.
//!
//! Normalization buffers the native body once; sending is the identity
//! because the chain already produces native axum responses.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::task::Poll;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use http_body_util::BodyExt;
use thiserror::Error;
use tower::{Service, ServiceExt};

use crate::chain::{ChainService, Request, Response};

/// The host transport's request representation.
pub type NativeRequest = axum::extract::Request;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("failed to buffer request body: {0}")]
    BodyRead(#[from] axum::Error),
}

/// Convert a native request into the normalized, fully buffered form.
pub async fn normalize(request: NativeRequest) -> Result<Request, AdapterError> {
    let (parts, body) = request.into_parts();
    let bytes = body.collect().await?.to_bytes();
    Ok(Request::from_parts(parts, bytes))
}

/// The composed chain wrapped for the native transport, mountable via
/// `Router::fallback_service` or served directly.
#[derive(Clone)]
pub struct NativeChain {
    chain: ChainService,
}

impl NativeChain {
    pub fn new(chain: ChainService) -> Self {
        Self { chain }
    }
}

impl Service<NativeRequest> for NativeChain {
    type Response = Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Response, Infallible>> + Send>>;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> Poll<Result<(), Infallible>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: NativeRequest) -> Self::Future {
        let chain = self.chain.clone();

        Box::pin(async move {
            // A body that cannot be read is a transport-level failure, not a
            // handler failure; it never enters the chain.
            let request = match normalize(request).await {
                Ok(request) => request,
                Err(error) => {
                    tracing::warn!(%error, "failed to adapt native request");
                    return Ok(StatusCode::BAD_REQUEST.into_response());
                }
            };
            chain.oneshot(request).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[tokio::test]
    async fn test_normalize_buffers_body_and_keeps_parts() {
        let native = axum::http::Request::builder()
            .method("POST")
            .uri("/submit?retry=1")
            .header("x-probe", "yes")
            .body(Body::from("hello"))
            .unwrap();

        let normalized = normalize(native).await.unwrap();
        assert_eq!(normalized.method(), "POST");
        assert_eq!(normalized.uri(), "/submit?retry=1");
        assert_eq!(normalized.headers().get("x-probe").unwrap(), "yes");
        assert_eq!(normalized.body().as_ref(), b"hello");
    }
}
