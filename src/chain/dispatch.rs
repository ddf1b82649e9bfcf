use std::convert::Infallible;
use std::future::{Future, Ready, ready};
use std::pin::Pin;
use std::task::Poll;

use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use tower::{Layer, Service, ServiceExt};

use super::handler::{Context, Outcome, Request, Response};
use super::stage::StageConfig;

/// Body and reason phrase of the synthesized containment response.
const INTERNAL_ERROR_BODY: &str = "Internal Server Error";

/// Wraps the "proceed to next" service with one stage's dispatch unit.
pub struct DispatchLayer {
    stage: StageConfig,
}

impl DispatchLayer {
    pub fn new(stage: StageConfig) -> Self {
        Self { stage }
    }
}

impl<S> Layer<S> for DispatchLayer {
    type Service = DispatchService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        DispatchService {
            stage: self.stage.clone(),
            inner,
        }
    }
}

/// One stage of the chain as a tower middleware.
///
/// Per request the unit invokes its handler and classifies the outcome:
/// - a finalized response is sent as-is, unless its status is 404 and the
///   stage opted into `next_if_404`, in which case the response is discarded
///   and the inner service advances the request;
/// - an explicit defer advances the request to the inner service;
/// - a handler error is contained at this stage and answered with a generic
///   `500 Internal Server Error` (the error is logged, never sent).
///
/// The inner service is the host's own chaining primitive, so deferral
/// composes across pipeline stages, not just within handlers.
#[derive(Clone)]
pub struct DispatchService<S> {
    stage: StageConfig,
    inner: S,
}

impl<S> Service<Request> for DispatchService<S>
where
    S: Service<Request, Response = Response, Error = Infallible> + Clone + Send + Sync + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Response, Infallible>> + Send>>;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> Poll<Result<(), Infallible>> {
        // Readiness of the inner service is driven by `oneshot` on advance.
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let stage = self.stage.clone();
        let inner = self.inner.clone();

        Box::pin(async move {
            let outcome = stage
                .handler
                .handle(duplicate(&request), Context::new())
                .await;

            match outcome {
                Ok(Outcome::Finalize(response)) => {
                    if response.status() == StatusCode::NOT_FOUND && stage.next_if_404 {
                        tracing::debug!(
                            uri = %request.uri(),
                            "stage returned 404 with fallthrough enabled, advancing"
                        );
                        inner.oneshot(request).await
                    } else {
                        Ok(response)
                    }
                }
                Ok(Outcome::Defer) => inner.oneshot(request).await,
                Err(error) => {
                    tracing::error!(
                        method = %request.method(),
                        uri = %request.uri(),
                        %error,
                        "handler failed, responding with generic 500"
                    );
                    Ok(internal_server_error())
                }
            }
        })
    }
}

/// Terminal service standing in for the host transport's default behavior
/// once every stage has deferred.
#[derive(Clone, Copy, Debug, Default)]
pub struct HostDefault;

impl Service<Request> for HostDefault {
    type Response = Response;
    type Error = Infallible;
    type Future = Ready<Result<Response, Infallible>>;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> Poll<Result<(), Infallible>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, _request: Request) -> Self::Future {
        ready(Ok(StatusCode::NOT_FOUND.into_response()))
    }
}

/// Each stage gets its own copy of the normalized request. The buffered body
/// is cheap to share; extensions are not part of the normalized form and are
/// not carried.
fn duplicate(request: &Request) -> Request {
    let mut copy = Request::new(request.body().clone());
    *copy.method_mut() = request.method().clone();
    *copy.uri_mut() = request.uri().clone();
    *copy.version_mut() = request.version();
    *copy.headers_mut() = request.headers().clone();
    copy
}

/// Synthesized response for a contained handler failure. The client always
/// receives this fixed payload, never the error's detail.
fn internal_server_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        [(header::CONTENT_TYPE, mime::TEXT_PLAIN.as_ref())],
        INTERNAL_ERROR_BODY,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::handler::handler_fn;
    use bytes::Bytes;
    use std::sync::Arc;

    fn request(path: &str) -> Request {
        axum::http::Request::builder()
            .uri(path)
            .body(Bytes::new())
            .unwrap()
    }

    fn stage_returning_404(next_if_404: bool) -> StageConfig {
        StageConfig {
            handler: Arc::new(handler_fn(|_request, _ctx| async move {
                Ok(Outcome::finalize((StatusCode::NOT_FOUND, "stage 404")))
            })),
            next_if_404,
        }
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn test_duplicate_copies_request() {
        let original = axum::http::Request::builder()
            .method("POST")
            .uri("/echo?q=1")
            .header("x-probe", "yes")
            .body(Bytes::from("payload"))
            .unwrap();

        let copy = duplicate(&original);
        assert_eq!(copy.method(), original.method());
        assert_eq!(copy.uri(), original.uri());
        assert_eq!(copy.headers().get("x-probe").unwrap(), "yes");
        assert_eq!(copy.body(), original.body());
    }

    #[tokio::test]
    async fn test_error_contained_as_generic_500() {
        let stage = StageConfig {
            handler: Arc::new(handler_fn(|_request, _ctx| async move {
                Err("boom".into())
            })),
            next_if_404: false,
        };
        let service = DispatchLayer::new(stage).layer(HostDefault);

        let response = service.oneshot(request("/any")).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/plain"
        );
        assert_eq!(body_string(response).await, "Internal Server Error");
    }

    #[tokio::test]
    async fn test_defer_advances_to_inner() {
        let stage = StageConfig {
            handler: Arc::new(handler_fn(|_request, ctx: Context| async move {
                Ok(ctx.next())
            })),
            next_if_404: false,
        };
        let service = DispatchLayer::new(stage).layer(HostDefault);

        let response = service.oneshot(request("/any")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_404_policy_discards_stage_response() {
        let service = DispatchLayer::new(stage_returning_404(true)).layer(HostDefault);

        let response = service.oneshot(request("/any")).await.unwrap();
        // The stage's 404 body is discarded; the host default answers.
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_string(response).await, "");
    }

    #[tokio::test]
    async fn test_404_without_policy_finalizes() {
        let service = DispatchLayer::new(stage_returning_404(false)).layer(HostDefault);

        let response = service.oneshot(request("/any")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_string(response).await, "stage 404");
    }
}
