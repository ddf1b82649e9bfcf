use std::convert::Infallible;
use std::sync::Arc;

use tower::util::BoxCloneSyncService;
use tower::{Layer, Service};

use super::dispatch::{DispatchLayer, HostDefault};
use super::handler::{Handler, Request, Response};
use crate::adapter::NativeChain;

/// Normalized stage record: one handler plus its fallthrough policy.
///
/// Both accepted input shapes — a bare handler and a handler-configuration
/// pair — resolve into this form when the chain is built, so dispatch never
/// re-branches on shape per request.
#[derive(Clone)]
pub struct StageConfig {
    pub handler: Arc<dyn Handler>,
    /// Treat this stage's own 404 response as an implicit defer.
    pub next_if_404: bool,
}

impl StageConfig {
    pub fn new(handler: impl Handler + 'static) -> Self {
        Self {
            handler: Arc::new(handler),
            next_if_404: false,
        }
    }

    pub fn next_if_404(mut self, next_if_404: bool) -> Self {
        self.next_if_404 = next_if_404;
        self
    }
}

/// The composed pipeline, type-erased so hosts can hold it.
pub type ChainService = BoxCloneSyncService<Request, Response, Infallible>;

/// Ordered list of stages, fixed once built into a service.
///
/// Stage order is registration order; stage *i* only sees a request if stage
/// *i−1* deferred, explicitly or through its 404 policy.
#[derive(Default)]
pub struct Chain {
    stages: Vec<StageConfig>,
}

impl Chain {
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// Append a bare handler. No fallthrough policy applies.
    pub fn stage(self, handler: impl Handler + 'static) -> Self {
        self.stage_with(StageConfig::new(handler))
    }

    /// Append a handler-configuration pair.
    pub fn stage_with(mut self, config: StageConfig) -> Self {
        self.stages.push(config);
        self
    }

    /// Compose the stages over the built-in host default (a plain 404 once
    /// every stage has deferred).
    pub fn into_service(self) -> ChainService {
        self.into_service_with(HostDefault)
    }

    /// Compose the stages over the host's own continuation. The innermost
    /// service is reached exactly when every stage defers.
    pub fn into_service_with<S>(self, host_default: S) -> ChainService
    where
        S: Service<Request, Response = Response, Error = Infallible>
            + Clone
            + Send
            + Sync
            + 'static,
        S::Future: Send + 'static,
    {
        let mut service = BoxCloneSyncService::new(host_default);
        for stage in self.stages.into_iter().rev() {
            service = BoxCloneSyncService::new(DispatchLayer::new(stage).layer(service));
        }
        service
    }

    /// Compose the stages and wrap them for mounting behind the native
    /// transport (for example `Router::fallback_service`).
    pub fn into_native(self) -> NativeChain {
        NativeChain::new(self.into_service())
    }
}
