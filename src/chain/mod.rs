//! Handler chain core.
//!
//! An ordered list of handlers becomes one request pipeline: each stage
//! either finalizes the response or defers to the next stage, explicitly via
//! [`Context::next`] or implicitly through the per-stage `next_if_404`
//! policy. Handler failures are contained at their stage and answered with a
//! generic 500.
//!
//! ## Key components
//!
//! - [`Handler`] - contract every stage satisfies ([`handler_fn`] adapts
//!   closures)
//! - [`Outcome`] - finalize-or-defer result of one invocation
//! - [`Chain`] - builder turning stages into a tower service
//! - [`DispatchLayer`] / [`DispatchService`] - one middleware unit per stage
//! - [`HostDefault`] - terminal 404 once every stage has deferred

mod dispatch;
mod handler;
mod stage;

pub use dispatch::{DispatchLayer, DispatchService, HostDefault};
pub use handler::{Context, Handler, HandlerFn, Outcome, Request, Response, handler_fn};
pub use stage::{Chain, ChainService, StageConfig};
