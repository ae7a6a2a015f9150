//! Tower middleware layers for the controller pipeline.
//!
//! - [`timeout`]: Per-request deadline enforcement
//! - [`metrics`]: Request timing and counting
//! - [`pipeline`]: Composes all layers into a single service stack

pub mod metrics;
pub mod pipeline;
pub mod timeout;

pub use metrics::MetricsLayer;
pub use pipeline::{build_request_pipeline, RequestPipeline};
pub use timeout::TimeoutLayer;
