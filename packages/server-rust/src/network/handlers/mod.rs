//! HTTP handlers and the state they share.

pub mod arm;
pub mod health;

pub use arm::arm_handler;
pub use health::{health_handler, liveness_handler, readiness_handler};

use std::sync::Arc;
use std::time::Instant;

use super::{NetworkConfig, ShutdownController};
use crate::service::RequestPipeline;

/// Shared application state passed to all axum handlers via `State` extraction.
#[derive(Clone)]
pub struct AppState {
    /// Graceful shutdown controller with health state and in-flight tracking.
    pub shutdown: Arc<ShutdownController>,
    pub config: Arc<NetworkConfig>,
    /// Controller pipeline every ARM request is dispatched through.
    pub pipeline: RequestPipeline,
    /// Server process start time, used for uptime calculation.
    pub start_time: Instant,
}
