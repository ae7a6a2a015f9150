//! Request routing and execution.
//!
//! 1. **Classification** (`classify`): method and path to an [`OperationType`]
//! 2. **Routing** (`router`): builds the request context and dispatches to
//!    the registered controller
//! 3. **Middleware** (`middleware`): Tower layers (metrics, timeout) around
//!    the router

pub mod classify;
pub mod config;
pub mod middleware;
pub mod operation;
pub mod router;

pub use config::FrontendConfig;
pub use middleware::{build_request_pipeline, RequestPipeline};
pub use operation::{ArmRequest, OperationMethod, OperationType, PipelineError};
pub use router::{ControllerRouter, ExecutionMode};
