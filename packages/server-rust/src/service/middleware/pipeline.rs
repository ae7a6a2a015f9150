//! Pipeline composition: wraps the controller router in its middleware.

use axum::body::Body;
use tower::util::BoxCloneSyncService;
use tower::ServiceBuilder;

use super::metrics::MetricsLayer;
use super::timeout::TimeoutLayer;
use crate::service::operation::{ArmRequest, PipelineError};
use crate::service::router::ControllerRouter;

/// Type-erased request pipeline held by the HTTP handlers.
pub type RequestPipeline = BoxCloneSyncService<ArmRequest, http::Response<Body>, PipelineError>;

/// Builds the request pipeline around `router`.
///
/// Layer order (outermost to innermost):
/// 1. `MetricsLayer` -- records timing and outcome, including timeouts
/// 2. `TimeoutLayer` -- enforces the router's request deadline
#[must_use]
pub fn build_request_pipeline(router: ControllerRouter) -> RequestPipeline {
    let timeout = router.config().request_timeout;
    let svc = ServiceBuilder::new()
        .layer(MetricsLayer)
        .layer(TimeoutLayer::new(timeout))
        .service(router);
    BoxCloneSyncService::new(svc)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use armrpc_core::RequestContext;
    use async_trait::async_trait;
    use http::{Method, StatusCode};
    use tower::ServiceExt;

    use super::*;
    use crate::controller::{Controller, ControllerError};
    use crate::rest::Response;
    use crate::service::config::FrontendConfig;
    use crate::service::operation::{OperationMethod, OperationType};

    struct SlowController;

    #[async_trait]
    impl Controller for SlowController {
        async fn run(&self, _ctx: &RequestContext, _req: &ArmRequest) -> Result<Response, ControllerError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Response::no_content())
        }
    }

    struct NoContentController;

    #[async_trait]
    impl Controller for NoContentController {
        async fn run(&self, _ctx: &RequestContext, _req: &ArmRequest) -> Result<Response, ControllerError> {
            Ok(Response::no_content())
        }
    }

    const ID: &str = "/planes/radius/local/resourceGroups/rg/providers/Applications.Test/testResources/r1";

    fn router(controller: impl Controller + 'static) -> ControllerRouter {
        let config = FrontendConfig {
            request_timeout: Duration::from_millis(100),
            ..FrontendConfig::default()
        };
        let mut router = ControllerRouter::new(config);
        router.register(
            OperationType::new("Applications.Test/testResources", OperationMethod::Delete),
            controller,
        );
        router
    }

    #[tokio::test]
    async fn pipeline_routes_through_all_layers() {
        let svc = build_request_pipeline(router(NoContentController));
        let resp = svc
            .oneshot(ArmRequest::new(Method::DELETE, ID.parse().unwrap()))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test(start_paused = true)]
    async fn pipeline_times_out_slow_controllers() {
        let svc = build_request_pipeline(router(SlowController));
        let err = svc
            .oneshot(ArmRequest::new(Method::DELETE, ID.parse().unwrap()))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Timeout { timeout_ms: 100 }));
    }
}
