//! Catch-all handler that feeds ARM requests into the controller pipeline.

use axum::body::Body;
use axum::extract::{Request, State};
use http::StatusCode;
use tower::ServiceExt;
use tracing::{error, warn};

use super::AppState;
use crate::rest::Response;
use crate::service::{ArmRequest, PipelineError};

/// Buffers the request body and dispatches the request through the pipeline.
///
/// Pipeline failures are rendered as ARM error responses: a missed deadline
/// becomes 408 and anything else 500.
pub async fn arm_handler(State(state): State<AppState>, request: Request) -> http::Response<Body> {
    let _guard = state.shutdown.in_flight_guard();

    let (parts, body) = request.into_parts();
    let mut req = ArmRequest::new(parts.method, parts.uri);
    req.headers = parts.headers;
    req.tls = state.config.tls.is_some();

    match axum::body::to_bytes(body, state.config.max_body_bytes).await {
        Ok(bytes) => req.body = bytes,
        Err(err) => {
            warn!(error = %err, "failed to read request body");
            return render(Response::bad_request(format!("failed to read request body: {err}")), &req);
        }
    }

    let probe = req.clone();
    match state.pipeline.clone().oneshot(req).await {
        Ok(resp) => resp,
        Err(PipelineError::Timeout { timeout_ms }) => render(
            Response::request_timeout(format!("the request did not complete within {timeout_ms}ms")),
            &probe,
        ),
        Err(PipelineError::Internal(err)) => {
            error!(error = %err, uri = %probe.uri, "request pipeline failed");
            render(Response::internal_server_error(err.to_string()), &probe)
        }
    }
}

fn render(resp: Response, req: &ArmRequest) -> http::Response<Body> {
    resp.into_http(req).unwrap_or_else(|err| {
        error!(error = %err, "failed to render error response");
        let mut fallback = http::Response::new(Body::empty());
        *fallback.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        fallback
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use armrpc_core::RequestContext;
    use async_trait::async_trait;
    use http_body_util::BodyExt;

    use super::*;
    use crate::controller::{Controller, ControllerError};
    use crate::network::handlers::test_support::{empty_state, state_with};
    use crate::service::{ControllerRouter, FrontendConfig, OperationMethod, OperationType};

    const ID: &str = "/planes/radius/local/resourceGroups/rg/providers/Applications.Test/testResources/r1";

    struct EchoController;

    #[async_trait]
    impl Controller for EchoController {
        async fn run(&self, _ctx: &RequestContext, req: &ArmRequest) -> Result<Response, ControllerError> {
            let body: serde_json::Value = serde_json::from_slice(&req.body).map_err(anyhow::Error::from)?;
            Ok(Response::ok(body))
        }
    }

    struct SlowController;

    #[async_trait]
    impl Controller for SlowController {
        async fn run(&self, _ctx: &RequestContext, _req: &ArmRequest) -> Result<Response, ControllerError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Response::no_content())
        }
    }

    fn router_with(method: OperationMethod, controller: impl Controller + 'static) -> ControllerRouter {
        let mut router = ControllerRouter::new(FrontendConfig {
            request_timeout: Duration::from_millis(50),
            ..FrontendConfig::default()
        });
        router.register(OperationType::new("Applications.Test/testResources", method), controller);
        router
    }

    async fn json_body(resp: http::Response<Body>) -> serde_json::Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn request_body_reaches_controller() {
        let state = state_with(router_with(OperationMethod::Put, EchoController));
        let request = http::Request::builder()
            .method("PUT")
            .uri(ID)
            .body(Body::from(r#"{"properties":{"value":"v"}}"#))
            .unwrap();

        let resp = arm_handler(State(state.clone()), request).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json_body(resp).await["properties"]["value"], "v");
        assert_eq!(state.shutdown.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn unmatched_path_is_arm_not_found() {
        let request = http::Request::builder().uri(ID).body(Body::empty()).unwrap();

        let resp = arm_handler(State(empty_state()), request).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(resp).await["error"]["code"], "NotFound");
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_is_rendered_as_request_timeout() {
        let state = state_with(router_with(OperationMethod::Get, SlowController));
        let request = http::Request::builder().uri(ID).body(Body::empty()).unwrap();

        let resp = arm_handler(State(state), request).await;
        assert_eq!(resp.status(), StatusCode::REQUEST_TIMEOUT);
        assert_eq!(json_body(resp).await["error"]["code"], "RequestTimeout");
    }
}
