//! Request metrics middleware.
//!
//! Wraps each request in a `tracing` span and records a request counter and
//! a latency histogram through the `metrics` facade. Without an installed
//! recorder the `metrics` calls are no-ops.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use axum::body::Body;
use tower::{Layer, Service};
use tracing::{info_span, Instrument};

use crate::service::operation::{ArmRequest, PipelineError};

/// Counter of completed requests, labelled by `method` and `status`.
pub const REQUESTS_TOTAL: &str = "armrpc_requests_total";
/// Histogram of request latency in seconds, labelled by `method`.
pub const REQUEST_DURATION_SECONDS: &str = "armrpc_request_duration_seconds";

// ---------------------------------------------------------------------------
// MetricsLayer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct MetricsLayer;

impl<S> Layer<S> for MetricsLayer {
    type Service = MetricsService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MetricsService { inner }
    }
}

// ---------------------------------------------------------------------------
// MetricsService
// ---------------------------------------------------------------------------

/// Service wrapper that records request duration and outcome.
#[derive(Debug, Clone)]
pub struct MetricsService<S> {
    inner: S,
}

impl<S> Service<ArmRequest> for MetricsService<S>
where
    S: Service<ArmRequest, Response = http::Response<Body>, Error = PipelineError> + Send,
    S::Future: Send + 'static,
{
    type Response = http::Response<Body>;
    type Error = PipelineError;
    type Future = Pin<Box<dyn Future<Output = Result<http::Response<Body>, PipelineError>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: ArmRequest) -> Self::Future {
        let method = req.method.to_string();
        let span = info_span!(
            "arm_request",
            method = %req.method,
            path = req.uri.path(),
            status = tracing::field::Empty,
            duration_ms = tracing::field::Empty,
        );

        let fut = self.inner.call(req);

        Box::pin(
            async move {
                let start = Instant::now();
                let result = fut.await;
                let elapsed = start.elapsed();

                let status = match &result {
                    Ok(resp) => resp.status().as_str().to_string(),
                    Err(PipelineError::Timeout { .. }) => "timeout".to_string(),
                    Err(PipelineError::Internal(_)) => "error".to_string(),
                };

                #[allow(clippy::cast_possible_truncation)]
                let duration_ms = elapsed.as_millis() as u64;
                tracing::Span::current().record("status", status.as_str());
                tracing::Span::current().record("duration_ms", duration_ms);
                tracing::debug!(status = %status, duration_ms, "request complete");

                metrics::counter!(REQUESTS_TOTAL, "method" => method.clone(), "status" => status)
                    .increment(1);
                metrics::histogram!(REQUEST_DURATION_SECONDS, "method" => method)
                    .record(elapsed.as_secs_f64());

                result
            }
            .instrument(span),
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use http::{Method, StatusCode};
    use tower::ServiceExt;

    use super::*;

    struct ImmediateService;

    impl Service<ArmRequest> for ImmediateService {
        type Response = http::Response<Body>;
        type Error = PipelineError;
        type Future =
            Pin<Box<dyn Future<Output = Result<http::Response<Body>, PipelineError>> + Send>>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, _req: ArmRequest) -> Self::Future {
            Box::pin(async move {
                let mut resp = http::Response::new(Body::empty());
                *resp.status_mut() = StatusCode::NO_CONTENT;
                Ok(resp)
            })
        }
    }

    #[tokio::test]
    async fn metrics_layer_passes_through_response() {
        let svc = MetricsLayer.layer(ImmediateService);
        let req = ArmRequest::new(Method::DELETE, "/planes/radius/local".parse().unwrap());

        let resp = svc.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    }
}
