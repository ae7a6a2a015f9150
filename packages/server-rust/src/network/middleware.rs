//! HTTP middleware stack applied to every request.
//!
//! Ordering follows the outer-to-inner convention: the first layer listed
//! processes the request first and the response last.

use axum::http::header::HeaderName;
use axum::http::Method;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::map_response_body::MapResponseBodyLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use super::config::NetworkConfig;

type HttpLayers = tower::layer::util::Stack<
    PropagateRequestIdLayer,
    tower::layer::util::Stack<
        RequestBodyLimitLayer,
        tower::layer::util::Stack<
            MapResponseBodyLayer<BodyLimitToAxumBody>,
            tower::layer::util::Stack<
            CorsLayer,
            tower::layer::util::Stack<
                CompressionLayer,
                tower::layer::util::Stack<
                    TraceLayer<
                        tower_http::classify::SharedClassifier<
                            tower_http::classify::ServerErrorsAsFailures,
                        >,
                    >,
                    tower::layer::util::Stack<
                        SetRequestIdLayer<MakeRequestUuid>,
                        tower::layer::util::Identity,
                    >,
                >,
            >,
        >,
    >,
    >,
>;

type BodyLimitToAxumBody =
    fn(tower_http::limit::ResponseBody<axum::body::Body>) -> axum::body::Body;

/// Builds the transport middleware.
///
/// **Outermost to innermost:**
/// 1. `SetRequestId` -- assigns an `X-Request-Id` to every request
/// 2. `Tracing` -- request/response spans
/// 3. `Compression` -- gzip responses
/// 4. `CORS` -- configured origins
/// 5. `RequestBodyLimit` -- rejects oversized bodies with 413
/// 6. `PropagateRequestId` -- copies `X-Request-Id` to the response
///
/// The request deadline is enforced by the controller pipeline, which
/// renders timeouts as ARM error responses.
#[must_use]
pub fn build_http_layers(config: &NetworkConfig) -> HttpLayers {
    let x_request_id = HeaderName::from_static("x-request-id");

    ServiceBuilder::new()
        .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(build_cors_layer(&config.cors_origins))
        .layer(MapResponseBodyLayer::new(
            axum::body::Body::new as BodyLimitToAxumBody,
        ))
        .layer(RequestBodyLimitLayer::new(config.max_body_bytes))
        .layer(PropagateRequestIdLayer::new(x_request_id))
        .into_inner()
}

fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let parsed: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::POST,
        ])
        .allow_headers(Any)
}
