//! Response kinds and their HTTP rendering.

use std::time::Duration;

use armrpc_core::context::headers;
use armrpc_core::{codes, parse_path_base, ErrorResponse, ResourceId};
use axum::body::Body;
use http::header::{CONTENT_TYPE, ETAG, HOST, LOCATION, RETRY_AFTER};
use http::{HeaderName, HeaderValue, StatusCode};
use serde_json::Value;
use tracing::info;
use url::Url;
use uuid::Uuid;

use crate::service::operation::ArmRequest;

const AZURE_ASYNC_OPERATION: &str = "azure-asyncoperation";
/// Polling URL segments as ARM clients expect them. Status records and
/// routing use the lower-cased forms.
const OPERATION_RESULTS_SEGMENT: &str = "operationResults";
const OPERATION_STATUSES_SEGMENT: &str = "operationStatuses";
const JSON_CONTENT_TYPE: &str = "application/json";

/// Polling interval advertised when none is configured.
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(60);

/// Errors while rendering a [`Response`].
#[derive(Debug, thiserror::Error)]
pub enum ResponseError {
    #[error("failed to serialize response body: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("invalid response header value for {name}")]
    InvalidHeader { name: String },
    #[error("failed to build polling url: {0}")]
    Location(String),
}

// ---------------------------------------------------------------------------
// Response
// ---------------------------------------------------------------------------

/// Outcome of a controller, rendered to HTTP by [`Response::into_http`].
#[derive(Debug, Clone)]
pub enum Response {
    /// 200 with an optional JSON body and extra headers.
    Ok {
        body: Option<Value>,
        headers: Vec<(&'static str, String)>,
    },
    /// 201 with a JSON body.
    Created { body: Value },
    /// 201 with a `Location` header pointing at `location` on this host.
    CreatedAsync {
        body: Value,
        location: String,
        scheme: String,
    },
    /// 202 with a `Location` header pointing at `location` on this host.
    AcceptedAsync {
        body: Value,
        location: String,
        scheme: String,
    },
    /// 201/202 with the async polling headers.
    AsyncOperation(Box<AsyncOperationResponse>),
    /// 202 for an operation result that is still in progress.
    AsyncOperationResult {
        headers: Vec<(&'static str, String)>,
    },
    NoContent,
    BadRequest(ErrorResponse),
    ClientAuthenticationFailed(ErrorResponse),
    NotFound(ErrorResponse),
    MethodNotAllowed(ErrorResponse),
    RequestTimeout(ErrorResponse),
    Conflict(ErrorResponse),
    PreconditionFailed(ErrorResponse),
    InternalServerError(ErrorResponse),
}

impl Response {
    #[must_use]
    pub fn ok(body: Value) -> Self {
        Self::Ok {
            body: Some(body),
            headers: Vec::new(),
        }
    }

    /// 200 with no body.
    #[must_use]
    pub fn ok_empty() -> Self {
        Self::Ok {
            body: None,
            headers: Vec::new(),
        }
    }

    #[must_use]
    pub fn ok_with_headers(body: Value, headers: Vec<(&'static str, String)>) -> Self {
        Self::Ok {
            body: Some(body),
            headers,
        }
    }

    #[must_use]
    pub fn created(body: Value) -> Self {
        Self::Created { body }
    }

    #[must_use]
    pub fn created_async(body: Value, location: impl Into<String>, scheme: impl Into<String>) -> Self {
        Self::CreatedAsync {
            body,
            location: location.into(),
            scheme: scheme.into(),
        }
    }

    #[must_use]
    pub fn accepted_async(body: Value, location: impl Into<String>, scheme: impl Into<String>) -> Self {
        Self::AcceptedAsync {
            body,
            location: location.into(),
            scheme: scheme.into(),
        }
    }

    #[must_use]
    pub fn async_operation(response: AsyncOperationResponse) -> Self {
        Self::AsyncOperation(Box::new(response))
    }

    #[must_use]
    pub fn async_operation_result(headers: Vec<(&'static str, String)>) -> Self {
        Self::AsyncOperationResult { headers }
    }

    #[must_use]
    pub fn no_content() -> Self {
        Self::NoContent
    }

    /// 400 with code `Invalid`.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(ErrorResponse::new(codes::INVALID, message))
    }

    /// 400 with code `HttpRequestPayloadAPISpecValidationFailed`.
    #[must_use]
    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::BadRequest(ErrorResponse::new(
            codes::HTTP_REQUEST_PAYLOAD_API_SPEC_VALIDATION_FAILED,
            message,
        ))
    }

    #[must_use]
    pub fn client_authentication_failed(target: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ClientAuthenticationFailed(
            ErrorResponse::new(codes::INVALID_AUTHENTICATION_INFO, message).with_target(target),
        )
    }

    #[must_use]
    pub fn not_found(id: &ResourceId) -> Self {
        Self::NotFound(
            ErrorResponse::new(
                codes::NOT_FOUND,
                format!("the resource with id '{id}' was not found"),
            )
            .with_target(id.to_string()),
        )
    }

    #[must_use]
    pub fn not_found_message(message: impl Into<String>) -> Self {
        Self::NotFound(ErrorResponse::new(codes::NOT_FOUND, message))
    }

    /// 404 for a path that matches no registered resource type.
    #[must_use]
    pub fn no_resource_match(path: &str) -> Self {
        Self::NotFound(
            ErrorResponse::new(
                codes::NOT_FOUND,
                format!("the specified path \"{path}\" did not match any resource"),
            )
            .with_target(path),
        )
    }

    /// 404 for a resource type served only under other api versions.
    #[must_use]
    pub fn not_found_api_version(resource_type: &str, namespace: &str, api_version: &str) -> Self {
        Self::NotFound(ErrorResponse::new(
            codes::INVALID_RESOURCE_TYPE,
            format!(
                "The resource type '{resource_type}' could not be found in the namespace '{namespace}' for api version '{api_version}'."
            ),
        ))
    }

    #[must_use]
    pub fn method_not_allowed(target: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MethodNotAllowed(
            ErrorResponse::new(codes::METHOD_NOT_ALLOWED, message).with_target(target),
        )
    }

    #[must_use]
    pub fn request_timeout(message: impl Into<String>) -> Self {
        Self::RequestTimeout(ErrorResponse::new(codes::REQUEST_TIMEOUT, message))
    }

    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(ErrorResponse::new(codes::CONFLICT, message))
    }

    #[must_use]
    pub fn precondition_failed(target: impl Into<String>, message: impl Into<String>) -> Self {
        Self::PreconditionFailed(
            ErrorResponse::new(codes::PRECONDITION_FAILED, message).with_target(target),
        )
    }

    #[must_use]
    pub fn internal_server_error(message: impl Into<String>) -> Self {
        Self::InternalServerError(ErrorResponse::new(codes::INTERNAL, message))
    }

    /// HTTP status code this response renders with.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Ok { .. } => StatusCode::OK,
            Self::Created { .. } | Self::CreatedAsync { .. } => StatusCode::CREATED,
            Self::AcceptedAsync { .. } | Self::AsyncOperationResult { .. } => StatusCode::ACCEPTED,
            Self::AsyncOperation(resp) => resp.code,
            Self::NoContent => StatusCode::NO_CONTENT,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::ClientAuthenticationFailed(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            Self::RequestTimeout(_) => StatusCode::REQUEST_TIMEOUT,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::PreconditionFailed(_) => StatusCode::PRECONDITION_FAILED,
            Self::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Renders the response for `req`.
    ///
    /// # Errors
    ///
    /// Returns [`ResponseError`] if the body cannot be serialized or a
    /// header (including a derived polling URL) is not representable.
    pub fn into_http(self, req: &ArmRequest) -> Result<http::Response<Body>, ResponseError> {
        let code = self.status_code();
        info!(status_code = code.as_u16(), "responding with status code");

        let mut builder = HttpResponseBuilder::new(code);
        match self {
            Self::Ok { body, headers } => {
                for (name, value) in headers {
                    builder.header(name, &value)?;
                }
                if let Some(body) = body {
                    builder.json(&body)?;
                }
            }
            Self::Created { body } => builder.json(&body)?,
            Self::CreatedAsync {
                body,
                location,
                scheme,
            }
            | Self::AcceptedAsync {
                body,
                location,
                scheme,
            } => {
                let origin = RequestOrigin::from_request(req);
                builder.header(LOCATION.as_str(), &format!("{scheme}://{}{location}", origin.host))?;
                builder.json(&body)?;
            }
            Self::AsyncOperation(resp) => {
                let location = resp.polling_url(req, OPERATION_RESULTS_SEGMENT);
                let async_operation = resp.polling_url(req, OPERATION_STATUSES_SEGMENT);
                builder.header(LOCATION.as_str(), &location)?;
                builder.header(AZURE_ASYNC_OPERATION, &async_operation)?;
                builder.header(RETRY_AFTER.as_str(), &resp.retry_after.as_secs().to_string())?;
                if let Some(etag) = &resp.etag {
                    builder.header(ETAG.as_str(), etag)?;
                }
                builder.json(&resp.body)?;
            }
            Self::AsyncOperationResult { headers } => {
                for (name, value) in headers {
                    builder.header(name, &value)?;
                }
            }
            Self::NoContent => {}
            Self::BadRequest(body)
            | Self::ClientAuthenticationFailed(body)
            | Self::NotFound(body)
            | Self::MethodNotAllowed(body)
            | Self::RequestTimeout(body)
            | Self::Conflict(body)
            | Self::PreconditionFailed(body)
            | Self::InternalServerError(body) => builder.json(&body)?,
        }
        Ok(builder.finish())
    }
}

// ---------------------------------------------------------------------------
// AsyncOperationResponse
// ---------------------------------------------------------------------------

/// Response to a request that queued an async operation.
///
/// Renders `Location` (operation result URL), `Azure-AsyncOperation`
/// (operation status URL), and `Retry-After` in whole seconds.
#[derive(Debug, Clone)]
pub struct AsyncOperationResponse {
    pub body: Value,
    /// Provider location used in the polling URLs.
    pub location: String,
    pub code: StatusCode,
    pub resource_id: ResourceId,
    pub operation_id: Uuid,
    pub api_version: String,
    /// Scope of the polling URLs; defaults to the resource's plane scope.
    pub root_scope: String,
    /// Path prefix of the polling URLs; defaults to the prefix of the
    /// caller's path.
    pub path_base: String,
    pub retry_after: Duration,
    pub etag: Option<String>,
}

impl AsyncOperationResponse {
    #[must_use]
    pub fn new(
        body: Value,
        location: impl Into<String>,
        code: StatusCode,
        resource_id: ResourceId,
        operation_id: Uuid,
        api_version: impl Into<String>,
    ) -> Self {
        Self {
            body,
            location: location.into(),
            code,
            resource_id,
            operation_id,
            api_version: api_version.into(),
            root_scope: String::new(),
            path_base: String::new(),
            retry_after: DEFAULT_RETRY_AFTER,
            etag: None,
        }
    }

    /// Builds `<scheme>://<host><base><rootScope>/providers/<ns>/locations/<loc>/<kind>/<id>?api-version=<v>`.
    ///
    /// Rendered after the operation is queued, so it never fails: an
    /// unknown host yields an empty authority.
    fn polling_url(&self, req: &ArmRequest, kind: &str) -> String {
        let origin = RequestOrigin::from_request(req);

        let base = if self.path_base.is_empty() {
            parse_path_base(&origin.path).to_string()
        } else {
            self.path_base.clone()
        };
        let root_scope = if self.root_scope.is_empty() {
            self.resource_id.plane_scope()
        } else {
            self.root_scope.clone()
        };
        let api_version: String = url::form_urlencoded::byte_serialize(self.api_version.as_bytes()).collect();
        format!(
            "{}://{}{base}{root_scope}/providers/{}/locations/{}/{kind}/{}?api-version={api_version}",
            origin.scheme,
            origin.host,
            self.resource_id.provider_namespace(),
            self.location,
            self.operation_id
        )
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Scheme, host, and path the caller used to reach us.
///
/// Taken from `Referer` when present (ARM forwards the public URL there),
/// otherwise from the request URI and `Host` header. `X-Forwarded-Proto`
/// overrides the scheme.
struct RequestOrigin {
    scheme: String,
    host: String,
    path: String,
}

impl RequestOrigin {
    fn from_request(req: &ArmRequest) -> Self {
        let (mut scheme, mut host, path) = match Url::parse(req.header(headers::REFERER)) {
            Ok(referer) => {
                let host = match (referer.host_str(), referer.port()) {
                    (Some(h), Some(p)) => format!("{h}:{p}"),
                    (Some(h), None) => h.to_string(),
                    (None, _) => String::new(),
                };
                (referer.scheme().to_string(), host, referer.path().to_string())
            }
            Err(_) => (
                req.uri.scheme_str().unwrap_or_default().to_string(),
                req.uri.authority().map(ToString::to_string).unwrap_or_default(),
                req.uri.path().to_string(),
            ),
        };

        if host.is_empty() {
            host = req.header(HOST.as_str()).to_string();
        }
        let forwarded = req.header(headers::FORWARDED_PROTO);
        if !forwarded.is_empty() {
            scheme = forwarded.to_string();
        }
        if scheme.is_empty() {
            scheme = if req.tls { "https" } else { "http" }.to_string();
        }

        Self { scheme, host, path }
    }
}

/// Builds a URL to the path the caller requested, with `query` as its query
/// string. Scheme and host are resolved like the polling URLs.
///
/// # Errors
///
/// Returns [`ResponseError::Location`] if the caller's host is not a valid URL authority.
pub fn self_link(req: &ArmRequest, query: &[(&str, &str)]) -> Result<String, ResponseError> {
    let origin = RequestOrigin::from_request(req);
    let mut url = Url::parse(&format!("{}://{}", origin.scheme, origin.host))
        .map_err(|e| ResponseError::Location(e.to_string()))?;
    url.set_path(&origin.path);
    if !query.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (name, value) in query {
            pairs.append_pair(name, value);
        }
    }
    Ok(url.into())
}

struct HttpResponseBuilder {
    response: http::Response<Body>,
}

impl HttpResponseBuilder {
    fn new(code: StatusCode) -> Self {
        let mut response = http::Response::new(Body::empty());
        *response.status_mut() = code;
        Self { response }
    }

    fn header(&mut self, name: &str, value: &str) -> Result<(), ResponseError> {
        let invalid = || ResponseError::InvalidHeader {
            name: name.to_string(),
        };
        let name = HeaderName::try_from(name).map_err(|_| invalid())?;
        let value = HeaderValue::try_from(value).map_err(|_| invalid())?;
        self.response.headers_mut().insert(name, value);
        Ok(())
    }

    fn json<T: serde::Serialize>(&mut self, body: &T) -> Result<(), ResponseError> {
        let bytes = serde_json::to_vec_pretty(body)?;
        self.response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
        *self.response.body_mut() = Body::from(bytes);
        Ok(())
    }

    fn finish(self) -> http::Response<Body> {
        self.response
    }
}

#[cfg(test)]
mod tests {
    use http::Method;
    use http_body_util::BodyExt;
    use serde_json::json;

    use super::*;

    const ID: &str =
        "/planes/radius/local/resourceGroups/test-rg/providers/Applications.Core/containers/c1";

    fn request(uri: &str) -> ArmRequest {
        let mut req = ArmRequest::new(Method::PUT, uri.parse().unwrap());
        req.headers.insert(HOST, "localhost:8080".parse().unwrap());
        req
    }

    fn async_response(code: StatusCode) -> AsyncOperationResponse {
        let mut resp = AsyncOperationResponse::new(
            json!({"name": "c1"}),
            "global",
            code,
            ResourceId::parse(ID).unwrap(),
            Uuid::nil(),
            "2023-10-01-preview",
        );
        resp.retry_after = Duration::from_millis(2002);
        resp.etag = Some("etag-1".to_string());
        resp
    }

    async fn body_json(resp: http::Response<Body>) -> Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn header<'a>(resp: &'a http::Response<Body>, name: &str) -> &'a str {
        resp.headers().get(name).unwrap().to_str().unwrap()
    }

    #[tokio::test]
    async fn async_response_sets_polling_headers() {
        let req = request(&format!("{ID}?api-version=2023-10-01-preview"));
        let resp = Response::async_operation(async_response(StatusCode::CREATED))
            .into_http(&req)
            .unwrap();

        assert_eq!(resp.status(), StatusCode::CREATED);
        assert_eq!(
            header(&resp, "location"),
            "http://localhost:8080/planes/radius/local/providers/Applications.Core/locations/global/operationResults/00000000-0000-0000-0000-000000000000?api-version=2023-10-01-preview"
        );
        assert_eq!(
            header(&resp, "azure-asyncoperation"),
            "http://localhost:8080/planes/radius/local/providers/Applications.Core/locations/global/operationStatuses/00000000-0000-0000-0000-000000000000?api-version=2023-10-01-preview"
        );
        assert_eq!(header(&resp, "retry-after"), "2");
        assert_eq!(header(&resp, "etag"), "etag-1");
        assert_eq!(body_json(resp).await["name"], "c1");
    }

    #[tokio::test]
    async fn async_response_prefers_referer_and_forwarded_proto() {
        let mut req = request(ID);
        req.headers.insert(
            "referer",
            format!("http://management.example.com/apis/api.ucp.dev/v1alpha3{ID}?api-version=x")
                .parse()
                .unwrap(),
        );
        req.headers.insert("x-forwarded-proto", "https".parse().unwrap());

        let resp = Response::async_operation(async_response(StatusCode::ACCEPTED))
            .into_http(&req)
            .unwrap();
        assert_eq!(resp.status(), StatusCode::ACCEPTED);
        assert!(header(&resp, "location").starts_with(
            "https://management.example.com/apis/api.ucp.dev/v1alpha3/planes/radius/local/providers/"
        ));
    }

    #[test]
    fn self_link_keeps_caller_path_and_replaces_query() {
        let mut req = request(ID);
        req.headers.insert(
            "referer",
            format!("https://management.example.com{ID}?api-version=old").parse().unwrap(),
        );

        let link = self_link(&req, &[("api-version", "2023-10-01-preview"), ("skipToken", "abc")]).unwrap();
        assert_eq!(
            link,
            format!("https://management.example.com{ID}?api-version=2023-10-01-preview&skipToken=abc")
        );
    }

    #[tokio::test]
    async fn async_response_uses_tls_scheme_and_explicit_root_scope() {
        let mut req = request(ID);
        req.tls = true;
        let mut resp = async_response(StatusCode::ACCEPTED);
        resp.root_scope = "/planes/radius/local/resourceGroups/test-rg".to_string();

        let resp = Response::async_operation(resp).into_http(&req).unwrap();
        assert!(header(&resp, "azure-asyncoperation").starts_with(
            "https://localhost:8080/planes/radius/local/resourceGroups/test-rg/providers/Applications.Core/locations/global/operationStatuses/"
        ));
    }

    #[tokio::test]
    async fn async_response_renders_without_host() {
        let req = ArmRequest::new(Method::PUT, ID.parse().unwrap());

        let resp = Response::async_operation(async_response(StatusCode::CREATED))
            .into_http(&req)
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        assert_eq!(
            header(&resp, "location"),
            "http:///planes/radius/local/providers/Applications.Core/locations/global/operationResults/00000000-0000-0000-0000-000000000000?api-version=2023-10-01-preview"
        );
        assert!(header(&resp, "azure-asyncoperation").contains("/operationStatuses/"));
    }

    #[tokio::test]
    async fn ok_renders_body_and_headers() {
        let resp = Response::ok_with_headers(json!({"a": 1}), vec![("etag", "abc".to_string())])
            .into_http(&request(ID))
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(header(&resp, "etag"), "abc");
        assert_eq!(header(&resp, "content-type"), "application/json");
        assert_eq!(body_json(resp).await["a"], 1);
    }

    #[tokio::test]
    async fn ok_without_body_is_empty() {
        let resp = Response::ok_empty().into_http(&request(ID)).unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.headers().get("content-type").is_none());
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        assert!(bytes.is_empty());
    }

    #[tokio::test]
    async fn accepted_async_points_at_location_on_host() {
        let resp = Response::accepted_async(json!({}), "/operations/1", "https")
            .into_http(&request(ID))
            .unwrap();
        assert_eq!(resp.status(), StatusCode::ACCEPTED);
        assert_eq!(header(&resp, "location"), "https://localhost:8080/operations/1");
    }

    #[tokio::test]
    async fn error_responses_carry_structured_body() {
        let id = ResourceId::parse(ID).unwrap();
        let resp = Response::not_found(&id).into_http(&request(ID)).unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body = body_json(resp).await;
        assert_eq!(body["error"]["code"], "NotFound");
        assert_eq!(body["error"]["message"], format!("the resource with id '{ID}' was not found"));
        assert_eq!(body["error"]["target"], ID);

        let resp = Response::precondition_failed(ID, "etags do not match")
            .into_http(&request(ID))
            .unwrap();
        assert_eq!(resp.status(), StatusCode::PRECONDITION_FAILED);
        assert_eq!(body_json(resp).await["error"]["message"], "etags do not match");
    }

    #[test]
    fn status_codes() {
        assert_eq!(Response::no_content().status_code(), StatusCode::NO_CONTENT);
        assert_eq!(Response::conflict("x").status_code(), StatusCode::CONFLICT);
        assert_eq!(Response::bad_request("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            Response::method_not_allowed("t", "m").status_code(),
            StatusCode::METHOD_NOT_ALLOWED
        );
        assert_eq!(
            Response::async_operation_result(vec![]).status_code(),
            StatusCode::ACCEPTED
        );
    }
}
