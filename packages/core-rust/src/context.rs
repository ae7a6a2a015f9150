//! Per-request ARM context.

use uuid::Uuid;

use crate::resource_id::ResourceId;
use crate::system_data::SystemData;

/// Request header names forwarded by ARM and UCP.
pub mod headers {
    pub const REFERER: &str = "referer";
    pub const CLIENT_REQUEST_ID: &str = "x-ms-client-request-id";
    pub const CORRELATION_REQUEST_ID: &str = "x-ms-correlation-request-id";
    pub const TRACEPARENT: &str = "traceparent";
    pub const HOME_TENANT_ID: &str = "x-ms-home-tenant-id";
    pub const CLIENT_TENANT_ID: &str = "x-ms-client-tenant-id";
    pub const CLIENT_PRINCIPAL_NAME: &str = "x-ms-client-principal-name";
    pub const CLIENT_PRINCIPAL_ID: &str = "x-ms-client-principal-id";
    pub const CLIENT_OBJECT_ID: &str = "x-ms-client-object-id";
    pub const CLIENT_APP_ID: &str = "x-ms-client-app-id";
    pub const ACCEPT_LANGUAGE: &str = "accept-language";
    pub const USER_AGENT: &str = "user-agent";
    pub const SYSTEM_DATA: &str = "x-ms-arm-resource-system-data";
    pub const IF_MATCH: &str = "if-match";
    pub const IF_NONE_MATCH: &str = "if-none-match";
    pub const FORWARDED_PROTO: &str = "x-forwarded-proto";
}

/// Query parameter names.
pub mod query {
    pub const API_VERSION: &str = "api-version";
    pub const SKIP_TOKEN: &str = "skipToken";
    pub const TOP: &str = "top";
}

/// Page size used when the request carries no `top` parameter.
pub const DEFAULT_QUERY_ITEM_COUNT: usize = 10;
/// Smallest accepted `top` value.
pub const MIN_QUERY_ITEM_COUNT: usize = 5;
/// Largest accepted `top` value.
pub const MAX_QUERY_ITEM_COUNT: usize = 20;

/// Location stamped on resources when none is configured.
pub const LOCATION_GLOBAL: &str = "global";

/// Errors from reading the paging query parameters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryParamError {
    #[error("unexpected value for top query parameter: '{0}'")]
    InvalidTop(String),
    #[error("top query parameter must be between 5 and 20, got {0}")]
    TopOutOfBounds(usize),
}

/// Parses the `top` query parameter, applying the default when absent.
///
/// # Errors
///
/// Returns [`QueryParamError`] when the value is not a number or falls
/// outside `MIN_QUERY_ITEM_COUNT..=MAX_QUERY_ITEM_COUNT`.
pub fn parse_top(value: Option<&str>) -> Result<usize, QueryParamError> {
    let Some(raw) = value.filter(|v| !v.is_empty()) else {
        return Ok(DEFAULT_QUERY_ITEM_COUNT);
    };
    let top: usize = raw
        .parse()
        .map_err(|_| QueryParamError::InvalidTop(raw.to_string()))?;
    if (MIN_QUERY_ITEM_COUNT..=MAX_QUERY_ITEM_COUNT).contains(&top) {
        Ok(top)
    } else {
        Err(QueryParamError::TopOutOfBounds(top))
    }
}

/// Per-request context carrying the addressed resource, caller identity,
/// concurrency preconditions, and paging parameters.
///
/// Built once by the front end and passed by reference to every controller.
/// Empty strings mean the corresponding header was absent.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Resource (or collection) addressed by the request path.
    pub resource_id: ResourceId,
    pub client_request_id: String,
    pub correlation_id: String,
    /// Fresh for every request; becomes the async operation ID.
    pub operation_id: Uuid,
    /// Routing key of the matched controller, e.g. `APPLICATIONS.CORE/CONTAINERS|PUT`.
    pub operation_type: String,
    pub traceparent: String,
    pub home_tenant_id: String,
    pub client_tenant_id: String,
    pub client_principal_name: String,
    pub client_principal_id: String,
    pub client_object_id: String,
    pub client_app_id: String,
    pub api_version: String,
    pub accept_language: String,
    pub client_referer: String,
    pub user_agent: String,
    /// Raw JSON of the system data header, parsed on demand.
    pub raw_system_metadata: String,
    /// Location of this resource provider, stamped on new resources.
    pub location: String,
    pub if_match: String,
    pub if_none_match: String,
    pub skip_token: String,
    pub top: usize,
    pub http_method: String,
    pub original_url: String,
}

impl RequestContext {
    /// Creates a context for the given resource with default paging and a
    /// fresh operation ID.
    #[must_use]
    pub fn new(resource_id: ResourceId) -> Self {
        Self {
            resource_id,
            client_request_id: String::new(),
            correlation_id: String::new(),
            operation_id: Uuid::new_v4(),
            operation_type: String::new(),
            traceparent: String::new(),
            home_tenant_id: String::new(),
            client_tenant_id: String::new(),
            client_principal_name: String::new(),
            client_principal_id: String::new(),
            client_object_id: String::new(),
            client_app_id: String::new(),
            api_version: String::new(),
            accept_language: String::new(),
            client_referer: String::new(),
            user_agent: String::new(),
            raw_system_metadata: String::new(),
            location: LOCATION_GLOBAL.to_string(),
            if_match: String::new(),
            if_none_match: String::new(),
            skip_token: String::new(),
            top: DEFAULT_QUERY_ITEM_COUNT,
            http_method: String::new(),
            original_url: String::new(),
        }
    }

    /// Parses the system data forwarded by ARM. A missing or malformed
    /// header yields empty system data.
    #[must_use]
    pub fn system_data(&self) -> SystemData {
        if self.raw_system_metadata.is_empty() {
            return SystemData::default();
        }
        serde_json::from_str(&self.raw_system_metadata).unwrap_or_else(|err| {
            tracing::debug!(error = %err, "ignoring malformed system data header");
            SystemData::default()
        })
    }
}
