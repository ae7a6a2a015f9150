//! Pipeline types: the inbound request, its routing key, and pipeline errors.

use std::fmt;

use bytes::Bytes;
use http::{HeaderMap, Method, Uri};

// ---------------------------------------------------------------------------
// ArmRequest
// ---------------------------------------------------------------------------

/// An inbound ARM request with its body fully buffered.
#[derive(Debug, Clone)]
pub struct ArmRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// Whether the connection was accepted over TLS.
    pub tls: bool,
}

impl ArmRequest {
    /// Creates a request without a body.
    #[must_use]
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            tls: false,
        }
    }

    /// Returns the header value, or an empty string when absent or not UTF-8.
    #[must_use]
    pub fn header(&self, name: &str) -> &str {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map_or("", str::trim)
    }

    /// Returns the first value of a query parameter.
    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<String> {
        let query = self.uri.query()?;
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    }
}

// ---------------------------------------------------------------------------
// OperationType
// ---------------------------------------------------------------------------

/// Operation a controller is registered for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OperationMethod {
    Get,
    List,
    Put,
    Patch,
    Delete,
    /// Custom action on a resource; the action name is lower-cased.
    Post(String),
    GetOperationStatuses,
    GetOperationResult,
}

impl fmt::Display for OperationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => f.write_str("GET"),
            Self::List => f.write_str("LIST"),
            Self::Put => f.write_str("PUT"),
            Self::Patch => f.write_str("PATCH"),
            Self::Delete => f.write_str("DELETE"),
            Self::Post(action) => write!(f, "POST{}", action.to_ascii_uppercase()),
            Self::GetOperationStatuses => f.write_str("GETOPERATIONSTATUSES"),
            Self::GetOperationResult => f.write_str("GETOPERATIONRESULT"),
        }
    }
}

/// Routing key of a controller: a resource type plus an operation method.
///
/// The resource type is stored lower-cased so lookups ignore casing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OperationType {
    pub resource_type: String,
    pub method: OperationMethod,
}

impl OperationType {
    #[must_use]
    pub fn new(resource_type: &str, method: OperationMethod) -> Self {
        Self {
            resource_type: resource_type.to_ascii_lowercase(),
            method,
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.resource_type.to_ascii_uppercase(), self.method)
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised by the request pipeline itself rather than a controller.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}
