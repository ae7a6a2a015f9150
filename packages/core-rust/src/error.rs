//! ARM error response payloads and error codes.

use serde::{Deserialize, Serialize};

/// Error codes used in ARM error responses.
pub mod codes {
    pub const INVALID: &str = "Invalid";
    pub const NOT_FOUND: &str = "NotFound";
    pub const CONFLICT: &str = "Conflict";
    pub const INTERNAL: &str = "Internal";
    pub const PRECONDITION_FAILED: &str = "PreconditionFailed";
    pub const INVALID_RESOURCE_TYPE: &str = "InvalidResourceType";
    pub const INVALID_REQUEST_CONTENT: &str = "InvalidRequestContent";
    pub const INVALID_API_VERSION_PARAMETER: &str = "InvalidApiVersionParameter";
    pub const INVALID_AUTHENTICATION_INFO: &str = "InvalidAuthenticationInfo";
    pub const HTTP_REQUEST_PAYLOAD_API_SPEC_VALIDATION_FAILED: &str =
        "HttpRequestPayloadAPISpecValidationFailed";
    pub const BAD_REQUEST: &str = "BadRequest";
    pub const METHOD_NOT_ALLOWED: &str = "MethodNotAllowed";
    pub const REQUEST_TIMEOUT: &str = "RequestTimeout";
}

/// Body of every failed ARM response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

impl ErrorResponse {
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetails::new(code, message),
        }
    }

    /// Sets the target of the top-level error.
    #[must_use]
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.error.target = target.into();
        self
    }
}

/// Code, message, and optional target of a single error.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub target: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<ErrorDetails>,
}

impl ErrorDetails {
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            target: String::new(),
            details: Vec::new(),
        }
    }
}
