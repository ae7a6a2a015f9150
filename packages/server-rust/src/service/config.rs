use std::time::Duration;

use armrpc_core::LOCATION_GLOBAL;

/// Front-end configuration for request routing and controllers.
#[derive(Debug, Clone)]
pub struct FrontendConfig {
    /// Prefix stripped from request paths before parsing resource IDs,
    /// e.g. `/apis/api.ucp.dev/v1alpha3`.
    pub path_base: String,
    /// Location of this resource provider, used in status record IDs and
    /// polling URLs.
    pub location: String,
    /// Provider namespace served by this front end, e.g. `Applications.Core`.
    pub provider_namespace: String,
    /// Worker deadline for async operations of registered resource types.
    pub operation_timeout: Duration,
    /// Deadline for a single request through the controller pipeline.
    pub request_timeout: Duration,
}

impl Default for FrontendConfig {
    fn default() -> Self {
        Self {
            path_base: String::new(),
            location: LOCATION_GLOBAL.to_string(),
            provider_namespace: "Applications.Core".to_string(),
            operation_timeout: Duration::from_secs(120),
            request_timeout: Duration::from_secs(30),
        }
    }
}
