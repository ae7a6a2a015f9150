use armrpc_core::{OperationDisplay, PaginatedList, ProviderOperation, RequestContext};
use async_trait::async_trait;
use serde_json::Value;

use crate::controller::{Controller, ControllerError};
use crate::rest::Response;
use crate::service::operation::ArmRequest;

/// Lists the operations a resource provider exposes
/// (`GET /providers/<namespace>/operations`).
pub struct GetOperations {
    namespace: String,
    api_versions: Vec<String>,
    operations: Vec<ProviderOperation>,
}

impl GetOperations {
    /// Builds the list for `resource_types` (fully qualified, e.g.
    /// `Applications.Core/containers`). An empty `api_versions` accepts any
    /// api-version.
    #[must_use]
    pub fn new(namespace: impl Into<String>, resource_types: &[String], api_versions: Vec<String>) -> Self {
        let namespace = namespace.into();
        let mut operations = vec![operation(
            &namespace,
            "operations",
            "read",
            "Get operations",
            "Get the list of operations.",
        )];
        for resource_type in resource_types {
            let resource = resource_type
                .split_once('/')
                .map_or(resource_type.as_str(), |(_, t)| t);
            operations.push(operation(
                &namespace,
                resource,
                "read",
                &format!("Get/List {resource}"),
                &format!("Gets/Lists {resource} resource(s)."),
            ));
            operations.push(operation(
                &namespace,
                resource,
                "write",
                &format!("Create/Update {resource}"),
                &format!("Creates or updates a {resource} resource."),
            ));
            operations.push(operation(
                &namespace,
                resource,
                "delete",
                &format!("Delete {resource}"),
                &format!("Deletes a {resource} resource."),
            ));
        }
        Self {
            namespace,
            api_versions,
            operations,
        }
    }
}

fn operation(namespace: &str, resource: &str, verb: &str, title: &str, description: &str) -> ProviderOperation {
    ProviderOperation {
        name: format!("{namespace}/{resource}/{verb}"),
        display: OperationDisplay {
            provider: namespace.to_string(),
            resource: resource.to_string(),
            operation: title.to_string(),
            description: description.to_string(),
        },
        is_data_action: false,
    }
}

#[async_trait]
impl Controller for GetOperations {
    async fn run(&self, ctx: &RequestContext, _req: &ArmRequest) -> Result<Response, ControllerError> {
        if !self.api_versions.is_empty() && !self.api_versions.iter().any(|v| *v == ctx.api_version) {
            return Ok(Response::not_found_api_version(
                "operations",
                &self.namespace,
                &ctx.api_version,
            ));
        }

        let value = self
            .operations
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<Value>, _>>()
            .map_err(anyhow::Error::from)?;
        let list = PaginatedList { value, next_link: None };
        Ok(Response::ok(serde_json::to_value(list).map_err(anyhow::Error::from)?))
    }
}
