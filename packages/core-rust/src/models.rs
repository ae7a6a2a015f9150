//! Shared resource and operation data models.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::context::RequestContext;
use crate::error::ErrorDetails;
use crate::provisioning::ProvisioningState;
use crate::system_data::{update_system_data, SystemData};

/// ARM tracked resource properties.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackedResource {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub location: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

/// Bookkeeping fields kept alongside every stored resource.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InternalMetadata {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub tenant_id: String,
    pub created_api_version: String,
    pub updated_api_version: String,
    pub async_provisioning_state: ProvisioningState,
}

/// Common part of every resource data model.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseResource {
    #[serde(flatten)]
    pub tracked: TrackedResource,
    #[serde(flatten)]
    pub internal: InternalMetadata,
    #[serde(default)]
    pub system_data: SystemData,
}

impl BaseResource {
    /// Stamps identity, api versions, and system data for a write.
    ///
    /// An update keeps the identity of the stored record; a create derives it
    /// from the request.
    pub fn update_metadata(&mut self, ctx: &RequestContext, old: Option<&BaseResource>) {
        let incoming = ctx.system_data();
        match old {
            Some(old) => {
                self.tracked.id.clone_from(&old.tracked.id);
                self.tracked.name.clone_from(&old.tracked.name);
                self.tracked.resource_type.clone_from(&old.tracked.resource_type);
                self.tracked.location.clone_from(&old.tracked.location);
                self.internal.tenant_id.clone_from(&old.internal.tenant_id);
                self.internal
                    .created_api_version
                    .clone_from(&old.internal.created_api_version);
                self.system_data = update_system_data(&old.system_data, &incoming);
            }
            None => {
                self.tracked.id = ctx.resource_id.to_string();
                self.tracked.name = ctx.resource_id.name();
                self.tracked.resource_type = ctx.resource_id.resource_type();
                self.tracked.location.clone_from(&ctx.location);
                self.internal.tenant_id.clone_from(&ctx.home_tenant_id);
                self.internal.created_api_version.clone_from(&ctx.api_version);
                self.system_data = update_system_data(&SystemData::default(), &incoming);
            }
        }
        self.internal.updated_api_version.clone_from(&ctx.api_version);
    }
}

/// Client-visible status of an asynchronous operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AsyncOperationStatus {
    pub id: String,
    pub name: String,
    pub status: ProvisioningState,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetails>,
}

/// One page of a list response.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedList {
    pub value: Vec<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_link: Option<String>,
}

/// An entry of a provider's available-operations list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderOperation {
    /// `<namespace>/<resource>/<read|write|delete|action>`.
    pub name: String,
    pub display: OperationDisplay,
    pub is_data_action: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationDisplay {
    pub provider: String,
    pub resource: String,
    pub operation: String,
    pub description: String,
}
