//! Async operation status tracking and queueing.
//!
//! A [`StatusManager`] owns the durable status record of every async
//! operation and hands the operation to a background queue. The record is
//! created `Accepted` when the operation is queued, moved to a terminal
//! state exactly once by the worker via [`StatusManager::update`], and kept
//! until [`StatusManager::delete`] prunes it.

pub mod default;
pub mod queue;

use std::time::Duration;

use armrpc_core::{
    AsyncOperationStatus, ErrorDetails, ProvisioningState, RequestContext, ResourceId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use default::DefaultStatusManager;
pub use queue::{InMemoryQueue, QueueClient, QueueMessage};

use crate::store::StoreError;

/// Resource type segment under which status records are stored.
pub const OPERATION_STATUSES: &str = "operationstatuses";
/// Resource type segment clients poll for the operation result.
pub const OPERATION_RESULTS: &str = "operationresults";

/// Errors returned by a [`StatusManager`].
#[derive(Debug, thiserror::Error)]
pub enum StatusManagerError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("failed to queue async operation: {0}")]
    Queue(#[source] anyhow::Error),
}

/// Per-operation settings supplied when queueing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueOperationOptions {
    /// Deadline for the background worker.
    pub operation_timeout: Duration,
    /// Polling interval suggested to clients.
    pub retry_after: Duration,
}

/// Stored status record of an async operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    #[serde(flatten)]
    pub operation: AsyncOperationStatus,
    /// Resource the operation acts on.
    pub linked_resource_id: String,
    pub location: String,
    #[serde(rename = "retryAfter")]
    pub retry_after_secs: u64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub home_tenant_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub client_object_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated_time: Option<DateTime<Utc>>,
}

/// Tracks async operation status records and queues operations.
///
/// `resource_id` identifies the resource the operation acts on; the status
/// record ID is derived from it (see [`operation_status_id`]).
///
/// Used as `Arc<dyn StatusManager>`.
#[async_trait]
pub trait StatusManager: Send + Sync {
    /// Fetches the status record of an operation.
    async fn get(
        &self,
        resource_id: &ResourceId,
        operation_id: Uuid,
    ) -> Result<Status, StatusManagerError>;

    /// Creates the `Accepted` status record and enqueues the operation
    /// described by `ctx`. When enqueueing fails the record is removed and
    /// the queue error returned.
    async fn queue_async_operation(
        &self,
        ctx: &RequestContext,
        options: QueueOperationOptions,
    ) -> Result<(), StatusManagerError>;

    /// Records a state transition of an operation.
    async fn update(
        &self,
        resource_id: &ResourceId,
        operation_id: Uuid,
        state: ProvisioningState,
        end_time: Option<DateTime<Utc>>,
        error: Option<ErrorDetails>,
    ) -> Result<(), StatusManagerError>;

    /// Removes the status record of an operation.
    async fn delete(
        &self,
        resource_id: &ResourceId,
        operation_id: Uuid,
    ) -> Result<(), StatusManagerError>;
}

/// Builds the status record ID of an operation on `resource_id`:
/// `<planeScope>/providers/<namespace>/locations/<location>/operationstatuses/<operationId>`.
///
/// The namespace is lower-cased so that records written and polled with
/// different casing resolve to the same key.
#[must_use]
pub fn operation_status_id(resource_id: &ResourceId, location: &str, operation_id: Uuid) -> String {
    format!(
        "{}/providers/{}/locations/{}/{}/{}",
        resource_id.plane_scope(),
        resource_id.provider_namespace().to_ascii_lowercase(),
        location,
        OPERATION_STATUSES,
        operation_id
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_id_uses_plane_scope_and_lowercase_namespace() {
        let id = ResourceId::parse(
            "/planes/radius/local/resourceGroups/rg/providers/Applications.Core/containers/c1",
        )
        .unwrap();
        let op = Uuid::nil();
        assert_eq!(
            operation_status_id(&id, "global", op),
            "/planes/radius/local/providers/applications.core/locations/global/operationstatuses/00000000-0000-0000-0000-000000000000"
        );
    }
}
