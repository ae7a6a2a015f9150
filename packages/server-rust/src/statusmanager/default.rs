//! Store-backed [`StatusManager`].

use std::sync::Arc;

use armrpc_core::{
    AsyncOperationStatus, ErrorDetails, ProvisioningState, RequestContext, ResourceId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use super::queue::{QueueClient, QueueMessage};
use super::{operation_status_id, QueueOperationOptions, Status, StatusManager, StatusManagerError};
use crate::store::{Object, StorageClient};

/// Keeps status records in a [`StorageClient`] and hands operations to a
/// [`QueueClient`].
pub struct DefaultStatusManager {
    storage: Arc<dyn StorageClient>,
    queue: Arc<dyn QueueClient>,
    location: String,
}

impl DefaultStatusManager {
    /// `location` is the provider location used in status record IDs.
    #[must_use]
    pub fn new(
        storage: Arc<dyn StorageClient>,
        queue: Arc<dyn QueueClient>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            storage,
            queue,
            location: location.into(),
        }
    }

    fn status_id(&self, resource_id: &ResourceId, operation_id: Uuid) -> String {
        operation_status_id(resource_id, &self.location, operation_id)
    }
}

#[async_trait]
impl StatusManager for DefaultStatusManager {
    async fn get(
        &self,
        resource_id: &ResourceId,
        operation_id: Uuid,
    ) -> Result<Status, StatusManagerError> {
        let object = self
            .storage
            .get(&self.status_id(resource_id, operation_id))
            .await?;
        Ok(object.as_model()?)
    }

    async fn queue_async_operation(
        &self,
        ctx: &RequestContext,
        options: QueueOperationOptions,
    ) -> Result<(), StatusManagerError> {
        let operation_id = ctx.operation_id;
        let status_id = self.status_id(&ctx.resource_id, operation_id);

        let status = Status {
            operation: AsyncOperationStatus {
                id: status_id.clone(),
                name: operation_id.to_string(),
                status: ProvisioningState::Accepted,
                start_time: Utc::now(),
                end_time: None,
                error: None,
            },
            linked_resource_id: ctx.resource_id.to_string(),
            location: self.location.clone(),
            retry_after_secs: options.retry_after.as_secs(),
            home_tenant_id: ctx.home_tenant_id.clone(),
            client_object_id: ctx.client_object_id.clone(),
            last_updated_time: None,
        };
        let mut object = Object::from_model(&status_id, &status)?;
        self.storage.save(&mut object, None).await?;

        let message = QueueMessage {
            operation_id,
            operation_type: ctx.operation_type.clone(),
            resource_id: ctx.resource_id.to_string(),
            correlation_id: ctx.correlation_id.clone(),
            traceparent: ctx.traceparent.clone(),
            accept_language: ctx.accept_language.clone(),
            home_tenant_id: ctx.home_tenant_id.clone(),
            client_object_id: ctx.client_object_id.clone(),
            api_version: ctx.api_version.clone(),
            operation_timeout_secs: options.operation_timeout.as_secs(),
        };

        if let Err(err) = self.queue.enqueue(message).await {
            if let Err(delete_err) = self.storage.delete(&status_id, None).await {
                warn!(%status_id, error = %delete_err, "failed to remove status record after enqueue failure");
            }
            return Err(StatusManagerError::Queue(err));
        }

        debug!(%status_id, operation_type = %ctx.operation_type, "queued async operation");
        Ok(())
    }

    async fn update(
        &self,
        resource_id: &ResourceId,
        operation_id: Uuid,
        state: ProvisioningState,
        end_time: Option<DateTime<Utc>>,
        error: Option<ErrorDetails>,
    ) -> Result<(), StatusManagerError> {
        let status_id = self.status_id(resource_id, operation_id);
        let stored = self.storage.get(&status_id).await?;
        let mut status: Status = stored.as_model()?;

        status.operation.status = state;
        status.operation.end_time = end_time;
        status.operation.error = error;
        status.last_updated_time = Some(Utc::now());

        let mut object = Object::from_model(&status_id, &status)?;
        self.storage
            .save(&mut object, Some(&stored.metadata.etag))
            .await?;
        Ok(())
    }

    async fn delete(
        &self,
        resource_id: &ResourceId,
        operation_id: Uuid,
    ) -> Result<(), StatusManagerError> {
        self.storage
            .delete(&self.status_id(resource_id, operation_id), None)
            .await?;
        Ok(())
    }
}
