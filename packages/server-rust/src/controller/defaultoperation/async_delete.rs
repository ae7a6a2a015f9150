use armrpc_core::{ProvisioningState, RequestContext, ResourceDataModel};
use async_trait::async_trait;

use crate::controller::{Controller, ControllerError, Operation, Options, ResourceOptions};
use crate::rest::Response;
use crate::service::operation::ArmRequest;

/// Deletes a resource through a queued async operation.
///
/// Deleting a resource that does not exist succeeds with 204 and touches
/// neither the store nor the status manager.
pub struct DefaultAsyncDelete<T: ResourceDataModel> {
    operation: Operation<T>,
}

impl<T: ResourceDataModel> DefaultAsyncDelete<T> {
    #[must_use]
    pub fn new(options: Options, resource_options: ResourceOptions<T>) -> Self {
        Self {
            operation: Operation::new(options, resource_options),
        }
    }
}

#[async_trait]
impl<T: ResourceDataModel> Controller for DefaultAsyncDelete<T> {
    async fn run(&self, ctx: &RequestContext, req: &ArmRequest) -> Result<Response, ControllerError> {
        let Some((mut old, mut etag)) = self.operation.get_resource(&ctx.resource_id).await? else {
            return Ok(Response::no_content());
        };

        if let Some(resp) = self
            .operation
            .prepare_resource(ctx, &req.method, None, Some(&old), &etag)
        {
            return Ok(resp);
        }
        if let Some(resp) = self.operation.run_delete_filters(ctx, &old).await? {
            return Ok(resp);
        }

        let timeout = self.operation.async_operation_timeout();
        self.operation
            .prepare_async_operation(ctx, &mut old, ProvisioningState::Accepted, timeout, &mut etag)
            .await?;
        self.operation.construct_async_response(ctx, false, &etag, &old)
    }
}

#[cfg(test)]
mod tests {
    use http::{Method, StatusCode};

    use super::*;
    use crate::controller::testutil::{
        test_ctx, test_options, MockStatusManager, MockStorageClient, TestResource, TEST_ID,
    };
    use crate::statusmanager::StatusManagerError;
    use crate::store::StoreError;

    fn controller(store: &MockStorageClient, status: &MockStatusManager) -> DefaultAsyncDelete<TestResource> {
        DefaultAsyncDelete::new(
            test_options(store.clone(), status.clone()),
            TestResource::resource_options(),
        )
    }

    fn delete_request() -> ArmRequest {
        ArmRequest::new(Method::DELETE, TEST_ID.parse().unwrap())
    }

    #[tokio::test]
    async fn missing_resource_short_circuits_to_no_content() {
        let store = MockStorageClient::new();
        store.push_get(Err(StoreError::NotFound { id: TEST_ID.into() }));
        let status = MockStatusManager::new();

        let resp = controller(&store, &status)
            .run(&test_ctx(), &delete_request())
            .await
            .unwrap();

        assert_eq!(resp.status_code(), StatusCode::NO_CONTENT);
        assert!(store.saves().is_empty());
        assert!(status.queued().is_empty());
    }

    #[tokio::test]
    async fn delete_is_accepted_with_polling_headers() {
        let store = MockStorageClient::new();
        store.push_get(Ok(TestResource::stored(ProvisioningState::Succeeded, "etag-1")));
        store.push_save(Ok("etag-2".into()));
        let status = MockStatusManager::new();
        status.push_queue(Ok(()));

        let resp = controller(&store, &status)
            .run(&test_ctx(), &delete_request())
            .await
            .unwrap();

        assert_eq!(resp.status_code(), StatusCode::ACCEPTED);
        assert!(matches!(resp, Response::AsyncOperation(_)));
        let saves = store.saves();
        assert_eq!(saves[0].state, ProvisioningState::Accepted);
        assert_eq!(saves[0].precondition.as_deref(), Some("etag-1"));
        assert!(store.deletes().is_empty());
    }

    #[tokio::test]
    async fn queue_failure_rolls_back_to_failed() {
        let store = MockStorageClient::new();
        store.push_get(Ok(TestResource::stored(ProvisioningState::Succeeded, "etag-1")));
        store.push_save(Ok("etag-2".into()));
        store.push_save(Ok("etag-3".into()));
        let status = MockStatusManager::new();
        status.push_queue(Err(StatusManagerError::Queue(anyhow::anyhow!("queue is down"))));

        let err = controller(&store, &status)
            .run(&test_ctx(), &delete_request())
            .await
            .unwrap_err();

        assert!(matches!(err, ControllerError::StatusManager(_)));
        assert_eq!(store.saves()[1].state, ProvisioningState::Failed);
    }
}
