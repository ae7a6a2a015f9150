use armrpc_core::{ProvisioningState, RequestContext, ResourceDataModel};
use async_trait::async_trait;

use crate::controller::{Controller, ControllerError, Operation, Options, ResourceOptions};
use crate::rest::Response;
use crate::service::operation::ArmRequest;

/// Creates or updates a resource synchronously (PUT and PATCH).
pub struct DefaultSyncPut<T: ResourceDataModel> {
    operation: Operation<T>,
}

impl<T: ResourceDataModel> DefaultSyncPut<T> {
    #[must_use]
    pub fn new(options: Options, resource_options: ResourceOptions<T>) -> Self {
        Self {
            operation: Operation::new(options, resource_options),
        }
    }
}

#[async_trait]
impl<T: ResourceDataModel> Controller for DefaultSyncPut<T> {
    async fn run(&self, ctx: &RequestContext, req: &ArmRequest) -> Result<Response, ControllerError> {
        let mut new = self.operation.get_resource_from_request(ctx, req)?;
        let (old, etag) = match self.operation.get_resource(&ctx.resource_id).await? {
            Some((old, etag)) => (Some(old), etag),
            None => (None, String::new()),
        };

        if let Some(resp) = self
            .operation
            .prepare_resource(ctx, &req.method, Some(&mut new), old.as_ref(), &etag)
        {
            return Ok(resp);
        }
        if let Some(resp) = self.operation.run_update_filters(ctx, &mut new, old.as_ref()).await? {
            return Ok(resp);
        }

        new.set_provisioning_state(ProvisioningState::Succeeded);
        let etag = self
            .operation
            .save_resource(ctx.resource_id.as_str(), &new, &etag)
            .await?;
        self.operation.construct_sync_response(ctx, &etag, &new)
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use http::{Method, StatusCode};

    use super::*;
    use crate::controller::testutil::{
        test_ctx, test_options, MockStatusManager, MockStorageClient, TestResource, TEST_ID,
    };
    use crate::store::StoreError;

    fn put_request(method: Method, body: &str) -> ArmRequest {
        let mut req = ArmRequest::new(method, TEST_ID.parse().unwrap());
        req.headers
            .insert(http::header::CONTENT_TYPE, "application/json".parse().unwrap());
        req.body = Bytes::from(body.to_string());
        req
    }

    fn controller(store: &MockStorageClient) -> DefaultSyncPut<TestResource> {
        DefaultSyncPut::new(
            test_options(store.clone(), MockStatusManager::new()),
            TestResource::resource_options(),
        )
    }

    #[tokio::test]
    async fn put_creates_resource() {
        let store = MockStorageClient::new();
        store.push_get(Err(StoreError::NotFound { id: TEST_ID.into() }));
        store.push_save(Ok("etag-1".into()));

        let resp = controller(&store)
            .run(&test_ctx(), &put_request(Method::PUT, r#"{"properties":{"value":"a"}}"#))
            .await
            .unwrap();

        assert_eq!(resp.status_code(), StatusCode::OK);
        let saves = store.saves();
        assert_eq!(saves.len(), 1);
        assert_eq!(saves[0].precondition, None);
        assert_eq!(saves[0].state, ProvisioningState::Succeeded);
        assert_eq!(saves[0].data["properties"]["value"], "a");
        assert_eq!(saves[0].data["id"], TEST_ID);
    }

    #[tokio::test]
    async fn patch_updates_with_stored_etag() {
        let store = MockStorageClient::new();
        store.push_get(Ok(TestResource::stored(ProvisioningState::Succeeded, "etag-1")));
        store.push_save(Ok("etag-2".into()));

        let resp = controller(&store)
            .run(&test_ctx(), &put_request(Method::PATCH, r#"{"properties":{"value":"b"}}"#))
            .await
            .unwrap();

        match resp {
            Response::Ok { headers, .. } => assert_eq!(headers, vec![("etag", "etag-2".to_string())]),
            other => panic!("unexpected response {other:?}"),
        }
        assert_eq!(store.saves()[0].precondition.as_deref(), Some("etag-1"));
    }

    #[tokio::test]
    async fn patch_of_missing_resource_is_not_found() {
        let store = MockStorageClient::new();
        store.push_get(Err(StoreError::NotFound { id: TEST_ID.into() }));

        let resp = controller(&store)
            .run(&test_ctx(), &put_request(Method::PATCH, "{}"))
            .await
            .unwrap();
        assert_eq!(resp.status_code(), StatusCode::NOT_FOUND);
        assert!(store.saves().is_empty());
    }

    #[tokio::test]
    async fn update_of_in_progress_resource_conflicts() {
        let store = MockStorageClient::new();
        store.push_get(Ok(TestResource::stored(ProvisioningState::Updating, "etag-1")));

        let resp = controller(&store)
            .run(&test_ctx(), &put_request(Method::PUT, "{}"))
            .await
            .unwrap();
        assert_eq!(resp.status_code(), StatusCode::CONFLICT);
        assert!(store.saves().is_empty());
    }

    #[tokio::test]
    async fn if_none_match_star_rejects_existing_resource() {
        let store = MockStorageClient::new();
        store.push_get(Ok(TestResource::stored(ProvisioningState::Succeeded, "etag-1")));
        let mut ctx = test_ctx();
        ctx.if_none_match = "*".into();

        let resp = controller(&store)
            .run(&ctx, &put_request(Method::PUT, "{}"))
            .await
            .unwrap();
        assert_eq!(resp.status_code(), StatusCode::PRECONDITION_FAILED);
    }

    #[tokio::test]
    async fn concurrent_write_surfaces_store_error() {
        let store = MockStorageClient::new();
        store.push_get(Ok(TestResource::stored(ProvisioningState::Succeeded, "etag-1")));
        store.push_save(Err(StoreError::Concurrency));

        let err = controller(&store)
            .run(&test_ctx(), &put_request(Method::PUT, "{}"))
            .await
            .unwrap_err();
        assert!(matches!(err, ControllerError::Store(StoreError::Concurrency)));
    }
}
