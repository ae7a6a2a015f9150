use armrpc_core::{RequestContext, ResourceDataModel};
use async_trait::async_trait;
use tracing::debug;

use crate::controller::{Controller, ControllerError, Operation, Options, ResourceOptions};
use crate::rest::Response;
use crate::service::operation::ArmRequest;
use crate::store::StoreError;

/// Deletes a resource synchronously.
///
/// Deleting a resource that does not exist succeeds with 204.
pub struct DefaultSyncDelete<T: ResourceDataModel> {
    operation: Operation<T>,
}

impl<T: ResourceDataModel> DefaultSyncDelete<T> {
    #[must_use]
    pub fn new(options: Options, resource_options: ResourceOptions<T>) -> Self {
        Self {
            operation: Operation::new(options, resource_options),
        }
    }
}

#[async_trait]
impl<T: ResourceDataModel> Controller for DefaultSyncDelete<T> {
    async fn run(&self, ctx: &RequestContext, req: &ArmRequest) -> Result<Response, ControllerError> {
        let Some((old, etag)) = self.operation.get_resource(&ctx.resource_id).await? else {
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

        match self.operation.delete_resource(ctx.resource_id.as_str(), &etag).await {
            Ok(()) => Ok(Response::ok_empty()),
            Err(ControllerError::Store(StoreError::NotFound { .. })) => {
                debug!(resource_id = %ctx.resource_id, "resource already deleted");
                Ok(Response::no_content())
            }
            Err(err) => Err(err),
        }
    }
}
