use armrpc_core::{RequestContext, ResourceDataModel};
use async_trait::async_trait;

use crate::controller::{Controller, ControllerError, Operation, Options, ResourceOptions};
use crate::rest::Response;
use crate::service::operation::ArmRequest;

/// Returns one resource with its ETag.
pub struct GetResource<T: ResourceDataModel> {
    operation: Operation<T>,
}

impl<T: ResourceDataModel> GetResource<T> {
    #[must_use]
    pub fn new(options: Options, resource_options: ResourceOptions<T>) -> Self {
        Self {
            operation: Operation::new(options, resource_options),
        }
    }
}

#[async_trait]
impl<T: ResourceDataModel> Controller for GetResource<T> {
    async fn run(&self, ctx: &RequestContext, _req: &ArmRequest) -> Result<Response, ControllerError> {
        match self.operation.get_resource(&ctx.resource_id).await? {
            Some((resource, etag)) => self.operation.construct_sync_response(ctx, &etag, &resource),
            None => Ok(Response::not_found(&ctx.resource_id)),
        }
    }
}
