use armrpc_core::{ProvisioningState, RequestContext, ResourceDataModel};
use async_trait::async_trait;
use http::Method;

use crate::controller::{Controller, ControllerError, Operation, Options, ResourceOptions};
use crate::rest::Response;
use crate::service::operation::ArmRequest;

/// Creates or updates a resource through a queued async operation (PUT and
/// PATCH).
///
/// The resource is saved as `Accepted` and the background worker drives it
/// to a terminal state. Responds 201 for a new resource, 202 otherwise.
pub struct DefaultAsyncPut<T: ResourceDataModel> {
    operation: Operation<T>,
}

impl<T: ResourceDataModel> DefaultAsyncPut<T> {
    #[must_use]
    pub fn new(options: Options, resource_options: ResourceOptions<T>) -> Self {
        Self {
            operation: Operation::new(options, resource_options),
        }
    }
}

#[async_trait]
impl<T: ResourceDataModel> Controller for DefaultAsyncPut<T> {
    async fn run(&self, ctx: &RequestContext, req: &ArmRequest) -> Result<Response, ControllerError> {
        let mut new = self.operation.get_resource_from_request(ctx, req)?;
        let (old, mut etag) = match self.operation.get_resource(&ctx.resource_id).await? {
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

        let timeout = self.operation.async_operation_timeout();
        self.operation
            .prepare_async_operation(ctx, &mut new, ProvisioningState::Accepted, timeout, &mut etag)
            .await?;

        let created = old.is_none() && (req.method == Method::PUT || req.method == Method::POST);
        self.operation.construct_async_response(ctx, created, &etag, &new)
    }
}
