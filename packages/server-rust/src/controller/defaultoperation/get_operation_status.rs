use armrpc_core::RequestContext;
use async_trait::async_trait;

use crate::controller::{Controller, ControllerError, Options};
use crate::rest::Response;
use crate::service::operation::ArmRequest;
use crate::statusmanager::Status;

/// Returns the status record addressed by an `operationstatuses` URL.
pub struct GetOperationStatus {
    options: Options,
}

impl GetOperationStatus {
    #[must_use]
    pub fn new(options: Options) -> Self {
        Self { options }
    }
}

#[async_trait]
impl Controller for GetOperationStatus {
    async fn run(&self, ctx: &RequestContext, _req: &ArmRequest) -> Result<Response, ControllerError> {
        let object = match self.options.storage_client.get(ctx.resource_id.as_str()).await {
            Ok(object) => object,
            Err(err) if err.is_not_found() => return Ok(Response::not_found(&ctx.resource_id)),
            Err(err) => return Err(err.into()),
        };
        let status: Status = object.as_model()?;
        Ok(Response::ok(
            serde_json::to_value(status.operation).map_err(anyhow::Error::from)?,
        ))
    }
}
