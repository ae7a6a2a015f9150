use armrpc_core::context::query;
use armrpc_core::{RequestContext, ResourceId};
use async_trait::async_trait;
use http::header::{LOCATION, RETRY_AFTER};

use crate::controller::{Controller, ControllerError, Options};
use crate::rest::{self_link, Response, DEFAULT_RETRY_AFTER};
use crate::service::operation::ArmRequest;
use crate::statusmanager::{Status, OPERATION_RESULTS, OPERATION_STATUSES};

/// Polling endpoint behind the `Location` header of async responses.
///
/// Responds 202 while the operation runs and 204 once it is terminal.
pub struct GetOperationResult {
    options: Options,
}

impl GetOperationResult {
    #[must_use]
    pub fn new(options: Options) -> Self {
        Self { options }
    }
}

#[async_trait]
impl Controller for GetOperationResult {
    async fn run(&self, ctx: &RequestContext, req: &ArmRequest) -> Result<Response, ControllerError> {
        let status_id = operation_status_id(&ctx.resource_id);
        let object = match self.options.storage_client.get(&status_id).await {
            Ok(object) => object,
            Err(err) if err.is_not_found() => return Ok(Response::not_found(&ctx.resource_id)),
            Err(err) => return Err(err.into()),
        };
        let status: Status = object.as_model()?;

        if status.operation.status.is_terminal() {
            return Ok(Response::no_content());
        }

        let retry_after = if status.retry_after_secs == 0 {
            DEFAULT_RETRY_AFTER.as_secs()
        } else {
            status.retry_after_secs
        };
        let location = self_link(req, &[(query::API_VERSION, ctx.api_version.as_str())])
            .map_err(anyhow::Error::from)?;
        Ok(Response::async_operation_result(vec![
            (LOCATION.as_str(), location),
            (RETRY_AFTER.as_str(), retry_after.to_string()),
        ]))
    }
}

/// Maps an `operationresults` ID to the ID of its status record.
fn operation_status_id(id: &ResourceId) -> String {
    let id = id.as_str().to_ascii_lowercase();
    let marker = format!("/{OPERATION_RESULTS}/");
    match id.rfind(&marker) {
        Some(pos) => format!(
            "{}/{OPERATION_STATUSES}/{}",
            &id[..pos],
            &id[pos + marker.len()..]
        ),
        None => id,
    }
}
