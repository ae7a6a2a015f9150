//! The [`Operation`] engine shared by the default controllers.
//!
//! Each step of a request (decode, fetch, validate, filter, persist, queue,
//! respond) is exposed separately so that custom controllers can reuse the
//! steps they need and replace the rest.

use std::sync::Arc;
use std::time::Duration;

use armrpc_core::{
    validate_etag, ProvisioningState, RequestContext, ResourceDataModel, ResourceId,
};
use http::{Method, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};

use super::{ControllerError, Options, ResourceOptions};
use crate::rest::{AsyncOperationResponse, Response};
use crate::service::operation::ArmRequest;
use crate::statusmanager::{QueueOperationOptions, StatusManager};
use crate::store::{Object, StorageClient};

/// Message returned when a resource is mutated while an operation is running.
pub const IN_PROGRESS_STATE_MESSAGE: &str = "The target resource is in progress state";

const JSON_CONTENT_TYPE: &str = "application/json";

/// Generic controller engine over the data model `T`.
pub struct Operation<T: ResourceDataModel> {
    options: Options,
    resource_options: ResourceOptions<T>,
}

impl<T: ResourceDataModel> Clone for Operation<T> {
    fn clone(&self) -> Self {
        Self {
            options: self.options.clone(),
            resource_options: self.resource_options.clone(),
        }
    }
}

impl<T: ResourceDataModel> Operation<T> {
    #[must_use]
    pub fn new(options: Options, resource_options: ResourceOptions<T>) -> Self {
        Self {
            options,
            resource_options,
        }
    }

    #[must_use]
    pub fn options(&self) -> &Options {
        &self.options
    }

    #[must_use]
    pub fn resource_options(&self) -> &ResourceOptions<T> {
        &self.resource_options
    }

    #[must_use]
    pub fn storage_client(&self) -> &Arc<dyn StorageClient> {
        &self.options.storage_client
    }

    #[must_use]
    pub fn status_manager(&self) -> &Arc<dyn StatusManager> {
        &self.options.status_manager
    }

    #[must_use]
    pub fn resource_type(&self) -> &str {
        &self.options.resource_type
    }

    /// Fetches the stored resource and its ETag. A missing resource is `None`.
    ///
    /// # Errors
    ///
    /// Propagates store failures other than not-found.
    pub async fn get_resource(&self, id: &ResourceId) -> Result<Option<(T, String)>, ControllerError> {
        match self.options.storage_client.get(id.as_str()).await {
            Ok(object) => {
                let resource = object.as_model::<T>()?;
                Ok(Some((resource, object.metadata.etag)))
            }
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Decodes the request body with the request converter.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::UnsupportedContentType`] unless the body is
    /// JSON, or the converter's error.
    pub fn get_resource_from_request(&self, ctx: &RequestContext, req: &ArmRequest) -> Result<T, ControllerError> {
        let content_type = req.header(http::header::CONTENT_TYPE.as_str());
        let media_type = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        if media_type != JSON_CONTENT_TYPE {
            return Err(ControllerError::UnsupportedContentType(content_type.to_string()));
        }
        Ok((self.resource_options.request_converter)(&req.body, &ctx.api_version)?)
    }

    /// Validates a write against the stored resource and stamps metadata on
    /// `new`. Returns the rejection response, if any.
    ///
    /// `etag` is the stored ETag, empty when nothing is stored.
    pub fn prepare_resource(
        &self,
        ctx: &RequestContext,
        method: &Method,
        new: Option<&mut T>,
        old: Option<&T>,
        etag: &str,
    ) -> Option<Response> {
        if *method == Method::PATCH && old.is_none() {
            return Some(Response::not_found(&ctx.resource_id));
        }

        if let Err(err) = validate_etag(ctx, etag) {
            return Some(Response::precondition_failed(
                ctx.resource_id.as_str(),
                err.to_string(),
            ));
        }

        if let Some(old) = old {
            let state = old.provisioning_state();
            if !state.is_terminal() {
                return Some(Response::conflict(format!("{IN_PROGRESS_STATE_MESSAGE}: {state}.")));
            }
        }

        if let Some(new) = new {
            new.update_metadata(ctx, old);
        }
        None
    }

    /// Runs the update filters in order; the first rejection wins.
    ///
    /// # Errors
    ///
    /// Propagates the first filter error.
    pub async fn run_update_filters(
        &self,
        ctx: &RequestContext,
        new: &mut T,
        old: Option<&T>,
    ) -> Result<Option<Response>, ControllerError> {
        for filter in &self.resource_options.update_filters {
            if let Some(resp) = filter.filter(ctx, new, old, &self.options).await? {
                return Ok(Some(resp));
            }
        }
        Ok(None)
    }

    /// Runs the delete filters in order; the first rejection wins.
    ///
    /// # Errors
    ///
    /// Propagates the first filter error.
    pub async fn run_delete_filters(&self, ctx: &RequestContext, old: &T) -> Result<Option<Response>, ControllerError> {
        for filter in &self.resource_options.delete_filters {
            if let Some(resp) = filter.filter(ctx, old, &self.options).await? {
                return Ok(Some(resp));
            }
        }
        Ok(None)
    }

    /// Saves `resource` under `id` and returns its new ETag.
    ///
    /// A non-empty `etag` makes the write conditional on the stored ETag.
    ///
    /// # Errors
    ///
    /// Propagates store failures, including concurrency conflicts.
    pub async fn save_resource(&self, id: &str, resource: &T, etag: &str) -> Result<String, ControllerError> {
        let mut object = Object::from_model(id, resource)?;
        let precondition = (!etag.is_empty()).then_some(etag);
        self.options.storage_client.save(&mut object, precondition).await?;
        Ok(object.metadata.etag)
    }

    /// Deletes the resource stored under `id`.
    ///
    /// # Errors
    ///
    /// Propagates store failures, including not-found.
    pub async fn delete_resource(&self, id: &str, etag: &str) -> Result<(), ControllerError> {
        let precondition = (!etag.is_empty()).then_some(etag);
        self.options.storage_client.delete(id, precondition).await?;
        Ok(())
    }

    /// Moves `resource` to `initial_state`, saves it, and queues the
    /// operation with `timeout` as the worker's deadline.
    ///
    /// `etag` is the precondition of the first save and receives the ETag of
    /// the last successful save. When queueing fails the resource is saved
    /// again as `Failed` and the queue error returned.
    ///
    /// # Errors
    ///
    /// Returns the store error of either save, or the queue error.
    pub async fn prepare_async_operation(
        &self,
        ctx: &RequestContext,
        resource: &mut T,
        initial_state: ProvisioningState,
        timeout: Duration,
        etag: &mut String,
    ) -> Result<(), ControllerError> {
        let id = ctx.resource_id.as_str();
        resource.set_provisioning_state(initial_state);
        *etag = self.save_resource(id, resource, etag).await?;

        let options = QueueOperationOptions {
            operation_timeout: timeout,
            retry_after: self.resource_options.async_operation_retry_after,
        };
        if let Err(queue_err) = self.options.status_manager.queue_async_operation(ctx, options).await {
            warn!(
                resource_id = %ctx.resource_id,
                operation_id = %ctx.operation_id,
                error = %queue_err,
                "failed to queue async operation, marking resource failed"
            );
            resource.set_provisioning_state(ProvisioningState::Failed);
            *etag = self.save_resource(id, resource, etag).await?;
            return Err(queue_err.into());
        }

        debug!(
            resource_id = %ctx.resource_id,
            operation_id = %ctx.operation_id,
            state = %initial_state,
            "queued async operation"
        );
        Ok(())
    }

    /// Encodes `resource` as the wire model of the request's api-version.
    ///
    /// # Errors
    ///
    /// Returns the converter's error.
    pub fn encode(&self, ctx: &RequestContext, resource: &T) -> Result<Value, ControllerError> {
        Ok((self.resource_options.response_converter)(resource, &ctx.api_version)?)
    }

    /// 200 with the versioned resource and its ETag.
    ///
    /// # Errors
    ///
    /// Returns the converter's error.
    pub fn construct_sync_response(&self, ctx: &RequestContext, etag: &str, resource: &T) -> Result<Response, ControllerError> {
        let body = self.encode(ctx, resource)?;
        let headers = if etag.is_empty() {
            Vec::new()
        } else {
            vec![(http::header::ETAG.as_str(), etag.to_string())]
        };
        Ok(Response::ok_with_headers(body, headers))
    }

    /// 201 when the request created the resource, 202 otherwise, with the
    /// polling headers of the operation.
    ///
    /// # Errors
    ///
    /// Returns the converter's error.
    pub fn construct_async_response(
        &self,
        ctx: &RequestContext,
        created: bool,
        etag: &str,
        resource: &T,
    ) -> Result<Response, ControllerError> {
        let body = self.encode(ctx, resource)?;
        let code = if created {
            StatusCode::CREATED
        } else {
            StatusCode::ACCEPTED
        };
        let mut resp = AsyncOperationResponse::new(
            body,
            ctx.location.clone(),
            code,
            ctx.resource_id.clone(),
            ctx.operation_id,
            ctx.api_version.clone(),
        );
        resp.retry_after = self.resource_options.async_operation_retry_after;
        if !etag.is_empty() {
            resp.etag = Some(etag.to_string());
        }
        Ok(Response::async_operation(resp))
    }

    #[must_use]
    pub fn async_operation_timeout(&self) -> Duration {
        self.resource_options.async_operation_timeout
    }

    #[must_use]
    pub fn async_operation_retry_after(&self) -> Duration {
        self.resource_options.async_operation_retry_after
    }

    #[must_use]
    pub fn list_recursive_query(&self) -> bool {
        self.resource_options.list_recursive_query
    }
}
