//! Generic CRUD controller engine.
//!
//! A [`Controller`] serves one operation of one resource type. The default
//! controllers in [`defaultoperation`] share the [`Operation`] engine, which
//! is generic over the resource data model and configured per resource type
//! with [`ResourceOptions`].

pub mod defaultoperation;
pub mod error;
pub mod operation;

#[cfg(test)]
pub(crate) mod testutil;

use std::sync::Arc;
use std::time::Duration;

use armrpc_core::{ConversionError, RequestContext, ResourceDataModel, ResourceIdError};
use async_trait::async_trait;
use serde_json::Value;

pub use error::handle_error;
pub use operation::{Operation, IN_PROGRESS_STATE_MESSAGE};

use crate::rest::{Response, DEFAULT_RETRY_AFTER};
use crate::service::operation::ArmRequest;
use crate::statusmanager::{StatusManager, StatusManagerError};
use crate::store::{StorageClient, StoreError};

/// Deadline handed to the background worker when none is configured.
pub const DEFAULT_ASYNC_OPERATION_TIMEOUT: Duration = Duration::from_secs(120);
/// Polling interval advertised to clients when none is configured.
pub const DEFAULT_ASYNC_OPERATION_RETRY_AFTER: Duration = DEFAULT_RETRY_AFTER;

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

/// Handles one operation type. Validation failures are returned as
/// `Ok(Response)`; infrastructure failures as `Err`.
#[async_trait]
pub trait Controller: Send + Sync {
    async fn run(&self, ctx: &RequestContext, req: &ArmRequest) -> Result<Response, ControllerError>;
}

/// Errors returned by controllers. Rendered by [`handle_error`].
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error("unsupported Content-Type '{0}', only application/json is accepted")]
    UnsupportedContentType(String),
    #[error(transparent)]
    Conversion(#[from] ConversionError),
    #[error(transparent)]
    ResourceId(#[from] ResourceIdError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    StatusManager(#[from] StatusManagerError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Collaborators shared by every controller of a resource provider.
#[derive(Clone)]
pub struct Options {
    pub storage_client: Arc<dyn StorageClient>,
    pub status_manager: Arc<dyn StatusManager>,
    /// Resource type served by the controller, e.g. `Applications.Core/containers`.
    pub resource_type: String,
}

/// Decodes a versioned request body into the data model.
pub type RequestConverter<T> =
    Arc<dyn Fn(&[u8], &str) -> Result<T, ConversionError> + Send + Sync>;

/// Encodes the data model as the versioned wire model.
pub type ResponseConverter<T> =
    Arc<dyn Fn(&T, &str) -> Result<Value, ConversionError> + Send + Sync>;

/// Validation hook run before a resource is created or updated.
///
/// Returning `Ok(Some(_))` or `Err(_)` short-circuits the request. Filters
/// may adjust `new` before it is saved.
#[async_trait]
pub trait UpdateFilter<T: ResourceDataModel>: Send + Sync {
    async fn filter(
        &self,
        ctx: &RequestContext,
        new: &mut T,
        old: Option<&T>,
        options: &Options,
    ) -> Result<Option<Response>, ControllerError>;
}

#[async_trait]
impl<T, F> UpdateFilter<T> for F
where
    T: ResourceDataModel,
    F: Fn(&RequestContext, &mut T, Option<&T>, &Options) -> Result<Option<Response>, ControllerError>
        + Send
        + Sync,
{
    async fn filter(
        &self,
        ctx: &RequestContext,
        new: &mut T,
        old: Option<&T>,
        options: &Options,
    ) -> Result<Option<Response>, ControllerError> {
        self(ctx, new, old, options)
    }
}

/// Validation hook run before a resource is deleted.
#[async_trait]
pub trait DeleteFilter<T: ResourceDataModel>: Send + Sync {
    async fn filter(
        &self,
        ctx: &RequestContext,
        old: &T,
        options: &Options,
    ) -> Result<Option<Response>, ControllerError>;
}

#[async_trait]
impl<T, F> DeleteFilter<T> for F
where
    T: ResourceDataModel,
    F: Fn(&RequestContext, &T, &Options) -> Result<Option<Response>, ControllerError> + Send + Sync,
{
    async fn filter(
        &self,
        ctx: &RequestContext,
        old: &T,
        options: &Options,
    ) -> Result<Option<Response>, ControllerError> {
        self(ctx, old, options)
    }
}

/// Per-resource-type configuration of the [`Operation`] engine.
pub struct ResourceOptions<T: ResourceDataModel> {
    pub request_converter: RequestConverter<T>,
    pub response_converter: ResponseConverter<T>,
    /// Run in order before deletes; the first rejection wins.
    pub delete_filters: Vec<Arc<dyn DeleteFilter<T>>>,
    /// Run in order before creates and updates; the first rejection wins.
    pub update_filters: Vec<Arc<dyn UpdateFilter<T>>>,
    pub async_operation_timeout: Duration,
    pub async_operation_retry_after: Duration,
    /// List across nested scopes (e.g. every resource group of a plane).
    pub list_recursive_query: bool,
}

impl<T: ResourceDataModel> Clone for ResourceOptions<T> {
    fn clone(&self) -> Self {
        Self {
            request_converter: Arc::clone(&self.request_converter),
            response_converter: Arc::clone(&self.response_converter),
            delete_filters: self.delete_filters.clone(),
            update_filters: self.update_filters.clone(),
            async_operation_timeout: self.async_operation_timeout,
            async_operation_retry_after: self.async_operation_retry_after,
            list_recursive_query: self.list_recursive_query,
        }
    }
}

impl<T: ResourceDataModel> ResourceOptions<T> {
    /// Creates options with no filters and default async settings.
    pub fn new<Req, Resp>(request_converter: Req, response_converter: Resp) -> Self
    where
        Req: Fn(&[u8], &str) -> Result<T, ConversionError> + Send + Sync + 'static,
        Resp: Fn(&T, &str) -> Result<Value, ConversionError> + Send + Sync + 'static,
    {
        Self {
            request_converter: Arc::new(request_converter),
            response_converter: Arc::new(response_converter),
            delete_filters: Vec::new(),
            update_filters: Vec::new(),
            async_operation_timeout: DEFAULT_ASYNC_OPERATION_TIMEOUT,
            async_operation_retry_after: DEFAULT_ASYNC_OPERATION_RETRY_AFTER,
            list_recursive_query: false,
        }
    }

    #[must_use]
    pub fn with_update_filter(mut self, filter: impl UpdateFilter<T> + 'static) -> Self {
        self.update_filters.push(Arc::new(filter));
        self
    }

    #[must_use]
    pub fn with_delete_filter(mut self, filter: impl DeleteFilter<T> + 'static) -> Self {
        self.delete_filters.push(Arc::new(filter));
        self
    }

    /// Sets the worker deadline. Zero restores the default.
    #[must_use]
    pub fn with_async_operation_timeout(mut self, timeout: Duration) -> Self {
        self.async_operation_timeout = if timeout.is_zero() {
            DEFAULT_ASYNC_OPERATION_TIMEOUT
        } else {
            timeout
        };
        self
    }

    /// Sets the advertised polling interval. Zero restores the default.
    #[must_use]
    pub fn with_async_operation_retry_after(mut self, retry_after: Duration) -> Self {
        self.async_operation_retry_after = if retry_after.is_zero() {
            DEFAULT_ASYNC_OPERATION_RETRY_AFTER
        } else {
            retry_after
        };
        self
    }

    #[must_use]
    pub fn with_list_recursive_query(mut self, recursive: bool) -> Self {
        self.list_recursive_query = recursive;
        self
    }
}
