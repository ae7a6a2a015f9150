//! Resource store abstraction.
//!
//! Defines [`StorageClient`], the async key-value contract the controllers
//! persist resources through, plus the [`Object`] envelope and query types.
//! Every write carries an optional ETag precondition, which is the only
//! cross-request serialization point of the front end.

pub mod memory;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

pub use memory::MemoryStorageClient;

/// Errors returned by a [`StorageClient`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("the resource with id '{id}' was not found")]
    NotFound { id: String },
    /// The ETag precondition of a write did not hold.
    #[error("the operation failed due to a concurrency conflict")]
    Concurrency,
    #[error("{message}")]
    Invalid { message: String },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StoreError {
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Identity and concurrency token of a stored object.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Metadata {
    pub id: String,
    /// Assigned by the store on every successful save.
    pub etag: String,
}

/// A stored resource: metadata plus the serialized data model.
#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    pub metadata: Metadata,
    pub data: serde_json::Value,
}

impl Object {
    /// Wraps a data model for saving under `id`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Invalid`] if the model cannot be serialized.
    pub fn from_model<T: Serialize>(id: impl Into<String>, model: &T) -> Result<Self, StoreError> {
        let data = serde_json::to_value(model).map_err(|e| StoreError::Invalid {
            message: format!("failed to serialize resource: {e}"),
        })?;
        Ok(Self {
            metadata: Metadata {
                id: id.into(),
                etag: String::new(),
            },
            data,
        })
    }

    /// Decodes the stored data into a data model.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Invalid`] if the data does not match `T`.
    pub fn as_model<T: DeserializeOwned>(&self) -> Result<T, StoreError> {
        serde_json::from_value(self.data.clone()).map_err(|e| StoreError::Invalid {
            message: format!("stored object '{}' is not a valid resource: {e}", self.metadata.id),
        })
    }
}

/// Selects stored resources of one type under a scope.
#[derive(Debug, Clone, Default)]
pub struct Query {
    /// Scope the resources live in, e.g. `/planes/radius/local/resourceGroups/rg`.
    pub root_scope: String,
    /// Include resources in nested scopes under `root_scope`.
    pub scope_recursive: bool,
    /// Fully-qualified type, e.g. `Applications.Core/containers`.
    pub resource_type: String,
}

/// Paging controls for [`StorageClient::query`].
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// Opaque token returned by a previous page.
    pub pagination_token: Option<String>,
    /// Page size. Zero returns every match.
    pub max_query_item_count: usize,
}

/// One page of query results.
#[derive(Debug, Clone, Default)]
pub struct ObjectQueryResult {
    pub items: Vec<Object>,
    /// Present when more results remain.
    pub pagination_token: Option<String>,
}

/// Async resource store.
///
/// IDs are compared case-insensitively. Writes with `etag: Some(_)` must
/// fail with [`StoreError::Concurrency`] unless the stored ETag matches.
///
/// Used as `Arc<dyn StorageClient>`.
#[async_trait]
pub trait StorageClient: Send + Sync {
    /// Fetches the object stored under `id`.
    async fn get(&self, id: &str) -> Result<Object, StoreError>;

    /// Inserts or replaces `object`, assigning its new ETag.
    async fn save(&self, object: &mut Object, etag: Option<&str>) -> Result<(), StoreError>;

    /// Removes the object stored under `id`.
    async fn delete(&self, id: &str, etag: Option<&str>) -> Result<(), StoreError>;

    /// Lists the objects matching `query`.
    async fn query(
        &self,
        query: &Query,
        options: &QueryOptions,
    ) -> Result<ObjectQueryResult, StoreError>;
}
