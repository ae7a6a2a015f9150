//! Scripted collaborators and a typed resource for controller tests.

use std::collections::VecDeque;
use std::sync::Arc;

use armrpc_core::{
    BaseResource, ConversionError, ProvisioningState, RequestContext, ResourceDataModel,
    ResourceId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Operation, Options, ResourceOptions};
use crate::statusmanager::{QueueOperationOptions, Status, StatusManager, StatusManagerError};
use crate::store::{Metadata, Object, ObjectQueryResult, Query, QueryOptions, StorageClient, StoreError};

pub const TEST_ID: &str =
    "/planes/radius/local/resourceGroups/rg/providers/Applications.Test/testResources/r1";
pub const TEST_TYPE: &str = "Applications.Test/testResources";
pub const TEST_API_VERSION: &str = "2023-10-01-preview";

// ---------------------------------------------------------------------------
// TestResource
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TestProperties {
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TestResource {
    #[serde(flatten)]
    pub base: BaseResource,
    #[serde(default)]
    pub properties: TestProperties,
}

impl ResourceDataModel for TestResource {
    fn base(&self) -> &BaseResource {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseResource {
        &mut self.base
    }

    fn resource_type_name(&self) -> &str {
        TEST_TYPE
    }
}

impl TestResource {
    pub fn with_state(state: ProvisioningState) -> Self {
        let mut resource = Self::default();
        resource.base.tracked.id = TEST_ID.to_string();
        resource.base.tracked.name = "r1".to_string();
        resource.base.tracked.resource_type = TEST_TYPE.to_string();
        resource.set_provisioning_state(state);
        resource
    }

    /// Store object holding a resource in `state`.
    pub fn stored(state: ProvisioningState, etag: &str) -> Object {
        let mut object = Object::from_model(TEST_ID, &Self::with_state(state)).unwrap();
        object.metadata.etag = etag.to_string();
        object
    }

    /// Converters accepting only [`TEST_API_VERSION`].
    pub fn resource_options() -> ResourceOptions<Self> {
        ResourceOptions::new(
            |body: &[u8], api_version: &str| {
                if api_version != TEST_API_VERSION {
                    return Err(ConversionError::UnsupportedApiVersion(api_version.to_string()));
                }
                Ok(serde_json::from_slice::<Self>(body)?)
            },
            |resource: &Self, _api_version: &str| Ok(serde_json::to_value(resource)?),
        )
    }
}

pub fn test_ctx() -> RequestContext {
    let mut ctx = RequestContext::new(ResourceId::parse(TEST_ID).unwrap());
    ctx.api_version = TEST_API_VERSION.to_string();
    ctx
}

pub fn test_options(store: MockStorageClient, status: MockStatusManager) -> Options {
    Options {
        storage_client: Arc::new(store),
        status_manager: Arc::new(status),
        resource_type: TEST_TYPE.to_string(),
    }
}

pub fn test_operation(store: MockStorageClient, status: MockStatusManager) -> Operation<TestResource> {
    Operation::new(test_options(store, status), TestResource::resource_options())
}

// ---------------------------------------------------------------------------
// MockStorageClient
// ---------------------------------------------------------------------------

/// A recorded `save` call.
#[derive(Debug, Clone)]
pub struct SaveCall {
    pub id: String,
    pub precondition: Option<String>,
    pub state: ProvisioningState,
    pub data: serde_json::Value,
}

#[derive(Default)]
struct StoreScript {
    gets: VecDeque<Result<Object, StoreError>>,
    saves: VecDeque<Result<String, StoreError>>,
    deletes: VecDeque<Result<(), StoreError>>,
    queries: VecDeque<Result<ObjectQueryResult, StoreError>>,
    save_calls: Vec<SaveCall>,
    delete_calls: Vec<(String, Option<String>)>,
    query_calls: Vec<(Query, QueryOptions)>,
}

/// Store whose results are scripted per call. Unscripted calls panic.
#[derive(Clone, Default)]
pub struct MockStorageClient {
    script: Arc<Mutex<StoreScript>>,
}

impl MockStorageClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_get(&self, result: Result<Object, StoreError>) {
        self.script.lock().gets.push_back(result);
    }

    /// Scripts the ETag assigned by the next `save`, or its error.
    pub fn push_save(&self, result: Result<String, StoreError>) {
        self.script.lock().saves.push_back(result);
    }

    pub fn push_delete(&self, result: Result<(), StoreError>) {
        self.script.lock().deletes.push_back(result);
    }

    pub fn push_query(&self, result: Result<ObjectQueryResult, StoreError>) {
        self.script.lock().queries.push_back(result);
    }

    pub fn saves(&self) -> Vec<SaveCall> {
        self.script.lock().save_calls.clone()
    }

    pub fn deletes(&self) -> Vec<(String, Option<String>)> {
        self.script.lock().delete_calls.clone()
    }

    pub fn queries(&self) -> Vec<(Query, QueryOptions)> {
        self.script.lock().query_calls.clone()
    }
}

#[async_trait]
impl StorageClient for MockStorageClient {
    async fn get(&self, id: &str) -> Result<Object, StoreError> {
        self.script
            .lock()
            .gets
            .pop_front()
            .unwrap_or_else(|| panic!("unexpected get({id})"))
    }

    async fn save(&self, object: &mut Object, etag: Option<&str>) -> Result<(), StoreError> {
        let mut script = self.script.lock();
        let state = object
            .data
            .get("asyncProvisioningState")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default();
        script.save_calls.push(SaveCall {
            id: object.metadata.id.clone(),
            precondition: etag.map(str::to_string),
            state,
            data: object.data.clone(),
        });
        let result = script
            .saves
            .pop_front()
            .unwrap_or_else(|| panic!("unexpected save({})", object.metadata.id));
        object.metadata.etag = result?;
        Ok(())
    }

    async fn delete(&self, id: &str, etag: Option<&str>) -> Result<(), StoreError> {
        let mut script = self.script.lock();
        script.delete_calls.push((id.to_string(), etag.map(str::to_string)));
        script
            .deletes
            .pop_front()
            .unwrap_or_else(|| panic!("unexpected delete({id})"))
    }

    async fn query(&self, query: &Query, options: &QueryOptions) -> Result<ObjectQueryResult, StoreError> {
        let mut script = self.script.lock();
        script.query_calls.push((query.clone(), options.clone()));
        script
            .queries
            .pop_front()
            .unwrap_or_else(|| panic!("unexpected query({})", query.root_scope))
    }
}

/// Builds a stored object for an arbitrary ID.
pub fn object(id: &str, data: serde_json::Value) -> Object {
    Object {
        metadata: Metadata {
            id: id.to_string(),
            etag: String::new(),
        },
        data,
    }
}

// ---------------------------------------------------------------------------
// MockStatusManager
// ---------------------------------------------------------------------------

#[derive(Default)]
struct StatusScript {
    gets: VecDeque<Result<Status, StatusManagerError>>,
    queues: VecDeque<Result<(), StatusManagerError>>,
    get_calls: Vec<(String, Uuid)>,
    queue_calls: Vec<QueueOperationOptions>,
}

/// Status manager whose results are scripted per call. Unscripted calls panic.
#[derive(Clone, Default)]
pub struct MockStatusManager {
    script: Arc<Mutex<StatusScript>>,
}

impl MockStatusManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_get(&self, result: Result<Status, StatusManagerError>) {
        self.script.lock().gets.push_back(result);
    }

    pub fn push_queue(&self, result: Result<(), StatusManagerError>) {
        self.script.lock().queues.push_back(result);
    }

    pub fn queued(&self) -> Vec<QueueOperationOptions> {
        self.script.lock().queue_calls.clone()
    }

    pub fn gets(&self) -> Vec<(String, Uuid)> {
        self.script.lock().get_calls.clone()
    }
}

#[async_trait]
impl StatusManager for MockStatusManager {
    async fn get(&self, resource_id: &ResourceId, operation_id: Uuid) -> Result<Status, StatusManagerError> {
        let mut script = self.script.lock();
        script.get_calls.push((resource_id.to_string(), operation_id));
        script
            .gets
            .pop_front()
            .unwrap_or_else(|| panic!("unexpected status get({resource_id})"))
    }

    async fn queue_async_operation(
        &self,
        _ctx: &RequestContext,
        options: QueueOperationOptions,
    ) -> Result<(), StatusManagerError> {
        let mut script = self.script.lock();
        script.queue_calls.push(options);
        script
            .queues
            .pop_front()
            .unwrap_or_else(|| panic!("unexpected queue_async_operation"))
    }

    async fn update(
        &self,
        resource_id: &ResourceId,
        _operation_id: Uuid,
        _state: ProvisioningState,
        _end_time: Option<DateTime<Utc>>,
        _error: Option<armrpc_core::ErrorDetails>,
    ) -> Result<(), StatusManagerError> {
        panic!("unexpected status update({resource_id})")
    }

    async fn delete(&self, resource_id: &ResourceId, _operation_id: Uuid) -> Result<(), StatusManagerError> {
        panic!("unexpected status delete({resource_id})")
    }
}
