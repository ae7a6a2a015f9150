//! Default controllers for resource CRUD and async operation polling.

mod async_delete;
mod async_put;
mod get_operation_result;
mod get_operation_status;
mod get_operations;
mod get_resource;
mod list_resources;
mod sync_delete;
mod sync_put;

pub use async_delete::DefaultAsyncDelete;
pub use async_put::DefaultAsyncPut;
pub use get_operation_result::GetOperationResult;
pub use get_operation_status::GetOperationStatus;
pub use get_operations::GetOperations;
pub use get_resource::GetResource;
pub use list_resources::ListResources;
pub use sync_delete::DefaultSyncDelete;
pub use sync_put::DefaultSyncPut;
