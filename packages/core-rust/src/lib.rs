//! ARM-RPC core: resource identifiers, provisioning state, system data,
//! request context, and the resource data model contract.

pub mod context;
pub mod conversion;
pub mod error;
pub mod etag;
pub mod models;
pub mod provisioning;
pub mod resource_id;
pub mod system_data;
pub mod traits;

pub use context::{parse_top, QueryParamError, RequestContext, LOCATION_GLOBAL};
pub use conversion::ConversionError;
pub use error::{codes, ErrorDetails, ErrorResponse};
pub use etag::{validate_etag, ETagError};
pub use models::{
    AsyncOperationStatus, BaseResource, InternalMetadata, OperationDisplay, PaginatedList,
    ProviderOperation, TrackedResource,
};
pub use provisioning::ProvisioningState;
pub use resource_id::{parse_path_base, ResourceId, ResourceIdError, ScopeSegment, TypeSegment};
pub use system_data::{update_system_data, SystemData};
pub use traits::ResourceDataModel;
