//! Capability trait implemented by every resource data model.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::context::RequestContext;
use crate::models::BaseResource;
use crate::provisioning::ProvisioningState;
use crate::system_data::SystemData;

/// Internal (version-independent) representation of a resource type.
///
/// The generic controller engine only touches a resource through this
/// trait. Implementors expose their embedded [`BaseResource`]; the provided
/// methods cover provisioning state, system data, and metadata stamping.
pub trait ResourceDataModel: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    fn base(&self) -> &BaseResource;

    fn base_mut(&mut self) -> &mut BaseResource;

    /// Fully-qualified resource type, e.g. `Applications.Core/containers`.
    fn resource_type_name(&self) -> &str;

    fn provisioning_state(&self) -> ProvisioningState {
        self.base().internal.async_provisioning_state
    }

    fn set_provisioning_state(&mut self, state: ProvisioningState) {
        self.base_mut().internal.async_provisioning_state = state;
    }

    fn system_data(&self) -> &SystemData {
        &self.base().system_data
    }

    fn set_system_data(&mut self, system_data: SystemData) {
        self.base_mut().system_data = system_data;
    }

    /// Stamps identity and audit metadata before a write. `old` is the
    /// stored record when the request updates an existing resource.
    fn update_metadata(&mut self, ctx: &RequestContext, old: Option<&Self>) {
        self.base_mut().update_metadata(ctx, old.map(ResourceDataModel::base));
    }
}
