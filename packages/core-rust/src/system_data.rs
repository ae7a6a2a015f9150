//! ARM `systemData` audit metadata and its merge rule.

use serde::{Deserialize, Serialize};

/// Creation and last-modification audit data attached to every resource.
///
/// ARM forwards this in the `x-ms-arm-resource-system-data` header. An empty
/// string means "unset".
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SystemData {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub created_by: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub created_by_type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub created_at: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub last_modified_by: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub last_modified_by_type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub last_modified_at: String,
}

impl SystemData {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Merges the system data of an incoming request into the stored value.
///
/// Creation fields are written once. Modification fields follow the latest
/// request, and a record that never saw a creation timestamp adopts the
/// modification triple as its creation triple. Applying the same `new` twice
/// yields the same result as applying it once.
#[must_use]
pub fn update_system_data(old: &SystemData, new: &SystemData) -> SystemData {
    let mut merged = old.clone();

    if old.created_at.is_empty() && !new.created_at.is_empty() {
        merged.created_at.clone_from(&new.created_at);
        merged.created_by.clone_from(&new.created_by);
        merged.created_by_type.clone_from(&new.created_by_type);
    }

    if !new.last_modified_at.is_empty() {
        merged.last_modified_at.clone_from(&new.last_modified_at);
        merged.last_modified_by.clone_from(&new.last_modified_by);
        merged.last_modified_by_type.clone_from(&new.last_modified_by_type);

        if merged.created_at.is_empty() {
            merged.created_at.clone_from(&new.last_modified_at);
            merged.created_by.clone_from(&new.last_modified_by);
            merged.created_by_type.clone_from(&new.last_modified_by_type);
        }
    }

    merged
}
