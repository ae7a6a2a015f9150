//! Schema-less resource model for types whose properties are opaque to the
//! front end.

use std::collections::BTreeMap;
use std::sync::Arc;

use armrpc_core::{BaseResource, ConversionError, ResourceDataModel, SystemData};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::controller::ResourceOptions;

const PROVISIONING_STATE: &str = "provisioningState";

/// A resource whose `properties` are stored as given.
///
/// `provisioningState` is owned by the server: it is dropped from incoming
/// properties and filled from the stored async state on the way out.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GenericResource {
    #[serde(flatten)]
    pub base: BaseResource,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

impl ResourceDataModel for GenericResource {
    fn base(&self) -> &BaseResource {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseResource {
        &mut self.base
    }

    fn resource_type_name(&self) -> &str {
        &self.base.tracked.resource_type
    }
}

/// Wire shape accepted from clients.
#[derive(Debug, Deserialize)]
struct RequestModel {
    #[serde(default)]
    location: String,
    #[serde(default)]
    tags: BTreeMap<String, String>,
    #[serde(default)]
    properties: Value,
}

/// Wire shape returned to clients.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ResponseModel<'a> {
    id: &'a str,
    name: &'a str,
    #[serde(rename = "type")]
    resource_type: &'a str,
    location: &'a str,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    tags: &'a BTreeMap<String, String>,
    #[serde(skip_serializing_if = "SystemData::is_empty")]
    system_data: &'a SystemData,
    properties: Map<String, Value>,
}

impl GenericResource {
    /// Converters accepting the given api versions.
    #[must_use]
    pub fn resource_options(api_versions: Vec<String>) -> ResourceOptions<Self> {
        let accepted = Arc::new(api_versions);
        let for_response = Arc::clone(&accepted);
        ResourceOptions::new(
            move |body: &[u8], api_version: &str| {
                check_api_version(&accepted, api_version)?;
                Self::from_request(body)
            },
            move |resource: &Self, api_version: &str| {
                check_api_version(&for_response, api_version)?;
                resource.to_response()
            },
        )
    }

    /// Decodes a client payload.
    ///
    /// # Errors
    ///
    /// Fails when the body is not JSON or `properties` is not an object.
    pub fn from_request(body: &[u8]) -> Result<Self, ConversionError> {
        let request: RequestModel = serde_json::from_slice(body)?;
        let mut properties = match request.properties {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            _ => return Err(ConversionError::model("properties", "an object")),
        };
        properties.remove(PROVISIONING_STATE);

        let mut resource = Self {
            properties,
            ..Self::default()
        };
        resource.base.tracked.location = request.location;
        resource.base.tracked.tags = request.tags;
        Ok(resource)
    }

    /// Encodes the client-visible representation.
    ///
    /// # Errors
    ///
    /// Fails only if serialization fails.
    pub fn to_response(&self) -> Result<Value, ConversionError> {
        let mut properties = self.properties.clone();
        properties.insert(
            PROVISIONING_STATE.to_string(),
            serde_json::to_value(self.provisioning_state())?,
        );
        let tracked = &self.base.tracked;
        Ok(serde_json::to_value(ResponseModel {
            id: &tracked.id,
            name: &tracked.name,
            resource_type: &tracked.resource_type,
            location: &tracked.location,
            tags: &tracked.tags,
            system_data: &self.base.system_data,
            properties,
        })?)
    }
}

fn check_api_version(accepted: &[String], api_version: &str) -> Result<(), ConversionError> {
    if accepted.is_empty() || accepted.iter().any(|v| v.eq_ignore_ascii_case(api_version)) {
        Ok(())
    } else {
        Err(ConversionError::UnsupportedApiVersion(api_version.to_string()))
    }
}
