//! Request classification: maps a method and resource ID to the
//! [`OperationType`] its controller is registered under.

use armrpc_core::ResourceId;
use http::Method;

use super::operation::{OperationMethod, OperationType};
use crate::statusmanager::{OPERATION_RESULTS, OPERATION_STATUSES};

const LOCATIONS: &str = "locations";

/// Classifies a request.
///
/// `resource_id` is the ID the request addresses (custom actions already
/// truncated) and `path` the request path. Operation status and result URLs
/// map to the `<namespace>/operationstatuses` type. Returns `None` for
/// methods no controller can serve.
#[must_use]
pub fn classify(method: &Method, resource_id: &ResourceId, path: &str) -> Option<OperationType> {
    if let Some(op) = classify_operation_status(method, resource_id) {
        return Some(op);
    }

    let resource_type = resource_id.resource_type();
    let operation = match *method {
        Method::GET if resource_id.is_resource_collection() => OperationMethod::List,
        Method::GET => OperationMethod::Get,
        Method::PUT => OperationMethod::Put,
        Method::PATCH => OperationMethod::Patch,
        Method::DELETE => OperationMethod::Delete,
        Method::POST => {
            let action = path.trim_end_matches('/').rsplit('/').next().unwrap_or_default();
            OperationMethod::Post(action.to_ascii_lowercase())
        }
        _ => return None,
    };
    Some(OperationType::new(&resource_type, operation))
}

/// Matches `.../providers/<ns>/locations/<loc>/operationstatuses|operationresults/<id>`.
fn classify_operation_status(method: &Method, resource_id: &ResourceId) -> Option<OperationType> {
    if *method != Method::GET {
        return None;
    }
    let [location, operation] = resource_id.type_segments() else {
        return None;
    };
    let (namespace, location_type) = location.segment_type.split_once('/')?;
    if !location_type.eq_ignore_ascii_case(LOCATIONS) || operation.name.is_empty() {
        return None;
    }

    let method = if operation.segment_type.eq_ignore_ascii_case(OPERATION_STATUSES) {
        OperationMethod::GetOperationStatuses
    } else if operation.segment_type.eq_ignore_ascii_case(OPERATION_RESULTS) {
        OperationMethod::GetOperationResult
    } else {
        return None;
    };
    Some(OperationType::new(&format!("{namespace}/{OPERATION_STATUSES}"), method))
}
