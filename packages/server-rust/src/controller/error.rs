//! Rendering of [`ControllerError`]s as ARM error responses.

use armrpc_core::{codes, ConversionError, ErrorResponse};
use tracing::error;

use super::ControllerError;
use crate::rest::Response;
use crate::store::StoreError;

/// Message returned when an ETag-guarded write lost a race.
pub const CONCURRENT_UPDATE_MESSAGE: &str =
    "the resource was modified by another request, retry the operation";

/// Maps a controller error to the response sent to the client.
///
/// Request content errors become 400 with a code naming the failure.
/// Concurrent-write conflicts become 409. Everything else is logged and
/// becomes 500.
#[must_use]
pub fn handle_error(err: &ControllerError) -> Response {
    match err {
        ControllerError::UnsupportedContentType(_) => Response::BadRequest(ErrorResponse::new(
            codes::INVALID_REQUEST_CONTENT,
            err.to_string(),
        )),
        ControllerError::Conversion(conversion) => conversion_error(conversion),
        ControllerError::ResourceId(_) => Response::bad_request(err.to_string()),
        ControllerError::Store(StoreError::Concurrency) => Response::conflict(CONCURRENT_UPDATE_MESSAGE),
        ControllerError::Store(_) | ControllerError::StatusManager(_) | ControllerError::Internal(_) => {
            error!(error = %err, "unhandled controller error");
            Response::internal_server_error(err.to_string())
        }
    }
}

fn conversion_error(err: &ConversionError) -> Response {
    let code = match err {
        ConversionError::UnsupportedApiVersion(_) => codes::INVALID_API_VERSION_PARAMETER,
        ConversionError::ModelConversion { .. }
        | ConversionError::InvalidModelConversion
        | ConversionError::Decode(_) => codes::HTTP_REQUEST_PAYLOAD_API_SPEC_VALIDATION_FAILED,
        ConversionError::ClientRp { code, .. } => code.as_str(),
    };
    Response::BadRequest(ErrorResponse::new(code, err.to_string()))
}
