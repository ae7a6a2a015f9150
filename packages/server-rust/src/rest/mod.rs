//! REST response contract.
//!
//! Controllers return a [`Response`] value describing the outcome; the
//! front end renders it against the inbound request. Rendering needs the
//! request because async responses derive their polling URLs from the
//! caller's `Referer`, `Host`, and forwarding headers.

pub mod results;

pub use results::{self_link, AsyncOperationResponse, Response, ResponseError, DEFAULT_RETRY_AFTER};
