// Shared building blocks used across layers: ids, the HTTP error type,
// and the Restate serialization bridge.

pub mod error;
pub mod id;
pub mod restate_serde;

pub use error::{ApiError, ApiResult, ErrorBody, REQUEST_ID};
pub use id::new_id;
