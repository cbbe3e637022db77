//! Opaque id generation for persisted records.

use uuid::Uuid;

/// Generate a fresh opaque record id.
pub fn new_id() -> Uuid {
    Uuid::new_v4()
}
