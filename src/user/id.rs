//! User id generation

use uuid::Uuid;

/// Source of fresh user ids.
pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Random (v4) UUIDs in canonical hyphenated form.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn generate(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Returns the caller-supplied id if it is present and non-empty.
pub fn requested_id(requested: Option<&str>) -> Option<&str> {
    requested.filter(|id| !id.is_empty())
}
