//! Shared result types
//!
//! Outcomes reported by the per-user stores when provisioning.

/// Outcome of an idempotent provisioning call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionOutcome {
    /// The resource did not exist and was created by this call
    Created,
    /// The resource already existed; nothing was changed
    AlreadyExists,
}

impl ProvisionOutcome {
    pub fn is_created(&self) -> bool {
        matches!(self, ProvisionOutcome::Created)
    }
}
