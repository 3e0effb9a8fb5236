//! User registry result types

use crate::results::ProvisionOutcome;

/// Result of a successful `add_user` call
#[derive(Debug, Clone)]
pub struct AddUserResult {
    pub user_id: String,
    /// Always true on success: both resources exist for `user_id`
    pub created: bool,
    /// Whether `user_id` was generated rather than supplied
    pub generated: bool,
    pub state: ProvisionOutcome,
    pub connection: ProvisionOutcome,
}
