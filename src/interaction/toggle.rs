//! Module `toggle`
//!
//! Process-wide map from user id to interaction-log configuration.
//!
//! User ids come straight from a request header and are not checked against
//! the user registry; a toggle may exist for a user that was never added.

use log::info;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::error::ToggleError;
use crate::interaction::validation::require_enabled;

/// Enabled users and their capture configuration.
#[derive(Default)]
pub struct InteractionLogToggle {
    entries: RwLock<HashMap<String, Value>>,
}

impl InteractionLogToggle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables capture for `user_id`, replacing any previous configuration.
    ///
    /// `config.enabled` must be exactly `true`.
    pub async fn enable(&self, user_id: &str, config: Value) -> Result<(), ToggleError> {
        require_enabled(&config, true)?;

        let mut entries = self.entries.write().await;
        let replaced = entries.insert(user_id.to_string(), config).is_some();
        info!(
            "Interaction logs enabled for user {}{}",
            user_id,
            if replaced { " (configuration replaced)" } else { "" }
        );

        Ok(())
    }

    /// Disables capture for `user_id`.
    ///
    /// `config.enabled` must be exactly `false`, and the user must currently
    /// be enabled.
    pub async fn disable(&self, user_id: &str, config: &Value) -> Result<(), ToggleError> {
        require_enabled(config, false)?;

        // Check and removal share the write lock
        let mut entries = self.entries.write().await;
        if entries.remove(user_id).is_none() {
            return Err(ToggleError::UserNotFound(user_id.to_string()));
        }
        info!("Interaction logs disabled for user {}", user_id);

        Ok(())
    }

    /// Returns the active configuration for `user_id`, if enabled.
    pub async fn get(&self, user_id: &str) -> Option<Value> {
        self.entries.read().await.get(user_id).cloned()
    }

    pub async fn is_enabled(&self, user_id: &str) -> bool {
        self.entries.read().await.contains_key(user_id)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn enable_overwrites_previous_config() {
        let toggle = InteractionLogToggle::new();

        toggle
            .enable("bob", json!({ "enabled": true, "level": 1 }))
            .await
            .unwrap();
        toggle
            .enable("bob", json!({ "enabled": true, "level": 2 }))
            .await
            .unwrap();

        assert_eq!(toggle.len().await, 1);
        assert_eq!(toggle.get("bob").await.unwrap()["level"], 2);
    }

    #[tokio::test]
    async fn rejected_enable_leaves_map_untouched() {
        let toggle = InteractionLogToggle::new();

        assert_eq!(
            toggle.enable("bob", json!({ "enabled": "true" })).await,
            Err(ToggleError::InvalidEnabledValue { expected: true })
        );
        assert!(!toggle.is_enabled("bob").await);
    }

    #[tokio::test]
    async fn value_check_precedes_membership_check() {
        let toggle = InteractionLogToggle::new();

        // Unknown user, but the wrong literal is reported first
        assert_eq!(
            toggle.disable("carol", &json!({ "enabled": true })).await,
            Err(ToggleError::InvalidEnabledValue { expected: false })
        );
        assert_eq!(
            toggle.disable("carol", &json!({})).await,
            Err(ToggleError::MissingState)
        );
    }

    #[tokio::test]
    async fn disable_with_wrong_value_keeps_user_enabled() {
        let toggle = InteractionLogToggle::new();
        toggle.enable("dave", json!({ "enabled": true })).await.unwrap();

        assert!(toggle.disable("dave", &json!({ "enabled": "false" })).await.is_err());
        assert!(toggle.is_enabled("dave").await);
    }
}
