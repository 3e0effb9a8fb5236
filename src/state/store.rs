//! Module `store`
//!
//! Keeps one opaque state record per user. Records start out as an empty
//! JSON object; the mock-response engine owns their contents.

use log::{debug, info};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use crate::error::StateError;
use crate::results::ProvisionOutcome;

/// Opaque mutable mock state for a single user.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateRecord {
    scope: Map<String, Value>,
}

impl StateRecord {
    /// Returns the record's contents.
    pub fn scope(&self) -> &Map<String, Value> {
        &self.scope
    }

    /// Returns the record's contents for mutation.
    pub fn scope_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.scope
    }

    pub fn is_empty(&self) -> bool {
        self.scope.is_empty()
    }
}

/// Handle to a user's record, shared with whoever mutates mock state.
pub type SharedState = Arc<RwLock<StateRecord>>;

/// Registry mapping user ids to their state records.
pub struct StateStore {
    records: Mutex<HashMap<String, SharedState>>,
    max_users: usize,
}

impl StateStore {
    pub fn new(max_users: usize) -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            max_users,
        }
    }

    /// Ensures `user_id` has a state record.
    ///
    /// The membership check and the insert happen under one lock, so
    /// concurrent calls for the same id create exactly one record.
    pub async fn add_user(&self, user_id: &str) -> Result<ProvisionOutcome, StateError> {
        let mut records = self.records.lock().await;

        if records.contains_key(user_id) {
            debug!("State for user {} already exists", user_id);
            return Ok(ProvisionOutcome::AlreadyExists);
        }

        if records.len() >= self.max_users {
            return Err(StateError::CapacityExhausted(self.max_users));
        }

        records.insert(
            user_id.to_string(),
            Arc::new(RwLock::new(StateRecord::default())),
        );
        info!("Created state for user {} ({} users)", user_id, records.len());

        Ok(ProvisionOutcome::Created)
    }

    /// Removes and returns the record for `user_id`, if any.
    pub async fn remove_user(&self, user_id: &str) -> Option<SharedState> {
        self.records.lock().await.remove(user_id)
    }

    pub async fn get(&self, user_id: &str) -> Option<SharedState> {
        self.records.lock().await.get(user_id).cloned()
    }

    pub async fn contains(&self, user_id: &str) -> bool {
        self.records.lock().await.contains_key(user_id)
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn add_user_is_idempotent() {
        let store = StateStore::new(10);

        assert_eq!(store.add_user("alice").await.unwrap(), ProvisionOutcome::Created);
        assert_eq!(
            store.add_user("alice").await.unwrap(),
            ProvisionOutcome::AlreadyExists
        );
        assert_eq!(store.len().await, 1);

        let record = store.get("alice").await.unwrap();
        assert!(record.read().await.is_empty());
    }

    #[tokio::test]
    async fn existing_record_is_not_reset() {
        let store = StateStore::new(10);
        store.add_user("alice").await.unwrap();

        let record = store.get("alice").await.unwrap();
        record
            .write()
            .await
            .scope_mut()
            .insert("device".into(), Value::from("tv"));

        store.add_user("alice").await.unwrap();
        let record = store.get("alice").await.unwrap();
        assert_eq!(record.read().await.scope()["device"], "tv");
    }

    #[tokio::test]
    async fn capacity_applies_only_to_new_users() {
        let store = StateStore::new(1);
        store.add_user("alice").await.unwrap();

        assert!(matches!(
            store.add_user("bob").await,
            Err(StateError::CapacityExhausted(1))
        ));
        // Known users still resolve when full
        assert_eq!(
            store.add_user("alice").await.unwrap(),
            ProvisionOutcome::AlreadyExists
        );
        assert!(!store.contains("bob").await);
    }

    #[tokio::test]
    async fn remove_user_frees_capacity() {
        let store = StateStore::new(1);
        store.add_user("alice").await.unwrap();

        assert!(store.remove_user("alice").await.is_some());
        assert!(store.is_empty().await);
        assert_eq!(store.add_user("bob").await.unwrap(), ProvisionOutcome::Created);
    }
}
