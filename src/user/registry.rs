//! User registry
//!
//! Provisions state and a connection endpoint for each user as one
//! two-phase operation:
//!
//! 1. state is provisioned first; a failure there fails the call with
//!    nothing else allocated.
//! 2. the connection endpoint is provisioned second; if that fails and
//!    phase 1 created the state record, the record is rolled back.
//!
//! A failed `add_user` therefore never leaves behind a resource it created.
//! Calls for the same id hold a per-id guard across both phases, so a
//! rollback never removes state another caller has already reported.

use log::{info, warn};
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::config::ServerConfig;
use crate::connection::ConnectionRegistry;
use crate::error::RegistryError;
use crate::results::ProvisionOutcome;
use crate::state::StateStore;
use crate::user::id::{IdGenerator, UuidGenerator, requested_id};
use crate::user::results::AddUserResult;

pub struct UserRegistry {
    states: Arc<StateStore>,
    connections: Arc<ConnectionRegistry>,
    ids: Arc<dyn IdGenerator>,
    id_attempts: usize,
    provisioning: Mutex<HashMap<String, Weak<Mutex<()>>>>,
}

impl UserRegistry {
    pub fn new(
        states: Arc<StateStore>,
        connections: Arc<ConnectionRegistry>,
        ids: Arc<dyn IdGenerator>,
        id_attempts: usize,
    ) -> Self {
        Self {
            states,
            connections,
            ids,
            id_attempts,
            provisioning: Mutex::new(HashMap::new()),
        }
    }

    /// Builds both stores from configuration with UUID id generation.
    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(
            Arc::new(StateStore::new(config.limits.max_users)),
            Arc::new(ConnectionRegistry::new(
                config.server.clone(),
                config.limits.max_endpoints,
            )),
            Arc::new(UuidGenerator),
            config.server.id_generation_attempts,
        )
    }

    pub fn states(&self) -> &Arc<StateStore> {
        &self.states
    }

    pub fn connections(&self) -> &Arc<ConnectionRegistry> {
        &self.connections
    }

    /// Ensures a user exists, generating an id when none is supplied.
    ///
    /// A supplied id that is already known is re-provisioned idempotently.
    pub async fn add_user(&self, requested: Option<&str>) -> Result<AddUserResult, RegistryError> {
        let (user_id, generated) = match requested_id(requested) {
            Some(id) => (id.to_string(), false),
            None => (self.generate_id().await?, true),
        };

        let _guard = self.lock_user(&user_id).await;

        let state = self.states.add_user(&user_id).await.inspect_err(|e| {
            warn!("Cannot add user {}: {}", user_id, e);
        })?;

        let connection = match self.connections.add_user(&user_id).await {
            Ok((outcome, _)) => outcome,
            Err(e) => {
                warn!("Cannot add user {}: {}", user_id, e);
                self.rollback_state(&user_id, state).await;
                return Err(e.into());
            }
        };

        if state.is_created() || connection.is_created() {
            info!("Added user {}", user_id);
        }

        Ok(AddUserResult {
            user_id,
            created: true,
            generated,
            state,
            connection,
        })
    }

    /// Serializes provisioning per user id. Entries whose guard is no longer
    /// held by anyone are pruned on the way in.
    async fn lock_user(&self, user_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut provisioning = self.provisioning.lock().await;
            provisioning.retain(|_, lock| lock.strong_count() > 0);

            match provisioning.get(user_id).and_then(Weak::upgrade) {
                Some(lock) => lock,
                None => {
                    let lock = Arc::new(Mutex::new(()));
                    provisioning.insert(user_id.to_string(), Arc::downgrade(&lock));
                    lock
                }
            }
        };

        lock.lock_owned().await
    }

    /// Undoes phase 1 when this call created the state record.
    async fn rollback_state(&self, user_id: &str, state: ProvisionOutcome) {
        if state.is_created() && self.states.remove_user(user_id).await.is_some() {
            info!("Rolled back state for user {}", user_id);
        }
    }

    /// Draws ids until one is unknown to both stores.
    async fn generate_id(&self) -> Result<String, RegistryError> {
        for _ in 0..self.id_attempts {
            let candidate = self.ids.generate();
            if !self.connections.contains(&candidate).await
                && !self.states.contains(&candidate).await
            {
                return Ok(candidate);
            }
            warn!("Generated user id {} is already registered", candidate);
        }

        Err(RegistryError::IdGenerationExhausted(self.id_attempts))
    }

    /// Known users are those with a live connection endpoint.
    pub async fn list_users(&self) -> Vec<String> {
        self.connections.list_users().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StartupConfig;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replays a fixed list of ids, then repeats the last one.
    struct ScriptedIds {
        ids: Vec<&'static str>,
        next: AtomicUsize,
    }

    impl IdGenerator for ScriptedIds {
        fn generate(&self) -> String {
            let i = self.next.fetch_add(1, Ordering::SeqCst);
            self.ids[i.min(self.ids.len() - 1)].to_string()
        }
    }

    fn registry_with(ids: Vec<&'static str>, attempts: usize) -> UserRegistry {
        UserRegistry::new(
            Arc::new(StateStore::new(10)),
            Arc::new(ConnectionRegistry::new(StartupConfig::default(), 10)),
            Arc::new(ScriptedIds {
                ids,
                next: AtomicUsize::new(0),
            }),
            attempts,
        )
    }

    #[tokio::test]
    async fn supplied_id_is_used_verbatim() {
        let registry = registry_with(vec!["unused"], 1);

        let result = registry.add_user(Some("alice")).await.unwrap();
        assert_eq!(result.user_id, "alice");
        assert!(!result.generated);
        assert_eq!(result.state, ProvisionOutcome::Created);
        assert_eq!(result.connection, ProvisionOutcome::Created);

        let again = registry.add_user(Some("alice")).await.unwrap();
        assert!(again.created);
        assert_eq!(again.state, ProvisionOutcome::AlreadyExists);
        assert_eq!(again.connection, ProvisionOutcome::AlreadyExists);
    }

    #[tokio::test]
    async fn generation_skips_registered_ids() {
        let registry = registry_with(vec!["taken", "fresh"], 4);
        registry.add_user(Some("taken")).await.unwrap();

        let result = registry.add_user(None).await.unwrap();
        assert_eq!(result.user_id, "fresh");
        assert!(result.generated);
    }

    #[tokio::test]
    async fn generation_gives_up_after_configured_attempts() {
        let registry = registry_with(vec!["taken"], 3);
        registry.add_user(Some("taken")).await.unwrap();

        assert!(matches!(
            registry.add_user(None).await,
            Err(RegistryError::IdGenerationExhausted(3))
        ));
        assert_eq!(registry.list_users().await, vec!["taken".to_string()]);
    }

    #[tokio::test]
    async fn provisioning_guards_are_released() {
        let registry = registry_with(vec!["generated"], 1);
        registry.add_user(Some("alice")).await.unwrap();
        registry.add_user(Some("bob")).await.unwrap();

        // Stale entries are pruned by the next call
        let guard = registry.lock_user("carol").await;
        let provisioning = registry.provisioning.lock().await;
        assert_eq!(provisioning.len(), 1);
        assert!(provisioning.contains_key("carol"));
        drop(provisioning);
        drop(guard);
    }

    #[tokio::test]
    async fn empty_supplied_id_generates() {
        let registry = registry_with(vec!["generated"], 1);
        let result = registry.add_user(Some("")).await.unwrap();
        assert_eq!(result.user_id, "generated");
        assert!(result.generated);
    }
}
