// ABOUTME: In-memory mirror of remote users and channels keyed by ID
// ABOUTME: Single writer (the event synchronizer), many concurrent readers via RwLock<HashMap<_, Arc<_>>>

use crate::error::DeserializationError;
use crate::models::{Channel, User};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

type Map<T> = RwLock<HashMap<String, Arc<T>>>;

/// Entity cache shared between the synchronizer and outbound callers.
///
/// Entries are stored behind `Arc`, so a write swaps in a whole new value and
/// a reader holding an older `Arc` keeps a complete, consistent entity. Locks
/// are only held for the duration of a map operation, never across `.await`.
#[derive(Debug, Default)]
pub struct EntityCache {
    users: Map<User>,
    channels: Map<Channel>,
}

// Every write replaces a whole Arc, so a poisoned map is still consistent.
fn read<T>(map: &Map<T>) -> RwLockReadGuard<'_, HashMap<String, Arc<T>>> {
    map.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(map: &Map<T>) -> RwLockWriteGuard<'_, HashMap<String, Arc<T>>> {
    map.write().unwrap_or_else(PoisonError::into_inner)
}

impl EntityCache {
    pub fn new() -> Self {
        Self::default()
    }

    // ─── Users ──────────────────────────────────────────────────────

    /// Decode and store a user, replacing any earlier value for the same ID
    pub fn register_user(&self, payload: &Value) -> Result<Arc<User>, DeserializationError> {
        let user = Arc::new(User::from_payload(payload)?);
        write(&self.users).insert(user.id.clone(), Arc::clone(&user));
        Ok(user)
    }

    /// Register a batch, skipping records that fail to decode. Returns how many were stored.
    pub fn register_users(&self, payloads: &[Value]) -> usize {
        payloads
            .iter()
            .filter(|payload| match self.register_user(payload) {
                Ok(_) => true,
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping undecodable user record");
                    false
                }
            })
            .count()
    }

    pub fn remove_user(&self, id: &str) -> Option<Arc<User>> {
        write(&self.users).remove(id)
    }

    pub fn get_user(&self, id: &str) -> Option<Arc<User>> {
        read(&self.users).get(id).cloned()
    }

    /// Exact ID match first, then the first user whose `name` equals `token`.
    ///
    /// With duplicate names the result is whichever entry the map yields first;
    /// that choice can change after any mutation.
    pub fn find_user_by_name_or_id(&self, token: &str) -> Option<Arc<User>> {
        let users = read(&self.users);
        users
            .get(token)
            .or_else(|| users.values().find(|user| user.name == token))
            .cloned()
    }

    pub fn users(&self) -> Vec<Arc<User>> {
        read(&self.users).values().cloned().collect()
    }

    pub fn user_count(&self) -> usize {
        read(&self.users).len()
    }

    // ─── Channels ───────────────────────────────────────────────────

    pub fn register_channel(&self, payload: &Value) -> Result<Arc<Channel>, DeserializationError> {
        let channel = Arc::new(Channel::from_payload(payload)?);
        write(&self.channels).insert(channel.id.clone(), Arc::clone(&channel));
        Ok(channel)
    }

    pub fn register_channels(&self, payloads: &[Value]) -> usize {
        payloads
            .iter()
            .filter(|payload| match self.register_channel(payload) {
                Ok(_) => true,
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping undecodable channel record");
                    false
                }
            })
            .count()
    }

    /// Drop a channel. Removing an unknown ID is a no-op.
    pub fn remove_channel(&self, id: &str) -> Option<Arc<Channel>> {
        write(&self.channels).remove(id)
    }

    pub fn get_channel(&self, id: &str) -> Option<Arc<Channel>> {
        read(&self.channels).get(id).cloned()
    }

    /// Same lookup rules as users; a leading `#` on the name is ignored
    pub fn find_channel_by_name_or_id(&self, token: &str) -> Option<Arc<Channel>> {
        let channels = read(&self.channels);
        let name = token.strip_prefix('#').unwrap_or(token);
        channels
            .get(token)
            .or_else(|| channels.values().find(|channel| channel.name == name))
            .cloned()
    }

    pub fn channels(&self) -> Vec<Arc<Channel>> {
        read(&self.channels).values().cloned().collect()
    }

    pub fn channel_count(&self) -> usize {
        read(&self.channels).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_register_and_get_user() {
        let cache = EntityCache::new();
        let stored = cache
            .register_user(&json!({"id": "U1", "name": "ann"}))
            .unwrap();
        assert_eq!(stored.name, "ann");
        assert_eq!(cache.get_user("U1"), Some(stored));
        assert_eq!(cache.get_user("U2"), None);
    }

    #[test]
    fn test_failed_decode_leaves_cache_untouched() {
        let cache = EntityCache::new();
        cache
            .register_user(&json!({"id": "U1", "name": "ann"}))
            .unwrap();
        assert!(cache.register_user(&json!({"id": "U1"})).is_err());
        assert_eq!(cache.get_user("U1").unwrap().name, "ann");
    }

    #[test]
    fn test_register_users_skips_bad_records() {
        let cache = EntityCache::new();
        let stored = cache.register_users(&[
            json!({"id": "U1", "name": "ann"}),
            json!({"name": "no-id"}),
            json!({"id": "U2", "name": "bob"}),
        ]);
        assert_eq!(stored, 2);
        assert_eq!(cache.user_count(), 2);
    }

    #[test]
    fn test_find_user_prefers_id_over_name() {
        let cache = EntityCache::new();
        cache
            .register_user(&json!({"id": "U1", "name": "U2"}))
            .unwrap();
        cache
            .register_user(&json!({"id": "U2", "name": "bob"}))
            .unwrap();
        assert_eq!(cache.find_user_by_name_or_id("U2").unwrap().name, "bob");
        assert_eq!(cache.find_user_by_name_or_id("bob").unwrap().id, "U2");
        assert!(cache.find_user_by_name_or_id("carol").is_none());
    }

    #[test]
    fn test_find_channel_strips_hash() {
        let cache = EntityCache::new();
        cache
            .register_channel(&json!({"id": "C1", "name": "general"}))
            .unwrap();
        assert_eq!(cache.find_channel_by_name_or_id("#general").unwrap().id, "C1");
        assert_eq!(cache.find_channel_by_name_or_id("general").unwrap().id, "C1");
        assert_eq!(cache.find_channel_by_name_or_id("C1").unwrap().id, "C1");
    }

    #[test]
    fn test_remove_missing_channel_is_noop() {
        let cache = EntityCache::new();
        cache
            .register_channel(&json!({"id": "C1", "name": "general"}))
            .unwrap();
        assert!(cache.remove_channel("C404").is_none());
        assert_eq!(cache.channel_count(), 1);
        assert!(cache.remove_channel("C1").is_some());
        assert!(cache.get_channel("C1").is_none());
    }
}
