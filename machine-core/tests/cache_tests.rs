// ABOUTME: Tests for the entity cache - registration, replacement, lookup, and removal
// ABOUTME: Includes a concurrent reader/writer check that readers only ever see whole entities

use machine_core::EntityCache;
use serde_json::{json, Value};
use std::sync::Arc;
use std::thread;

fn user_payload(id: &str, name: &str, title: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "deleted": false,
        "is_bot": false,
        "tz": "Europe/Amsterdam",
        "profile": {
            "display_name": name,
            "title": title,
        }
    })
}

#[test]
fn test_registering_same_payload_twice_is_idempotent() {
    let cache = EntityCache::new();
    let payload = user_payload("U1", "ann", "Engineer");

    let first = cache.register_user(&payload).unwrap();
    let second = cache.register_user(&payload).unwrap();

    assert_eq!(first, second);
    assert_eq!(cache.user_count(), 1);
    assert_eq!(*cache.get_user("U1").unwrap(), *first);
}

#[test]
fn test_last_write_wins_per_id() {
    let cache = EntityCache::new();
    cache.register_user(&user_payload("U1", "ann", "Engineer")).unwrap();
    cache.register_user(&user_payload("U2", "bob", "Designer")).unwrap();
    cache.register_user(&user_payload("U1", "annie", "Manager")).unwrap();

    let user = cache.get_user("U1").unwrap();
    assert_eq!(user.name, "annie");
    assert_eq!(user.profile.title.as_deref(), Some("Manager"));
    assert_eq!(cache.get_user("U2").unwrap().name, "bob");
    assert_eq!(cache.user_count(), 2);
}

#[test]
fn test_rejected_payload_leaves_cache_untouched() {
    let cache = EntityCache::new();
    cache.register_user(&user_payload("U1", "ann", "Engineer")).unwrap();

    let err = cache
        .register_user(&json!({"id": "U1", "name": 42}))
        .unwrap_err();
    assert_eq!(err.field(), "name");
    assert_eq!(cache.get_user("U1").unwrap().name, "ann");
}

#[test]
fn test_batch_registration_skips_bad_records() {
    let cache = EntityCache::new();
    let stored = cache.register_users(&[
        user_payload("U1", "ann", "Engineer"),
        json!({"name": "no-id"}),
        user_payload("U2", "bob", "Designer"),
    ]);
    assert_eq!(stored, 2);
    assert_eq!(cache.user_count(), 2);
}

#[test]
fn test_find_by_name_or_id() {
    let cache = EntityCache::new();
    cache.register_user(&user_payload("U1", "ann", "Engineer")).unwrap();
    cache
        .register_channel(&json!({"id": "C1", "name": "general"}))
        .unwrap();

    assert_eq!(cache.find_user_by_name_or_id("U1").unwrap().name, "ann");
    assert_eq!(cache.find_user_by_name_or_id("ann").unwrap().id, "U1");
    assert!(cache.find_user_by_name_or_id("nobody").is_none());

    assert_eq!(cache.find_channel_by_name_or_id("C1").unwrap().name, "general");
    assert_eq!(cache.find_channel_by_name_or_id("general").unwrap().id, "C1");
    assert_eq!(cache.find_channel_by_name_or_id("#general").unwrap().id, "C1");
}

#[test]
fn test_removing_absent_channel_is_noop() {
    let cache = EntityCache::new();
    cache
        .register_channel(&json!({"id": "C1", "name": "general"}))
        .unwrap();

    assert!(cache.remove_channel("C404").is_none());
    assert_eq!(cache.channel_count(), 1);

    let removed = cache.remove_channel("C1").unwrap();
    assert_eq!(removed.name, "general");
    assert!(cache.get_channel("C1").is_none());
    assert!(cache.remove_channel("C1").is_none());
}

#[test]
fn test_removed_entity_stays_valid_for_holders() {
    let cache = EntityCache::new();
    cache.register_user(&user_payload("U1", "ann", "Engineer")).unwrap();

    let held = cache.get_user("U1").unwrap();
    cache.remove_user("U1");

    assert!(cache.get_user("U1").is_none());
    assert_eq!(held.name, "ann");
}

#[test]
fn test_concurrent_readers_see_whole_entities() {
    const WRITES: usize = 500;
    const READERS: usize = 4;
    const READS: usize = 2_000;

    let cache = Arc::new(EntityCache::new());
    cache.register_user(&user_payload("U1", "v0", "title-v0")).unwrap();

    let writer = {
        let cache = Arc::clone(&cache);
        thread::spawn(move || {
            for i in 1..=WRITES {
                let version = format!("v{}", i);
                cache
                    .register_user(&user_payload("U1", &version, &format!("title-{}", version)))
                    .unwrap();
            }
        })
    };

    let readers: Vec<_> = (0..READERS)
        .map(|_| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                for _ in 0..READS {
                    let user = cache.get_user("U1").expect("U1 is never removed");
                    // name and title are written together, so they must agree
                    let expected_title = format!("title-{}", user.name);
                    assert_eq!(user.profile.title.as_deref(), Some(expected_title.as_str()));
                    assert_eq!(user.profile.display_name.as_deref(), Some(user.name.as_str()));
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }

    assert_eq!(cache.get_user("U1").unwrap().name, format!("v{}", WRITES));
    assert_eq!(cache.user_count(), 1);
}
