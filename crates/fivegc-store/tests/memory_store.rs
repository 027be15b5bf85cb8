use fivegc_core::{CoreError, EventType, Kind, Object, ObjectKey, ObjectStore, ObjectStoreExt};
use fivegc_store::MemoryStore;
use serde_json::json;

fn session_context(ns: &str, name: &str) -> Object {
    let mut obj = Object::new(&ObjectKey::new(Kind::SessionContext, ns, name));
    obj.spec = json!({"guti": "guti-1", "sessionId": 5});
    obj
}

#[tokio::test]
async fn watch_delivers_events_in_version_order() {
    let store = MemoryStore::new();
    let mut rx = store.watch(Kind::SessionContext);

    let created = store.create(session_context("user-1", "user-1")).await.unwrap();
    store
        .patch(&created.key(), &json!({"spec": {"idle": true}}))
        .await
        .unwrap();
    store.delete(&created.key()).await.unwrap();

    let mut last = 0;
    let mut types = vec![];
    for _ in 0..3 {
        let ev = rx.recv().await.unwrap();
        assert!(ev.object.metadata.resource_version > last);
        last = ev.object.metadata.resource_version;
        types.push(ev.event_type);
    }
    assert_eq!(
        types,
        vec![EventType::Added, EventType::Updated, EventType::Deleted]
    );
}

#[tokio::test]
async fn watch_is_per_kind() {
    let store = MemoryStore::new();
    let mut rx = store.watch(Kind::UpfConfig);
    store.create(session_context("ns", "a")).await.unwrap();
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn merge_patch_null_clears_and_bumps_generation() {
    let store = MemoryStore::new();
    let created = store.create(session_context("ns", "a")).await.unwrap();

    let idle = store
        .patch(&created.key(), &json!({"spec": {"idle": true}}))
        .await
        .unwrap();
    assert_eq!(idle.spec["idle"], true);
    assert_eq!(idle.metadata.generation, 2);

    let active = store
        .patch(&created.key(), &json!({"spec": {"idle": null}}))
        .await
        .unwrap();
    assert!(active.spec.get("idle").is_none());
    assert_eq!(active.spec, created.spec);
    assert_eq!(active.metadata.generation, 3);
}

#[tokio::test]
async fn patch_can_set_labels_and_status() {
    let store = MemoryStore::new();
    let created = store.create(session_context("ns", "a")).await.unwrap();
    let patched = store
        .patch(
            &created.key(),
            &json!({"metadata": {"labels": {"state": "Ready"}}, "status": {"x": 1}}),
        )
        .await
        .unwrap();
    assert_eq!(patched.label("state"), Some("Ready"));
    assert_eq!(patched.status, Some(json!({"x": 1})));
    assert_eq!(patched.metadata.generation, 1);
}

#[tokio::test]
async fn delete_returns_last_state_and_missing_is_not_found() {
    let store = MemoryStore::new();
    let created = store.create(session_context("ns", "a")).await.unwrap();
    let deleted = store.delete(&created.key()).await.unwrap();
    assert_eq!(deleted.spec, created.spec);

    let err = store.delete(&created.key()).await.unwrap_err();
    assert!(matches!(err, CoreError::NotFound { .. }));
    assert_eq!(store.delete_if_exists(&created.key()).await.unwrap(), None);
    assert_eq!(store.try_get(&created.key()).await.unwrap(), None);
}

#[tokio::test]
async fn list_filters_by_kind_and_namespace() {
    let store = MemoryStore::new();
    store.create(session_context("a", "x")).await.unwrap();
    store.create(session_context("a", "y")).await.unwrap();
    store.create(session_context("b", "x")).await.unwrap();

    assert_eq!(store.list(Kind::SessionContext, None).await.unwrap().len(), 3);
    let in_a = store.list(Kind::SessionContext, Some("a")).await.unwrap();
    assert_eq!(
        in_a.iter().map(|o| o.name()).collect::<Vec<_>>(),
        vec!["x", "y"]
    );
    assert!(store.list(Kind::Session, None).await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_writers_never_overwrite_silently() {
    let store = MemoryStore::new();
    let created = store.create(session_context("ns", "counter")).await.unwrap();
    let key = created.key();

    let tasks: Vec<_> = (0..8)
        .map(|i| {
            let store = store.clone();
            let key = key.clone();
            tokio::spawn(async move {
                loop {
                    let mut current = store.get(&key).await.unwrap();
                    let seen = current.spec["writers"].as_array().cloned().unwrap_or_default();
                    let mut next = seen.clone();
                    next.push(json!(i));
                    current.spec["writers"] = json!(next);
                    match store.update(current).await {
                        Ok(_) => break,
                        Err(e) if e.is_contention() => continue,
                        Err(e) => panic!("unexpected {e}"),
                    }
                }
            })
        })
        .collect();
    futures::future::join_all(tasks).await;

    let done = store.get(&key).await.unwrap();
    assert_eq!(done.spec["writers"].as_array().unwrap().len(), 8);
}
