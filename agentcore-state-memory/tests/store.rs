use agentcore_context::{MemoryEntry, MemoryEntryKind, MemorySink};
use agentcore_state_memory::{MemoryStore, StateMemorySink};
use agentcore_types::{Scope, SessionId, StateReader, StateStore};
use std::sync::Arc;

fn session_scope(id: &str) -> Scope {
    Scope::Session(SessionId::new(id))
}

#[tokio::test]
async fn two_sessions_never_see_each_other_keys() {
    let store = MemoryStore::new();
    let a = session_scope("a");
    let b = session_scope("b");

    store.write(&a, "note", serde_json::json!("a's secret")).await.unwrap();

    assert_eq!(StateStore::read(&store, &b, "note").await.unwrap(), None);
    assert_eq!(
        StateStore::list(&store, &b, "").await.unwrap(),
        Vec::<String>::new()
    );
}

#[tokio::test]
async fn capacity_cap_bounds_one_scope_without_starving_another() {
    let store = MemoryStore::with_capacity_per_scope(3);
    let hot = session_scope("hot");
    let cold = session_scope("cold");

    for i in 0..10 {
        store
            .write(&hot, &format!("k{i}"), serde_json::json!(i))
            .await
            .unwrap();
    }
    store.write(&cold, "only-key", serde_json::json!("kept")).await.unwrap();

    assert_eq!(StateStore::list(&store, &hot, "").await.unwrap().len(), 3);
    assert_eq!(store.evictions(), 7);
    assert_eq!(
        StateStore::read(&store, &cold, "only-key").await.unwrap(),
        Some(serde_json::json!("kept"))
    );
}

#[tokio::test]
async fn reading_an_entry_protects_it_from_the_next_eviction() {
    let store = MemoryStore::with_capacity_per_scope(2);
    let scope = Scope::Global;

    store.write(&scope, "old", serde_json::json!(1)).await.unwrap();
    store.write(&scope, "mid", serde_json::json!(2)).await.unwrap();
    // bump "old" so it is no longer the least recently used
    StateStore::read(&store, &scope, "old").await.unwrap();
    store.write(&scope, "new", serde_json::json!(3)).await.unwrap();

    assert!(StateStore::read(&store, &scope, "old").await.unwrap().is_some());
    assert!(StateStore::read(&store, &scope, "new").await.unwrap().is_some());
    assert!(StateStore::read(&store, &scope, "mid").await.unwrap().is_none());
}

#[tokio::test]
async fn unbounded_store_keeps_everything() {
    let store = MemoryStore::new();
    let scope = session_scope("s1");
    for i in 0..40 {
        store
            .write(&scope, &format!("k{i}"), serde_json::json!(i))
            .await
            .unwrap();
    }
    assert_eq!(store.evictions(), 0);
    assert_eq!(StateStore::list(&store, &scope, "").await.unwrap().len(), 40);
}

#[tokio::test]
async fn delete_on_a_missing_key_is_not_an_error() {
    let store = MemoryStore::new();
    store.delete(&Scope::Global, "never-written").await.unwrap();
}

#[tokio::test]
async fn search_returns_empty_vec() {
    let store = MemoryStore::new();
    let scope = session_scope("s1");
    store.write(&scope, "k", serde_json::json!("v")).await.unwrap();
    let results = StateStore::search(&store, &scope, "v", 10).await.unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn usable_as_dyn_state_reader() {
    let store = MemoryStore::new();
    let scope = session_scope("s1");
    store.write(&scope, "key", serde_json::json!("val")).await.unwrap();

    let reader: &dyn StateReader = &store;
    let val = reader.read(&scope, "key").await.unwrap();
    assert_eq!(val, Some(serde_json::json!("val")));
}

#[tokio::test]
async fn concurrent_writes_to_different_keys() {
    let store = Arc::new(MemoryStore::new());
    let scope = session_scope("s1");

    let mut handles = vec![];
    for i in 0..10 {
        let store = Arc::clone(&store);
        let scope = scope.clone();
        handles.push(tokio::spawn(async move {
            store
                .write(&scope, &format!("key{i}"), serde_json::json!(i))
                .await
                .unwrap();
        }));
    }
    for h in handles {
        h.await.unwrap();
    }

    let store_ref: &dyn StateStore = store.as_ref();
    for i in 0..10 {
        let val = store_ref.read(&scope, &format!("key{i}")).await.unwrap();
        assert_eq!(val, Some(serde_json::json!(i)));
    }
}

#[tokio::test]
async fn state_memory_sink_is_usable_as_a_trait_object_memory_sink() {
    let store: Arc<dyn StateStore> = Arc::new(MemoryStore::new());
    let scope = session_scope("s1");
    let sink: Arc<dyn MemorySink> = Arc::new(StateMemorySink::new(store.clone(), scope.clone()));

    sink.record(MemoryEntry {
        kind: MemoryEntryKind::ToolOutcome,
        content: "ran `cargo fmt`, clean".into(),
    })
    .await;

    let keys = StateStore::list(&store, &scope, "memory-").await.unwrap();
    assert_eq!(keys.len(), 1);
    let stored = StateStore::read(&store, &scope, &keys[0]).await.unwrap().unwrap();
    assert_eq!(stored["kind"], "tool_outcome");
    assert_eq!(stored["content"], "ran `cargo fmt`, clean");
}

#[tokio::test]
async fn state_memory_sink_keys_dont_collide_across_many_records() {
    let store = Arc::new(MemoryStore::new());
    let scope = Scope::Global;
    let sink = StateMemorySink::new(store.clone(), scope.clone());

    for i in 0..25 {
        sink.record(MemoryEntry {
            kind: MemoryEntryKind::StructuredFinding,
            content: format!("finding {i}"),
        })
        .await;
    }

    assert_eq!(StateStore::list(&store, &scope, "memory-").await.unwrap().len(), 25);
}
