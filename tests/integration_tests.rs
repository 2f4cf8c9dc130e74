//! Integration tests for pagekit
//!
//! These tests verify the complete workflow across modules: navigation
//! driving cached data loads, store updates observed by subscribers, query
//! changes, optimistic mutations, and recovery from faults.

use pagekit::*;
use pollster::block_on;
use serde_json::{json, Value};
use std::cell::RefCell;
use std::rc::Rc;

/// Route crate logs through env_logger; enable with RUST_LOG=pagekit=trace
fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn seeded_client() -> Rc<MemoryClient> {
    Rc::new(MemoryClient::new().with_collection(
        "items",
        vec![
            json!({"id": "7", "name": "Teapot", "category": "kitchen"}),
            json!({"id": "8", "name": "Lamp", "category": "office"}),
        ],
    ))
}

async fn load(client: Rc<MemoryClient>, descriptor: RequestDescriptor) -> Result<Value, RequestError> {
    client.request(descriptor).await
}

// ============================================================================
// Navigation Driving Data Tests
// ============================================================================

#[test]
fn test_navigation_loads_item_into_store() {
    init_logging();
    let client = seeded_client();
    let cache = RequestCache::new();
    let app = AppStore::new();

    let observed: Rc<RefCell<Vec<bool>>> = Rc::new(RefCell::new(Vec::new()));
    let observed_in_sub = observed.clone();
    let _sub = app.subscribe(move |state| {
        observed_in_sub.borrow_mut().push(state.loading);
    });

    let router = Router::new();
    router.add_route("/", |_, _| Ok(()));
    {
        let cache = cache.clone();
        let client = client.clone();
        let app = app.clone();
        router.add_route_with_title("/items/:id", "Item", move |params, query| {
            assert!(query.is_empty());
            let id = params.get("id").cloned().unwrap_or_default();

            app.set_loading(true);
            let key = format!("items/{id}");
            let item = block_on(cache.fetch(&key, &["Item"], || {
                load(client.clone(), RequestDescriptor::get(&key))
            }))?;
            app.set_current_item(Some(item));
            Ok(())
        });
    }

    let result = router.navigate("/items/7");
    assert!(result.is_success());

    let state = app.get_state();
    assert!(!state.loading);
    assert_eq!(state.current_item.as_ref().unwrap()["name"], "Teapot");
    assert_eq!(router.active_title().as_deref(), Some("Item"));
    assert_eq!(
        router.current_match().unwrap().params.get("id"),
        Some(&"7".to_string())
    );

    // Subscriber saw the loading transition, synchronously
    assert_eq!(*observed.borrow(), vec![true, false]);
    assert_eq!(cache.entry_state("items/7"), EntryState::Fresh);
}

#[test]
fn test_repeat_navigation_hits_cache() {
    init_logging();
    let client = seeded_client();
    let cache = RequestCache::new();

    let router = Router::new();
    router.add_route("/", |_, _| Ok(()));
    {
        let cache = cache.clone();
        let client = client.clone();
        router.add_route("/items/:id", move |params, _| {
            let key = format!("items/{}", params.get("id").cloned().unwrap_or_default());
            block_on(cache.fetch(&key, &["Item"], || {
                load(client.clone(), RequestDescriptor::get(&key))
            }))?;
            Ok(())
        });
    }

    router.navigate("/items/7");
    router.navigate("/");
    router.navigate("/items/7");

    let stats = cache.stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 1);
}

// ============================================================================
// Query Parameter Tests
// ============================================================================

#[test]
fn test_query_updates_drive_filters() {
    init_logging();
    let app = AppStore::new();

    let router = Router::new();
    {
        let app = app.clone();
        router.add_route("/items", move |_, query| {
            let search = query.get("search").cloned().unwrap_or_default();
            app.update_filters(|filters| filters.search = search.clone());
            Ok(())
        });
    }

    router.navigate("/items");
    assert_eq!(app.get_state().filters.search, "");

    let result = router.update_query(
        vec![("search".to_string(), "tea".to_string())],
        true,
    );
    assert!(result.is_success());
    assert_eq!(app.get_state().filters.search, "tea");
    assert_eq!(
        router.current_location().unwrap().to_location_string(),
        "/items?search=tea"
    );

    // Empty value prunes the key
    let result = router.update_query(vec![("search".to_string(), String::new())], true);
    assert!(result.is_success());
    assert_eq!(app.get_state().filters.search, "");
    assert_eq!(
        router.current_location().unwrap().to_location_string(),
        "/items"
    );
}

#[test]
fn test_update_query_replaces_history_entry() {
    init_logging();
    let router = Router::new();
    router.add_route("/", |_, _| Ok(()));
    router.add_route("/items", |_, _| Ok(()));

    router.navigate("/items");
    router.update_query(vec![("page".to_string(), "2".to_string())], true);
    router.update_query(vec![("page".to_string(), "3".to_string())], true);

    // Query refinements replace instead of stacking history entries:
    // back skips straight over the intermediate query states
    let back = router.back().unwrap();
    assert!(back.is_success());
    assert_eq!(
        router.current_location().unwrap().to_location_string(),
        "/"
    );
    assert!(!router.can_go_back());

    let forward = router.forward().unwrap();
    assert!(forward.is_success());
    assert_eq!(
        router.current_location().unwrap().to_location_string(),
        "/items?page=3"
    );
}

// ============================================================================
// Mutation Flow Tests
// ============================================================================

#[test]
fn test_optimistic_rename_confirmed_by_client() {
    init_logging();
    let client = seeded_client();
    let cache = RequestCache::new();

    block_on(cache.fetch("items/7", &["Item"], || {
        load(client.clone(), RequestDescriptor::get("items/7"))
    }))
    .unwrap();
    block_on(cache.fetch("items", &["Item"], || {
        load(client.clone(), RequestDescriptor::get("items"))
    }))
    .unwrap();

    let confirmed = block_on(cache.mutate(
        "items/7",
        |item| item["name"] = json!("Kettle"),
        || {
            load(
                client.clone(),
                RequestDescriptor::put("items/7", json!({"name": "Kettle"})),
            )
        },
        &["Item"],
    ))
    .unwrap();

    assert_eq!(confirmed["name"], "Kettle");
    // Both Item-tagged entries went stale; data stays visible
    assert_eq!(cache.entry_state("items/7"), EntryState::Stale);
    assert_eq!(cache.entry_state("items"), EntryState::Stale);

    // The refetch observes the server-side change
    let refreshed = block_on(cache.fetch("items/7", &["Item"], || {
        load(client.clone(), RequestDescriptor::get("items/7"))
    }))
    .unwrap();
    assert_eq!(refreshed["name"], "Kettle");
}

#[test]
fn test_failed_mutation_rolls_back_and_notifies() {
    init_logging();
    let client = seeded_client();
    let cache = RequestCache::new();
    let app = AppStore::new();

    block_on(cache.fetch("items/7", &["Item"], || {
        load(client.clone(), RequestDescriptor::get("items/7"))
    }))
    .unwrap();

    // Target a record the client does not have
    let err = block_on(cache.mutate(
        "items/7",
        |item| item["name"] = json!("Kettle"),
        || {
            load(
                client.clone(),
                RequestDescriptor::put("items/404", json!({"name": "Kettle"})),
            )
        },
        &["Item"],
    ))
    .unwrap_err();

    app.add_notification(NotificationKind::Error, err.to_string(), None);

    assert_eq!(cache.peek("items/7").unwrap()["name"], "Teapot");
    assert_eq!(cache.entry_state("items/7"), EntryState::Fresh);
    assert_eq!(app.get_state().notifications.len(), 1);
    assert_eq!(
        app.get_state().notifications[0].kind,
        NotificationKind::Error
    );
}

// ============================================================================
// History Tests
// ============================================================================

#[test]
fn test_back_and_forward_redispatch_handlers() {
    init_logging();
    let visits: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));

    let router = Router::new();
    for pattern in ["/", "/items", "/items/:id"] {
        let visits = visits.clone();
        router.add_route(pattern, move |params, _| {
            let id = params.get("id").cloned().unwrap_or_default();
            visits.borrow_mut().push(id);
            Ok(())
        });
    }

    router.navigate("/items");
    router.navigate("/items/7");
    assert!(router.can_go_back());

    let back = router.back().unwrap();
    assert!(back.is_success());
    assert_eq!(
        router.current_location().unwrap().to_location_string(),
        "/items"
    );

    let forward = router.forward().unwrap();
    assert!(forward.is_success());
    assert_eq!(
        router.current_match().unwrap().params.get("id"),
        Some(&"7".to_string())
    );

    assert_eq!(*visits.borrow(), vec!["", "7", "", "7"]);
}

// ============================================================================
// Fault Recovery Tests
// ============================================================================

#[test]
fn test_handler_failure_keeps_router_usable() {
    init_logging();
    let router = Router::new();
    router.add_route("/", |_, _| Ok(()));
    router.add_route("/broken", |_, _| Err("load exploded".into()));

    let result = router.navigate("/broken");
    assert!(result.is_handler_failed());

    // The location still moved; later navigation works normally
    assert_eq!(
        router.current_location().unwrap().to_location_string(),
        "/broken"
    );
    assert!(router.navigate("/").is_success());
}

#[test]
fn test_unmatched_path_falls_back() {
    init_logging();
    let router = Router::new();
    router.add_route("/", |_, _| Ok(()));
    router.set_fallback("/");

    router.start();
    let result = router.navigate("/nope");
    assert!(result.is_redirected());
    assert_eq!(
        router.current_location().unwrap().to_location_string(),
        "/"
    );

    // The redirect replaced the bad entry instead of stacking a second one
    router.back().unwrap();
    assert!(!router.can_go_back());
}
