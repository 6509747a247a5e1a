use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::{header::LOCATION, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;

use vessel_console::{
    config::{AppConfig, BackendConfig, SearchConfig, SearchStrategyKind},
    BusyStatus, Confirmation, Console, HttpVesselsService, LastSeenPosition, Reconciled, Vessel,
    VesselForm, ViewEvent, ViewStore,
};

/// In-memory stand-in for the `/vessels` backend
#[derive(Clone, Default)]
struct Backend {
    vessels: Arc<Mutex<Vec<Vessel>>>,
    next_id: Arc<Mutex<u32>>,
    queries: Arc<Mutex<Vec<Value>>>,
    bodies: Arc<Mutex<Vec<Value>>>,
}

impl Backend {
    fn with(vessels: Vec<Vessel>) -> Self {
        let backend = Self::default();
        *backend.vessels.lock().unwrap() = vessels;
        backend
    }

    fn queries(&self) -> Vec<Value> {
        self.queries.lock().unwrap().clone()
    }

    fn bodies(&self) -> Vec<Value> {
        self.bodies.lock().unwrap().clone()
    }
}

#[derive(Deserialize)]
struct SearchParams {
    query: String,
}

async fn create(State(backend): State<Backend>, Json(body): Json<Value>) -> impl IntoResponse {
    backend.bodies.lock().unwrap().push(body.clone());
    let uuid = {
        let mut next_id = backend.next_id.lock().unwrap();
        let uuid = format!("abc{}", 123 + *next_id);
        *next_id += 1;
        uuid
    };
    let mut vessel: Vessel = serde_json::from_value(body).unwrap();
    vessel.uuid = Some(uuid.clone());
    backend.vessels.lock().unwrap().push(vessel);
    (StatusCode::CREATED, [(LOCATION, format!("/vessels/{uuid}"))])
}

async fn search_by_query(
    State(backend): State<Backend>,
    Query(params): Query<SearchParams>,
) -> Json<Vec<Vessel>> {
    let query: Value = serde_json::from_str(&params.query).unwrap();
    backend.queries.lock().unwrap().push(query);
    Json(backend.vessels.lock().unwrap().clone())
}

async fn search_by_body(
    State(backend): State<Backend>,
    Json(body): Json<Value>,
) -> Json<Vec<Vessel>> {
    let name = body["name"].as_str().unwrap_or_default().to_string();
    backend.bodies.lock().unwrap().push(body);
    let found = backend
        .vessels
        .lock()
        .unwrap()
        .iter()
        .filter(|v| v.name.starts_with(&name))
        .cloned()
        .collect();
    Json(found)
}

async fn load(State(backend): State<Backend>, Path(uuid): Path<String>) -> impl IntoResponse {
    let found = backend
        .vessels
        .lock()
        .unwrap()
        .iter()
        .find(|v| v.uuid.as_deref() == Some(uuid.as_str()))
        .cloned();
    match found {
        Some(vessel) => Json(vessel).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn update(
    State(backend): State<Backend>,
    Path(uuid): Path<String>,
    Json(body): Json<Value>,
) -> StatusCode {
    backend.bodies.lock().unwrap().push(body.clone());
    let mut vessels = backend.vessels.lock().unwrap();
    match vessels
        .iter_mut()
        .find(|v| v.uuid.as_deref() == Some(uuid.as_str()))
    {
        Some(stored) => {
            *stored = serde_json::from_value(body).unwrap();
            StatusCode::OK
        }
        None => StatusCode::NOT_FOUND,
    }
}

async fn delete(State(backend): State<Backend>, Path(uuid): Path<String>) -> StatusCode {
    backend
        .vessels
        .lock()
        .unwrap()
        .retain(|v| v.uuid.as_deref() != Some(uuid.as_str()));
    StatusCode::OK
}

async fn spawn_backend(backend: Backend) -> String {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = Router::new()
        .route("/vessels", post(create).get(search_by_query))
        .route("/vessels/search", post(search_by_body))
        .route("/vessels/:uuid", get(load).put(update).delete(delete))
        .with_state(backend);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}

fn app_config(base_url: &str, strategy: SearchStrategyKind) -> AppConfig {
    AppConfig {
        backend: BackendConfig {
            base_url: base_url.to_string(),
            request_timeout: Duration::from_secs(5),
        },
        search: SearchConfig {
            strategy,
            range_width: 2.0,
            min_name_length: 3,
        },
    }
}

async fn console_for(
    backend: Backend,
    strategy: SearchStrategyKind,
) -> Console<HttpVesselsService> {
    vessel_console::init_logging();
    let base_url = spawn_backend(backend).await;
    Console::from_config(&app_config(&base_url, strategy), ViewStore::new()).unwrap()
}

fn stored(uuid: &str, name: &str) -> Vessel {
    Vessel {
        uuid: Some(uuid.to_string()),
        ..Vessel::new(name, 10.0, 50.0, 10.0)
    }
}

#[tokio::test]
async fn create_selects_registered_vessel() {
    let backend = Backend::default();
    let console = console_for(backend.clone(), SearchStrategyKind::FuzzyRangeOr).await;

    let mut form = VesselForm::default();
    form.set_name("Orion")
        .set_width(10.0)
        .set_length(50.0)
        .set_draft(10.0);
    let reconciled = console.create(&mut form).await.unwrap();
    assert!(reconciled.is_applied());

    let state = console.store().snapshot();
    let selected = state.selected.unwrap();
    assert_eq!(selected.uuid.as_deref(), Some("abc123"));
    assert_eq!(state.listing, vec![selected]);
    assert!(state.success_message.unwrap().contains("Orion"));
    assert_eq!(state.busy, BusyStatus::Idle);

    assert_eq!(
        backend.bodies(),
        vec![json!({"name": "Orion", "width": 10.0, "length": 50.0, "draft": 10.0})]
    );
}

#[tokio::test]
async fn fuzzy_search_sends_predicate_query() {
    let backend = Backend::with(vec![stored("1", "Orion"), stored("2", "Oriana")]);
    let console = console_for(backend.clone(), SearchStrategyKind::FuzzyRangeOr).await;

    let mut form = VesselForm::default();
    form.set_name("Ori").set_width(10.0);
    assert!(console.search(&mut form).await.unwrap().is_applied());

    let state = console.store().snapshot();
    assert_eq!(state.listing.len(), 2);
    assert_eq!(state.selected, None);

    let queries = backend.queries();
    assert_eq!(queries.len(), 1);
    assert_eq!(
        queries[0]["$or"][0],
        json!({"name": {"$regex": "^Ori.*", "$options": "i"}})
    );
    assert_eq!(
        queries[0]["$or"][1]["$and"],
        json!([{"width": {"$gt": 9.0}}, {"width": {"$lt": 11.0}}])
    );
}

#[tokio::test]
async fn flat_search_with_single_hit_selects_it() {
    let backend = Backend::with(vec![stored("1", "Orion"), stored("2", "Aurora")]);
    let console = console_for(backend.clone(), SearchStrategyKind::FlatEquality).await;
    console.store().update(|state| state.listing = vec![stored("9", "Stale")]);

    let mut form = VesselForm::default();
    form.set_name("Ori");
    assert!(console.search(&mut form).await.unwrap().is_applied());

    let state = console.store().snapshot();
    assert_eq!(state.selected, Some(stored("1", "Orion")));
    assert!(state.listing.is_empty());
    assert_eq!(backend.bodies(), vec![json!({"name": "Ori"})]);
    assert!(backend.queries().is_empty());
}

#[tokio::test]
async fn edit_and_update_keep_time_on_the_wire() {
    let mut vessel = stored("1", "Orion");
    vessel.last_seen_position = Some(LastSeenPosition {
        location: [60.1, 24.9],
        time: 1734361116000,
        date: None,
    });
    let backend = Backend::with(vec![vessel.clone()]);
    let console = console_for(backend.clone(), SearchStrategyKind::FuzzyRangeOr).await;
    console.store().update(|state| state.listing = vec![vessel.clone()]);

    assert!(console.edit(&vessel).await.unwrap().is_applied());
    let editing = console.store().snapshot();
    assert!(editing.editing);
    let loaded = editing.selected.unwrap();
    let date = loaded.last_seen_position.as_ref().unwrap().date.unwrap();
    assert_eq!(date.timestamp_millis(), 1734361116000);

    assert!(console.update(loaded).await.unwrap().is_applied());

    let body = backend.bodies().pop().unwrap();
    assert_eq!(
        body["lastSeenPosition"],
        json!({"location": [60.1, 24.9], "time": 1734361116000_i64})
    );
    let state = console.store().snapshot();
    assert_eq!(state.listing, vec![vessel.clone()]);
    assert_eq!(state.selected, Some(vessel));
    assert!(!state.editing);
}

#[tokio::test]
async fn rejected_update_leaves_state_alone() {
    let backend = Backend::default();
    let console = console_for(backend, SearchStrategyKind::FuzzyRangeOr).await;
    console.store().update(|state| {
        state.listing = vec![stored("1", "Orion")];
        state.selected = Some(stored("1", "Orion"));
    });
    let before = console.store().snapshot();

    let reconciled = console.update(stored("1", "Renamed")).await.unwrap();

    assert!(matches!(
        reconciled,
        Reconciled::Rejected {
            status: reqwest::StatusCode::NOT_FOUND
        }
    ));
    assert_eq!(console.store().snapshot(), before);
}

#[tokio::test]
async fn delete_requires_confirmation() {
    let backend = Backend::with(vec![stored("1", "Orion"), stored("2", "Aurora")]);
    let console = console_for(backend.clone(), SearchStrategyKind::FuzzyRangeOr).await;
    console.store().update(|state| {
        state.listing = vec![stored("1", "Orion"), stored("2", "Aurora")];
        state.selected = Some(stored("1", "Orion"));
    });

    let pending = console.request_delete(stored("1", "Orion"));
    let declined = console.delete(pending.clone(), Confirmation::Declined).await.unwrap();
    assert!(declined.is_none());
    assert_eq!(backend.vessels.lock().unwrap().len(), 2);

    let mut events = console.store().subscribe();
    let accepted = console.delete(pending, Confirmation::Accepted).await.unwrap();
    assert!(accepted.unwrap().is_applied());
    assert_eq!(backend.vessels.lock().unwrap().len(), 1);

    let state = console.store().snapshot();
    assert_eq!(state.listing, vec![stored("2", "Aurora")]);
    assert_eq!(state.selected, None);
    assert!(state.success_message.unwrap().contains("Orion"));

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    assert!(seen.contains(&ViewEvent::BusyChanged));
    assert!(seen.contains(&ViewEvent::ListingChanged));
    assert!(seen.contains(&ViewEvent::SelectionChanged));
    assert!(seen.contains(&ViewEvent::MessageChanged));
}

#[tokio::test]
async fn transport_failure_surfaces_error() {
    vessel_console::init_logging();
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = app_config(&format!("http://{addr}"), SearchStrategyKind::FuzzyRangeOr);
    let console = Console::from_config(&config, ViewStore::new()).unwrap();

    let mut form = VesselForm::default();
    form.set_name("Orion");
    let reconciled = console.search(&mut form).await.unwrap();

    assert!(matches!(reconciled, Reconciled::Failed(_)));
    let state = console.store().snapshot();
    assert_eq!(state.busy, BusyStatus::Idle);
    assert!(state.error_message.is_some());

    console.interact();
    assert_eq!(console.store().snapshot().error_message, None);
}
