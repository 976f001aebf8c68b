use crate::state::AppState;
use axum::{
    extract::State,
    http::{header, Method, StatusCode},
    response::{
        sse::{Event, Sse},
        Json,
    },
    routing::{get, post},
    Router,
};
use turnengine_control::PersistenceAdapter;
use turnengine_core::commands::Command;
use turnengine_core::EventEnvelope;
use std::convert::Infallible;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[cfg(test)]
pub fn make_router(state: AppState) -> Router {
    make_router_with_cors(state, "http://localhost:5173")
}

pub fn make_router_with_cors(state: AppState, cors_origin: &str) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(cors_origin.parse::<axum::http::HeaderValue>().unwrap())
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/meta", get(meta_handler))
        .route("/api/v1/snapshot", get(snapshot_handler))
        .route("/api/v1/stream", get(stream_handler))
        .route("/api/v1/save", post(save_handler))
        .route("/api/v1/pause", post(pause_handler))
        .route("/api/v1/resume", post(resume_handler))
        .route("/api/v1/commands", post(submit_command_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn meta_handler(State(app_state): State<AppState>) -> Json<serde_json::Value> {
    let sim = app_state.sim.lock();
    let ticks_per_sec = app_state.ticks_per_sec;
    let paused = app_state.paused.load(Ordering::Relaxed);
    Json(serde_json::json!({
        "turn_year": sim.game_state.meta.turn_year,
        "seed": sim.game_state.meta.seed,
        "game_id": sim.game_id,
        "empires": sim.game_state.empires.len(),
        "ticks_per_sec": ticks_per_sec,
        "paused": paused,
    }))
}

pub async fn snapshot_handler(
    State(app_state): State<AppState>,
) -> (StatusCode, [(header::HeaderName, &'static str); 1], String) {
    let sim = app_state.sim.lock();
    match serde_json::to_string(&sim.game_state) {
        Ok(json) => {
            drop(sim);
            (StatusCode::OK, [(header::CONTENT_TYPE, "application/json")], json)
        }
        Err(err) => {
            tracing::error!("snapshot serialization failed: {err}");
            drop(sim);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, "application/json")],
                r#"{"error":"serialization failed"}"#.to_string(),
            )
        }
    }
}

pub async fn save_handler(State(app_state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    let sim = app_state.sim.lock();
    let game_id = sim.game_id.clone();
    let turn_year = sim.game_state.meta.turn_year;
    let result = sim.persistence.save(&game_id, &sim.game_state);
    drop(sim);

    match result {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({"game_id": game_id, "turn_year": turn_year}))),
        Err(err) => {
            tracing::error!("save failed: {err}");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(serde_json::json!({"error": err.to_string()})))
        }
    }
}

#[derive(serde::Deserialize)]
pub struct SubmitCommandRequest {
    pub empire: u8,
    pub commands: Vec<Command>,
}

pub async fn submit_command_handler(
    State(app_state): State<AppState>,
    Json(request): Json<SubmitCommandRequest>,
) -> (StatusCode, Json<serde_json::Value>) {
    app_state.command_queue.lock().push((request.empire, request.commands));
    (StatusCode::ACCEPTED, Json(serde_json::json!({"accepted": true})))
}

pub async fn pause_handler(State(app_state): State<AppState>) -> Json<serde_json::Value> {
    app_state.paused.store(true, Ordering::Relaxed);
    Json(serde_json::json!({"paused": true}))
}

pub async fn resume_handler(State(app_state): State<AppState>) -> Json<serde_json::Value> {
    app_state.paused.store(false, Ordering::Relaxed);
    Json(serde_json::json!({"paused": false}))
}

pub async fn stream_handler(
    State(app_state): State<AppState>,
) -> Sse<impl futures_core::Stream<Item = Result<Event, Infallible>>> {
    let mut rx = app_state.event_tx.subscribe();
    let sim = app_state.sim.clone();

    let stream = async_stream::stream! {
        let mut heartbeat = tokio::time::interval(Duration::from_millis(200));
        heartbeat.tick().await;
        let mut flush = tokio::time::interval(Duration::from_millis(50));
        flush.tick().await;
        let mut pending: Vec<EventEnvelope> = Vec::new();
        loop {
            tokio::select! {
                result = rx.recv() => {
                    match result {
                        Ok(events) => pending.extend(events),
                        Err(broadcast::error::RecvError::Lagged(_)) => {}
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
                _ = flush.tick() => {
                    if !pending.is_empty() {
                        let data = serde_json::to_string(&pending).unwrap_or_default();
                        pending.clear();
                        yield Ok(Event::default().data(data));
                    }
                }
                _ = heartbeat.tick() => {
                    let turn_year = sim.lock().game_state.meta.turn_year;
                    let hb = serde_json::json!({"heartbeat": true, "turn_year": turn_year});
                    yield Ok(Event::default().data(hb.to_string()));
                }
            }
        }
    };

    Sse::new(stream).keep_alive(axum::response::sse::KeepAlive::new().interval(Duration::from_secs(30)).text("ping"))
}
