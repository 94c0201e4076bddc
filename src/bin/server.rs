use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use oddsmerge::serve::{query_events, snapshot_status, EventsQuery, QueryOutcome};
use oddsmerge::{spawn_ingest_loop, warm_start, Config, SnapshotStore};
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

#[derive(Clone)]
struct AppState {
    store: SnapshotStore,
    config: Arc<Config>,
}

async fn events(State(state): State<AppState>, Query(query): Query<EventsQuery>) -> Response {
    let outcome = query_events(&state.store, state.config.read_timeout(), &query).await;
    match outcome {
        QueryOutcome::Served(resp) => {
            let etag = resp.etag.clone();
            ([(header::ETAG, etag)], Json(resp)).into_response()
        }
        QueryOutcome::NotModified { etag } => {
            (StatusCode::NOT_MODIFIED, [(header::ETAG, etag)]).into_response()
        }
        QueryOutcome::NoDataYet => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "error": "no snapshot published yet; the collector may not be running"
            })),
        )
            .into_response(),
        QueryOutcome::TimedOut => (
            StatusCode::GATEWAY_TIMEOUT,
            Json(json!({
                "error": "snapshot read timed out; try again shortly"
            })),
        )
            .into_response(),
    }
}

async fn health(State(state): State<AppState>) -> Response {
    match snapshot_status(&state.store, state.config.read_timeout()).await {
        Ok((version, generated_at)) => Json(json!({
            "status": "ok",
            "version": version,
            "generated_at": generated_at.timestamp(),
        }))
        .into_response(),
        Err(QueryOutcome::NoDataYet) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "warming_up" })),
        )
            .into_response(),
        Err(_) => (
            StatusCode::GATEWAY_TIMEOUT,
            Json(json!({ "status": "busy" })),
        )
            .into_response(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt::init();

    let config = Arc::new(Config::from_env()?);
    let store = SnapshotStore::new();

    warm_start(&config, &store).await?;
    spawn_ingest_loop(config.clone(), store.clone());

    let state = AppState {
        store,
        config: config.clone(),
    };

    let app = Router::new()
        .route("/events", get(events))
        .route("/health", get(health))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    info!(addr = %config.bind_addr, "starting query API");
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
