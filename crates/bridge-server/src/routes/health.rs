use crate::state::AppState;
use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    service: String,
}

async fn ping(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: state.service_name,
    })
}

pub fn routes(state: AppState) -> Router {
    Router::new().route("/ping", get(ping)).with_state(state)
}
