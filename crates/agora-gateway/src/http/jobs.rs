use axum::{extract::State, Json};
use std::sync::Arc;

use agora_scheduler::Job;

use crate::app::AppState;

/// GET /jobs: every scheduled job, ordered by id.
pub async fn jobs_handler(State(state): State<Arc<AppState>>) -> Json<Vec<Job>> {
    Json(state.scheduler.list())
}
