use axum::{routing::get, Router};
use chrono::{DateTime, Utc};
use std::sync::Arc;

use agora_polls::PollService;
use agora_scheduler::Scheduler;

/// Shared state passed as `Arc<AppState>` to the Axum handlers.
pub struct AppState {
    pub scheduler: Scheduler,
    pub polls: Arc<PollService>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(scheduler: Scheduler, polls: Arc<PollService>) -> Self {
        Self {
            scheduler,
            polls,
            started_at: Utc::now(),
        }
    }
}

/// Assemble the operational HTTP router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(crate::http::health::health_handler))
        .route("/jobs", get(crate::http::jobs::jobs_handler))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
