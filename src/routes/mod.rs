// Route definitions

use axum::{Router, routing::get};

use crate::AppState;

mod api;

pub fn create_router(app_state: AppState) -> Router {
    // Sync triggers deliberately use GET so they can be hit from a browser
    // or a cron ping without a request body.
    Router::new()
        .route("/", get(api::index))
        .route("/sync", get(api::trigger_sync))
        .route("/sync-now", get(api::sync_now))
        .route("/publish", get(api::trigger_publish))
        .route("/status", get(api::sync_status))
        .route("/test", get(api::test_mapping))
        .route("/policies", get(api::list_policies))
        .route("/widget-demo/:listing_id", get(api::widget_demo))
        .with_state(app_state)
}
