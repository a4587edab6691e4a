use super::*;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/trigger", post(trigger))
        .route("/poll", post(poll))
        .route("/history", get(history))
        .route("/repeat", post(repeat))
        .route("/undo", post(undo))
        .route("/force_undo", post(force_undo))
        .route("/preferences", post(preferences))
        .route("/clear_history", post(clear_history))
        .route("/scan_test", post(scan_test))
        .route("/stats", get(stats))
        .with_state(state)
}
