use super::*;

pub(super) const BANNER: &str = "chaos-bridge is running.\n\
POST /trigger {prompt}\n\
POST /poll\n\
GET  /history\n\
POST /repeat {command_id}\n\
POST /undo {command_id}\n\
POST /force_undo {command_id}\n\
POST /preferences {includeHistoryInAI?, historyEnabled?, maxHistoryLength?}\n\
POST /clear_history\n\
POST /scan_test {url}\n\
GET  /stats\n";

fn bad_request(message: impl Into<String>) -> Response {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(message))).into_response()
}

pub(super) async fn index() -> &'static str {
    BANNER
}

pub(super) async fn trigger(State(state): State<AppState>, body: Bytes) -> Response {
    let req: TriggerRequest = parse_lenient(&body);
    let Some(prompt) = req.prompt.filter(|p| !p.trim().is_empty()) else {
        return bad_request("No prompt");
    };

    match state.dispatcher.intake(&prompt).await {
        Ok(IntakeOutcome::Queued(queued)) => Json(QueuedResponse::from(queued)).into_response(),
        Ok(IntakeOutcome::Ignored { message, .. }) => Json(IgnoredResponse {
            status: "ignored",
            message,
        })
        .into_response(),
        Err(e) => bad_request(e.to_string()),
    }
}

pub(super) async fn poll(State(state): State<AppState>) -> Json<PollResponse> {
    let code = state.dispatcher.poll();
    Json(PollResponse {
        has_code: code.is_some(),
        code,
    })
}

pub(super) async fn history(State(state): State<AppState>) -> Json<HistoryResponse> {
    let (history, preferences) = state.dispatcher.history();
    Json(HistoryResponse {
        history,
        preferences,
    })
}

pub(super) async fn repeat(State(state): State<AppState>, body: Bytes) -> Response {
    let req: CommandRequest = parse_lenient(&body);
    let Some(command_id) = req.command_id else {
        return bad_request("No command_id");
    };

    let response = match state.dispatcher.repeat(command_id) {
        Ok(()) => StatusResponse::success(format!("Repeating command #{}", command_id)),
        Err(e) => StatusResponse::error(e.to_string()),
    };
    Json(response).into_response()
}

pub(super) async fn undo(State(state): State<AppState>, body: Bytes) -> Response {
    let req: CommandRequest = parse_lenient(&body);
    let Some(command_id) = req.command_id else {
        return bad_request("No command_id");
    };

    let response = match state.dispatcher.undo(command_id) {
        Ok(()) => StatusResponse::success(format!("Undo queued for command #{}", command_id)),
        Err(e) => StatusResponse::error(e.to_string()),
    };
    Json(response).into_response()
}

pub(super) async fn force_undo(State(state): State<AppState>, body: Bytes) -> Response {
    let req: CommandRequest = parse_lenient(&body);
    let Some(command_id) = req.command_id else {
        return bad_request("No command_id");
    };

    let response = match state.dispatcher.force_undo(command_id).await {
        Ok(code) => StatusResponse {
            status: "success",
            message: format!("Force undo queued for command #{}", command_id),
            force_undo_code: Some(code),
        },
        Err(e) => StatusResponse::error(e.to_string()),
    };
    Json(response).into_response()
}

pub(super) async fn preferences(
    State(state): State<AppState>,
    body: Bytes,
) -> Json<PreferencesResponse> {
    let update: PreferencesUpdate = parse_lenient(&body);
    Json(PreferencesResponse {
        status: "success",
        preferences: state.dispatcher.update_preferences(update),
    })
}

pub(super) async fn clear_history(State(state): State<AppState>) -> Json<StatusResponse> {
    let removed = state.dispatcher.clear_history();
    Json(StatusResponse::success(format!(
        "Cleared {} commands from history",
        removed
    )))
}

pub(super) async fn scan_test(State(state): State<AppState>, body: Bytes) -> Response {
    if !state.dispatcher.scanner_enabled() {
        return bad_request("Image processing is disabled in configuration.");
    }

    let req: ScanTestRequest = parse_lenient(&body);
    let Some(url) = req.url.filter(|u| !u.trim().is_empty()) else {
        return bad_request("No url provided");
    };

    tracing::info!("Testing scan of {}", url);
    let outcome = state.dispatcher.scan_sample(&url).await;
    Json(ScanTestResponse {
        replaced_url: if outcome.blocked {
            state.placeholder_url.to_string()
        } else {
            url.clone()
        },
        original_url: url,
        blocked: outcome.blocked,
        ai_context_extracted: outcome.extracted_context,
    })
    .into_response()
}

pub(super) async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    let counters = state.dispatcher.metrics();
    Json(StatsResponse {
        acceptance_rate: counters.acceptance_rate(),
        counters,
        pending_scripts: state.dispatcher.pending(),
        history_length: state.dispatcher.history_len(),
        scanner_enabled: state.dispatcher.scanner_enabled(),
    })
}
