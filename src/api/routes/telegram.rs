//! Telegram notification endpoints

use std::collections::BTreeMap;

use axum::{
    Json,
    body::Bytes,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};

use crate::{
    Metric,
    api::{
        error::{ApiError, ApiResult},
        state::ApiState,
        types::TestMessageRequest,
    },
    config::{TelegramConfig, TelegramConfigPayload},
    notifications::AlertState,
};

/// GET /control/notifications/telegram
pub async fn get_config(State(state): State<ApiState>) -> Json<TelegramConfig> {
    Json(state.manager.config().await)
}

/// PUT /control/notifications/telegram
///
/// Malformed JSON is answered with 400, values outside the accepted ranges
/// with 422.
pub async fn put_config(
    State(state): State<ApiState>,
    payload: Result<Json<TelegramConfigPayload>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let Json(payload) =
        payload.map_err(|e| ApiError::InvalidRequest(format!("json decode: {}", e.body_text())))?;

    let config = payload.validate()?;

    state.manager.update_config(config).await;

    Ok(StatusCode::OK)
}

/// POST /control/notifications/telegram/test
///
/// The body is optional; without a message the default test text is sent.
pub async fn send_test(State(state): State<ApiState>, body: Bytes) -> ApiResult<StatusCode> {
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        TestMessageRequest::default()
    } else {
        serde_json::from_slice::<TestMessageRequest>(&body)
            .map_err(|e| ApiError::InvalidRequest(format!("json decode: {e}")))?
    };

    state.manager.send_test(&request.message).await?;

    Ok(StatusCode::OK)
}

/// GET /control/notifications/telegram/state
pub async fn alert_states(State(state): State<ApiState>) -> Json<BTreeMap<Metric, AlertState>> {
    Json(state.manager.alert_states().await)
}
