use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use tracing::{debug, instrument};

use crate::{
    interactions::{
        dispatch::{dispatch, Event},
        dto::{Interaction, InteractionResponse, INTERACTION_PING},
    },
    state::AppState,
};

pub fn interaction_routes() -> Router<AppState> {
    Router::new().route("/interactions", post(receive_interaction))
}

/// POST /interactions
/// One interaction in, exactly one response out. Dropped events get 204 and no body.
#[instrument(skip_all)]
pub async fn receive_interaction(
    State(state): State<AppState>,
    Json(payload): Json<Interaction>,
) -> Response {
    if payload.kind == INTERACTION_PING {
        return Json(InteractionResponse::pong()).into_response();
    }

    let kind = payload.kind;
    let Some(event) = Event::from_interaction(payload) else {
        debug!(kind, "unsupported interaction, dropping");
        return StatusCode::NO_CONTENT.into_response();
    };

    match dispatch(&state, event).await {
        Some(reply) => Json(InteractionResponse::message(reply)).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    async fn post(state: &AppState, body: Value) -> (StatusCode, Option<Value>) {
        let payload: Interaction = serde_json::from_value(body).unwrap();
        let res = receive_interaction(State(state.clone()), Json(payload)).await;
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json = (!bytes.is_empty()).then(|| serde_json::from_slice(&bytes).unwrap());
        (status, json)
    }

    #[tokio::test]
    async fn ping_is_answered_with_pong() {
        let state = AppState::in_memory().await;
        let (status, body) = post(&state, json!({ "type": 1 })).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, Some(json!({ "type": 1 })));
    }

    #[tokio::test]
    async fn command_gets_ephemeral_message() {
        let state = AppState::in_memory().await;
        let (status, body) = post(
            &state,
            json!({
                "type": 2,
                "member": { "user": { "id": "42", "username": "sam" } },
                "data": { "name": "set", "options": [{ "name": "calories", "type": 4, "value": 1800 }] }
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let body = body.unwrap();
        assert_eq!(body["type"], 4);
        assert_eq!(body["data"]["flags"], 64);
        assert_eq!(
            body["data"]["content"],
            "Your daily calorie intake has successfully been set to 1800."
        );
    }

    #[tokio::test]
    async fn dropped_events_have_no_body() {
        let state = AppState::in_memory().await;
        let (status, body) = post(
            &state,
            json!({
                "type": 3,
                "member": { "user": { "id": "42", "username": "sam" } },
                "data": { "custom_id": "flsomething_else" }
            }),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(body.is_none());
    }
}
