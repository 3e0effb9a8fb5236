//! API routes
//!
//! Maps HTTP requests onto the user registry and the interaction log
//! toggles, and upgrades `/ws/{userId}` onto a user's endpoint channel.

use axum::{
    Json, Router,
    body::Bytes,
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade, rejection::WebSocketUpgradeRejection},
    },
    http::{HeaderMap, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use log::{debug, warn};
use serde_json::Value;
use std::borrow::Cow;
use tokio::sync::broadcast::{self, error::RecvError};

use crate::middleware::logging::log_request;
use crate::server::core::AppState;
use crate::server::responses::{
    ApiError, ErrorResponse, MessageResponse, UserResponse, UsersResponse,
};

/// Header carrying the caller's user id for toggle requests
pub const USER_ID_HEADER: &str = "x-mockfirebolt-userid";

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/v1/user",
            get(list_users).put(add_generated_user).post(add_generated_user),
        )
        .route("/api/v1/user/{user_id}", put(add_user).post(add_user))
        .route(
            "/api/v1/state/enableInteractionLogs",
            post(enable_interaction_logs),
        )
        .route(
            "/api/v1/state/disableInteractionLogs",
            post(disable_interaction_logs),
        )
        .route("/ws/{user_id}", get(connect_user))
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}

// PUT|POST /api/v1/user/{user_id}
async fn add_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    let result = state.users.add_user(Some(&user_id)).await?;
    Ok(Json(UserResponse::new(result.user_id)))
}

// PUT|POST /api/v1/user
async fn add_generated_user(
    State(state): State<AppState>,
) -> Result<Json<UserResponse>, ApiError> {
    let result = state.users.add_user(None).await?;
    Ok(Json(UserResponse::new(result.user_id)))
}

// GET /api/v1/user
async fn list_users(State(state): State<AppState>) -> Json<UsersResponse> {
    Json(UsersResponse::new(state.users.list_users().await))
}

// POST /api/v1/state/enableInteractionLogs
// Expected body: { "enabled": true, ... }
async fn enable_interaction_logs(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<MessageResponse>, ApiError> {
    let user_id = header_user_id(&headers);
    state
        .interaction_logs
        .enable(&user_id, parse_body(&body))
        .await?;
    Ok(Json(MessageResponse::new(
        "Successfully started interactionService",
    )))
}

// POST /api/v1/state/disableInteractionLogs
// Expected body: { "enabled": false }
async fn disable_interaction_logs(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<MessageResponse>, ApiError> {
    let user_id = header_user_id(&headers);
    state
        .interaction_logs
        .disable(&user_id, &parse_body(&body))
        .await?;
    Ok(Json(MessageResponse::new(
        "Successfully stopped interactionService",
    )))
}

// GET /ws/{user_id}
async fn connect_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let Some(endpoint) = state.users.connections().get(&user_id).await else {
        return (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new(
                "USER-NOT-FOUND",
                format!("No connection endpoint for user {}", user_id),
            )),
        )
            .into_response();
    };

    match ws {
        Ok(ws) => {
            let events = endpoint.subscribe();
            ws.on_upgrade(move |socket| stream_events(socket, events, user_id))
        }
        Err(rejection) => rejection.into_response(),
    }
}

/// Missing header maps to the empty id; the value is otherwise taken as is.
///
/// `to_str` only accepts visible ASCII, so the raw bytes are decoded instead
/// and non-ASCII ids stay distinct.
fn header_user_id(headers: &HeaderMap) -> Cow<'_, str> {
    headers
        .get(USER_ID_HEADER)
        .map(|value| String::from_utf8_lossy(value.as_bytes()))
        .unwrap_or(Cow::Borrowed(""))
}

/// Empty or malformed bodies carry no `enabled` key.
fn parse_body(body: &Bytes) -> Value {
    serde_json::from_slice(body).unwrap_or(Value::Null)
}

async fn stream_events(
    mut socket: WebSocket,
    mut events: broadcast::Receiver<String>,
    user_id: String,
) {
    debug!("WebSocket opened for user {}", user_id);

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(text) => {
                    if socket.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("WebSocket for user {} skipped {} events", user_id, skipped);
                }
                Err(RecvError::Closed) => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {} // client messages are ignored
            },
        }
    }

    debug!("WebSocket closed for user {}", user_id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn header_user_id_keeps_non_ascii_ids_verbatim() {
        let mut headers = HeaderMap::new();
        assert_eq!(header_user_id(&headers), "");

        headers.insert(
            USER_ID_HEADER,
            HeaderValue::from_bytes("josé".as_bytes()).unwrap(),
        );
        assert_eq!(header_user_id(&headers), "josé");

        headers.insert(
            USER_ID_HEADER,
            HeaderValue::from_bytes("zoë".as_bytes()).unwrap(),
        );
        assert_eq!(header_user_id(&headers), "zoë");
    }

    #[test]
    fn empty_header_is_distinct_from_non_ascii_header() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_ID_HEADER, HeaderValue::from_static(""));
        assert_eq!(header_user_id(&headers), "");

        headers.insert(USER_ID_HEADER, HeaderValue::from_bytes(&[0xff, b'a']).unwrap());
        assert_ne!(header_user_id(&headers), "");
    }
}
