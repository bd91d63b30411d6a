//! HTTP and WebSocket surface.
//!
//! - `POST /api/create-game` - create a game from query parameters
//! - `GET  /api/game/{id}` - game summary
//! - `GET  /api/game/{id}/status` - existence check, never 404s
//! - `GET  /ws` - live channel
//! - `GET  /health` - liveness

use std::sync::Arc;

use axum::extract::rejection::QueryRejection;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use duosweep_protocol::{CreateGameParams, CreatedGame, ErrorBody, GameInfo, GameStatusInfo};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};

use crate::connection::{ChannelConnection, Connection, next_connection_id};
use crate::coordinator::Coordinator;
use crate::error::SessionError;

type ApiError = (StatusCode, Json<ErrorBody>);

fn api_error(error: SessionError) -> ApiError {
    let status = match error {
        SessionError::NotFound => StatusCode::NOT_FOUND,
        SessionError::InvariantViolation(_) => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_REQUEST,
    };
    let body = ErrorBody {
        error: error.to_string(),
    };
    (status, Json(body))
}

fn bad_query(rejection: QueryRejection) -> ApiError {
    let body = ErrorBody {
        error: rejection.body_text(),
    };
    (StatusCode::BAD_REQUEST, Json(body))
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthBody {
    pub status: String,
    pub version: String,
}

pub fn router(coordinator: Arc<Coordinator>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/create-game", post(create_game))
        .route("/api/game/{id}", get(game_info))
        .route("/api/game/{id}/status", get(game_status))
        .route("/ws", get(live_channel))
        .layer(cors)
        .with_state(coordinator)
}

async fn health() -> Json<HealthBody> {
    Json(HealthBody {
        status: "ok".to_owned(),
        version: env!("CARGO_PKG_VERSION").to_owned(),
    })
}

async fn create_game(
    State(coordinator): State<Arc<Coordinator>>,
    query: Result<Query<CreateGameParams>, QueryRejection>,
) -> Result<Json<CreatedGame>, ApiError> {
    let Query(params) = query.map_err(bad_query)?;
    coordinator
        .registry()
        .create(&params, coordinator.now())
        .map(Json)
        .map_err(api_error)
}

async fn game_info(
    State(coordinator): State<Arc<Coordinator>>,
    Path(id): Path<String>,
) -> Result<Json<GameInfo>, ApiError> {
    coordinator.registry().info(&id).map(Json).map_err(api_error)
}

async fn game_status(
    State(coordinator): State<Arc<Coordinator>>,
    Path(id): Path<String>,
) -> Json<GameStatusInfo> {
    Json(coordinator.registry().status(&id))
}

async fn live_channel(
    ws: WebSocketUpgrade,
    State(coordinator): State<Arc<Coordinator>>,
) -> Response {
    ws.on_upgrade(move |socket| serve_socket(socket, coordinator))
}

/// Pumps one socket: a writer task drains the connection's outbox while this task feeds
/// inbound text frames to the coordinator.
async fn serve_socket(socket: WebSocket, coordinator: Arc<Coordinator>) {
    let (mut sink, mut stream) = socket.split();
    let (conn, mut outbox) = ChannelConnection::new(next_connection_id());
    let conn: Arc<dyn Connection> = Arc::new(conn);
    let conn_id = conn.id();
    log::debug!("Connection {conn_id} opened");

    let writer = tokio::spawn(async move {
        while let Some(message) = outbox.next().await {
            let text = match message.to_json() {
                Ok(text) => text,
                Err(err) => {
                    log::warn!("Could not encode {}: {err}", message.kind());
                    continue;
                }
            };
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => coordinator.handle_text(&conn, text.as_str()),
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(err) => {
                log::debug!("Connection {conn_id} failed: {err}");
                break;
            }
        }
    }

    coordinator.on_disconnect(conn_id);
    writer.abort();
    log::debug!("Connection {conn_id} closed");
}
