use crate::hub::{Hub, Subscription};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::HeaderMap,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info, warn};
use utils::{normalize_wallet, AppError, AppResult};

pub const EMIT_TOKEN_HEADER: &str = "x-emit-token";

#[derive(Clone)]
pub struct RealtimeState {
    pub hub: Arc<Hub>,
    /// 未配置时 /emit 不校验
    pub emit_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub wallet: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EmitRequest {
    pub event: String,
    #[serde(default)]
    pub data: Value,
    pub wallet: Option<String>,
}

pub struct RealtimeRouter;

impl RealtimeRouter {
    pub fn new(hub: Arc<Hub>, emit_token: Option<String>) -> Router {
        let state = RealtimeState { hub, emit_token };

        Router::new()
            .route("/", get(health))
            .route("/ws", get(ws_handler))
            .route("/emit", post(emit))
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .with_state(state)
    }
}

async fn health(State(state): State<RealtimeState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "connections": state.hub.connection_count(),
        "rooms": state.hub.room_count(),
    }))
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<RealtimeState>,
) -> AppResult<Response> {
    let wallet = query.wallet.as_deref().map(normalize_wallet).transpose()?;

    Ok(ws
        .on_upgrade(move |socket| handle_socket(socket, state.hub, wallet))
        .into_response())
}

async fn emit(
    State(state): State<RealtimeState>,
    headers: HeaderMap,
    Json(request): Json<EmitRequest>,
) -> AppResult<Json<Value>> {
    if let Some(expected) = &state.emit_token {
        let provided = headers.get(EMIT_TOKEN_HEADER).and_then(|v| v.to_str().ok());
        if provided != Some(expected.as_str()) {
            return Err(AppError::Unauthorized("Invalid emit token.".to_string()));
        }
    }

    if request.event.trim().is_empty() {
        return Err(AppError::BadRequest("Event name is required.".to_string()));
    }

    let delivered = state
        .hub
        .emit(&request.event, request.data, request.wallet.as_deref());

    Ok(Json(json!({ "delivered": delivered })))
}

async fn handle_socket(mut socket: WebSocket, hub: Arc<Hub>, wallet: Option<String>) {
    info!("🔌 client connected (wallet: {:?})", wallet);

    let Subscription { mut global, mut room } = hub.subscribe(wallet.as_deref());

    loop {
        let frame = tokio::select! {
            frame = global.recv() => frame,
            frame = recv_room(&mut room) => frame,
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Ping(payload))) => {
                    if socket.send(Message::Pong(payload)).await.is_err() {
                        break;
                    }
                    continue;
                }
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                // 客户端只接收推送，其他消息忽略
                Some(Ok(_)) => continue,
            },
        };

        match frame {
            Ok(payload) => {
                if socket.send(Message::Text(payload)).await.is_err() {
                    break;
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!("⚠️ client {:?} lagged, {} frames dropped", wallet, skipped);
            }
            Err(RecvError::Closed) => break,
        }
    }

    drop(global);
    drop(room);
    hub.prune();
    debug!("🔌 client disconnected (wallet: {:?})", wallet);
}

/// 没有房间订阅时永远挂起
async fn recv_room(room: &mut Option<tokio::sync::broadcast::Receiver<String>>) -> Result<String, RecvError> {
    match room {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
