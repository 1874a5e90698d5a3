//! Filmst 방 세션 서버

mod auth;
mod config;
mod error;
mod gateway;
mod handlers;
mod protocol;
mod rooms;
mod state;
mod store;

use anyhow::Context;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use config::Config;
use futures::{SinkExt, StreamExt};
use protocol::{ClientMessage, ServerMessage};
use serde::Deserialize;
use state::AppState;
use std::sync::Arc;
use tokio::sync::mpsc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut config = Config::from_env();

    // 로깅 초기화
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.log_level))
        .with(tracing_subscriber::fmt::layer())
        .init();

    if config.auth.secret.is_empty() {
        tracing::warn!("AUTH_SECRET not set, tokens will not survive a restart");
        config.auth.secret = auth::random_secret();
    }

    let state = Arc::new(AppState::new(config.clone()));
    let app = build_router(state, &config);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!("Filmst room server started");
    tracing::info!("Address: {}", addr);
    tracing::info!("WebSocket: ws://{}/ws", addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

fn build_router(state: Arc<AppState>, config: &Config) -> Router {
    // CORS 설정
    let origins = if config.allows_any_origin() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(
            config
                .cors_origins
                .iter()
                .filter_map(|origin| origin.parse::<HeaderValue>().ok()),
        )
    };
    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any);

    // 라우터 설정
    Router::new()
        .route("/", get(handlers::index_handler))
        .route("/health", get(handlers::health_handler))
        .route("/api/rooms", post(handlers::create_room_handler))
        .route(
            "/api/rooms/:unique_name",
            get(handlers::room_handler).delete(handlers::delete_room_handler),
        )
        .route("/ws", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct WsParams {
    token: Option<String>,
}

async fn ws_handler(
    Query(params): Query<WsParams>,
    State(state): State<Arc<AppState>>,
    ws: WebSocketUpgrade,
) -> Response {
    let user_id = params
        .token
        .as_deref()
        .and_then(|token| state.auth.validate_token(token));

    match user_id {
        Some(user_id) => ws.on_upgrade(move |socket| handle_socket(socket, state, user_id)),
        None => StatusCode::UNAUTHORIZED.into_response(),
    }
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, user_id: String) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

    // 연결 처리
    let connection_id = handlers::handle_connection(state.clone(), &user_id, tx.clone()).await;

    // 송신 태스크
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Ok(json) = serde_json::to_string(&msg) {
                if ws_sender.send(Message::Text(json)).await.is_err() {
                    break;
                }
            }
        }
    });

    // 수신 처리
    while let Some(result) = ws_receiver.next().await {
        match result {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(msg) => {
                    handle_client_message(&state, &user_id, &connection_id, &tx, msg).await;
                }
                Err(e) => {
                    tracing::debug!(connection_id = %connection_id, error = %e, "Malformed client message");
                    let _ = tx.send(ServerMessage::Error {
                        code: "invalid_message".to_string(),
                        message: e.to_string(),
                    });
                }
            },
            Ok(Message::Close(_)) => break,
            Err(_) => break,
            _ => {}
        }
    }

    // 연결 해제
    handlers::handle_disconnect(state, &connection_id).await;
    send_task.abort();
}

async fn handle_client_message(
    state: &Arc<AppState>,
    user_id: &str,
    connection_id: &str,
    sender: &mpsc::UnboundedSender<ServerMessage>,
    msg: ClientMessage,
) {
    match msg {
        ClientMessage::Heartbeat => {
            handlers::handle_heartbeat(sender);
        }
        ClientMessage::SignIn {
            unique_name,
            password,
        } => {
            handlers::handle_sign_in(state.clone(), user_id, connection_id, &unique_name, &password)
                .await;
        }
        ClientMessage::SignOut => {
            handlers::handle_sign_out(state.clone(), connection_id).await;
        }
        ClientMessage::CheckMedia { unique_name, media } => {
            handlers::handle_check_media(state.clone(), connection_id, &unique_name, &media).await;
        }
        ClientMessage::IsReady { unique_name } => {
            handlers::handle_is_ready(state.clone(), connection_id, &unique_name).await;
        }
        ClientMessage::UpdatePosition {
            unique_name,
            position_ms,
        } => {
            handlers::handle_update_position(
                state.clone(),
                connection_id,
                &unique_name,
                position_ms,
            )
            .await;
        }
        ClientMessage::SendMessage { text } => {
            handlers::handle_send_message(state.clone(), connection_id, &text).await;
        }
    }
}
