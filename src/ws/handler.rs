//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::util::time::unix_millis;
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let conn_id = Uuid::new_v4();
    info!(conn_id = %conn_id, "New WebSocket connection");

    let (mut ws_sink, ws_stream) = socket.split();

    let welcome = ServerMsg::Welcome {
        session_id: state.session.view().session_id,
        server_time: unix_millis(),
    };

    if let Err(e) = send_msg(&mut ws_sink, &welcome).await {
        error!(conn_id = %conn_id, error = %e, "Failed to send welcome");
        return;
    }

    run_connection(conn_id, state, ws_sink, ws_stream).await;

    info!(conn_id = %conn_id, "WebSocket connection closed");
}

/// Stream session views out and handle client messages in
async fn run_connection(
    conn_id: Uuid,
    state: AppState,
    mut ws_sink: SplitSink<WebSocket, Message>,
    mut ws_stream: SplitStream<WebSocket>,
) {
    let mut views = state.session.subscribe();
    // Replies from the reader go through the writer so the sink has one owner
    let (reply_tx, mut reply_rx) = mpsc::channel::<ServerMsg>(16);

    let writer_handle = tokio::spawn(async move {
        loop {
            let msg = tokio::select! {
                changed = views.changed() => {
                    if changed.is_err() {
                        debug!(conn_id = %conn_id, "Session view channel closed");
                        break;
                    }
                    let view = views.borrow_and_update().clone();
                    ServerMsg::State { view }
                }
                reply = reply_rx.recv() => match reply {
                    Some(msg) => msg,
                    None => break,
                },
            };

            if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                debug!(conn_id = %conn_id, error = %e, "WebSocket send failed");
                break;
            }
        }
    });

    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                let reply = match serde_json::from_str::<ClientMsg>(&text) {
                    Ok(msg) => handle_client_msg(conn_id, &state, msg).await,
                    Err(e) => {
                        warn!(conn_id = %conn_id, error = %e, "Failed to parse client message");
                        Some(ServerMsg::Error {
                            message: format!("invalid message: {}", e),
                        })
                    }
                };

                if let Some(reply) = reply {
                    if reply_tx.send(reply).await.is_err() {
                        break;
                    }
                }
            }
            Ok(Message::Binary(_)) => {
                warn!(conn_id = %conn_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(conn_id = %conn_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(conn_id = %conn_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    writer_handle.abort();
}

async fn handle_client_msg(conn_id: Uuid, state: &AppState, msg: ClientMsg) -> Option<ServerMsg> {
    match msg {
        ClientMsg::Ping { t } => Some(ServerMsg::Pong {
            t,
            server_time: unix_millis(),
        }),
        ClientMsg::Reset => {
            if !state.reset_limiter.check() {
                warn!(conn_id = %conn_id, "Rate limited reset");
                return Some(ServerMsg::Error {
                    message: "reset rate limited".into(),
                });
            }

            match state.session.reset().await {
                Ok(session_id) => {
                    info!(conn_id = %conn_id, session_id = %session_id, "Session reset over WebSocket");
                    None
                }
                Err(e) => Some(ServerMsg::Error {
                    message: e.to_string(),
                }),
            }
        }
    }
}

/// Send a message over WebSocket
async fn send_msg(sink: &mut SplitSink<WebSocket, Message>, msg: &ServerMsg) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json)).await.map_err(|e| e.to_string())
}
