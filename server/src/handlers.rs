use std::path::PathBuf;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse};
use defectlog_shared::{ClientMessage, ServerMessage};
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::db::ListOrder;
use crate::export::{build_csv, build_sql_inserts, local_csv_file_name};
use crate::logic::{apply_client_message, welcome_message};
use crate::pages::{error_page, logs_page};
use crate::state::AppState;
use crate::storage::DefectStore;

pub async fn ping_handler() -> impl IntoResponse {
    StatusCode::NO_CONTENT
}

pub async fn index_handler(
    axum::Extension(index_file): axum::Extension<PathBuf>,
) -> impl IntoResponse {
    match tokio::fs::read_to_string(&index_file).await {
        Ok(contents) => Html(contents).into_response(),
        Err(err) => {
            error!("Failed to read {}: {err}", index_file.display());
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn logs_handler(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.list(ListOrder::NewestFirst).await {
        Ok(rows) => Html(logs_page(&rows)).into_response(),
        Err(err) => {
            error!("Failed to list defects: {err:#}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(error_page(&err.to_string())),
            )
                .into_response()
        }
    }
}

pub async fn export_csv_handler(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.list(ListOrder::NewestFirst).await {
        Ok(rows) => {
            let file_name = local_csv_file_name();
            info!("CSV export rows={} file={file_name}", rows.len());
            (
                [
                    (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{file_name}\""),
                    ),
                ],
                build_csv(&rows),
            )
                .into_response()
        }
        Err(err) => {
            error!("CSV export failed: {err:#}");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
        }
    }
}

pub async fn export_sql_handler(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.list(ListOrder::Insertion).await {
        Ok(rows) => {
            info!(
                "SQL export rows={} table={}",
                rows.len(),
                state.config.export_table
            );
            (
                [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                build_sql_inserts(&rows, &state.config.export_table),
            )
                .into_response()
        }
        Err(err) => {
            error!("SQL export failed: {err:#}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("-- Error generating export: {err}"),
            )
                .into_response()
        }
    }
}

pub async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Replies go out in the encoding the request came in.
#[derive(Clone, Copy, Debug)]
enum Encoding {
    Binary,
    Json,
}

fn encode(message: &ServerMessage, encoding: Encoding) -> Option<Message> {
    match encoding {
        Encoding::Binary => bincode::encode_to_vec(message, bincode::config::standard())
            .map(Message::Binary)
            .map_err(|err| error!("WS encode failed: {err}"))
            .ok(),
        Encoding::Json => serde_json::to_string(message)
            .map(Message::Text)
            .map_err(|err| error!("WS encode failed: {err}"))
            .ok(),
    }
}

fn decode(message: Message) -> Option<(ClientMessage, Encoding)> {
    match message {
        Message::Text(text) => serde_json::from_str::<ClientMessage>(&text)
            .map(|parsed| (parsed, Encoding::Json))
            .map_err(|err| warn!("WS ignoring malformed text frame: {err}"))
            .ok(),
        Message::Binary(data) => {
            bincode::decode_from_slice::<ClientMessage, _>(&data, bincode::config::standard())
                .map(|(parsed, _)| (parsed, Encoding::Binary))
                .map_err(|err| warn!("WS ignoring malformed binary frame: {err}"))
                .ok()
        }
        _ => None,
    }
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut socket_sender, mut socket_receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<(ServerMessage, Encoding)>();
    let connection_id = Uuid::new_v4();
    info!("WS connected conn={connection_id}");

    let total = match state.store.count().await {
        Ok(total) => total,
        Err(err) => {
            error!("WS welcome count failed conn={connection_id}: {err:#}");
            0
        }
    };
    let _ = tx.send((welcome_message(&state.config, total), Encoding::Binary));

    let send_task = tokio::spawn(async move {
        while let Some((message, encoding)) = rx.recv().await {
            if let Some(frame) = encode(&message, encoding) {
                if socket_sender.send(frame).await.is_err() {
                    break;
                }
            }
        }
    });

    let mut close_frame = None;

    while let Some(Ok(message)) = socket_receiver.next().await {
        if let Message::Close(frame) = message {
            close_frame = frame;
            break;
        }
        let Some((client_message, encoding)) = decode(message) else {
            continue;
        };
        debug!("WS recv conn={connection_id} message={client_message:?}");
        let reply = apply_client_message(state.store.as_ref(), &state.config, client_message).await;
        if tx.send((reply, encoding)).is_err() {
            break;
        }
    }

    info!("WS disconnected conn={connection_id}");
    if let Some(frame) = &close_frame {
        debug!(
            "WS close frame conn={connection_id} code={:?} reason={:?}",
            frame.code, frame.reason
        );
    }
    send_task.abort();
}
