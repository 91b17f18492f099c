//! WebSocket endpoint
//!
//! A connection moves through Connecting → Registered → Streaming → Closed.
//! The first text frame declares the category the client wants pushes for;
//! after that every frame is a tagged [`ClientMessage`]. Bad frames are logged
//! and dropped without closing the connection.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::stream::{Stream, StreamExt};
use futures::SinkExt;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tunebox_common::events::{parse_declaration, Category, ClientMessage, ServerMessage};
use uuid::Uuid;

use crate::broadcast::{ConnectionId, Outbox};
use crate::state::AppContext;

/// GET /ws
pub async fn ws_handler(ws: WebSocketUpgrade, State(ctx): State<AppContext>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, ctx))
}

async fn handle_socket(socket: WebSocket, ctx: AppContext) {
    let id: ConnectionId = Uuid::new_v4();
    let (mut sink, mut stream) = socket.split();
    let (outbox, mut inbox) = mpsc::unbounded_channel::<ServerMessage>();

    let writer = tokio::spawn(async move {
        while let Some(message) = inbox.recv().await {
            let text = match message.to_json() {
                Ok(text) => text,
                Err(e) => {
                    warn!("Failed to serialize outbound message: {}", e);
                    continue;
                }
            };
            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    serve_connection(&ctx, id, &mut stream, outbox).await;
    writer.abort();
}

/// Drive one connection from its first frame until it closes
///
/// Outbound messages go to `outbox`; the connection is unregistered from the
/// broadcaster before returning.
pub async fn serve_connection<S>(ctx: &AppContext, id: ConnectionId, stream: &mut S, outbox: Outbox)
where
    S: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    // Connecting
    ctx.broadcaster.register_pending(id, outbox.clone()).await;
    debug!("WebSocket {} connected", id);

    if let Some(category) = await_declaration(id, stream).await {
        // Registered
        if ctx.broadcaster.subscribe(id, category.clone()).await {
            // Streaming
            stream_messages(id, &category, stream, &outbox, ctx).await;
        }
    }

    // Closed
    ctx.broadcaster.unsubscribe_all(id).await;
    info!("Client {} disconnected", id);
}

/// Wait for the category declaration; None if the client leaves or never declares
async fn await_declaration<S>(id: ConnectionId, stream: &mut S) -> Option<Category>
where
    S: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                return match parse_declaration(&text) {
                    Ok(category) => Some(category),
                    Err(e) => {
                        warn!("Connection {} sent an invalid declaration: {}", id, e);
                        None
                    }
                };
            }
            Ok(Message::Close(_)) => return None,
            Ok(_) => continue,
            Err(e) => {
                debug!("Connection {} errored before declaring: {}", id, e);
                return None;
            }
        }
    }
    None
}

async fn stream_messages<S>(
    id: ConnectionId,
    category: &Category,
    stream: &mut S,
    outbox: &Outbox,
    ctx: &AppContext,
) where
    S: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    while let Some(frame) = stream.next().await {
        let text = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                debug!("Connection {} errored: {}", id, e);
                break;
            }
        };

        match ClientMessage::parse(&text) {
            Ok(ClientMessage::Heartbeat) => {
                if outbox.send(ServerMessage::pong()).is_err() {
                    break;
                }
            }
            Ok(ClientMessage::QueueUpdate) => ctx.broadcaster.push_queue().await,
            Ok(ClientMessage::MusicControl) => ctx.broadcaster.push_now_playing().await,
            Err(e) => warn!("Ignoring message from {} ({}): {}", id, category, e),
        }
    }
}
