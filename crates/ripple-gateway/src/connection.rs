use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tracing::{info, warn};
use uuid::Uuid;

use ripple_db::Database;
use ripple_types::api::Claims;
use ripple_types::events::{GatewayCommand, GatewayEvent};

use crate::dispatcher::{Dispatcher, Scope};

/// Heartbeat interval: server sends a Ping every 15 seconds.
/// If 2 consecutive Pongs are missed (~30s), the connection is dropped.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// How long a client gets to send Identify before the socket is closed.
const IDENTIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// Handle a single WebSocket connection: Identify handshake, presence
/// replay, then the event loop until either side hangs up.
pub async fn handle_connection(
    socket: WebSocket,
    dispatcher: Dispatcher,
    db: Arc<Database>,
    jwt_secret: String,
) {
    let (mut sender, mut receiver) = socket.split();

    let user_id = match wait_for_identify(&mut receiver, &jwt_secret).await {
        Some(id) => id,
        None => {
            warn!("gateway client failed to identify, closing");
            return;
        }
    };

    info!("{} connected to gateway", user_id);

    if send_event(&mut sender, &GatewayEvent::Ready { user_id })
        .await
        .is_err()
    {
        return;
    }

    let conn_id = dispatcher.connect_user(user_id).await;

    // Replay current presence of everyone sharing a chat with this user, so
    // the client sees who is already online before any transition fires.
    let co_members = load_ids(&db, user_id, |db, uid| db.co_member_ids(uid)).await;
    for other in &co_members {
        if dispatcher.is_online(*other).await {
            let event = GatewayEvent::UserStatus {
                user_id: *other,
                online: true,
                last_seen: None,
            };
            if send_event(&mut sender, &event).await.is_err() {
                return;
            }
        }
    }

    // Announce this user to their rooms' members.
    let my_chats = load_ids(&db, user_id, |db, uid| db.chat_ids_for_user(uid)).await;
    dispatcher.broadcast_scoped(
        Scope::Chats(my_chats.clone()),
        &GatewayEvent::UserStatus {
            user_id,
            online: true,
            last_seen: None,
        },
    );

    // Rooms this connection has joined. Events are filtered against this
    // set; joining is explicit and membership-checked.
    let joined: Arc<std::sync::RwLock<HashSet<Uuid>>> =
        Arc::new(std::sync::RwLock::new(HashSet::new()));

    let pong_received = Arc::new(AtomicBool::new(true));
    let pong_flag_send = pong_received.clone();
    let pong_flag_recv = pong_received.clone();

    let mut broadcast_rx = dispatcher.subscribe();
    let send_joined = joined.clone();
    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        let mut missed_heartbeats: u8 = 0;

        loop {
            tokio::select! {
                result = broadcast_rx.recv() => {
                    let outbound = match result {
                        Ok(outbound) => outbound,
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                            // Best-effort channel: the client reconciles over
                            // REST, so dropping is safe.
                            warn!("broadcast receiver lagged by {} events", n);
                            continue;
                        }
                        Err(_) => break,
                    };

                    {
                        let joined = send_joined.read().expect("room lock poisoned");
                        if !outbound.scope.matches(&joined) {
                            continue;
                        }
                    }

                    if sender.send(Message::Text(outbound.payload.into())).await.is_err() {
                        break;
                    }
                }
                _ = heartbeat.tick() => {
                    if pong_flag_send.swap(false, Ordering::Acquire) {
                        missed_heartbeats = 0;
                    } else {
                        missed_heartbeats += 1;
                        if missed_heartbeats >= 2 {
                            warn!("heartbeat timeout, dropping connection for {}", user_id);
                            break;
                        }
                    }
                    if sender.send(Message::Ping(Vec::new().into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    let recv_dispatcher = dispatcher.clone();
    let recv_joined = joined.clone();
    let recv_db = db.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<GatewayCommand>(&text) {
                    Ok(cmd) => {
                        handle_command(&recv_dispatcher, &recv_db, user_id, cmd, &recv_joined)
                            .await;
                    }
                    Err(e) => {
                        warn!(
                            "{} bad command: {} -- raw: {}",
                            user_id,
                            e,
                            log_preview(&text)
                        );
                    }
                },
                Message::Pong(_) => {
                    pong_flag_recv.store(true, Ordering::Release);
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    if let Some(last_seen) = dispatcher.disconnect_user(user_id, conn_id).await {
        // Denormalize last-seen for cold-start rendering over REST.
        let db = db.clone();
        let uid = user_id.to_string();
        let ts = last_seen.to_rfc3339();
        let persisted =
            tokio::task::spawn_blocking(move || db.touch_last_seen(&uid, &ts)).await;
        if let Ok(Err(e)) = persisted {
            warn!("failed to persist last_seen for {}: {}", user_id, e);
        }

        dispatcher.broadcast_scoped(
            Scope::Chats(my_chats),
            &GatewayEvent::UserStatus {
                user_id,
                online: false,
                last_seen: Some(last_seen),
            },
        );
    }

    info!("{} disconnected from gateway", user_id);
}

async fn handle_command(
    dispatcher: &Dispatcher,
    db: &Arc<Database>,
    user_id: Uuid,
    cmd: GatewayCommand,
    joined: &Arc<std::sync::RwLock<HashSet<Uuid>>>,
) {
    match cmd {
        GatewayCommand::Identify { .. } => {} // Already handled

        GatewayCommand::JoinChat { chat_id } => {
            // Only members may join a room; joins for foreign chats are
            // silently ignored rather than surfaced as errors.
            let db = db.clone();
            let cid = chat_id.to_string();
            let uid = user_id.to_string();
            let is_member = tokio::task::spawn_blocking(move || db.is_member(&cid, &uid))
                .await
                .ok()
                .and_then(|r| r.ok())
                .unwrap_or(false);
            if is_member {
                joined.write().expect("room lock poisoned").insert(chat_id);
            } else {
                warn!("{} tried to join foreign chat {}", user_id, chat_id);
            }
        }

        GatewayCommand::Typing { chat_id } => {
            // Ephemeral: rebroadcast to the room, never persisted. Receivers
            // expire the indicator locally after 2.5s.
            let allowed = joined
                .read()
                .expect("room lock poisoned")
                .contains(&chat_id);
            if allowed {
                dispatcher.broadcast_scoped(
                    Scope::Chat(chat_id),
                    &GatewayEvent::UserTyping { chat_id, user_id },
                );
            }
        }
    }
}

async fn wait_for_identify(
    receiver: &mut SplitStream<WebSocket>,
    jwt_secret: &str,
) -> Option<Uuid> {
    use jsonwebtoken::{DecodingKey, Validation, decode};

    let timeout = tokio::time::timeout(IDENTIFY_TIMEOUT, async {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Text(text) = msg {
                if let Ok(GatewayCommand::Identify { token }) =
                    serde_json::from_str::<GatewayCommand>(&text)
                {
                    let token_data = decode::<Claims>(
                        &token,
                        &DecodingKey::from_secret(jwt_secret.as_bytes()),
                        &Validation::default(),
                    )
                    .ok()?;

                    return Some(token_data.claims.sub);
                }
            }
        }
        None
    });

    timeout.await.ok().flatten()
}

async fn send_event(
    sender: &mut SplitSink<WebSocket, Message>,
    event: &GatewayEvent,
) -> Result<(), ()> {
    let payload = match serde_json::to_string(event) {
        Ok(payload) => payload,
        Err(e) => {
            warn!("failed to serialize gateway event: {}", e);
            return Ok(());
        }
    };
    sender
        .send(Message::Text(payload.into()))
        .await
        .map_err(|_| ())
}

/// Truncate an unparseable command for logging, backing off to a UTF-8
/// character boundary so multibyte text can't panic the recv task.
fn log_preview(text: &str) -> &str {
    if text.len() <= 200 {
        return text;
    }
    let mut end = 200;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

async fn load_ids<F>(db: &Arc<Database>, user_id: Uuid, query: F) -> Vec<Uuid>
where
    F: FnOnce(&Database, &str) -> anyhow::Result<Vec<String>> + Send + 'static,
{
    let db = db.clone();
    let uid = user_id.to_string();
    let raw = tokio::task::spawn_blocking(move || query(&db, &uid))
        .await
        .ok()
        .and_then(|r| r.ok())
        .unwrap_or_default();
    raw.iter()
        .filter_map(|s| Uuid::parse_str(s).ok())
        .collect()
}
