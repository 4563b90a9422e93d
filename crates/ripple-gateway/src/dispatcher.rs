use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{RwLock, broadcast};
use tracing::warn;
use uuid::Uuid;

use ripple_store::EventSink;
use ripple_types::events::GatewayEvent;

/// Room scope of an outbound event: a single chat room, or the set of rooms
/// a user belongs to (presence transitions).
#[derive(Debug, Clone)]
pub enum Scope {
    Chat(Uuid),
    Chats(Vec<Uuid>),
}

impl Scope {
    pub fn matches(&self, joined: &HashSet<Uuid>) -> bool {
        match self {
            Self::Chat(id) => joined.contains(id),
            Self::Chats(ids) => ids.iter().any(|id| joined.contains(id)),
        }
    }
}

/// Pre-serialized event plus its delivery scope. Serialization happens once
/// per broadcast, not once per connection.
#[derive(Debug, Clone)]
pub struct Outbound {
    pub scope: Scope,
    pub payload: String,
}

/// Ephemeral presence record, held in process memory only; `last_seen` is
/// additionally denormalized onto the user row for cold-start reads.
#[derive(Debug, Clone, Copy)]
pub struct PresenceRecord {
    pub online: bool,
    pub last_seen: Option<DateTime<Utc>>,
}

/// Fan-out hub for gateway events plus the presence tracker.
///
/// Delivery is at-most-once and best-effort: a lagged receiver drops events
/// and carries on, and clients reconcile over REST after reconnect. The
/// dispatcher is a notification hint, never the system of record.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    broadcast_tx: broadcast::Sender<Outbound>,

    /// Current connection per user. A newer connection takes over; a stale
    /// disconnect must not clear the newer session's presence.
    sessions: RwLock<HashMap<Uuid, Uuid>>,

    presence: RwLock<HashMap<Uuid, PresenceRecord>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        let (broadcast_tx, _) = broadcast::channel(1024);
        Self {
            inner: Arc::new(DispatcherInner {
                broadcast_tx,
                sessions: RwLock::new(HashMap::new()),
                presence: RwLock::new(HashMap::new()),
            }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Outbound> {
        self.inner.broadcast_tx.subscribe()
    }

    /// Serialize and broadcast an event to the given scope. No receivers is
    /// not an error; rooms are often empty.
    pub fn broadcast_scoped(&self, scope: Scope, event: &GatewayEvent) {
        match serde_json::to_string(event) {
            Ok(payload) => {
                let _ = self.inner.broadcast_tx.send(Outbound { scope, payload });
            }
            Err(e) => warn!("failed to serialize gateway event: {}", e),
        }
    }

    /// Register a connection for a user, marking them online. Returns the
    /// connection id that owns the session from now on.
    pub async fn connect_user(&self, user_id: Uuid) -> Uuid {
        let conn_id = Uuid::new_v4();
        self.inner.sessions.write().await.insert(user_id, conn_id);
        self.inner.presence.write().await.insert(
            user_id,
            PresenceRecord {
                online: true,
                last_seen: None,
            },
        );
        conn_id
    }

    /// Mark a user offline, but only if `conn_id` still owns the session.
    /// Returns the recorded last-seen timestamp when the transition applied.
    pub async fn disconnect_user(&self, user_id: Uuid, conn_id: Uuid) -> Option<DateTime<Utc>> {
        let mut sessions = self.inner.sessions.write().await;
        match sessions.get(&user_id) {
            Some(current) if *current == conn_id => {
                sessions.remove(&user_id);
            }
            // A newer connection has taken over; don't touch anything.
            _ => return None,
        }
        drop(sessions);

        let last_seen = Utc::now();
        self.inner.presence.write().await.insert(
            user_id,
            PresenceRecord {
                online: false,
                last_seen: Some(last_seen),
            },
        );
        Some(last_seen)
    }

    pub async fn is_online(&self, user_id: Uuid) -> bool {
        self.inner
            .presence
            .read()
            .await
            .get(&user_id)
            .map(|p| p.online)
            .unwrap_or(false)
    }

    pub async fn presence_of(&self, user_id: Uuid) -> Option<PresenceRecord> {
        self.inner.presence.read().await.get(&user_id).copied()
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// The store publishes chat-scoped events; anything without a chat scope is
/// the gateway's own business (presence, ready) and never arrives here.
impl EventSink for Dispatcher {
    fn publish(&self, event: GatewayEvent) {
        match event.chat_id() {
            Some(chat_id) => self.broadcast_scoped(Scope::Chat(chat_id), &event),
            None => warn!("dropping unscoped event from store"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_matching() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let joined: HashSet<Uuid> = [a].into_iter().collect();

        assert!(Scope::Chat(a).matches(&joined));
        assert!(!Scope::Chat(b).matches(&joined));
        assert!(Scope::Chats(vec![b, a]).matches(&joined));
        assert!(!Scope::Chats(vec![b]).matches(&joined));
        assert!(!Scope::Chats(vec![]).matches(&joined));
    }

    #[tokio::test]
    async fn stale_disconnect_does_not_clobber_newer_session() {
        let dispatcher = Dispatcher::new();
        let user = Uuid::new_v4();

        let first = dispatcher.connect_user(user).await;
        let second = dispatcher.connect_user(user).await;

        // The first connection dying must not mark the user offline.
        assert!(dispatcher.disconnect_user(user, first).await.is_none());
        assert!(dispatcher.is_online(user).await);

        let last_seen = dispatcher.disconnect_user(user, second).await;
        assert!(last_seen.is_some());
        assert!(!dispatcher.is_online(user).await);
        assert_eq!(
            dispatcher.presence_of(user).await.unwrap().last_seen,
            last_seen
        );
    }

    #[tokio::test]
    async fn chat_scoped_events_reach_subscribers() {
        let dispatcher = Dispatcher::new();
        let chat = Uuid::new_v4();
        let mut rx = dispatcher.subscribe();

        dispatcher.publish(GatewayEvent::UserTyping {
            chat_id: chat,
            user_id: Uuid::new_v4(),
        });

        let outbound = rx.recv().await.unwrap();
        let joined: HashSet<Uuid> = [chat].into_iter().collect();
        assert!(outbound.scope.matches(&joined));
        assert!(outbound.payload.contains("user:typing"));
    }
}
