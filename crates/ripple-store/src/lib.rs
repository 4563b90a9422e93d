pub mod chats;
pub mod error;
pub mod messages;

use std::sync::Arc;

use anyhow::Result;
use tracing::warn;
use uuid::Uuid;

use ripple_db::Database;
use ripple_types::events::GatewayEvent;

pub use error::{StoreError, StoreResult};

/// Outlet for gateway events produced by store mutations. Implemented by the
/// gateway dispatcher in production and by a recorder in tests; the store
/// never talks to a socket directly.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: GatewayEvent);
}

/// Sink that drops everything. For contexts with no gateway, e.g. one-off
/// admin tooling against the same database.
pub struct NullSink;

impl EventSink for NullSink {
    fn publish(&self, _event: GatewayEvent) {}
}

/// Read-only view of the external social-graph subsystem. The chat core
/// consults it for the requests-folder gate and the send-time block check,
/// and never writes through it.
pub trait SocialGraph: Send + Sync {
    fn follows(&self, follower: Uuid, followee: Uuid) -> Result<bool>;
    fn blocks(&self, blocker: Uuid, blocked: Uuid) -> Result<bool>;

    fn blocked_between(&self, a: Uuid, b: Uuid) -> Result<bool> {
        Ok(self.blocks(a, b)? || self.blocks(b, a)?)
    }
}

/// SocialGraph backed by the denormalized follows/blocks mirror tables.
pub struct DbSocialGraph {
    db: Arc<Database>,
}

impl DbSocialGraph {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

impl SocialGraph for DbSocialGraph {
    fn follows(&self, follower: Uuid, followee: Uuid) -> Result<bool> {
        self.db
            .follow_exists(&follower.to_string(), &followee.to_string())
    }

    fn blocks(&self, blocker: Uuid, blocked: Uuid) -> Result<bool> {
        self.db
            .block_exists(&blocker.to_string(), &blocked.to_string())
    }
}

/// Mark-all-read is bounded to this many most-recent messages so it never
/// does unbounded writes.
pub const READ_WINDOW: u32 = 200;

/// Single source of truth for Chat/Message persistence and invariants.
/// All mutations go through here; no other component touches the
/// reactions/readBy tables directly.
#[derive(Clone)]
pub struct ConversationStore {
    pub(crate) db: Arc<Database>,
    pub(crate) sink: Arc<dyn EventSink>,
    pub(crate) graph: Arc<dyn SocialGraph>,
}

impl ConversationStore {
    pub fn new(db: Arc<Database>, sink: Arc<dyn EventSink>, graph: Arc<dyn SocialGraph>) -> Self {
        Self { db, sink, graph }
    }

    pub fn db(&self) -> &Arc<Database> {
        &self.db
    }
}

pub(crate) fn parse_uuid(raw: &str) -> Uuid {
    Uuid::parse_str(raw).unwrap_or_else(|e| {
        warn!("Corrupt uuid '{}': {}", raw, e);
        Uuid::nil()
    })
}
