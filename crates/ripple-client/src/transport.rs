use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

use ripple_types::events::GatewayEvent;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connect failed: {0}")]
    ConnectFailed(String),

    #[error("not connected")]
    NotConnected,
}

/// Injected gateway connection owned by the chat controller.
///
/// One instance per client session, but constructed and passed in, never a
/// module-level singleton, so tests can substitute a mock. Server events
/// arrive on the receiver returned by `connect`; if the connection drops,
/// the receiver closes and the controller is expected to reconnect and then
/// reconcile over REST.
#[async_trait]
pub trait ChatTransport: Send {
    /// Open the socket and perform the Identify handshake. Returns the
    /// stream of server events for this connection.
    async fn connect(&mut self) -> Result<mpsc::UnboundedReceiver<GatewayEvent>, TransportError>;

    /// Join the room for a chat; chat-scoped events only arrive for joined
    /// rooms.
    async fn join_room(&mut self, chat_id: Uuid) -> Result<(), TransportError>;

    /// Fire a typing signal for a chat. Ephemeral, no acknowledgment.
    async fn send_typing(&mut self, chat_id: Uuid) -> Result<(), TransportError>;

    async fn disconnect(&mut self);
}
