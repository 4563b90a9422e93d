use std::collections::HashMap;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use ripple_types::api::{ChatSummary, MessagePreview};
use ripple_types::events::GatewayEvent;
use ripple_types::models::Message;

use crate::ClientError;
use crate::composer::Composer;
use crate::transport::ChatTransport;

/// Typing indicators expire this long after the last signal; there is no
/// explicit "stopped typing" event on the wire.
pub const TYPING_TTL: Duration = Duration::from_millis(2500);

#[derive(Debug, Clone, Copy)]
pub struct PresenceView {
    pub online: bool,
    pub last_seen: Option<DateTime<Utc>>,
}

/// UI-side chat state machine.
///
/// Reconciles REST responses (the source of truth for what the user did)
/// with gateway pushes (hints about what everyone else did). Messages are
/// held most-recent-first per chat. Sending is never speculative: a message
/// renders only once the REST call acknowledges it, and the gateway echo is
/// then deduplicated by id.
pub struct ChatController<T: ChatTransport> {
    self_id: Uuid,
    transport: T,
    events: Option<mpsc::UnboundedReceiver<GatewayEvent>>,

    chats: Vec<ChatSummary>,
    active_chat: Option<Uuid>,
    messages: HashMap<Uuid, Vec<Message>>,
    presence: HashMap<Uuid, PresenceView>,
    /// chat -> (user -> last typing signal)
    typing: HashMap<Uuid, HashMap<Uuid, Instant>>,

    pub composer: Composer,
}

impl<T: ChatTransport> ChatController<T> {
    pub fn new(self_id: Uuid, transport: T) -> Self {
        Self {
            self_id,
            transport,
            events: None,
            chats: Vec::new(),
            active_chat: None,
            messages: HashMap::new(),
            presence: HashMap::new(),
            typing: HashMap::new(),
            composer: Composer::default(),
        }
    }

    pub async fn connect(&mut self) -> Result<(), ClientError> {
        self.events = Some(self.transport.connect().await?);
        Ok(())
    }

    /// Reconnect after a dropped socket. All pushed state is stale by
    /// definition (events may have been missed), so message lists and
    /// ephemera are discarded; the caller re-fetches chats and messages
    /// over REST and feeds them back in.
    pub async fn reconnect(&mut self) -> Result<(), ClientError> {
        self.events = Some(self.transport.connect().await?);
        self.messages.clear();
        self.typing.clear();
        self.presence.clear();
        for chat_id in self.chats.iter().map(|c| c.id).collect::<Vec<_>>() {
            self.transport.join_room(chat_id).await?;
        }
        Ok(())
    }

    /// Install the chat list from REST and join each chat's room.
    pub async fn load_chats(&mut self, chats: Vec<ChatSummary>) -> Result<(), ClientError> {
        for chat in &chats {
            self.transport.join_room(chat.id).await?;
        }
        self.chats = chats;
        Ok(())
    }

    /// Install a chat's message history from REST (most-recent-first).
    pub fn load_messages(&mut self, chat_id: Uuid, messages: Vec<Message>) {
        self.messages.insert(chat_id, messages);
    }

    pub fn set_active_chat(&mut self, chat_id: Option<Uuid>) {
        self.active_chat = chat_id;
        self.composer.clear();
    }

    pub fn chats(&self) -> &[ChatSummary] {
        &self.chats
    }

    pub fn messages(&self, chat_id: Uuid) -> &[Message] {
        self.messages.get(&chat_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn unread_badge(&self, chat_id: Uuid) -> u64 {
        self.chats
            .iter()
            .find(|c| c.id == chat_id)
            .map(|c| c.unread_count)
            .unwrap_or(0)
    }

    pub fn presence_of(&self, user_id: Uuid) -> Option<PresenceView> {
        self.presence.get(&user_id).copied()
    }

    /// Users currently typing in a chat, pruning entries older than
    /// [`TYPING_TTL`].
    pub fn typing_users(&mut self, chat_id: Uuid, now: Instant) -> Vec<Uuid> {
        let Some(per_chat) = self.typing.get_mut(&chat_id) else {
            return Vec::new();
        };
        per_chat.retain(|_, last| now.duration_since(*last) < TYPING_TTL);
        per_chat.keys().copied().collect()
    }

    pub async fn notify_typing(&mut self, chat_id: Uuid) -> Result<(), ClientError> {
        self.transport.send_typing(chat_id).await?;
        Ok(())
    }

    /// The REST send call succeeded: render the message now. The gateway
    /// echo that follows is deduplicated by id.
    pub fn on_send_acknowledged(&mut self, message: Message) {
        let chat_id = message.chat_id;
        self.insert_message(message);
        self.composer.clear();
        self.touch_chat(chat_id);
    }

    /// The REST mark-read call succeeded: drop the local badge.
    pub fn on_marked_read(&mut self, chat_id: Uuid) {
        if let Some(chat) = self.chats.iter_mut().find(|c| c.id == chat_id) {
            chat.unread_count = 0;
        }
    }

    /// Drain every pending gateway event.
    pub fn pump(&mut self) {
        let Some(mut rx) = self.events.take() else {
            return;
        };
        let now = Instant::now();
        while let Ok(event) = rx.try_recv() {
            self.apply_event(event, now);
        }
        self.events = Some(rx);
    }

    pub fn apply_event(&mut self, event: GatewayEvent, now: Instant) {
        match event {
            GatewayEvent::Ready { .. } => {}

            GatewayEvent::MessageNew { message } => {
                let chat_id = message.chat_id;
                let from_self = message.sender_id == self.self_id;
                self.update_preview(&message);

                if self.active_chat == Some(chat_id) {
                    self.insert_message(message);
                } else if !from_self {
                    // Non-active chat: bump the badge only; history is
                    // fetched when the chat is opened.
                    if let Some(chat) = self.chats.iter_mut().find(|c| c.id == chat_id) {
                        chat.unread_count += 1;
                    }
                }
                // A sender's other session sees its own echo for an
                // inactive chat: preview updated, badge untouched.
                self.touch_chat(chat_id);
            }

            GatewayEvent::MessageUpdated {
                message_id,
                content,
                edited_at,
                ..
            } => {
                // Patch wherever the message currently lives, focused or not.
                for list in self.messages.values_mut() {
                    if let Some(msg) = list.iter_mut().find(|m| m.id == message_id) {
                        msg.content = Some(content.clone());
                        msg.edited_at = Some(edited_at);
                    }
                }
            }

            GatewayEvent::MessageDeleted { message_ids, .. } => {
                // Ids are globally unique: apply regardless of which chat
                // is focused.
                for list in self.messages.values_mut() {
                    list.retain(|m| !message_ids.contains(&m.id));
                }
                for id in message_ids {
                    self.composer.forget_message(id);
                }
            }

            GatewayEvent::MessageReactions {
                message_id,
                reactions,
                ..
            } => {
                for list in self.messages.values_mut() {
                    if let Some(msg) = list.iter_mut().find(|m| m.id == message_id) {
                        msg.reactions = reactions.clone();
                    }
                }
            }

            GatewayEvent::UserTyping { chat_id, user_id } => {
                if user_id != self.self_id {
                    self.typing.entry(chat_id).or_default().insert(user_id, now);
                }
            }

            GatewayEvent::UserStatus {
                user_id,
                online,
                last_seen,
            } => {
                debug!("presence: {} online={}", user_id, online);
                self.presence
                    .insert(user_id, PresenceView { online, last_seen });
            }
        }
    }

    /// Prepend into the chat's most-recent-first list, ignoring ids already
    /// present (REST ack vs. gateway echo).
    fn insert_message(&mut self, message: Message) {
        let list = self.messages.entry(message.chat_id).or_default();
        if list.iter().any(|m| m.id == message.id) {
            return;
        }
        list.insert(0, message);
    }

    fn update_preview(&mut self, message: &Message) {
        if let Some(chat) = self.chats.iter_mut().find(|c| c.id == message.chat_id) {
            chat.last_activity_at = message.created_at;
            chat.last_message = Some(MessagePreview {
                sender_id: message.sender_id,
                content: message.content.clone(),
                created_at: message.created_at,
            });
        }
    }

    /// Keep the chat list ordered by most recent activity.
    fn touch_chat(&mut self, chat_id: Uuid) {
        if let Some(pos) = self.chats.iter().position(|c| c.id == chat_id) {
            if pos > 0 {
                let chat = self.chats.remove(pos);
                self.chats.insert(0, chat);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use ripple_types::models::{ChatKind, InboxFolder, Reaction};

    use super::*;
    use crate::transport::TransportError;

    #[derive(Default)]
    struct MockLog {
        joined: Vec<Uuid>,
        typing_sent: Vec<Uuid>,
        connects: usize,
    }

    struct MockTransport {
        log: Arc<Mutex<MockLog>>,
        event_tx: Arc<Mutex<Option<mpsc::UnboundedSender<GatewayEvent>>>>,
    }

    impl MockTransport {
        fn new() -> (Self, Arc<Mutex<MockLog>>, Arc<Mutex<Option<mpsc::UnboundedSender<GatewayEvent>>>>) {
            let log = Arc::new(Mutex::new(MockLog::default()));
            let event_tx = Arc::new(Mutex::new(None));
            (
                Self {
                    log: log.clone(),
                    event_tx: event_tx.clone(),
                },
                log,
                event_tx,
            )
        }
    }

    #[async_trait]
    impl ChatTransport for MockTransport {
        async fn connect(
            &mut self,
        ) -> Result<mpsc::UnboundedReceiver<GatewayEvent>, TransportError> {
            let (tx, rx) = mpsc::unbounded_channel();
            *self.event_tx.lock().unwrap() = Some(tx);
            self.log.lock().unwrap().connects += 1;
            Ok(rx)
        }

        async fn join_room(&mut self, chat_id: Uuid) -> Result<(), TransportError> {
            self.log.lock().unwrap().joined.push(chat_id);
            Ok(())
        }

        async fn send_typing(&mut self, chat_id: Uuid) -> Result<(), TransportError> {
            self.log.lock().unwrap().typing_sent.push(chat_id);
            Ok(())
        }

        async fn disconnect(&mut self) {}
    }

    fn summary(id: Uuid) -> ChatSummary {
        ChatSummary {
            id,
            kind: ChatKind::Dm,
            name: None,
            members: vec![],
            folder: InboxFolder::Primary,
            accepted: true,
            nickname: None,
            unread_count: 0,
            last_activity_at: Utc::now(),
            last_message: None,
        }
    }

    fn message(chat_id: Uuid, sender_id: Uuid, content: &str) -> Message {
        Message {
            id: Uuid::new_v4(),
            chat_id,
            sender_id,
            sender_name: "someone".into(),
            content: Some(content.into()),
            attachments: vec![],
            reply_to_message_id: None,
            reactions: vec![],
            read_by: vec![],
            created_at: Utc::now(),
            edited_at: None,
        }
    }

    async fn controller_with_chats(
        chats: Vec<ChatSummary>,
    ) -> (ChatController<MockTransport>, Uuid, Arc<Mutex<MockLog>>) {
        let me = Uuid::new_v4();
        let (transport, log, _tx) = MockTransport::new();
        let mut controller = ChatController::new(me, transport);
        controller.connect().await.unwrap();
        controller.load_chats(chats).await.unwrap();
        (controller, me, log)
    }

    #[tokio::test]
    async fn loading_chats_joins_their_rooms() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let (_, _, log) = controller_with_chats(vec![summary(a), summary(b)]).await;
        assert_eq!(log.lock().unwrap().joined, vec![a, b]);
    }

    #[tokio::test]
    async fn new_message_prepends_on_active_chat_and_badges_others() {
        let active = Uuid::new_v4();
        let other = Uuid::new_v4();
        let (mut c, _, _) = controller_with_chats(vec![summary(active), summary(other)]).await;
        c.set_active_chat(Some(active));
        c.load_messages(active, vec![]);

        let peer = Uuid::new_v4();
        let now = Instant::now();
        c.apply_event(
            GatewayEvent::MessageNew {
                message: message(active, peer, "to active"),
            },
            now,
        );
        c.apply_event(
            GatewayEvent::MessageNew {
                message: message(other, peer, "to other"),
            },
            now,
        );

        assert_eq!(c.messages(active).len(), 1);
        assert_eq!(c.unread_badge(active), 0);
        assert!(c.messages(other).is_empty());
        assert_eq!(c.unread_badge(other), 1);
        // The chat with the newest message moved to the top.
        assert_eq!(c.chats()[0].id, other);
    }

    #[tokio::test]
    async fn own_echo_never_bumps_badges() {
        let chat = Uuid::new_v4();
        let (mut c, me, _) = controller_with_chats(vec![summary(chat)]).await;
        // Chat not active, e.g. this session has a different chat open.

        c.apply_event(
            GatewayEvent::MessageNew {
                message: message(chat, me, "from my other device"),
            },
            Instant::now(),
        );
        assert_eq!(c.unread_badge(chat), 0);
    }

    #[tokio::test]
    async fn rest_ack_and_gateway_echo_deduplicate() {
        let chat = Uuid::new_v4();
        let (mut c, me, _) = controller_with_chats(vec![summary(chat)]).await;
        c.set_active_chat(Some(chat));

        let sent = message(chat, me, "hello");
        c.on_send_acknowledged(sent.clone());
        assert_eq!(c.messages(chat).len(), 1);

        // The socket echo of the same id is a no-op.
        c.apply_event(GatewayEvent::MessageNew { message: sent }, Instant::now());
        assert_eq!(c.messages(chat).len(), 1);
    }

    #[tokio::test]
    async fn updates_and_deletes_apply_to_unfocused_chats() {
        let focused = Uuid::new_v4();
        let background = Uuid::new_v4();
        let (mut c, _, _) = controller_with_chats(vec![summary(focused), summary(background)]).await;
        c.set_active_chat(Some(focused));

        let peer = Uuid::new_v4();
        let msg = message(background, peer, "original");
        c.load_messages(background, vec![msg.clone()]);

        c.apply_event(
            GatewayEvent::MessageUpdated {
                chat_id: background,
                message_id: msg.id,
                content: "edited".into(),
                edited_at: Utc::now(),
            },
            Instant::now(),
        );
        assert_eq!(c.messages(background)[0].content.as_deref(), Some("edited"));
        assert!(c.messages(background)[0].edited_at.is_some());

        c.apply_event(
            GatewayEvent::MessageDeleted {
                chat_id: background,
                message_ids: vec![msg.id],
            },
            Instant::now(),
        );
        assert!(c.messages(background).is_empty());
    }

    #[tokio::test]
    async fn deletion_clears_composer_references() {
        let chat = Uuid::new_v4();
        let (mut c, _, _) = controller_with_chats(vec![summary(chat)]).await;
        c.set_active_chat(Some(chat));

        let peer = Uuid::new_v4();
        let msg = message(chat, peer, "reply to me");
        c.load_messages(chat, vec![msg.clone()]);
        c.composer.begin_reply(msg.id);
        c.composer.toggle_selected(msg.id);

        c.apply_event(
            GatewayEvent::MessageDeleted {
                chat_id: chat,
                message_ids: vec![msg.id],
            },
            Instant::now(),
        );
        assert_eq!(c.composer.reply_to_id, None);
        assert!(c.composer.selected_ids.is_empty());
    }

    #[tokio::test]
    async fn reaction_events_replace_the_reaction_list() {
        let chat = Uuid::new_v4();
        let (mut c, _, _) = controller_with_chats(vec![summary(chat)]).await;

        let peer = Uuid::new_v4();
        let msg = message(chat, peer, "react to me");
        c.load_messages(chat, vec![msg.clone()]);

        let reactions = vec![Reaction {
            user_id: peer,
            emoji: "🔥".into(),
        }];
        c.apply_event(
            GatewayEvent::MessageReactions {
                chat_id: chat,
                message_id: msg.id,
                reactions: reactions.clone(),
            },
            Instant::now(),
        );
        assert_eq!(c.messages(chat)[0].reactions, reactions);
    }

    #[tokio::test]
    async fn typing_indicator_expires_without_renewal() {
        let chat = Uuid::new_v4();
        let (mut c, _, _) = controller_with_chats(vec![summary(chat)]).await;

        let peer = Uuid::new_v4();
        let start = Instant::now();
        c.apply_event(GatewayEvent::UserTyping { chat_id: chat, user_id: peer }, start);

        assert_eq!(c.typing_users(chat, start + Duration::from_secs(1)), vec![peer]);
        assert!(c
            .typing_users(chat, start + Duration::from_secs(3))
            .is_empty());
    }

    #[tokio::test]
    async fn own_typing_echo_is_ignored() {
        let chat = Uuid::new_v4();
        let (mut c, me, _) = controller_with_chats(vec![summary(chat)]).await;

        let now = Instant::now();
        c.apply_event(GatewayEvent::UserTyping { chat_id: chat, user_id: me }, now);
        assert!(c.typing_users(chat, now).is_empty());
    }

    #[tokio::test]
    async fn presence_transitions_are_tracked() {
        let chat = Uuid::new_v4();
        let (mut c, _, _) = controller_with_chats(vec![summary(chat)]).await;

        let peer = Uuid::new_v4();
        c.apply_event(
            GatewayEvent::UserStatus { user_id: peer, online: true, last_seen: None },
            Instant::now(),
        );
        assert!(c.presence_of(peer).unwrap().online);

        let seen = Utc::now();
        c.apply_event(
            GatewayEvent::UserStatus {
                user_id: peer,
                online: false,
                last_seen: Some(seen),
            },
            Instant::now(),
        );
        let view = c.presence_of(peer).unwrap();
        assert!(!view.online);
        assert_eq!(view.last_seen, Some(seen));
    }

    #[tokio::test]
    async fn reconnect_discards_stale_state_and_rejoins_rooms() {
        let chat = Uuid::new_v4();
        let (mut c, _, log) = controller_with_chats(vec![summary(chat)]).await;

        let peer = Uuid::new_v4();
        c.load_messages(chat, vec![message(chat, peer, "stale")]);
        c.apply_event(GatewayEvent::UserTyping { chat_id: chat, user_id: peer }, Instant::now());

        c.reconnect().await.unwrap();

        assert!(c.messages(chat).is_empty());
        assert!(c.typing_users(chat, Instant::now()).is_empty());
        let log = log.lock().unwrap();
        assert_eq!(log.connects, 2);
        // Joined once on load, once on reconnect.
        assert_eq!(log.joined, vec![chat, chat]);
    }

    #[tokio::test]
    async fn pump_drains_the_event_stream() {
        let chat = Uuid::new_v4();
        let me = Uuid::new_v4();
        let (transport, _, tx) = MockTransport::new();
        let mut c = ChatController::new(me, transport);
        c.connect().await.unwrap();
        c.load_chats(vec![summary(chat)]).await.unwrap();
        c.set_active_chat(Some(chat));

        let peer = Uuid::new_v4();
        tx.lock()
            .unwrap()
            .as_ref()
            .unwrap()
            .send(GatewayEvent::MessageNew {
                message: message(chat, peer, "pushed"),
            })
            .unwrap();

        c.pump();
        assert_eq!(c.messages(chat).len(), 1);
    }

    #[tokio::test]
    async fn typing_notifications_go_through_the_transport() {
        let chat = Uuid::new_v4();
        let (mut c, _, log) = controller_with_chats(vec![summary(chat)]).await;
        c.notify_typing(chat).await.unwrap();
        assert_eq!(log.lock().unwrap().typing_sent, vec![chat]);
    }
}
