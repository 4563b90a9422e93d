//! End-to-end store tests over an in-memory database, with a recording
//! event sink standing in for the gateway dispatcher.

use std::sync::{Arc, Mutex};

use chrono::{Duration, Utc};
use uuid::Uuid;

use ripple_db::Database;
use ripple_store::{ConversationStore, DbSocialGraph, EventSink, StoreError};
use ripple_types::events::GatewayEvent;
use ripple_types::models::{Attachment, AttachmentKind, DeleteMode, InboxFolder};

struct RecordingSink {
    events: Mutex<Vec<GatewayEvent>>,
}

impl RecordingSink {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            events: Mutex::new(Vec::new()),
        })
    }

    fn take(&self) -> Vec<GatewayEvent> {
        std::mem::take(&mut self.events.lock().unwrap())
    }
}

impl EventSink for RecordingSink {
    fn publish(&self, event: GatewayEvent) {
        self.events.lock().unwrap().push(event);
    }
}

struct Fixture {
    store: ConversationStore,
    sink: Arc<RecordingSink>,
    db: Arc<Database>,
    alice: Uuid,
    bob: Uuid,
    carol: Uuid,
}

fn fixture() -> Fixture {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let sink = RecordingSink::new();
    let graph = Arc::new(DbSocialGraph::new(db.clone()));
    let store = ConversationStore::new(db.clone(), sink.clone(), graph);

    let mut ids = Vec::new();
    for name in ["alice", "bob", "carol"] {
        let id = Uuid::new_v4();
        db.create_user(&id.to_string(), name, "hash", None, &Utc::now().to_rfc3339())
            .unwrap();
        ids.push(id);
    }

    Fixture {
        store,
        sink,
        db,
        alice: ids[0],
        bob: ids[1],
        carol: ids[2],
    }
}

#[test]
fn dm_creation_is_idempotent() {
    let f = fixture();
    let first = f.store.create_or_get_dm(f.alice, f.bob).unwrap();
    let second = f.store.create_or_get_dm(f.alice, f.bob).unwrap();
    assert_eq!(first.id, second.id);

    // Counterpart-initiated request also resolves to the same chat.
    let third = f.store.create_or_get_dm(f.bob, f.alice).unwrap();
    assert_eq!(first.id, third.id);
}

#[test]
fn self_dm_is_rejected() {
    let f = fixture();
    assert!(matches!(
        f.store.create_or_get_dm(f.alice, f.alice),
        Err(StoreError::InvalidMembers)
    ));
}

#[test]
fn non_follower_target_lands_in_requests() {
    let f = fixture();
    let chat = f.store.create_or_get_dm(f.alice, f.bob).unwrap();

    assert_eq!(chat.my_inbox.folder, InboxFolder::Primary);
    assert!(chat.my_inbox.accepted);

    let bobs = chat
        .inboxes
        .iter()
        .find(|e| e.user_id == f.bob)
        .expect("bob has an inbox entry");
    assert_eq!(bobs.folder, InboxFolder::Requests);
    assert!(!bobs.accepted);
}

#[test]
fn follow_back_target_lands_in_primary() {
    let f = fixture();
    f.db.insert_follow(&f.bob.to_string(), &f.alice.to_string())
        .unwrap();

    let chat = f.store.create_or_get_dm(f.alice, f.bob).unwrap();
    let bobs = chat.inboxes.iter().find(|e| e.user_id == f.bob).unwrap();
    assert_eq!(bobs.folder, InboxFolder::Primary);
    assert!(bobs.accepted);
}

#[test]
fn accept_moves_chat_into_chosen_folder() {
    let f = fixture();
    let chat = f.store.create_or_get_dm(f.alice, f.bob).unwrap();

    let requests = f.store.list_chats(f.bob, Some(InboxFolder::Requests)).unwrap();
    assert_eq!(requests.len(), 1);

    let entry = f
        .store
        .set_inbox_placement(chat.id, f.bob, Some(InboxFolder::General), Some(true))
        .unwrap();
    assert_eq!(entry.folder, InboxFolder::General);
    assert!(entry.accepted);

    let general = f.store.list_chats(f.bob, Some(InboxFolder::General)).unwrap();
    assert_eq!(general.len(), 1);
    assert_eq!(general[0].id, chat.id);
    assert!(f
        .store
        .list_chats(f.bob, Some(InboxFolder::Requests))
        .unwrap()
        .is_empty());
}

#[test]
fn accept_is_one_way() {
    let f = fixture();
    let chat = f.store.create_or_get_dm(f.alice, f.bob).unwrap();
    f.store
        .set_inbox_placement(chat.id, f.bob, None, Some(true))
        .unwrap();

    assert!(matches!(
        f.store.set_inbox_placement(chat.id, f.bob, None, Some(false)),
        Err(StoreError::Forbidden)
    ));
}

#[test]
fn send_requires_content_or_attachments() {
    let f = fixture();
    let chat = f.store.create_or_get_dm(f.alice, f.bob).unwrap();

    assert!(matches!(
        f.store.send_message(chat.id, f.alice, None, &[], None),
        Err(StoreError::EmptyMessage)
    ));
    assert!(matches!(
        f.store.send_message(chat.id, f.alice, Some("   "), &[], None),
        Err(StoreError::EmptyMessage)
    ));

    // Attachment-only messages are fine.
    let attachment = Attachment {
        kind: AttachmentKind::Image,
        url: "https://cdn.example/a.png".into(),
        name: Some("a.png".into()),
    };
    let msg = f
        .store
        .send_message(chat.id, f.alice, None, std::slice::from_ref(&attachment), None)
        .unwrap();
    assert_eq!(msg.attachments, vec![attachment]);
}

#[test]
fn send_rejects_non_members_and_blocked_pairs() {
    let f = fixture();
    let chat = f.store.create_or_get_dm(f.alice, f.bob).unwrap();

    assert!(matches!(
        f.store.send_message(chat.id, f.carol, Some("hi"), &[], None),
        Err(StoreError::NotAMember)
    ));

    f.db.insert_block(&f.bob.to_string(), &f.alice.to_string())
        .unwrap();
    assert!(matches!(
        f.store.send_message(chat.id, f.alice, Some("hi"), &[], None),
        Err(StoreError::Blocked)
    ));
}

#[test]
fn send_emits_event_and_drives_unread_cycle() {
    let f = fixture();
    let chat = f.store.create_or_get_dm(f.alice, f.bob).unwrap();
    f.sink.take();

    let m1 = f
        .store
        .send_message(chat.id, f.alice, Some("hi"), &[], None)
        .unwrap();
    assert!(m1.read_by.is_empty());

    let events = f.sink.take();
    assert!(matches!(
        events.as_slice(),
        [GatewayEvent::MessageNew { message }] if message.id == m1.id
    ));

    assert_eq!(f.store.unread_count(chat.id, f.bob).unwrap(), 1);
    assert_eq!(f.store.total_unread_chats(f.bob).unwrap().unread_chats, 1);
    // The sender's own message never counts against them.
    assert_eq!(f.store.unread_count(chat.id, f.alice).unwrap(), 0);

    f.store.mark_read(chat.id, f.bob).unwrap();
    assert_eq!(f.store.unread_count(chat.id, f.bob).unwrap(), 0);

    // "Seen": bob now appears in readBy of alice's latest message.
    let messages = f.store.list_messages(chat.id, f.alice, 50).unwrap();
    assert!(messages[0].read_by.contains(&f.bob));

    f.store
        .send_message(chat.id, f.alice, Some("again"), &[], None)
        .unwrap();
    assert_eq!(f.store.unread_count(chat.id, f.bob).unwrap(), 1);
}

#[test]
fn messages_are_listed_most_recent_first() {
    let f = fixture();
    let chat = f.store.create_or_get_dm(f.alice, f.bob).unwrap();
    for text in ["one", "two", "three"] {
        f.store
            .send_message(chat.id, f.alice, Some(text), &[], None)
            .unwrap();
    }

    let messages = f.store.list_messages(chat.id, f.bob, 50).unwrap();
    let contents: Vec<_> = messages.iter().filter_map(|m| m.content.as_deref()).collect();
    assert_eq!(contents, vec!["three", "two", "one"]);
}

#[test]
fn reply_target_must_live_in_same_chat() {
    let f = fixture();
    let chat_ab = f.store.create_or_get_dm(f.alice, f.bob).unwrap();
    let chat_ac = f.store.create_or_get_dm(f.alice, f.carol).unwrap();
    let foreign = f
        .store
        .send_message(chat_ac.id, f.alice, Some("elsewhere"), &[], None)
        .unwrap();

    assert!(matches!(
        f.store
            .send_message(chat_ab.id, f.alice, Some("reply"), &[], Some(foreign.id)),
        Err(StoreError::NotFound)
    ));

    let target = f
        .store
        .send_message(chat_ab.id, f.alice, Some("root"), &[], None)
        .unwrap();
    let reply = f
        .store
        .send_message(chat_ab.id, f.bob, Some("reply"), &[], Some(target.id))
        .unwrap();
    assert_eq!(reply.reply_to_message_id, Some(target.id));
}

#[test]
fn reaction_toggle_round_trips() {
    let f = fixture();
    let chat = f.store.create_or_get_dm(f.alice, f.bob).unwrap();
    let msg = f
        .store
        .send_message(chat.id, f.alice, Some("hi"), &[], None)
        .unwrap();
    f.sink.take();

    let after_add = f.store.toggle_reaction(msg.id, f.bob, "❤️").unwrap();
    assert_eq!(after_add.len(), 1);
    assert_eq!(after_add[0].user_id, f.bob);

    let after_remove = f.store.toggle_reaction(msg.id, f.bob, "❤️").unwrap();
    assert!(after_remove.is_empty());

    let events = f.sink.take();
    assert_eq!(events.len(), 2);
    assert!(matches!(
        &events[1],
        GatewayEvent::MessageReactions { reactions, .. } if reactions.is_empty()
    ));
}

#[test]
fn concurrent_reactors_are_independent() {
    let f = fixture();
    let chat = f.store.create_or_get_dm(f.alice, f.bob).unwrap();
    let msg = f
        .store
        .send_message(chat.id, f.alice, Some("hi"), &[], None)
        .unwrap();

    f.store.toggle_reaction(msg.id, f.alice, "🔥").unwrap();
    let both = f.store.toggle_reaction(msg.id, f.bob, "🔥").unwrap();
    assert_eq!(both.len(), 2);

    // Bob removing his reaction leaves alice's untouched.
    let remaining = f.store.toggle_reaction(msg.id, f.bob, "🔥").unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].user_id, f.alice);
}

#[test]
fn edit_is_sender_only_and_stamps_edited_at() {
    let f = fixture();
    let chat = f.store.create_or_get_dm(f.alice, f.bob).unwrap();
    let msg = f
        .store
        .send_message(chat.id, f.alice, Some("first"), &[], None)
        .unwrap();

    assert!(matches!(
        f.store.edit_message(msg.id, f.bob, "hijacked"),
        Err(StoreError::Forbidden)
    ));

    let edited = f.store.edit_message(msg.id, f.alice, "second").unwrap();
    assert_eq!(edited.content.as_deref(), Some("second"));
    assert!(edited.edited_at.is_some());
    assert_eq!(edited.created_at, msg.created_at);
}

#[test]
fn delete_for_everyone_removes_for_all_members() {
    let f = fixture();
    let chat = f.store.create_or_get_dm(f.alice, f.bob).unwrap();
    let msg = f
        .store
        .send_message(chat.id, f.alice, Some("gone soon"), &[], None)
        .unwrap();
    f.sink.take();

    f.store
        .delete_messages(&[msg.id], f.alice, DeleteMode::ForEveryone)
        .unwrap();

    assert!(f.store.list_messages(chat.id, f.alice, 50).unwrap().is_empty());
    assert!(f.store.list_messages(chat.id, f.bob, 50).unwrap().is_empty());

    let events = f.sink.take();
    assert!(matches!(
        events.as_slice(),
        [GatewayEvent::MessageDeleted { message_ids, .. }] if message_ids == &vec![msg.id]
    ));
}

#[test]
fn delete_for_everyone_by_non_sender_is_rejected_without_effect() {
    let f = fixture();
    let chat = f.store.create_or_get_dm(f.alice, f.bob).unwrap();
    let msg = f
        .store
        .send_message(chat.id, f.alice, Some("keep me"), &[], None)
        .unwrap();

    assert!(matches!(
        f.store.delete_messages(&[msg.id], f.bob, DeleteMode::ForEveryone),
        Err(StoreError::Forbidden)
    ));

    // Still visible to everyone, including the failed requester.
    assert_eq!(f.store.list_messages(chat.id, f.bob, 50).unwrap().len(), 1);
    assert_eq!(f.store.list_messages(chat.id, f.alice, 50).unwrap().len(), 1);
}

#[test]
fn mixed_ownership_batch_is_all_or_nothing() {
    let f = fixture();
    let chat = f.store.create_or_get_dm(f.alice, f.bob).unwrap();
    let mine = f
        .store
        .send_message(chat.id, f.alice, Some("mine"), &[], None)
        .unwrap();
    let theirs = f
        .store
        .send_message(chat.id, f.bob, Some("theirs"), &[], None)
        .unwrap();
    f.sink.take();

    assert!(matches!(
        f.store.delete_messages(&[mine.id, theirs.id], f.alice, DeleteMode::ForEveryone),
        Err(StoreError::Forbidden)
    ));

    // Zero messages removed, zero events emitted.
    assert_eq!(f.store.list_messages(chat.id, f.bob, 50).unwrap().len(), 2);
    assert!(f.sink.take().is_empty());
}

#[test]
fn delete_for_me_suppresses_only_the_requester() {
    let f = fixture();
    let chat = f.store.create_or_get_dm(f.alice, f.bob).unwrap();
    let msg = f
        .store
        .send_message(chat.id, f.alice, Some("private shame"), &[], None)
        .unwrap();
    f.sink.take();

    // for_me works on foreign messages too.
    f.store
        .delete_messages(&[msg.id], f.bob, DeleteMode::ForMe)
        .unwrap();

    assert!(f.store.list_messages(chat.id, f.bob, 50).unwrap().is_empty());
    assert_eq!(f.store.list_messages(chat.id, f.alice, 50).unwrap().len(), 1);
    // Suppressed messages stop counting as unread for the suppressor.
    assert_eq!(f.store.unread_count(chat.id, f.bob).unwrap(), 0);
    // No event for for_me deletes.
    assert!(f.sink.take().is_empty());
}

#[test]
fn folder_counts_track_inbox_entries() {
    let f = fixture();
    f.store.create_or_get_dm(f.alice, f.bob).unwrap();
    f.store.create_or_get_dm(f.alice, f.carol).unwrap();

    let counts = f.store.folder_counts(f.alice).unwrap();
    assert_eq!(counts.primary, 2);
    assert_eq!(counts.general, 0);
    assert_eq!(counts.requests, 0);

    let bob_counts = f.store.folder_counts(f.bob).unwrap();
    assert_eq!(bob_counts.requests, 1);
}

#[test]
fn sweep_removes_only_expired_messages_in_disappearing_chats() {
    let f = fixture();
    let chat = f.store.create_or_get_dm(f.alice, f.bob).unwrap();
    f.store
        .update_settings(chat.id, f.alice, Some(true), None)
        .unwrap();

    let durable_chat = f.store.create_or_get_dm(f.alice, f.carol).unwrap();

    // Backdate one message past the 24h window, directly at the db layer.
    let old_id = Uuid::new_v4();
    let stale = (Utc::now() - Duration::hours(25)).to_rfc3339();
    f.db.insert_message(
        &old_id.to_string(),
        &chat.id.to_string(),
        &f.alice.to_string(),
        Some("expiring"),
        None,
        &stale,
        &[],
    )
    .unwrap();
    let old_durable = Uuid::new_v4();
    f.db.insert_message(
        &old_durable.to_string(),
        &durable_chat.id.to_string(),
        &f.alice.to_string(),
        Some("old but durable"),
        None,
        &stale,
        &[],
    )
    .unwrap();

    let fresh = f
        .store
        .send_message(chat.id, f.alice, Some("fresh"), &[], None)
        .unwrap();
    f.sink.take();

    let swept = f.store.sweep_disappearing(Utc::now()).unwrap();
    assert_eq!(swept, 1);

    let remaining = f.store.list_messages(chat.id, f.alice, 50).unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, fresh.id);
    // Non-disappearing chats keep old messages.
    assert_eq!(
        f.store.list_messages(durable_chat.id, f.alice, 50).unwrap().len(),
        1
    );

    let events = f.sink.take();
    assert!(matches!(
        events.as_slice(),
        [GatewayEvent::MessageDeleted { chat_id, message_ids }]
            if *chat_id == chat.id && message_ids == &vec![old_id]
    ));
}

#[test]
fn settings_update_round_trips_nickname_and_disappearing() {
    let f = fixture();
    let chat = f.store.create_or_get_dm(f.alice, f.bob).unwrap();

    let updated = f
        .store
        .update_settings(chat.id, f.alice, Some(true), Some("bestie"))
        .unwrap();
    assert!(updated.settings.disappearing_24h);
    assert_eq!(updated.settings.nickname.as_deref(), Some("bestie"));

    // Nicknames are per-viewer.
    let bobs_view = f.store.get_chat(chat.id, f.bob).unwrap();
    assert_eq!(bobs_view.settings.nickname, None);

    assert!(matches!(
        f.store.update_settings(chat.id, f.carol, Some(false), None),
        Err(StoreError::NotAMember)
    ));
}

#[test]
fn concurrent_dm_creation_never_duplicates() {
    let f = fixture();

    for round in 0..20 {
        let target = Uuid::new_v4();
        f.db.create_user(
            &target.to_string(),
            &format!("peer{}", round),
            "hash",
            None,
            &Utc::now().to_rfc3339(),
        )
        .unwrap();

        let barrier = Arc::new(std::sync::Barrier::new(2));
        let handles: Vec<_> = (0..2)
            .map(|_| {
                let store = f.store.clone();
                let barrier = barrier.clone();
                let initiator = f.alice;
                std::thread::spawn(move || {
                    barrier.wait();
                    store.create_or_get_dm(initiator, target).unwrap().id
                })
            })
            .collect();

        let ids: Vec<Uuid> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(ids[0], ids[1], "round {} produced distinct chats", round);
        assert_eq!(f.store.list_chats(f.alice, None).unwrap().len(), round + 1);
    }
}

#[test]
fn duplicate_ids_in_a_delete_batch_are_collapsed() {
    let f = fixture();
    let chat = f.store.create_or_get_dm(f.alice, f.bob).unwrap();
    let mine = f
        .store
        .send_message(chat.id, f.alice, Some("twice over"), &[], None)
        .unwrap();
    let theirs = f
        .store
        .send_message(chat.id, f.bob, Some("suppress me"), &[], None)
        .unwrap();

    // Repeating an id must not read as a missing row.
    f.store
        .delete_messages(&[theirs.id, theirs.id], f.alice, DeleteMode::ForMe)
        .unwrap();
    assert_eq!(f.store.list_messages(chat.id, f.alice, 50).unwrap().len(), 1);
    assert_eq!(f.store.list_messages(chat.id, f.bob, 50).unwrap().len(), 2);

    f.store
        .delete_messages(&[mine.id, mine.id], f.alice, DeleteMode::ForEveryone)
        .unwrap();
    assert!(f.store.list_messages(chat.id, f.bob, 50).unwrap().iter().all(|m| m.id != mine.id));
}
