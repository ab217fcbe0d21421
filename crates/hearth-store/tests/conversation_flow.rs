use std::sync::{Arc, Barrier, Mutex};
use std::thread;

use hearth_shared::reaction;
use hearth_shared::types::{ConversationId, UserId};
use hearth_store::{Database, ManualClock, StoreError, StoreEvent};

fn uid(s: &str) -> UserId {
    UserId::parse(s).unwrap()
}

fn unread_for(db: &Database, user: &str, conv: ConversationId) -> u64 {
    db.list_for_user(&uid(user))
        .unwrap()
        .into_iter()
        .find(|s| s.id == conv)
        .map(|s| s.unread_count)
        .expect("conversation listed for member")
}

#[test]
fn unread_count_follows_read_cursor() {
    let clock = Arc::new(ManualClock::new(0));
    let mut db = Database::open_in_memory().unwrap().with_clock(clock.clone());
    let conv = db.find_or_create_direct(&uid("u1"), &uid("u2")).unwrap();

    clock.set(100);
    db.send(conv, &uid("u1"), "hello").unwrap();
    assert_eq!(unread_for(&db, "u2", conv), 1);
    assert_eq!(unread_for(&db, "u1", conv), 0);

    clock.set(150);
    db.mark_read(conv, &uid("u2")).unwrap();
    assert_eq!(unread_for(&db, "u2", conv), 0);

    clock.set(200);
    db.send(conv, &uid("u1"), "again").unwrap();
    assert_eq!(unread_for(&db, "u2", conv), 1);
    assert_eq!(unread_for(&db, "u1", conv), 0);
}

#[test]
fn own_messages_never_count_as_unread() {
    let clock = Arc::new(ManualClock::new(10));
    let mut db = Database::open_in_memory().unwrap().with_clock(clock.clone());
    let conv = db
        .create_group(&[uid("a"), uid("b"), uid("c")], Some("Trio"))
        .unwrap();

    for (i, sender) in ["a", "b", "a", "c"].into_iter().enumerate() {
        clock.set(100 + i as i64);
        db.send(conv, &uid(sender), "msg").unwrap();
    }

    assert_eq!(unread_for(&db, "a", conv), 2);
    assert_eq!(unread_for(&db, "b", conv), 3);
    assert_eq!(unread_for(&db, "c", conv), 3);
}

#[test]
fn group_without_name_is_labelled_by_size() {
    let mut db = Database::open_in_memory().unwrap();
    let conv = db
        .create_group(&[uid("u1"), uid("u2"), uid("u3")], None)
        .unwrap();

    let view = db.get_details(conv, &uid("u2")).unwrap().unwrap();
    assert!(view.conversation.is_group);
    assert!(view.title.contains('3'));

    let summary = &db.list_for_user(&uid("u3")).unwrap()[0];
    assert_eq!(summary.name, "Group (3)");
    assert_eq!(summary.member_count, 3);
}

#[test]
fn delete_then_foreign_delete() {
    let mut db = Database::open_in_memory().unwrap();
    let conv = db.find_or_create_direct(&uid("u1"), &uid("u2")).unwrap();
    let msg = db.send(conv, &uid("u1"), "secret").unwrap();

    db.delete_message(msg, &uid("u1")).unwrap();
    let before = db.get_message(msg).unwrap().unwrap();
    assert!(before.deleted);
    assert!(before.text.is_empty());

    let err = db.delete_message(msg, &uid("u2")).unwrap_err();
    assert!(matches!(err, StoreError::AccessDenied(_)));
    assert_eq!(db.get_message(msg).unwrap().unwrap(), before);
}

#[test]
fn reaction_toggle_is_an_involution() {
    let mut db = Database::open_in_memory().unwrap();
    let conv = db.find_or_create_direct(&uid("u1"), &uid("u2")).unwrap();
    let msg = db.send(conv, &uid("u1"), "nice").unwrap();
    db.toggle_reaction(msg, &uid("u1"), "🔥").unwrap();

    for emoji in ["🔥", "👨‍👩‍👧", "❤️"] {
        for user in ["u1", "u2"] {
            let before = db.get_message(msg).unwrap().unwrap().has_reaction(&uid(user), emoji);
            db.toggle_reaction(msg, &uid(user), emoji).unwrap();
            db.toggle_reaction(msg, &uid(user), emoji).unwrap();
            let after = db.get_message(msg).unwrap().unwrap().has_reaction(&uid(user), emoji);
            assert_eq!(before, after, "{user} {emoji}");
        }
    }

    let decoded = db.get_message(msg).unwrap().unwrap().decoded_reactions().unwrap();
    assert_eq!(decoded.keys().collect::<Vec<_>>(), vec!["🔥"]);
    assert_eq!(reaction::decode(&reaction::encode("👨‍👩‍👧")).unwrap(), "👨‍👩‍👧");
}

#[test]
fn writes_publish_events_for_subscribers() {
    let mut db = Database::open_in_memory().unwrap();
    let mut rx = db.subscribe();

    let conv = db.find_or_create_direct(&uid("u1"), &uid("u2")).unwrap();
    let msg = db.send(conv, &uid("u1"), "hi").unwrap();
    db.toggle_reaction(msg, &uid("u2"), "👋").unwrap();
    db.mark_read(conv, &uid("u2")).unwrap();

    let events: Vec<StoreEvent> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
    assert_eq!(
        events,
        vec![
            StoreEvent::ConversationCreated { conversation_id: conv },
            StoreEvent::MessageCreated {
                conversation_id: conv,
                message_id: msg
            },
            StoreEvent::ConversationUpdated { conversation_id: conv },
            StoreEvent::MessageUpdated {
                conversation_id: conv,
                message_id: msg
            },
            StoreEvent::ConversationUpdated { conversation_id: conv },
        ]
    );
}

#[test]
fn concurrent_direct_lookups_on_shared_handle() {
    let db = Arc::new(Mutex::new(Database::open_in_memory().unwrap()));
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let db = Arc::clone(&db);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let (a, b) = if i % 2 == 0 { ("u1", "u2") } else { ("u2", "u1") };
                db.lock().unwrap().find_or_create_direct(&uid(a), &uid(b)).unwrap()
            })
        })
        .collect();

    let ids: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(ids.windows(2).all(|w| w[0] == w[1]));

    let guard = db.lock().unwrap();
    let rows: i64 = guard
        .conn()
        .query_row("SELECT COUNT(*) FROM conversations", [], |row| row.get(0))
        .unwrap();
    assert_eq!(rows, 1);
}

#[test]
fn concurrent_direct_lookups_across_connections() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("race.db");
    // Create the schema once up front so the racers only contend on data.
    drop(Database::open_at(&path).unwrap());

    let barrier = Arc::new(Barrier::new(4));
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let path = path.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let mut db = Database::open_at(&path).unwrap();
                barrier.wait();
                let (a, b) = if i % 2 == 0 { ("x", "y") } else { ("y", "x") };
                db.find_or_create_direct(&uid(a), &uid(b)).unwrap()
            })
        })
        .collect();

    let ids: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(ids.windows(2).all(|w| w[0] == w[1]));

    let db = Database::open_at(&path).unwrap();
    let rows: i64 = db
        .conn()
        .query_row("SELECT COUNT(*) FROM conversations", [], |row| row.get(0))
        .unwrap();
    assert_eq!(rows, 1);
}

#[test]
fn data_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("persist.db");

    let (conv, msg) = {
        let mut db = Database::open_at(&path).unwrap();
        let conv = db.find_or_create_direct(&uid("u1"), &uid("u2")).unwrap();
        let msg = db.send(conv, &uid("u2"), "still here").unwrap();
        (conv, msg)
    };

    let mut db = Database::open_at(&path).unwrap();
    assert_eq!(db.find_or_create_direct(&uid("u2"), &uid("u1")).unwrap(), conv);
    assert_eq!(db.get_message(msg).unwrap().unwrap().text, "still here");
}
