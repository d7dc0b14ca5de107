mod common;

use std::sync::Arc;

use agenda::error::{AgendaError, AmbiguityKind};
use agenda::kernel::event::{ConversationKey, TextFormat};
use agenda::kernel::state::{PendingAction, PendingDisambiguation};
use agenda::kernel::templates;
use agenda::memory::EventStore;
use agenda::services::Delivery;
use common::{harness, msg, rome_ts, RecordingDelivery, ALICE, BOB, CHAT};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

fn alice() -> ConversationKey {
    ConversationKey { chat: CHAT, user: ALICE }
}

#[tokio::test]
async fn test_add_creates_event_and_reminder() {
    let mut h = harness();

    let replies = h.reactor.handle(&msg(ALICE, "metti in agenda domani alle 15 riunione budget"));
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].text, "✅ Aggiunto: Riunione Budget — 11/03/2027 15:00");

    let start = rome_ts(2027, 3, 11, 15, 0);
    let events = h.reactor.store().list_future_by_owner(ALICE, 0).unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].title, "Riunione Budget");
    assert_eq!(events[0].start_ts, start);

    let jobs = h.reactor.reminders().pending_jobs();
    assert_eq!(jobs.len(), 1, "one reminder per new event");
    assert_eq!(jobs[0].fire_at.timestamp(), rome_ts(2027, 3, 11, 14, 50));
    assert_eq!(jobs[0].text, "⏰ Promemoria: 'Riunione Budget' il 11/03/2027 15:00");
    assert_eq!(jobs[0].chat, CHAT);
}

#[tokio::test]
async fn test_add_without_date_asks_again() {
    let mut h = harness();
    let replies = h.reactor.handle(&msg(ALICE, "aggiungi riunione budget"));
    assert_eq!(replies[0].text, templates::NO_DATE);
    assert!(h.reactor.store().list_future_by_owner(ALICE, 0).unwrap().is_empty());
}

#[tokio::test]
async fn test_add_without_title_uses_default() {
    let mut h = harness();
    let replies = h.reactor.handle(&msg(ALICE, "metti in agenda venerdì alle 10"));
    assert_eq!(replies[0].text, "✅ Aggiunto: Evento — 12/03/2027 10:00");
}

#[tokio::test]
async fn test_single_candidate_is_removed_immediately() {
    let mut h = harness();
    let store = h.reactor.store_mut();
    store.insert(ALICE, CHAT, "Visita Commercialista", rome_ts(2027, 3, 15, 11, 0)).unwrap();
    let other = store.insert(ALICE, CHAT, "Riunione Budget", rome_ts(2027, 3, 16, 10, 0)).unwrap();

    let replies = h.reactor.handle(&msg(ALICE, "rimuovi visita commercialista"));
    assert_eq!(
        replies[0].text,
        "🗑️ Rimosso: Visita Commercialista — lun 15/03/2027 11:00 — Visita Commercialista"
    );

    let left = h.reactor.store().list_future_by_owner(ALICE, 0).unwrap();
    assert_eq!(left.iter().map(|e| e.id).collect::<Vec<_>>(), vec![other]);
    assert!(!h.reactor.conversations().is_awaiting(&alice()), "no pending state for a single match");
}

#[tokio::test]
async fn test_remove_by_time_window() {
    let mut h = harness();
    h.reactor
        .store_mut()
        .insert(ALICE, CHAT, "Palestra", rome_ts(2027, 3, 11, 15, 0))
        .unwrap();

    let replies = h.reactor.handle(&msg(ALICE, "cancella domani alle 15"));
    assert!(replies[0].text.starts_with("🗑️ Rimosso: Palestra"), "got {}", replies[0].text);
}

#[tokio::test]
async fn test_remove_without_candidates() {
    let mut h = harness();
    let replies = h.reactor.handle(&msg(ALICE, "elimina cena"));
    assert_eq!(replies[0].text, templates::NOTHING_TO_REMOVE);
    assert!(!h.reactor.conversations().is_awaiting(&alice()));
}

#[tokio::test]
async fn test_ambiguous_move_then_choice() {
    let mut h = harness();
    let store = h.reactor.store_mut();
    let first = store.insert(ALICE, CHAT, "Riunione Budget", rome_ts(2027, 3, 12, 10, 0)).unwrap();
    let second = store.insert(ALICE, CHAT, "Riunione Budget Q2", rome_ts(2027, 3, 13, 11, 0)).unwrap();
    store.insert(ALICE, CHAT, "Dentista", rome_ts(2027, 3, 12, 9, 0)).unwrap();

    let replies = h.reactor.handle(&msg(ALICE, "sposta riunione budget a lunedì alle 10"));
    assert_eq!(replies[0].format, TextFormat::Markdown);
    assert_eq!(
        replies[0].text,
        "Quale evento vuoi spostare? Rispondi con *1-2*:\n\
         1) ven 12/03/2027 10:00 — Riunione Budget\n\
         2) sab 13/03/2027 11:00 — Riunione Budget Q2"
    );

    let monday_ten = rome_ts(2027, 3, 15, 10, 0);
    let pending = h.reactor.conversations().pending(&alice()).cloned().expect("awaiting a choice");
    assert_eq!(pending.action, PendingAction::Move);
    assert_eq!(pending.candidates.iter().map(|c| c.id).collect::<Vec<_>>(), vec![first, second]);
    assert_eq!(pending.new_start_ts, Some(monday_ten));

    let replies = h.reactor.handle(&msg(ALICE, "1"));
    assert_eq!(
        replies[0].text,
        "🔁 Spostato:\n~ven 12/03/2027 10:00 — Riunione Budget~\n→ lun 15/03/2027 10:00 — Riunione Budget"
    );
    assert!(!h.reactor.conversations().is_awaiting(&alice()));

    let moved = h.reactor.store().get(first).unwrap().expect("still stored");
    assert_eq!(moved.start_ts, monday_ten);
    let untouched = h.reactor.store().get(second).unwrap().expect("still stored");
    assert_eq!(untouched.start_ts, rome_ts(2027, 3, 13, 11, 0));
}

#[tokio::test]
async fn test_move_quoting_old_and_new_instant() {
    let mut h = harness();
    let id = h
        .reactor
        .store_mut()
        .insert(ALICE, CHAT, "Riunione", rome_ts(2027, 3, 12, 10, 0))
        .unwrap();

    let replies = h.reactor.handle(&msg(ALICE, "sposta riunione di venerdì a lunedì alle 11"));
    assert_eq!(
        replies[0].text,
        "🔁 Spostato:\n~ven 12/03/2027 10:00 — Riunione~\n→ lun 15/03/2027 11:00 — Riunione"
    );
    assert_eq!(h.reactor.store().get(id).unwrap().expect("stored").start_ts, rome_ts(2027, 3, 15, 11, 0));

    let replies = h.reactor.handle(&msg(ALICE, "sposta riunione alle 11 a domani alle 12"));
    assert_eq!(
        replies[0].text,
        "🔁 Spostato:\n~lun 15/03/2027 11:00 — Riunione~\n→ gio 11/03/2027 12:00 — Riunione"
    );
    assert_eq!(h.reactor.store().get(id).unwrap().expect("stored").start_ts, rome_ts(2027, 3, 11, 12, 0));
}

#[tokio::test]
async fn test_out_of_range_choice_keeps_pending_state() {
    let mut h = harness();
    let store = h.reactor.store_mut();
    store.insert(ALICE, CHAT, "Yoga", rome_ts(2027, 3, 12, 18, 0)).unwrap();
    let second = store.insert(ALICE, CHAT, "Yoga", rome_ts(2027, 3, 14, 18, 0)).unwrap();

    h.reactor.handle(&msg(ALICE, "rimuovi yoga"));
    let before = h.reactor.conversations().pending(&alice()).cloned().expect("awaiting a choice");
    assert_eq!(before.candidates.len(), 2);

    let replies = h.reactor.handle(&msg(ALICE, "9"));
    assert_eq!(replies[0].text, templates::INVALID_CHOICE);
    assert_eq!(h.reactor.conversations().pending(&alice()), Some(&before), "retry keeps the same list");

    let replies = h.reactor.handle(&msg(ALICE, "0"));
    assert_eq!(replies[0].text, templates::INVALID_CHOICE);

    let replies = h.reactor.handle(&msg(ALICE, " 2 "));
    assert!(replies[0].text.starts_with("🗑️ Rimosso: Yoga"));
    assert!(h.reactor.store().get(second).unwrap().is_none());
    assert!(!h.reactor.conversations().is_awaiting(&alice()));
}

#[tokio::test]
async fn test_pending_move_without_target_is_cleared() {
    let mut h = harness();
    let id = h
        .reactor
        .store_mut()
        .insert(ALICE, CHAT, "Yoga", rome_ts(2027, 3, 12, 18, 0))
        .unwrap();
    let candidates = h.reactor.store().list_future_by_owner(ALICE, 0).unwrap();
    h.reactor
        .conversations_mut()
        .begin(alice(), PendingDisambiguation::new(PendingAction::Move, candidates, None));

    let replies = h.reactor.handle(&msg(ALICE, "1"));
    assert_eq!(replies[0].text, templates::MISSING_FOLLOWUP);
    assert!(!h.reactor.conversations().is_awaiting(&alice()), "cleared even though the move failed");
    assert_eq!(h.reactor.store().get(id).unwrap().map(|e| e.start_ts), Some(rome_ts(2027, 3, 12, 18, 0)));
}

#[tokio::test]
async fn test_digit_without_pending_goes_through_pipeline() {
    let mut h = harness();
    let replies = h.reactor.handle(&msg(ALICE, "3"));
    assert_eq!(replies[0].text, templates::UNKNOWN);
}

#[tokio::test]
async fn test_new_message_leaves_stale_choice_until_replaced() {
    let mut h = harness();
    let store = h.reactor.store_mut();
    store.insert(ALICE, CHAT, "Yoga", rome_ts(2027, 3, 12, 18, 0)).unwrap();
    store.insert(ALICE, CHAT, "Yoga", rome_ts(2027, 3, 14, 18, 0)).unwrap();
    store.insert(ALICE, CHAT, "Cena", rome_ts(2027, 3, 12, 20, 0)).unwrap();
    store.insert(ALICE, CHAT, "Cena", rome_ts(2027, 3, 13, 20, 0)).unwrap();

    h.reactor.handle(&msg(ALICE, "rimuovi yoga"));
    let replies = h.reactor.handle(&msg(ALICE, "recap"));
    assert!(replies[0].text.starts_with(templates::RECAP_HEADER));
    assert!(h.reactor.conversations().is_awaiting(&alice()), "stale state survives unrelated messages");

    h.reactor.handle(&msg(ALICE, "sposta cena a domenica alle 21"));
    let pending = h.reactor.conversations().pending(&alice()).expect("awaiting a choice");
    assert_eq!(pending.action, PendingAction::Move, "a new disambiguation replaces the old one");
    assert!(pending.candidates.iter().all(|c| c.title == "Cena"));
}

#[tokio::test]
async fn test_pending_state_is_per_conversation() {
    let mut h = harness();
    let store = h.reactor.store_mut();
    store.insert(ALICE, CHAT, "Yoga", rome_ts(2027, 3, 12, 18, 0)).unwrap();
    store.insert(ALICE, CHAT, "Yoga", rome_ts(2027, 3, 14, 18, 0)).unwrap();

    h.reactor.handle(&msg(ALICE, "rimuovi yoga"));
    let replies = h.reactor.handle(&msg(BOB, "1"));
    assert_eq!(replies[0].text, templates::UNKNOWN, "bob has nothing pending");
    assert_eq!(h.reactor.store().list_future_by_owner(ALICE, 0).unwrap().len(), 2);
    assert!(h.reactor.conversations().is_awaiting(&alice()));
}

#[tokio::test]
async fn test_move_reschedules_and_remove_cancels_reminder() {
    let mut h = harness();
    h.reactor.handle(&msg(ALICE, "metti in agenda domani alle 15 dentista"));
    assert_eq!(h.reactor.reminders().pending_jobs().len(), 1);

    h.reactor.handle(&msg(ALICE, "sposta dentista a venerdì alle 11"));
    let jobs = h.reactor.reminders().pending_jobs();
    assert_eq!(jobs.len(), 1, "the old reminder is replaced, not duplicated");
    assert_eq!(jobs[0].fire_at.timestamp(), rome_ts(2027, 3, 12, 10, 50));

    h.reactor.handle(&msg(ALICE, "rimuovi dentista"));
    assert!(h.reactor.reminders().pending_jobs().is_empty());
}

#[tokio::test]
async fn test_move_without_new_date() {
    let mut h = harness();
    h.reactor
        .store_mut()
        .insert(ALICE, CHAT, "Yoga", rome_ts(2027, 3, 12, 18, 0))
        .unwrap();
    let replies = h.reactor.handle(&msg(ALICE, "sposta yoga"));
    assert_eq!(replies[0].text, templates::NO_NEW_DATE);

    let replies = h.reactor.handle(&msg(ALICE, "sposta cena a lunedì"));
    assert_eq!(replies[0].text, templates::NOTHING_TO_MOVE);
}

#[tokio::test]
async fn test_recap_lists_future_events() {
    let mut h = harness();
    let replies = h.reactor.handle(&msg(ALICE, "recap"));
    assert_eq!(replies[0].text, templates::EMPTY_AGENDA);

    let store = h.reactor.store_mut();
    store.insert(ALICE, CHAT, "Dentista", rome_ts(2027, 3, 12, 9, 0)).unwrap();
    store.insert(ALICE, CHAT, "Riunione Budget", rome_ts(2027, 3, 11, 15, 0)).unwrap();
    store.insert(ALICE, CHAT, "Ieri", rome_ts(2027, 3, 9, 15, 0)).unwrap();
    store.insert(BOB, CHAT, "Di Bob", rome_ts(2027, 3, 11, 16, 0)).unwrap();

    let replies = h.reactor.handle(&msg(ALICE, "cosa ho in agenda?"));
    assert_eq!(replies[0].format, TextFormat::Markdown);
    assert_eq!(
        replies[0].text,
        "🗓️ *Prossimi impegni*:\n\n• gio 11/03/2027 15:00 — Riunione Budget\n• ven 12/03/2027 09:00 — Dentista"
    );
}

#[tokio::test]
async fn test_help_and_unknown() {
    let mut h = harness();
    let replies = h.reactor.handle(&msg(ALICE, "/start"));
    assert_eq!(replies[0].text, templates::HELP);
    let replies = h.reactor.handle(&msg(ALICE, "ciao"));
    assert_eq!(replies[0].text, templates::UNKNOWN);
}

#[test]
fn test_error_prompts() {
    assert_eq!(AgendaError::InputAmbiguity(AmbiguityKind::NoDate).user_prompt(), templates::NO_DATE);
    assert_eq!(
        AgendaError::SelectionOutOfRange { choice: 9, max: 2 }.user_prompt(),
        templates::INVALID_CHOICE
    );
    assert_eq!(AgendaError::MissingFollowupData.user_prompt(), templates::MISSING_FOLLOWUP);
}

#[tokio::test]
async fn test_run_loop_delivers_replies() {
    let mut h = harness();
    let out = Arc::new(RecordingDelivery::default());
    let (tx, rx) = mpsc::channel(8);

    tx.send(msg(ALICE, "metti in agenda domani alle 15 riunione budget")).await.unwrap();
    tx.send(msg(ALICE, "recap")).await.unwrap();
    drop(tx);

    let delivery: Arc<dyn Delivery> = out.clone();
    h.reactor.run(rx, delivery, CancellationToken::new()).await;

    let sent = out.messages();
    assert_eq!(sent.len(), 2);
    assert!(sent[0].1.starts_with("✅ Aggiunto"));
    assert!(sent[1].1.contains("Riunione Budget"));
    assert!(sent.iter().all(|(chat, _)| *chat == CHAT));
    assert!(h.delivery.messages().is_empty(), "no reminder is due yet");
}
