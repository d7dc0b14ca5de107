use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::event::{ChatId, InputEvent, Reply};
use super::intent::{Intent, IntentClassifier};
use super::resolver::CandidateResolver;
use super::scheduler::ReminderScheduler;
use super::state::{ChoiceOutcome, ConversationState, PendingAction, PendingDisambiguation};
use super::templates;
use super::time::{format_event_line, Clock};
use crate::error::{AgendaError, AmbiguityKind};
use crate::memory::{EventSnapshot, EventStore, StoreError};
use crate::nlp::{TargetExtractor, TemporalExtractor, TitleExtractor, DEFAULT_TITLE};
use crate::services::delivery::Delivery;

type TurnResult = Result<Reply, AgendaError>;

/// The dispatcher: one message in, replies out.
///
/// Owns the store, the per-conversation pending choices and the reminder
/// scheduler. Messages are handled one at a time, so a conversation's state
/// transitions follow the order of its messages.
pub struct Reactor<S: EventStore> {
    store: S,
    classifier: IntentClassifier,
    temporal: TemporalExtractor,
    titles: TitleExtractor,
    targets: TargetExtractor,
    resolver: CandidateResolver,
    conversations: ConversationState,
    reminders: ReminderScheduler,
    clock: Arc<dyn Clock>,
    tz: Tz,
}

impl<S: EventStore> Reactor<S> {
    pub fn new(store: S, reminders: ReminderScheduler, clock: Arc<dyn Clock>, tz: Tz) -> Self {
        let temporal = TemporalExtractor::new(tz);
        Self {
            store,
            classifier: IntentClassifier::default(),
            targets: TargetExtractor::new(temporal.clone()),
            temporal,
            titles: TitleExtractor::new(),
            resolver: CandidateResolver::default(),
            conversations: ConversationState::new(),
            reminders,
            clock,
            tz,
        }
    }

    pub fn with_classifier(mut self, classifier: IntentClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn conversations(&self) -> &ConversationState {
        &self.conversations
    }

    pub fn conversations_mut(&mut self) -> &mut ConversationState {
        &mut self.conversations
    }

    pub fn reminders(&self) -> &ReminderScheduler {
        &self.reminders
    }

    /// Boot-time recovery of reminder jobs from the store.
    pub fn restore_reminders(&self) -> Result<usize, StoreError> {
        self.reminders.restore(&self.store)
    }

    /// Handles one message. Never fails: every error becomes a reply.
    pub fn handle(&mut self, input: &InputEvent) -> Vec<Reply> {
        let chat = input.chat;
        debug!(chat_id = %chat, user_id = %input.user, text = %input.text, "message");

        let result = match self.conversations.advance_pending_choice(input.conversation(), &input.text) {
            ChoiceOutcome::Invalid { choice, max } => Err(AgendaError::SelectionOutOfRange { choice, max }),
            ChoiceOutcome::Selected {
                action,
                candidate,
                new_start_ts,
            } => self.apply_choice(chat, action, candidate, new_start_ts),
            ChoiceOutcome::NotAChoice | ChoiceOutcome::NoPending => self.route(input),
        };

        match result {
            Ok(reply) => vec![reply],
            Err(e) => {
                match &e {
                    AgendaError::Store(inner) => error!(chat_id = %chat, "store failure: {}", inner),
                    other => debug!(chat_id = %chat, "turn not applied: {}", other),
                }
                vec![Reply::plain(chat, e.user_prompt())]
            }
        }
    }

    fn route(&mut self, input: &InputEvent) -> TurnResult {
        let intent = self.classifier.classify(&input.text);
        info!(chat_id = %input.chat, user_id = %input.user, intent = %intent, "message routed");

        match intent {
            Intent::Add => self.add(input),
            Intent::Recap => self.recap(input),
            Intent::Remove => self.remove(input),
            Intent::Move => self.move_event(input),
            Intent::Help => Ok(Reply::markdown(input.chat, templates::HELP)),
            Intent::Unknown => Ok(Reply::markdown(input.chat, templates::UNKNOWN)),
        }
    }

    fn now(&self) -> (DateTime<Utc>, DateTime<Tz>) {
        let now = self.clock.now();
        (now, now.with_timezone(&self.tz))
    }

    fn line(&self, title: &str, ts: i64) -> String {
        format_event_line(title, ts, &self.tz)
    }

    fn add(&mut self, input: &InputEvent) -> TurnResult {
        let (_, now_local) = self.now();
        let when = self
            .temporal
            .extract(&input.text, now_local)
            .ok_or(AgendaError::InputAmbiguity(AmbiguityKind::NoDate))?;

        let mut title = self.titles.extract(&input.text);
        if title.is_empty() {
            title = DEFAULT_TITLE.to_string();
        }

        let start_ts = when.timestamp();
        let id = self.store.insert(input.user, input.chat, &title, start_ts)?;
        info!(event_id = %id, chat_id = %input.chat, "event added");
        self.reminders.schedule_event_reminder(id, input.chat, &title, start_ts);

        Ok(Reply::plain(input.chat, templates::added(&title, &when)))
    }

    fn recap(&mut self, input: &InputEvent) -> TurnResult {
        let (now, _) = self.now();
        let events = self.store.list_future_by_owner(input.user, now.timestamp())?;
        if events.is_empty() {
            return Ok(Reply::plain(input.chat, templates::EMPTY_AGENDA));
        }
        let lines: Vec<String> = events
            .iter()
            .take(templates::RECAP_LIMIT)
            .map(|e| self.line(&e.title, e.start_ts))
            .collect();
        Ok(Reply::markdown(input.chat, templates::recap(&lines)))
    }

    fn remove(&mut self, input: &InputEvent) -> TurnResult {
        let (now, now_local) = self.now();
        let target = self.targets.remove_target(&input.text, now_local);
        let candidates = self.resolver.resolve(
            &self.store,
            input.user,
            target.title.as_deref(),
            now.timestamp(),
            target.when.map(|w| w.timestamp()),
        )?;

        match candidates.len() {
            0 => Err(AgendaError::InputAmbiguity(AmbiguityKind::NoRemoveCandidates)),
            1 => self.delete(input.chat, &candidates[0]),
            _ => Ok(self.ask_choice(input, PendingAction::Remove, candidates, None)),
        }
    }

    fn move_event(&mut self, input: &InputEvent) -> TurnResult {
        let (now, now_local) = self.now();
        let target = self.targets.move_target(&input.text, now_local);
        let new_start_ts = target
            .when
            .map(|w| w.timestamp())
            .ok_or(AgendaError::InputAmbiguity(AmbiguityKind::NoNewDate))?;

        let candidates =
            self.resolver
                .resolve(&self.store, input.user, target.title.as_deref(), now.timestamp(), None)?;

        match candidates.len() {
            0 => Err(AgendaError::InputAmbiguity(AmbiguityKind::NoMoveCandidates)),
            1 => self.reschedule(input.chat, &candidates[0], new_start_ts),
            _ => Ok(self.ask_choice(input, PendingAction::Move, candidates, Some(new_start_ts))),
        }
    }

    fn ask_choice(
        &mut self,
        input: &InputEvent,
        action: PendingAction,
        candidates: Vec<EventSnapshot>,
        new_start_ts: Option<i64>,
    ) -> Reply {
        let pending = PendingDisambiguation::new(action, candidates, new_start_ts);
        let question = match action {
            PendingAction::Remove => templates::CHOOSE_REMOVE,
            PendingAction::Move => templates::CHOOSE_MOVE,
        };
        let text = templates::choose(question, &pending.candidates, |c| self.line(&c.title, c.start_ts));
        self.conversations.begin(input.conversation(), pending);
        Reply::markdown(input.chat, text)
    }

    fn apply_choice(
        &mut self,
        chat: ChatId,
        action: PendingAction,
        candidate: EventSnapshot,
        new_start_ts: Option<i64>,
    ) -> TurnResult {
        match action {
            PendingAction::Remove => self.delete(chat, &candidate),
            PendingAction::Move => {
                let new_start_ts = new_start_ts.ok_or(AgendaError::MissingFollowupData)?;
                self.reschedule(chat, &candidate, new_start_ts)
            }
        }
    }

    fn delete(&mut self, chat: ChatId, event: &EventSnapshot) -> TurnResult {
        self.store.delete(event.id)?;
        self.reminders.cancel(event.id);
        info!(event_id = %event.id, chat_id = %chat, "event removed");
        Ok(Reply::plain(chat, templates::removed(&event.title, &self.line(&event.title, event.start_ts))))
    }

    fn reschedule(&mut self, chat: ChatId, event: &EventSnapshot, new_start_ts: i64) -> TurnResult {
        self.store.update_start(event.id, new_start_ts)?;
        self.reminders
            .schedule_event_reminder(event.id, chat, &event.title, new_start_ts);
        info!(event_id = %event.id, chat_id = %chat, "event moved");

        let old_line = self.line(&event.title, event.start_ts);
        let new_line = self.line(&event.title, new_start_ts);
        Ok(Reply::plain(chat, templates::moved(&old_line, &new_line)))
    }

    /// Async driver loop: drains the inbox until it closes or `shutdown` fires.
    pub async fn run(
        &mut self,
        mut inbox: mpsc::Receiver<InputEvent>,
        delivery: Arc<dyn Delivery>,
        shutdown: CancellationToken,
    ) {
        info!("reactor started");
        loop {
            let input = tokio::select! {
                _ = shutdown.cancelled() => break,
                input = inbox.recv() => match input {
                    Some(input) => input,
                    None => break,
                },
            };

            for reply in self.handle(&input) {
                if let Err(e) = delivery.deliver(&reply).await {
                    warn!(chat_id = %reply.chat, "reply delivery failed: {}", e);
                }
            }
        }
        info!("reactor stopped");
    }
}
