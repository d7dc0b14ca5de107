use chrono::DateTime;
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::nlp::temporal::TemporalExtractor;
use crate::nlp::title::{title_case, TitleExtractor};
use crate::nlp::vocabulary::{command_regex, REMOVE_WORDS};

/// First connector separating "what" from "when" in a move request.
static MOVE_SPLIT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s(?:a|al|alla|alle|ad|per|tra|fra)\s|\sall'").expect("move split compiles"));

static REMOVE_WORDS_RE: Lazy<Regex> = Lazy::new(|| command_regex(REMOVE_WORDS));

/// What a move/remove message refers to.
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    /// Title-cased guess of the event's title.
    pub title: Option<String>,
    /// For a move: the new instant. For a remove: the instant that locates the event.
    pub when: Option<DateTime<Tz>>,
}

#[derive(Debug, Clone, Default)]
pub struct TargetExtractor {
    temporal: TemporalExtractor,
    titles: TitleExtractor,
}

impl TargetExtractor {
    pub fn new(temporal: TemporalExtractor) -> Self {
        Self {
            temporal,
            titles: TitleExtractor::new(),
        }
    }

    /// "sposta riunione budget a lunedì alle 10" -> ("Riunione Budget", next Monday 10:00).
    ///
    /// The new instant comes from the text after the connector, so a date quoted
    /// to identify the event ("riunione di venerdì a lunedì") is not taken for it.
    pub fn move_target(&self, text: &str, now: DateTime<Tz>) -> Target {
        let lower = text.to_lowercase();
        let (event_part, when) = match MOVE_SPLIT_RE.find(&lower) {
            Some(m) => (
                &lower[..m.start()],
                self.temporal
                    .extract(&lower[m.end()..], now)
                    .or_else(|| self.temporal.extract(&lower, now)),
            ),
            None => (lower.as_str(), self.temporal.extract(&lower, now)),
        };
        Target {
            title: self.title_guess(event_part),
            when,
        }
    }

    /// "cancella evento di domani alle 15" -> ("Evento", tomorrow 15:00).
    pub fn remove_target(&self, text: &str, now: DateTime<Tz>) -> Target {
        let lower = text.to_lowercase();
        let rest = REMOVE_WORDS_RE.replace_all(&lower, " ");
        let rest = rest.split_whitespace().collect::<Vec<_>>().join(" ");
        Target {
            title: self.title_guess(&rest),
            when: self.temporal.extract(&rest, now),
        }
    }

    fn title_guess(&self, text: &str) -> Option<String> {
        let stripped = self.titles.strip(text);
        if stripped.is_empty() {
            None
        } else {
            Some(title_case(&stripped))
        }
    }
}
