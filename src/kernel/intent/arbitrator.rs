use regex::Regex;
use tracing::debug;

use super::types::{Intent, DEFAULT_ORDER};
use crate::nlp::temporal::TemporalExtractor;
use crate::nlp::vocabulary::{
    command_regex, word_regex, ADD_WORDS, HELP_COMMAND_RE, HELP_WORDS, MOVE_WORDS, RECAP_EXACT, RECAP_PHRASES, RECAP_WORDS,
    REMOVE_WORDS,
};

/// One way a rule can recognise its intent. Input is lower-cased and trimmed.
#[derive(Debug, Clone)]
pub enum Matcher {
    Pattern(Regex),
    /// Substring containment.
    Phrases(&'static [&'static str]),
    /// The whole message.
    Exact(&'static [&'static str]),
    /// Any recognisable date or time.
    TemporalExpression(TemporalExtractor),
}

impl Matcher {
    fn matches(&self, lower: &str) -> bool {
        match self {
            Matcher::Pattern(re) => re.is_match(lower),
            Matcher::Phrases(phrases) => phrases.iter().any(|p| lower.contains(p)),
            Matcher::Exact(words) => words.iter().any(|w| lower == *w),
            Matcher::TemporalExpression(temporal) => temporal.detects(lower),
        }
    }
}

#[derive(Debug, Clone)]
pub struct IntentRule {
    pub intent: Intent,
    matchers: Vec<Matcher>,
}

impl IntentRule {
    pub fn new(intent: Intent, matchers: Vec<Matcher>) -> Self {
        Self { intent, matchers }
    }

    pub fn matches(&self, lower: &str) -> bool {
        self.matchers.iter().any(|m| m.matches(lower))
    }

    /// The built-in keyword rule for an intent.
    pub fn keywords(intent: Intent) -> Option<Self> {
        let matchers = match intent {
            Intent::Move => vec![Matcher::Pattern(command_regex(MOVE_WORDS))],
            Intent::Remove => vec![Matcher::Pattern(command_regex(REMOVE_WORDS))],
            Intent::Add => vec![Matcher::Pattern(word_regex(ADD_WORDS))],
            Intent::Recap => vec![
                Matcher::Pattern(word_regex(RECAP_WORDS)),
                Matcher::Phrases(RECAP_PHRASES),
                Matcher::Exact(RECAP_EXACT),
            ],
            Intent::Help => vec![Matcher::Pattern(HELP_COMMAND_RE.clone()), Matcher::Pattern(word_regex(HELP_WORDS))],
            Intent::Unknown => return None,
        };
        Some(Self::new(intent, matchers))
    }

    /// "Contains a date -> add". Only ever consulted after the keyword rules.
    pub fn implicit_add() -> Self {
        Self::new(Intent::Add, vec![Matcher::TemporalExpression(TemporalExtractor::default())])
    }
}

/// Ordered list of (predicate, intent) rules. First match wins.
#[derive(Debug, Clone)]
pub struct IntentClassifier {
    rules: Vec<IntentRule>,
}

impl Default for IntentClassifier {
    fn default() -> Self {
        Self::with_order(&DEFAULT_ORDER, false)
    }
}

impl IntentClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keyword rules in `order`; intents left out are appended in default order,
    /// duplicates are ignored. The implicit date rule, when enabled, comes last.
    pub fn with_order(order: &[Intent], implicit_add: bool) -> Self {
        let mut seen: Vec<Intent> = Vec::new();
        for intent in order.iter().chain(DEFAULT_ORDER.iter()) {
            if *intent != Intent::Unknown && !seen.contains(intent) {
                seen.push(*intent);
            }
        }

        let mut rules: Vec<IntentRule> = seen.into_iter().filter_map(IntentRule::keywords).collect();
        if implicit_add {
            rules.push(IntentRule::implicit_add());
        }
        Self { rules }
    }

    pub fn order(&self) -> Vec<Intent> {
        self.rules.iter().map(|r| r.intent).collect()
    }

    pub fn classify(&self, text: &str) -> Intent {
        let lower = text.trim().to_lowercase();
        let intent = self
            .rules
            .iter()
            .find(|rule| rule.matches(&lower))
            .map_or(Intent::Unknown, |rule| rule.intent);
        debug!(intent = %intent, "classified message");
        intent
    }
}
