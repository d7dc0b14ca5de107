use crate::nlp::vocabulary::{
    ADD_PHRASE_RE, BARE_CLOCK_RE, CLOCK_RE, COMMAND_WORDS_RE, DAY_PART_RE, IN_AGENDA_RE, IN_DURATION_RE,
    MONTH_DATE_RE, NAMED_TIME_RE, NUMERIC_DATE_RE, RELATIVE_DAY_RE, WEEKDAY_RE,
};

/// Label used when nothing is left of the message.
pub const DEFAULT_TITLE: &str = "Evento";

/// Connectors and articles that may precede a title once the command is gone
/// ("ricordami di ...", "metti la cena ...").
const LEADING_CONNECTORS: &[&str] = &[
    "di", "del", "della", "a", "al", "alla", "alle", "ad", "per", "tra", "fra", "e", "ed", "in", "nel", "nella", "da", "su",
    "il", "lo", "la", "i", "gli", "le", "un", "uno", "una", "l'", "l’",
];

/// Elided articles glued to the first word ("l'appuntamento").
const ELIDED_ARTICLES: &[&str] = &["l'", "l’", "un'", "un’"];

/// Connectors left behind at the end after a date is cut out ("riunione il").
const TRAILING_CONNECTORS: &[&str] = &[
    "il", "lo", "la", "l'", "i", "gli", "le", "un", "una", "di", "del", "della", "dello", "dei", "delle", "degli", "a", "al",
    "alla", "alle", "allo", "ai", "ad", "da", "dal", "dalla", "per", "tra", "fra", "e", "ed", "in", "nel", "nella", "su",
    "sul", "sulla", "ore", "h", "entro", "verso",
];

/// Recovers a display title by removing command and temporal vocabulary.
/// Works on its own re-match of the vocabulary, not on the temporal extractor's spans.
#[derive(Debug, Clone, Copy, Default)]
pub struct TitleExtractor;

impl TitleExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Title-cased remainder, or an empty string when nothing is left.
    pub fn extract(&self, text: &str) -> String {
        title_case(&self.strip(text))
    }

    /// Lower-cased remainder without title casing. Used for matching queries.
    pub fn strip(&self, text: &str) -> String {
        let mut t = text.to_lowercase();

        for re in [&*ADD_PHRASE_RE, &*IN_AGENDA_RE, &*COMMAND_WORDS_RE] {
            t = re.replace_all(&t, " ").into_owned();
        }
        for re in [
            &*CLOCK_RE,
            &*BARE_CLOCK_RE,
            &*NAMED_TIME_RE,
            &*IN_DURATION_RE,
            &*RELATIVE_DAY_RE,
            &*DAY_PART_RE,
            &*WEEKDAY_RE,
            &*NUMERIC_DATE_RE,
            &*MONTH_DATE_RE,
        ] {
            t = re.replace_all(&t, " ").into_owned();
        }

        trim_connectors(&t)
    }
}

fn trim_connectors(text: &str) -> String {
    let mut words: Vec<&str> = text
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| matches!(c, ',' | '.' | ';' | ':' | '!' | '?' | '-')))
        .filter(|w| !w.is_empty())
        .collect();

    while let Some(first) = words.first().copied() {
        if LEADING_CONNECTORS.contains(&first) {
            words.remove(0);
            continue;
        }
        match ELIDED_ARTICLES.iter().find_map(|a| first.strip_prefix(a)) {
            Some(rest) if !rest.is_empty() => words[0] = rest,
            _ => break,
        }
    }
    while words.last().is_some_and(|w| TRAILING_CONNECTORS.contains(w)) {
        words.pop();
    }
    words.join(" ")
}

/// Upper-cases every letter that follows a non-letter, lower-cases the rest.
/// "dell'avvocato" -> "Dell'Avvocato".
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_is_letter = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if prev_is_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_is_letter = true;
        } else {
            out.push(c);
            prev_is_letter = false;
        }
    }
    out
}
