//! Italian vocabulary shared by the intent classifier, the temporal extractor
//! and the title extractor.
//!
//! Every pattern is written for lower-cased input.

use chrono::Weekday;
use once_cell::sync::Lazy;
use regex::Regex;

pub const ADD_WORDS: &[&str] = &[
    "metti", "mettimi", "aggiungi", "aggiungimi", "inserisci", "crea", "segna", "segnami",
    "ricorda", "ricordami",
];

pub const MOVE_WORDS: &[&str] = &[
    "sposta", "spostami", "rimanda", "posticipa", "anticipa", "modifica", "ripianifica",
];

pub const REMOVE_WORDS: &[&str] = &["rimuovi", "cancella", "elimina", "togli"];

pub const RECAP_WORDS: &[&str] = &["recap", "riepilogo", "mostra", "mostrami", "lista", "elenca"];

pub const RECAP_PHRASES: &[&str] = &["prossimi impegni", "cosa ho in agenda", "cosa ho in calendario"];

/// Whole-message recap requests. A bare "agenda" must not be caught by substring rules.
pub const RECAP_EXACT: &[&str] = &["agenda", "agenda?", "calendario", "calendario?"];

/// Object pronouns fused onto an imperative.
pub const ENCLITICS: &[&str] = &["lo", "la", "li", "le"];

pub const HELP_WORDS: &[&str] = &["aiuto", "help"];

pub const WEEKDAYS: &[(&str, Weekday)] = &[
    ("lunedì", Weekday::Mon), ("lunedi", Weekday::Mon),
    ("martedì", Weekday::Tue), ("martedi", Weekday::Tue),
    ("mercoledì", Weekday::Wed), ("mercoledi", Weekday::Wed),
    ("giovedì", Weekday::Thu), ("giovedi", Weekday::Thu),
    ("venerdì", Weekday::Fri), ("venerdi", Weekday::Fri),
    ("sabato", Weekday::Sat),
    ("domenica", Weekday::Sun),
];

pub const MONTHS: &[(&str, u32)] = &[
    ("gennaio", 1), ("febbraio", 2), ("marzo", 3), ("aprile", 4),
    ("maggio", 5), ("giugno", 6), ("luglio", 7), ("agosto", 8),
    ("settembre", 9), ("ottobre", 10), ("novembre", 11), ("dicembre", 12),
];

/// `(?:w1|w2|...)` with each word escaped.
fn alternation(words: &[&str]) -> String {
    let escaped: Vec<String> = words.iter().map(|w| regex::escape(w)).collect();
    format!("(?:{})", escaped.join("|"))
}

/// Whole-word matcher for a word list.
pub fn word_regex(words: &[&str]) -> Regex {
    Regex::new(&format!(r"\b{}\b", alternation(words))).expect("static word list compiles")
}

/// Like [`word_regex`], also accepting an attached object pronoun:
/// "spostalo", "cancellala", "rimandali".
pub fn command_regex(words: &[&str]) -> Regex {
    Regex::new(&format!(r"\b{}(?:{})?\b", alternation(words), ENCLITICS.join("|")))
        .expect("static word list compiles")
}

pub fn weekday_from_word(word: &str) -> Option<Weekday> {
    WEEKDAYS.iter().find(|(w, _)| *w == word).map(|(_, d)| *d)
}

pub fn month_from_word(word: &str) -> Option<u32> {
    MONTHS.iter().find(|(w, _)| *w == word).map(|(_, m)| *m)
}

/// "un", "due", ... "dieci" or digits.
pub fn small_number(word: &str) -> Option<u32> {
    match word.trim_end_matches('\'') {
        "un" | "uno" | "una" => Some(1),
        "due" => Some(2),
        "tre" => Some(3),
        "quattro" => Some(4),
        "cinque" => Some(5),
        "sei" => Some(6),
        "sette" => Some(7),
        "otto" => Some(8),
        "nove" => Some(9),
        "dieci" => Some(10),
        digits => digits.parse().ok(),
    }
}

// ---- command vocabulary ----

pub static ADD_PHRASE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:metti|aggiungi|inserisci|crea|segna)(?:mi)?\s+(?:in\s+)?(?:agenda|calendario)\b")
        .expect("add phrase compiles")
});

pub static IN_AGENDA_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:in|nella|nel)\s+(?:agenda|calendario)\b").expect("in agenda compiles"));

pub static COMMAND_WORDS_RE: Lazy<Regex> = Lazy::new(|| {
    let mut all: Vec<&str> = Vec::new();
    all.extend_from_slice(ADD_WORDS);
    all.extend_from_slice(MOVE_WORDS);
    all.extend_from_slice(REMOVE_WORDS);
    all.extend_from_slice(RECAP_WORDS);
    command_regex(&all)
});

pub static HELP_COMMAND_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|\s)/(?:help|start)(?:@\w+)?\b").expect("help command compiles"));

// ---- temporal vocabulary ----

pub static RELATIVE_DAY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(oggi|domani|dopodomani)\b").expect("relative day compiles"));

pub static DAY_PART_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:(?:di|del|della|in)\s+)?(?:stamattina|stamani|stamane|stasera|stanotte|pomeriggio|mattina|mattino|sera|notte)\b")
        .expect("day part compiles")
});

/// Shifts 1..11 to the afternoon when present anywhere in the message.
pub static PM_HINT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:stasera|pomeriggio|sera)\b").expect("pm hint compiles"));

pub static IN_DURATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?:tra|fra)\s+(?:(mezz'?ora)|(\d{1,3}|un'|una|uno|un|due|tre|quattro|cinque|sei|sette|otto|nove|dieci)\s*(minuti|minuto|ore|ora|giorni|giorno|settimane|settimana|mesi|mese)\b)",
    )
    .expect("duration compiles")
});

pub static WEEKDAY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?:(?:il|la)\s+)?(?:prossim[oa]\s+)?(luned[iì]|marted[iì]|mercoled[iì]|gioved[iì]|venerd[iì]|sabato|domenica)(?:\s+prossim[oa])?\b",
    )
    .expect("weekday compiles")
});

pub static NUMERIC_DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:(?:il|del)\s+)?(\d{1,2})[/-](\d{1,2})(?:[/-](\d{4}|\d{2}))?\b").expect("numeric date compiles")
});

pub static MONTH_DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"\b(?:(?:il|del)\s+)?(\d{{1,2}})(?:°|º)?\s+{}(?:\s+(\d{{4}}))?\b",
        format!("({})", MONTHS.iter().map(|(m, _)| *m).collect::<Vec<_>>().join("|"))
    ))
    .expect("month date compiles")
});

/// "alle 15", "alle ore 9", "ore 18:30", "h 7", "alle 9 e 30", "alle 10 e mezza", "dalle 9".
/// Groups: hour, minutes after `:`/`.`, minutes after "e", fraction word.
pub static CLOCK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?:dalle|alle|all'|ore|h)\s*(?:ore\s*)?(\d{1,2})(?:[:.](\d{2})|\s+e\s+(\d{2})\b)?(?:\s+e\s+(mezz[ao]|(?:un\s+)?quarto))?\b",
    )
    .expect("clock compiles")
});

pub static BARE_CLOCK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,2}):(\d{2})\b").expect("bare clock compiles"));

pub static NAMED_TIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:a\s+|alle\s+|verso\s+)?(mezzogiorno|mezzanotte)\b|\ball'una\b").expect("named time compiles")
});
