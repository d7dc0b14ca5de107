//! Fixed Italian reply texts.

use chrono::DateTime;
use chrono_tz::Tz;

use super::time::format_short;
use crate::memory::EventSnapshot;

pub const NO_DATE: &str = "Non ho capito la data/ora. Puoi ripetere? (es. 'venerdì alle 10')";
pub const NO_NEW_DATE: &str = "Non ho capito la nuova data/ora. Riprova es. 'sposta ... a martedì alle 11'.";
pub const NOTHING_TO_REMOVE: &str = "Non ho trovato eventi da rimuovere. Specifica meglio il titolo o l’orario.";
pub const NOTHING_TO_MOVE: &str = "Non ho trovato quale evento spostare. Specifica meglio il titolo.";
pub const INVALID_CHOICE: &str = "Scelta non valida. Rispondi con un numero della lista.";
pub const MISSING_FOLLOWUP: &str = "Non ho capito la nuova data/ora, riprova con 'sposta ... a ...'.";
pub const STORE_FAILURE: &str = "Si è verificato un problema con l'agenda. Riprova tra poco.";
pub const EMPTY_AGENDA: &str = "Agenda vuota da adesso in poi. ✨";
pub const RECAP_HEADER: &str = "🗓️ *Prossimi impegni*:";
/// Longest recap.
pub const RECAP_LIMIT: usize = 50;

pub const UNKNOWN: &str =
    "Ok! Dimmi se vuoi che *metta in agenda*, faccia un *recap*, *sposti* o *rimuova* qualcosa.";

pub const HELP: &str = "Ciao! Sono la tua agenda. Scrivimi in italiano:\n\
• *metti in agenda* domani alle 15 riunione budget\n\
• *recap* per i prossimi impegni\n\
• *sposta* riunione budget a lunedì alle 10\n\
• *rimuovi* visita commercialista\n\
Ti mando un promemoria 10 minuti prima di ogni evento.";

pub fn added(title: &str, at: &DateTime<Tz>) -> String {
    format!("✅ Aggiunto: {} — {}", title, format_short(at))
}

pub fn removed(title: &str, line: &str) -> String {
    format!("🗑️ Rimosso: {} — {}", title, line)
}

pub fn moved(old_line: &str, new_line: &str) -> String {
    format!("🔁 Spostato:\n~{}~\n→ {}", old_line, new_line)
}

pub fn recap(lines: &[String]) -> String {
    let mut out = String::from(RECAP_HEADER);
    out.push('\n');
    for line in lines {
        out.push_str("\n• ");
        out.push_str(line);
    }
    out
}

/// Numbered candidate list under a question.
pub fn choose(question: &str, candidates: &[EventSnapshot], line: impl Fn(&EventSnapshot) -> String) -> String {
    let mut out = format!("{} Rispondi con *1-{}*:", question, candidates.len());
    for (i, candidate) in candidates.iter().enumerate() {
        out.push_str(&format!("\n{}) {}", i + 1, line(candidate)));
    }
    out
}

pub const CHOOSE_REMOVE: &str = "Ho trovato più eventi. Quale intendi rimuovere?";
pub const CHOOSE_MOVE: &str = "Quale evento vuoi spostare?";
