use std::collections::HashMap;

use tracing::debug;

use crate::kernel::event::UserId;
use crate::memory::{EventSnapshot, EventStore, StoreError};

/// Minimum score (0..100) for a fuzzy match to count.
pub const MATCH_THRESHOLD: f64 = 60.0;
/// Tolerance around a target instant for the time fallback.
pub const TIME_WINDOW_SECS: i64 = 30 * 60;
/// Longest list ever offered for a choice.
pub const MAX_CANDIDATES: usize = 5;

/// Similarity between a query and a candidate title, on a 0..=100 scale.
pub trait SimilarityScorer: Send + Sync {
    fn score(&self, query: &str, candidate: &str) -> f64;
}

/// Longest prefix of a query or title that is scored. Keeps one turn bounded
/// however long the stored titles are.
pub const MAX_SCORED_CHARS: usize = 256;

/// Best Indel similarity of the shorter string against any same-length window
/// of the longer one, including windows clipped at either edge.
#[derive(Debug, Clone, Copy, Default)]
pub struct PartialRatio;

impl SimilarityScorer for PartialRatio {
    fn score(&self, query: &str, candidate: &str) -> f64 {
        partial_ratio(query, candidate)
    }
}

pub fn partial_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().take(MAX_SCORED_CHARS).collect();
    let b: Vec<char> = b.chars().take(MAX_SCORED_CHARS).collect();
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };

    if short.is_empty() {
        return if long.is_empty() { 100.0 } else { 0.0 };
    }

    let m = short.len();
    let n = long.len();
    let pattern = BitPattern::new(&short);
    let mut best: f64 = 0.0;

    let mut consider = |window: &[char]| {
        let r = indel_ratio(pattern.lcs_len(window), m, window.len());
        if r > best {
            best = r;
        }
    };

    for i in 1..m {
        consider(&long[..i]);
    }
    for start in 0..=(n - m) {
        consider(&long[start..start + m]);
    }
    for i in (1..m).rev() {
        consider(&long[n - i..]);
    }

    best
}

/// Normalised Indel similarity: 2 * LCS / (|a| + |b|), scaled to 100.
fn indel_ratio(lcs: usize, a_len: usize, b_len: usize) -> f64 {
    let total = a_len + b_len;
    if total == 0 {
        return 100.0;
    }
    200.0 * lcs as f64 / total as f64
}

/// Bit-parallel LCS (Hyyrö): one bit per pattern char, one pass over the text.
/// Cost is `|text| * ceil(|pattern| / 64)` word operations.
struct BitPattern {
    len: usize,
    words: usize,
    masks: HashMap<char, Vec<u64>>,
}

impl BitPattern {
    fn new(pattern: &[char]) -> Self {
        let words = pattern.len().div_ceil(64).max(1);
        let mut masks: HashMap<char, Vec<u64>> = HashMap::new();
        for (i, c) in pattern.iter().enumerate() {
            masks.entry(*c).or_insert_with(|| vec![0; words])[i / 64] |= 1 << (i % 64);
        }
        Self {
            len: pattern.len(),
            words,
            masks,
        }
    }

    fn lcs_len(&self, text: &[char]) -> usize {
        let mut v = vec![u64::MAX; self.words];
        for c in text {
            let Some(mask) = self.masks.get(c) else {
                continue;
            };
            let mut carry = false;
            for (vw, mw) in v.iter_mut().zip(mask) {
                let u = *vw & mw;
                let (sum, c1) = vw.overflowing_add(u);
                let (sum, c2) = sum.overflowing_add(carry as u64);
                carry = c1 || c2;
                *vw = sum | (*vw & !u);
            }
        }

        // matched pattern positions are the zero bits
        let mut zeros = 0;
        for (i, w) in v.iter().enumerate() {
            let bits = (self.len - i * 64).min(64);
            let live = if bits == 64 { *w } else { *w | (u64::MAX << bits) };
            zeros += live.count_zeros() as usize;
        }
        zeros
    }
}

pub struct CandidateResolver {
    scorer: Box<dyn SimilarityScorer>,
    threshold: f64,
    window_secs: i64,
}

impl Default for CandidateResolver {
    fn default() -> Self {
        Self::new(Box::new(PartialRatio))
    }
}

impl CandidateResolver {
    pub fn new(scorer: Box<dyn SimilarityScorer>) -> Self {
        Self {
            scorer,
            threshold: MATCH_THRESHOLD,
            window_secs: TIME_WINDOW_SECS,
        }
    }

    /// Future events of `owner` matching `query` and/or lying near `at`, most relevant first.
    ///
    /// Text path: fuzzy score >= threshold, best first (ties stay chronological),
    /// else case-insensitive substring. Time path only when the text path is empty.
    pub fn resolve<S: EventStore + ?Sized>(
        &self,
        store: &S,
        owner: UserId,
        query: Option<&str>,
        now_ts: i64,
        at: Option<i64>,
    ) -> Result<Vec<EventSnapshot>, StoreError> {
        let query = query.map(|q| q.trim().to_lowercase()).filter(|q| !q.is_empty());

        let mut found = Vec::new();
        if let Some(q) = &query {
            found = self.fuzzy(store, owner, q, now_ts)?;
            if found.is_empty() {
                found = store.find_by_title_substring(owner, q, now_ts)?;
                debug!(owner = %owner, matches = found.len(), "substring fallback");
            }
        }

        if found.is_empty() {
            if let Some(at) = at {
                found = store
                    .list_future_by_owner(owner, now_ts)?
                    .into_iter()
                    .filter(|e| (e.start_ts - at).abs() <= self.window_secs)
                    .collect();
                debug!(owner = %owner, matches = found.len(), "time window fallback");
            }
        }

        found.truncate(MAX_CANDIDATES);
        Ok(found)
    }

    fn fuzzy<S: EventStore + ?Sized>(
        &self,
        store: &S,
        owner: UserId,
        query: &str,
        now_ts: i64,
    ) -> Result<Vec<EventSnapshot>, StoreError> {
        let mut scored: Vec<(f64, EventSnapshot)> = store
            .list_future_by_owner(owner, now_ts)?
            .into_iter()
            .map(|e| (self.scorer.score(query, &e.title.to_lowercase()), e))
            .filter(|(score, _)| *score >= self.threshold)
            .collect();
        // sort_by is stable: equal scores keep chronological order
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        Ok(scored.into_iter().map(|(_, e)| e).collect())
    }
}
