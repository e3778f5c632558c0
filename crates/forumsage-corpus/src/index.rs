use std::cmp::Ordering;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, warn};

use forumsage_core::error::{Error, Result};
use forumsage_core::types::{RelevanceHit, ThreadRecord};

use crate::category::categorize_lowercase;
use crate::loader::load_records;

pub const BODY_WEIGHT: f64 = 0.1;
pub const TITLE_WEIGHT: f64 = 0.5;

struct Entry {
    record: Arc<ThreadRecord>,
    title: String,
    body: String,
}

/// Read-only corpus of harvested threads, built once and shared across
/// queries (`Arc<CorpusIndex>`; no interior mutability).
pub struct CorpusIndex {
    entries: Vec<Entry>,
    available: bool,
}

impl CorpusIndex {
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = ThreadRecord>,
    {
        let entries = records
            .into_iter()
            .map(|r| Entry {
                title: r.title.to_lowercase(),
                body: r.body.to_lowercase(),
                record: Arc::new(r),
            })
            .collect();
        Self { entries, available: true }
    }

    pub fn load(path: &Path) -> Result<Self> {
        Ok(Self::from_records(load_records(path)?))
    }

    /// Load the corpus, or report the failure once and fall back to an
    /// unavailable index whose searches return nothing.
    pub fn load_or_empty(path: &Path) -> Self {
        match Self::load(path) {
            Ok(index) => {
                if index.is_empty() {
                    warn!(path = %path.display(), "corpus loaded but contains no threads");
                }
                index
            }
            Err(e) => {
                error!(
                    path = %path.display(),
                    error = %e,
                    "corpus unavailable; searches will return no threads"
                );
                Self::unavailable()
            }
        }
    }

    pub fn unavailable() -> Self {
        Self { entries: Vec::new(), available: false }
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = &ThreadRecord> {
        self.entries.iter().map(|e| e.record.as_ref())
    }

    /// Lexical relevance search over successfully scraped threads.
    ///
    /// Each lowercase whitespace-delimited query term contributes
    /// `0.1 × occurrences in body + 0.5 × occurrences in title`. Threads
    /// scoring zero are dropped; the rest are ordered by descending score,
    /// ties keeping corpus order, and cut to `max_results`.
    pub fn search(&self, query: &str, max_results: usize) -> Result<Vec<RelevanceHit>> {
        if max_results == 0 {
            return Err(Error::InvalidArgument("max_results must be greater than 0".to_string()));
        }
        let query = query.to_lowercase();
        let terms: Vec<&str> = query.split_whitespace().collect();
        if terms.is_empty() || !self.available {
            return Ok(Vec::new());
        }

        let mut hits: Vec<RelevanceHit> = self
            .entries
            .iter()
            .filter(|e| e.record.success)
            .filter_map(|e| {
                let score = lexical_score(&terms, &e.title, &e.body);
                (score > 0.0).then(|| RelevanceHit {
                    thread: Arc::clone(&e.record),
                    score,
                    category: categorize_lowercase(&e.body).to_string(),
                })
            })
            .collect();
        // `sort_by` is stable: equal scores keep corpus order
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        hits.truncate(max_results);
        Ok(hits)
    }
}

/// Score already-lowercased text against lowercase terms. Occurrences are
/// non-overlapping substring matches.
pub fn lexical_score(terms: &[&str], title: &str, body: &str) -> f64 {
    terms
        .iter()
        .map(|term| {
            BODY_WEIGHT * body.matches(*term).count() as f64
                + TITLE_WEIGHT * title.matches(*term).count() as f64
        })
        .sum()
}
