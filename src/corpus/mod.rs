//! Fact corpus data model.
//!
//! A [`Corpus`] is an ordered, immutable collection of [`Fact`]s built once
//! per process. Ids are assigned at construction as `1 + position` in source
//! order and never change; the category index is derived deterministically
//! from the facts. Nothing in this crate mutates a corpus after it is built.

mod loader;

pub use loader::{CorpusError, CorpusSource, CorpusStore};

use serde::{Deserialize, Serialize};

// ── Records ───────────────────────────────────────────────────────────────────

/// A fact as it arrives from a source — no id yet.
#[derive(Debug, Clone, Deserialize)]
pub struct RawFact {
    pub text: String,
    pub category: String,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub source_file: Option<String>,
}

/// An immutable fact record with its stable, sequential identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fact {
    pub id: u32,
    pub text: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
}

// ── Corpus ────────────────────────────────────────────────────────────────────

/// The loaded corpus: all facts in source order plus the derived category
/// index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Corpus {
    facts: Vec<Fact>,
    categories: Vec<String>,
}

impl Corpus {
    /// Build a corpus from raw records, assigning `id = position + 1`.
    ///
    /// The category index collects *distinct* category strings under exact
    /// (case-sensitive) equality and sorts them ascending by byte order, so
    /// `"Physics"` and `"physics"` are two entries. Lookup via
    /// [`crate::engine::by_category`] is case-insensitive — the asymmetry is
    /// intentional and kept for compatibility.
    pub fn from_records(records: Vec<RawFact>) -> Self {
        let facts: Vec<Fact> = records
            .into_iter()
            .enumerate()
            .map(|(i, r)| Fact {
                id: (i + 1) as u32,
                text: r.text,
                category: r.category,
                source_url: r.source_url,
                source_file: r.source_file,
            })
            .collect();

        let mut categories: Vec<String> = facts.iter().map(|f| f.category.clone()).collect();
        categories.sort();
        categories.dedup();

        Self { facts, categories }
    }

    pub fn facts(&self) -> &[Fact] {
        &self.facts
    }

    /// The derived category index, sorted ascending.
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }
}

// ── test fixtures ─────────────────────────────────────────────────────────────

#[cfg(test)]
pub(crate) fn record(text: &str, category: &str) -> RawFact {
    RawFact {
        text: text.to_string(),
        category: category.to_string(),
        source_url: None,
        source_file: None,
    }
}

/// Five-fact corpus exercising the category case quirk: two `"Physics"`,
/// one `"Chemistry"`, one `"physics"`, one `"Biology"` (ids 1–5).
#[cfg(test)]
pub(crate) fn fixture() -> Corpus {
    Corpus::from_records(vec![
        record("A single photon can interfere with itself.", "Physics"),
        record("Sound travels faster in water than in air.", "Physics"),
        record("Helium was found in the Sun before Earth.", "Chemistry"),
        record("Quantum tunnelling lets particles cross barriers.", "physics"),
        record("An octopus has three hearts.", "Biology"),
    ])
}
