//! Query engine — the read operations over a loaded [`Corpus`].
//!
//! Every operation is a pure function of `(&Corpus, parameters)`: no I/O, no
//! mutation, no suspension. Transport layers (HTTP routes, chat commands)
//! parse external input into the typed parameters here and render the typed
//! results; the engine owns validation, clamping, and tie-break rules.

use rand::Rng;
use serde::Serialize;
use thiserror::Error;

use crate::corpus::{Corpus, Fact};

/// Hard cap on a single page.
pub const MAX_PAGE_LIMIT: i64 = 1000;
/// Default page size when the caller omits `limit`.
pub const DEFAULT_PAGE_LIMIT: i64 = 100;
/// Hard cap on a random sample.
pub const MAX_SAMPLE_COUNT: i64 = 100;

/// Count of distinct source files behind the bundled data. [`stats`]
/// reports this as-is rather than computing it from the records; keep in
/// step with `data/facts.json` when the source collections change.
pub const UNIQUE_SOURCES: usize = 3;

// ── Errors ────────────────────────────────────────────────────────────────────

/// Tagged error taxonomy for the query operations.
///
/// Display strings double as the transport-facing error messages, so they
/// are part of the API surface.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// `search_text` called without a query.
    #[error("Missing 'q' parameter")]
    MissingQuery,

    /// The id did not parse as an integer.
    #[error("Invalid ID")]
    InvalidId,

    /// No fact carries this id.
    #[error("Fact {0} not found")]
    FactNotFound(i64),

    /// No fact carries this category (case-insensitively).
    #[error("Category '{0}' not found")]
    CategoryNotFound(String),
}

impl QueryError {
    /// Whether this is a validation failure (caller input malformed) rather
    /// than a lookup miss.
    pub fn is_validation(&self) -> bool {
        matches!(self, QueryError::MissingQuery | QueryError::InvalidId)
    }
}

// ── Result shapes ─────────────────────────────────────────────────────────────

/// One page of facts plus pagination metadata.
#[derive(Debug, Serialize)]
pub struct Page {
    pub data: Vec<Fact>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct Pagination {
    pub total: usize,
    /// The effective (clamped) limit.
    pub limit: i64,
    /// The offset as requested.
    pub offset: i64,
    #[serde(rename = "hasMore")]
    pub has_more: bool,
}

/// A random draw: a lone fact when exactly one was requested, otherwise an
/// array in draw order.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Sample {
    One(Fact),
    Many(Vec<Fact>),
}

#[derive(Debug, Serialize)]
pub struct SearchResults {
    pub data: Vec<Fact>,
    pub count: usize,
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct CategoryList {
    pub data: Vec<String>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct CategoryFacts {
    pub data: Vec<Fact>,
    /// The category as the caller spelled it.
    pub category: String,
    pub count: usize,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct Stats {
    #[serde(rename = "totalFacts")]
    pub total_facts: usize,
    pub categories: usize,
    #[serde(rename = "uniqueSources")]
    pub unique_sources: usize,
}

// ── Operations ────────────────────────────────────────────────────────────────

/// Slice the corpus `[offset, offset + limit)` in id order.
///
/// `limit` defaults to 100 and is clamped to at most 1000; there is no lower
/// bound, so a zero or negative limit yields an empty page. An out-of-range
/// offset yields an empty page, never an error. `has_more` is the signed
/// comparison `offset + limit < total`.
pub fn list_page(corpus: &Corpus, limit: Option<i64>, offset: Option<i64>) -> Page {
    let limit = limit.unwrap_or(DEFAULT_PAGE_LIMIT).min(MAX_PAGE_LIMIT);
    let offset = offset.unwrap_or(0);
    let total = corpus.len();

    let start = offset.clamp(0, total as i64) as usize;
    let end = offset
        .saturating_add(limit)
        .clamp(start as i64, total as i64) as usize;

    Page {
        data: corpus.facts()[start..end].to_vec(),
        pagination: Pagination {
            total,
            limit,
            offset,
            has_more: offset.saturating_add(limit) < total as i64,
        },
    }
}

/// Draw `count` distinct facts uniformly at random, in draw order.
///
/// `count` defaults to 1 and is clamped to at most 100; a request at or
/// above corpus size saturates and returns every fact exactly once. The
/// draw is rejection sampling: uniform indices, duplicates discarded —
/// quadratic in the saturating worst case, which is fine at these caps.
pub fn random_sample(corpus: &Corpus, count: Option<i64>) -> Sample {
    let requested = count.unwrap_or(1).min(MAX_SAMPLE_COUNT);
    let target = requested.max(0).min(corpus.len() as i64) as usize;

    let mut rng = rand::thread_rng();
    let mut chosen: Vec<usize> = Vec::with_capacity(target);
    while chosen.len() < target {
        let idx = rng.gen_range(0..corpus.len());
        if !chosen.contains(&idx) {
            chosen.push(idx);
        }
    }

    let mut drawn: Vec<Fact> = chosen.into_iter().map(|i| corpus.facts()[i].clone()).collect();
    if requested == 1 {
        match drawn.pop() {
            Some(fact) => Sample::One(fact),
            None => Sample::Many(Vec::new()),
        }
    } else {
        Sample::Many(drawn)
    }
}

/// Case-insensitive substring search over fact *text* only — categories are
/// never searched. Matches keep corpus order.
pub fn search_text(corpus: &Corpus, q: Option<&str>) -> Result<SearchResults, QueryError> {
    let query = match q {
        Some(s) if !s.is_empty() => s,
        _ => return Err(QueryError::MissingQuery),
    };

    let needle = query.to_lowercase();
    let data: Vec<Fact> = corpus
        .facts()
        .iter()
        .filter(|f| f.text.to_lowercase().contains(&needle))
        .cloned()
        .collect();

    Ok(SearchResults {
        count: data.len(),
        data,
        query: query.to_string(),
    })
}

/// The precomputed category index.
pub fn list_categories(corpus: &Corpus) -> CategoryList {
    let data = corpus.categories().to_vec();
    CategoryList {
        count: data.len(),
        data,
    }
}

/// All facts whose category matches `name` case-insensitively, in corpus
/// order. Note the asymmetry with [`list_categories`], whose index is
/// case-sensitive: looking up `"PHYSICS"` finds facts filed under both
/// `"Physics"` and `"physics"`.
pub fn by_category(corpus: &Corpus, name: &str) -> Result<CategoryFacts, QueryError> {
    let needle = name.to_lowercase();
    let data: Vec<Fact> = corpus
        .facts()
        .iter()
        .filter(|f| f.category.to_lowercase() == needle)
        .cloned()
        .collect();

    if data.is_empty() {
        return Err(QueryError::CategoryNotFound(name.to_string()));
    }

    Ok(CategoryFacts {
        count: data.len(),
        data,
        category: name.to_string(),
    })
}

/// Look up a single fact by its id, given as the raw path segment.
///
/// Any integer parses — an id that merely matches nothing (zero, negative,
/// past the end) is a lookup miss, not a validation failure.
pub fn by_id(corpus: &Corpus, raw: &str) -> Result<Fact, QueryError> {
    let id: i64 = raw.parse().map_err(|_| QueryError::InvalidId)?;
    corpus
        .facts()
        .iter()
        .find(|f| i64::from(f.id) == id)
        .cloned()
        .ok_or(QueryError::FactNotFound(id))
}

/// Aggregate statistics. `unique_sources` is the frozen constant, not a
/// computed figure.
pub fn stats(corpus: &Corpus) -> Stats {
    Stats {
        total_facts: corpus.len(),
        categories: corpus.categories().len(),
        unique_sources: UNIQUE_SOURCES,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::{fixture, record, Corpus};

    // ── pagination ────────────────────────────────────────────────────────────

    #[test]
    fn page_defaults_cover_small_corpus() {
        let corpus = fixture();
        let page = list_page(&corpus, None, None);
        assert_eq!(page.data.len(), 5);
        assert_eq!(
            page.pagination,
            Pagination { total: 5, limit: 100, offset: 0, has_more: false }
        );
    }

    #[test]
    fn page_slices_in_id_order() {
        let corpus = fixture();
        let page = list_page(&corpus, Some(2), Some(2));
        let ids: Vec<u32> = page.data.iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![3, 4]);
        assert!(page.pagination.has_more, "2 + 2 = 4 < 5");
    }

    #[test]
    fn last_page_has_no_more() {
        let corpus = fixture();
        let page = list_page(&corpus, Some(2), Some(4));
        let ids: Vec<u32> = page.data.iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![5]);
        assert!(!page.pagination.has_more);
    }

    #[test]
    fn limit_clamps_to_max() {
        let corpus = fixture();
        let page = list_page(&corpus, Some(5000), None);
        assert_eq!(page.pagination.limit, MAX_PAGE_LIMIT);
        assert_eq!(page.data.len(), 5);
    }

    #[test]
    fn out_of_range_offset_yields_empty_page() {
        let corpus = fixture();
        let page = list_page(&corpus, Some(10), Some(99));
        assert!(page.data.is_empty());
        assert!(!page.pagination.has_more);
    }

    #[test]
    fn non_positive_limit_yields_empty_page() {
        // No lower bound on limit — zero and negative give empty pages.
        let corpus = fixture();
        assert!(list_page(&corpus, Some(0), Some(2)).data.is_empty());
        assert!(list_page(&corpus, Some(-3), Some(2)).data.is_empty());
    }

    // ── random sampling ───────────────────────────────────────────────────────

    #[test]
    fn single_draw_returns_one_fact() {
        let corpus = fixture();
        match random_sample(&corpus, None) {
            Sample::One(fact) => assert!((1..=5).contains(&fact.id)),
            Sample::Many(_) => panic!("count=1 must return a single fact"),
        }
    }

    #[test]
    fn sample_saturates_at_corpus_size() {
        let corpus = fixture();
        // Repeated draws at corpus size always return every id exactly once.
        for _ in 0..50 {
            let Sample::Many(facts) = random_sample(&corpus, Some(5)) else {
                panic!("count=5 must return an array");
            };
            let mut ids: Vec<u32> = facts.iter().map(|f| f.id).collect();
            ids.sort_unstable();
            assert_eq!(ids, vec![1, 2, 3, 4, 5]);
        }
    }

    #[test]
    fn sample_count_clamps_to_corpus_and_cap() {
        let corpus = fixture();
        let Sample::Many(facts) = random_sample(&corpus, Some(500)) else {
            panic!("expected array");
        };
        assert_eq!(facts.len(), 5, "clamped to min(500, 100, corpus size)");
    }

    #[test]
    fn sample_draws_are_distinct() {
        let corpus = fixture();
        for _ in 0..50 {
            let Sample::Many(facts) = random_sample(&corpus, Some(3)) else {
                panic!("expected array");
            };
            let mut ids: Vec<u32> = facts.iter().map(|f| f.id).collect();
            ids.sort_unstable();
            ids.dedup();
            assert_eq!(ids.len(), 3, "sampling is without replacement");
        }
    }

    #[test]
    fn zero_count_yields_empty_array() {
        let corpus = fixture();
        let Sample::Many(facts) = random_sample(&corpus, Some(0)) else {
            panic!("expected array");
        };
        assert!(facts.is_empty());
    }

    #[test]
    fn single_draws_are_roughly_uniform() {
        let records = (0..10)
            .map(|i| record(&format!("fact number {i}"), "General"))
            .collect();
        let corpus = Corpus::from_records(records);

        let mut counts = [0usize; 10];
        for _ in 0..2000 {
            let Sample::One(fact) = random_sample(&corpus, Some(1)) else {
                panic!("expected single fact");
            };
            counts[(fact.id - 1) as usize] += 1;
        }

        // Expected 200 per id; bounds are ~7 standard deviations out, so a
        // correct implementation effectively never trips this.
        for (i, &c) in counts.iter().enumerate() {
            assert!(
                (100..=300).contains(&c),
                "id {} drawn {c} times out of 2000 — not uniform",
                i + 1
            );
        }
    }

    // ── search ────────────────────────────────────────────────────────────────

    #[test]
    fn missing_query_is_rejected() {
        let corpus = fixture();
        assert_eq!(search_text(&corpus, None).unwrap_err(), QueryError::MissingQuery);
        assert_eq!(search_text(&corpus, Some("")).unwrap_err(), QueryError::MissingQuery);
        assert!(search_text(&corpus, None).unwrap_err().is_validation());
    }

    #[test]
    fn search_is_case_insensitive_on_text() {
        let corpus = fixture();
        let results = search_text(&corpus, Some("QUANTUM")).unwrap();
        assert_eq!(results.count, 1);
        assert_eq!(results.data[0].id, 4);
        assert_eq!(results.query, "QUANTUM");
    }

    #[test]
    fn search_never_matches_categories() {
        let corpus = fixture();
        // Three facts are filed under Physics/physics, but no fact *text*
        // contains the word.
        let results = search_text(&corpus, Some("physics")).unwrap();
        assert_eq!(results.count, 0);
    }

    #[test]
    fn search_preserves_corpus_order() {
        let corpus = fixture();
        let results = search_text(&corpus, Some("in")).unwrap();
        let ids: Vec<u32> = results.data.iter().map(|f| f.id).collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        assert_eq!(ids, sorted);
    }

    // ── categories ────────────────────────────────────────────────────────────

    #[test]
    fn category_index_matches_fixture() {
        let corpus = fixture();
        let list = list_categories(&corpus);
        assert_eq!(list.data, vec!["Biology", "Chemistry", "Physics", "physics"]);
        assert_eq!(list.count, 4);
    }

    #[test]
    fn category_lookup_is_case_insensitive() {
        let corpus = fixture();
        let result = by_category(&corpus, "PHYSICS").unwrap();
        let ids: Vec<u32> = result.data.iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![1, 2, 4], "both casings of the category match");
        assert_eq!(result.count, 3);
        assert_eq!(result.category, "PHYSICS", "caller's spelling is echoed");
    }

    #[test]
    fn unknown_category_is_not_found() {
        let corpus = fixture();
        let err = by_category(&corpus, "Astronomy").unwrap_err();
        assert_eq!(err, QueryError::CategoryNotFound("Astronomy".to_string()));
        assert_eq!(err.to_string(), "Category 'Astronomy' not found");
    }

    // ── by id ─────────────────────────────────────────────────────────────────

    #[test]
    fn id_lookup_finds_first_fact() {
        let corpus = fixture();
        let fact = by_id(&corpus, "1").unwrap();
        assert_eq!(fact.id, 1);
        assert_eq!(fact, corpus.facts()[0]);
    }

    #[test]
    fn absent_id_is_not_found() {
        let corpus = fixture();
        let err = by_id(&corpus, "6").unwrap_err();
        assert_eq!(err, QueryError::FactNotFound(6));
        assert_eq!(err.to_string(), "Fact 6 not found");
    }

    #[test]
    fn unparseable_id_is_invalid() {
        let corpus = fixture();
        for raw in ["x", "", "1.5", "1abc"] {
            assert_eq!(by_id(&corpus, raw).unwrap_err(), QueryError::InvalidId, "raw = {raw:?}");
        }
    }

    #[test]
    fn negative_id_parses_but_misses() {
        let corpus = fixture();
        let err = by_id(&corpus, "-1").unwrap_err();
        assert_eq!(err, QueryError::FactNotFound(-1));
        assert!(!err.is_validation());
    }

    // ── stats ─────────────────────────────────────────────────────────────────

    #[test]
    fn stats_counts_facts_and_categories() {
        let corpus = fixture();
        assert_eq!(
            stats(&corpus),
            Stats { total_facts: 5, categories: 4, unique_sources: UNIQUE_SOURCES }
        );
    }
}
