//! Chat command grammar and plain-text rendering.
//!
//! Every comms channel that speaks in messages (PTY console, Telegram) routes
//! user input through [`respond`]. Commands map 1:1 onto engine operations;
//! anything unrecognised falls back to a single random fact. Rendering is
//! deliberately plain text — channels only differ in how they deliver it.

use crate::corpus::{Corpus, CorpusStore, Fact};
use crate::engine::{self, Sample};
use crate::error::AppError;

/// Chat renders at most this many facts per list; the engine result itself
/// is not truncated.
const PREVIEW_LIMIT: usize = 5;

// ── Command grammar ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Random,
    Random5,
    Search(String),
    Categories,
    Category(String),
    Stats,
    /// Anything unrecognised — answered with one random fact.
    Fallback,
}

impl Command {
    pub fn parse(input: &str) -> Command {
        let input = input.trim();
        if !input.starts_with('/') {
            return Command::Fallback;
        }

        let (head, rest) = match input.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (input, ""),
        };

        match head {
            "/start" => Command::Start,
            "/random" => Command::Random,
            "/random5" => Command::Random5,
            "/search" => Command::Search(rest.to_string()),
            "/categories" => Command::Categories,
            "/category" => Command::Category(rest.to_string()),
            "/stats" => Command::Stats,
            _ => Command::Fallback,
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

/// Parse `input`, run the matching engine operation, render the reply.
///
/// Only a corpus load failure surfaces as `Err` — engine validation and
/// lookup errors render as user-facing text.
pub async fn respond(store: &CorpusStore, input: &str) -> Result<String, AppError> {
    let corpus = store.get().await?;
    Ok(execute(corpus, Command::parse(input)))
}

/// Run one command against a loaded corpus. Pure; exposed for tests.
pub fn execute(corpus: &Corpus, command: Command) -> String {
    match command {
        Command::Start => help_text(),
        Command::Random | Command::Fallback => render_sample(engine::random_sample(corpus, None)),
        Command::Random5 => render_sample(engine::random_sample(corpus, Some(5))),
        Command::Search(q) if q.is_empty() => "Usage: /search <text>".to_string(),
        Command::Search(q) => match engine::search_text(corpus, Some(&q)) {
            Ok(results) if results.count == 0 => format!("No facts matching '{q}'."),
            Ok(results) => render_fact_list(&results.data, &format!("matching '{q}'")),
            Err(e) => e.to_string(),
        },
        Command::Categories => {
            let list = engine::list_categories(corpus);
            let mut lines = vec![format!("{} categories:", list.count)];
            lines.extend(list.data.iter().map(|c| format!("• {}", pretty_category(c))));
            lines.join("\n")
        }
        Command::Category(name) if name.is_empty() => "Usage: /category <name>".to_string(),
        Command::Category(name) => match engine::by_category(corpus, &name) {
            Ok(result) => render_fact_list(&result.data, &format!("in {}", pretty_category(&result.category))),
            Err(e) => e.to_string(),
        },
        Command::Stats => {
            let stats = engine::stats(corpus);
            format!(
                "{} facts across {} categories ({} source collections).",
                stats.total_facts, stats.categories, stats.unique_sources
            )
        }
    }
}

// ── Rendering ─────────────────────────────────────────────────────────────────

fn help_text() -> String {
    [
        "Hi! I serve short facts from a fixed corpus.",
        "",
        "/random — one random fact",
        "/random5 — five random facts",
        "/search <text> — find facts by substring",
        "/categories — list all categories",
        "/category <name> — facts in one category",
        "/stats — corpus statistics",
        "",
        "Anything else gets you a random fact.",
    ]
    .join("\n")
}

/// Category labels use underscores as word separators by convention.
fn pretty_category(category: &str) -> String {
    category.replace('_', " ")
}

fn render_fact(fact: &Fact) -> String {
    format!("{}\n[{}] #{}", fact.text, pretty_category(&fact.category), fact.id)
}

fn render_sample(sample: Sample) -> String {
    match sample {
        Sample::One(fact) => render_fact(&fact),
        Sample::Many(facts) if facts.is_empty() => "The corpus is empty.".to_string(),
        Sample::Many(facts) => number_facts(&facts),
    }
}

fn number_facts(facts: &[Fact]) -> String {
    facts
        .iter()
        .enumerate()
        .map(|(i, f)| format!("{}. {} ({})", i + 1, f.text, pretty_category(&f.category)))
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_fact_list(facts: &[Fact], label: &str) -> String {
    let shown = &facts[..facts.len().min(PREVIEW_LIMIT)];
    let mut out = number_facts(shown);
    if facts.len() > shown.len() {
        out.push_str(&format!(
            "\nShowing {} of {} facts {label}.",
            shown.len(),
            facts.len()
        ));
    }
    out
}
