use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

const BUNDLED_CORPUS: &str = include_str!("../../../data/faq.json");

/// Minimum share of query tokens that must match a question in the fuzzy pass.
pub const FUZZY_MATCH_THRESHOLD: f32 = 0.7;

#[derive(Debug, Clone, Deserialize)]
pub struct FaqCategory {
    pub category: String,
    pub entries: Vec<FaqQuestion>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FaqQuestion {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone)]
pub struct FaqEntry {
    pub category: String,
    pub question: String,
    pub answer: String,
    normalized: String,
    tokens: Vec<String>,
}

impl FaqEntry {
    fn new(category: &str, qa: FaqQuestion) -> Self {
        let normalized = normalize(&qa.question);
        let tokens = tokenize(&normalized);
        Self {
            category: category.to_string(),
            question: qa.question,
            answer: qa.answer,
            normalized,
            tokens,
        }
    }

    /// Share of query tokens that are a substring of, or contain, some question token.
    fn fuzzy_score(&self, query_tokens: &[String]) -> f32 {
        if query_tokens.is_empty() {
            return 0.0;
        }

        let matching = query_tokens
            .iter()
            .filter(|word| {
                self.tokens
                    .iter()
                    .any(|q_word| q_word.contains(word.as_str()) || word.contains(q_word.as_str()))
            })
            .count();

        matching as f32 / query_tokens.len() as f32
    }
}

/// Cheap lexical FAQ lookup used to short-circuit canonical questions
/// before any retrieval or completion call.
#[derive(Debug, Clone)]
pub struct FaqMatcher {
    entries: Vec<FaqEntry>,
}

impl FaqMatcher {
    pub fn new(categories: Vec<FaqCategory>) -> Self {
        let entries: Vec<FaqEntry> = categories
            .into_iter()
            .flat_map(|category| {
                let name = category.category;
                category
                    .entries
                    .into_iter()
                    .map(move |qa| FaqEntry::new(&name, qa))
                    .collect::<Vec<_>>()
            })
            .collect();

        info!("FAQ corpus loaded: {} entries", entries.len());
        Self { entries }
    }

    pub fn bundled() -> Result<Self> {
        Self::from_json(BUNDLED_CORPUS).context("Bundled FAQ corpus is invalid")
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let categories: Vec<FaqCategory> = serde_json::from_str(json)?;
        Ok(Self::new(categories))
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read FAQ corpus {}", path.display()))?;
        Self::from_json(&json)
            .with_context(|| format!("Failed to parse FAQ corpus {}", path.display()))
    }

    /// Load the configured corpus, or the bundled one when no path is set.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_path(path),
            None => Self::bundled(),
        }
    }

    pub fn entries(&self) -> &[FaqEntry] {
        &self.entries
    }

    pub fn find_match(&self, query: &str) -> Option<&str> {
        let normalized = normalize(query);
        if normalized.is_empty() {
            return None;
        }

        // Exact pass: first question in corpus order wins
        if let Some(entry) = self.entries.iter().find(|e| e.normalized == normalized) {
            debug!("FAQ exact match: {}", entry.question);
            return Some(&entry.answer);
        }

        // Fuzzy pass: highest score wins, ties go to the earliest entry
        let query_tokens = tokenize(&normalized);
        let mut best: Option<(&FaqEntry, f32)> = None;

        for entry in &self.entries {
            let score = entry.fuzzy_score(&query_tokens);
            if score < FUZZY_MATCH_THRESHOLD {
                continue;
            }
            if best.map_or(true, |(_, best_score)| score > best_score) {
                best = Some((entry, score));
            }
        }

        best.map(|(entry, score)| {
            debug!("FAQ fuzzy match ({:.2}): {}", score, entry.question);
            entry.answer.as_str()
        })
    }
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

fn tokenize(normalized: &str) -> Vec<String> {
    normalized.split_whitespace().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRACKING_ANSWER: &str =
        "You can track your order anytime at https://printo.in/track-order using your order ID and email.";

    fn small_corpus() -> FaqMatcher {
        FaqMatcher::from_json(
            r#"[
                {"category": "Shipping", "entries": [
                    {"question": "How long does shipping take?", "answer": "3-7 days"},
                    {"question": "Do you ship abroad?", "answer": "No"}
                ]},
                {"category": "Returns", "entries": [
                    {"question": "What is your return policy?", "answer": "Defects only"},
                    {"question": "How long does shipping take?", "answer": "duplicate"}
                ]}
            ]"#,
        )
        .unwrap()
    }

    #[test]
    fn test_bundled_corpus_loads() {
        let matcher = FaqMatcher::bundled().unwrap();
        assert_eq!(matcher.entries().len(), 22);
        assert_eq!(matcher.entries()[0].category, "Order Management");
    }

    #[test]
    fn test_exact_match_is_case_and_whitespace_insensitive() {
        let matcher = FaqMatcher::bundled().unwrap();
        assert_eq!(matcher.find_match("How can I track my order?"), Some(TRACKING_ANSWER));
        assert_eq!(matcher.find_match("  HOW CAN I TRACK MY ORDER?  "), Some(TRACKING_ANSWER));
    }

    #[test]
    fn test_exact_match_first_in_corpus_order() {
        let matcher = small_corpus();
        assert_eq!(matcher.find_match("how long does shipping take?"), Some("3-7 days"));
    }

    #[test]
    fn test_fuzzy_match_above_threshold() {
        let matcher = small_corpus();
        // "return" ⊂ "return", "policy" ⊂ "policy?", "your" ⊂ "your": 3/3
        assert_eq!(matcher.find_match("your return policy"), Some("Defects only"));
        // 3 of 4 tokens match (0.75)
        assert_eq!(matcher.find_match("shipping take long tomorrow"), Some("3-7 days"));
    }

    #[test]
    fn test_fuzzy_match_below_threshold() {
        let matcher = small_corpus();
        // 2 of 3 tokens match (0.67)
        assert_eq!(matcher.find_match("shipping take tomorrow"), None);
        assert_eq!(matcher.find_match("quantum physics"), None);
    }

    #[test]
    fn test_fuzzy_token_containment_both_directions() {
        let matcher = small_corpus();
        // "ship" is contained in "shipping"; "abroad?" contains "abroad"
        assert_eq!(matcher.find_match("ship abroad"), Some("No"));
    }

    #[test]
    fn test_blank_query_matches_nothing() {
        let matcher = small_corpus();
        assert_eq!(matcher.find_match("   "), None);
    }

    #[test]
    fn test_load_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("faq.json");
        std::fs::write(
            &path,
            r#"[{"category": "Misc", "entries": [{"question": "Ping?", "answer": "Pong"}]}]"#,
        )
        .unwrap();

        let matcher = FaqMatcher::load(Some(&path)).unwrap();
        assert_eq!(matcher.find_match("ping?"), Some("Pong"));
        assert!(FaqMatcher::load(Some(&dir.path().join("missing.json"))).is_err());
    }
}
