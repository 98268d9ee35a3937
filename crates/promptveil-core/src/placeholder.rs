//! Reversible placeholder bookkeeping
//!
//! A placeholder is the literal string `[[CATEGORY_N]]` where CATEGORY
//! matches `[A-Z][A-Z0-9_]*` and N is the 1-based per-category sequence
//! number, decimal with no padding. The `[[...]]` framing is part of the
//! wire contract: response unmasking and the stream transformer both key
//! off it. Changing the format is a breaking change.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

/// Matches the placeholder wire grammar.
pub static PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\[[A-Z][A-Z0-9_]*_[0-9]+\]\]").expect("placeholder grammar"));

/// Per-request bijection between original substrings and placeholder
/// tokens, plus per-category counters.
///
/// The forward and reverse maps are exact inverses at all times. Nothing
/// here survives the request; a fresh context is created before extraction
/// and dropped once the response has been fully emitted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaceholderContext {
    /// placeholder token -> original substring
    forward: HashMap<String, String>,
    /// original substring -> placeholder token
    reverse: HashMap<String, String>,
    /// category -> last issued sequence number
    counters: HashMap<String, u32>,
}

impl PlaceholderContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a placeholder for `original` in `category`.
    ///
    /// Idempotent: if the original was already allocated a token (in any
    /// category), that token is returned and no counter moves.
    pub fn allocate(&mut self, category: &str, original: &str) -> String {
        if let Some(token) = self.reverse.get(original) {
            return token.clone();
        }

        let counter = self.counters.entry(category.to_string()).or_insert(0);
        *counter += 1;
        let token = format!("[[{}_{}]]", category, counter);

        self.forward.insert(token.clone(), original.to_string());
        self.reverse.insert(original.to_string(), token.clone());
        token
    }

    /// Resolve a placeholder token back to its original substring.
    pub fn lookup(&self, token: &str) -> Option<&str> {
        self.forward.get(token).map(String::as_str)
    }

    /// Token previously issued for an original substring, if any.
    pub fn token_for(&self, original: &str) -> Option<&str> {
        self.reverse.get(original).map(String::as_str)
    }

    /// Union another context into this one.
    ///
    /// On conflict the existing mapping wins; a pair is only adopted when
    /// neither its token nor its original is already mapped, so the two
    /// maps stay exact inverses. Counters advance to the maximum.
    pub fn merge(&mut self, other: PlaceholderContext) {
        for (token, original) in other.forward {
            if !self.forward.contains_key(&token) && !self.reverse.contains_key(&original) {
                self.reverse.insert(original.clone(), token.clone());
                self.forward.insert(token, original);
            }
        }
        for (category, issued) in other.counters {
            let counter = self.counters.entry(category).or_insert(0);
            *counter = (*counter).max(issued);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    /// Iterate (token, original) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.forward.iter().map(|(t, o)| (t.as_str(), o.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_formats_token() {
        let mut context = PlaceholderContext::new();
        assert_eq!(context.allocate("PERSON", "Dr. Sarah Chen"), "[[PERSON_1]]");
        assert_eq!(
            context.allocate("EMAIL_ADDRESS", "sarah@hospital.org"),
            "[[EMAIL_ADDRESS_1]]"
        );
        assert_eq!(context.allocate("PERSON", "Bob"), "[[PERSON_2]]");
    }

    #[test]
    fn test_allocate_is_idempotent() {
        let mut context = PlaceholderContext::new();
        let first = context.allocate("PERSON", "Bob");
        let second = context.allocate("PERSON", "Bob");
        assert_eq!(first, second);
        assert_eq!(first, "[[PERSON_1]]");
        // Counter did not move: the next distinct original gets 2
        assert_eq!(context.allocate("PERSON", "Alice"), "[[PERSON_2]]");
    }

    #[test]
    fn test_bijection() {
        let mut context = PlaceholderContext::new();
        let token = context.allocate("EMAIL_ADDRESS", "sarah@hospital.org");
        assert_eq!(context.lookup(&token), Some("sarah@hospital.org"));
        assert_eq!(context.token_for("sarah@hospital.org"), Some(token.as_str()));
        assert_eq!(context.lookup("[[EMAIL_ADDRESS_99]]"), None);
    }

    #[test]
    fn test_counters_are_gapless() {
        let mut context = PlaceholderContext::new();
        for (i, name) in ["a", "b", "c", "a", "d"].iter().enumerate() {
            let token = context.allocate("PERSON", name);
            let expected = match i {
                3 => "[[PERSON_1]]".to_string(), // repeat of "a"
                4 => "[[PERSON_4]]".to_string(),
                n => format!("[[PERSON_{}]]", n + 1),
            };
            assert_eq!(token, expected);
        }
    }

    #[test]
    fn test_merge_existing_wins() {
        let mut left = PlaceholderContext::new();
        left.allocate("PERSON", "Bob");

        let mut right = PlaceholderContext::new();
        right.allocate("PERSON", "Bob"); // conflicting token [[PERSON_1]]
        right.allocate("PERSON", "Alice");
        right.allocate("EMAIL_ADDRESS", "a@b.c");

        left.merge(right);

        assert_eq!(left.lookup("[[PERSON_1]]"), Some("Bob"));
        assert_eq!(left.lookup("[[PERSON_2]]"), Some("Alice"));
        assert_eq!(left.lookup("[[EMAIL_ADDRESS_1]]"), Some("a@b.c"));
        // Counters advanced to the max of both sides
        assert_eq!(left.allocate("PERSON", "Carol"), "[[PERSON_3]]");
    }

    #[test]
    fn test_grammar_matches_issued_tokens() {
        let mut context = PlaceholderContext::new();
        let token = context.allocate("US_SSN_2", "123-45-6789");
        assert!(PLACEHOLDER_RE.is_match(&token));
        assert!(!PLACEHOLDER_RE.is_match("[[lowercase_1]]"));
        assert!(!PLACEHOLDER_RE.is_match("[PERSON_1]"));
        assert!(!PLACEHOLDER_RE.is_match("[[PERSON_]]"));
    }
}
