//! Search index for fast substring matching.
//!
//! This module provides an inverted n-gram index so that substring search
//! only verifies candidate nodes instead of scanning every id and label.

use std::collections::{HashMap, HashSet};

/// Position of a node within its document.
pub type NodePos = usize;

/// Minimum n-gram length for indexing.
const MIN_NGRAM_LEN: usize = 2;

/// Maximum n-gram length for indexing.
const MAX_NGRAM_LEN: usize = 4;

/// An inverted index for case-insensitive substring search.
///
/// Every name is broken into overlapping n-grams. A query's n-grams are
/// intersected to find candidates, which are then checked for a real
/// substring match.
#[derive(Debug, Default, Clone)]
pub struct SearchIndex {
    /// Lowercased names registered for each node.
    names: HashMap<NodePos, Vec<String>>,
    /// Maps lowercased n-grams to nodes.
    ngram_index: HashMap<String, HashSet<NodePos>>,
}

impl SearchIndex {
    /// Creates a new empty search index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `name` as searchable text for `pos`.
    pub fn insert(&mut self, name: &str, pos: NodePos) {
        let lower = name.to_lowercase();

        for ngram in generate_ngrams(&lower) {
            self.ngram_index.entry(ngram).or_default().insert(pos);
        }
        self.names.entry(pos).or_default().push(lower);
    }

    /// Returns nodes with a name containing `query`, ignoring case, in
    /// ascending position order. An empty query matches every node.
    pub fn search(&self, query: &str) -> Vec<NodePos> {
        let query_lower = query.to_lowercase();

        let candidates: HashSet<NodePos> = if query_lower.chars().count() < MIN_NGRAM_LEN {
            // Too short to have n-grams; every node is a candidate.
            self.names.keys().copied().collect()
        } else {
            let mut candidates: Option<HashSet<NodePos>> = None;
            for ngram in generate_ngrams(&query_lower) {
                let Some(positions) = self.ngram_index.get(&ngram) else {
                    // If any n-gram has no matches, the query has no results
                    return Vec::new();
                };
                match &mut candidates {
                    None => candidates = Some(positions.clone()),
                    Some(c) => c.retain(|pos| positions.contains(pos)),
                }
            }
            candidates.unwrap_or_default()
        };

        // n-gram intersection can have false positives
        let mut results: Vec<NodePos> = candidates
            .into_iter()
            .filter(|pos| {
                self.names
                    .get(pos)
                    .map(|names| names.iter().any(|name| name.contains(&query_lower)))
                    .unwrap_or(false)
            })
            .collect();

        results.sort_unstable();
        results
    }

    /// Returns the number of indexed nodes.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Generates n-grams for a lowercased string.
fn generate_ngrams(s: &str) -> Vec<String> {
    let chars: Vec<char> = s.chars().collect();
    let mut ngrams = Vec::new();

    for n in MIN_NGRAM_LEN..=MAX_NGRAM_LEN {
        if chars.len() >= n {
            for i in 0..=(chars.len() - n) {
                ngrams.push(chars[i..i + n].iter().collect());
            }
        }
    }

    ngrams
}
