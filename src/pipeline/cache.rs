//! Classification result cache keyed by normalized comment text
//!
//! Keyed by text rather than identity: the same sentence pasted under two
//! different posts must not cost two network calls. Unbounded; the page
//! lifetime bounds it naturally.

use std::sync::OnceLock;

use ahash::{HashMap, HashMapExt};
use regex::Regex;

use crate::classify::ClassificationResult;

static WHITESPACE: OnceLock<Regex> = OnceLock::new();

/// Cache key normalization: trim and collapse internal whitespace runs.
/// Case is preserved since the detector is case-sensitive.
pub fn normalize_text(text: &str) -> String {
    let ws = WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("static regex"));
    ws.replace_all(text.trim(), " ").into_owned()
}

#[derive(Debug, Default)]
pub struct ResultCache {
    entries: HashMap<String, ClassificationResult>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn get(&self, text: &str) -> Option<&ClassificationResult> {
        self.entries.get(&normalize_text(text))
    }

    pub fn put(&mut self, text: &str, result: ClassificationResult) {
        self.entries.insert(normalize_text(text), result);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
