//! Canonical classification types and the remote-classifier contract
//!
//! The remote detection service is not uniform across deployments: some
//! return a numeric class index, some a named category, some omit the
//! probability map entirely. Everything downstream of this module only ever
//! sees the canonical [`ClassificationResult`], produced by `normalize`.

mod client;
mod normalize;

pub use client::HttpClassifier;
pub use normalize::normalize_raw;

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::platform::Platform;

/// Comment category assigned by the detection model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Clean,
    Offensive,
    Hate,
    Spam,
    /// Response named a class this client does not know
    Unknown,
}

impl Category {
    /// Index table used by deployments that return a numeric class
    pub const INDEX_TABLE: [Category; 4] = [
        Category::Clean,
        Category::Offensive,
        Category::Hate,
        Category::Spam,
    ];

    /// Resolve a numeric class index from the fixed table
    pub fn from_index(index: u64) -> Option<Category> {
        Self::INDEX_TABLE.get(index as usize).copied()
    }

    /// Resolve a named class, tolerating the aliases seen in the wild
    pub fn from_name(name: &str) -> Option<Category> {
        match name.trim().to_ascii_lowercase().as_str() {
            "clean" | "normal" => Some(Category::Clean),
            "offensive" => Some(Category::Offensive),
            "hate" | "hate_speech" => Some(Category::Hate),
            "spam" => Some(Category::Spam),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Clean => "clean",
            Category::Offensive => "offensive",
            Category::Hate => "hate",
            Category::Spam => "spam",
            Category::Unknown => "unknown",
        }
    }
}

/// Per-category scores; synthesized results only approximate a distribution
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CategoryScores {
    pub clean: f32,
    pub offensive: f32,
    pub hate: f32,
    pub spam: f32,
}

impl CategoryScores {
    pub fn get(&self, category: Category) -> f32 {
        match category {
            Category::Clean => self.clean,
            Category::Offensive => self.offensive,
            Category::Hate => self.hate,
            Category::Spam => self.spam,
            Category::Unknown => 0.0,
        }
    }

    /// Approximate a distribution when the service returned only a
    /// confidence: the named category gets `confidence`, the remainder is
    /// spread evenly over the other three classes.
    pub fn one_hot_ish(category: Category, confidence: f32) -> Self {
        let confidence = confidence.clamp(0.0, 1.0);
        let rest = (1.0 - confidence) / 3.0;
        let mut scores = Self {
            clean: rest,
            offensive: rest,
            hate: rest,
            spam: rest,
        };
        match category {
            Category::Clean => scores.clean = confidence,
            Category::Offensive => scores.offensive = confidence,
            Category::Hate => scores.hate = confidence,
            Category::Spam => scores.spam = confidence,
            // Nothing to pin the confidence to; leave the even spread
            Category::Unknown => {}
        }
        scores
    }

    /// Highest-scored category and its score
    pub fn dominant(&self) -> (Category, f32) {
        let mut best = (Category::Clean, self.clean);
        for category in [Category::Offensive, Category::Hate, Category::Spam] {
            let score = self.get(category);
            if score > best.1 {
                best = (category, score);
            }
        }
        best
    }
}

/// Canonical classification outcome; immutable once created
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub category: Category,
    /// Model confidence in `category`, clamped to [0, 1]
    pub confidence: f32,
    /// Need not sum exactly to 1 (see [`CategoryScores::one_hot_ish`])
    pub probabilities: CategoryScores,
    /// Flagged keywords, in the order the service reported them
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// One classification request for the remote detector
#[derive(Debug, Clone, Serialize)]
pub struct ClassifyRequest {
    pub text: String,
    pub platform: Platform,
    /// Platform-native comment id, when the page exposed one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl ClassifyRequest {
    pub fn new(text: impl Into<String>, platform: Platform) -> Self {
        Self {
            text: text.into(),
            platform,
            platform_id: None,
            metadata: None,
        }
    }
}

/// Failure taxonomy for the remote classifier
///
/// Responses that parse as JSON but match none of the known shapes are
/// reported as `Malformed` and count as server-kind failures.
#[derive(Error, Debug)]
pub enum ClassificationError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("authentication rejected: {0}")]
    Auth(String),

    #[error("server error (status {status}): {message}")]
    Server { status: u16, message: String },

    #[error("unrecognized response shape: {0}")]
    Malformed(String),
}

impl ClassificationError {
    /// Stable kind label used for error markers and logs
    pub fn kind(&self) -> &'static str {
        match self {
            ClassificationError::Network(_) => "network",
            ClassificationError::Timeout(_) => "timeout",
            ClassificationError::Auth(_) => "auth",
            ClassificationError::Server { .. } | ClassificationError::Malformed(_) => "server",
        }
    }
}

/// Classifier contract, kept narrow so pipelines can run against mock
/// backends in tests and against [`HttpClassifier`] in production
pub trait Classifier: Send + Sync {
    fn classify(
        &self,
        request: ClassifyRequest,
    ) -> impl Future<Output = std::result::Result<ClassificationResult, ClassificationError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_index_table() {
        assert_eq!(Category::from_index(0), Some(Category::Clean));
        assert_eq!(Category::from_index(1), Some(Category::Offensive));
        assert_eq!(Category::from_index(2), Some(Category::Hate));
        assert_eq!(Category::from_index(3), Some(Category::Spam));
        assert_eq!(Category::from_index(4), None);
    }

    #[test]
    fn test_category_names() {
        assert_eq!(Category::from_name("hate"), Some(Category::Hate));
        assert_eq!(Category::from_name(" Clean "), Some(Category::Clean));
        assert_eq!(Category::from_name("normal"), Some(Category::Clean));
        assert_eq!(Category::from_name("hate_speech"), Some(Category::Hate));
        assert_eq!(Category::from_name("toxic"), None);
    }

    #[test]
    fn test_one_hot_ish_pins_confidence() {
        let scores = CategoryScores::one_hot_ish(Category::Hate, 0.91);
        assert!((scores.hate - 0.91).abs() < f32::EPSILON);
        assert!(scores.clean < 0.05);
        assert_eq!(scores.dominant().0, Category::Hate);
    }

    #[test]
    fn test_one_hot_ish_clamps() {
        let scores = CategoryScores::one_hot_ish(Category::Spam, 1.5);
        assert!((scores.spam - 1.0).abs() < f32::EPSILON);
        assert_eq!(scores.clean, 0.0);
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            ClassificationError::Network("reset".into()).kind(),
            "network"
        );
        assert_eq!(
            ClassificationError::Timeout(Duration::from_secs(20)).kind(),
            "timeout"
        );
        assert_eq!(ClassificationError::Auth("401".into()).kind(), "auth");
        assert_eq!(
            ClassificationError::Server {
                status: 500,
                message: "boom".into()
            }
            .kind(),
            "server"
        );
        assert_eq!(
            ClassificationError::Malformed("not json".into()).kind(),
            "server"
        );
    }
}
