//! Per-category counters over classification events
//!
//! The pipeline only emits `ClassifiedComment` events; this collector is
//! the simple-arithmetic subscriber a popup or report view reads from.

use serde::Serialize;

use crate::classify::Category;
use crate::pipeline::ClassifiedComment;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CategoryCounts {
    pub clean: u64,
    pub offensive: u64,
    pub hate: u64,
    pub spam: u64,
    pub unknown: u64,
}

impl CategoryCounts {
    pub fn total(&self) -> u64 {
        self.clean + self.offensive + self.hate + self.spam + self.unknown
    }

    /// Comments in a category other than clean or unknown
    pub fn flagged(&self) -> u64 {
        self.offensive + self.hate + self.spam
    }
}

#[derive(Debug, Default)]
pub struct StatsCollector {
    counts: CategoryCounts,
}

impl StatsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, event: &ClassifiedComment) {
        self.record_result(&event.result);
    }

    pub fn record_result(&mut self, result: &crate::classify::ClassificationResult) {
        match result.category {
            Category::Clean => self.counts.clean += 1,
            Category::Offensive => self.counts.offensive += 1,
            Category::Hate => self.counts.hate += 1,
            Category::Spam => self.counts.spam += 1,
            Category::Unknown => self.counts.unknown += 1,
        }
    }

    pub fn counts(&self) -> CategoryCounts {
        self.counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use crate::classify::{CategoryScores, ClassificationResult};
    use crate::platform::Platform;

    fn event(category: Category) -> ClassifiedComment {
        ClassifiedComment {
            identity: "native:1".to_string(),
            text: "text".to_string(),
            platform: Platform::Facebook,
            result: ClassificationResult {
                category,
                confidence: 0.8,
                probabilities: CategoryScores::one_hot_ish(category, 0.8),
                keywords: vec![],
            },
            observed_at: Utc::now(),
        }
    }

    #[test]
    fn test_counts_by_category() {
        let mut stats = StatsCollector::new();
        stats.record(&event(Category::Clean));
        stats.record(&event(Category::Hate));
        stats.record(&event(Category::Hate));
        stats.record(&event(Category::Spam));

        let counts = stats.counts();
        assert_eq!(counts.clean, 1);
        assert_eq!(counts.hate, 2);
        assert_eq!(counts.total(), 4);
        assert_eq!(counts.flagged(), 3);
    }
}
