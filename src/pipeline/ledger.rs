//! Identity assignment and at-most-once submission tracking

use std::hash::{Hash, Hasher};

use ahash::{AHasher, HashSet, HashSetExt};

/// Derive the stable identity for a candidate comment
///
/// Prefers the platform-native id when the DOM exposes one; otherwise a
/// deterministic non-cryptographic hash of the text and the element's
/// approximate on-screen position. Collisions are an accepted risk.
pub fn identity_for(native: Option<&str>, text: &str, position: (u32, u32)) -> String {
    match native {
        Some(id) => format!("native:{id}"),
        None => {
            let mut hasher = AHasher::default();
            text.hash(&mut hasher);
            position.hash(&mut hasher);
            format!("hash:{:016x}", hasher.finish())
        }
    }
}

/// Tracks which identities were already submitted for classification
///
/// Grows monotonically for the lifetime of one pipeline instance; the only
/// bulk clear is constructing a fresh pipeline on page navigation.
#[derive(Debug, Default)]
pub struct DedupLedger {
    seen: HashSet<String>,
}

impl DedupLedger {
    pub fn new() -> Self {
        Self {
            seen: HashSet::new(),
        }
    }

    /// Record `identity` and report whether it is new. Returns `true`
    /// exactly once per identity for the lifetime of the ledger.
    pub fn should_process(&mut self, identity: &str) -> bool {
        if self.seen.contains(identity) {
            return false;
        }
        self.seen.insert(identity.to_string());
        true
    }

    /// Number of distinct identities recorded so far
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_true_exactly_once() {
        let mut ledger = DedupLedger::new();
        let identity = identity_for(None, "some comment", (3, 1));

        assert!(ledger.should_process(&identity));
        assert!(!ledger.should_process(&identity));
        assert!(!ledger.should_process(&identity));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_identity_stability() {
        let a = identity_for(None, "same text", (2, 5));
        let b = identity_for(None, "same text", (2, 5));
        assert_eq!(a, b);
    }

    #[test]
    fn test_identity_sensitivity() {
        let base = identity_for(None, "first comment text", (2, 5));
        assert_ne!(base, identity_for(None, "second comment text", (2, 5)));
        assert_ne!(base, identity_for(None, "first comment text", (2, 6)));
    }

    #[test]
    fn test_native_id_wins_over_hash() {
        let native = identity_for(Some("10203"), "whatever", (0, 0));
        assert_eq!(native, "native:10203");
        // Same text at the same position still differs once a native id exists
        assert_ne!(native, identity_for(None, "whatever", (0, 0)));
    }

    #[test]
    fn test_distinct_identities_tracked_separately() {
        let mut ledger = DedupLedger::new();
        assert!(ledger.should_process("native:1"));
        assert!(ledger.should_process("native:2"));
        assert!(!ledger.should_process("native:1"));
        assert_eq!(ledger.len(), 2);
    }
}
