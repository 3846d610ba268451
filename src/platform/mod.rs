//! Per-platform comment location and extraction rules
//!
//! Each supported host nests comments differently, so the locator and the
//! text/identity extraction are behind one trait with an implementation per
//! platform, selected once at pipeline construction.

mod adapters;

pub use adapters::{FacebookAdapter, GenericAdapter, TiktokAdapter, YoutubeAdapter};

use serde::{Deserialize, Serialize};

use crate::page::{NodeId, PageDocument};

/// Host social-media site whose DOM structure drives the locator rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Facebook,
    Youtube,
    Tiktok,
    /// Structural fallback for unrecognized comment sections
    Generic,
    Unknown,
}

impl Platform {
    /// Detect the platform from the page's host name
    pub fn from_host(host: &str) -> Platform {
        let host = host.to_ascii_lowercase();
        if host.contains("facebook.") || host.contains("fb.com") {
            Platform::Facebook
        } else if host.contains("youtube.") || host.contains("youtu.be") {
            Platform::Youtube
        } else if host.contains("tiktok.") {
            Platform::Tiktok
        } else {
            Platform::Generic
        }
    }

    pub fn from_name(name: &str) -> Option<Platform> {
        match name.trim().to_ascii_lowercase().as_str() {
            "facebook" => Some(Platform::Facebook),
            "youtube" => Some(Platform::Youtube),
            "tiktok" => Some(Platform::Tiktok),
            "generic" => Some(Platform::Generic),
            "unknown" => Some(Platform::Unknown),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Facebook => "facebook",
            Platform::Youtube => "youtube",
            Platform::Tiktok => "tiktok",
            Platform::Generic => "generic",
            Platform::Unknown => "unknown",
        }
    }
}

/// Platform-specific matcher and extraction rules
///
/// `locate` yields candidate elements in document order; zero matches is a
/// normal outcome, not an error.
pub trait PlatformAdapter: Send + Sync {
    fn platform(&self) -> Platform;

    /// Comment-like elements in the subtree under `root` (root included)
    fn locate(&self, doc: &PageDocument, root: NodeId) -> Vec<NodeId>;

    /// Extracted, trimmed comment text for a located element
    fn extract_text(&self, doc: &PageDocument, id: NodeId) -> String;

    /// Platform-native stable id, when the DOM exposes one
    fn native_identity(&self, doc: &PageDocument, id: NodeId) -> Option<String>;
}

/// Select the adapter for a platform, falling back to the generic rules
pub fn adapter_for(platform: Platform) -> Box<dyn PlatformAdapter> {
    match platform {
        Platform::Facebook => Box::new(FacebookAdapter),
        Platform::Youtube => Box::new(YoutubeAdapter),
        Platform::Tiktok => Box::new(TiktokAdapter),
        Platform::Generic | Platform::Unknown => Box::new(GenericAdapter),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_from_host() {
        assert_eq!(Platform::from_host("www.facebook.com"), Platform::Facebook);
        assert_eq!(Platform::from_host("m.facebook.com"), Platform::Facebook);
        assert_eq!(Platform::from_host("WWW.YOUTUBE.COM"), Platform::Youtube);
        assert_eq!(Platform::from_host("www.tiktok.com"), Platform::Tiktok);
        assert_eq!(Platform::from_host("forum.example.org"), Platform::Generic);
    }

    #[test]
    fn test_platform_wire_names() {
        assert_eq!(Platform::Facebook.as_str(), "facebook");
        assert_eq!(Platform::from_name("TikTok"), Some(Platform::Tiktok));
        assert_eq!(Platform::from_name("myspace"), None);
        assert_eq!(
            serde_json::to_string(&Platform::Unknown).unwrap(),
            "\"unknown\""
        );
    }

    #[test]
    fn test_adapter_selection() {
        assert_eq!(adapter_for(Platform::Facebook).platform(), Platform::Facebook);
        assert_eq!(adapter_for(Platform::Unknown).platform(), Platform::Generic);
    }
}
