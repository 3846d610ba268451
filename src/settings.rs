//! Externally-owned switches the pipeline reads
//!
//! The extension's storage layer owns these values; the pipeline only ever
//! sees read-only snapshots and reacts to change notifications pushed over
//! a watch channel.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Snapshot of the pipeline switches
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// Master switch for the whole extension
    pub enabled: bool,
    /// Per-platform switch for the current host
    pub platform_enabled: bool,
    /// Whether the session collaborator reports a signed-in user
    pub authenticated: bool,
    /// Minimum confidence for prominent highlighting
    pub highlight_threshold: f32,
    pub highlight_enabled: bool,
}

impl PipelineSettings {
    /// The watcher observes the page only while all three gates hold
    pub fn observation_allowed(&self) -> bool {
        self.enabled && self.platform_enabled && self.authenticated
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            platform_enabled: true,
            authenticated: false,
            highlight_threshold: 0.7,
            highlight_enabled: true,
        }
    }
}

/// Authentication gate, normally backed by the extension's session storage
pub trait AuthProvider: Send + Sync {
    fn is_authenticated(&self) -> bool;
}

/// Auth provider backed by the presence of an API token
#[derive(Debug, Clone, Default)]
pub struct TokenAuthProvider {
    token: Option<String>,
}

impl TokenAuthProvider {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: token.filter(|t| !t.trim().is_empty()),
        }
    }
}

impl AuthProvider for TokenAuthProvider {
    fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }
}

/// Owner side of the settings collaborator
///
/// `update` notifies every subscribed watcher, which re-evaluates its state
/// machine on each change.
#[derive(Debug)]
pub struct SettingsStore {
    tx: watch::Sender<PipelineSettings>,
}

impl SettingsStore {
    pub fn new(initial: PipelineSettings) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx }
    }

    pub fn read(&self) -> PipelineSettings {
        *self.tx.borrow()
    }

    pub fn update(&self, mutate: impl FnOnce(&mut PipelineSettings)) {
        self.tx.send_modify(mutate);
    }

    pub fn subscribe(&self) -> watch::Receiver<PipelineSettings> {
        self.tx.subscribe()
    }

    /// Refresh the `authenticated` flag from the auth collaborator
    pub fn sync_auth(&self, provider: &dyn AuthProvider) {
        let authenticated = provider.is_authenticated();
        self.tx.send_if_modified(|settings| {
            let changed = settings.authenticated != authenticated;
            settings.authenticated = authenticated;
            changed
        });
    }
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self::new(PipelineSettings::default())
    }
}
