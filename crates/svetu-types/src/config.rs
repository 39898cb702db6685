//! Global configuration types for the draft service.
//!
//! `GlobalConfig` represents the top-level `config.toml`. Every field has
//! a default, so an empty or missing file is a valid configuration.

use serde::{Deserialize, Serialize};

/// Top-level configuration.
///
/// Loaded from `~/.svetu/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Draft retention and storage settings.
    #[serde(default)]
    pub drafts: DraftConfig,
}

/// How `expiresAt` evolves after a draft is created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpiryMode {
    /// Hard cap: `expiresAt` is set once, at creation or import.
    #[default]
    Fixed,
    /// Every save pushes `expiresAt` to `now + ttl`.
    Sliding,
}

/// `[drafts]` section of `config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftConfig {
    /// Time-to-live of a draft, in days.
    #[serde(default = "default_ttl_days")]
    pub ttl_days: u32,

    #[serde(default)]
    pub expiry_mode: ExpiryMode,

    /// Namespace prefix for every storage key.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Reject saves whose draft version is behind the stored one.
    /// Off by default: last write wins.
    #[serde(default)]
    pub optimistic_locking: bool,
}

fn default_ttl_days() -> u32 {
    30
}

fn default_key_prefix() -> String {
    "listing_draft".to_string()
}

impl Default for DraftConfig {
    fn default() -> Self {
        Self {
            ttl_days: default_ttl_days(),
            expiry_mode: ExpiryMode::default(),
            key_prefix: default_key_prefix(),
            optimistic_locking: false,
        }
    }
}
