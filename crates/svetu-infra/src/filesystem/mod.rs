//! Filesystem locations.

use std::path::PathBuf;

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "SVETU_DATA_DIR";

/// Resolve the data directory holding `drafts.db` and `config.toml`.
///
/// Priority: `SVETU_DATA_DIR`, then `~/.svetu`, then `./.svetu`.
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".svetu");
    }

    PathBuf::from(".svetu")
}
