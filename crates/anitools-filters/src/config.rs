//! Filter session configuration.

use std::path::PathBuf;
use std::time::Duration;

use anitools_core::{defaults, TagGrouping};
use tracing::debug;

pub const ENV_DEBOUNCE_MS: &str = "ANITOOLS_FILTER_DEBOUNCE_MS";
pub const ENV_GROUP_TAGS: &str = "ANITOOLS_GROUP_TAGS";
pub const ENV_STATE_DIR: &str = "ANITOOLS_STATE_DIR";

/// Configuration for a filter session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Quiet period after a debounced edit before the expression settles.
    pub debounce_ms: u64,
    /// Show tags grouped by category instead of alphabetically.
    pub group_tags: bool,
    /// Directory used by [`FileStore`](crate::FileStore).
    pub state_dir: PathBuf,
    /// Capacity of the session command channel.
    pub channel_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            debounce_ms: defaults::DEBOUNCE_MS,
            group_tags: false,
            state_dir: default_state_dir(),
            channel_capacity: defaults::SESSION_CHANNEL_CAPACITY,
        }
    }
}

/// `$XDG_STATE_HOME/anitools`, `$HOME/.local/state/anitools`, or a temp dir.
fn default_state_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os("XDG_STATE_HOME").filter(|v| !v.is_empty()) {
        return PathBuf::from(dir).join(defaults::STATE_DIR_NAME);
    }
    if let Some(home) = std::env::var_os("HOME").filter(|v| !v.is_empty()) {
        return PathBuf::from(home)
            .join(".local")
            .join("state")
            .join(defaults::STATE_DIR_NAME);
    }
    std::env::temp_dir().join(defaults::STATE_DIR_NAME)
}

impl SessionConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `ANITOOLS_FILTER_DEBOUNCE_MS` | `500` | Debounce window for typed edits |
    /// | `ANITOOLS_GROUP_TAGS` | `false` | Group tags by category |
    /// | `ANITOOLS_STATE_DIR` | `~/.local/state/anitools` | Persisted filter directory |
    pub fn from_env() -> Self {
        let debounce_ms = std::env::var(ENV_DEBOUNCE_MS)
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults::DEBOUNCE_MS);

        let group_tags = std::env::var(ENV_GROUP_TAGS)
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        let state_dir = std::env::var_os(ENV_STATE_DIR)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_state_dir);

        debug!(
            debounce_ms,
            group_tags,
            state_dir = %state_dir.display(),
            "Loaded session config from environment"
        );

        Self {
            debounce_ms,
            group_tags,
            state_dir,
            channel_capacity: defaults::SESSION_CHANNEL_CAPACITY,
        }
    }

    pub fn with_debounce_ms(mut self, ms: u64) -> Self {
        self.debounce_ms = ms;
        self
    }

    pub fn with_group_tags(mut self, grouped: bool) -> Self {
        self.group_tags = grouped;
        self
    }

    pub fn with_state_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.state_dir = dir.into();
        self
    }

    /// Set the command channel capacity (at least 1).
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn tag_grouping(&self) -> TagGrouping {
        TagGrouping::from_flag(self.group_tags)
    }
}
