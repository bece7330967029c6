//! Centralized default constants for anitools.
//!
//! **This module is the single source of truth** for shared default values.
//! Crates reference these constants instead of defining their own magic
//! numbers.

// =============================================================================
// CHANGE NOTIFICATION
// =============================================================================

/// Debounce window for continuous edits (typing, range min/max fields).
pub const DEBOUNCE_MS: u64 = 500;

/// Capacity of the session command channel.
pub const SESSION_CHANNEL_CAPACITY: usize = 64;

/// Default event bus broadcast channel capacity.
pub const EVENT_BUS_CAPACITY: usize = 256;

// =============================================================================
// PERSISTENCE
// =============================================================================

/// Prefix of the per-entity-type storage key (`filters-anime`, ...).
pub const STORAGE_KEY_PREFIX: &str = "filters-";

/// Directory name used by the file store when no state dir is configured.
pub const STATE_DIR_NAME: &str = "anitools";

// =============================================================================
// RANGES
// =============================================================================

/// Lower bound every range domain starts at.
pub const RANGE_LO: i64 = 0;

/// Upper bound used until the backend reports the real domain.
pub const RANGE_HI_PLACEHOLDER: i64 = 9999;

/// Upper bound of percentage ranges (tag percentage, scores).
pub const PERCENT_HI: i64 = 100;

// =============================================================================
// BACKEND
// =============================================================================

/// Default backend base URL.
pub const API_URL: &str = "http://127.0.0.1:8000";

/// Timeout for backend requests in seconds.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// TABLE
// =============================================================================

/// Page size of the remote table.
pub const PAGE_LENGTH: u32 = 100;

/// Key the table search box folds into.
pub const SEARCH_CLAUSE_KEY: &str = "title_like";
