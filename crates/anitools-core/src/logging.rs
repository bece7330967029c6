//! Structured logging schema and field name constants for anitools.
//!
//! All crates use these constants for consistent structured logging fields.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Persistence or backend failure surfaced to the user |
//! | WARN  | Recoverable issue, prior state kept |
//! | INFO  | Session lifecycle (entity switch, shutdown) |
//! | DEBUG | Decision points (debounce armed, expression unchanged) |
//! | TRACE | Per-widget iteration during builds |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Component originating the log event.
/// Examples: "session", "bindings", "notifier", "http_backend", "table"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "settle", "typeahead", "user_lists", "filter_values", "draw"
pub const OPERATION: &str = "op";

// ─── Filter fields ─────────────────────────────────────────────────────────

/// Entity type of the filter session ("anime", "manga", ...).
pub const ENTITY_TYPE: &str = "entity_type";

/// Filter name a log event refers to.
pub const FILTER: &str = "filter";

/// Number of clauses in a built expression.
pub const CLAUSE_COUNT: &str = "clause_count";

/// Request generation inside a latest-request-wins slot.
pub const GENERATION: &str = "generation";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of results returned by a lookup.
pub const RESULT_COUNT: &str = "result_count";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";

/// Install a `fmt` subscriber filtered by `RUST_LOG`.
///
/// Falls back to `default_directive` when `RUST_LOG` is unset or invalid.
/// Calling this more than once is harmless; later calls are ignored.
pub fn init_tracing(default_directive: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .try_init();
}
