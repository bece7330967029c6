//! Capability traits the filter session depends on.
//!
//! These traits define the interfaces that concrete implementations
//! must satisfy, enabling pluggable backends and testability.

use async_trait::async_trait;

use crate::definitions::TypeaheadSource;
use crate::error::Result;
use crate::media::EntityType;
use crate::models::{
    BackendReply, FilterValues, SearchPage, SearchRequest, UserList, WhitelistEntry,
};

// =============================================================================
// BACKEND
// =============================================================================

/// Remote lookups consumed by widget bindings and the remote table.
#[async_trait]
pub trait FilterBackend: Send + Sync {
    /// Whitelists and numeric domains for every picker of an entity type.
    async fn filter_values(&self, entity_type: EntityType) -> Result<FilterValues>;

    /// Prefix search for a typeahead picker.
    async fn suggest(&self, source: TypeaheadSource, query: &str) -> Result<Vec<WhitelistEntry>>;

    /// The user's lists for an entity type, with any backend notices.
    async fn user_lists(
        &self,
        user_name: &str,
        entity_type: EntityType,
        force_reload: bool,
    ) -> Result<BackendReply<Vec<UserList>>>;

    /// One page of the remote table.
    async fn search(&self, request: &SearchRequest) -> Result<SearchPage>;
}

// =============================================================================
// PERSISTENCE
// =============================================================================

/// Durable key/value storage for serialized filter expressions.
#[async_trait]
pub trait FilterStore: Send + Sync {
    /// Stored text under `key`, if any.
    async fn load(&self, key: &str) -> Result<Option<String>>;

    /// Replace the text stored under `key`.
    async fn save(&self, key: &str, value: &str) -> Result<()>;
}
