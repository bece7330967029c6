//! # anitools-filters
//!
//! Filter session for the anitools list views.
//!
//! This crate provides:
//! - Widget handles holding one filter value each, with whitelist and range domain enforcement
//! - A session task that binds widgets per entity type and restores persisted expressions
//! - Debounced, deduplicated change notification over an event bus
//! - Latest-request-wins slots for filter values, user lists, typeahead and table pages
//! - A remote table consumer that turns the settled expression into page requests
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use anitools_client::{BackendConfig, HttpBackend};
//! use anitools_filters::{EntityType, FileStore, FilterName, SessionBuilder, SessionConfig, WidgetEdit};
//!
//! let config = SessionConfig::from_env();
//! let backend = Arc::new(HttpBackend::new(BackendConfig::from_env())?);
//! let store = Arc::new(FileStore::new(config.state_dir.clone()));
//!
//! let session = SessionBuilder::new(backend, store)
//!     .with_config(config)
//!     .start();
//!
//! session.switch_entity(EntityType::Anime).await?;
//! session.edit(FilterName::TitleLike, WidgetEdit::Type("frieren".into())).await?;
//!
//! let mut events = session.events();
//! while let Ok(event) = events.recv().await {
//!     println!("Event: {}", event.event_type);
//! }
//! ```

pub mod bindings;
pub mod config;
pub mod debounce;
pub mod notifier;
pub mod session;
pub mod slot;
pub mod store;
pub mod table;
pub mod widget;
pub mod years;

// Re-export core types
pub use anitools_core::*;

pub use bindings::FilterBindings;
pub use config::SessionConfig;
pub use debounce::Debouncer;
pub use notifier::{ChangeNotifier, NotifierState, Settled};
pub use session::{
    QueryContext, SessionBuilder, SessionHandle, SessionSnapshot, FORCE_RELOAD_HINT,
};
pub use slot::{RequestClass, RequestSlots, Ticket};
pub use store::{FileStore, MemoryStore};
pub use table::{RemoteTable, TablePage};
pub use widget::{
    ChangeSink, Commit, NullView, NullViews, ViewFactory, WidgetChange, WidgetEdit,
    WidgetHandle, WidgetSnapshot, WidgetView,
};

/// Default debounce window for typed input (milliseconds).
pub const DEFAULT_DEBOUNCE_MS: u64 = anitools_core::defaults::DEBOUNCE_MS;
