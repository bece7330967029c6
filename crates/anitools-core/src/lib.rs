//! # anitools-core
//!
//! Core types, traits, and abstractions for the anitools filter model.
//!
//! This crate provides the filter definitions table, live filter values, the
//! canonical filter expression with its pure builder, backend wire models,
//! and the capability traits that the session and HTTP crates depend on.

pub mod builder;
pub mod defaults;
pub mod definitions;
pub mod error;
pub mod events;
pub mod expression;
pub mod logging;
pub mod media;
pub mod models;
pub mod traits;
pub mod value;

// Re-export commonly used types at crate root
pub use builder::{build, satisfies_mask};
pub use definitions::{
    definitions_for, filter_set, BoundsField, Combinator, FilterDefinition, FilterKind,
    FilterName, RemoteSource, TypeaheadSource, ValuesField, DATE_MASK,
};
pub use error::{Error, Result};
pub use events::{AlertSeverity, EventBus, EventEnvelope, FilterEvent};
pub use expression::{Clause, FilterExpression, PatternClause, SetClause};
pub use media::EntityType;
pub use models::*;
pub use traits::*;
pub use value::{FilterValue, RangeDomain, RangeValue, SelectedValue, Selection, TextValue};
