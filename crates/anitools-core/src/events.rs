//! Filter events, envelope schema, and event bus.
//!
//! Sessions publish every externally visible effect (a settled filter change,
//! a restoration, a refreshed whitelist, a user-facing alert) on one broadcast
//! channel. Consumers such as the remote table subscribe independently.
//!
//! ## Wire Format
//!
//! ```text
//! {"event_id":"019508a0-...","event_type":"filter.changed","occurred_at":"...",
//!  "entity_type":"ANIME","payload_version":1,"payload":{"type":"FilterChanged",...}}
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::definitions::FilterName;
use crate::expression::FilterExpression;
use crate::media::EntityType;

// ============================================================================
// Event Envelope
// ============================================================================

/// Versioned envelope around a [`FilterEvent`].
#[derive(Debug, Clone, Serialize)]
pub struct EventEnvelope {
    /// Unique event identifier (UUIDv7 for temporal ordering).
    pub event_id: Uuid,
    /// Namespaced event type (e.g. `"filter.changed"`).
    pub event_type: String,
    pub occurred_at: DateTime<Utc>,
    /// Entity type of the session that raised the event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<EntityType>,
    /// Payload schema version.
    pub payload_version: u32,
    pub payload: FilterEvent,
}

impl EventEnvelope {
    pub fn new(event: FilterEvent) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            event_type: event.namespaced_event_type().to_string(),
            occurred_at: Utc::now(),
            entity_type: event.entity_type(),
            payload_version: 1,
            payload: event,
        }
    }
}

// ============================================================================
// Filter Event (domain payloads)
// ============================================================================

/// Severity of a user-facing alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Error,
    Warning,
}

/// Domain events, serialized with a `type` tag.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum FilterEvent {
    /// A settled edit produced a different expression.
    FilterChanged {
        entity_type: EntityType,
        expression: FilterExpression,
    },
    /// Widgets were rebuilt for an entity type from persisted state.
    FiltersRestored {
        entity_type: EntityType,
        expression: FilterExpression,
    },
    /// A widget's whitelist or domain was replaced.
    WhitelistUpdated {
        entity_type: EntityType,
        filter: FilterName,
        count: usize,
    },
    /// Dismissible, non-blocking message for the user.
    Alert {
        severity: AlertSeverity,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        retry_hint: Option<String>,
    },
}

impl FilterEvent {
    pub fn error(message: impl Into<String>) -> Self {
        FilterEvent::Alert {
            severity: AlertSeverity::Error,
            message: message.into(),
            retry_hint: None,
        }
    }

    pub fn warning(message: impl Into<String>, retry_hint: Option<String>) -> Self {
        FilterEvent::Alert {
            severity: AlertSeverity::Warning,
            message: message.into(),
            retry_hint,
        }
    }

    /// Returns the namespaced event type for the envelope.
    pub fn namespaced_event_type(&self) -> &'static str {
        match self {
            FilterEvent::FilterChanged { .. } => "filter.changed",
            FilterEvent::FiltersRestored { .. } => "filter.restored",
            FilterEvent::WhitelistUpdated { .. } => "whitelist.updated",
            FilterEvent::Alert { .. } => "alert",
        }
    }

    pub fn entity_type(&self) -> Option<EntityType> {
        match self {
            FilterEvent::FilterChanged { entity_type, .. }
            | FilterEvent::FiltersRestored { entity_type, .. }
            | FilterEvent::WhitelistUpdated { entity_type, .. } => Some(*entity_type),
            FilterEvent::Alert { .. } => None,
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Broadcast-based event bus.
///
/// Slow receivers that fall behind get a `Lagged` error and miss events.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<EventEnvelope>,
}

impl EventBus {
    /// Create a new event bus with the given buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Emit an event to all subscribers. Dropped silently when nobody listens.
    pub fn emit(&self, event: FilterEvent) {
        let envelope = EventEnvelope::new(event);
        let subscriber_count = self.tx.receiver_count();
        tracing::debug!(
            event_type = %envelope.event_type,
            event_id = %envelope.event_id,
            subscriber_count,
            "EventBus emit"
        );
        let _ = self.tx.send(envelope);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(crate::defaults::EVENT_BUS_CAPACITY)
    }
}

// ============================================================================
// Tests
// ============================================================================
