//! Shared fixtures for the filter session integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anitools_core::{
    BackendNotice, BackendReply, EntityType, Error, EventEnvelope, FilterBackend, FilterEvent,
    FilterValues, Result, SearchPage, SearchRequest, TagCatalog, TypeaheadSource, UserList,
    WhitelistEntry,
};
use anitools_filters::{MemoryStore, SessionBuilder, SessionConfig, SessionHandle};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;

// ============================================================================
// FAKE BACKEND
// ============================================================================

/// A backend call as the fake saw it.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    FilterValues(EntityType),
    Suggest(TypeaheadSource, String),
    UserLists {
        user_name: String,
        entity_type: EntityType,
        force_reload: bool,
    },
    Search(SearchRequest),
}

/// Scriptable in-memory backend. Delays use tokio time, so paused-clock
/// tests control the order in which replies land.
pub struct FakeBackend {
    filter_values: Mutex<FilterValues>,
    suggestions: Mutex<HashMap<String, (Duration, Vec<WhitelistEntry>)>>,
    user_lists: Mutex<Option<BackendReply<Vec<UserList>>>>,
    search_delays: Mutex<HashMap<u64, Duration>>,
    search_fails: Mutex<bool>,
    calls: Mutex<Vec<Call>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            filter_values: Mutex::new(sample_filter_values()),
            suggestions: Mutex::new(HashMap::new()),
            user_lists: Mutex::new(None),
            search_delays: Mutex::new(HashMap::new()),
            search_fails: Mutex::new(false),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_suggestions(
        self,
        query: &str,
        delay: Duration,
        entries: Vec<WhitelistEntry>,
    ) -> Self {
        self.suggestions
            .lock()
            .insert(query.to_string(), (delay, entries));
        self
    }

    pub fn with_user_lists(self, reply: BackendReply<Vec<UserList>>) -> Self {
        *self.user_lists.lock() = Some(reply);
        self
    }

    pub fn with_search_delay(self, start: u64, delay: Duration) -> Self {
        self.search_delays.lock().insert(start, delay);
        self
    }

    pub fn fail_search(&self) {
        *self.search_fails.lock() = true;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn user_list_calls(&self) -> Vec<bool> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::UserLists { force_reload, .. } => Some(force_reload),
                _ => None,
            })
            .collect()
    }

    pub fn search_calls(&self) -> Vec<SearchRequest> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Search(request) => Some(request),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl FilterBackend for FakeBackend {
    async fn filter_values(&self, entity_type: EntityType) -> Result<FilterValues> {
        self.record(Call::FilterValues(entity_type));
        Ok(self.filter_values.lock().clone())
    }

    async fn suggest(&self, source: TypeaheadSource, query: &str) -> Result<Vec<WhitelistEntry>> {
        self.record(Call::Suggest(source, query.to_string()));
        let scripted = self.suggestions.lock().get(query).cloned();
        match scripted {
            Some((delay, entries)) => {
                tokio::time::sleep(delay).await;
                Ok(entries)
            }
            None => Ok(Vec::new()),
        }
    }

    async fn user_lists(
        &self,
        user_name: &str,
        entity_type: EntityType,
        force_reload: bool,
    ) -> Result<BackendReply<Vec<UserList>>> {
        self.record(Call::UserLists {
            user_name: user_name.to_string(),
            entity_type,
            force_reload,
        });
        let reply = self.user_lists.lock().clone();
        reply.ok_or_else(|| Error::NotFound(format!("no lists for {}", user_name)))
    }

    async fn search(&self, request: &SearchRequest) -> Result<SearchPage> {
        self.record(Call::Search(request.clone()));
        let delay = self.search_delays.lock().get(&request.start).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if *self.search_fails.lock() {
            return Err(Error::Backend {
                status: 503,
                message: "search unavailable".into(),
            });
        }
        sample_page(request.draw)
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub fn sample_filter_values() -> FilterValues {
    FilterValues {
        format: vec!["TV".into(), "MOVIE".into()],
        genres: vec!["Action".into(), "Drama".into(), "Romance".into()],
        season_year: vec!["2010".into(), "2011".into(), "2012".into()],
        tags: TagCatalog::new(vec![
            ("Theme".into(), vec!["Time Skip".into(), "Isekai".into()]),
            ("Setting".into(), vec!["Urban".into()]),
        ]),
        episodes: vec![1, 12, 24, 500],
        total_runtime: vec![0, 600, 12000],
        mc_count: vec![1, 5, 20],
        ..FilterValues::default()
    }
}

pub fn sample_page(draw: u64) -> Result<SearchPage> {
    serde_json::from_value(json!({
        "draw": draw,
        "data": [{"id": 1, "title": "Frieren"}, {"id": 2, "title": "Mushishi"}],
        "recordsTotal": 8,
        "recordsFiltered": 2,
        "total_completed": 4.0,
        "filtered_runtime": 1200,
        "total_runtime": 2000,
    }))
    .map_err(Error::from)
}

pub fn user_list(id: &str, name: &str, total: u64) -> UserList {
    UserList {
        id: id.to_string(),
        name: name.to_string(),
        amount_completed: None,
        amount_total: total,
    }
}

pub fn timeout_notice(message: &str) -> BackendNotice {
    BackendNotice {
        message: message.to_string(),
        kind: Some("timeout".to_string()),
    }
}

// ============================================================================
// SESSION
// ============================================================================

pub const DEBOUNCE: Duration = Duration::from_millis(500);

pub fn start_session(backend: Arc<FakeBackend>, store: MemoryStore) -> SessionHandle {
    SessionBuilder::new(backend, Arc::new(store))
        .with_config(SessionConfig::default().with_debounce_ms(DEBOUNCE.as_millis() as u64))
        .start()
}

/// Let spawned requests and the debounce timer run to completion.
pub async fn quiesce() {
    tokio::time::sleep(Duration::from_secs(5)).await;
}

/// Every event currently buffered on `rx`.
pub fn drain(rx: &mut broadcast::Receiver<EventEnvelope>) -> Vec<FilterEvent> {
    let mut events = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(envelope) => events.push(envelope.payload),
            Err(TryRecvError::Lagged(_)) => continue,
            Err(_) => return events,
        }
    }
}

pub fn changes(events: &[FilterEvent]) -> Vec<&FilterEvent> {
    events
        .iter()
        .filter(|e| matches!(e, FilterEvent::FilterChanged { .. }))
        .collect()
}
