//! Remote table consumer.
//!
//! The table never talks to widgets. Its query hook reads the session's
//! last-known [`QueryContext`], merges the search box into the expression
//! and asks the backend for one page. Page fetches share a single
//! latest-request-wins slot.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, info, instrument, warn};

use anitools_core::defaults::{PAGE_LENGTH, SEARCH_CLAUSE_KEY};
use anitools_core::logging::{DURATION_MS, RESULT_COUNT};
use anitools_core::{
    ColumnOrder, ColumnSpec, Error, EventEnvelope, FilterBackend, FilterEvent, Result, SearchPage,
    SearchRequest,
};

use crate::session::QueryContext;
use crate::slot::{RequestClass, RequestSlots};

/// One fetched page with its rendered stats line.
#[derive(Debug, Clone)]
pub struct TablePage {
    pub draw: u64,
    pub start: u64,
    pub page: SearchPage,
    /// Completion and runtime summary; media entity types only.
    pub summary: Option<String>,
}

pub struct RemoteTable {
    backend: Arc<dyn FilterBackend>,
    context: watch::Receiver<QueryContext>,
    slots: RequestSlots,
    draw: AtomicU64,
    columns: Vec<ColumnSpec>,
    order: Vec<ColumnOrder>,
    length: u32,
    search: Mutex<String>,
}

impl RemoteTable {
    pub fn new(backend: Arc<dyn FilterBackend>, context: watch::Receiver<QueryContext>) -> Self {
        Self {
            backend,
            context,
            slots: RequestSlots::new(),
            draw: AtomicU64::new(0),
            columns: Vec::new(),
            order: Vec::new(),
            length: PAGE_LENGTH,
            search: Mutex::new(String::new()),
        }
    }

    pub fn with_columns(mut self, columns: Vec<ColumnSpec>) -> Self {
        self.columns = columns;
        self
    }

    pub fn with_order(mut self, order: Vec<ColumnOrder>) -> Self {
        self.order = order;
        self
    }

    pub fn with_page_length(mut self, length: u32) -> Self {
        self.length = length.max(1);
        self
    }

    /// Replace the search box value. Takes effect on the next fetch.
    pub fn set_search(&self, search: impl Into<String>) {
        *self.search.lock() = search.into();
    }

    pub fn search(&self) -> String {
        self.search.lock().clone()
    }

    /// Query hook: the request for the page starting at `start`.
    ///
    /// A non-empty search box is folded into the expression; it is never
    /// sent as a separate field.
    pub fn request(&self, start: u64) -> Result<SearchRequest> {
        let search = self.search();
        let context = self.context.borrow();
        let media_type = context
            .entity_type
            .ok_or_else(|| Error::InvalidInput("no entity type selected".into()))?;

        Ok(SearchRequest {
            draw: self.draw.fetch_add(1, Ordering::Relaxed) + 1,
            start,
            length: self.length,
            columns: self.columns.clone(),
            order: self.order.clone(),
            filter: context
                .expression
                .clone()
                .with_search(SEARCH_CLAUSE_KEY, &search),
            user_name: context.user_name.clone(),
            media_type,
        })
    }

    /// Fetch one page. Returns `Ok(None)` when a newer fetch superseded
    /// this one.
    #[instrument(skip(self), fields(component = "remote_table", op = "load_page"))]
    pub async fn load_page(&self, start: u64) -> Result<Option<TablePage>> {
        let request = self.request(start)?;
        let ticket = self.slots.begin(RequestClass::TablePage);
        let started = Instant::now();

        let Some(result) = ticket.run(self.backend.search(&request)).await else {
            debug!(draw = request.draw, "Table page superseded");
            return Ok(None);
        };
        if !self.slots.finish(&ticket) {
            debug!(draw = request.draw, "Discarding stale table page");
            return Ok(None);
        }

        let page = result?;
        debug!(
            draw = request.draw,
            { RESULT_COUNT } = page.data.len(),
            { DURATION_MS } = started.elapsed().as_millis() as u64,
            "Loaded table page"
        );
        let summary = page.describe(request.media_type);
        Ok(Some(TablePage {
            draw: request.draw,
            start,
            page,
            summary,
        }))
    }

    /// Redraw from the first page whenever the session restores or changes
    /// the filters of the current entity type. Runs until the bus closes or
    /// `pages` is dropped.
    pub async fn follow(
        &self,
        mut events: broadcast::Receiver<EventEnvelope>,
        pages: mpsc::Sender<TablePage>,
    ) {
        info!("Remote table following filter events");
        loop {
            let envelope = match events.recv().await {
                Ok(envelope) => envelope,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Remote table lagged behind filter events");
                    continue;
                }
                Err(RecvError::Closed) => break,
            };

            let redraw = matches!(
                envelope.payload,
                FilterEvent::FilterChanged { .. } | FilterEvent::FiltersRestored { .. }
            );
            let current = self.context.borrow().entity_type;
            if !redraw || envelope.entity_type != current {
                continue;
            }

            match self.load_page(0).await {
                Ok(Some(page)) => {
                    if pages.send(page).await.is_err() {
                        break;
                    }
                }
                Ok(None) => {}
                Err(e) => warn!(error = %e, "Failed to redraw table"),
            }
        }
        info!("Remote table stopped following filter events");
    }
}
