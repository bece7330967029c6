//! Filter session actor.
//!
//! A session is one tokio task owning every widget of the current entity
//! type. Hosts talk to it through a [`SessionHandle`]; every widget and
//! state mutation happens inside the task, one command at a time. Backend
//! lookups run in spawned tasks that report back through the same command
//! channel and are discarded when their request slot was superseded.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use anitools_client::HttpBackend;
//! use anitools_filters::{FileStore, SessionBuilder, SessionConfig, WidgetEdit};
//!
//! let config = SessionConfig::from_env();
//! let store = FileStore::new(config.state_dir.clone());
//! let session = SessionBuilder::new(Arc::new(HttpBackend::from_env()?), Arc::new(store))
//!     .with_config(config)
//!     .start();
//!
//! let mut events = session.events();
//! session.switch_entity(EntityType::Anime).await?;
//! session.edit(FilterName::TitleLike, WidgetEdit::Type("Frieren".into())).await?;
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tracing::{debug, info, instrument, trace, warn};

use anitools_core::logging::{CLAUSE_COUNT, DURATION_MS, ENTITY_TYPE, FILTER, GENERATION};
use anitools_core::{
    BackendReply, EntityType, Error, EventBus, EventEnvelope, FilterBackend, FilterEvent,
    FilterExpression, FilterName, FilterStore, FilterValues, Result, TagGrouping, UserList,
    WhitelistEntry,
};

use crate::bindings::FilterBindings;
use crate::config::SessionConfig;
use crate::notifier::{ChangeNotifier, NotifierState, Settled};
use crate::slot::{RequestClass, RequestSlots, Ticket};
use crate::widget::{NullViews, ViewFactory, WidgetChange, WidgetEdit, WidgetSnapshot};

/// Shown next to a user-list timeout warning.
pub const FORCE_RELOAD_HINT: &str = "Force reloading may take a bit of time.";

// =============================================================================
// PUBLIC TYPES
// =============================================================================

/// What a remote table needs to build its request.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryContext {
    pub entity_type: Option<EntityType>,
    pub user_name: String,
    /// Last expression emitted (or restored) by the session.
    pub expression: FilterExpression,
}

/// Point-in-time view of a session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub entity_type: Option<EntityType>,
    pub user_name: Option<String>,
    pub state: NotifierState,
    pub expression: FilterExpression,
    pub widgets: Vec<WidgetSnapshot>,
}

impl SessionSnapshot {
    pub fn widget(&self, filter: FilterName) -> Option<&WidgetSnapshot> {
        self.widgets.iter().find(|w| w.filter == filter)
    }
}

// =============================================================================
// COMMANDS
// =============================================================================

enum SessionCommand {
    SwitchEntity {
        entity_type: EntityType,
        reply: oneshot::Sender<Result<()>>,
    },
    SetUserName {
        user_name: Option<String>,
        reply: oneshot::Sender<Result<()>>,
    },
    ReloadUserLists {
        reply: oneshot::Sender<Result<()>>,
    },
    Edit {
        filter: FilterName,
        edit: WidgetEdit,
        reply: oneshot::Sender<Result<bool>>,
    },
    Query {
        filter: FilterName,
        input: String,
        reply: oneshot::Sender<Result<()>>,
    },
    SetTagGrouping {
        grouping: TagGrouping,
        reply: oneshot::Sender<Result<()>>,
    },
    ClearFilters {
        reply: oneshot::Sender<Result<()>>,
    },
    Settle {
        reply: oneshot::Sender<Result<()>>,
    },
    Snapshot {
        reply: oneshot::Sender<Result<SessionSnapshot>>,
    },
    Completed(Completion),
    Shutdown,
}

/// Result of a spawned backend request.
enum Completion {
    FilterValues {
        ticket: Ticket,
        result: Result<FilterValues>,
    },
    UserLists {
        ticket: Ticket,
        result: Result<BackendReply<Vec<UserList>>>,
    },
    Suggestions {
        ticket: Ticket,
        filter: FilterName,
        result: Result<Vec<WhitelistEntry>>,
    },
}

// =============================================================================
// HANDLE
// =============================================================================

/// Handle for driving a running session. Cloning is cheap; the session
/// stops once every handle is dropped or [`shutdown`](Self::shutdown) is
/// called.
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<SessionCommand>,
    bus: EventBus,
    context: watch::Receiver<QueryContext>,
}

impl SessionHandle {
    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<Result<T>>) -> SessionCommand,
    ) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(command(reply))
            .await
            .map_err(|_| Error::Internal("Filter session is not running".into()))?;
        rx.await
            .map_err(|_| Error::Internal("Filter session dropped the request".into()))?
    }

    /// Rebuild all widgets for `entity_type` from persisted state.
    pub async fn switch_entity(&self, entity_type: EntityType) -> Result<()> {
        self.request(|reply| SessionCommand::SwitchEntity { entity_type, reply })
            .await
    }

    /// Set (or clear) the user whose lists feed the user-list picker.
    pub async fn set_user_name(&self, user_name: Option<String>) -> Result<()> {
        self.request(|reply| SessionCommand::SetUserName { user_name, reply })
            .await
    }

    /// Fetch the user's lists again, forcing a backend reload if the last
    /// fetch timed out.
    pub async fn reload_user_lists(&self) -> Result<()> {
        self.request(|reply| SessionCommand::ReloadUserLists { reply })
            .await
    }

    /// Apply a user edit. Returns whether the widget value changed.
    pub async fn edit(&self, filter: FilterName, edit: WidgetEdit) -> Result<bool> {
        self.request(|reply| SessionCommand::Edit {
            filter,
            edit,
            reply,
        })
        .await
    }

    /// Typeahead input for a picker.
    pub async fn query(&self, filter: FilterName, input: impl Into<String>) -> Result<()> {
        let input = input.into();
        self.request(|reply| SessionCommand::Query {
            filter,
            input,
            reply,
        })
        .await
    }

    pub async fn set_tag_grouping(&self, grouping: TagGrouping) -> Result<()> {
        self.request(|reply| SessionCommand::SetTagGrouping { grouping, reply })
            .await
    }

    /// Reset every widget except the user-list picker.
    pub async fn clear_filters(&self) -> Result<()> {
        self.request(|reply| SessionCommand::ClearFilters { reply })
            .await
    }

    /// Evaluate a pending debounced edit now.
    pub async fn settle(&self) -> Result<()> {
        self.request(|reply| SessionCommand::Settle { reply }).await
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot> {
        self.request(|reply| SessionCommand::Snapshot { reply })
            .await
    }

    /// Signal the session to stop.
    pub async fn shutdown(&self) -> Result<()> {
        self.tx
            .send(SessionCommand::Shutdown)
            .await
            .map_err(|_| Error::Internal("Failed to send shutdown signal".into()))
    }

    /// Subscribe to session events.
    pub fn events(&self) -> broadcast::Receiver<EventEnvelope> {
        self.bus.subscribe()
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.bus
    }

    /// Watch the query context the remote table builds requests from.
    pub fn context(&self) -> watch::Receiver<QueryContext> {
        self.context.clone()
    }
}

// =============================================================================
// BUILDER
// =============================================================================

/// Builder for a filter session.
pub struct SessionBuilder {
    backend: Arc<dyn FilterBackend>,
    store: Arc<dyn FilterStore>,
    views: Arc<dyn ViewFactory>,
    config: SessionConfig,
    bus: EventBus,
}

impl SessionBuilder {
    pub fn new(backend: Arc<dyn FilterBackend>, store: Arc<dyn FilterStore>) -> Self {
        Self {
            backend,
            store,
            views: Arc::new(NullViews),
            config: SessionConfig::default(),
            bus: EventBus::default(),
        }
    }

    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_views(mut self, views: Arc<dyn ViewFactory>) -> Self {
        self.views = views;
        self
    }

    /// Publish on an existing bus instead of a private one.
    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.bus = bus;
        self
    }

    /// Spawn the session task. Must be called inside a tokio runtime.
    pub fn start(self) -> SessionHandle {
        let (tx, rx) = mpsc::channel(self.config.channel_capacity);
        let (change_tx, change_rx) = mpsc::unbounded_channel();
        let (context_tx, context_rx) = watch::channel(QueryContext::default());

        let session = FilterSession {
            backend: self.backend,
            store: self.store,
            views: self.views,
            bus: self.bus.clone(),
            slots: RequestSlots::new(),
            notifier: ChangeNotifier::new(self.config.debounce()),
            grouping: self.config.tag_grouping(),
            bindings: None,
            restored: FilterExpression::new(),
            user_name: None,
            force_reload_next: false,
            rx,
            weak_tx: tx.downgrade(),
            change_tx,
            change_rx,
            context_tx,
        };
        tokio::spawn(session.run());

        SessionHandle {
            tx,
            bus: self.bus,
            context: context_rx,
        }
    }
}

// =============================================================================
// SESSION TASK
// =============================================================================

struct FilterSession {
    backend: Arc<dyn FilterBackend>,
    store: Arc<dyn FilterStore>,
    views: Arc<dyn ViewFactory>,
    bus: EventBus,
    slots: RequestSlots,
    notifier: ChangeNotifier,
    grouping: TagGrouping,
    bindings: Option<FilterBindings>,
    /// Expression loaded at the last entity switch, used for late bindings.
    restored: FilterExpression,
    user_name: Option<String>,
    force_reload_next: bool,
    rx: mpsc::Receiver<SessionCommand>,
    weak_tx: mpsc::WeakSender<SessionCommand>,
    change_tx: mpsc::UnboundedSender<WidgetChange>,
    change_rx: mpsc::UnboundedReceiver<WidgetChange>,
    context_tx: watch::Sender<QueryContext>,
}

impl FilterSession {
    async fn run(mut self) {
        info!(
            debounce_ms = self.notifier_window_ms(),
            grouping = ?self.grouping,
            "Filter session started"
        );

        loop {
            let deadline = self.notifier.wait();
            tokio::select! {
                command = self.rx.recv() => {
                    match command {
                        Some(SessionCommand::Shutdown) | None => break,
                        Some(command) => self.handle(command).await,
                    }
                }
                _ = deadline => {
                    if self.notifier.on_deadline() {
                        self.evaluate().await;
                    }
                }
            }
        }

        self.slots.cancel_all();
        if let Some(bindings) = self.bindings.take() {
            bindings.destroy();
        }
        info!("Filter session stopped");
    }

    fn notifier_window_ms(&self) -> u64 {
        self.notifier.window().as_millis() as u64
    }

    async fn handle(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::SwitchEntity { entity_type, reply } => {
                let result = self.switch_entity(entity_type).await;
                let _ = reply.send(result);
            }
            SessionCommand::SetUserName { user_name, reply } => {
                let result = self.set_user_name(user_name).await;
                let _ = reply.send(result);
            }
            SessionCommand::ReloadUserLists { reply } => {
                self.fetch_user_lists();
                let _ = reply.send(Ok(()));
            }
            SessionCommand::Edit {
                filter,
                edit,
                reply,
            } => {
                let result = self.apply_edit(filter, edit);
                self.drain_changes().await;
                let _ = reply.send(result);
            }
            SessionCommand::Query {
                filter,
                input,
                reply,
            } => {
                let _ = reply.send(self.query(filter, input));
            }
            SessionCommand::SetTagGrouping { grouping, reply } => {
                self.set_tag_grouping(grouping);
                let _ = reply.send(Ok(()));
            }
            SessionCommand::ClearFilters { reply } => {
                let result = match self.bindings.as_mut() {
                    Some(bindings) => {
                        let cleared = bindings.clear();
                        debug!(cleared, "Cleared filters");
                        self.evaluate().await;
                        Ok(())
                    }
                    None => Err(no_entity()),
                };
                let _ = reply.send(result);
            }
            SessionCommand::Settle { reply } => {
                if self.notifier.flush() {
                    self.evaluate().await;
                }
                let _ = reply.send(Ok(()));
            }
            SessionCommand::Snapshot { reply } => {
                let _ = reply.send(Ok(self.snapshot()));
            }
            SessionCommand::Completed(completion) => self.complete(completion).await,
            SessionCommand::Shutdown => {}
        }
        self.drain_changes().await;
    }

    // -------------------------------------------------------------------------
    // Entity lifecycle
    // -------------------------------------------------------------------------

    #[instrument(skip(self), fields(component = "filter_session", op = "switch_entity"))]
    async fn switch_entity(&mut self, entity_type: EntityType) -> Result<()> {
        self.slots.cancel_all();
        self.notifier.reset();
        if let Some(old) = self.bindings.take() {
            old.destroy();
        }
        while self.change_rx.try_recv().is_ok() {}

        let restored = self.load_persisted(entity_type).await;
        let mut bindings =
            FilterBindings::bind(entity_type, &restored, self.views.clone(), self.grouping);
        let expression = bindings.build();
        self.notifier.baseline(&expression)?;
        bindings.subscribe_all(&self.change_tx);

        self.bindings = Some(bindings);
        self.restored = restored;
        self.publish_context(expression.clone());
        info!(
            { ENTITY_TYPE } = %entity_type,
            { CLAUSE_COUNT } = expression.len(),
            "Filters restored"
        );
        self.bus.emit(FilterEvent::FiltersRestored {
            entity_type,
            expression,
        });

        self.fetch_filter_values(entity_type);
        self.fetch_user_lists();
        Ok(())
    }

    /// Persisted expression for `entity_type`, or an empty one when nothing
    /// usable is stored.
    async fn load_persisted(&mut self, entity_type: EntityType) -> FilterExpression {
        let key = entity_type.storage_key();
        match self.store.load(&key).await {
            Ok(Some(text)) => match FilterExpression::from_json(&text) {
                Ok(expr) => expr,
                Err(e) => {
                    warn!(key = %key, error = %e, "Failed to parse persisted filters, starting empty");
                    FilterExpression::new()
                }
            },
            Ok(None) => FilterExpression::new(),
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to load persisted filters");
                self.bus
                    .emit(FilterEvent::error(format!("Failed to load saved filters: {}", e)));
                FilterExpression::new()
            }
        }
    }

    async fn set_user_name(&mut self, user_name: Option<String>) -> Result<()> {
        let user_name = user_name
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty());
        if user_name == self.user_name {
            return Ok(());
        }
        self.user_name = user_name;
        self.force_reload_next = false;
        self.slots.cancel(RequestClass::UserLists);

        if let Some(bindings) = self.bindings.as_mut() {
            if bindings.unbind(FilterName::UserList) {
                self.evaluate().await;
            }
        }
        let expression = self.context_tx.borrow().expression.clone();
        self.publish_context(expression);
        self.fetch_user_lists();
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Edits & evaluation
    // -------------------------------------------------------------------------

    fn apply_edit(&mut self, filter: FilterName, edit: WidgetEdit) -> Result<bool> {
        let widget = self
            .bindings
            .as_mut()
            .ok_or_else(no_entity)?
            .get_mut(filter)
            .ok_or_else(|| Error::NotFound(format!("filter {} is not bound", filter)))?;
        widget.apply(edit)
    }

    async fn drain_changes(&mut self) {
        while let Ok(change) = self.change_rx.try_recv() {
            trace!({ FILTER } = %change.filter, commit = ?change.commit, "Widget changed");
            if self.notifier.on_change(change.commit) {
                self.evaluate().await;
            }
        }
    }

    /// Build, compare, persist and announce.
    async fn evaluate(&mut self) {
        let (entity_type, expression) = match self.bindings.as_ref() {
            Some(bindings) => (bindings.entity_type(), bindings.build()),
            None => return,
        };

        let json = match self.notifier.evaluate(&expression) {
            Ok(Settled::Changed(json)) => json,
            Ok(Settled::Unchanged) => return,
            Err(e) => {
                warn!(error = %e, "Failed to serialize filter expression");
                return;
            }
        };

        if let Err(e) = self.store.save(&entity_type.storage_key(), &json).await {
            warn!({ ENTITY_TYPE } = %entity_type, error = %e, "Failed to persist filters");
            self.bus
                .emit(FilterEvent::error(format!("Failed to save filters: {}", e)));
        }

        self.publish_context(expression.clone());
        info!(
            { ENTITY_TYPE } = %entity_type,
            { CLAUSE_COUNT } = expression.len(),
            "Filter expression changed"
        );
        self.bus.emit(FilterEvent::FilterChanged {
            entity_type,
            expression,
        });
    }

    fn publish_context(&self, expression: FilterExpression) {
        let entity_type = self.bindings.as_ref().map(FilterBindings::entity_type);
        let user_name = self.user_name.clone().unwrap_or_default();
        self.context_tx.send_replace(QueryContext {
            entity_type,
            user_name,
            expression,
        });
    }

    fn set_tag_grouping(&mut self, grouping: TagGrouping) {
        self.grouping = grouping;
        let Some(bindings) = self.bindings.as_mut() else {
            return;
        };
        if let Some(count) = bindings.set_tag_grouping(grouping) {
            self.bus.emit(FilterEvent::WhitelistUpdated {
                entity_type: bindings.entity_type(),
                filter: FilterName::Tag,
                count,
            });
        }
    }

    fn snapshot(&self) -> SessionSnapshot {
        let (entity_type, expression, widgets) = match self.bindings.as_ref() {
            Some(b) => (
                Some(b.entity_type()),
                b.build(),
                b.iter().map(|w| w.snapshot()).collect(),
            ),
            None => (None, FilterExpression::new(), Vec::new()),
        };
        SessionSnapshot {
            entity_type,
            user_name: self.user_name.clone(),
            state: self.notifier.state(),
            expression,
            widgets,
        }
    }

    // -------------------------------------------------------------------------
    // Backend requests
    // -------------------------------------------------------------------------

    /// Run `fut` in its own task and report back unless superseded.
    fn spawn_request<T, F, W>(&self, ticket: Ticket, fut: F, wrap: W)
    where
        T: Send + 'static,
        F: Future<Output = Result<T>> + Send + 'static,
        W: FnOnce(Ticket, Result<T>) -> Completion + Send + 'static,
    {
        let weak = self.weak_tx.clone();
        tokio::spawn(async move {
            let start = Instant::now();
            let Some(result) = ticket.run(fut).await else {
                trace!(class = ?ticket.class(), { GENERATION } = ticket.generation(), "Request cancelled");
                return;
            };
            trace!(
                class = ?ticket.class(),
                { DURATION_MS } = start.elapsed().as_millis() as u64,
                "Request finished"
            );
            if let Some(tx) = weak.upgrade() {
                let _ = tx.send(SessionCommand::Completed(wrap(ticket, result))).await;
            }
        });
    }

    fn fetch_filter_values(&self, entity_type: EntityType) {
        let ticket = self.slots.begin(RequestClass::FilterValues);
        let backend = self.backend.clone();
        self.spawn_request(
            ticket,
            async move { backend.filter_values(entity_type).await },
            |ticket, result| Completion::FilterValues { ticket, result },
        );
    }

    fn fetch_user_lists(&mut self) {
        let Some(entity_type) = self.bindings.as_ref().map(FilterBindings::entity_type) else {
            return;
        };
        if !entity_type.is_media() {
            return;
        }
        let Some(user_name) = self.user_name.clone() else {
            return;
        };

        let force_reload = std::mem::take(&mut self.force_reload_next);
        debug!({ ENTITY_TYPE } = %entity_type, force_reload, "Fetching user lists");
        let ticket = self.slots.begin(RequestClass::UserLists);
        let backend = self.backend.clone();
        self.spawn_request(
            ticket,
            async move {
                backend
                    .user_lists(&user_name, entity_type, force_reload)
                    .await
            },
            |ticket, result| Completion::UserLists { ticket, result },
        );
    }

    fn query(&mut self, filter: FilterName, input: String) -> Result<()> {
        let bindings = self.bindings.as_mut().ok_or_else(no_entity)?;
        let entity_type = bindings.entity_type();

        if filter == FilterName::Year {
            let count = bindings
                .year_shorthand(&input)
                .ok_or_else(|| Error::NotFound(format!("filter {} is not bound", filter)))?;
            self.bus.emit(FilterEvent::WhitelistUpdated {
                entity_type,
                filter,
                count,
            });
            return Ok(());
        }

        let widget = bindings
            .get_mut(filter)
            .ok_or_else(|| Error::NotFound(format!("filter {} is not bound", filter)))?;
        let source = widget.definition().typeahead().ok_or_else(|| {
            Error::InvalidInput(format!("filter {} has no typeahead lookup", filter))
        })?;

        let class = RequestClass::Typeahead(filter);
        if input.trim().is_empty() {
            self.slots.cancel(class);
            widget.set_loading(false);
            return Ok(());
        }

        widget.set_loading(true);
        let ticket = self.slots.begin(class);
        let backend = self.backend.clone();
        self.spawn_request(
            ticket,
            async move { backend.suggest(source, &input).await },
            move |ticket, result| Completion::Suggestions {
                ticket,
                filter,
                result,
            },
        );
        Ok(())
    }

    async fn complete(&mut self, completion: Completion) {
        match completion {
            Completion::FilterValues { ticket, result } => {
                if !self.slots.finish(&ticket) {
                    debug!("Discarding superseded filter values");
                    return;
                }
                self.apply_filter_values(result);
            }
            Completion::UserLists { ticket, result } => {
                if !self.slots.finish(&ticket) {
                    debug!("Discarding superseded user lists");
                    return;
                }
                self.apply_user_lists(result).await;
            }
            Completion::Suggestions {
                ticket,
                filter,
                result,
            } => {
                if !self.slots.finish(&ticket) {
                    debug!({ FILTER } = %filter, "Discarding superseded suggestions");
                    return;
                }
                self.apply_suggestions(filter, result);
            }
        }
    }

    fn apply_filter_values(&mut self, result: Result<FilterValues>) {
        let Some(bindings) = self.bindings.as_mut() else {
            return;
        };
        let entity_type = bindings.entity_type();
        let values = match result {
            Ok(values) => values,
            Err(e) => {
                warn!({ ENTITY_TYPE } = %entity_type, error = %e, "Failed to load filter values");
                self.bus
                    .emit(FilterEvent::error(format!("Failed to load filter values: {}", e)));
                return;
            }
        };

        for (filter, count) in bindings.apply_filter_values(&values) {
            self.bus.emit(FilterEvent::WhitelistUpdated {
                entity_type,
                filter,
                count,
            });
        }

        // New bounds are not a user edit; adopt them silently unless a
        // debounced edit is still waiting to be announced.
        if !self.notifier.is_pending() {
            let expression = bindings.build();
            if let Err(e) = self.notifier.baseline(&expression) {
                warn!(error = %e, "Failed to re-baseline after filter values");
                return;
            }
            self.publish_context(expression);
        }
    }

    async fn apply_user_lists(&mut self, result: Result<BackendReply<Vec<UserList>>>) {
        let reply = match result {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "Failed to load user lists");
                self.bus
                    .emit(FilterEvent::error(format!("Failed to load user lists: {}", e)));
                return;
            }
        };

        for notice in &reply.errors {
            self.bus.emit(FilterEvent::error(notice.message.clone()));
        }
        for notice in &reply.warnings {
            let hint = if notice.is_timeout() {
                self.force_reload_next = true;
                Some(FORCE_RELOAD_HINT.to_string())
            } else {
                None
            };
            self.bus
                .emit(FilterEvent::warning(notice.message.clone(), hint));
        }

        let Some(bindings) = self.bindings.as_mut() else {
            return;
        };
        let entity_type = bindings.entity_type();
        let first_bind = bindings.get(FilterName::UserList).is_none();
        let Some(count) =
            bindings.bind_user_lists(&reply.data, &self.restored, Some(&self.change_tx))
        else {
            return;
        };
        self.bus.emit(FilterEvent::WhitelistUpdated {
            entity_type,
            filter: FilterName::UserList,
            count,
        });

        if !first_bind {
            // Only lists deleted upstream can change the selection here.
            self.evaluate().await;
            return;
        }
        // A pending edit will settle with the picker included.
        if self.notifier.is_pending() {
            return;
        }
        // The picker joins late; its restored selection completes the
        // restore rather than counting as an edit.
        let expression = bindings.build();
        if let Err(e) = self.notifier.baseline(&expression) {
            warn!(error = %e, "Failed to re-baseline after user lists");
            return;
        }
        self.publish_context(expression.clone());
        debug!({ ENTITY_TYPE } = %entity_type, "User-list selection restored");
        self.bus.emit(FilterEvent::FiltersRestored {
            entity_type,
            expression,
        });
    }

    fn apply_suggestions(&mut self, filter: FilterName, result: Result<Vec<WhitelistEntry>>) {
        let Some(bindings) = self.bindings.as_mut() else {
            return;
        };
        let entity_type = bindings.entity_type();
        let Some(widget) = bindings.get_mut(filter) else {
            return;
        };
        widget.set_loading(false);

        match result {
            Ok(entries) => {
                let count = entries.len();
                widget.set_whitelist(entries);
                self.bus.emit(FilterEvent::WhitelistUpdated {
                    entity_type,
                    filter,
                    count,
                });
            }
            Err(e) => {
                warn!({ FILTER } = %filter, error = %e, "Typeahead lookup failed");
                self.bus
                    .emit(FilterEvent::error(format!("Lookup failed: {}", e)));
            }
        }
    }
}

fn no_entity() -> Error {
    Error::InvalidInput("no entity type selected".into())
}
