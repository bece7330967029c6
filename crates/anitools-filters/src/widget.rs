//! Widget bindings.
//!
//! A [`WidgetHandle`] owns the live [`FilterValue`] of one filter together
//! with its whitelist, numeric domain and loading flag. Rendering is
//! delegated to an opaque [`WidgetView`]; user edits arrive through
//! [`WidgetHandle::apply`] and are reported to the subscribed change sink.

use anitools_core::{
    Combinator, EntityType, Error, FilterDefinition, FilterKind, FilterName, FilterValue,
    RangeDomain, RangeValue, Result, SelectedValue, Selection, WhitelistEntry,
};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, trace};

// =============================================================================
// EDITS & CHANGES
// =============================================================================

/// How quickly an edit settles into the expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commit {
    /// Typed input; waits out the debounce window.
    Debounced,
    /// Discrete input; evaluated at once.
    Immediate,
}

/// A user edit to one widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WidgetEdit {
    /// Replace the text of a text box.
    Type(String),
    /// Flip regex mode of a regex-capable text box.
    ToggleRegex,
    /// Select a value of a picker.
    Add(String),
    /// Deselect a value of a picker.
    Remove(String),
    /// Flip the excluded flag of a selected value.
    ToggleExcluded(String),
    /// Flip between AND and OR.
    ToggleCombinator,
    /// Typed into the range's min field.
    SetMin(i64),
    /// Typed into the range's max field.
    SetMax(i64),
    /// Slider released at `[min, max]`.
    Slide { min: i64, max: i64 },
    /// Checkbox set.
    Check(bool),
}

impl WidgetEdit {
    pub fn commit(&self) -> Commit {
        match self {
            WidgetEdit::Type(_) | WidgetEdit::SetMin(_) | WidgetEdit::SetMax(_) => {
                Commit::Debounced
            }
            _ => Commit::Immediate,
        }
    }
}

/// Notification that a widget's value changed through a user edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WidgetChange {
    pub filter: FilterName,
    pub commit: Commit,
}

pub type ChangeSink = mpsc::UnboundedSender<WidgetChange>;

// =============================================================================
// VIEWS
// =============================================================================

/// Everything a view needs to draw a widget.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetSnapshot {
    pub filter: FilterName,
    pub label: &'static str,
    pub value: FilterValue,
    pub whitelist: Vec<WhitelistEntry>,
    /// Only set for range widgets.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<RangeDomain>,
    pub loading: bool,
}

/// Opaque rendering capability of a widget.
pub trait WidgetView: Send + Sync {
    fn render(&mut self, snapshot: &WidgetSnapshot);

    fn set_loading(&mut self, _loading: bool) {}

    fn destroy(&mut self) {}
}

/// Creates a view for each bound widget.
pub trait ViewFactory: Send + Sync {
    fn create(&self, definition: &FilterDefinition, entity_type: EntityType)
        -> Box<dyn WidgetView>;
}

/// View that draws nothing. Used by headless sessions.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullView;

impl WidgetView for NullView {
    fn render(&mut self, _snapshot: &WidgetSnapshot) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullViews;

impl ViewFactory for NullViews {
    fn create(&self, _: &FilterDefinition, _: EntityType) -> Box<dyn WidgetView> {
        Box::new(NullView)
    }
}

// =============================================================================
// HANDLE
// =============================================================================

/// A bound filter widget.
pub struct WidgetHandle {
    definition: FilterDefinition,
    entity_type: EntityType,
    value: FilterValue,
    whitelist: Vec<WhitelistEntry>,
    domain: RangeDomain,
    loading: bool,
    view: Box<dyn WidgetView>,
    sink: Option<ChangeSink>,
}

impl WidgetHandle {
    /// Bind a widget, restoring `restored` without reporting a change.
    ///
    /// A restored value of the wrong kind is ignored. Restored ranges
    /// widen the initial domain if they lie outside it.
    pub fn bind(
        definition: FilterDefinition,
        entity_type: EntityType,
        restored: Option<FilterValue>,
        view: Box<dyn WidgetView>,
    ) -> Self {
        let mut domain = RangeDomain::initial(&definition);
        let value = match restored {
            Some(value) if value.kind() == definition.kind => {
                if let FilterValue::Range(range) = &value {
                    domain = RangeDomain::new(domain.lo.min(range.min()), domain.hi.max(range.max()));
                }
                value
            }
            Some(value) => {
                debug!(
                    filter = %definition.name,
                    kind = ?value.kind(),
                    "Ignoring restored value of mismatched kind"
                );
                FilterValue::neutral(&definition)
            }
            None => FilterValue::neutral(&definition),
        };

        let mut handle = Self {
            definition,
            entity_type,
            value,
            whitelist: Vec::new(),
            domain,
            loading: false,
            view,
            sink: None,
        };
        handle.render();
        handle
    }

    /// Bind the user-list picker over the user's lists.
    ///
    /// Restored selections keep only lists that still exist; with nothing
    /// left the first list is selected.
    pub fn bind_user_list(
        definition: FilterDefinition,
        entity_type: EntityType,
        lists: Vec<WhitelistEntry>,
        restored: Option<FilterValue>,
        view: Box<dyn WidgetView>,
    ) -> Self {
        let mut handle = Self::bind(definition, entity_type, None, view);
        handle.whitelist = lists;

        let mut selection = match restored {
            Some(FilterValue::UserList(selection)) => selection,
            _ => Selection::new(definition.default_combinator),
        };
        let whitelist = &handle.whitelist;
        selection
            .entries
            .retain(|e| whitelist.iter().any(|w| w.value == e.value));
        handle.value = if selection.is_empty() {
            handle.first_user_list()
        } else {
            FilterValue::UserList(selection)
        };
        handle.render();
        handle
    }

    pub fn name(&self) -> FilterName {
        self.definition.name
    }

    pub fn definition(&self) -> &FilterDefinition {
        &self.definition
    }

    pub fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    pub fn value(&self) -> &FilterValue {
        &self.value
    }

    pub fn whitelist(&self) -> &[WhitelistEntry] {
        &self.whitelist
    }

    pub fn domain(&self) -> RangeDomain {
        self.domain
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn snapshot(&self) -> WidgetSnapshot {
        WidgetSnapshot {
            filter: self.definition.name,
            label: self.definition.label_for(self.entity_type),
            value: self.value.clone(),
            whitelist: self.whitelist.clone(),
            domain: (self.definition.kind == FilterKind::Range).then_some(self.domain),
            loading: self.loading,
        }
    }

    /// Report user edits to `sink` from now on.
    pub fn subscribe(&mut self, sink: ChangeSink) {
        self.sink = Some(sink);
    }

    pub fn is_subscribed(&self) -> bool {
        self.sink.is_some()
    }

    /// Replace the value programmatically. Never reports a change.
    pub fn set_value(&mut self, value: FilterValue) -> Result<()> {
        if value.kind() != self.definition.kind {
            return Err(Error::InvalidInput(format!(
                "{} expects a {:?} value",
                self.definition.name, self.definition.kind
            )));
        }
        let value = match value {
            FilterValue::Range(range) => {
                FilterValue::Range(RangeValue::new(range.min(), range.max(), self.domain))
            }
            FilterValue::MultiValue(selection) | FilterValue::UserList(selection)
                if self.definition.enforce_whitelist =>
            {
                if let Some(entry) = selection.entries.iter().find(|e| !self.in_whitelist(&e.value)) {
                    return Err(Error::Validation(format!(
                        "{} is not a valid {}",
                        entry.value, self.definition.label
                    )));
                }
                match self.definition.kind {
                    FilterKind::UserList => FilterValue::UserList(selection),
                    _ => FilterValue::MultiValue(selection),
                }
            }
            other => other,
        };
        self.value = value;
        self.render();
        Ok(())
    }

    /// Return to the neutral value. Returns whether the value changed.
    pub fn reset(&mut self) -> bool {
        let neutral = match self.definition.kind {
            FilterKind::Range => FilterValue::Range(RangeValue::full(self.domain)),
            FilterKind::UserList => self.first_user_list(),
            _ => FilterValue::neutral(&self.definition),
        };
        if neutral == self.value {
            return false;
        }
        self.value = neutral;
        self.render();
        true
    }

    /// Tear down the view. Pending notifications are dropped with the sink.
    pub fn destroy(mut self) {
        trace!(filter = %self.definition.name, "Destroying widget");
        self.sink = None;
        self.view.destroy();
    }

    /// Apply a user edit. Returns whether the value changed; changes are
    /// reported to the subscribed sink.
    pub fn apply(&mut self, edit: WidgetEdit) -> Result<bool> {
        let commit = edit.commit();
        let changed = self.mutate(edit)?;
        if changed {
            self.render();
            if let Some(sink) = &self.sink {
                let _ = sink.send(WidgetChange {
                    filter: self.definition.name,
                    commit,
                });
            }
        }
        Ok(changed)
    }

    fn mutate(&mut self, edit: WidgetEdit) -> Result<bool> {
        let definition = self.definition;
        let domain = self.domain;
        let enforced = definition.enforce_whitelist;
        let known = enforced.then(|| self.whitelist.clone());

        match (&mut self.value, edit) {
            (FilterValue::Text(text), WidgetEdit::Type(input)) => {
                if text.text == input {
                    return Ok(false);
                }
                text.text = input;
                Ok(true)
            }
            (FilterValue::Text(text), WidgetEdit::ToggleRegex) => {
                if !definition.supports_regex {
                    return Err(unsupported(&definition, "regex mode"));
                }
                text.regex_mode = !text.regex_mode;
                Ok(true)
            }
            (
                FilterValue::MultiValue(selection) | FilterValue::UserList(selection),
                WidgetEdit::Add(value),
            ) => {
                if let Some(known) = known {
                    if !known.iter().any(|w| w.value == value) {
                        return Err(Error::Validation(format!(
                            "{} is not a valid {}",
                            value, definition.label
                        )));
                    }
                }
                Ok(selection.insert(SelectedValue::included(value)))
            }
            (
                FilterValue::MultiValue(selection) | FilterValue::UserList(selection),
                WidgetEdit::Remove(value),
            ) => Ok(selection.remove(&value)),
            (
                FilterValue::MultiValue(selection) | FilterValue::UserList(selection),
                WidgetEdit::ToggleExcluded(value),
            ) => {
                if !definition.supports_exclude {
                    return Err(unsupported(&definition, "exclusion"));
                }
                if definition.kind == FilterKind::UserList && selection.combinator != Combinator::And
                {
                    return Err(Error::InvalidInput(format!(
                        "{} can only exclude while combined with AND",
                        definition.label
                    )));
                }
                Ok(selection.toggle_excluded(&value))
            }
            (
                FilterValue::MultiValue(selection) | FilterValue::UserList(selection),
                WidgetEdit::ToggleCombinator,
            ) => {
                if !definition.allows_combinator_switch() {
                    return Err(unsupported(&definition, "switching the combinator"));
                }
                selection.combinator = selection.combinator.toggled();
                Ok(true)
            }
            (FilterValue::Range(range), WidgetEdit::SetMin(v)) => {
                let before = *range;
                range.set_min(v, domain);
                Ok(*range != before)
            }
            (FilterValue::Range(range), WidgetEdit::SetMax(v)) => {
                let before = *range;
                range.set_max(v, domain);
                Ok(*range != before)
            }
            (FilterValue::Range(range), WidgetEdit::Slide { min, max }) => {
                let next = RangeValue::new(min, max, domain);
                if next == *range {
                    return Ok(false);
                }
                *range = next;
                Ok(true)
            }
            (FilterValue::Boolean { checked }, WidgetEdit::Check(next)) => {
                if *checked == next {
                    return Ok(false);
                }
                *checked = next;
                Ok(true)
            }
            (value, edit) => Err(Error::InvalidInput(format!(
                "{:?} does not apply to the {:?} widget {}",
                edit,
                value.kind(),
                definition.name
            ))),
        }
    }

    /// Replace the whitelist. Selected values are kept.
    pub fn set_whitelist(&mut self, entries: Vec<WhitelistEntry>) {
        self.whitelist = entries;
        self.render();
    }

    /// Replace the numeric domain of a range widget.
    ///
    /// A range spanning the whole old domain expands to the new one; any
    /// other range is clamped into it. Returns false for non-range widgets.
    pub fn set_domain(&mut self, domain: RangeDomain) -> bool {
        let old = self.domain;
        let FilterValue::Range(range) = &mut self.value else {
            return false;
        };
        *range = if range.is_full(old) {
            RangeValue::full(domain)
        } else {
            RangeValue::new(range.min(), range.max(), domain)
        };
        self.domain = domain;
        self.render();
        true
    }

    pub fn set_loading(&mut self, loading: bool) {
        if self.loading != loading {
            self.loading = loading;
            self.view.set_loading(loading);
        }
    }

    fn in_whitelist(&self, value: &str) -> bool {
        self.whitelist.iter().any(|w| w.value == value)
    }

    fn first_user_list(&self) -> FilterValue {
        let mut selection = Selection::new(self.definition.default_combinator);
        if let Some(first) = self.whitelist.first() {
            selection.insert(SelectedValue::included(first.value.clone()));
        }
        FilterValue::UserList(selection)
    }

    fn render(&mut self) {
        let snapshot = self.snapshot();
        self.view.render(&snapshot);
    }
}

impl std::fmt::Debug for WidgetHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WidgetHandle")
            .field("filter", &self.definition.name)
            .field("value", &self.value)
            .field("whitelist", &self.whitelist.len())
            .field("domain", &self.domain)
            .field("loading", &self.loading)
            .finish()
    }
}

fn unsupported(definition: &FilterDefinition, what: &str) -> Error {
    Error::InvalidInput(format!("{} does not support {}", definition.name, what))
}
