//! The ordered set of widgets bound for one entity type.

use std::sync::Arc;

use anitools_core::{
    build, filter_set, EntityType, FilterExpression, FilterKind, FilterName, FilterValues,
    RemoteSource, TagCatalog, TagGrouping, UserList, ValuesField, WhitelistEntry,
};
use tracing::{debug, info};

use crate::widget::{ChangeSink, ViewFactory, WidgetHandle};
use crate::years;

/// Widgets of one entity type in display order, plus the caches needed to
/// rebuild their whitelists locally.
pub struct FilterBindings {
    entity_type: EntityType,
    widgets: Vec<WidgetHandle>,
    views: Arc<dyn ViewFactory>,
    grouping: TagGrouping,
    tag_catalog: TagCatalog,
    year_cache: Vec<WhitelistEntry>,
}

impl FilterBindings {
    /// Bind every filter of `entity_type` from `restored`.
    ///
    /// The user-list picker is not bound here; it waits for
    /// [`bind_user_lists`](Self::bind_user_lists).
    pub fn bind(
        entity_type: EntityType,
        restored: &FilterExpression,
        views: Arc<dyn ViewFactory>,
        grouping: TagGrouping,
    ) -> Self {
        let widgets: Vec<WidgetHandle> = filter_set(entity_type)
            .iter()
            .map(FilterName::definition)
            .filter(|d| d.kind != FilterKind::UserList)
            .map(|d| {
                let view = views.create(&d, entity_type);
                WidgetHandle::bind(d, entity_type, restored.restore_value(&d), view)
            })
            .collect();

        info!(
            entity_type = %entity_type,
            widget_count = widgets.len(),
            restored_clauses = restored.len(),
            "Bound filter widgets"
        );

        Self {
            entity_type,
            widgets,
            views,
            grouping,
            tag_catalog: TagCatalog::default(),
            year_cache: Vec::new(),
        }
    }

    pub fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    pub fn len(&self) -> usize {
        self.widgets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &WidgetHandle> {
        self.widgets.iter()
    }

    pub fn get(&self, name: FilterName) -> Option<&WidgetHandle> {
        self.widgets.iter().find(|w| w.name() == name)
    }

    pub fn get_mut(&mut self, name: FilterName) -> Option<&mut WidgetHandle> {
        self.widgets.iter_mut().find(|w| w.name() == name)
    }

    pub fn grouping(&self) -> TagGrouping {
        self.grouping
    }

    /// Current expression of all bound widgets.
    pub fn build(&self) -> FilterExpression {
        build(self.widgets.iter().map(|w| (w.definition(), w.value())))
    }

    /// Report edits of every bound widget to `sink`.
    pub fn subscribe_all(&mut self, sink: &ChangeSink) {
        for widget in &mut self.widgets {
            widget.subscribe(sink.clone());
        }
    }

    /// Apply the `/filterValues` payload. Returns the filters whose
    /// whitelist or domain was replaced, with their new entry count.
    pub fn apply_filter_values(&mut self, values: &FilterValues) -> Vec<(FilterName, usize)> {
        self.tag_catalog = values.tags.clone();
        self.year_cache = values.whitelist(ValuesField::SeasonYear, self.grouping);

        let grouping = self.grouping;
        let mut updated = Vec::new();
        for widget in &mut self.widgets {
            match widget.definition().remote_source {
                Some(RemoteSource::Values(field)) => {
                    let entries = values.whitelist(field, grouping);
                    updated.push((widget.name(), entries.len()));
                    widget.set_whitelist(entries);
                }
                Some(RemoteSource::Bounds(field)) => {
                    if let Some(domain) = values.domain(field) {
                        widget.set_domain(domain);
                        updated.push((widget.name(), values.bounds(field).len()));
                    }
                }
                _ => {}
            }
        }
        debug!(
            entity_type = %self.entity_type,
            updated = updated.len(),
            "Applied filter values"
        );
        updated
    }

    /// Switch tag ordering using the cached catalog. Returns the new tag
    /// count when a tag picker is bound.
    pub fn set_tag_grouping(&mut self, grouping: TagGrouping) -> Option<usize> {
        self.grouping = grouping;
        let entries = self.tag_catalog.entries(grouping);
        let count = entries.len();
        let tag = self.get_mut(FilterName::Tag)?;
        tag.set_whitelist(entries);
        Some(count)
    }

    /// Rewrite the year whitelist for the shorthand typed so far. Returns
    /// the new entry count when a year picker is bound.
    pub fn year_shorthand(&mut self, input: &str) -> Option<usize> {
        let entries = years::expand(input, &self.year_cache);
        let count = entries.len();
        let year = self.get_mut(FilterName::Year)?;
        year.set_whitelist(entries);
        Some(count)
    }

    /// Bind (or rebind) the user-list picker. Returns the number of lists,
    /// or `None` when this entity type has no user-list filter or `lists`
    /// is empty.
    ///
    /// A rebind keeps the current selection, minus lists that no longer
    /// exist; `restored` only seeds the first bind.
    pub fn bind_user_lists(
        &mut self,
        lists: &[UserList],
        restored: &FilterExpression,
        sink: Option<&ChangeSink>,
    ) -> Option<usize> {
        let order = filter_set(self.entity_type);
        let position = order.iter().position(|n| *n == FilterName::UserList)?;
        if lists.is_empty() {
            return None;
        }

        let definition = FilterName::UserList.definition();
        let selection = match self.get(FilterName::UserList) {
            Some(bound) => Some(bound.value().clone()),
            None => restored.restore_value(&definition),
        };
        self.unbind(FilterName::UserList);

        let entries: Vec<WhitelistEntry> = lists.iter().map(UserList::to_whitelist_entry).collect();
        let view = self.views.create(&definition, self.entity_type);
        let mut handle = WidgetHandle::bind_user_list(
            definition,
            self.entity_type,
            entries,
            selection,
            view,
        );
        if let Some(sink) = sink {
            handle.subscribe(sink.clone());
        }

        // Keep display order: insert before the first widget that comes later.
        let index = self
            .widgets
            .iter()
            .position(|w| {
                order
                    .iter()
                    .position(|n| *n == w.name())
                    .is_some_and(|p| p > position)
            })
            .unwrap_or(self.widgets.len());
        self.widgets.insert(index, handle);
        Some(lists.len())
    }

    /// Destroy the widget bound for `name`. Returns whether one was bound.
    pub fn unbind(&mut self, name: FilterName) -> bool {
        match self.index_of(name) {
            Some(index) => {
                self.widgets.remove(index).destroy();
                true
            }
            None => false,
        }
    }

    /// Reset every widget except the user-list picker. Returns how many
    /// values changed.
    pub fn clear(&mut self) -> usize {
        self.widgets
            .iter_mut()
            .filter(|w| w.name() != FilterName::UserList)
            .map(|w| w.reset())
            .filter(|changed| *changed)
            .count()
    }

    /// Tear down every widget.
    pub fn destroy(self) {
        debug!(
            entity_type = %self.entity_type,
            widget_count = self.widgets.len(),
            "Destroying filter widgets"
        );
        for widget in self.widgets {
            widget.destroy();
        }
    }

    fn index_of(&self, name: FilterName) -> Option<usize> {
        self.widgets.iter().position(|w| w.name() == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widget::{NullViews, WidgetEdit};
    use anitools_core::{Clause, Combinator, FilterValue, RangeDomain, RangeValue, SetClause};
    use serde_json::json;

    fn bindings(entity_type: EntityType) -> FilterBindings {
        FilterBindings::bind(
            entity_type,
            &FilterExpression::new(),
            Arc::new(NullViews),
            TagGrouping::Grouped,
        )
    }

    fn filter_values() -> FilterValues {
        serde_json::from_value(json!({
            "format": ["TV", "MOVIE"],
            "genres": ["Action", "Drama", "Comedy"],
            "season_year": [2009, 2010, 2011],
            "tags": { "Theme": ["Isekai", "Time Skip"], "Cast": ["Ensemble"] },
            "episodes": [1, 12, 3000],
            "total_runtime": [0, 120000]
        }))
        .unwrap()
    }

    fn list(id: &str) -> UserList {
        UserList {
            id: id.to_string(),
            name: format!("List {}", id),
            amount_completed: None,
            amount_total: 4,
        }
    }

    #[test]
    fn test_bind_skips_user_list_and_keeps_order() {
        let b = bindings(EntityType::Anime);
        assert!(b.get(FilterName::UserList).is_none());
        let names: Vec<FilterName> = b.iter().map(|w| w.name()).collect();
        assert_eq!(names[0], FilterName::TitleLike);
        assert_eq!(names[2], FilterName::Format);
    }

    #[test]
    fn test_bind_restores_values() {
        let restored = FilterExpression::from_json(
            r#"{"and":{"genre":{"and":["Action"]},"showAdult":true}}"#,
        )
        .unwrap();
        let b = FilterBindings::bind(
            EntityType::Anime,
            &restored,
            Arc::new(NullViews),
            TagGrouping::Grouped,
        );
        assert_eq!(
            b.get(FilterName::ShowAdult).unwrap().value(),
            &FilterValue::Boolean { checked: true }
        );
        let rebuilt = serde_json::to_value(b.build()).unwrap();
        assert_eq!(rebuilt["and"]["genre"], json!({ "and": ["Action"] }));
    }

    #[test]
    fn test_apply_filter_values_sets_whitelists_and_domains() {
        let mut b = bindings(EntityType::Anime);
        let updated = b.apply_filter_values(&filter_values());

        assert!(updated.contains(&(FilterName::Genre, 3)));
        assert!(updated.contains(&(FilterName::Tag, 3)));
        assert!(updated.contains(&(FilterName::Episodes, 3)));
        assert!(!updated.iter().any(|(n, _)| *n == FilterName::Volumes));

        let episodes = b.get(FilterName::Episodes).unwrap();
        assert_eq!(episodes.domain(), RangeDomain::new(0, 3000));
        assert_eq!(
            episodes.value(),
            &FilterValue::Range(RangeValue::full(RangeDomain::new(0, 3000)))
        );

        let tags = b.get(FilterName::Tag).unwrap().whitelist();
        assert_eq!(tags[0].value, "Isekai");
        assert_eq!(tags[2].category.as_deref(), Some("Cast"));
    }

    #[test]
    fn test_tag_grouping_switch_uses_cache() {
        let mut b = bindings(EntityType::Anime);
        b.apply_filter_values(&filter_values());
        assert_eq!(b.set_tag_grouping(TagGrouping::Alphabetical), Some(3));
        let tags: Vec<&str> = b
            .get(FilterName::Tag)
            .unwrap()
            .whitelist()
            .iter()
            .map(|e| e.value.as_str())
            .collect();
        assert_eq!(tags, vec!["Ensemble", "Isekai", "Time Skip"]);

        let mut staff = bindings(EntityType::Staff);
        assert_eq!(staff.set_tag_grouping(TagGrouping::Grouped), None);
    }

    #[test]
    fn test_year_shorthand() {
        let mut b = bindings(EntityType::Anime);
        b.apply_filter_values(&filter_values());
        assert_eq!(b.year_shorthand("2009-"), Some(5));
        assert_eq!(b.year_shorthand("2009"), Some(3));
    }

    #[test]
    fn test_bind_user_lists_inserts_in_display_order() {
        let mut b = bindings(EntityType::Anime);
        assert_eq!(b.bind_user_lists(&[], &FilterExpression::new(), None), None);

        let count = b.bind_user_lists(&[list("1"), list("2")], &FilterExpression::new(), None);
        assert_eq!(count, Some(2));
        let names: Vec<FilterName> = b.iter().map(|w| w.name()).collect();
        assert_eq!(&names[..3], &[FilterName::TitleLike, FilterName::NotesLike, FilterName::UserList]);

        // Rebinding replaces rather than duplicates.
        b.bind_user_lists(&[list("3")], &FilterExpression::new(), None);
        assert_eq!(b.iter().filter(|w| w.name() == FilterName::UserList).count(), 1);

        let mut character = bindings(EntityType::Character);
        assert_eq!(character.bind_user_lists(&[list("1")], &FilterExpression::new(), None), None);
    }

    #[test]
    fn test_rebind_user_lists_keeps_selection() {
        let mut b = bindings(EntityType::Anime);
        let mut restored = FilterExpression::new();
        restored.insert(
            "userList",
            Clause::Set(SetClause::new(Combinator::And, vec!["1".into()], Vec::new())),
        );
        b.bind_user_lists(&[list("1"), list("2"), list("3")], &restored, None);

        let picker = b.get_mut(FilterName::UserList).unwrap();
        picker.apply(WidgetEdit::Add("2".into())).unwrap();
        picker.apply(WidgetEdit::Add("3".into())).unwrap();
        picker.apply(WidgetEdit::Remove("1".into())).unwrap();

        // List 3 was deleted upstream; the restored "1" must not come back.
        b.bind_user_lists(&[list("1"), list("2")], &restored, None);
        let expr = serde_json::to_value(b.build()).unwrap();
        assert_eq!(expr["and"]["userList"], json!({ "and": ["2"] }));
    }

    #[test]
    fn test_clear_keeps_user_list() {
        let mut b = bindings(EntityType::Anime);
        b.bind_user_lists(&[list("1"), list("2")], &FilterExpression::new(), None);
        let user_list = b.get_mut(FilterName::UserList).unwrap();
        user_list.apply(WidgetEdit::Add("2".into())).unwrap();
        b.get_mut(FilterName::Genre)
            .unwrap()
            .apply(WidgetEdit::Add("Drama".into()))
            .unwrap();

        assert_eq!(b.clear(), 1);
        let expr = serde_json::to_value(b.build()).unwrap();
        assert!(expr["and"].get("genre").is_none());
        assert_eq!(expr["and"]["userList"], json!({ "and": ["1", "2"] }));
    }
}
