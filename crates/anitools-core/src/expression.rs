//! The canonical, serializable filter expression.
//!
//! # Wire format
//!
//! ```json
//! {
//!   "and": {
//!     "genre": { "and": ["Action"], "not": ["Romance"] },
//!     "titleLike": { "regex": false, "value": "gundam" },
//!     "episodesMin": 0,
//!     "episodesMax": 50,
//!     "showAdult": true
//!   }
//! }
//! ```
//!
//! Clause keys are kept in a sorted map so that identical expressions always
//! serialize to identical bytes; the change notifier relies on that.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::definitions::{Combinator, FilterDefinition, FilterKind, FilterName};
use crate::error::{Error, Result};
use crate::value::{FilterValue, RangeDomain, RangeValue, SelectedValue, Selection, TextValue};

/// Text match that may be a regular expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatternClause {
    pub regex: bool,
    pub value: String,
}

/// Multi-value clause: `{ "and"|"or": [...], "not": [...] }`.
///
/// The tag clause may additionally carry the relocated tag-percentage bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSetClause", into = "RawSetClause")]
pub struct SetClause {
    pub combinator: Combinator,
    pub values: Vec<String>,
    pub excluded: Vec<String>,
    pub tag_percentage_min: Option<i64>,
    pub tag_percentage_max: Option<i64>,
}

impl SetClause {
    pub fn new(combinator: Combinator, values: Vec<String>, excluded: Vec<String>) -> Self {
        Self {
            combinator,
            values,
            excluded,
            tag_percentage_min: None,
            tag_percentage_max: None,
        }
    }

    /// Back into a widget selection: included values first, then excluded.
    pub fn to_selection(&self) -> Selection {
        let mut selection = Selection::new(self.combinator);
        for v in &self.values {
            selection.insert(SelectedValue::included(v.clone()));
        }
        for v in &self.excluded {
            selection.insert(SelectedValue::excluded(v.clone()));
        }
        selection
    }
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSetClause {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    and: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    or: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    not: Option<Vec<String>>,
    #[serde(
        rename = "tagPercentageMin",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    tag_percentage_min: Option<i64>,
    #[serde(
        rename = "tagPercentageMax",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    tag_percentage_max: Option<i64>,
}

impl TryFrom<RawSetClause> for SetClause {
    type Error = String;

    fn try_from(raw: RawSetClause) -> std::result::Result<Self, Self::Error> {
        let (combinator, values) = match (raw.and, raw.or) {
            (Some(values), None) => (Combinator::And, values),
            (None, Some(values)) => (Combinator::Or, values),
            _ => return Err("set clause needs exactly one of \"and\" / \"or\"".to_string()),
        };
        Ok(Self {
            combinator,
            values,
            excluded: raw.not.unwrap_or_default(),
            tag_percentage_min: raw.tag_percentage_min,
            tag_percentage_max: raw.tag_percentage_max,
        })
    }
}

impl From<SetClause> for RawSetClause {
    fn from(clause: SetClause) -> Self {
        let (and, or) = match clause.combinator {
            Combinator::And => (Some(clause.values), None),
            Combinator::Or => (None, Some(clause.values)),
        };
        Self {
            and,
            or,
            not: if clause.excluded.is_empty() {
                None
            } else {
                Some(clause.excluded)
            },
            tag_percentage_min: clause.tag_percentage_min,
            tag_percentage_max: clause.tag_percentage_max,
        }
    }
}

/// One entry of the clause map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Clause {
    Flag(bool),
    Bound(i64),
    Text(String),
    Pattern(PatternClause),
    Set(SetClause),
}

/// Complete filter expression, always an outer `and` over the clause map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterExpression {
    #[serde(default)]
    pub and: BTreeMap<String, Clause>,
}

impl FilterExpression {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.and.is_empty()
    }

    pub fn len(&self) -> usize {
        self.and.len()
    }

    pub fn get(&self, key: &str) -> Option<&Clause> {
        self.and.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.and.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, clause: Clause) -> Option<Clause> {
        self.and.insert(key.into(), clause)
    }

    pub fn remove(&mut self, key: &str) -> Option<Clause> {
        self.and.remove(key)
    }

    /// Serialized form used for persistence, diffing, and the wire.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Nest the tag-percentage bounds inside the `tag` clause.
    ///
    /// The bounds only mean something relative to the selected tags: without
    /// a `tag` set clause they are dropped. Applying this twice is a no-op.
    pub fn relocate_tag_percentage(&mut self) {
        let min_key = FilterName::TagPercentage.min_key();
        let max_key = FilterName::TagPercentage.max_key();
        if !self.and.contains_key(&min_key) && !self.and.contains_key(&max_key) {
            return;
        }

        let min = self.bound(&min_key);
        let max = self.bound(&max_key);
        self.and.remove(&min_key);
        self.and.remove(&max_key);

        if let Some(Clause::Set(tag)) = self.and.get_mut(FilterName::Tag.as_str()) {
            tag.tag_percentage_min = min;
            tag.tag_percentage_max = max;
        }
    }

    /// Fold the table's search box into the expression.
    pub fn with_search(mut self, key: &str, search: &str) -> Self {
        if !search.is_empty() {
            self.and
                .insert(key.to_string(), Clause::Text(search.to_string()));
        }
        self
    }

    fn bound(&self, key: &str) -> Option<i64> {
        match self.and.get(key) {
            Some(Clause::Bound(v)) => Some(*v),
            _ => None,
        }
    }

    /// Recover the widget value a definition had when this expression was
    /// built. Returns `None` when the expression holds no (or a mismatched)
    /// clause for it.
    pub fn restore_value(&self, definition: &FilterDefinition) -> Option<FilterValue> {
        let name = definition.name;
        match definition.kind {
            FilterKind::Text => match self.and.get(name.as_str())? {
                Clause::Text(text) => Some(FilterValue::Text(TextValue::new(text.clone()))),
                Clause::Pattern(p) => Some(FilterValue::Text(TextValue {
                    text: p.value.clone(),
                    regex_mode: p.regex,
                })),
                _ => None,
            },
            FilterKind::MultiValue => match self.and.get(name.as_str())? {
                Clause::Set(set) => Some(FilterValue::MultiValue(set.to_selection())),
                _ => None,
            },
            FilterKind::UserList => match self.and.get(name.as_str())? {
                Clause::Set(set) => Some(FilterValue::UserList(set.to_selection())),
                _ => None,
            },
            FilterKind::Boolean => match self.and.get(name.as_str())? {
                Clause::Flag(checked) => Some(FilterValue::Boolean { checked: *checked }),
                _ => None,
            },
            FilterKind::Range => {
                let (min, max) = self.range_bounds(name)?;
                let initial = RangeDomain::initial(definition);
                let domain = match definition.fixed_domain {
                    Some(_) => initial,
                    None => RangeDomain::new(min.min(initial.lo), max.max(initial.hi)),
                };
                Some(FilterValue::Range(RangeValue::new(min, max, domain)))
            }
        }
    }

    fn range_bounds(&self, name: FilterName) -> Option<(i64, i64)> {
        let top = (self.bound(&name.min_key()), self.bound(&name.max_key()));
        if let (Some(min), Some(max)) = top {
            return Some((min, max));
        }
        if name == FilterName::TagPercentage {
            if let Some(Clause::Set(tag)) = self.and.get(FilterName::Tag.as_str()) {
                return tag.tag_percentage_min.zip(tag.tag_percentage_max);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tag_clause(values: &[&str]) -> Clause {
        Clause::Set(SetClause::new(
            Combinator::And,
            values.iter().map(|v| v.to_string()).collect(),
            vec![],
        ))
    }

    #[test]
    fn test_set_clause_serializes_combinator_key() {
        let clause = Clause::Set(SetClause::new(
            Combinator::Or,
            vec!["TV".into()],
            vec!["OVA".into()],
        ));
        assert_eq!(
            serde_json::to_value(&clause).unwrap(),
            json!({ "or": ["TV"], "not": ["OVA"] })
        );
    }

    #[test]
    fn test_set_clause_omits_empty_not() {
        let clause = tag_clause(&["Isekai"]);
        assert_eq!(
            serde_json::to_value(&clause).unwrap(),
            json!({ "and": ["Isekai"] })
        );
    }

    #[test]
    fn test_clause_variants_deserialize() {
        let expr: FilterExpression = serde_json::from_value(json!({
            "and": {
                "showAdult": true,
                "episodesMin": 3,
                "notesLike": "rewatch",
                "titleLike": { "regex": true, "value": "/^a/i" },
                "genre": { "or": ["Drama"], "not": ["Ecchi"] }
            }
        }))
        .unwrap();

        assert_eq!(expr.get("showAdult"), Some(&Clause::Flag(true)));
        assert_eq!(expr.get("episodesMin"), Some(&Clause::Bound(3)));
        assert_eq!(
            expr.get("notesLike"),
            Some(&Clause::Text("rewatch".into()))
        );
        assert!(matches!(expr.get("titleLike"), Some(Clause::Pattern(p)) if p.regex));
        match expr.get("genre") {
            Some(Clause::Set(set)) => {
                assert_eq!(set.combinator, Combinator::Or);
                assert_eq!(set.excluded, vec!["Ecchi".to_string()]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_set_clause_rejects_both_combinators() {
        let result: std::result::Result<SetClause, _> =
            serde_json::from_value(json!({ "and": ["a"], "or": ["b"] }));
        assert!(result.is_err());
    }

    #[test]
    fn test_relocation_moves_bounds_into_tag() {
        let mut expr = FilterExpression::new();
        expr.insert("tag", tag_clause(&["Isekai"]));
        expr.insert("tagPercentageMin", Clause::Bound(10));
        expr.insert("tagPercentageMax", Clause::Bound(90));

        expr.relocate_tag_percentage();

        assert_eq!(
            serde_json::to_value(&expr).unwrap(),
            json!({ "and": { "tag": { "and": ["Isekai"], "tagPercentageMin": 10, "tagPercentageMax": 90 } } })
        );
    }

    #[test]
    fn test_relocation_drops_dangling_bounds() {
        let mut expr = FilterExpression::new();
        expr.insert("tagPercentageMin", Clause::Bound(10));
        expr.insert("tagPercentageMax", Clause::Bound(90));

        expr.relocate_tag_percentage();
        assert!(expr.is_empty());
    }

    #[test]
    fn test_relocation_is_idempotent() {
        let mut expr = FilterExpression::new();
        expr.insert("tag", tag_clause(&["Mecha"]));
        expr.insert("tagPercentageMin", Clause::Bound(0));
        expr.insert("tagPercentageMax", Clause::Bound(100));
        expr.relocate_tag_percentage();
        let once = expr.to_json().unwrap();
        expr.relocate_tag_percentage();
        assert_eq!(expr.to_json().unwrap(), once);
    }

    #[test]
    fn test_with_search_skips_empty() {
        let expr = FilterExpression::new().with_search("title_like", "");
        assert!(expr.is_empty());

        let expr = FilterExpression::new().with_search("title_like", "eva");
        assert_eq!(expr.get("title_like"), Some(&Clause::Text("eva".into())));
    }

    #[test]
    fn test_restore_tag_percentage_from_tag_clause() {
        let mut expr = FilterExpression::new();
        let mut tag = SetClause::new(Combinator::And, vec!["Isekai".into()], vec![]);
        tag.tag_percentage_min = Some(10);
        tag.tag_percentage_max = Some(90);
        expr.insert("tag", Clause::Set(tag));

        let value = expr
            .restore_value(&FilterName::TagPercentage.definition())
            .unwrap();
        match value {
            FilterValue::Range(r) => assert_eq!((r.min(), r.max()), (10, 90)),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_restore_range_beyond_placeholder_domain() {
        let mut expr = FilterExpression::new();
        expr.insert("totalRuntimeMin", Clause::Bound(100));
        expr.insert("totalRuntimeMax", Clause::Bound(20000));

        let value = expr
            .restore_value(&FilterName::TotalRuntime.definition())
            .unwrap();
        match value {
            FilterValue::Range(r) => assert_eq!((r.min(), r.max()), (100, 20000)),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_restore_mismatched_clause_is_none() {
        let mut expr = FilterExpression::new();
        expr.insert("genre", Clause::Text("Action".into()));
        assert!(expr.restore_value(&FilterName::Genre.definition()).is_none());
        assert!(expr.restore_value(&FilterName::Format.definition()).is_none());
    }
}
