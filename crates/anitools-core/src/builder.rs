//! Pure translation of widget values into a [`FilterExpression`].
//!
//! The builder never touches widgets or the network: it takes definitions
//! paired with their current values and emits the canonical expression.
//! Empty text, empty selections, unchecked booleans and text failing its
//! input mask are omitted. Ranges always emit both bounds.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, trace};

use crate::definitions::{FilterDefinition, FilterKind, DATE_MASK};
use crate::expression::{Clause, FilterExpression, PatternClause, SetClause};
use crate::logging::{CLAUSE_COUNT, FILTER};
use crate::value::FilterValue;

static DATE_MASK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(DATE_MASK).expect("date mask is a valid regex"));

fn mask_matches(mask: &str, text: &str) -> bool {
    if mask == DATE_MASK {
        return DATE_MASK_RE.is_match(text);
    }
    Regex::new(mask)
        .map(|re| re.is_match(text))
        .unwrap_or(false)
}

/// Build the expression for a set of (definition, value) pairs.
///
/// A value whose kind does not match its definition is skipped.
pub fn build<'a, I>(entries: I) -> FilterExpression
where
    I: IntoIterator<Item = (&'a FilterDefinition, &'a FilterValue)>,
{
    let mut expr = FilterExpression::new();

    for (definition, value) in entries {
        if value.kind() != definition.kind {
            debug!(
                { FILTER } = %definition.name,
                expected = ?definition.kind,
                actual = ?value.kind(),
                "Skipping value of mismatched kind"
            );
            continue;
        }
        append(&mut expr, definition, value);
    }

    expr.relocate_tag_percentage();
    trace!({ CLAUSE_COUNT } = expr.len(), "Built filter expression");
    expr
}

fn append(expr: &mut FilterExpression, definition: &FilterDefinition, value: &FilterValue) {
    let key = definition.name.as_str();
    match value {
        FilterValue::Text(text) => {
            if text.text.is_empty() {
                return;
            }
            if let Some(mask) = definition.mask {
                if !mask_matches(mask, &text.text) {
                    trace!({ FILTER } = key, "Text does not satisfy input mask");
                    return;
                }
            }
            let clause = if definition.supports_regex {
                Clause::Pattern(PatternClause {
                    regex: text.regex_mode,
                    value: text.text.clone(),
                })
            } else {
                Clause::Text(text.text.clone())
            };
            expr.insert(key, clause);
        }
        FilterValue::MultiValue(selection) | FilterValue::UserList(selection) => {
            if selection.is_empty() {
                return;
            }
            let (included, excluded) = selection.partition();
            expr.insert(
                key,
                Clause::Set(SetClause::new(selection.combinator, included, excluded)),
            );
        }
        FilterValue::Range(range) => {
            expr.insert(definition.name.min_key(), Clause::Bound(range.min()));
            expr.insert(definition.name.max_key(), Clause::Bound(range.max()));
        }
        FilterValue::Boolean { checked } => {
            if *checked {
                expr.insert(key, Clause::Flag(true));
            }
        }
    }
}

/// Whether text typed into a masked filter would currently be emitted.
pub fn satisfies_mask(definition: &FilterDefinition, text: &str) -> bool {
    match definition.mask {
        Some(mask) => mask_matches(mask, text),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definitions::{Combinator, FilterName};
    use crate::value::{RangeDomain, RangeValue, SelectedValue, Selection, TextValue};
    use serde_json::json;

    fn def(name: FilterName) -> FilterDefinition {
        name.definition()
    }

    #[test]
    fn test_empty_values_emit_nothing() {
        let defs = [
            def(FilterName::TitleLike),
            def(FilterName::Genre),
            def(FilterName::ShowAdult),
        ];
        let values: Vec<FilterValue> = defs.iter().map(FilterValue::neutral).collect();
        let expr = build(defs.iter().zip(values.iter()));
        assert!(expr.is_empty());
    }

    #[test]
    fn test_regex_text_emits_pattern_clause() {
        let d = def(FilterName::TitleLike);
        let v = FilterValue::Text(TextValue::regex("^Gundam"));
        let expr = build([(&d, &v)]);
        assert_eq!(
            serde_json::to_value(&expr).unwrap(),
            json!({ "and": { "titleLike": { "regex": true, "value": "^Gundam" } } })
        );
    }

    #[test]
    fn test_plain_text_emits_string() {
        let d = def(FilterName::NotesLike);
        let v = FilterValue::Text(TextValue::new("rewatch"));
        let expr = build([(&d, &v)]);
        assert_eq!(
            serde_json::to_value(&expr).unwrap(),
            json!({ "and": { "notesLike": "rewatch" } })
        );
    }

    #[test]
    fn test_masked_text_requires_match() {
        let d = def(FilterName::AiringStart);
        let partial = FilterValue::Text(TextValue::new("2019-0"));
        assert!(build([(&d, &partial)]).is_empty());

        let full = FilterValue::Text(TextValue::new("2019-*-*"));
        let expr = build([(&d, &full)]);
        assert_eq!(
            expr.get("airingStart"),
            Some(&Clause::Text("2019-*-*".into()))
        );
    }

    #[test]
    fn test_satisfies_mask() {
        let d = def(FilterName::BirthdayFrom);
        assert!(satisfies_mask(&d, "*-12-24"));
        assert!(!satisfies_mask(&d, "1990-13-01"));
        assert!(satisfies_mask(&def(FilterName::NotesLike), "anything"));
    }

    #[test]
    fn test_exclusions_partition_into_not() {
        let d = def(FilterName::Genre);
        let v = FilterValue::MultiValue(
            Selection::new(Combinator::And)
                .with(SelectedValue::included("Action"))
                .with(SelectedValue::excluded("Romance"))
                .with(SelectedValue::included("Drama")),
        );
        let expr = build([(&d, &v)]);
        assert_eq!(
            serde_json::to_value(&expr).unwrap(),
            json!({ "and": { "genre": { "and": ["Action", "Drama"], "not": ["Romance"] } } })
        );
    }

    #[test]
    fn test_range_emits_sibling_bounds() {
        let d = def(FilterName::Episodes);
        let v = FilterValue::Range(RangeValue::new(0, 50, RangeDomain::new(0, 3000)));
        let expr = build([(&d, &v)]);
        assert_eq!(
            serde_json::to_value(&expr).unwrap(),
            json!({ "and": { "episodesMin": 0, "episodesMax": 50 } })
        );
    }

    #[test]
    fn test_tag_percentage_nested_under_tag() {
        let tag = def(FilterName::Tag);
        let pct = def(FilterName::TagPercentage);
        let tag_value =
            FilterValue::MultiValue(Selection::new(Combinator::And).with(SelectedValue::included("Isekai")));
        let pct_value = FilterValue::Range(RangeValue::new(10, 90, RangeDomain::new(0, 100)));

        let expr = build([(&tag, &tag_value), (&pct, &pct_value)]);
        assert_eq!(
            serde_json::to_value(&expr).unwrap(),
            json!({ "and": { "tag": { "and": ["Isekai"], "tagPercentageMin": 10, "tagPercentageMax": 90 } } })
        );
    }

    #[test]
    fn test_tag_percentage_dropped_without_tags() {
        let pct = def(FilterName::TagPercentage);
        let v = FilterValue::Range(RangeValue::new(10, 90, RangeDomain::new(0, 100)));
        assert!(build([(&pct, &v)]).is_empty());
    }

    #[test]
    fn test_mismatched_kind_is_skipped() {
        let d = def(FilterName::Genre);
        let v = FilterValue::Boolean { checked: true };
        assert!(build([(&d, &v)]).is_empty());
    }

    #[test]
    fn test_build_is_deterministic() {
        let a = def(FilterName::ShowAdult);
        let b = def(FilterName::NotesLike);
        let va = FilterValue::Boolean { checked: true };
        let vb = FilterValue::Text(TextValue::new("x"));
        let first = build([(&a, &va), (&b, &vb)]).to_json().unwrap();
        let second = build([(&b, &vb), (&a, &va)]).to_json().unwrap();
        assert_eq!(first, second);
    }
}
