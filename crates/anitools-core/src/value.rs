//! Live filter values bound to widgets.
//!
//! A [`FilterValue`] is the data half of a widget: the expression builder
//! only ever sees these, never the widget that produced them.

use serde::{Deserialize, Serialize};

use crate::defaults::{RANGE_HI_PLACEHOLDER, RANGE_LO};
use crate::definitions::{Combinator, FilterDefinition, FilterKind};

/// Free-text input, optionally interpreted as a regular expression.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextValue {
    pub text: String,
    #[serde(default)]
    pub regex_mode: bool,
}

impl TextValue {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            regex_mode: false,
        }
    }

    pub fn regex(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            regex_mode: true,
        }
    }
}

/// One selected value of a multi-value picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedValue {
    pub value: String,
    #[serde(default)]
    pub excluded: bool,
}

impl SelectedValue {
    pub fn included(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            excluded: false,
        }
    }

    pub fn excluded(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            excluded: true,
        }
    }
}

/// Ordered selection of a multi-value picker or user-list picker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub entries: Vec<SelectedValue>,
    pub combinator: Combinator,
}

impl Selection {
    pub fn new(combinator: Combinator) -> Self {
        Self {
            entries: Vec::new(),
            combinator,
        }
    }

    /// Builder-style insert; duplicates are ignored.
    pub fn with(mut self, entry: SelectedValue) -> Self {
        self.insert(entry);
        self
    }

    /// Insert a value keeping first-insertion order. Returns false if the
    /// value was already selected.
    pub fn insert(&mut self, entry: SelectedValue) -> bool {
        if self.contains(&entry.value) {
            return false;
        }
        self.entries.push(entry);
        true
    }

    pub fn remove(&mut self, value: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.value != value);
        before != self.entries.len()
    }

    pub fn contains(&self, value: &str) -> bool {
        self.entries.iter().any(|e| e.value == value)
    }

    /// Flip the excluded flag of a selected value.
    pub fn toggle_excluded(&mut self, value: &str) -> bool {
        match self.entries.iter_mut().find(|e| e.value == value) {
            Some(entry) => {
                entry.excluded = !entry.excluded;
                true
            }
            None => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Split into (included, excluded) value lists, preserving order.
    pub fn partition(&self) -> (Vec<String>, Vec<String>) {
        let mut included = Vec::new();
        let mut excluded = Vec::new();
        for entry in &self.entries {
            if entry.excluded {
                excluded.push(entry.value.clone());
            } else {
                included.push(entry.value.clone());
            }
        }
        (included, excluded)
    }
}

/// Numeric domain `[lo, hi]` of a range filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeDomain {
    pub lo: i64,
    pub hi: i64,
}

impl RangeDomain {
    /// Domain with `lo <= hi` regardless of argument order.
    pub fn new(a: i64, b: i64) -> Self {
        Self {
            lo: a.min(b),
            hi: a.max(b),
        }
    }

    pub fn clamp(&self, v: i64) -> i64 {
        v.clamp(self.lo, self.hi)
    }

    /// Domain a definition starts with before the backend reports bounds.
    pub fn initial(definition: &FilterDefinition) -> Self {
        match definition.fixed_domain {
            Some((lo, hi)) => Self::new(lo, hi),
            None => Self::new(RANGE_LO, RANGE_HI_PLACEHOLDER),
        }
    }
}

/// Selected numeric interval. `min <= max` is upheld by every constructor
/// and mutator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RangeBounds")]
pub struct RangeValue {
    min: i64,
    max: i64,
}

#[derive(Deserialize)]
struct RangeBounds {
    min: i64,
    max: i64,
}

impl From<RangeBounds> for RangeValue {
    fn from(b: RangeBounds) -> Self {
        Self {
            min: b.min.min(b.max),
            max: b.min.max(b.max),
        }
    }
}

impl RangeValue {
    /// Interval clamped into `domain`; inverted input is swapped.
    pub fn new(min: i64, max: i64, domain: RangeDomain) -> Self {
        let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
        Self {
            min: domain.clamp(lo),
            max: domain.clamp(hi),
        }
    }

    /// The whole domain.
    pub fn full(domain: RangeDomain) -> Self {
        Self {
            min: domain.lo,
            max: domain.hi,
        }
    }

    pub fn min(&self) -> i64 {
        self.min
    }

    pub fn max(&self) -> i64 {
        self.max
    }

    /// Move the lower handle; values above `max` stop at `max`.
    pub fn set_min(&mut self, v: i64, domain: RangeDomain) {
        self.min = domain.clamp(v).min(self.max);
    }

    /// Move the upper handle; values below `min` stop at `min`.
    pub fn set_max(&mut self, v: i64, domain: RangeDomain) {
        self.max = domain.clamp(v).max(self.min);
    }

    pub fn is_full(&self, domain: RangeDomain) -> bool {
        self.min == domain.lo && self.max == domain.hi
    }
}

/// Value of one bound widget, tagged by widget kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum FilterValue {
    Text(TextValue),
    MultiValue(Selection),
    Range(RangeValue),
    Boolean { checked: bool },
    UserList(Selection),
}

impl FilterValue {
    /// The neutral value of a definition ("no constraint selected").
    ///
    /// User lists have no neutral selection without their whitelist; the
    /// empty selection is returned here and widget bindings pick the first
    /// available list.
    pub fn neutral(definition: &FilterDefinition) -> Self {
        match definition.kind {
            FilterKind::Text => Self::Text(TextValue::default()),
            FilterKind::MultiValue => {
                Self::MultiValue(Selection::new(definition.default_combinator))
            }
            FilterKind::Range => Self::Range(RangeValue::full(RangeDomain::initial(definition))),
            FilterKind::Boolean => Self::Boolean { checked: false },
            FilterKind::UserList => Self::UserList(Selection::new(definition.default_combinator)),
        }
    }

    pub fn kind(&self) -> FilterKind {
        match self {
            Self::Text(_) => FilterKind::Text,
            Self::MultiValue(_) => FilterKind::MultiValue,
            Self::Range(_) => FilterKind::Range,
            Self::Boolean { .. } => FilterKind::Boolean,
            Self::UserList(_) => FilterKind::UserList,
        }
    }

    /// Whether the value constrains nothing. Ranges never count as empty:
    /// their bounds are meaningful even at the domain edges.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(t) => t.text.is_empty(),
            Self::MultiValue(s) | Self::UserList(s) => s.is_empty(),
            Self::Range(_) => false,
            Self::Boolean { checked } => !checked,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definitions::FilterName;

    fn domain() -> RangeDomain {
        RangeDomain::new(0, 100)
    }

    #[test]
    fn test_range_new_swaps_and_clamps() {
        let r = RangeValue::new(80, 20, domain());
        assert_eq!((r.min(), r.max()), (20, 80));

        let r = RangeValue::new(-5, 500, domain());
        assert_eq!((r.min(), r.max()), (0, 100));
    }

    #[test]
    fn test_range_edits_clamp_instead_of_invert() {
        let mut r = RangeValue::new(10, 50, domain());
        r.set_min(70, domain());
        assert_eq!((r.min(), r.max()), (50, 50));

        r.set_max(5, domain());
        assert_eq!((r.min(), r.max()), (50, 50));

        r.set_max(1000, domain());
        assert_eq!((r.min(), r.max()), (50, 100));

        r.set_min(-20, domain());
        assert_eq!((r.min(), r.max()), (0, 100));
        assert!(r.is_full(domain()));
    }

    #[test]
    fn test_range_never_inverts_over_edit_sequences() {
        let d = RangeDomain::new(0, 30);
        let mut r = RangeValue::full(d);
        let edits: [(bool, i64); 8] = [
            (true, 25),
            (false, 3),
            (true, 40),
            (false, -7),
            (true, 12),
            (false, 11),
            (true, 0),
            (false, 30),
        ];
        for (is_min, v) in edits {
            if is_min {
                r.set_min(v, d);
            } else {
                r.set_max(v, d);
            }
            assert!(r.min() <= r.max(), "inverted after edit {:?}", (is_min, v));
            assert!(r.min() >= d.lo && r.max() <= d.hi);
        }
    }

    #[test]
    fn test_selection_keeps_order_and_rejects_duplicates() {
        let mut s = Selection::new(Combinator::And);
        assert!(s.insert(SelectedValue::included("b")));
        assert!(s.insert(SelectedValue::included("a")));
        assert!(!s.insert(SelectedValue::excluded("b")));
        assert_eq!(s.entries.len(), 2);
        assert_eq!(s.entries[0].value, "b");
    }

    #[test]
    fn test_selection_partition() {
        let mut s = Selection::new(Combinator::And)
            .with(SelectedValue::included("a"))
            .with(SelectedValue::included("b"));
        assert!(s.toggle_excluded("b"));
        assert!(!s.toggle_excluded("zzz"));
        let (inc, exc) = s.partition();
        assert_eq!(inc, vec!["a"]);
        assert_eq!(exc, vec!["b"]);
    }

    #[test]
    fn test_neutral_values() {
        let text = FilterValue::neutral(&FilterName::TitleLike.definition());
        assert!(text.is_empty());

        let tags = FilterValue::neutral(&FilterName::Format.definition());
        match &tags {
            FilterValue::MultiValue(s) => assert_eq!(s.combinator, Combinator::Or),
            other => panic!("unexpected {:?}", other),
        }

        let range = FilterValue::neutral(&FilterName::MeanScore.definition());
        assert_eq!(range, FilterValue::Range(RangeValue::full(RangeDomain::new(0, 100))));
        assert!(!range.is_empty());

        let flag = FilterValue::neutral(&FilterName::ShowAdult.definition());
        assert!(flag.is_empty());
    }
}
