//! Wire models exchanged with the anitools backend.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use crate::definitions::{BoundsField, ValuesField};
use crate::expression::FilterExpression;
use crate::media::EntityType;
use crate::value::RangeDomain;

// =============================================================================
// SCALAR HELPERS
// =============================================================================

/// JSON scalar the backend may send where a string is expected.
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Int(i64),
    Float(f64),
}

impl Scalar {
    fn into_string(self) -> String {
        match self {
            Scalar::Text(s) => s,
            Scalar::Int(i) => i.to_string(),
            Scalar::Float(f) => f.to_string(),
        }
    }

    fn as_i64(&self) -> Option<i64> {
        match self {
            Scalar::Text(s) => s.trim().parse().ok(),
            Scalar::Int(i) => Some(*i),
            Scalar::Float(f) => Some(f.round() as i64),
        }
    }
}

fn scalar_string<'de, D>(d: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Scalar::deserialize(d)?.into_string())
}

fn string_list<'de, D>(d: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<Option<Scalar>>>::deserialize(d)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .flatten()
        .map(Scalar::into_string)
        .collect())
}

fn bounds_list<'de, D>(d: D) -> std::result::Result<Vec<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<Scalar>>::deserialize(d)?;
    Ok(raw
        .unwrap_or_default()
        .iter()
        .filter_map(Scalar::as_i64)
        .collect())
}

// =============================================================================
// WHITELISTS
// =============================================================================

/// One selectable value of a picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhitelistEntry {
    #[serde(deserialize_with = "scalar_string")]
    pub value: String,
    #[serde(deserialize_with = "scalar_string")]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl WhitelistEntry {
    /// Entry whose display text equals its value.
    pub fn plain(value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            text: value.clone(),
            value,
            category: None,
        }
    }

    pub fn labeled(value: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            text: text.into(),
            category: None,
        }
    }
}

/// How the tag picker orders its catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagGrouping {
    /// Category order, as delivered by the backend.
    Grouped,
    /// Sorted by tag name.
    #[default]
    Alphabetical,
}

impl TagGrouping {
    pub fn from_flag(grouped: bool) -> Self {
        if grouped {
            Self::Grouped
        } else {
            Self::Alphabetical
        }
    }
}

/// Tags by category, in backend order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagCatalog {
    groups: Vec<(String, Vec<String>)>,
}

impl TagCatalog {
    pub fn new(groups: Vec<(String, Vec<String>)>) -> Self {
        Self { groups }
    }

    pub fn is_empty(&self) -> bool {
        self.groups.iter().all(|(_, tags)| tags.is_empty())
    }

    /// Flatten into whitelist entries carrying their category.
    pub fn entries(&self, grouping: TagGrouping) -> Vec<WhitelistEntry> {
        let mut entries: Vec<WhitelistEntry> = self
            .groups
            .iter()
            .flat_map(|(category, tags)| {
                tags.iter().map(move |tag| WhitelistEntry {
                    value: tag.clone(),
                    text: tag.clone(),
                    category: Some(category.clone()),
                })
            })
            .collect();
        if grouping == TagGrouping::Alphabetical {
            entries.sort_by(|a, b| a.value.cmp(&b.value));
        }
        entries
    }
}

impl<'de> Deserialize<'de> for TagCatalog {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct CatalogVisitor;

        impl<'de> Visitor<'de> for CatalogVisitor {
            type Value = TagCatalog;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of tag category to tag names")
            }

            fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut groups = Vec::new();
                while let Some((category, tags)) = map.next_entry::<String, Vec<String>>()? {
                    groups.push((category, tags));
                }
                Ok(TagCatalog { groups })
            }

            fn visit_unit<E>(self) -> std::result::Result<Self::Value, E> {
                Ok(TagCatalog::default())
            }
        }

        deserializer.deserialize_any(CatalogVisitor)
    }
}

/// `/filterValues` payload: whitelists and numeric bounds for one entity type.
///
/// Range bounds are step values; the last one is the domain maximum.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterValues {
    #[serde(default, deserialize_with = "string_list")]
    pub format: Vec<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub genres: Vec<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub country_of_origin: Vec<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub external_links: Vec<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub season: Vec<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub season_year: Vec<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub source: Vec<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub status: Vec<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub awc_community_lists: Vec<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub blood_type: Vec<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub gender: Vec<String>,
    #[serde(default)]
    pub tags: TagCatalog,
    #[serde(default, deserialize_with = "bounds_list")]
    pub total_runtime: Vec<i64>,
    #[serde(default, deserialize_with = "bounds_list")]
    pub episodes: Vec<i64>,
    #[serde(default, deserialize_with = "bounds_list")]
    pub volumes: Vec<i64>,
    #[serde(default, rename = "mcCount", deserialize_with = "bounds_list")]
    pub mc_count: Vec<i64>,
}

impl FilterValues {
    /// Whitelist for a static picker.
    pub fn whitelist(&self, field: ValuesField, grouping: TagGrouping) -> Vec<WhitelistEntry> {
        let values = match field {
            ValuesField::Tags => return self.tags.entries(grouping),
            ValuesField::Format => &self.format,
            ValuesField::Genres => &self.genres,
            ValuesField::CountryOfOrigin => &self.country_of_origin,
            ValuesField::ExternalLinks => &self.external_links,
            ValuesField::Season => &self.season,
            ValuesField::SeasonYear => &self.season_year,
            ValuesField::Source => &self.source,
            ValuesField::Status => &self.status,
            ValuesField::AwcCommunityLists => &self.awc_community_lists,
            ValuesField::BloodType => &self.blood_type,
            ValuesField::Gender => &self.gender,
        };
        values.iter().map(WhitelistEntry::plain).collect()
    }

    pub fn bounds(&self, field: BoundsField) -> &[i64] {
        match field {
            BoundsField::TotalRuntime => &self.total_runtime,
            BoundsField::Episodes => &self.episodes,
            BoundsField::Volumes => &self.volumes,
            BoundsField::McCount => &self.mc_count,
        }
    }

    /// Domain `[0, last bound]`, or `None` when the backend sent no bounds.
    pub fn domain(&self, field: BoundsField) -> Option<RangeDomain> {
        self.bounds(field)
            .last()
            .map(|hi| RangeDomain::new(crate::defaults::RANGE_LO, *hi))
    }
}

// =============================================================================
// USER LISTS
// =============================================================================

/// One of the user's lists.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserList {
    #[serde(deserialize_with = "scalar_string")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub amount_completed: Option<u64>,
    #[serde(default)]
    pub amount_total: u64,
}

impl UserList {
    /// `" (done/total) pct%"` when completion is known, else `" (total)"`.
    pub fn completion_label(&self) -> String {
        match self.amount_completed {
            Some(done) => {
                let pct = if self.amount_total == 0 {
                    0
                } else {
                    u128::from(done) * 100 / u128::from(self.amount_total)
                };
                format!(" ({}/{}) {}%", done, self.amount_total, pct)
            }
            None => format!(" ({})", self.amount_total),
        }
    }

    pub fn to_whitelist_entry(&self) -> WhitelistEntry {
        WhitelistEntry::labeled(
            self.id.clone(),
            format!("{}{}", self.name, self.completion_label()),
        )
    }
}

/// Application-level notice attached to a backend reply.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BackendNotice {
    pub message: String,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

impl BackendNotice {
    /// A slow upstream; retrying with a forced reload may help.
    pub fn is_timeout(&self) -> bool {
        self.kind.as_deref() == Some("timeout")
    }
}

/// Reply envelope of endpoints that report notices next to their data.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendReply<T> {
    pub data: T,
    #[serde(default, rename = "error")]
    pub errors: Vec<BackendNotice>,
    #[serde(default)]
    pub warnings: Vec<BackendNotice>,
}

impl<T> BackendReply<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

// =============================================================================
// TABLE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Column as sent to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub visible: bool,
}

/// Sort entry; `column` is the column name, not its index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnOrder {
    pub column: String,
    pub dir: SortDirection,
}

/// Paginated search request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub draw: u64,
    pub start: u64,
    pub length: u32,
    pub columns: Vec<ColumnSpec>,
    pub order: Vec<ColumnOrder>,
    pub filter: FilterExpression,
    pub user_name: String,
    pub media_type: EntityType,
}

/// Aggregate stats returned next to a result page.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SearchStats {
    #[serde(default)]
    pub total_completed: Option<f64>,
    #[serde(default)]
    pub total_episodes: Option<i64>,
    #[serde(default)]
    pub filtered_episodes: Option<i64>,
    #[serde(default)]
    pub total_runtime: Option<i64>,
    #[serde(default)]
    pub filtered_runtime: Option<i64>,
    #[serde(default)]
    pub total_volumes: Option<i64>,
    #[serde(default)]
    pub filtered_volumes: Option<i64>,
}

/// One page of search results.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPage {
    #[serde(default)]
    pub draw: Option<u64>,
    #[serde(default)]
    pub data: Vec<serde_json::Value>,
    #[serde(default)]
    pub records_total: u64,
    #[serde(default)]
    pub records_filtered: u64,
    #[serde(flatten)]
    pub stats: SearchStats,
}

impl SearchPage {
    /// Summary line such as `"42.50% Completed, 1200 minutes"`.
    ///
    /// Only media entity types carry stats; `None` otherwise.
    pub fn describe(&self, entity_type: EntityType) -> Option<String> {
        let s = &self.stats;
        let data = match entity_type {
            EntityType::Anime => {
                let filtered = s.filtered_runtime.unwrap_or(0);
                let total = s.total_runtime.unwrap_or(0);
                let mut line = format!("{} minutes", filtered);
                if total > filtered {
                    line.push_str(&format!(" (filtered from {} minutes)", total));
                }
                line
            }
            EntityType::Manga => {
                let episodes = s.filtered_episodes.unwrap_or(0);
                let volumes = s.filtered_volumes.unwrap_or(0);
                let total_episodes = s.total_episodes.unwrap_or(0);
                let mut line = format!("{} chapters, {} volumes", episodes, volumes);
                if total_episodes > episodes {
                    line.push_str(&format!(
                        " (filtered from {} chapters, {} volumes)",
                        total_episodes,
                        s.total_volumes.unwrap_or(0)
                    ));
                }
                line
            }
            EntityType::Character | EntityType::Staff => return None,
        };

        let completion = if self.records_total == 0 {
            0.0
        } else {
            s.total_completed.unwrap_or(0.0).floor() / self.records_total as f64 * 100.0
        };
        Some(format!("{:.2}% Completed, {}", completion, data))
    }
}
