//! Static filter definitions table.
//!
//! Every filter the dashboard knows about is named by [`FilterName`] and
//! described by a [`FilterDefinition`]. Which filters are offered depends on
//! the [`EntityType`] of the session ([`filter_set`]). Definitions are pure
//! data; widget bindings and the expression builder dispatch on
//! [`FilterKind`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::defaults::PERCENT_HI;
use crate::error::Error;
use crate::media::EntityType;

/// Partial date pattern; `*` may replace any whole component.
pub const DATE_MASK: &str = r"^(\d{4}|\*)-([0]\d|1[0-2]|\*)-([0-2]\d|3[01]|\*)$";

const DATE_TOOLTIP: &str =
    "You can use \"*\" instead of numbers as wildcards (1991-*-*, 199*-01-01 however won't work)";
const MANGA_UPDATES_TOOLTIP: &str =
    "Experimental (Only a third of AL manga is currently covered with data for this)";

// =============================================================================
// FILTER NAMES
// =============================================================================

/// Closed set of filter names. The serialized form is the wire key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterName {
    TitleLike,
    NotesLike,
    UserList,
    Format,
    Source,
    Country,
    AirStatus,
    Genre,
    Tag,
    TagPercentage,
    Season,
    Year,
    AiringStart,
    AiringFinish,
    UserStartFrom,
    UserFinishUntil,
    ExternalLink,
    VoiceActor,
    Staff,
    Studio,
    Producer,
    AwcCommunityList,
    Episodes,
    TotalRuntime,
    Volumes,
    MeanScore,
    AvgScore,
    McCount,
    ShowAdult,
    MuPublisher,
    MuPublication,
    OnlyScanlated,
    NameLike,
    BloodType,
    Gender,
    BirthdayFrom,
    BirthdayUntil,
    DeathdayFrom,
    DeathdayUntil,
}

impl FilterName {
    pub const ALL: [FilterName; 39] = [
        FilterName::TitleLike,
        FilterName::NotesLike,
        FilterName::UserList,
        FilterName::Format,
        FilterName::Source,
        FilterName::Country,
        FilterName::AirStatus,
        FilterName::Genre,
        FilterName::Tag,
        FilterName::TagPercentage,
        FilterName::Season,
        FilterName::Year,
        FilterName::AiringStart,
        FilterName::AiringFinish,
        FilterName::UserStartFrom,
        FilterName::UserFinishUntil,
        FilterName::ExternalLink,
        FilterName::VoiceActor,
        FilterName::Staff,
        FilterName::Studio,
        FilterName::Producer,
        FilterName::AwcCommunityList,
        FilterName::Episodes,
        FilterName::TotalRuntime,
        FilterName::Volumes,
        FilterName::MeanScore,
        FilterName::AvgScore,
        FilterName::McCount,
        FilterName::ShowAdult,
        FilterName::MuPublisher,
        FilterName::MuPublication,
        FilterName::OnlyScanlated,
        FilterName::NameLike,
        FilterName::BloodType,
        FilterName::Gender,
        FilterName::BirthdayFrom,
        FilterName::BirthdayUntil,
        FilterName::DeathdayFrom,
        FilterName::DeathdayUntil,
    ];

    /// Wire key of this filter.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TitleLike => "titleLike",
            Self::NotesLike => "notesLike",
            Self::UserList => "userList",
            Self::Format => "format",
            Self::Source => "source",
            Self::Country => "country",
            Self::AirStatus => "airStatus",
            Self::Genre => "genre",
            Self::Tag => "tag",
            Self::TagPercentage => "tagPercentage",
            Self::Season => "season",
            Self::Year => "year",
            Self::AiringStart => "airingStart",
            Self::AiringFinish => "airingFinish",
            Self::UserStartFrom => "userStartFrom",
            Self::UserFinishUntil => "userFinishUntil",
            Self::ExternalLink => "externalLink",
            Self::VoiceActor => "voiceActor",
            Self::Staff => "staff",
            Self::Studio => "studio",
            Self::Producer => "producer",
            Self::AwcCommunityList => "awcCommunityList",
            Self::Episodes => "episodes",
            Self::TotalRuntime => "totalRuntime",
            Self::Volumes => "volumes",
            Self::MeanScore => "meanScore",
            Self::AvgScore => "avgScore",
            Self::McCount => "mcCount",
            Self::ShowAdult => "showAdult",
            Self::MuPublisher => "muPublisher",
            Self::MuPublication => "muPublication",
            Self::OnlyScanlated => "onlyScanlated",
            Self::NameLike => "nameLike",
            Self::BloodType => "bloodType",
            Self::Gender => "gender",
            Self::BirthdayFrom => "birthdayFrom",
            Self::BirthdayUntil => "birthdayUntil",
            Self::DeathdayFrom => "deathdayFrom",
            Self::DeathdayUntil => "deathdayUntil",
        }
    }

    /// Key of the lower bound of a range filter (`episodesMin`).
    pub fn min_key(&self) -> String {
        format!("{}Min", self.as_str())
    }

    /// Key of the upper bound of a range filter (`episodesMax`).
    pub fn max_key(&self) -> String {
        format!("{}Max", self.as_str())
    }

    /// The static definition of this filter.
    pub fn definition(&self) -> FilterDefinition {
        use FilterKind::*;
        use RemoteSource::*;

        let d = FilterDefinition::new(*self);
        match self {
            Self::TitleLike => d.kind(Text, "Title").regex(),
            Self::NotesLike => d.kind(Text, "Notes"),
            Self::NameLike => d.kind(Text, "Name").regex(),
            Self::UserList => d
                .kind(UserList, "List")
                .source(UserLists)
                .excludable()
                .enforced(),
            Self::Format => d.multi("Format", Combinator::Or, Values(ValuesField::Format)),
            Self::Source => d.multi("Source", Combinator::Or, Values(ValuesField::Source)),
            Self::Country => d.multi(
                "Country",
                Combinator::Or,
                Values(ValuesField::CountryOfOrigin),
            ),
            Self::AirStatus => d.multi("Airing Status", Combinator::Or, Values(ValuesField::Status)),
            Self::Genre => d.multi("Genres", Combinator::And, Values(ValuesField::Genres)),
            Self::Tag => d
                .multi("Tags", Combinator::And, Values(ValuesField::Tags))
                .tooltip("You can enable/disable grouping tags by their categories in the settings"),
            Self::Season => d.multi("Season", Combinator::Or, Values(ValuesField::Season)),
            Self::Year => d
                .multi("Season Year", Combinator::Or, Values(ValuesField::SeasonYear))
                .tooltip("For easy range selection you can enter them like \"2010-2015\""),
            Self::ExternalLink => d.multi(
                "Available On",
                Combinator::And,
                Values(ValuesField::ExternalLinks),
            ),
            Self::AwcCommunityList => d.multi(
                "Community List",
                Combinator::And,
                Values(ValuesField::AwcCommunityLists),
            ),
            Self::BloodType => d.multi("Blood Type", Combinator::Or, Values(ValuesField::BloodType)),
            Self::Gender => d.multi("Gender", Combinator::Or, Values(ValuesField::Gender)),
            Self::VoiceActor => d.multi(
                "Voice Actor (ID)",
                Combinator::And,
                Typeahead(TypeaheadSource::Staff),
            ),
            Self::Staff => d.multi("Staff (ID)", Combinator::And, Typeahead(TypeaheadSource::Staff)),
            Self::Studio => d.multi("Studio", Combinator::And, Typeahead(TypeaheadSource::Studio)),
            Self::Producer => {
                d.multi("Producer", Combinator::And, Typeahead(TypeaheadSource::Studio))
            }
            Self::MuPublisher => d
                .multi(
                    "Publisher",
                    Combinator::And,
                    Typeahead(TypeaheadSource::MuPublisher),
                )
                .tooltip(MANGA_UPDATES_TOOLTIP),
            Self::MuPublication => d
                .multi(
                    "Publication",
                    Combinator::And,
                    Typeahead(TypeaheadSource::MuPublication),
                )
                .tooltip(MANGA_UPDATES_TOOLTIP),
            Self::TagPercentage => d.kind(Range, "Tag Percentage").fixed(0, PERCENT_HI),
            Self::MeanScore => d.kind(Range, "Mean Score").fixed(0, PERCENT_HI),
            Self::AvgScore => d.kind(Range, "Average Score").fixed(0, PERCENT_HI),
            Self::Episodes => d.kind(Range, "Episodes").source(Bounds(BoundsField::Episodes)),
            Self::TotalRuntime => d
                .kind(Range, "Total Runtime")
                .source(Bounds(BoundsField::TotalRuntime)),
            Self::Volumes => d.kind(Range, "Volumes").source(Bounds(BoundsField::Volumes)),
            Self::McCount => d
                .kind(Range, "Main Characters")
                .source(Bounds(BoundsField::McCount)),
            Self::ShowAdult => d.kind(Boolean, "Show Adult entries"),
            Self::OnlyScanlated => d
                .kind(Boolean, "Only fully scanlated")
                .tooltip(MANGA_UPDATES_TOOLTIP),
            Self::AiringStart => d.date("Started Airing", Combinator::And),
            Self::AiringFinish => d.date("Finished Airing", Combinator::And),
            Self::UserStartFrom => d.date("Started on", Combinator::Or),
            Self::UserFinishUntil => d.date("Completed on", Combinator::Or),
            Self::BirthdayFrom => d.date("Birthday from", Combinator::Or),
            Self::BirthdayUntil => d.date("Birthday until", Combinator::Or),
            Self::DeathdayFrom => d.date("Deathday from", Combinator::Or),
            Self::DeathdayUntil => d.date("Deathday until", Combinator::Or),
        }
    }
}

impl fmt::Display for FilterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FilterName::ALL
            .iter()
            .copied()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| Error::InvalidInput(format!("unknown filter: {}", s)))
    }
}

// =============================================================================
// DEFINITION TYPES
// =============================================================================

/// Widget kind a filter binds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterKind {
    Text,
    MultiValue,
    Range,
    Boolean,
    UserList,
}

/// How multiple selected values of one filter combine server-side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Combinator {
    #[default]
    And,
    Or,
}

impl Combinator {
    /// Clause key (`and` / `or`).
    pub fn key(&self) -> &'static str {
        match self {
            Self::And => "and",
            Self::Or => "or",
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            Self::And => Self::Or,
            Self::Or => Self::And,
        }
    }
}

impl fmt::Display for Combinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::And => f.write_str("AND"),
            Self::Or => f.write_str("OR"),
        }
    }
}

/// Field of the `/filterValues` payload holding a whitelist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValuesField {
    Format,
    Genres,
    CountryOfOrigin,
    ExternalLinks,
    Season,
    SeasonYear,
    Source,
    Status,
    AwcCommunityLists,
    Tags,
    BloodType,
    Gender,
}

/// Field of the `/filterValues` payload holding range bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoundsField {
    TotalRuntime,
    Episodes,
    Volumes,
    McCount,
}

/// Prefix-search endpoint used for typeahead pickers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeaheadSource {
    Staff,
    Studio,
    MuPublisher,
    MuPublication,
}

impl TypeaheadSource {
    /// Backend path of the lookup endpoint.
    pub fn path(&self) -> &'static str {
        match self {
            Self::Staff => "/staff",
            Self::Studio => "/searchForFilter/studio",
            Self::MuPublisher => "/searchForFilter/muPublisher",
            Self::MuPublication => "/searchForFilter/muPublication",
        }
    }
}

/// Where a widget's whitelist or numeric domain comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteSource {
    Values(ValuesField),
    Bounds(BoundsField),
    Typeahead(TypeaheadSource),
    UserLists,
}

/// Static descriptor of one filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterDefinition {
    pub name: FilterName,
    pub kind: FilterKind,
    pub label: &'static str,
    pub default_combinator: Combinator,
    pub supports_exclude: bool,
    pub supports_regex: bool,
    pub enforce_whitelist: bool,
    pub remote_source: Option<RemoteSource>,
    pub fixed_domain: Option<(i64, i64)>,
    pub mask: Option<&'static str>,
    pub tooltip: Option<&'static str>,
}

impl FilterDefinition {
    fn new(name: FilterName) -> Self {
        Self {
            name,
            kind: FilterKind::Text,
            label: "",
            default_combinator: Combinator::And,
            supports_exclude: false,
            supports_regex: false,
            enforce_whitelist: false,
            remote_source: None,
            fixed_domain: None,
            mask: None,
            tooltip: None,
        }
    }

    fn kind(mut self, kind: FilterKind, label: &'static str) -> Self {
        self.kind = kind;
        self.label = label;
        self
    }

    fn multi(self, label: &'static str, combinator: Combinator, source: RemoteSource) -> Self {
        let mut d = self.kind(FilterKind::MultiValue, label).source(source).excludable();
        d.default_combinator = combinator;
        d
    }

    fn date(self, label: &'static str, combinator: Combinator) -> Self {
        let mut d = self.kind(FilterKind::Text, label).tooltip(DATE_TOOLTIP);
        d.mask = Some(DATE_MASK);
        d.default_combinator = combinator;
        d
    }

    fn source(mut self, source: RemoteSource) -> Self {
        self.remote_source = Some(source);
        self
    }

    fn fixed(mut self, lo: i64, hi: i64) -> Self {
        self.fixed_domain = Some((lo, hi));
        self
    }

    fn regex(mut self) -> Self {
        self.supports_regex = true;
        self
    }

    fn excludable(mut self) -> Self {
        self.supports_exclude = true;
        self
    }

    fn enforced(mut self) -> Self {
        self.enforce_whitelist = true;
        self
    }

    fn tooltip(mut self, tooltip: &'static str) -> Self {
        self.tooltip = Some(tooltip);
        self
    }

    /// Label shown for this filter in the given entity context.
    pub fn label_for(&self, entity_type: EntityType) -> &'static str {
        match (self.name, entity_type) {
            (FilterName::Episodes, EntityType::Manga) => "Chapters",
            _ => self.label,
        }
    }

    /// Whether the user may flip the combinator (only AND-default pickers
    /// expose the switch).
    pub fn allows_combinator_switch(&self) -> bool {
        matches!(self.kind, FilterKind::MultiValue | FilterKind::UserList)
            && self.default_combinator == Combinator::And
    }

    /// Whether the widget looks up values as the user types.
    pub fn typeahead(&self) -> Option<TypeaheadSource> {
        match self.remote_source {
            Some(RemoteSource::Typeahead(source)) => Some(source),
            _ => None,
        }
    }
}

// =============================================================================
// FILTER SETS
// =============================================================================

const ANIME_FILTERS: &[FilterName] = &[
    FilterName::TitleLike,
    FilterName::NotesLike,
    FilterName::UserList,
    FilterName::Format,
    FilterName::Source,
    FilterName::Country,
    FilterName::AirStatus,
    FilterName::Genre,
    FilterName::Tag,
    FilterName::TagPercentage,
    FilterName::Season,
    FilterName::Year,
    FilterName::AiringStart,
    FilterName::AiringFinish,
    FilterName::UserStartFrom,
    FilterName::UserFinishUntil,
    FilterName::ExternalLink,
    FilterName::VoiceActor,
    FilterName::Staff,
    FilterName::Studio,
    FilterName::Producer,
    FilterName::AwcCommunityList,
    FilterName::Episodes,
    FilterName::TotalRuntime,
    FilterName::MeanScore,
    FilterName::AvgScore,
    FilterName::McCount,
    FilterName::ShowAdult,
];

const MANGA_FILTERS: &[FilterName] = &[
    FilterName::TitleLike,
    FilterName::NotesLike,
    FilterName::UserList,
    FilterName::Format,
    FilterName::Source,
    FilterName::Country,
    FilterName::AirStatus,
    FilterName::Genre,
    FilterName::Tag,
    FilterName::TagPercentage,
    FilterName::Year,
    FilterName::AiringStart,
    FilterName::AiringFinish,
    FilterName::UserStartFrom,
    FilterName::UserFinishUntil,
    FilterName::ExternalLink,
    FilterName::Staff,
    FilterName::Episodes,
    FilterName::Volumes,
    FilterName::MeanScore,
    FilterName::AvgScore,
    FilterName::McCount,
    FilterName::MuPublisher,
    FilterName::MuPublication,
    FilterName::OnlyScanlated,
    FilterName::ShowAdult,
];

const CHARACTER_FILTERS: &[FilterName] = &[
    FilterName::NameLike,
    FilterName::BloodType,
    FilterName::Gender,
    FilterName::BirthdayFrom,
    FilterName::BirthdayUntil,
];

const STAFF_FILTERS: &[FilterName] = &[
    FilterName::NameLike,
    FilterName::BloodType,
    FilterName::Gender,
    FilterName::BirthdayFrom,
    FilterName::BirthdayUntil,
    FilterName::DeathdayFrom,
    FilterName::DeathdayUntil,
];

/// Filters offered for an entity type, in display order.
pub fn filter_set(entity_type: EntityType) -> &'static [FilterName] {
    match entity_type {
        EntityType::Anime => ANIME_FILTERS,
        EntityType::Manga => MANGA_FILTERS,
        EntityType::Character => CHARACTER_FILTERS,
        EntityType::Staff => STAFF_FILTERS,
    }
}

/// Definitions for an entity type, in display order.
pub fn definitions_for(entity_type: EntityType) -> Vec<FilterDefinition> {
    filter_set(entity_type)
        .iter()
        .map(FilterName::definition)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip_through_str() {
        for name in FilterName::ALL {
            assert_eq!(name.as_str().parse::<FilterName>().unwrap(), name);
            let json = serde_json::to_string(&name).unwrap();
            assert_eq!(json, format!("\"{}\"", name.as_str()));
        }
    }

    #[test]
    fn test_definition_kinds() {
        assert_eq!(FilterName::TitleLike.definition().kind, FilterKind::Text);
        assert!(FilterName::TitleLike.definition().supports_regex);
        assert!(!FilterName::NotesLike.definition().supports_regex);
        assert_eq!(FilterName::Tag.definition().kind, FilterKind::MultiValue);
        assert_eq!(FilterName::Episodes.definition().kind, FilterKind::Range);
        assert_eq!(FilterName::ShowAdult.definition().kind, FilterKind::Boolean);
        assert_eq!(FilterName::UserList.definition().kind, FilterKind::UserList);
    }

    #[test]
    fn test_date_filters_carry_mask() {
        for name in [
            FilterName::AiringStart,
            FilterName::BirthdayUntil,
            FilterName::DeathdayFrom,
        ] {
            assert_eq!(name.definition().mask, Some(DATE_MASK));
        }
        assert!(FilterName::TitleLike.definition().mask.is_none());
    }

    #[test]
    fn test_combinator_switch_only_for_and_pickers() {
        assert!(FilterName::Genre.definition().allows_combinator_switch());
        assert!(FilterName::UserList.definition().allows_combinator_switch());
        assert!(!FilterName::Format.definition().allows_combinator_switch());
        assert!(!FilterName::TitleLike.definition().allows_combinator_switch());
    }

    #[test]
    fn test_percent_ranges_have_fixed_domain() {
        assert_eq!(
            FilterName::TagPercentage.definition().fixed_domain,
            Some((0, 100))
        );
        assert!(FilterName::Episodes.definition().fixed_domain.is_none());
    }

    #[test]
    fn test_typeahead_sources() {
        assert_eq!(
            FilterName::Producer.definition().typeahead(),
            Some(TypeaheadSource::Studio)
        );
        assert_eq!(TypeaheadSource::Staff.path(), "/staff");
        assert_eq!(
            TypeaheadSource::MuPublication.path(),
            "/searchForFilter/muPublication"
        );
        assert!(FilterName::Genre.definition().typeahead().is_none());
    }

    #[test]
    fn test_filter_sets_per_entity() {
        assert!(filter_set(EntityType::Anime).contains(&FilterName::Studio));
        assert!(!filter_set(EntityType::Manga).contains(&FilterName::Studio));
        assert!(filter_set(EntityType::Manga).contains(&FilterName::Volumes));
        assert!(filter_set(EntityType::Staff).contains(&FilterName::DeathdayUntil));
        assert!(!filter_set(EntityType::Character).contains(&FilterName::DeathdayUntil));
    }

    #[test]
    fn test_episode_label_switches_for_manga() {
        let d = FilterName::Episodes.definition();
        assert_eq!(d.label_for(EntityType::Anime), "Episodes");
        assert_eq!(d.label_for(EntityType::Manga), "Chapters");
    }

    #[test]
    fn test_range_keys() {
        assert_eq!(FilterName::TagPercentage.min_key(), "tagPercentageMin");
        assert_eq!(FilterName::Episodes.max_key(), "episodesMax");
    }
}
