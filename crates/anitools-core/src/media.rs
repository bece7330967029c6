//! Entity types a filter session can be scoped to.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::defaults::STORAGE_KEY_PREFIX;
use crate::error::Error;

/// Kind of record the dashboard lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntityType {
    Anime,
    Manga,
    Character,
    Staff,
}

impl EntityType {
    pub const ALL: [EntityType; 4] = [
        EntityType::Anime,
        EntityType::Manga,
        EntityType::Character,
        EntityType::Staff,
    ];

    /// Wire form sent as `media_type` (`ANIME`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Anime => "ANIME",
            Self::Manga => "MANGA",
            Self::Character => "CHARACTER",
            Self::Staff => "STAFF",
        }
    }

    /// Local storage key holding the persisted expression for this type.
    pub fn storage_key(&self) -> String {
        format!("{}{}", STORAGE_KEY_PREFIX, self.as_str().to_lowercase())
    }

    /// Whether records of this type carry user-list data.
    pub fn is_media(&self) -> bool {
        matches!(self, Self::Anime | Self::Manga)
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ANIME" => Ok(Self::Anime),
            "MANGA" => Ok(Self::Manga),
            "CHARACTER" => Ok(Self::Character),
            "STAFF" => Ok(Self::Staff),
            _ => Err(Error::InvalidInput(format!("unknown entity type: {}", s))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_key_is_lowercased() {
        assert_eq!(EntityType::Anime.storage_key(), "filters-anime");
        assert_eq!(EntityType::Character.storage_key(), "filters-character");
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("manga".parse::<EntityType>().unwrap(), EntityType::Manga);
        assert_eq!("STAFF".parse::<EntityType>().unwrap(), EntityType::Staff);
        assert!("novel".parse::<EntityType>().is_err());
    }

    #[test]
    fn test_serializes_uppercase() {
        let json = serde_json::to_string(&EntityType::Anime).unwrap();
        assert_eq!(json, r#""ANIME""#);
    }
}
