//! Static group catalog: rank tables and classification thresholds per group.
//!
//! The catalog is loaded once from JSON and passed into components
//! explicitly; nothing here holds process-wide mutable state.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TetherError};

/// Classification thresholds within a group's rank ladder.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroupClasses {
    #[serde(rename = "Officer")]
    pub officer: i64,
    #[serde(rename = "Command")]
    pub command: i64,
}

/// One group: its rank table (rank number → title), classification
/// thresholds, and an optional icon asset reference.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Group {
    #[serde(rename = "Ranks")]
    pub ranks: BTreeMap<String, String>,
    #[serde(rename = "Classes")]
    pub classes: GroupClasses,
    #[serde(rename = "Icon", default)]
    pub icon: Option<String>,
}

impl Group {
    /// Number of ranks in the ladder. Valid rank values are `0..=rank_count()`;
    /// rank 0 means "not a member".
    pub fn rank_count(&self) -> i64 {
        self.ranks.len() as i64
    }

    /// Title for a rank number, if the ladder defines one.
    pub fn rank_title(&self, rank: i64) -> Option<&str> {
        self.ranks.get(&rank.to_string()).map(String::as_str)
    }
}

/// The full catalog, keyed by group name.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GroupCatalog {
    #[serde(flatten)]
    groups: HashMap<String, Group>,
}

impl GroupCatalog {
    /// Parse a catalog from JSON.
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw)
            .map_err(|e| TetherError::Serialization(format!("invalid group catalog: {e}")))
    }

    /// Load a catalog from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn get(&self, name: &str) -> Option<&Group> {
        self.groups.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.groups.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Group)> {
        self.groups.iter()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) const SAMPLE_CATALOG: &str = r#"{
        "Eden": {
            "Ranks": {
                "1": "Subject",
                "2": "Tester",
                "3": "Officer",
                "4": "Commander",
                "5": "Overseer"
            },
            "Classes": { "Officer": 3, "Command": 4 },
            "Icon": "rbxassetid://13470872242"
        },
        "Vanguard": {
            "Ranks": { "1": "Recruit", "2": "Captain" },
            "Classes": { "Officer": 2, "Command": 2 }
        }
    }"#;

    #[test]
    fn parse_catalog() {
        let catalog = GroupCatalog::from_json(SAMPLE_CATALOG).unwrap();
        assert_eq!(catalog.len(), 2);
        assert!(catalog.contains("Eden"));
        assert!(!catalog.contains("Atlas"));
    }

    #[test]
    fn rank_count_and_titles() {
        let catalog = GroupCatalog::from_json(SAMPLE_CATALOG).unwrap();
        let eden = catalog.get("Eden").unwrap();
        assert_eq!(eden.rank_count(), 5);
        assert_eq!(eden.rank_title(3), Some("Officer"));
        assert_eq!(eden.rank_title(9), None);
    }

    #[test]
    fn classes_thresholds() {
        let catalog = GroupCatalog::from_json(SAMPLE_CATALOG).unwrap();
        let eden = catalog.get("Eden").unwrap();
        assert_eq!(eden.classes.officer, 3);
        assert_eq!(eden.classes.command, 4);
    }

    #[test]
    fn icon_is_optional() {
        let catalog = GroupCatalog::from_json(SAMPLE_CATALOG).unwrap();
        assert!(catalog.get("Eden").unwrap().icon.is_some());
        assert!(catalog.get("Vanguard").unwrap().icon.is_none());
    }

    #[test]
    fn invalid_json_is_a_serialization_error() {
        let err = GroupCatalog::from_json("not json").unwrap_err();
        assert!(matches!(err, TetherError::Serialization(_)));
    }
}
