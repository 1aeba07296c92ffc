//! Rank-to-role binding rules and the mutation batch shapes.

use serde::{Deserialize, Serialize};

/// Comparison operator applied to a member's group rank.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RankOperator {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "<=")]
    Lte,
    #[serde(rename = "between")]
    Between,
}

impl RankOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            RankOperator::Eq => "=",
            RankOperator::Gte => ">=",
            RankOperator::Lte => "<=",
            RankOperator::Between => "between",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "=" => Some(RankOperator::Eq),
            ">=" => Some(RankOperator::Gte),
            "<=" => Some(RankOperator::Lte),
            "between" => Some(RankOperator::Between),
            _ => None,
        }
    }
}

/// A persisted binding rule: a rank condition mapped to a set of Discord role
/// ids for one server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RankBinding {
    pub id: i64,
    pub server_id: String,
    pub group_name: String,
    pub operator: RankOperator,
    pub rank: i64,
    /// Upper bound, present iff `operator` is `between`.
    pub secondary_rank: Option<i64>,
    pub roles: Vec<String>,
}

/// The wire shape of one rule in a mutation payload. The id is the
/// client-supplied string form; validation parses it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BindingDraft {
    #[serde(default)]
    pub id: Option<String>,
    pub group_name: String,
    pub operator: RankOperator,
    pub rank: i64,
    #[serde(default)]
    pub secondary_rank: Option<i64>,
    pub roles: Vec<String>,
}

/// A transient mutation batch, applied atomically per server.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BindingBatch {
    #[serde(default)]
    pub insert: Vec<BindingDraft>,
    #[serde(default)]
    pub update: Vec<BindingDraft>,
    #[serde(default)]
    pub delete: Vec<String>,
}

impl BindingBatch {
    pub fn is_empty(&self) -> bool {
        self.insert.is_empty() && self.update.is_empty() && self.delete.is_empty()
    }
}

/// Rule fields with the id stripped, produced by validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBinding {
    pub group_name: String,
    pub operator: RankOperator,
    pub rank: i64,
    pub secondary_rank: Option<i64>,
    pub roles: Vec<String>,
}

/// An update with its parsed numeric id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingUpdate {
    pub id: i64,
    pub binding: NewBinding,
}

/// A batch that has passed pre-transaction validation and may be handed to
/// the repository.
#[derive(Debug, Clone, Default)]
pub struct ValidatedBatch {
    pub insert: Vec<NewBinding>,
    pub update: Vec<BindingUpdate>,
    pub delete: Vec<i64>,
}
