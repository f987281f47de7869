//! Data models for budget proposal statistics.
//!
//! This module contains the records received from the upstream API
//! (proposals, people, budget years) and the report structures produced
//! by the aggregation engine.

use crate::analysis::Tally;
use serde::{Deserialize, Deserializer, Serialize};

/// Category tag attached to a proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProposalType {
    /// Budget reduction ("reduce").
    Reduce,
    /// Budget freeze ("freeze").
    Freeze,
    /// Any other kind of proposal ("other").
    Other,
    /// Tag not known to this version; ignored during accumulation.
    #[serde(other)]
    Unknown,
}

/// Reference to a budget year embedded in a proposal.
///
/// Only `id` is used for grouping; the label may be null upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearRef {
    pub id: String,
    #[serde(default)]
    pub year: Option<i32>,
}

/// Reference to the government department a proposal targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GovernmentRef {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl GovernmentRef {
    /// Display name, falling back to "Unknown" when upstream omits it.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Unknown")
    }
}

/// Reference to a person (proposer or co-signer) embedded in a proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonRef {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// A budget proposal as returned by the upstream API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proposal {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub proposal_types: Vec<ProposalType>,
    #[serde(default)]
    pub reduction_amount: Option<f64>,
    #[serde(default)]
    pub freeze_amount: Option<f64>,
    #[serde(default)]
    pub year: Option<YearRef>,
    #[serde(default)]
    pub government: Option<GovernmentRef>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub proposers: Vec<PersonRef>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub co_signers: Vec<PersonRef>,
}

impl Proposal {
    /// Returns true if the proposal carries the given category tag.
    pub fn has_type(&self, kind: ProposalType) -> bool {
        self.proposal_types.contains(&kind)
    }
}

/// A legislator known to the upstream API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub id: String,
    pub name: String,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

/// A fiscal year used as the top-level grouping of reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetYear {
    pub id: String,
    pub year: i32,
}

/// Statistics for one legislator within one budget year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegislatorStat {
    pub people_id: String,
    pub name: String,
    /// Proposals where the legislator is a proposer.
    pub proposer_only: Tally,
    /// Proposals where the legislator is a proposer or a co-signer.
    pub all_involved: Tally,
}

/// Statistics for one government department within one budget year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentStat {
    pub government_id: String,
    pub name: String,
    #[serde(flatten)]
    pub stats: Tally,
}

/// Identifies the budget year a report entry covers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearInfo {
    pub budget_year_id: String,
    pub year: i32,
}

/// Per-entity breakdown of a year report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Breakdown {
    Legislators(Vec<LegislatorStat>),
    Departments(Vec<DepartmentStat>),
}

impl Breakdown {
    /// Number of entities in the breakdown.
    pub fn len(&self) -> usize {
        match self {
            Breakdown::Legislators(items) => items.len(),
            Breakdown::Departments(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One entry of the statistics report: a single budget year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearReport {
    pub year_info: YearInfo,
    pub overall: Tally,
    #[serde(flatten)]
    pub breakdown: Breakdown,
}

/// Result of a compute-then-publish request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishReceipt {
    pub status: String,
    pub path: String,
    pub years_count: usize,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
