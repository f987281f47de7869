//! Upstream data sources.
//!
//! The aggregation engine works on fully materialized collections. This
//! module provides the [`ProposalSource`] seam that fetches them, the
//! GraphQL implementation used in production, and a snapshot source that
//! reads a JSON export from disk.

pub mod graphql;
pub mod retry;

pub use graphql::{ApiAuth, GraphQlSource};
pub use retry::{RetryClass, RetryPolicy};

use crate::models::{BudgetYear, Person, Proposal};
use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors raised while fetching upstream data.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Cannot connect to GraphQL API at {0}")]
    Connect(String),

    #[error("GraphQL API error {status}: {body}")]
    Http { status: u16, body: String },

    #[error("GraphQL errors: {0}")]
    GraphQl(String),

    #[error("Failed to decode GraphQL response: {0}")]
    Decode(String),

    #[error("Failed to send request: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Failed to execute GraphQL query after {attempts} attempts: {source}")]
    Exhausted {
        attempts: u32,
        #[source]
        source: Box<SourceError>,
    },
}

impl SourceError {
    /// Returns the retry classification for this error.
    pub fn retry_class(&self) -> RetryClass {
        match self {
            Self::Timeout(_) | Self::Connect(_) | Self::Network(_) => RetryClass::Retryable,
            Self::Http { status, .. } if *status == 429 || *status >= 500 => RetryClass::Retryable,
            Self::Http { .. } | Self::GraphQl(_) | Self::Decode(_) | Self::Exhausted { .. } => {
                RetryClass::Fatal
            }
        }
    }
}

/// Read access to proposals, people and budget years.
#[async_trait]
pub trait ProposalSource: Send + Sync {
    /// Fetch published, passed, top-level proposals, optionally for one budget year id.
    async fn fetch_proposals(&self, year_id: Option<&str>) -> Result<Vec<Proposal>, SourceError>;

    /// Fetch all people (legislators).
    async fn fetch_people(&self) -> Result<Vec<Person>, SourceError>;

    /// Fetch all budget years.
    async fn fetch_budget_years(&self) -> Result<Vec<BudgetYear>, SourceError>;
}

/// An in-memory copy of the upstream collections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub proposals: Vec<Proposal>,
    #[serde(default)]
    pub people: Vec<Person>,
    #[serde(default)]
    pub budget_years: Vec<BudgetYear>,
}

/// Serves a [`Snapshot`] as if it were the upstream API.
#[derive(Debug, Clone, Default)]
pub struct SnapshotSource {
    snapshot: Snapshot,
}

impl SnapshotSource {
    pub fn new(snapshot: Snapshot) -> Self {
        Self { snapshot }
    }

    /// Load a snapshot JSON file (`{proposals, people, budgetYears}`).
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read snapshot file: {}", path.display()))?;

        let snapshot: Snapshot = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse snapshot file: {}", path.display()))?;

        Ok(Self::new(snapshot))
    }
}

#[async_trait]
impl ProposalSource for SnapshotSource {
    async fn fetch_proposals(&self, year_id: Option<&str>) -> Result<Vec<Proposal>, SourceError> {
        let proposals = match year_id {
            Some(id) => self
                .snapshot
                .proposals
                .iter()
                .filter(|p| p.year.as_ref().is_some_and(|y| y.id == id))
                .cloned()
                .collect(),
            None => self.snapshot.proposals.clone(),
        };
        Ok(proposals)
    }

    async fn fetch_people(&self) -> Result<Vec<Person>, SourceError> {
        Ok(self.snapshot.people.clone())
    }

    async fn fetch_budget_years(&self) -> Result<Vec<BudgetYear>, SourceError> {
        Ok(self.snapshot.budget_years.clone())
    }
}
