//! Statistics service: fetch, filter, aggregate, publish.
//!
//! Collaborators are injected so the same service backs the HTTP server,
//! the CLI and tests.

use crate::models::{BudgetYear, PublishReceipt, YearReport};
use crate::publish::{ObjectNaming, PublishError, Publisher};
use crate::report::{build_report, ReportMode};
use crate::source::{ProposalSource, SourceError};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Errors surfaced to callers of [`StatisticsService`].
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Budget year {0} not found")]
    YearNotFound(i32),

    #[error(transparent)]
    Upstream(#[from] SourceError),

    #[error(transparent)]
    Publish(#[from] PublishError),

    #[error("Publishing is not configured; set a storage backend")]
    PublishingDisabled,
}

pub struct StatisticsService {
    source: Arc<dyn ProposalSource>,
    publisher: Option<Arc<Publisher>>,
}

impl StatisticsService {
    pub fn new(source: Arc<dyn ProposalSource>, publisher: Option<Arc<Publisher>>) -> Self {
        Self { source, publisher }
    }

    /// Compute the report for all budget years, or only `year` when given.
    ///
    /// A `year` that matches no budget year is an error; one that matches
    /// but has no proposals yields an empty report.
    pub async fn report(
        &self,
        mode: ReportMode,
        year: Option<i32>,
    ) -> Result<Vec<YearReport>, ServiceError> {
        info!("Fetching statistics {} (year={:?})", mode, year);

        let budget_years = select_years(self.source.fetch_budget_years().await?, year)?;

        // Scope the proposal query when exactly one year is requested.
        let year_id = match (year, budget_years.as_slice()) {
            (Some(_), [only]) => Some(only.id.as_str()),
            _ => None,
        };

        let (proposals, people) = match mode {
            ReportMode::ByLegislator => {
                futures::try_join!(self.source.fetch_proposals(year_id), self.source.fetch_people())?
            }
            ReportMode::ByDepartment => (self.source.fetch_proposals(year_id).await?, Vec::new()),
        };

        info!(
            "Fetched {} proposals, {} people, {} budget years",
            proposals.len(),
            people.len(),
            budget_years.len()
        );

        let reports = build_report(&proposals, &people, &budget_years, mode);
        info!("Generated statistics for {} years", reports.len());

        Ok(reports)
    }

    /// Compute the report and publish it.
    pub async fn publish(
        &self,
        mode: ReportMode,
        year: Option<i32>,
        naming: ObjectNaming,
    ) -> Result<PublishReceipt, ServiceError> {
        let publisher = self
            .publisher
            .as_ref()
            .ok_or(ServiceError::PublishingDisabled)?;

        let reports = self.report(mode, year).await?;
        let path = publisher.publish(mode, naming, &reports).await?;

        Ok(PublishReceipt {
            status: "success".to_string(),
            path,
            years_count: reports.len(),
        })
    }
}

fn select_years(
    budget_years: Vec<BudgetYear>,
    year: Option<i32>,
) -> Result<Vec<BudgetYear>, ServiceError> {
    let Some(wanted) = year else {
        return Ok(budget_years);
    };

    let selected: Vec<BudgetYear> = budget_years
        .into_iter()
        .filter(|y| y.year == wanted)
        .collect();

    if selected.is_empty() {
        return Err(ServiceError::YearNotFound(wanted));
    }

    Ok(selected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Breakdown;
    use crate::publish::LocalStore;
    use crate::source::{Snapshot, SnapshotSource};
    use serde_json::json;

    fn snapshot() -> Snapshot {
        serde_json::from_value(json!({
            "proposals": [
                {
                    "id": "p1",
                    "proposalTypes": ["reduce"],
                    "reductionAmount": 100,
                    "year": { "id": "y1", "year": 2024 },
                    "government": { "id": "g1", "name": "Finance" },
                    "proposers": [{ "id": "a" }]
                },
                {
                    "id": "p2",
                    "proposalTypes": ["freeze"],
                    "freezeAmount": 50,
                    "year": { "id": "y2", "year": 2025 },
                    "government": { "id": "g1", "name": "Finance" },
                    "proposers": [{ "id": "a" }],
                    "coSigners": [{ "id": "b" }]
                }
            ],
            "people": [
                { "id": "a", "name": "Alice" },
                { "id": "b", "name": "Bob" }
            ],
            "budgetYears": [
                { "id": "y1", "year": 2024 },
                { "id": "y2", "year": 2025 },
                { "id": "y3", "year": 2026 }
            ]
        }))
        .unwrap()
    }

    fn service(publisher: Option<Arc<Publisher>>) -> StatisticsService {
        StatisticsService::new(Arc::new(SnapshotSource::new(snapshot())), publisher)
    }

    #[tokio::test]
    async fn test_report_all_years() {
        let reports = service(None)
            .report(ReportMode::ByLegislator, None)
            .await
            .unwrap();

        let years: Vec<i32> = reports.iter().map(|r| r.year_info.year).collect();
        assert_eq!(years, vec![2025, 2024]);
        let Breakdown::Legislators(latest) = &reports[0].breakdown else {
            panic!("expected legislators");
        };
        assert_eq!(latest.len(), 2);
    }

    #[tokio::test]
    async fn test_report_single_year() {
        let reports = service(None)
            .report(ReportMode::ByDepartment, Some(2024))
            .await
            .unwrap();

        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].year_info.budget_year_id, "y1");
        assert_eq!(reports[0].breakdown.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_year_is_not_found() {
        let err = service(None)
            .report(ReportMode::ByDepartment, Some(1999))
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::YearNotFound(1999)));
    }

    #[tokio::test]
    async fn test_known_year_without_proposals_is_empty() {
        let reports = service(None)
            .report(ReportMode::ByLegislator, Some(2026))
            .await
            .unwrap();

        assert!(reports.is_empty());
    }

    #[tokio::test]
    async fn test_publish_without_store() {
        let err = service(None)
            .publish(ReportMode::ByLegislator, None, ObjectNaming::Latest)
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::PublishingDisabled));
    }

    #[tokio::test]
    async fn test_publish_to_local_store() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = Arc::new(Publisher::new(
            Arc::new(LocalStore::new(dir.path())),
            "budget-statistics",
        ));

        let receipt = service(Some(publisher))
            .publish(ReportMode::ByDepartment, None, ObjectNaming::Latest)
            .await
            .unwrap();

        assert_eq!(receipt.status, "success");
        assert_eq!(receipt.years_count, 2);
        let written = dir
            .path()
            .join("budget-statistics/by-department_latest.json");
        assert_eq!(receipt.path, written.display().to_string());

        let published: Vec<YearReport> =
            serde_json::from_str(&std::fs::read_to_string(&written).unwrap()).unwrap();
        assert_eq!(published.len(), 2);
        assert_eq!(published[0].year_info.year, 2025);
    }
}
