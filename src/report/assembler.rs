//! Per-year report assembly.

use crate::analysis::{aggregate_departments, aggregate_legislators, overall_tally, partition_by_year};
use crate::models::{Breakdown, BudgetYear, Person, Proposal, YearInfo, YearReport};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Which per-entity breakdown a report carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ReportMode {
    ByLegislator,
    ByDepartment,
}

impl ReportMode {
    /// Slug used in endpoint paths and published object names.
    pub fn slug(&self) -> &'static str {
        match self {
            ReportMode::ByLegislator => "by-legislator",
            ReportMode::ByDepartment => "by-department",
        }
    }
}

impl fmt::Display for ReportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.slug())
    }
}

/// Build the statistics report for the given budget years.
///
/// Years without any proposal are left out even when requested. Entries
/// are ordered by year, most recent first. `people` is only consulted in
/// [`ReportMode::ByLegislator`].
pub fn build_report(
    proposals: &[Proposal],
    people: &[Person],
    budget_years: &[BudgetYear],
    mode: ReportMode,
) -> Vec<YearReport> {
    let by_year = partition_by_year(proposals);
    let mut reports = Vec::new();

    for budget_year in budget_years {
        let year_proposals = match by_year.get(budget_year.id.as_str()) {
            Some(bucket) if !bucket.is_empty() => bucket,
            _ => {
                debug!("No proposals for budget year {}", budget_year.year);
                continue;
            }
        };

        let breakdown = match mode {
            ReportMode::ByLegislator => {
                Breakdown::Legislators(aggregate_legislators(year_proposals, people))
            }
            ReportMode::ByDepartment => Breakdown::Departments(aggregate_departments(year_proposals)),
        };

        debug!(
            "Budget year {}: {} proposals, {} entities",
            budget_year.year,
            year_proposals.len(),
            breakdown.len()
        );

        reports.push(YearReport {
            year_info: YearInfo {
                budget_year_id: budget_year.id.clone(),
                year: budget_year.year,
            },
            overall: overall_tally(year_proposals),
            breakdown,
        });
    }

    reports.sort_by(|a, b| b.year_info.year.cmp(&a.year_info.year));
    reports
}
