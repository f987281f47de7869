//! Report rendering.
//!
//! JSON is the published format. Markdown is a human-readable summary
//! for the command line.

use crate::analysis::Tally;
use crate::models::{Breakdown, DepartmentStat, LegislatorStat, YearReport};
use crate::report::ReportMode;
use anyhow::Result;
use std::io::Write;
use std::path::Path;

/// Generate the JSON document for a list of year reports.
pub fn generate_json_report(reports: &[YearReport]) -> Result<String> {
    serde_json::to_string_pretty(reports).map_err(Into::into)
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(reports: &[YearReport], mode: ReportMode) -> String {
    let mut output = String::new();

    let title = match mode {
        ReportMode::ByLegislator => "Budget Proposal Statistics by Legislator",
        ReportMode::ByDepartment => "Budget Proposal Statistics by Department",
    };
    output.push_str(&format!("# {}\n\n", title));

    if reports.is_empty() {
        output.push_str("No proposals matched the requested budget years.\n\n");
    }

    for report in reports {
        output.push_str(&generate_year_section(report));
    }

    output.push_str(&generate_footer());

    output
}

/// Generate the section for one budget year.
fn generate_year_section(report: &YearReport) -> String {
    let mut section = String::new();

    section.push_str(&format!("## {}\n\n", report.year_info.year));

    section.push_str("### Overall\n\n");
    section.push_str("| Reductions | Reduction Amount | Freezes | Freeze Amount | Other |\n");
    section.push_str("|:---:|---:|:---:|---:|:---:|\n");
    section.push_str(&format!("| {} |\n\n", tally_cells(&report.overall)));

    match &report.breakdown {
        Breakdown::Legislators(legislators) => {
            section.push_str(&generate_legislator_table(legislators))
        }
        Breakdown::Departments(departments) => {
            section.push_str(&generate_department_table(departments))
        }
    }

    section
}

fn generate_legislator_table(legislators: &[LegislatorStat]) -> String {
    let mut table = String::new();

    table.push_str("### Legislators\n\n");
    if legislators.is_empty() {
        table.push_str("No legislator activity recorded.\n\n");
        return table;
    }

    table.push_str("| Legislator | Role | Reductions | Reduction Amount | Freezes | Freeze Amount | Other |\n");
    table.push_str("|:---|:---|:---:|---:|:---:|---:|:---:|\n");

    for legislator in legislators {
        table.push_str(&format!(
            "| {} | Proposer | {} |\n",
            escape_cell(&legislator.name),
            tally_cells(&legislator.proposer_only)
        ));
        table.push_str(&format!(
            "| {} | All involved | {} |\n",
            escape_cell(&legislator.name),
            tally_cells(&legislator.all_involved)
        ));
    }
    table.push('\n');

    table
}

fn generate_department_table(departments: &[DepartmentStat]) -> String {
    let mut table = String::new();

    table.push_str("### Departments\n\n");
    if departments.is_empty() {
        table.push_str("No department activity recorded.\n\n");
        return table;
    }

    table.push_str("| Department | Reductions | Reduction Amount | Freezes | Freeze Amount | Other |\n");
    table.push_str("|:---|:---:|---:|:---:|---:|:---:|\n");

    for department in departments {
        table.push_str(&format!(
            "| {} | {} |\n",
            escape_cell(&department.name),
            tally_cells(&department.stats)
        ));
    }
    table.push('\n');

    table
}

// Names come from upstream data and may contain the column separator.
fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|")
}

fn tally_cells(tally: &Tally) -> String {
    format!(
        "{} | {} | {} | {} | {}",
        tally.reduction_count,
        tally.reduction_amount.trunc() as i64,
        tally.freeze_count,
        tally.freeze_amount.trunc() as i64,
        tally.other_count
    )
}

/// Generate the report footer.
fn generate_footer() -> String {
    format!(
        "---\n\n*Generated by budget-stats v{}*\n",
        env!("CARGO_PKG_VERSION")
    )
}

/// Write rendered report content to a file.
pub fn write_report(content: &str, path: &Path) -> Result<()> {
    let mut file = std::fs::File::create(path)?;
    file.write_all(content.as_bytes())?;

    Ok(())
}
