//! Proposal grouping and per-entity aggregation.
//!
//! This module buckets proposals by budget year and computes tallies per
//! legislator and per government department. All functions are pure:
//! tallies are allocated per call and never shared.

use crate::analysis::tally::{accumulate, Tally};
use crate::models::{DepartmentStat, LegislatorStat, Person, Proposal};
use std::collections::{HashMap, HashSet};

/// Group proposals by budget year id.
///
/// Proposals without a year are dropped. Each bucket keeps input order.
pub fn partition_by_year(proposals: &[Proposal]) -> HashMap<&str, Vec<&Proposal>> {
    let mut grouped: HashMap<&str, Vec<&Proposal>> = HashMap::new();

    for proposal in proposals {
        if let Some(year) = &proposal.year {
            grouped.entry(year.id.as_str()).or_default().push(proposal);
        }
    }

    grouped
}

/// Tally every proposal in the slice.
pub fn overall_tally(proposals: &[&Proposal]) -> Tally {
    let mut tally = Tally::default();
    for proposal in proposals {
        accumulate(&mut tally, proposal);
    }
    tally
}

struct LegislatorEntry<'a> {
    person: &'a Person,
    proposer_only: Tally,
    all_involved: Tally,
}

/// Compute proposer-only and all-involved tallies per legislator.
///
/// A person listed as both proposer and co-signer on the same proposal is
/// counted once in `all_involved`. Ids not present in `people` are skipped.
/// When `people` repeats an id, the first entry (and its name) is used.
/// Legislators with no counted proposals are omitted; the rest are sorted
/// by name, ties keeping the order of `people`.
pub fn aggregate_legislators(proposals: &[&Proposal], people: &[Person]) -> Vec<LegislatorStat> {
    let mut entries: Vec<LegislatorEntry<'_>> = Vec::with_capacity(people.len());
    let mut index: HashMap<&str, usize> = HashMap::with_capacity(people.len());

    for person in people {
        if index.contains_key(person.id.as_str()) {
            continue;
        }
        index.insert(person.id.as_str(), entries.len());
        entries.push(LegislatorEntry {
            person,
            proposer_only: Tally::default(),
            all_involved: Tally::default(),
        });
    }

    for proposal in proposals {
        let proposer_ids: HashSet<&str> =
            proposal.proposers.iter().map(|p| p.id.as_str()).collect();
        let co_signer_ids: HashSet<&str> =
            proposal.co_signers.iter().map(|p| p.id.as_str()).collect();

        for id in &proposer_ids {
            if let Some(&slot) = index.get(id) {
                accumulate(&mut entries[slot].proposer_only, proposal);
            }
        }

        for id in proposer_ids.union(&co_signer_ids) {
            if let Some(&slot) = index.get(id) {
                accumulate(&mut entries[slot].all_involved, proposal);
            }
        }
    }

    let mut result: Vec<LegislatorStat> = entries
        .into_iter()
        .filter(|e| e.proposer_only.has_activity() || e.all_involved.has_activity())
        .map(|e| LegislatorStat {
            people_id: e.person.id.clone(),
            name: e.person.name.clone(),
            proposer_only: e.proposer_only,
            all_involved: e.all_involved,
        })
        .collect();

    result.sort_by(|a, b| a.name.cmp(&b.name));
    result
}

/// Compute one tally per government department.
///
/// Proposals without a government are excluded. The first name seen for a
/// department id is kept. Departments are sorted by name, ties keeping
/// first-seen order.
pub fn aggregate_departments(proposals: &[&Proposal]) -> Vec<DepartmentStat> {
    let mut result: Vec<DepartmentStat> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for proposal in proposals {
        let Some(government) = &proposal.government else {
            continue;
        };

        let slot = *index.entry(government.id.as_str()).or_insert_with(|| {
            result.push(DepartmentStat {
                government_id: government.id.clone(),
                name: government.display_name().to_string(),
                stats: Tally::default(),
            });
            result.len() - 1
        });

        accumulate(&mut result[slot].stats, proposal);
    }

    result.retain(|d| d.stats.has_activity());
    result.sort_by(|a, b| a.name.cmp(&b.name));
    result
}
