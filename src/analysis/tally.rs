//! Proposal classification and per-entity accumulation.

use crate::models::{Proposal, ProposalType};
use serde::{Deserialize, Serialize, Serializer};

/// Running totals of classified proposals for one entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tally {
    #[serde(serialize_with = "whole_amount")]
    pub reduction_amount: f64,
    pub reduction_count: u32,
    #[serde(serialize_with = "whole_amount")]
    pub freeze_amount: f64,
    pub freeze_count: u32,
    pub other_count: u32,
}

impl Tally {
    /// Returns true if at least one count field is non-zero.
    pub fn has_activity(&self) -> bool {
        self.reduction_count > 0 || self.freeze_count > 0 || self.other_count > 0
    }
}

/// Add a proposal's contribution to a tally.
///
/// Categories are independent: a proposal tagged both `reduce` and
/// `freeze` counts toward both. Missing amounts count as zero and an
/// amount is only added when its tag is present. Unknown tags are ignored.
pub fn accumulate(tally: &mut Tally, proposal: &Proposal) {
    if proposal.has_type(ProposalType::Reduce) {
        tally.reduction_count += 1;
        tally.reduction_amount += proposal.reduction_amount.unwrap_or(0.0);
    }

    if proposal.has_type(ProposalType::Freeze) {
        tally.freeze_count += 1;
        tally.freeze_amount += proposal.freeze_amount.unwrap_or(0.0);
    }

    if proposal.has_type(ProposalType::Other) {
        tally.other_count += 1;
    }
}

// Published statistics carry whole currency units.
fn whole_amount<S: Serializer>(amount: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_i64(amount.trunc() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proposal(types: &[ProposalType], reduction: Option<f64>, freeze: Option<f64>) -> Proposal {
        Proposal {
            id: "p".to_string(),
            proposal_types: types.to_vec(),
            reduction_amount: reduction,
            freeze_amount: freeze,
            year: None,
            government: None,
            proposers: vec![],
            co_signers: vec![],
        }
    }

    #[test]
    fn test_reduce_and_freeze_both_count() {
        let mut tally = Tally::default();
        accumulate(
            &mut tally,
            &proposal(
                &[ProposalType::Reduce, ProposalType::Freeze],
                Some(100.0),
                Some(50.0),
            ),
        );

        assert_eq!(tally.reduction_count, 1);
        assert_eq!(tally.reduction_amount, 100.0);
        assert_eq!(tally.freeze_count, 1);
        assert_eq!(tally.freeze_amount, 50.0);
        assert_eq!(tally.other_count, 0);
    }

    #[test]
    fn test_untagged_proposal_contributes_nothing() {
        let mut tally = Tally::default();
        accumulate(&mut tally, &proposal(&[], Some(100.0), Some(50.0)));

        assert_eq!(tally, Tally::default());
        assert!(!tally.has_activity());
    }

    #[test]
    fn test_amount_requires_tag() {
        let mut tally = Tally::default();
        accumulate(&mut tally, &proposal(&[ProposalType::Freeze], Some(999.0), None));

        assert_eq!(tally.reduction_amount, 0.0);
        assert_eq!(tally.reduction_count, 0);
        assert_eq!(tally.freeze_count, 1);
        assert_eq!(tally.freeze_amount, 0.0);
    }

    #[test]
    fn test_unknown_tag_ignored() {
        let mut tally = Tally::default();
        accumulate(
            &mut tally,
            &proposal(&[ProposalType::Unknown, ProposalType::Other], None, None),
        );

        assert_eq!(tally.other_count, 1);
        assert_eq!(tally.reduction_count + tally.freeze_count, 0);
    }

    #[test]
    fn test_amounts_accumulate_across_proposals() {
        let mut tally = Tally::default();
        accumulate(&mut tally, &proposal(&[ProposalType::Reduce], Some(10.5), None));
        accumulate(&mut tally, &proposal(&[ProposalType::Reduce], Some(20.25), None));

        assert_eq!(tally.reduction_count, 2);
        assert_eq!(tally.reduction_amount, 30.75);
    }

    #[test]
    fn test_serializes_whole_amounts() {
        let tally = Tally {
            reduction_amount: 30.75,
            reduction_count: 2,
            freeze_amount: 0.0,
            freeze_count: 0,
            other_count: 1,
        };

        let json = serde_json::to_string(&tally).unwrap();
        assert_eq!(
            json,
            r#"{"reductionAmount":30,"reductionCount":2,"freezeAmount":0,"freezeCount":0,"otherCount":1}"#
        );
    }
}
