use std::cmp::Ordering;
use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::scoring::FreelancerScore;
use crate::models::freelancer::Freelancer;

pub const DEFAULT_MAX_ASSIGNMENTS_FOR_PRIORITY: u32 = 3;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FairnessConfig {
    pub ensure_newcomer: bool,
    pub max_assignments: u32,
}

impl Default for FairnessConfig {
    fn default() -> Self {
        Self {
            ensure_newcomer: true,
            max_assignments: DEFAULT_MAX_ASSIGNMENTS_FOR_PRIORITY,
        }
    }
}

/// Audit record of the fairness pass for one queue generation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SelectionDecision {
    pub forced_candidate: Option<Uuid>,
    pub rationale: String,
    pub ensure_newcomer: bool,
    pub max_assignments: u32,
}

#[derive(Debug, Clone)]
pub struct ScoredFreelancer {
    pub freelancer: Freelancer,
    pub total_assigned: u32,
    pub scored: FreelancerScore,
}

/// Score descending, then bucket ascending, then freelancer id ascending.
pub fn compare_ranked(a: &ScoredFreelancer, b: &ScoredFreelancer) -> Ordering {
    b.scored
        .score
        .total_cmp(&a.scored.score)
        .then_with(|| a.scored.priority_bucket.cmp(&b.scored.priority_bucket))
        .then_with(|| a.freelancer.id.cmp(&b.freelancer.id))
}

pub fn rank(candidates: &mut [ScoredFreelancer]) {
    candidates.sort_by(compare_ranked);
}

#[derive(Debug)]
pub struct Selection<'a> {
    pub picks: Vec<&'a ScoredFreelancer>,
    pub decision: SelectionDecision,
}

/// Picks up to `limit` candidates from an already ranked slice, placing the best
/// low-assignment freelancer first when the fairness carve-out is on.
pub fn select<'a>(
    ranked: &'a [ScoredFreelancer],
    limit: usize,
    fairness: &FairnessConfig,
) -> Selection<'a> {
    let mut picks: Vec<&ScoredFreelancer> = Vec::with_capacity(limit.min(ranked.len()));
    let mut chosen: HashSet<Uuid> = HashSet::new();

    let decision = if !fairness.ensure_newcomer {
        SelectionDecision {
            forced_candidate: None,
            rationale: "newcomer carve-out disabled".to_string(),
            ensure_newcomer: false,
            max_assignments: fairness.max_assignments,
        }
    } else {
        let newcomer = ranked
            .iter()
            .enumerate()
            .find(|(_, candidate)| candidate.total_assigned <= fairness.max_assignments);

        match newcomer {
            Some((rank_index, candidate)) if limit > 0 => {
                picks.push(candidate);
                chosen.insert(candidate.freelancer.id);
                SelectionDecision {
                    forced_candidate: Some(candidate.freelancer.id),
                    rationale: format!(
                        "freelancer has {} prior assignments (limit {}), promoted from rank {}",
                        candidate.total_assigned,
                        fairness.max_assignments,
                        rank_index + 1
                    ),
                    ensure_newcomer: true,
                    max_assignments: fairness.max_assignments,
                }
            }
            _ => SelectionDecision {
                forced_candidate: None,
                rationale: format!(
                    "no freelancer at or below {} prior assignments",
                    fairness.max_assignments
                ),
                ensure_newcomer: true,
                max_assignments: fairness.max_assignments,
            },
        }
    };

    for candidate in ranked {
        if picks.len() >= limit {
            break;
        }
        if chosen.insert(candidate.freelancer.id) {
            picks.push(candidate);
        }
    }

    Selection { picks, decision }
}
