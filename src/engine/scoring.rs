use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::engine::weights::ScoringWeights;
use crate::models::metric::{BASELINE_COMPLETION_RATE, BASELINE_RATING, FreelancerAssignmentMetric};
use crate::models::queue_entry::ScoreBreakdown;

const RECENCY_WINDOW_DAYS: f64 = 30.0;
const COMPLETION_WINDOW_DAYS: f64 = 90.0;
const EARLY_CAREER_WINDOW_DAYS: f64 = 120.0;
const OPPORTUNITY_SPREAD_CEILING: f64 = 12.0;

const NEVER_COMPLETED_SCORE: f64 = 0.65;
const NEUTRAL_EARNINGS_SCORE: f64 = 0.7;
const EARLY_CAREER_SHARE: f64 = 0.6;
const OPPORTUNITY_SPREAD_SHARE: f64 = 0.4;
const VALUE_RATIO_FLOOR: f64 = 0.1;
const VALUE_RATIO_CEILING: f64 = 10.0;

const FIRST_BUCKET_THRESHOLD: f64 = 0.75;
const SECOND_BUCKET_THRESHOLD: f64 = 0.55;

#[derive(Debug, Clone)]
pub struct ScoreInput {
    pub rating: Option<f64>,
    pub completion_rate: Option<f64>,
    pub total_assigned: u32,
    pub total_completed: u32,
    pub avg_assigned_value: Option<f64>,
    pub last_assigned_at: Option<DateTime<Utc>>,
    pub last_completed_at: Option<DateTime<Utc>>,
    pub project_value: Option<f64>,
    pub account_created_at: Option<DateTime<Utc>>,
    pub now: DateTime<Utc>,
}

impl ScoreInput {
    pub fn from_metric(
        metric: &FreelancerAssignmentMetric,
        project_value: Option<f64>,
        account_created_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            rating: Some(metric.rating),
            completion_rate: Some(metric.completion_rate),
            total_assigned: metric.total_assigned,
            total_completed: metric.total_completed,
            avg_assigned_value: metric.avg_assigned_value,
            last_assigned_at: metric.last_assigned_at,
            last_completed_at: metric.last_completed_at,
            project_value,
            account_created_at,
            now,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FreelancerScore {
    pub score: f64,
    pub priority_bucket: u8,
    pub breakdown: ScoreBreakdown,
}

pub fn score_freelancer_for_project(
    input: &ScoreInput,
    weights: &ScoringWeights,
) -> FreelancerScore {
    let weights = weights.normalized();

    let recency_days = input.last_assigned_at.map(|at| days_between(at, input.now));
    let completion_days = input.last_completed_at.map(|at| days_between(at, input.now));
    let account_age_days = input.account_created_at.map(|at| days_between(at, input.now));

    let rating = input.rating.filter(|r| r.is_finite()).unwrap_or(BASELINE_RATING);
    let completion_rate = observed_completion_rate(input);
    let value_ratio = value_ratio(input.project_value, input.avg_assigned_value);
    let (early_career_boost, opportunity_spread_boost, new_freelancer_score) =
        inclusion_score(input.total_assigned, account_age_days);

    let mut breakdown = ScoreBreakdown {
        recency_days,
        recency_score: recency_score(recency_days),
        rating,
        rating_score: clamp_unit(rating / 5.0),
        completion_days,
        completion_recency_score: completion_recency_score(completion_days),
        completion_rate,
        completion_quality_score: completion_quality_score(input.total_assigned, completion_rate),
        project_value: input.project_value,
        avg_assigned_value: input.avg_assigned_value,
        value_ratio,
        earnings_balance_score: earnings_balance_score(value_ratio),
        account_age_days,
        early_career_boost,
        opportunity_spread_boost,
        new_freelancer_score,
        total_assigned: input.total_assigned,
        total_completed: input.total_completed,
        weighted_total: 0.0,
    };

    breakdown.weighted_total = weighted_score(&breakdown, &weights);
    let score = round_to(clamp_unit(breakdown.weighted_total), 4);

    FreelancerScore {
        score,
        priority_bucket: priority_bucket(score),
        breakdown,
    }
}

pub fn weighted_score(breakdown: &ScoreBreakdown, weights: &ScoringWeights) -> f64 {
    (breakdown.recency_score * weights.recency)
        + (breakdown.rating_score * weights.rating)
        + (breakdown.completion_recency_score * weights.completion_recency)
        + (breakdown.completion_quality_score * weights.completion_quality)
        + (breakdown.earnings_balance_score * weights.earnings_balance)
        + (breakdown.new_freelancer_score * weights.inclusion)
}

pub fn priority_bucket(score: f64) -> u8 {
    if score >= FIRST_BUCKET_THRESHOLD {
        1
    } else if score >= SECOND_BUCKET_THRESHOLD {
        2
    } else {
        3
    }
}

fn recency_score(days_since_assignment: Option<f64>) -> f64 {
    match days_since_assignment {
        Some(days) => clamp_unit(days / RECENCY_WINDOW_DAYS),
        None => 1.0,
    }
}

fn completion_recency_score(days_since_completion: Option<f64>) -> f64 {
    match days_since_completion {
        Some(days) => clamp_unit(1.0 - days / COMPLETION_WINDOW_DAYS),
        None => NEVER_COMPLETED_SCORE,
    }
}

fn observed_completion_rate(input: &ScoreInput) -> f64 {
    if input.total_assigned == 0 {
        return BASELINE_COMPLETION_RATE;
    }

    input
        .completion_rate
        .filter(|rate| rate.is_finite())
        .unwrap_or(input.total_completed as f64 / input.total_assigned as f64)
}

fn completion_quality_score(total_assigned: u32, completion_rate: f64) -> f64 {
    if total_assigned == 0 {
        return BASELINE_COMPLETION_RATE;
    }
    clamp_unit(completion_rate)
}

fn value_ratio(project_value: Option<f64>, avg_assigned_value: Option<f64>) -> Option<f64> {
    match (project_value, avg_assigned_value) {
        (Some(value), Some(avg))
            if value > 0.0 && avg > 0.0 && value.is_finite() && avg.is_finite() =>
        {
            Some((value / avg).clamp(VALUE_RATIO_FLOOR, VALUE_RATIO_CEILING))
        }
        _ => None,
    }
}

fn earnings_balance_score(ratio: Option<f64>) -> f64 {
    match ratio {
        Some(ratio) => clamp_unit((-ratio.ln().abs()).exp()),
        None => NEUTRAL_EARNINGS_SCORE,
    }
}

/// Returns `(early_career, opportunity_spread, inclusion)`. Freelancers never queued
/// before get the full inclusion score.
fn inclusion_score(
    total_assigned: u32,
    account_age_days: Option<f64>,
) -> (Option<f64>, Option<f64>, f64) {
    if total_assigned == 0 {
        return (None, None, 1.0);
    }

    let early_career = account_age_days
        .map(|days| clamp_unit(1.0 - days / EARLY_CAREER_WINDOW_DAYS))
        .unwrap_or(0.0);
    let spread = clamp_unit(1.0 - total_assigned as f64 / OPPORTUNITY_SPREAD_CEILING);
    let blended = EARLY_CAREER_SHARE * early_career + OPPORTUNITY_SPREAD_SHARE * spread;

    (Some(early_career), Some(spread), clamp_unit(blended))
}

fn days_between(earlier: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let millis = (now - earlier).num_milliseconds().max(0) as f64;
    millis / 86_400_000.0
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
