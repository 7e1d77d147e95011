use std::collections::HashMap;
use std::time::Instant;

use chrono::Duration;
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::engine::scoring::{ScoreInput, score_freelancer_for_project};
use crate::engine::selection::{FairnessConfig, ScoredFreelancer, rank, select};
use crate::error::AppError;
use crate::models::freelancer::FreelancerIdentity;
use crate::models::opportunity::{Opportunity, TargetType};
use crate::models::queue_entry::{
    QueueEntry, QueueEntryMetadata, QueueEntryView, QueueEvent, QueueStatus,
};
use crate::state::AppState;
use crate::store::Transaction;

pub const DEFAULT_QUEUE_LIMIT: i64 = 25;
pub const MAX_QUEUE_LIMIT: i64 = 100;
pub const DEFAULT_EXPIRES_IN_MINUTES: i64 = 180;
pub const MIN_EXPIRES_IN_MINUTES: i64 = 30;
pub const MAX_EXPIRES_IN_MINUTES: i64 = 1440;

#[derive(Debug, Clone)]
pub struct BuildQueueRequest {
    pub target_type: TargetType,
    pub target_id: Uuid,
    pub project_value: Option<f64>,
    pub limit: Option<i64>,
    pub expires_in_minutes: Option<i64>,
    pub actor_id: Option<Uuid>,
    pub weight_overrides: HashMap<String, f64>,
    pub fairness: FairnessConfig,
}

impl BuildQueueRequest {
    pub fn new(target_type: TargetType, target_id: Uuid) -> Self {
        Self {
            target_type,
            target_id,
            project_value: None,
            limit: None,
            expires_in_minutes: None,
            actor_id: None,
            weight_overrides: HashMap::new(),
            fairness: FairnessConfig::default(),
        }
    }
}

/// Untrusted queue request as it arrives from a caller.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BuildQueuePayload {
    pub target_type: Option<String>,
    pub target_id: Option<String>,
    pub project_value: Option<f64>,
    pub limit: Option<i64>,
    pub expires_in_minutes: Option<i64>,
    pub actor_id: Option<Uuid>,
    #[serde(default)]
    pub weight_overrides: HashMap<String, f64>,
    #[serde(default)]
    pub fairness: FairnessConfig,
}

impl TryFrom<BuildQueuePayload> for BuildQueueRequest {
    type Error = AppError;

    fn try_from(payload: BuildQueuePayload) -> Result<Self, Self::Error> {
        let raw_target_id = payload
            .target_id
            .as_deref()
            .map(str::trim)
            .filter(|raw| !raw.is_empty())
            .ok_or_else(|| AppError::BadRequest("target_id is required".to_string()))?;
        let target_id = Uuid::parse_str(raw_target_id).map_err(|err| {
            AppError::BadRequest(format!("invalid target_id {raw_target_id}: {err}"))
        })?;

        let target_type = payload
            .target_type
            .as_deref()
            .ok_or_else(|| AppError::BadRequest("target_type is required".to_string()))?
            .parse::<TargetType>()?;

        Ok(Self {
            target_type,
            target_id,
            project_value: payload.project_value,
            limit: payload.limit,
            expires_in_minutes: payload.expires_in_minutes,
            actor_id: payload.actor_id,
            weight_overrides: payload.weight_overrides,
            fairness: payload.fairness,
        })
    }
}

/// Builds a queue in its own transaction and publishes notifications on commit.
pub async fn build_assignment_queue(
    state: &AppState,
    request: BuildQueueRequest,
) -> Result<Vec<QueueEntryView>, AppError> {
    let start = Instant::now();
    let target_type = request.target_type;
    let target_id = request.target_id;

    let mut tx = state.store.begin().await;
    match build_assignment_queue_in(state, &mut tx, request) {
        Ok(entries) => {
            tx.commit();
            state
                .metrics
                .queue_entries_created_total
                .inc_by(entries.len() as u64);
            let outcome = if entries.is_empty() { "empty" } else { "success" };
            state
                .metrics
                .observe_generation(outcome, start.elapsed().as_secs_f64());
            Ok(entries)
        }
        Err(err) => {
            tx.rollback();
            state
                .metrics
                .observe_generation("error", start.elapsed().as_secs_f64());
            warn!(
                target_type = %target_type,
                target_id = %target_id,
                error = %err,
                "queue generation failed"
            );
            Err(err)
        }
    }
}

/// Builds a queue inside a caller-owned transaction. Nothing is visible to other
/// callers, and no notification leaves, until that transaction commits.
pub fn build_assignment_queue_in(
    state: &AppState,
    tx: &mut Transaction<'_>,
    request: BuildQueueRequest,
) -> Result<Vec<QueueEntryView>, AppError> {
    let opportunity = state
        .directory
        .opportunity(request.target_type, request.target_id);
    build_queue_for(state, tx, request, opportunity)
}

/// Same as [`build_assignment_queue_in`] but against an opportunity record the caller
/// already holds, which may not be registered yet.
pub fn build_queue_for(
    state: &AppState,
    tx: &mut Transaction<'_>,
    request: BuildQueueRequest,
    opportunity: Option<Opportunity>,
) -> Result<Vec<QueueEntryView>, AppError> {
    if let Some(value) = request.project_value {
        if !value.is_finite() || value < 0.0 {
            return Err(AppError::BadRequest(
                "project_value must be a non-negative number".to_string(),
            ));
        }
    }

    if request.target_type == TargetType::Project && opportunity.is_none() {
        return Err(AppError::NotFound(format!(
            "project {} not found",
            request.target_id
        )));
    }

    let opportunity_name = opportunity.as_ref().map(|o| o.name.clone());
    let project_value = request
        .project_value
        .or_else(|| opportunity.as_ref().and_then(|o| o.value));
    let limit = request
        .limit
        .unwrap_or(DEFAULT_QUEUE_LIMIT)
        .clamp(1, MAX_QUEUE_LIMIT) as usize;
    let expires_in_minutes = request
        .expires_in_minutes
        .unwrap_or(DEFAULT_EXPIRES_IN_MINUTES)
        .clamp(MIN_EXPIRES_IN_MINUTES, MAX_EXPIRES_IN_MINUTES);
    let weights = state.weights.merged(&request.weight_overrides).normalized();
    let now = state.clock.now();

    let mut candidates: Vec<ScoredFreelancer> = state
        .directory
        .freelancers()
        .into_iter()
        .map(|freelancer| {
            let metric = tx.ensure_metric(freelancer.id, now);
            let input =
                ScoreInput::from_metric(metric, project_value, Some(freelancer.created_at), now);
            let total_assigned = metric.total_assigned;
            ScoredFreelancer {
                scored: score_freelancer_for_project(&input, &weights),
                total_assigned,
                freelancer,
            }
        })
        .collect();

    rank(&mut candidates);
    let selection = select(&candidates, limit, &request.fairness);

    if selection.picks.is_empty() {
        info!(
            target_type = %request.target_type,
            target_id = %request.target_id,
            "no freelancers eligible; queue left untouched"
        );
        return Ok(Vec::new());
    }

    let expired = tx.expire_open_entries(
        request.target_type,
        request.target_id,
        now,
        "superseded by a newer queue generation",
    );

    let generation_id = Uuid::new_v4();
    let expires_at = now + Duration::minutes(expires_in_minutes);
    let mut views = Vec::with_capacity(selection.picks.len());

    for (index, pick) in selection.picks.iter().enumerate() {
        let notify = index == 0;
        let entry = QueueEntry {
            id: Uuid::new_v4(),
            generation_id,
            target_type: request.target_type,
            target_id: request.target_id,
            freelancer_id: pick.freelancer.id,
            status: if notify {
                QueueStatus::Notified
            } else {
                QueueStatus::Pending
            },
            score: pick.scored.score,
            priority_bucket: pick.scored.priority_bucket,
            rank: (index + 1) as u32,
            project_value,
            notified_at: notify.then_some(now),
            resolved_at: None,
            expires_at,
            metadata: QueueEntryMetadata {
                breakdown: pick.scored.breakdown.clone(),
                opportunity_name: opportunity_name.clone(),
                generated_by: request.actor_id,
                weights,
                fairness: selection.decision.clone(),
                fairness_forced: selection.decision.forced_candidate == Some(pick.freelancer.id),
                resolution: None,
                expired_reason: None,
            },
            created_at: now,
            updated_at: now,
        };

        if notify {
            tx.stage_event(QueueEvent::Notified {
                entry_id: entry.id,
                freelancer_id: entry.freelancer_id,
                target_type: entry.target_type,
                target_id: entry.target_id,
                expires_at,
            });
        }

        tx.insert_entry(entry.clone());
        tx.ensure_metric(pick.freelancer.id, now)
            .record_assignment(project_value, now);

        views.push(QueueEntryView {
            position: index + 1,
            entry,
            freelancer: Some(FreelancerIdentity::from(&pick.freelancer)),
            opportunity_name: opportunity_name.clone(),
        });
    }

    info!(
        target_type = %request.target_type,
        target_id = %request.target_id,
        generation_id = %generation_id,
        entries = views.len(),
        expired = expired.len(),
        forced_candidate = ?selection.decision.forced_candidate,
        "assignment queue generated"
    );

    Ok(views)
}
