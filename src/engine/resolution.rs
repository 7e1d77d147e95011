use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::freelancer::FreelancerIdentity;
use crate::models::opportunity::TargetType;
use crate::models::queue_entry::{
    QueueEvent, QueueStatus, ResolutionAudit, ResolutionStatus, ResolvedEntry,
};
use crate::state::AppState;
use crate::store::Transaction;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResolveOptions {
    pub freelancer_id: Option<Uuid>,
    pub actor_id: Option<Uuid>,
    pub rating: Option<f64>,
    pub completion_value: Option<f64>,
}

impl ResolveOptions {
    fn validate(&self) -> Result<(), AppError> {
        if self.rating.is_some_and(|rating| !rating.is_finite()) {
            return Err(AppError::BadRequest("rating must be a number".to_string()));
        }
        if self
            .completion_value
            .is_some_and(|value| !value.is_finite() || value < 0.0)
        {
            return Err(AppError::BadRequest(
                "completion_value must be a non-negative number".to_string(),
            ));
        }
        Ok(())
    }
}

pub async fn resolve_queue_entry(
    state: &AppState,
    entry_id: Uuid,
    status: ResolutionStatus,
    options: ResolveOptions,
) -> Result<ResolvedEntry, AppError> {
    options.validate()?;

    let mut tx = state.store.begin().await;
    match resolve_queue_entry_in(state, &mut tx, entry_id, status, &options) {
        Ok((resolved, completion_rate)) => {
            tx.commit();

            let resolved_status = QueueStatus::from(status);
            state
                .metrics
                .queue_resolutions_total
                .with_label_values(&[resolved_status.as_str()])
                .inc();
            state
                .metrics
                .freelancer_completion_rate
                .with_label_values(&[&resolved.entry.freelancer_id.to_string()])
                .set(completion_rate);

            Ok(resolved)
        }
        Err(err) => {
            tx.rollback();
            warn!(entry_id = %entry_id, error = %err, "queue entry resolution failed");
            Err(err)
        }
    }
}

/// Resolves the entry and returns it together with the freelancer's completion rate
/// after the update.
fn resolve_queue_entry_in(
    state: &AppState,
    tx: &mut Transaction<'_>,
    entry_id: Uuid,
    status: ResolutionStatus,
    options: &ResolveOptions,
) -> Result<(ResolvedEntry, f64), AppError> {
    let now = state.clock.now();

    let entry = tx
        .entry(&entry_id)
        .cloned()
        .ok_or_else(|| AppError::NotFound(format!("queue entry {entry_id} not found")))?;

    if !entry.status.is_open() {
        return Err(AppError::Conflict(format!(
            "queue entry {entry_id} is already {}",
            entry.status
        )));
    }

    if let Some(freelancer_id) = options.freelancer_id {
        if freelancer_id != entry.freelancer_id {
            return Err(AppError::Conflict(format!(
                "queue entry {entry_id} does not belong to freelancer {freelancer_id}"
            )));
        }
    }

    let metric = tx.ensure_metric(entry.freelancer_id, now);
    match status {
        ResolutionStatus::Accepted => metric.record_completion(
            options.rating,
            options.completion_value.or(entry.project_value),
            now,
        ),
        ResolutionStatus::Declined => metric.refresh_completion_rate(now),
        ResolutionStatus::Reassigned => {}
    }
    let completion_rate = metric.completion_rate;

    let resolved = {
        let stored = tx
            .entry_mut(&entry_id)
            .ok_or_else(|| AppError::Internal(format!("queue entry {entry_id} vanished")))?;
        stored.status = status.into();
        stored.resolved_at = Some(now);
        stored.updated_at = now;
        stored.metadata.resolution = Some(ResolutionAudit {
            status,
            actor_id: options.actor_id,
            rating: options.rating,
            completion_value: options.completion_value,
            resolved_at: now,
        });
        stored.clone()
    };

    tx.stage_event(QueueEvent::Resolved {
        entry_id,
        freelancer_id: resolved.freelancer_id,
        target_type: resolved.target_type,
        target_id: resolved.target_id,
        status: resolved.status,
    });

    info!(
        entry_id = %entry_id,
        freelancer_id = %resolved.freelancer_id,
        status = %resolved.status,
        "queue entry resolved"
    );

    advance_queue(tx, resolved.target_type, resolved.target_id, now);

    let freelancer = state
        .directory
        .user(&resolved.freelancer_id)
        .as_ref()
        .map(FreelancerIdentity::from);

    Ok((
        ResolvedEntry {
            entry: resolved,
            freelancer,
        },
        completion_rate,
    ))
}

/// Notifies the best pending entry for the opportunity, unless someone is already
/// notified.
fn advance_queue(
    tx: &mut Transaction<'_>,
    target_type: TargetType,
    target_id: Uuid,
    now: DateTime<Utc>,
) {
    if tx.notified_count(target_type, target_id) > 0 {
        return;
    }

    let Some(next_id) = tx.next_pending(target_type, target_id).map(|entry| entry.id) else {
        info!(target_type = %target_type, target_id = %target_id, "queue exhausted");
        return;
    };

    let Some(next) = tx.entry_mut(&next_id) else {
        return;
    };
    next.status = QueueStatus::Notified;
    next.notified_at = Some(now);
    next.updated_at = now;

    let event = QueueEvent::Notified {
        entry_id: next.id,
        freelancer_id: next.freelancer_id,
        target_type,
        target_id,
        expires_at: next.expires_at,
    };
    let freelancer_id = next.freelancer_id;
    tx.stage_event(event);

    info!(
        entry_id = %next_id,
        freelancer_id = %freelancer_id,
        target_type = %target_type,
        target_id = %target_id,
        "next queue entry notified"
    );
}
