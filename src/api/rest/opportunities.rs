use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::routing::post;
use axum::Json;
use axum::Router;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::queue::{BuildQueueRequest, build_queue_for};
use crate::engine::selection::FairnessConfig;
use crate::error::AppError;
use crate::models::opportunity::{Opportunity, TargetType};
use crate::models::queue_entry::QueueEntryView;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/opportunities", post(create_opportunity))
}

#[derive(Deserialize)]
pub struct CreateOpportunityRequest {
    pub target_type: String,
    pub target_id: Option<Uuid>,
    pub name: String,
    pub value: Option<f64>,
    #[serde(default)]
    pub auto_assign: bool,
    pub actor_id: Option<Uuid>,
    pub limit: Option<i64>,
    pub expires_in_minutes: Option<i64>,
    #[serde(default)]
    pub weight_overrides: HashMap<String, f64>,
    #[serde(default)]
    pub fairness: FairnessConfig,
}

#[derive(Serialize)]
pub struct CreateOpportunityResponse {
    pub opportunity: Opportunity,
    pub queue: Vec<QueueEntryView>,
}

/// Registers an opportunity and, when asked, builds its first queue in the same unit
/// of work. The registration only lands once the queue build has succeeded, so a
/// failed build leaves any earlier record under the same id untouched.
async fn create_opportunity(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateOpportunityRequest>,
) -> Result<Json<CreateOpportunityResponse>, AppError> {
    let target_type = payload.target_type.parse::<TargetType>()?;

    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("name cannot be empty".to_string()));
    }

    if payload
        .value
        .is_some_and(|value| !value.is_finite() || value < 0.0)
    {
        return Err(AppError::BadRequest(
            "value must be a non-negative number".to_string(),
        ));
    }

    let opportunity = Opportunity {
        target_type,
        target_id: payload.target_id.unwrap_or_else(Uuid::new_v4),
        name: payload.name.trim().to_string(),
        value: payload.value,
    };

    if !payload.auto_assign {
        state.directory.upsert_opportunity(opportunity.clone());
        return Ok(Json(CreateOpportunityResponse {
            opportunity,
            queue: Vec::new(),
        }));
    }

    let request = BuildQueueRequest {
        actor_id: payload.actor_id,
        limit: payload.limit,
        expires_in_minutes: payload.expires_in_minutes,
        weight_overrides: payload.weight_overrides,
        fairness: payload.fairness,
        ..BuildQueueRequest::new(opportunity.target_type, opportunity.target_id)
    };

    let start = Instant::now();
    let mut tx = state.store.begin().await;

    match build_queue_for(&state, &mut tx, request, Some(opportunity.clone())) {
        Ok(queue) => {
            state.directory.upsert_opportunity(opportunity.clone());
            tx.commit();
            state
                .metrics
                .queue_entries_created_total
                .inc_by(queue.len() as u64);
            let outcome = if queue.is_empty() { "empty" } else { "success" };
            state
                .metrics
                .observe_generation(outcome, start.elapsed().as_secs_f64());
            Ok(Json(CreateOpportunityResponse { opportunity, queue }))
        }
        Err(err) => {
            tx.rollback();
            state
                .metrics
                .observe_generation("error", start.elapsed().as_secs_f64());
            Err(err)
        }
    }
}
