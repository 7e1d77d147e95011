use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;

use crate::engine::listing::get_project_queue;
use crate::engine::queue::{BuildQueuePayload, BuildQueueRequest, build_assignment_queue};
use crate::engine::resolution::{ResolveOptions, resolve_queue_entry};
use crate::error::AppError;
use crate::models::opportunity::TargetType;
use crate::models::queue_entry::{QueueEntryView, ResolutionStatus, ResolvedEntry};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/queues", post(create_queue))
        .route("/queues/:target_type/:target_id", get(project_queue))
        .route("/queue-entries/:id/resolve", post(resolve_entry))
}

#[derive(Deserialize)]
pub struct ResolveRequest {
    pub status: String,
    #[serde(flatten)]
    pub options: ResolveOptions,
}

async fn create_queue(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<BuildQueuePayload>,
) -> Result<Json<Vec<QueueEntryView>>, AppError> {
    let request = BuildQueueRequest::try_from(payload)?;
    Ok(Json(build_assignment_queue(&state, request).await?))
}

async fn project_queue(
    State(state): State<Arc<AppState>>,
    Path((target_type, target_id)): Path<(String, Uuid)>,
) -> Result<Json<Vec<QueueEntryView>>, AppError> {
    let target_type = target_type.parse::<TargetType>()?;
    Ok(Json(get_project_queue(&state, target_type, target_id).await?))
}

async fn resolve_entry(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ResolveRequest>,
) -> Result<Json<ResolvedEntry>, AppError> {
    let status = payload.status.parse::<ResolutionStatus>()?;
    Ok(Json(
        resolve_queue_entry(&state, id, status, payload.options).await?,
    ))
}
