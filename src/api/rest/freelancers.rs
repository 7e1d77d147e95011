use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::engine::listing::{
    FreelancerQueuePage, FreelancerQueueQuery, get_freelancer_metrics, list_freelancer_queue,
    parse_status_filter,
};
use crate::error::AppError;
use crate::models::freelancer::{Freelancer, FreelancerIdentity, UserType};
use crate::models::metric::FreelancerAssignmentMetric;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/freelancers", post(create_user).get(list_freelancers))
        .route("/freelancers/:id/queue", get(freelancer_queue))
        .route("/freelancers/:id/metrics", get(freelancer_metrics))
}

#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub user_type: Option<UserType>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
pub struct QueueParams {
    pub page: Option<usize>,
    pub page_size: Option<usize>,
    pub statuses: Option<String>,
}

async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<Json<Freelancer>, AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("name cannot be empty".to_string()));
    }

    if !payload.email.contains('@') {
        return Err(AppError::BadRequest("email is not valid".to_string()));
    }

    let user = Freelancer {
        id: Uuid::new_v4(),
        name: payload.name.trim().to_string(),
        email: payload.email.trim().to_ascii_lowercase(),
        user_type: payload.user_type.unwrap_or(UserType::Freelancer),
        password_hash: None,
        created_at: payload.created_at.unwrap_or_else(|| state.clock.now()),
    };

    state.directory.upsert_user(user.clone());
    Ok(Json(user))
}

async fn list_freelancers(State(state): State<Arc<AppState>>) -> Json<Vec<FreelancerIdentity>> {
    let freelancers = state
        .directory
        .freelancers()
        .iter()
        .map(FreelancerIdentity::from)
        .collect();
    Json(freelancers)
}

async fn freelancer_queue(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(params): Query<QueueParams>,
) -> Result<Json<FreelancerQueuePage>, AppError> {
    let query = FreelancerQueueQuery {
        freelancer_id: id,
        page: params.page,
        page_size: params.page_size,
        statuses: params
            .statuses
            .as_deref()
            .map(parse_status_filter)
            .unwrap_or_default(),
    };

    Ok(Json(list_freelancer_queue(&state, query).await?))
}

async fn freelancer_metrics(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<FreelancerAssignmentMetric>, AppError> {
    Ok(Json(get_freelancer_metrics(&state, id).await?))
}
