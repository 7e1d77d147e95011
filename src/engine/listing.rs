use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::freelancer::FreelancerIdentity;
use crate::models::metric::FreelancerAssignmentMetric;
use crate::models::opportunity::TargetType;
use crate::models::queue_entry::{QueueEntry, QueueEntryView, QueueStatus};
use crate::state::AppState;

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone)]
pub struct FreelancerQueueQuery {
    pub freelancer_id: Uuid,
    pub page: Option<usize>,
    pub page_size: Option<usize>,
    pub statuses: Vec<QueueStatus>,
}

impl FreelancerQueueQuery {
    pub fn new(freelancer_id: Uuid) -> Self {
        Self {
            freelancer_id,
            page: None,
            page_size: None,
            statuses: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Pagination {
    pub page: usize,
    pub page_size: usize,
    pub total: usize,
    pub total_pages: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FreelancerQueuePage {
    pub entries: Vec<QueueEntryView>,
    pub pagination: Pagination,
}

/// Parses a comma separated status filter, dropping names outside the status enum.
pub fn parse_status_filter(raw: &str) -> Vec<QueueStatus> {
    raw.split(',')
        .filter_map(|name| name.parse::<QueueStatus>().ok())
        .collect()
}

/// Status ascending (open before resolved), bucket ascending, score descending, oldest
/// first, then generation slot.
fn listing_order(a: &QueueEntry, b: &QueueEntry) -> Ordering {
    a.status
        .cmp(&b.status)
        .then_with(|| a.priority_bucket.cmp(&b.priority_bucket))
        .then_with(|| b.score.total_cmp(&a.score))
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.rank.cmp(&b.rank))
        .then_with(|| a.id.cmp(&b.id))
}

fn to_view(state: &AppState, position: usize, entry: QueueEntry) -> QueueEntryView {
    let freelancer = state
        .directory
        .user(&entry.freelancer_id)
        .as_ref()
        .map(FreelancerIdentity::from);
    let opportunity_name = entry.metadata.opportunity_name.clone();

    QueueEntryView {
        position,
        entry,
        freelancer,
        opportunity_name,
    }
}

pub async fn list_freelancer_queue(
    state: &AppState,
    query: FreelancerQueueQuery,
) -> Result<FreelancerQueuePage, AppError> {
    let statuses = if query.statuses.is_empty() {
        vec![QueueStatus::Pending, QueueStatus::Notified]
    } else {
        query.statuses
    };
    let page = query.page.unwrap_or(1).max(1);
    let page_size = query
        .page_size
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);

    let mut entries: Vec<QueueEntry> = state
        .store
        .read(|tables| {
            tables
                .entries_for_freelancer(query.freelancer_id)
                .into_iter()
                .filter(|entry| statuses.contains(&entry.status))
                .cloned()
                .collect()
        })
        .await;
    entries.sort_by(listing_order);

    let total = entries.len();
    let offset = (page - 1).saturating_mul(page_size);
    let views = entries
        .into_iter()
        .enumerate()
        .skip(offset)
        .take(page_size)
        .map(|(index, entry)| to_view(state, index + 1, entry))
        .collect();

    Ok(FreelancerQueuePage {
        entries: views,
        pagination: Pagination {
            page,
            page_size,
            total,
            total_pages: total.div_ceil(page_size),
        },
    })
}

pub async fn get_project_queue(
    state: &AppState,
    target_type: TargetType,
    target_id: Uuid,
) -> Result<Vec<QueueEntryView>, AppError> {
    let mut entries: Vec<QueueEntry> = state
        .store
        .read(|tables| {
            tables
                .entries_for_target(target_type, target_id)
                .into_iter()
                .cloned()
                .collect()
        })
        .await;
    entries.sort_by(listing_order);

    Ok(entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| to_view(state, index + 1, entry))
        .collect())
}

/// Current metrics for a known user. Users never queued get the baseline row, which
/// is not persisted.
pub async fn get_freelancer_metrics(
    state: &AppState,
    freelancer_id: Uuid,
) -> Result<FreelancerAssignmentMetric, AppError> {
    if state.directory.user(&freelancer_id).is_none() {
        return Err(AppError::NotFound(format!(
            "freelancer {freelancer_id} not found"
        )));
    }

    let stored = state
        .store
        .read(|tables| tables.metric(&freelancer_id).cloned())
        .await;

    Ok(stored
        .unwrap_or_else(|| FreelancerAssignmentMetric::baseline(freelancer_id, state.clock.now())))
}

#[cfg(test)]
mod tests {
    use super::parse_status_filter;
    use crate::models::queue_entry::QueueStatus;

    #[test]
    fn status_filter_drops_unknown_names() {
        assert_eq!(
            parse_status_filter("accepted, bogus,EXPIRED,"),
            vec![QueueStatus::Accepted, QueueStatus::Expired]
        );
        assert!(parse_status_filter("").is_empty());
    }
}
