use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::selection::SelectionDecision;
use crate::engine::weights::ScoringWeights;
use crate::error::AppError;
use crate::models::freelancer::FreelancerIdentity;
use crate::models::opportunity::TargetType;

/// Declaration order is the listing order: open entries first, expired history last.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum QueueStatus {
    Pending,
    Notified,
    Accepted,
    Declined,
    Reassigned,
    Expired,
}

impl QueueStatus {
    pub const ALL: [QueueStatus; 6] = [
        QueueStatus::Pending,
        QueueStatus::Notified,
        QueueStatus::Accepted,
        QueueStatus::Declined,
        QueueStatus::Reassigned,
        QueueStatus::Expired,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QueueStatus::Pending => "pending",
            QueueStatus::Notified => "notified",
            QueueStatus::Accepted => "accepted",
            QueueStatus::Declined => "declined",
            QueueStatus::Reassigned => "reassigned",
            QueueStatus::Expired => "expired",
        }
    }

    /// Entries still waiting on the freelancer.
    pub fn is_open(&self) -> bool {
        matches!(self, QueueStatus::Pending | QueueStatus::Notified)
    }
}

impl fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueueStatus {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase();
        QueueStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| AppError::BadRequest(format!("unsupported queue status: {raw}")))
    }
}

/// Outcomes a caller may resolve an open entry to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStatus {
    Accepted,
    Declined,
    Reassigned,
}

impl From<ResolutionStatus> for QueueStatus {
    fn from(status: ResolutionStatus) -> Self {
        match status {
            ResolutionStatus::Accepted => QueueStatus::Accepted,
            ResolutionStatus::Declined => QueueStatus::Declined,
            ResolutionStatus::Reassigned => QueueStatus::Reassigned,
        }
    }
}

impl FromStr for ResolutionStatus {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "accepted" => Ok(ResolutionStatus::Accepted),
            "declined" => Ok(ResolutionStatus::Declined),
            "reassigned" => Ok(ResolutionStatus::Reassigned),
            _ => Err(AppError::BadRequest(format!(
                "unsupported resolution status: {raw}, expected accepted/declined/reassigned"
            ))),
        }
    }
}

/// Every intermediate value the scoring function looked at.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoreBreakdown {
    pub recency_days: Option<f64>,
    pub recency_score: f64,
    pub rating: f64,
    pub rating_score: f64,
    pub completion_days: Option<f64>,
    pub completion_recency_score: f64,
    pub completion_rate: f64,
    pub completion_quality_score: f64,
    pub project_value: Option<f64>,
    pub avg_assigned_value: Option<f64>,
    pub value_ratio: Option<f64>,
    pub earnings_balance_score: f64,
    pub account_age_days: Option<f64>,
    pub early_career_boost: Option<f64>,
    pub opportunity_spread_boost: Option<f64>,
    pub new_freelancer_score: f64,
    pub total_assigned: u32,
    pub total_completed: u32,
    pub weighted_total: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResolutionAudit {
    pub status: ResolutionStatus,
    pub actor_id: Option<Uuid>,
    pub rating: Option<f64>,
    pub completion_value: Option<f64>,
    pub resolved_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueueEntryMetadata {
    pub breakdown: ScoreBreakdown,
    pub opportunity_name: Option<String>,
    pub generated_by: Option<Uuid>,
    pub weights: ScoringWeights,
    pub fairness: SelectionDecision,
    pub fairness_forced: bool,
    pub resolution: Option<ResolutionAudit>,
    pub expired_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueueEntry {
    pub id: Uuid,
    pub generation_id: Uuid,
    pub target_type: TargetType,
    pub target_id: Uuid,
    pub freelancer_id: Uuid,
    pub status: QueueStatus,
    pub score: f64,
    pub priority_bucket: u8,
    /// 1-based slot within its generation.
    pub rank: u32,
    pub project_value: Option<f64>,
    pub notified_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
    pub metadata: QueueEntryMetadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl QueueEntry {
    pub fn is_for(&self, target_type: TargetType, target_id: Uuid) -> bool {
        self.target_type == target_type && self.target_id == target_id
    }
}

/// A queue entry as handed to callers, with its position and the sanitized freelancer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEntryView {
    pub position: usize,
    #[serde(flatten)]
    pub entry: QueueEntry,
    pub freelancer: Option<FreelancerIdentity>,
    pub opportunity_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedEntry {
    #[serde(flatten)]
    pub entry: QueueEntry,
    pub freelancer: Option<FreelancerIdentity>,
}

/// Messages for downstream notification dispatch, published after commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum QueueEvent {
    Notified {
        entry_id: Uuid,
        freelancer_id: Uuid,
        target_type: TargetType,
        target_id: Uuid,
        expires_at: DateTime<Utc>,
    },
    Resolved {
        entry_id: Uuid,
        freelancer_id: Uuid,
        target_type: TargetType,
        target_id: Uuid,
        status: QueueStatus,
    },
}
