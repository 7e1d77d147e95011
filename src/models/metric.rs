use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const BASELINE_RATING: f64 = 4.3;
pub const BASELINE_COMPLETION_RATE: f64 = 0.82;

/// Rolling assignment history for one freelancer.
///
/// `total_completed <= total_assigned` is the business expectation but nothing enforces
/// it: declines and reassignments never give back the assignment they consumed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FreelancerAssignmentMetric {
    pub freelancer_id: Uuid,
    pub rating: f64,
    pub completion_rate: f64,
    pub avg_assigned_value: Option<f64>,
    pub lifetime_assigned_value: f64,
    pub lifetime_completed_value: f64,
    pub total_assigned: u32,
    pub total_completed: u32,
    pub last_assigned_at: Option<DateTime<Utc>>,
    pub last_completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FreelancerAssignmentMetric {
    pub fn baseline(freelancer_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            freelancer_id,
            rating: BASELINE_RATING,
            completion_rate: BASELINE_COMPLETION_RATE,
            avg_assigned_value: None,
            lifetime_assigned_value: 0.0,
            lifetime_completed_value: 0.0,
            total_assigned: 0,
            total_completed: 0,
            last_assigned_at: None,
            last_completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Counts one more queue placement. The running average only moves when the
    /// opportunity carried a value.
    pub fn record_assignment(&mut self, project_value: Option<f64>, now: DateTime<Utc>) {
        let previous_count = self.total_assigned as f64;

        if let Some(value) = project_value {
            let previous_avg = self.avg_assigned_value.unwrap_or(0.0);
            self.avg_assigned_value =
                Some((previous_avg * previous_count + value) / (previous_count + 1.0));
            self.lifetime_assigned_value += value;
        }

        self.total_assigned = self.total_assigned.saturating_add(1);
        self.last_assigned_at = Some(now);
        self.updated_at = now;
    }

    pub fn record_completion(
        &mut self,
        rating: Option<f64>,
        completed_value: Option<f64>,
        now: DateTime<Utc>,
    ) {
        let previous_completed = self.total_completed as f64;

        if let Some(new_rating) = rating {
            let blended =
                (self.rating * previous_completed + new_rating) / (previous_completed + 1.0);
            self.rating = blended.clamp(0.0, 5.0);
        }

        self.total_completed = self.total_completed.saturating_add(1);
        self.lifetime_completed_value += completed_value.unwrap_or(0.0);
        self.last_completed_at = Some(now);
        self.refresh_completion_rate(now);
    }

    /// Re-derives the completion rate from the counters. With nothing assigned yet the
    /// stored rate is left alone.
    pub fn refresh_completion_rate(&mut self, now: DateTime<Utc>) {
        if self.total_assigned > 0 {
            let rate = self.total_completed as f64 / self.total_assigned as f64;
            self.completion_rate = rate.clamp(0.0, 1.0);
        }
        self.updated_at = now;
    }
}
