use dashmap::DashMap;
use uuid::Uuid;

use crate::models::freelancer::{Freelancer, UserType};
use crate::models::opportunity::{Opportunity, TargetType};

/// Upstream user and opportunity records. The assignment core only reads from here.
#[derive(Debug, Default)]
pub struct Directory {
    users: DashMap<Uuid, Freelancer>,
    opportunities: DashMap<(TargetType, Uuid), Opportunity>,
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert_user(&self, user: Freelancer) {
        self.users.insert(user.id, user);
    }

    pub fn user(&self, id: &Uuid) -> Option<Freelancer> {
        self.users.get(id).map(|entry| entry.value().clone())
    }

    /// All users eligible for auto-assignment, ordered by id.
    pub fn freelancers(&self) -> Vec<Freelancer> {
        let mut freelancers: Vec<Freelancer> = self
            .users
            .iter()
            .filter(|entry| entry.value().user_type == UserType::Freelancer)
            .map(|entry| entry.value().clone())
            .collect();
        freelancers.sort_by_key(|freelancer| freelancer.id);
        freelancers
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub fn upsert_opportunity(&self, opportunity: Opportunity) {
        self.opportunities
            .insert((opportunity.target_type, opportunity.target_id), opportunity);
    }

    pub fn opportunity(&self, target_type: TargetType, target_id: Uuid) -> Option<Opportunity> {
        self.opportunities
            .get(&(target_type, target_id))
            .map(|entry| entry.value().clone())
    }

    pub fn opportunity_count(&self) -> usize {
        self.opportunities.len()
    }
}
