use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UserType {
    Freelancer,
    Client,
    Agency,
    Admin,
}

/// A user record as held by the upstream directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Freelancer {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub user_type: UserType,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// The only shape of a user that leaves the assignment core.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FreelancerIdentity {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<&Freelancer> for FreelancerIdentity {
    fn from(freelancer: &Freelancer) -> Self {
        Self {
            id: freelancer.id,
            name: freelancer.name.clone(),
            email: freelancer.email.clone(),
            created_at: freelancer.created_at,
        }
    }
}
