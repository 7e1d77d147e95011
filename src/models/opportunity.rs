use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// Kinds of opportunity a freelancer can be queued for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    Project,
    Job,
    Gig,
    Volunteering,
    Launchpad,
    Mentorship,
}

impl TargetType {
    pub const ALL: [TargetType; 6] = [
        TargetType::Project,
        TargetType::Job,
        TargetType::Gig,
        TargetType::Volunteering,
        TargetType::Launchpad,
        TargetType::Mentorship,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TargetType::Project => "project",
            TargetType::Job => "job",
            TargetType::Gig => "gig",
            TargetType::Volunteering => "volunteering",
            TargetType::Launchpad => "launchpad",
            TargetType::Mentorship => "mentorship",
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetType {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase();
        TargetType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| AppError::BadRequest(format!("unsupported target type: {raw}")))
    }
}

/// An opportunity registered with the upstream directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Opportunity {
    pub target_type: TargetType,
    pub target_id: Uuid,
    pub name: String,
    pub value: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::TargetType;

    #[test]
    fn parses_known_target_types_case_insensitively() {
        assert_eq!("project".parse::<TargetType>().unwrap(), TargetType::Project);
        assert_eq!(" Gig ".parse::<TargetType>().unwrap(), TargetType::Gig);
    }

    #[test]
    fn rejects_unknown_target_type() {
        assert!("auction".parse::<TargetType>().is_err());
    }
}
