pub mod listing;
pub mod queue;
pub mod resolution;
pub mod scoring;
pub mod selection;
pub mod weights;

pub use listing::{get_freelancer_metrics, get_project_queue, list_freelancer_queue};
pub use queue::{build_assignment_queue, build_assignment_queue_in, build_queue_for};
pub use resolution::resolve_queue_entry;
pub use scoring::score_freelancer_for_project;
