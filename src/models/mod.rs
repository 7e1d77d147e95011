pub mod freelancer;
pub mod metric;
pub mod opportunity;
pub mod queue_entry;
