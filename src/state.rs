use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::engine::weights::ScoringWeights;
use crate::observability::metrics::Metrics;
use crate::store::Store;
use crate::store::directory::Directory;

pub struct AppState {
    pub directory: Directory,
    pub store: Store,
    pub metrics: Metrics,
    pub clock: Arc<dyn Clock>,
    /// Base weights every queue generation starts from before request overrides.
    pub weights: ScoringWeights,
}

impl AppState {
    pub fn new(event_buffer_size: usize) -> Self {
        Self::with_clock(event_buffer_size, Arc::new(SystemClock))
    }

    pub fn with_clock(event_buffer_size: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            directory: Directory::new(),
            store: Store::new(event_buffer_size),
            metrics: Metrics::new(),
            clock,
            weights: ScoringWeights::default(),
        }
    }

    pub fn with_weights(mut self, weights: ScoringWeights) -> Self {
        self.weights = weights;
        self
    }
}
