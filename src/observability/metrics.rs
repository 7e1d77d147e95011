use prometheus::{
    Encoder, GaugeVec, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub queue_generations_total: IntCounterVec,
    pub queue_generation_latency_seconds: HistogramVec,
    pub queue_entries_created_total: IntCounter,
    pub queue_resolutions_total: IntCounterVec,
    pub freelancer_completion_rate: GaugeVec,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let queue_generations_total = IntCounterVec::new(
            Opts::new("queue_generations_total", "Queue generations by outcome"),
            &["outcome"],
        )
        .expect("valid queue_generations_total metric");

        let queue_generation_latency_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "queue_generation_latency_seconds",
                "Latency of queue generation in seconds",
            ),
            &["outcome"],
        )
        .expect("valid queue_generation_latency_seconds metric");

        let queue_entries_created_total = IntCounter::new(
            "queue_entries_created_total",
            "Queue entries created across all generations",
        )
        .expect("valid queue_entries_created_total metric");

        let queue_resolutions_total = IntCounterVec::new(
            Opts::new("queue_resolutions_total", "Queue entry resolutions by status"),
            &["status"],
        )
        .expect("valid queue_resolutions_total metric");

        let freelancer_completion_rate = GaugeVec::new(
            Opts::new("freelancer_completion_rate", "Freelancer completion rate [0..1]"),
            &["freelancer_id"],
        )
        .expect("valid freelancer_completion_rate metric");

        registry
            .register(Box::new(queue_generations_total.clone()))
            .expect("register queue_generations_total");
        registry
            .register(Box::new(queue_generation_latency_seconds.clone()))
            .expect("register queue_generation_latency_seconds");
        registry
            .register(Box::new(queue_entries_created_total.clone()))
            .expect("register queue_entries_created_total");
        registry
            .register(Box::new(queue_resolutions_total.clone()))
            .expect("register queue_resolutions_total");
        registry
            .register(Box::new(freelancer_completion_rate.clone()))
            .expect("register freelancer_completion_rate");

        Self {
            registry,
            queue_generations_total,
            queue_generation_latency_seconds,
            queue_entries_created_total,
            queue_resolutions_total,
            freelancer_completion_rate,
        }
    }

    pub fn observe_generation(&self, outcome: &str, elapsed_seconds: f64) {
        self.queue_generation_latency_seconds
            .with_label_values(&[outcome])
            .observe(elapsed_seconds);
        self.queue_generations_total
            .with_label_values(&[outcome])
            .inc();
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}
