use std::sync::RwLock;

/// Destination for the per-step samples the verifier emits. Fire-and-forget:
/// implementations must not block the conversation pipeline.
pub trait SampleSink: Send + Sync {
    /// One sample per step: did the HTTP exchange fail validation?
    fn record_error(&self, failed: bool);

    /// One sample per step: wall-clock latency of the webhook round trip.
    fn record_latency(&self, millis: f64);
}

/// Hit/total rate accumulator.
#[derive(Debug, Default, Clone)]
pub struct Rate {
    hits: u64,
    total: u64,
}

impl Rate {
    pub fn add(&mut self, hit: bool) {
        self.total += 1;
        if hit {
            self.hits += 1;
        }
    }

    pub fn rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.hits as f64 / self.total as f64
        }
    }

    pub fn total(&self) -> u64 {
        self.total
    }
}

/// Latency trend accumulator with average and percentile readouts.
#[derive(Debug, Default, Clone)]
pub struct Trend {
    samples: Vec<f64>,
}

impl Trend {
    pub fn add(&mut self, sample: f64) {
        self.samples.push(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn avg(&self) -> f64 {
        if self.samples.is_empty() {
            0.0
        } else {
            self.samples.iter().sum::<f64>() / self.samples.len() as f64
        }
    }

    /// Nearest-rank percentile over all recorded samples.
    pub fn percentile(&self, p: f64) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let mut sorted = self.samples.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let rank = ((p / 100.0) * sorted.len() as f64).ceil() as usize;
        sorted[rank.saturating_sub(1).min(sorted.len() - 1)]
    }
}

/// In-memory sink shared across simulated users.
#[derive(Debug, Default)]
pub struct InMemorySink {
    errors: RwLock<Rate>,
    latency: RwLock<Trend>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error_rate(&self) -> f64 {
        self.errors.read().unwrap().rate()
    }

    pub fn latency_avg(&self) -> f64 {
        self.latency.read().unwrap().avg()
    }

    pub fn latency_percentile(&self, p: f64) -> f64 {
        self.latency.read().unwrap().percentile(p)
    }

    pub fn samples(&self) -> u64 {
        self.errors.read().unwrap().total()
    }
}

impl SampleSink for InMemorySink {
    fn record_error(&self, failed: bool) {
        self.errors.write().unwrap().add(failed);
    }

    fn record_latency(&self, millis: f64) {
        self.latency.write().unwrap().add(millis);
    }
}

/// Discards every sample.
#[derive(Debug, Default)]
pub struct NullSink;

impl SampleSink for NullSink {
    fn record_error(&self, _failed: bool) {}

    fn record_latency(&self, _millis: f64) {}
}
