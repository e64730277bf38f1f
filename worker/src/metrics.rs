use std::time::Duration;

/// Counters and timings of a single configuration's run.
#[derive(Debug, Default, Clone)]
pub struct JobMetrics {
    pub load_time: Duration,
    pub infer_time: Duration,
    pub score_time: Duration,

    pub batches: u64,
    pub samples: u64,
}

impl JobMetrics {
    #[inline]
    pub fn bump_batch(&mut self) {
        self.batches += 1;
    }

    #[inline]
    pub fn add_samples(&mut self, n: usize) {
        self.samples += n as u64;
    }
}
