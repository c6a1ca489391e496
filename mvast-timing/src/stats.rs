use std::collections::VecDeque;
use std::time::Duration;

/// Lateness of presented flips relative to their scheduled deadlines.
#[derive(Debug, Clone)]
pub struct FlipStats {
    samples: VecDeque<Duration>,
    max_samples: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LatenessSummary {
    pub count: usize,
    pub mean_ns: f64,
    pub jitter_ns: f64,
    pub min_ns: f64,
    pub max_ns: f64,
}

impl FlipStats {
    pub fn new() -> Self {
        Self::with_capacity(1000)
    }

    pub fn with_capacity(max_samples: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(max_samples.min(1000)),
            max_samples: max_samples.max(1),
        }
    }

    /// Records flip lateness; keeps the most recent `max_samples`.
    pub fn record(&mut self, lateness: Duration) {
        if self.samples.len() >= self.max_samples {
            self.samples.pop_front();
        }
        self.samples.push_back(lateness);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn summary(&self) -> LatenessSummary {
        if self.samples.is_empty() {
            return LatenessSummary::default();
        }
        let times: Vec<f64> = self
            .samples
            .iter()
            .map(|d| d.as_nanos() as f64)
            .collect();
        let n = times.len() as f64;
        let mean = times.iter().sum::<f64>() / n;
        let var = times.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
        LatenessSummary {
            count: times.len(),
            mean_ns: mean,
            jitter_ns: var.sqrt(),
            min_ns: times.iter().copied().fold(f64::INFINITY, f64::min),
            max_ns: times.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        }
    }
}

impl Default for FlipStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summarises_recorded_lateness() {
        let mut stats = FlipStats::new();
        assert_eq!(stats.summary(), LatenessSummary::default());
        for us in [100, 300] {
            stats.record(Duration::from_micros(us));
        }
        let s = stats.summary();
        assert_eq!(s.count, 2);
        assert_eq!(s.mean_ns, 200_000.0);
        assert_eq!(s.jitter_ns, 100_000.0);
        assert_eq!(s.min_ns, 100_000.0);
        assert_eq!(s.max_ns, 300_000.0);
    }

    #[test]
    fn keeps_only_recent_samples() {
        let mut stats = FlipStats::with_capacity(3);
        for ms in 1..=5 {
            stats.record(Duration::from_millis(ms));
        }
        assert_eq!(stats.len(), 3);
        assert_eq!(stats.summary().min_ns, 3_000_000.0);
    }

    #[test]
    fn a_full_window_slides_one_sample_at_a_time() {
        let mut stats = FlipStats::new();
        for us in 0..5000u64 {
            stats.record(Duration::from_micros(us));
        }
        let s = stats.summary();
        assert_eq!(s.count, 1000);
        assert_eq!(s.min_ns, 4_000_000.0);
        assert_eq!(s.max_ns, 4_999_000.0);
    }
}
