use serde::{Deserialize, Serialize};

pub const LATENCY_BUCKET_COUNT: usize = 5;

/// Lower edges of the latency buckets in milliseconds; the last bucket is unbounded.
pub const LATENCY_BUCKET_EDGES_MS: [u64; LATENCY_BUCKET_COUNT] = [0, 100, 500, 1000, 2000];

pub const LATENCY_BUCKET_LABELS: [&str; LATENCY_BUCKET_COUNT] = [
    "< 100ms",
    "100-500ms",
    "500-1000ms",
    "1000-2000ms",
    "> 2000ms",
];

/// Fixed-edge latency histogram. Every recorded latency falls in exactly one bucket,
/// so the bucket counts always sum to the number of recorded calls.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatencyHistogram {
    buckets: [u64; LATENCY_BUCKET_COUNT],
}

impl LatencyHistogram {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn bucket_index(latency_ms: u64) -> usize {
        LATENCY_BUCKET_EDGES_MS
            .iter()
            .rposition(|edge| latency_ms >= *edge)
            .unwrap_or(0)
    }

    #[inline]
    pub fn record(&mut self, latency_ms: u64) {
        self.buckets[Self::bucket_index(latency_ms)] += 1;
    }

    pub fn merge(&mut self, other: &LatencyHistogram) {
        for (mine, theirs) in self.buckets.iter_mut().zip(other.buckets.iter()) {
            *mine += *theirs;
        }
    }

    #[inline]
    pub fn buckets(&self) -> [u64; LATENCY_BUCKET_COUNT] {
        self.buckets
    }

    pub fn total(&self) -> u64 {
        self.buckets.iter().sum()
    }
}

impl FromIterator<u64> for LatencyHistogram {
    fn from_iter<I: IntoIterator<Item = u64>>(iter: I) -> Self {
        let mut histogram = LatencyHistogram::new();
        for latency in iter {
            histogram.record(latency);
        }
        histogram
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::Rng;

    #[test]
    fn bucket_edges() {
        let cases = [
            (0, 0),
            (99, 0),
            (100, 1),
            (499, 1),
            (500, 2),
            (999, 2),
            (1000, 3),
            (1999, 3),
            (2000, 4),
            (u64::MAX, 4),
        ];
        for (latency, bucket) in cases {
            assert_eq!(LatencyHistogram::bucket_index(latency), bucket, "{}", latency);
        }
    }

    #[test]
    fn buckets_sum_to_total() {
        let mut rng = rand::thread_rng();
        for _ in 0..20 {
            let n = rng.gen_range(0..500);
            let histogram: LatencyHistogram = (0..n).map(|_| rng.gen_range(0..5000)).collect();
            assert_eq!(histogram.total(), n as u64);
        }
    }

    #[test]
    fn merge_adds_buckets() {
        let mut a: LatencyHistogram = vec![10, 200].into_iter().collect();
        let b: LatencyHistogram = vec![3000, 50].into_iter().collect();
        a.merge(&b);
        assert_eq!(a.buckets(), [2, 1, 0, 0, 1]);
    }
}
