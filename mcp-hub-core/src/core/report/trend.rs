use crate::utils::{self, DAY_MS, HOUR_MS, MINUTE_MS};
use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Aggregate of one ticker interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSnapshot {
    pub timestamp_ms: u64,
    pub avg_response_time_ms: f64,
    pub call_count: u64,
    pub error_rate_pct: f64,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrendRange {
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "24h")]
    OneDay,
    #[serde(rename = "7d")]
    SevenDays,
}

impl Default for TrendRange {
    fn default() -> Self {
        TrendRange::OneHour
    }
}

impl TrendRange {
    #[inline]
    pub fn points(self) -> usize {
        match self {
            TrendRange::OneHour => 12,
            TrendRange::OneDay => 24,
            TrendRange::SevenDays => 7,
        }
    }

    #[inline]
    pub fn bucket_ms(self) -> u64 {
        match self {
            TrendRange::OneHour => 5 * MINUTE_MS,
            TrendRange::OneDay => HOUR_MS,
            TrendRange::SevenDays => DAY_MS,
        }
    }

    #[inline]
    pub fn span_ms(self) -> u64 {
        self.points() as u64 * self.bucket_ms()
    }

    /// Chart label of the bucket starting at `bucket_start_ms`.
    pub fn label(self, bucket_start_ms: u64) -> String {
        match self {
            TrendRange::OneHour => utils::format_hour_minute(bucket_start_ms),
            TrendRange::OneDay => utils::format_hour(bucket_start_ms),
            TrendRange::SevenDays => utils::format_month_day(bucket_start_ms),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TrendRange::OneHour => "1h",
            TrendRange::OneDay => "24h",
            TrendRange::SevenDays => "7d",
        }
    }
}

impl fmt::Display for TrendRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrendRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1h" => Ok(TrendRange::OneHour),
            "24h" => Ok(TrendRange::OneDay),
            "7d" => Ok(TrendRange::SevenDays),
            _ => Err(Error::msg(format!("unknown trend range: {}", s))),
        }
    }
}

/// Fixed-length chart series; all four vectors have `range.points()` entries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendSeries {
    pub range: TrendRange,
    pub labels: Vec<String>,
    pub avg_response_time: Vec<f64>,
    pub call_count: Vec<u64>,
    pub error_rate: Vec<f64>,
}

impl TrendSeries {
    #[inline]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

#[derive(Default, Clone, Copy)]
struct Bucket {
    calls: u64,
    latency_weighted: f64,
    error_weighted: f64,
}

/// `resample` folds snapshots into `range.points()` buckets ending at `now`.
/// Bucket `i` covers `(start_i, start_i + bucket_ms]`. Averages are weighted by call count.
/// A bucket without calls reports 0 calls, 0% errors and the previous bucket's latency.
pub fn resample(range: TrendRange, snapshots: &[PerformanceSnapshot], now: u64) -> TrendSeries {
    let points = range.points();
    let bucket_ms = range.bucket_ms();
    let first_start = now.saturating_sub(range.span_ms());

    let mut buckets = vec![Bucket::default(); points];
    for snapshot in snapshots {
        let ts = snapshot.timestamp_ms;
        if ts <= first_start || ts > now || snapshot.call_count == 0 {
            continue;
        }
        let idx = (((ts - first_start - 1) / bucket_ms) as usize).min(points - 1);
        let calls = snapshot.call_count as f64;
        let bucket = &mut buckets[idx];
        bucket.calls += snapshot.call_count;
        bucket.latency_weighted += snapshot.avg_response_time_ms * calls;
        bucket.error_weighted += snapshot.error_rate_pct * calls;
    }

    let mut series = TrendSeries {
        range,
        labels: Vec::with_capacity(points),
        avg_response_time: Vec::with_capacity(points),
        call_count: Vec::with_capacity(points),
        error_rate: Vec::with_capacity(points),
    };
    let mut prev_avg = 0.0;
    for (i, bucket) in buckets.iter().enumerate() {
        series
            .labels
            .push(range.label(first_start + i as u64 * bucket_ms));
        series.call_count.push(bucket.calls);
        if bucket.calls > 0 {
            let calls = bucket.calls as f64;
            prev_avg = utils::round2(bucket.latency_weighted / calls);
            series.avg_response_time.push(prev_avg);
            series
                .error_rate
                .push(utils::round2(bucket.error_weighted / calls));
        } else {
            series.avg_response_time.push(prev_avg);
            series.error_rate.push(0.0);
        }
    }
    series
}

#[cfg(test)]
mod test {
    use super::*;

    // 2024-03-05 14:00:00 UTC
    const NOW: u64 = 1_709_647_200_000;

    fn snapshot(timestamp_ms: u64, avg: f64, calls: u64, errors: f64) -> PerformanceSnapshot {
        PerformanceSnapshot {
            timestamp_ms,
            avg_response_time_ms: avg,
            call_count: calls,
            error_rate_pct: errors,
        }
    }

    #[test]
    fn parse_ranges() {
        assert_eq!("1h".parse::<TrendRange>().unwrap(), TrendRange::OneHour);
        assert_eq!("24h".parse::<TrendRange>().unwrap(), TrendRange::OneDay);
        assert_eq!("7d".parse::<TrendRange>().unwrap(), TrendRange::SevenDays);
        assert!("30d".parse::<TrendRange>().is_err());
    }

    #[test]
    fn fixed_lengths_without_data() {
        for (range, points) in [
            (TrendRange::OneHour, 12),
            (TrendRange::OneDay, 24),
            (TrendRange::SevenDays, 7),
        ] {
            let series = resample(range, &[], NOW);
            assert_eq!(series.labels.len(), points);
            assert_eq!(series.avg_response_time.len(), points);
            assert_eq!(series.call_count.len(), points);
            assert_eq!(series.error_rate.len(), points);
            assert!(series.avg_response_time.iter().all(|v| *v == 0.0));
        }
    }

    #[test]
    fn labels() {
        let hour = resample(TrendRange::OneHour, &[], NOW);
        assert_eq!(hour.labels[0], "13:00");
        assert_eq!(hour.labels[11], "13:55");
        let day = resample(TrendRange::OneDay, &[], NOW);
        assert_eq!(day.labels[0], "14:00");
        assert_eq!(day.labels[23], "13:00");
        let week = resample(TrendRange::SevenDays, &[], NOW);
        assert_eq!(week.labels[0], "02-27");
        assert_eq!(week.labels[6], "03-04");
    }

    #[test]
    fn weighted_buckets_and_carry_forward() {
        let minute = MINUTE_MS;
        let snapshots = vec![
            // bucket 0: (13:00, 13:05]
            snapshot(NOW - 59 * minute, 100.0, 10, 0.0),
            snapshot(NOW - 56 * minute, 400.0, 30, 10.0),
            // idle interval in bucket 1 is ignored
            snapshot(NOW - 53 * minute, 0.0, 0, 0.0),
            // bucket 11: (13:55, 14:00], the boundary belongs to the later bucket
            snapshot(NOW, 50.0, 5, 20.0),
            // outside the range
            snapshot(NOW - 60 * minute, 999.0, 100, 100.0),
        ];
        let series = resample(TrendRange::OneHour, &snapshots, NOW);
        assert_eq!(series.call_count[0], 40);
        assert_eq!(series.avg_response_time[0], 325.0);
        assert_eq!(series.error_rate[0], 7.5);
        // empty buckets carry the previous latency, with no calls and no errors
        assert_eq!(series.call_count[1], 0);
        assert_eq!(series.avg_response_time[1], 325.0);
        assert_eq!(series.error_rate[1], 0.0);
        assert_eq!(series.avg_response_time[10], 325.0);
        assert_eq!(series.call_count[11], 5);
        assert_eq!(series.avg_response_time[11], 50.0);
        assert_eq!(series.error_rate[11], 20.0);
        assert_eq!(series.call_count.iter().sum::<u64>(), 45);
    }
}
