//! Aggregator service for bucketing claim-cost samples into chartable windows

use crate::types::{Bucket, Result, RctrackError, Sample, Scale, ScaleThresholds};
use chrono::{DateTime, Local, Utc};
use std::collections::BTreeMap;

/// One hour in milliseconds
pub const HOUR_MS: i64 = 3_600_000;

/// One day in milliseconds
pub const DAY_MS: i64 = 86_400_000;

/// UTC-minus-local offset in milliseconds at `at`.
///
/// Passing this as `tz_offset_ms` makes day buckets start at local midnight.
pub fn local_offset_ms(at: DateTime<Utc>) -> i64 {
    let east_secs = at.with_timezone(&Local).offset().local_minus_utc();
    -(east_secs as i64) * 1000
}

/// Running statistics for one bucket
#[derive(Debug, Clone, Copy)]
struct Accumulator {
    sum: f64,
    count: u64,
    min: f64,
    max: f64,
}

impl Accumulator {
    fn new(value: f64) -> Self {
        Self {
            sum: 0.0,
            count: 0,
            min: value,
            max: value,
        }
    }

    fn add(&mut self, value: f64) {
        self.sum += value;
        self.count = self.count.saturating_add(1);
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    fn finish(self, start_ms: i64) -> Bucket {
        Bucket {
            start_ms,
            // Float rounding on the sum can push the mean a hair past the extremes
            average: (self.sum / self.count as f64).clamp(self.min, self.max),
            minimum: self.min,
            maximum: self.max,
            count: self.count,
        }
    }
}

/// Stateless time-series aggregator
pub struct TimeSeriesAggregator;

impl TimeSeriesAggregator {
    /// Bucket key for a timestamp: the start of its `interval_ms` window,
    /// with windows aligned to `tz_offset_ms`.
    pub fn bucket_key(timestamp_ms: i64, interval_ms: i64, tz_offset_ms: i64) -> i64 {
        (timestamp_ms - tz_offset_ms).div_euclid(interval_ms) * interval_ms + tz_offset_ms
    }

    /// Group samples into fixed-width windows (sorted by start ascending).
    ///
    /// Empty windows are never emitted. Input order does not matter: samples
    /// are accumulated in timestamp order so the float sums are reproducible.
    pub fn bucket_by_interval(
        samples: &[Sample],
        interval_ms: i64,
        tz_offset_ms: i64,
    ) -> Result<Vec<Bucket>> {
        if interval_ms <= 0 {
            return Err(RctrackError::InvalidArgument(format!(
                "bucket interval must be positive, got {}ms",
                interval_ms
            )));
        }

        if samples.is_empty() {
            return Ok(Vec::new());
        }

        // NaN would poison min/max; malformed samples are skipped, not errors
        let mut ordered: Vec<(i64, f64)> = samples
            .iter()
            .filter(|s| s.value.is_finite())
            .map(|s| (s.timestamp.timestamp_millis(), s.value))
            .collect();
        if ordered.len() < samples.len() {
            tracing::debug!(
                skipped = samples.len() - ordered.len(),
                "skipped non-finite samples"
            );
        }
        ordered.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.total_cmp(&b.1)));

        let mut buckets: BTreeMap<i64, Accumulator> = BTreeMap::new();
        for (ts, value) in ordered {
            let key = Self::bucket_key(ts, interval_ms, tz_offset_ms);
            buckets
                .entry(key)
                .or_insert_with(|| Accumulator::new(value))
                .add(value);
        }

        Ok(buckets
            .into_iter()
            .map(|(start, acc)| acc.finish(start))
            .collect())
    }

    /// Smooth a bucketed series with a trailing window of `window` buckets.
    ///
    /// The average becomes the unweighted mean of the window's averages and
    /// min/max span the whole window. `window == 1` returns the input as is.
    pub fn rolling_average(buckets: &[Bucket], window: usize) -> Result<Vec<Bucket>> {
        if window == 0 {
            return Err(RctrackError::InvalidArgument(
                "rolling window must be at least 1".into(),
            ));
        }
        if window == 1 {
            return Ok(buckets.to_vec());
        }

        let smoothed = buckets
            .iter()
            .enumerate()
            .map(|(i, current)| {
                let slice = &buckets[(i + 1).saturating_sub(window)..=i];
                let minimum = slice.iter().map(|b| b.minimum).fold(f64::INFINITY, f64::min);
                let maximum = slice
                    .iter()
                    .map(|b| b.maximum)
                    .fold(f64::NEG_INFINITY, f64::max);
                let mean = slice.iter().map(|b| b.average).sum::<f64>() / slice.len() as f64;

                // hand-built buckets may carry NaN extremes
                let average = if minimum <= maximum {
                    mean.clamp(minimum, maximum)
                } else {
                    mean
                };

                Bucket {
                    start_ms: current.start_ms,
                    average,
                    minimum,
                    maximum,
                    count: current.count,
                }
            })
            .collect();

        Ok(smoothed)
    }

    /// Display scale for a bucketed series using the default thresholds
    pub fn select_scale(buckets: &[Bucket]) -> Scale {
        Self::select_scale_with(buckets, &ScaleThresholds::default())
    }

    /// Display scale for a bucketed series (Units when empty)
    pub fn select_scale_with(buckets: &[Bucket], thresholds: &ScaleThresholds) -> Scale {
        buckets
            .iter()
            .map(|b| b.maximum)
            .reduce(f64::max)
            .map(|max| Scale::for_max(max, thresholds))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_at(ms: i64, value: f64) -> Sample {
        Sample::new(Utc.timestamp_millis_opt(ms).unwrap(), value)
    }

    fn bucket(start_ms: i64, average: f64) -> Bucket {
        Bucket {
            start_ms,
            average,
            minimum: average,
            maximum: average,
            count: 1,
        }
    }

    // ========== bucket_by_interval() tests ==========

    #[test]
    fn test_bucket_empty_samples() {
        let result = TimeSeriesAggregator::bucket_by_interval(&[], DAY_MS, 0).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_bucket_rejects_non_positive_interval() {
        let samples = vec![sample_at(0, 1.0)];
        for interval in [0, -DAY_MS] {
            let err = TimeSeriesAggregator::bucket_by_interval(&samples, interval, 0).unwrap_err();
            assert!(matches!(err, RctrackError::InvalidArgument(_)));
        }
    }

    #[test]
    fn test_bucket_same_local_day() {
        // Local midnight for a UTC+2 zone (offset is UTC minus local)
        let offset = -2 * HOUR_MS;
        let t0 = 20_000 * DAY_MS + offset;
        let samples = vec![sample_at(t0, 10.0), sample_at(t0 + HOUR_MS, 20.0)];

        let result = TimeSeriesAggregator::bucket_by_interval(&samples, DAY_MS, offset).unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].start_ms, t0);
        assert!((result[0].average - 15.0).abs() < f64::EPSILON);
        assert_eq!(result[0].minimum, 10.0);
        assert_eq!(result[0].maximum, 20.0);
        assert_eq!(result[0].count, 2);
    }

    #[test]
    fn test_bucket_offset_moves_day_boundary() {
        // 23:00 UTC is already the next day in UTC+2
        let late = 20_000 * DAY_MS + 23 * HOUR_MS;
        let samples = vec![sample_at(late - 2 * HOUR_MS, 1.0), sample_at(late, 3.0)];

        let utc = TimeSeriesAggregator::bucket_by_interval(&samples, DAY_MS, 0).unwrap();
        assert_eq!(utc.len(), 1);

        let plus_two =
            TimeSeriesAggregator::bucket_by_interval(&samples, DAY_MS, -2 * HOUR_MS).unwrap();
        assert_eq!(plus_two.len(), 2);
        assert_eq!(plus_two[1].start_ms, 20_001 * DAY_MS - 2 * HOUR_MS);
    }

    #[test]
    fn test_bucket_sorted_and_sparse() {
        let samples = vec![
            sample_at(5 * HOUR_MS + 10, 5.0),
            sample_at(HOUR_MS + 10, 1.0),
            sample_at(3 * HOUR_MS + 10, 3.0),
        ];

        let result = TimeSeriesAggregator::bucket_by_interval(&samples, HOUR_MS, 0).unwrap();

        let starts: Vec<i64> = result.iter().map(|b| b.start_ms).collect();
        assert_eq!(starts, vec![HOUR_MS, 3 * HOUR_MS, 5 * HOUR_MS]);
        assert!(result.iter().all(|b| b.count == 1));
    }

    #[test]
    fn test_bucket_before_epoch_floors_down() {
        let samples = vec![sample_at(-1, 7.0)];
        let result = TimeSeriesAggregator::bucket_by_interval(&samples, HOUR_MS, 0).unwrap();
        assert_eq!(result[0].start_ms, -HOUR_MS);
    }

    #[test]
    fn test_bucket_average_stays_within_extremes() {
        let samples: Vec<Sample> = (0..3).map(|i| sample_at(i, 0.1)).collect();
        let result = TimeSeriesAggregator::bucket_by_interval(&samples, HOUR_MS, 0).unwrap();
        let b = result[0];
        assert!(b.minimum <= b.average && b.average <= b.maximum);
    }

    #[test]
    fn test_bucket_skips_non_finite_only_input() {
        let samples = vec![sample_at(0, f64::NAN), sample_at(10, f64::INFINITY)];
        let result = TimeSeriesAggregator::bucket_by_interval(&samples, DAY_MS, 0).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_bucket_ignores_nan_among_finite() {
        let samples = vec![
            sample_at(0, 4.0),
            sample_at(1, f64::NAN),
            sample_at(2, 8.0),
        ];
        let result = TimeSeriesAggregator::bucket_by_interval(&samples, DAY_MS, 0).unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].count, 2);
        assert_eq!(result[0].minimum, 4.0);
        assert_eq!(result[0].maximum, 8.0);
        assert!((result[0].average - 6.0).abs() < f64::EPSILON);
    }

    // ========== rolling_average() tests ==========

    #[test]
    fn test_rolling_tolerates_nan_buckets() {
        let buckets = vec![bucket(0, f64::NAN), bucket(DAY_MS, f64::NAN)];
        let result = TimeSeriesAggregator::rolling_average(&buckets, 2).unwrap();
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn test_rolling_identity_for_window_one() {
        let buckets: Vec<Bucket> = (0..5).map(|i| bucket(i * DAY_MS, i as f64)).collect();
        let result = TimeSeriesAggregator::rolling_average(&buckets, 1).unwrap();
        assert_eq!(result, buckets);
    }

    #[test]
    fn test_rolling_rejects_zero_window() {
        let err = TimeSeriesAggregator::rolling_average(&[], 0).unwrap_err();
        assert!(matches!(err, RctrackError::InvalidArgument(_)));
    }

    #[test]
    fn test_rolling_trailing_mean() {
        let buckets: Vec<Bucket> = (1..=10).map(|i| bucket(i * DAY_MS, i as f64)).collect();

        let result = TimeSeriesAggregator::rolling_average(&buckets, 3).unwrap();

        assert_eq!(result.len(), 10);
        assert!((result[4].average - 4.0).abs() < f64::EPSILON); // (3+4+5)/3
        assert_eq!(result[4].minimum, 3.0);
        assert_eq!(result[4].maximum, 5.0);
        // Partial windows at the start
        assert_eq!(result[0], buckets[0]);
        assert!((result[1].average - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_rolling_preserves_start_and_count() {
        let buckets = vec![
            Bucket {
                start_ms: 0,
                average: 2.0,
                minimum: 1.0,
                maximum: 3.0,
                count: 4,
            },
            Bucket {
                start_ms: DAY_MS,
                average: 10.0,
                minimum: 8.0,
                maximum: 12.0,
                count: 9,
            },
        ];

        let result = TimeSeriesAggregator::rolling_average(&buckets, 7).unwrap();

        assert_eq!(result[1].start_ms, DAY_MS);
        assert_eq!(result[1].count, 9);
        assert!((result[1].average - 6.0).abs() < f64::EPSILON);
        assert_eq!(result[1].minimum, 1.0);
        assert_eq!(result[1].maximum, 12.0);
    }

    // ========== select_scale() tests ==========

    #[test]
    fn test_select_scale_thresholds() {
        assert_eq!(
            TimeSeriesAggregator::select_scale(&[bucket(0, 5e12)]).divisor(),
            1e9
        );
        assert_eq!(
            TimeSeriesAggregator::select_scale(&[bucket(0, 5e9)]).divisor(),
            1e6
        );
        assert_eq!(
            TimeSeriesAggregator::select_scale(&[bucket(0, 500.0)]).divisor(),
            1.0
        );
    }

    #[test]
    fn test_select_scale_uses_maximum_not_average() {
        let b = Bucket {
            start_ms: 0,
            average: 5e8,
            minimum: 1.0,
            maximum: 2e9,
            count: 2,
        };
        assert_eq!(TimeSeriesAggregator::select_scale(&[b]), Scale::Millions);
    }

    #[test]
    fn test_select_scale_empty() {
        assert_eq!(TimeSeriesAggregator::select_scale(&[]), Scale::Units);
    }

    #[test]
    fn test_local_offset_is_whole_minutes() {
        let offset = local_offset_ms(Utc::now());
        assert_eq!(offset % 60_000, 0);
    }
}
