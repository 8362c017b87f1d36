//! # Derived Analytics Module
//!
//! ## Purpose
//! Pure derivations over a bucket series: the rolling trend average drawn
//! behind the mention bars and the 30-day percent change shown on the KPI
//! cards. Both are functions of the bucket series alone.
//!
//! ## Key Features
//! - Trailing-window rolling average, window sized by granularity
//!   (7 days / 3 months / 2 years), clipped at the series start
//! - 30-day trend split into mentions added in the window vs the base before
//!   it, with a percent change that degrades gracefully on a zero base

use crate::aggregate::{Bucket, Granularity};
use chrono::{Duration, NaiveDate};
use serde::Serialize;

/// A bucket annotated with its rolling trend average, ready for charting
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub bucket_date: NaiveDate,
    pub count: u64,
    pub trend: f64,
}

/// Mention growth over the trailing 30 days relative to everything before
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthTrend {
    pub total_count: u64,
    pub added_last_30: u64,
    pub base_before_30: u64,
    /// None when all activity is new and there is no base to compare against
    pub percent_change: Option<i64>,
}

/// Trailing window length for the rolling average at a given granularity
fn trend_window(granularity: Granularity) -> usize {
    match granularity {
        Granularity::Day => 7,
        Granularity::Month => 3,
        Granularity::Year => 2,
    }
}

/// Annotate each bucket with the arithmetic mean of the counts in the
/// trailing window ending at it. The window is clipped at the series start
/// rather than padded, and the mean is rounded to one decimal.
pub fn rolling_trend(buckets: &[Bucket], granularity: Granularity) -> Vec<ChartPoint> {
    let window = trend_window(granularity);

    buckets
        .iter()
        .enumerate()
        .map(|(index, bucket)| {
            let window_start = (index + 1).saturating_sub(window);
            let slice = &buckets[window_start..=index];
            let sum: u64 = slice.iter().map(|b| b.count).sum();
            let mean = sum as f64 / slice.len() as f64;

            ChartPoint {
                bucket_date: bucket.bucket_date,
                count: bucket.count,
                trend: (mean * 10.0).round() / 10.0,
            }
        })
        .collect()
}

/// Compute the 30-day trend from a bucket series. The latest bucket's date is
/// the window end; mentions in `(end - 30 days, end]` count as added. Returns
/// None for an empty series.
pub fn month_trend(buckets: &[Bucket]) -> Option<MonthTrend> {
    let end = buckets.last()?.bucket_date;
    let window_start = end - Duration::days(30);

    let total_count: u64 = buckets.iter().map(|b| b.count).sum();
    let added_last_30: u64 = buckets
        .iter()
        .filter(|b| b.bucket_date > window_start && b.bucket_date <= end)
        .map(|b| b.count)
        .sum();
    let base_before_30 = total_count - added_last_30;

    let percent_change = if base_before_30 == 0 && added_last_30 > 0 {
        None
    } else if base_before_30 == 0 {
        Some(0)
    } else {
        Some((added_last_30 as f64 / base_before_30 as f64 * 100.0).round() as i64)
    };

    Some(MonthTrend {
        total_count,
        added_last_30,
        base_before_30,
        percent_change,
    })
}
