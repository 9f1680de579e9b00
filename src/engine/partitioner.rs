//! Compatibility partitioning by rice variety and planting-date window.
//!
//! Plots of different varieties, or with planting dates too far apart,
//! must never share a group, so each bucket is clustered independently.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};

use super::PreparedPlot;

/// Plots that may be clustered together.
#[derive(Debug, Clone)]
pub struct CompatibilityBucket<'a> {
    pub rice_variety_id: &'a str,
    /// Earliest planting date in the bucket
    pub window_start: NaiveDate,
    /// Latest planting date in the bucket
    pub window_end: NaiveDate,
    /// Members, sorted by plot id
    pub plots: Vec<PreparedPlot<'a>>,
}

impl CompatibilityBucket<'_> {
    pub fn len(&self) -> usize {
        self.plots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plots.is_empty()
    }

    pub fn span_days(&self) -> i64 {
        (self.window_end - self.window_start).num_days()
    }
}

/// Split plots into variety/date buckets.
///
/// Varieties are matched exactly and visited in ascending id order. Within
/// a variety, plots are walked in planting-date order and a new window
/// opens whenever the next date is more than `tolerance_days` after the
/// current window end. Windows therefore chain: consecutive members are
/// within tolerance, the whole bucket may span more.
pub fn partition_compatible<'a>(
    plots: &[PreparedPlot<'a>],
    tolerance_days: u32,
) -> Vec<CompatibilityBucket<'a>> {
    let mut by_variety: BTreeMap<&'a str, Vec<PreparedPlot<'a>>> = BTreeMap::new();
    for plot in plots {
        by_variety
            .entry(plot.plot.rice_variety_id.as_str())
            .or_default()
            .push(*plot);
    }

    let tolerance = Duration::days(i64::from(tolerance_days));
    let mut buckets = Vec::new();

    for (variety, mut members) in by_variety {
        members.sort_by(|a, b| {
            a.planting_date
                .cmp(&b.planting_date)
                .then_with(|| a.plot.plot_id.cmp(&b.plot.plot_id))
        });

        let mut current: Vec<PreparedPlot<'a>> = Vec::new();
        let mut window: Option<(NaiveDate, NaiveDate)> = None;

        for plot in members {
            window = match window {
                Some((start, end)) if plot.planting_date <= end + tolerance => {
                    Some((start, plot.planting_date))
                }
                Some((start, end)) => {
                    buckets.push(close_bucket(variety, start, end, std::mem::take(&mut current)));
                    Some((plot.planting_date, plot.planting_date))
                }
                None => Some((plot.planting_date, plot.planting_date)),
            };
            current.push(plot);
        }

        if let Some((start, end)) = window {
            buckets.push(close_bucket(variety, start, end, current));
        }
    }

    buckets
}

/// Members arrive in date order; the bucket stores them by plot id.
fn close_bucket<'a>(
    variety: &'a str,
    window_start: NaiveDate,
    window_end: NaiveDate,
    mut plots: Vec<PreparedPlot<'a>>,
) -> CompatibilityBucket<'a> {
    plots.sort_by(|a, b| a.plot.plot_id.cmp(&b.plot.plot_id));

    CompatibilityBucket {
        rice_variety_id: variety,
        window_start,
        window_end,
        plots,
    }
}
