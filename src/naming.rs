//! Display names for proposed groups.
//!
//! Naming is a collaborator of the grouping engine rather than part of it:
//! group numbers are the stable identity, names are derived on demand.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ProposedGroup;

/// Context shared by every group of one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingContext {
    pub cluster_name: String,
    /// Season label, e.g. "WS" or "Winter-Spring"
    pub season: String,
    pub year: i32,
    /// Display names keyed by rice variety id. Unknown ids fall back to the id.
    pub variety_names: HashMap<String, String>,
}

impl NamingContext {
    pub fn new(cluster_name: impl Into<String>, season: impl Into<String>, year: i32) -> Self {
        Self {
            cluster_name: cluster_name.into(),
            season: season.into(),
            year,
            variety_names: HashMap::new(),
        }
    }

    pub fn with_variety(mut self, variety_id: impl Into<String>, name: impl Into<String>) -> Self {
        self.variety_names.insert(variety_id.into(), name.into());
        self
    }

    pub fn variety_name<'a>(&'a self, variety_id: &'a str) -> &'a str {
        self.variety_names
            .get(variety_id)
            .map(String::as_str)
            .unwrap_or(variety_id)
    }
}

/// Produces a display name for a group.
pub trait GroupNamer {
    fn name(&self, ctx: &NamingContext, group: &ProposedGroup) -> String;
}

/// `{CLUSTER}-{SEASON}{YEAR}-{VARIETY}-G{NN}`
///
/// # Example
/// ```
/// use plotgroup::{GroupNamer, NamingContext, SeasonalGroupNamer};
/// # use plotgroup::{Location, ProposedGroup};
/// # use chrono::NaiveDate;
/// # let d = NaiveDate::from_ymd_opt(2026, 11, 2).unwrap();
/// # let group = ProposedGroup {
/// #     group_number: 3, rice_variety_id: "v1".into(),
/// #     planting_window_start: d, planting_window_end: d, median_planting_date: d,
/// #     plot_ids: vec![], farmer_ids: vec![], total_area_ha: 0.0,
/// #     centroid: Location::Projected { x: 0.0, y: 0.0 }, boundary: None,
/// # };
/// let ctx = NamingContext::new("Tan Lap", "ws", 2026).with_variety("v1", "om 5451");
/// assert_eq!(SeasonalGroupNamer.name(&ctx, &group), "TAN_LAP-WS2026-OM_5451-G03");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SeasonalGroupNamer;

impl GroupNamer for SeasonalGroupNamer {
    fn name(&self, ctx: &NamingContext, group: &ProposedGroup) -> String {
        format!(
            "{}-{}{}-{}-G{:02}",
            name_part(&ctx.cluster_name),
            name_part(&ctx.season),
            ctx.year,
            name_part(ctx.variety_name(&group.rice_variety_id)),
            group.group_number
        )
    }
}

/// Name every group, in group-number order.
pub fn name_groups<N: GroupNamer + ?Sized>(
    namer: &N,
    ctx: &NamingContext,
    groups: &[ProposedGroup],
) -> Vec<(u32, String)> {
    let mut named: Vec<(u32, String)> = groups
        .iter()
        .map(|g| (g.group_number, namer.name(ctx, g)))
        .collect();
    named.sort_by_key(|(number, _)| *number);
    named
}

/// Upper-case and join whitespace-separated words with `_`.
fn name_part(raw: &str) -> String {
    raw.split_whitespace()
        .map(str::to_uppercase)
        .collect::<Vec<_>>()
        .join("_")
}
