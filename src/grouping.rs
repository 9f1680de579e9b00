//! Plot grouping entry points.
//!
//! A run validates its input, projects located plots into planar meters,
//! buckets them by variety and planting window, clusters every bucket, then
//! numbers the accepted clusters and classifies everything left over.

use std::collections::BTreeSet;

use chrono::{NaiveDate, TimeDelta};
use geo::{ConvexHull, MultiPoint, Point};
use log::{debug, info, warn};

use crate::engine::cluster_builder::weighted_center;
use crate::engine::{
    AssignmentPlan, BucketClustering, ClusterBuilder, CompatibilityBucket, PreparedPlot,
    RejectionClassifier, SupervisorLoadBalancer, partition_compatible,
};
use crate::geo_utils::Projection;
use crate::{
    GroupingError, GroupingOutcome, GroupingOverrides, GroupingParameters, GroupingStats,
    Location, PlotCandidate, ProposedGroup, Result, SupervisorCandidate, UngroupedPlotInfo,
};

/// Validated input for one run.
#[derive(Debug)]
pub struct PreparedRun<'a> {
    pub projection: Projection,
    pub reference_date: NaiveDate,
    /// Plots that can be clustered, sorted by plot id
    pub placed: Vec<PreparedPlot<'a>>,
    /// Plots without a usable centroid or area, sorted by plot id
    pub unplaceable: Vec<&'a PlotCandidate>,
}

/// An accepted cluster before numbering.
struct GroupDraft<'a> {
    rice_variety_id: &'a str,
    members: Vec<PreparedPlot<'a>>,
    position: [f64; 2],
    window_start: NaiveDate,
}

/// Validate input and prepare plots for clustering.
///
/// Fails on an empty plot set, invalid parameters, duplicate plot ids or a
/// mix of geographic and projected centroids. Plots without a usable
/// location or area are set aside rather than rejected.
pub fn prepare_plots<'a>(
    plots: &'a [PlotCandidate],
    params: &GroupingParameters,
) -> Result<PreparedRun<'a>> {
    if plots.is_empty() {
        return Err(GroupingError::EmptyPlotSet);
    }
    params.validate()?;

    // Id order makes the projection origin independent of input order
    let mut sorted: Vec<&PlotCandidate> = plots.iter().collect();
    sorted.sort_by(|a, b| a.plot_id.cmp(&b.plot_id));
    if let Some(pair) = sorted.windows(2).find(|w| w[0].plot_id == w[1].plot_id) {
        return Err(GroupingError::DuplicatePlotId {
            plot_id: pair[0].plot_id.clone(),
        });
    }

    let located: Vec<Location> = sorted.iter().filter_map(|p| p.resolved_centroid()).collect();
    let projection = Projection::for_locations(&located)?;
    let reference_date = params.resolved_reference_date();

    let mut placed = Vec::with_capacity(sorted.len());
    let mut unplaceable = Vec::new();
    for plot in sorted {
        match plot.resolved_centroid() {
            Some(centroid) if plot.has_valid_area() => placed.push(PreparedPlot {
                plot,
                position: projection.project(&centroid),
                planting_date: plot.effective_planting_date(reference_date),
            }),
            _ => {
                warn!(
                    "[Grouping] Plot {} has no usable location or area ({}), leaving it ungrouped",
                    plot.plot_id, plot.area_ha
                );
                unplaceable.push(plot);
            }
        }
    }

    Ok(PreparedRun {
        projection,
        reference_date,
        placed,
        unplaceable,
    })
}

/// Form groups from a set of candidate plots.
///
/// Every input plot ends up in exactly one group or in the ungrouped list.
/// Output is fully determined by the plot set and the parameters: input
/// order does not matter.
///
/// # Example
/// ```
/// use plotgroup::{form_groups, GroupingParameters, Location, PlotCandidate};
///
/// let plots = vec![
///     PlotCandidate::new("a", "f1", 1.5, Location::Projected { x: 0.0, y: 0.0 }, "ST25", None),
///     PlotCandidate::new("b", "f2", 1.5, Location::Projected { x: 40.0, y: 0.0 }, "ST25", None),
/// ];
/// let outcome = form_groups(&plots, &GroupingParameters::default()).unwrap();
/// assert!(outcome.groups.is_empty());
/// assert_eq!(outcome.ungrouped.len(), 2);
/// ```
pub fn form_groups(
    plots: &[PlotCandidate],
    params: &GroupingParameters,
) -> Result<GroupingOutcome> {
    let run = prepare_plots(plots, params)?;
    let buckets = partition_compatible(&run.placed, params.planting_date_tolerance_days);
    debug!(
        "[Grouping] {} placed plots in {} buckets (reference date {})",
        run.placed.len(),
        buckets.len(),
        run.reference_date
    );

    let builder = ClusterBuilder::new(params);
    let clusterings = cluster_buckets(&builder, &buckets);

    let mut stats = GroupingStats {
        input_plots: plots.len(),
        unlocated_plots: run.unplaceable.len(),
        buckets: buckets.len(),
        ..GroupingStats::default()
    };

    let mut drafts = Vec::new();
    for (bucket, clustering) in buckets.iter().zip(&clusterings) {
        stats.components += clustering.stats.components;
        stats.merges_accepted += clustering.stats.merges_accepted;
        stats.merges_rejected_incoherent += clustering.stats.merges_rejected_incoherent;
        stats.splits += clustering.stats.splits;

        for cluster in &clustering.clusters {
            drafts.push(draft_group(bucket, cluster));
        }
    }

    drafts.sort_by(|a, b| {
        a.window_start
            .cmp(&b.window_start)
            .then_with(|| a.position[0].total_cmp(&b.position[0]))
            .then_with(|| a.members[0].plot.plot_id.cmp(&b.members[0].plot.plot_id))
    });

    let numbered: Vec<(u32, [f64; 2])> = drafts
        .iter()
        .enumerate()
        .map(|(i, d)| (group_number(i), d.position))
        .collect();
    let groups: Vec<ProposedGroup> = drafts
        .iter()
        .enumerate()
        .map(|(i, draft)| build_group(group_number(i), draft, &run.projection))
        .collect();

    let classifier = RejectionClassifier::new(params, &numbered);
    let mut ungrouped: Vec<UngroupedPlotInfo> = Vec::new();
    for (bucket, clustering) in buckets.iter().zip(&clusterings) {
        for residual in &clustering.residuals {
            let prepared = &bucket.plots[residual.index];
            ungrouped.push(classifier.classify(prepared.plot, prepared.position, &residual.cause));
        }
    }
    for plot in &run.unplaceable {
        let position = plot
            .resolved_centroid()
            .map(|c| run.projection.project(&c));
        ungrouped.push(classifier.classify_unplaceable(plot, position));
    }
    ungrouped.sort_by(|a, b| a.plot_id.cmp(&b.plot_id));

    stats.groups = groups.len();
    stats.ungrouped = ungrouped.len();

    info!(
        "[Grouping] {} plots -> {} groups, {} ungrouped ({} buckets, {} merges, {} incoherent, {} splits)",
        stats.input_plots,
        stats.groups,
        stats.ungrouped,
        stats.buckets,
        stats.merges_accepted,
        stats.merges_rejected_incoherent,
        stats.splits
    );

    Ok(GroupingOutcome {
        groups,
        ungrouped,
        stats,
    })
}

/// Form groups with caller overrides resolved onto the defaults.
pub fn form_groups_with_overrides(
    plots: &[PlotCandidate],
    overrides: &GroupingOverrides,
) -> Result<GroupingOutcome> {
    form_groups(plots, &overrides.resolve())
}

/// Propose a supervisor for every group.
///
/// Only supervisors with spare capacity are considered, optionally limited
/// to one cluster. The supervisor list is not modified.
pub fn plan_supervisors(
    groups: &[ProposedGroup],
    supervisors: &[SupervisorCandidate],
    cluster_id: Option<&str>,
) -> AssignmentPlan {
    let balancer = SupervisorLoadBalancer::new(supervisors, cluster_id);
    let plan = balancer.assign(groups);

    if plan.insufficient_supervisors {
        warn!(
            "[Assignment] No available supervisor for {} groups (cluster {})",
            groups.len(),
            cluster_id.unwrap_or("any")
        );
    } else {
        info!(
            "[Assignment] {} groups across {} supervisors",
            groups.len(),
            balancer.available().len()
        );
    }
    plan
}

#[cfg(feature = "parallel")]
fn cluster_buckets(
    builder: &ClusterBuilder<'_>,
    buckets: &[CompatibilityBucket<'_>],
) -> Vec<BucketClustering> {
    use rayon::prelude::*;

    buckets.par_iter().map(|b| builder.build(&b.plots)).collect()
}

#[cfg(not(feature = "parallel"))]
fn cluster_buckets(
    builder: &ClusterBuilder<'_>,
    buckets: &[CompatibilityBucket<'_>],
) -> Vec<BucketClustering> {
    buckets.iter().map(|b| builder.build(&b.plots)).collect()
}

fn group_number(rank: usize) -> u32 {
    u32::try_from(rank + 1).unwrap_or(u32::MAX)
}

fn draft_group<'a>(bucket: &CompatibilityBucket<'a>, cluster: &[usize]) -> GroupDraft<'a> {
    let members: Vec<PreparedPlot<'a>> = cluster.iter().map(|&i| bucket.plots[i]).collect();
    let positions: Vec<[f64; 2]> = members.iter().map(|m| m.position).collect();
    let areas: Vec<f64> = members.iter().map(|m| m.plot.area_ha).collect();
    let window_start = members
        .iter()
        .map(|m| m.planting_date)
        .min()
        .unwrap_or(bucket.window_start);

    GroupDraft {
        rice_variety_id: bucket.rice_variety_id,
        position: weighted_center(&positions, &areas),
        members,
        window_start,
    }
}

fn build_group(group_number: u32, draft: &GroupDraft<'_>, projection: &Projection) -> ProposedGroup {
    let mut dates: Vec<NaiveDate> = draft.members.iter().map(|m| m.planting_date).collect();
    dates.sort_unstable();
    let window_end = dates.last().copied().unwrap_or(draft.window_start);

    let farmer_ids: BTreeSet<&str> = draft
        .members
        .iter()
        .map(|m| m.plot.farmer_id.as_str())
        .collect();

    ProposedGroup {
        group_number,
        rice_variety_id: draft.rice_variety_id.to_string(),
        planting_window_start: draft.window_start,
        planting_window_end: window_end,
        median_planting_date: median_date(&dates).unwrap_or(draft.window_start),
        plot_ids: draft.members.iter().map(|m| m.plot.plot_id.clone()).collect(),
        farmer_ids: farmer_ids.into_iter().map(str::to_string).collect(),
        total_area_ha: draft.members.iter().map(|m| m.plot.area_ha).sum(),
        centroid: projection.unproject(draft.position),
        boundary: group_boundary(&draft.members, projection),
    }
}

/// Median of sorted dates. For an even count this is the lower middle date
/// plus half the gap to the upper one, rounded down.
pub fn median_date(sorted: &[NaiveDate]) -> Option<NaiveDate> {
    if sorted.is_empty() {
        return None;
    }
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        return Some(sorted[mid]);
    }
    let lower = sorted[mid - 1];
    let gap = (sorted[mid] - lower).num_days();
    Some(lower + TimeDelta::days(gap / 2))
}

/// Convex hull around every member boundary vertex.
///
/// Returns `None` when no member carries a boundary of the run's coordinate
/// kind.
fn group_boundary(members: &[PreparedPlot<'_>], projection: &Projection) -> Option<Vec<Location>> {
    let geographic = matches!(projection, Projection::LocalEquirectangular { .. });
    let points: Vec<Point<f64>> = members
        .iter()
        .filter_map(|m| m.plot.boundary.as_ref())
        .flatten()
        .filter(|v| v.is_valid() && v.is_geographic() == geographic)
        .map(|v| {
            let [x, y] = projection.project(v);
            Point::new(x, y)
        })
        .collect();

    if points.is_empty() {
        return None;
    }

    let hull = MultiPoint::new(points).convex_hull();
    let ring: Vec<Location> = hull
        .exterior()
        .points()
        .map(|p| projection.unproject([p.x(), p.y()]))
        .collect();
    (!ring.is_empty()).then_some(ring)
}
