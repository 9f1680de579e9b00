//! Rejection classification for plots left outside every group.
//!
//! Each residual gets exactly one reason, chosen by a fixed priority, plus
//! the nearest accepted group and a few suggestions for the operator.

use crate::{GroupingParameters, PlotCandidate, RejectionReason, UngroupedPlotInfo};

use super::cluster_builder::ResidualCause;
use super::spatial_index::SpatialIndex;

/// Classifies residual plots against the accepted groups of one run.
///
/// Classification reads only its arguments, so running it twice over the
/// same residuals yields the same reasons.
#[derive(Debug)]
pub struct RejectionClassifier<'p> {
    params: &'p GroupingParameters,
    group_numbers: Vec<u32>,
    group_index: SpatialIndex,
}

impl<'p> RejectionClassifier<'p> {
    /// `groups` pairs each group number with its projected centroid.
    pub fn new(params: &'p GroupingParameters, groups: &[(u32, [f64; 2])]) -> Self {
        let mut ordered = groups.to_vec();
        ordered.sort_by_key(|(number, _)| *number);
        let centroids: Vec<[f64; 2]> = ordered.iter().map(|(_, c)| *c).collect();

        Self {
            params,
            group_numbers: ordered.iter().map(|(n, _)| *n).collect(),
            group_index: SpatialIndex::new(&centroids),
        }
    }

    /// Pick the reason for a residual, first matching rule wins.
    pub fn reason(&self, cause: &ResidualCause) -> RejectionReason {
        let params = self.params;
        let merged = cause.cluster_size >= 2;

        if cause.split_from.is_none() {
            if merged && cause.cluster_size < params.min_plots_per_group {
                return RejectionReason::TooFewPlots;
            }
            if (merged || cause.cluster_size >= params.min_plots_per_group)
                && cause.cluster_area_ha < params.min_group_area_ha
            {
                return RejectionReason::InsufficientArea;
            }
        }
        if let Some(oversize) = cause.split_from {
            if oversize.area {
                return RejectionReason::GroupTooLarge;
            }
            if oversize.plot_count {
                return RejectionReason::TooManyPlots;
            }
        }
        if cause.coherence_blocked {
            return RejectionReason::NotSpatiallyCoherent;
        }
        if !cause.has_compatible_neighbor {
            return RejectionReason::IsolatedLocation;
        }
        RejectionReason::ConstraintViolation
    }

    /// Classify a plot that went through clustering.
    pub fn classify(
        &self,
        plot: &PlotCandidate,
        position: [f64; 2],
        cause: &ResidualCause,
    ) -> UngroupedPlotInfo {
        let reason = self.reason(cause);
        self.describe(plot, Some(position), reason)
    }

    /// Classify a plot that never reached clustering (no usable centroid or
    /// area).
    pub fn classify_unplaceable(
        &self,
        plot: &PlotCandidate,
        position: Option<[f64; 2]>,
    ) -> UngroupedPlotInfo {
        self.describe(plot, position, RejectionReason::ConstraintViolation)
    }

    /// Nearest accepted group to a position, with its centroid distance.
    pub fn nearest_group(&self, position: [f64; 2]) -> Option<(u32, f64)> {
        self.group_index
            .nearest(position)
            .and_then(|(idx, distance)| self.group_numbers.get(idx).map(|n| (*n, distance)))
    }

    fn describe(
        &self,
        plot: &PlotCandidate,
        position: Option<[f64; 2]>,
        reason: RejectionReason,
    ) -> UngroupedPlotInfo {
        let nearest = position.and_then(|p| self.nearest_group(p));
        let suggestions = suggestions_for(reason, plot, nearest, self.params);

        UngroupedPlotInfo {
            plot_id: plot.plot_id.clone(),
            farmer_id: plot.farmer_id.clone(),
            area_ha: plot.area_ha,
            reason,
            nearest_group_number: nearest.map(|(n, _)| n),
            distance_to_nearest_group_m: nearest.map(|(_, d)| d),
            suggestions,
        }
    }
}

/// One to three operator hints for a rejection reason.
pub fn suggestions_for(
    reason: RejectionReason,
    plot: &PlotCandidate,
    nearest: Option<(u32, f64)>,
    params: &GroupingParameters,
) -> Vec<String> {
    let mut out = Vec::with_capacity(3);
    let threshold = params.proximity_threshold_meters;

    match reason {
        RejectionReason::IsolatedLocation => {
            match nearest {
                Some((group, distance)) => out.push(format!(
                    "Nearest group is #{group} at {distance:.0} m; raise the proximity threshold above {threshold:.0} m to reach it"
                )),
                None => out.push(format!(
                    "No compatible plot within {threshold:.0} m; widen the proximity threshold"
                )),
            }
            out.push("Assign the plot to a group manually".to_string());
        }
        RejectionReason::NotSpatiallyCoherent => {
            out.push(
                "Joining the neighbouring plots would form an elongated chain; review the layout on the map"
                    .to_string(),
            );
            if let Some((group, _)) = nearest {
                out.push(format!("Consider a manual override into group #{group}"));
            }
            out.push("Create a separate group for this area manually".to_string());
        }
        RejectionReason::TooFewPlots => {
            out.push(format!(
                "Lower the minimum plots per group below {}",
                params.min_plots_per_group
            ));
            out.push(format!(
                "Widen the proximity threshold beyond {threshold:.0} m to collect more neighbours"
            ));
            if let Some((group, _)) = nearest {
                out.push(format!("Add the plot to group #{group} manually"));
            }
        }
        RejectionReason::InsufficientArea => {
            out.push(format!(
                "Lower the minimum group area below {:.1} ha",
                params.min_group_area_ha
            ));
            out.push(format!(
                "Widen the proximity threshold beyond {threshold:.0} m to collect more area"
            ));
            if let Some((group, _)) = nearest {
                out.push(format!("Add the plot to group #{group} manually"));
            }
        }
        RejectionReason::GroupTooLarge => {
            if plot.area_ha > params.max_group_area_ha {
                out.push(format!(
                    "Plot area {:.1} ha exceeds the maximum group area; manage it as its own unit",
                    plot.area_ha
                ));
            }
            out.push(format!(
                "Raise the maximum group area above {:.1} ha",
                params.max_group_area_ha
            ));
            out.push("Lower the minimum bounds so split-off plots can stand alone".to_string());
        }
        RejectionReason::TooManyPlots => {
            out.push(format!(
                "Raise the maximum plots per group above {}",
                params.max_plots_per_group
            ));
            out.push("Lower the minimum bounds so split-off plots can stand alone".to_string());
        }
        RejectionReason::ConstraintViolation => {
            if plot.resolved_centroid().is_none() {
                out.push("Record a valid plot centroid before grouping".to_string());
            } else if !plot.has_valid_area() {
                out.push("Correct the plot area; it must be a positive number".to_string());
            }
            out.push("Review the plot record and assign it manually".to_string());
        }
    }

    out.truncate(3);
    out
}
