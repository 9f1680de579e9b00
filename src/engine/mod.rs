//! # Plot Grouping Engine
//!
//! The engine is composed of focused components:
//! - `partitioner` - Variety and planting-window buckets
//! - `SpatialIndex` - R-tree for radius and nearest-neighbour queries
//! - `ClusterBuilder` - Agglomerative clustering with bound enforcement
//! - `RejectionClassifier` - Reasons and suggestions for residual plots
//! - `SupervisorLoadBalancer` - Round-robin supervisor assignment
//!
//! [`PlotGrouper`] ties them together behind a fixed parameter set.

pub mod cluster_builder;
pub mod load_balancer;
pub mod partitioner;
pub mod rejection;
pub mod spatial_index;

pub use cluster_builder::{BucketClustering, ClusterBuilder, ClusterStats, Residual, ResidualCause};
pub use load_balancer::{AssignmentPlan, SupervisorLoadBalancer, SupervisorWorkload};
pub use partitioner::{CompatibilityBucket, partition_compatible};
pub use rejection::RejectionClassifier;
pub use spatial_index::{IndexedPoint, SpatialIndex};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    GroupingOutcome, GroupingOverrides, GroupingParameters, PlotCandidate, Result,
    SupervisorCandidate,
};

/// A plot ready for clustering: validated, projected and date-normalized.
#[derive(Debug, Clone, Copy)]
pub struct PreparedPlot<'a> {
    pub plot: &'a PlotCandidate,
    /// Centroid in planar meters
    pub position: [f64; 2],
    pub planting_date: NaiveDate,
}

/// Groups plus the advisory supervisor plan for them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupingPlan {
    pub outcome: GroupingOutcome,
    pub assignments: AssignmentPlan,
}

/// Grouping engine bound to one parameter set.
///
/// Holds no state between calls; every method is a pure function of its
/// inputs and the parameters.
#[derive(Debug, Clone, Default)]
pub struct PlotGrouper {
    params: GroupingParameters,
}

impl PlotGrouper {
    pub fn new(params: GroupingParameters) -> Self {
        Self { params }
    }

    /// Engine with caller overrides resolved onto the defaults.
    pub fn with_overrides(overrides: &GroupingOverrides) -> Self {
        Self::new(overrides.resolve())
    }

    pub fn params(&self) -> &GroupingParameters {
        &self.params
    }

    pub fn form_groups(&self, plots: &[PlotCandidate]) -> Result<GroupingOutcome> {
        crate::grouping::form_groups(plots, &self.params)
    }

    /// Form groups, then balance them across the supervisors of a cluster.
    pub fn form_and_assign(
        &self,
        plots: &[PlotCandidate],
        supervisors: &[SupervisorCandidate],
        cluster_id: Option<&str>,
    ) -> Result<GroupingPlan> {
        let outcome = self.form_groups(plots)?;
        let assignments = crate::grouping::plan_supervisors(&outcome.groups, supervisors, cluster_id);
        Ok(GroupingPlan {
            outcome,
            assignments,
        })
    }
}
