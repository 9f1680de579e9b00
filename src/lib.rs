//! # Plot Grouper
//!
//! Spatial clustering of farm plots into supervised production groups.
//!
//! This library provides:
//! - Compatibility bucketing by rice variety and planting-date window
//! - Agglomerative proximity clustering with a shape coherence check
//! - Split/reject enforcement of plot-count and area bounds
//! - Ranked rejection reasons with remediation suggestions
//! - Round-robin supervisor assignment balanced by current workload
//!
//! ## Features
//!
//! - **`parallel`** - Cluster compatibility buckets in parallel with rayon
//! - **`synthetic`** - Seeded synthetic plot fields for benchmarks
//! - **`cli`** - The `plotgroup-cli` debug binary
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::NaiveDate;
//! use plotgroup::{form_groups, GpsPoint, GroupingParameters, Location, PlotCandidate};
//!
//! let date = NaiveDate::from_ymd_opt(2026, 11, 2).unwrap();
//! let plots: Vec<PlotCandidate> = (0..5)
//!     .map(|i| {
//!         PlotCandidate::new(
//!             format!("plot-{i}"),
//!             format!("farmer-{i}"),
//!             1.6,
//!             Location::Geographic(GpsPoint::new(10.0300 + i as f64 * 0.0002, 105.7700)),
//!             "OM5451",
//!             Some(date),
//!         )
//!     })
//!     .collect();
//!
//! let outcome = form_groups(&plots, &GroupingParameters::default()).unwrap();
//! assert_eq!(outcome.groups.len(), 1);
//! assert!(outcome.ungrouped.is_empty());
//! ```

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{GroupingError, Result};

// Union-Find data structure for proximity components
pub mod union_find;
pub use union_find::UnionFind;

// Geographic utilities (distance, local projection)
pub mod geo_utils;
pub use geo_utils::Projection;

// Clustering components
pub mod engine;
pub use engine::{
    AssignmentPlan, ClusterBuilder, CompatibilityBucket, GroupingPlan, PlotGrouper,
    PreparedPlot, RejectionClassifier, SpatialIndex, SupervisorLoadBalancer, SupervisorWorkload,
    partition_compatible,
};

// Top-level grouping entry points
pub mod grouping;
pub use grouping::{form_groups, form_groups_with_overrides, plan_supervisors, prepare_plots};

// Group naming collaborator
pub mod naming;
pub use naming::{GroupNamer, NamingContext, SeasonalGroupNamer, name_groups};

// Synthetic plot fields for stress testing
#[cfg(feature = "synthetic")]
pub mod synthetic;

// ============================================================================
// Core Types
// ============================================================================

/// A GPS coordinate with latitude and longitude.
///
/// # Example
/// ```
/// use plotgroup::GpsPoint;
/// let point = GpsPoint::new(10.0452, 105.7469); // Can Tho
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// A plot location, either geographic or already projected to meters.
///
/// Every located plot of one grouping run must use the same variant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Location {
    /// Longitude/latitude in degrees (WGS84)
    Geographic(GpsPoint),
    /// Planar coordinates in meters (easting, northing)
    Projected { x: f64, y: f64 },
}

impl Location {
    pub fn is_valid(&self) -> bool {
        match self {
            Location::Geographic(p) => p.is_valid(),
            Location::Projected { x, y } => x.is_finite() && y.is_finite(),
        }
    }

    pub fn is_geographic(&self) -> bool {
        matches!(self, Location::Geographic(_))
    }
}

/// Planting dates before this year are treated as unset placeholders.
pub const SENTINEL_YEAR_CUTOFF: i32 = 1900;

/// One plot eligible for grouping in this run.
///
/// Callers hand over only active plots with a cultivation record for the
/// target season that are not already grouped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotCandidate {
    pub plot_id: String,
    pub farmer_id: String,
    /// Area in hectares, taken as-is and never recomputed from geometry
    pub area_ha: f64,
    /// Plot centroid. When absent the boundary is used; a plot with neither
    /// cannot be placed.
    pub centroid: Option<Location>,
    pub rice_variety_id: String,
    /// Missing or placeholder dates fall back to the run's reference date
    #[serde(default)]
    pub planting_date: Option<NaiveDate>,
    /// Boundary ring, used only to build group outlines for display
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boundary: Option<Vec<Location>>,
    #[serde(default)]
    pub grouped: bool,
}

impl PlotCandidate {
    pub fn new(
        plot_id: impl Into<String>,
        farmer_id: impl Into<String>,
        area_ha: f64,
        centroid: Location,
        rice_variety_id: impl Into<String>,
        planting_date: Option<NaiveDate>,
    ) -> Self {
        Self {
            plot_id: plot_id.into(),
            farmer_id: farmer_id.into(),
            area_ha,
            centroid: Some(centroid),
            rice_variety_id: rice_variety_id.into(),
            planting_date,
            boundary: None,
            grouped: false,
        }
    }

    pub fn with_boundary(mut self, boundary: Vec<Location>) -> Self {
        self.boundary = Some(boundary);
        self
    }

    /// Planting date normalized against the run's reference date.
    pub fn effective_planting_date(&self, reference: NaiveDate) -> NaiveDate {
        match self.planting_date {
            Some(date) if date.year() >= SENTINEL_YEAR_CUTOFF => date,
            _ => reference,
        }
    }

    /// Location to cluster on: the recorded centroid when valid, otherwise
    /// the mean of the boundary vertices.
    ///
    /// A boundary mixing geographic and projected vertices yields `None`.
    pub fn resolved_centroid(&self) -> Option<Location> {
        if let Some(centroid) = self.centroid.filter(|c| c.is_valid()) {
            return Some(centroid);
        }

        let mut vertices: Vec<&Location> = self
            .boundary
            .as_ref()?
            .iter()
            .filter(|v| v.is_valid())
            .collect();
        // Closed rings repeat the first vertex
        if vertices.len() > 1 && vertices.first() == vertices.last() {
            vertices.pop();
        }
        let first = **vertices.first()?;
        if vertices.iter().any(|v| v.is_geographic() != first.is_geographic()) {
            return None;
        }

        let n = vertices.len() as f64;
        let (sum_x, sum_y) = vertices.iter().fold((0.0, 0.0), |(sx, sy), v| match v {
            Location::Geographic(p) => (sx + p.longitude, sy + p.latitude),
            Location::Projected { x, y } => (sx + x, sy + y),
        });
        Some(match first {
            Location::Geographic(_) => Location::Geographic(GpsPoint::new(sum_y / n, sum_x / n)),
            Location::Projected { .. } => Location::Projected {
                x: sum_x / n,
                y: sum_y / n,
            },
        })
    }

    /// Whether the area is usable for bound checks.
    pub fn has_valid_area(&self) -> bool {
        self.area_ha.is_finite() && self.area_ha > 0.0
    }
}

/// Constraints for one grouping run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupingParameters {
    /// Maximum centroid distance for two plots to be merged, in meters.
    /// Must be positive and finite. Default: 100.0
    pub proximity_threshold_meters: f64,

    /// Allowed gap between consecutive planting dates inside a bucket.
    /// Default: 2 days
    pub planting_date_tolerance_days: u32,

    /// Minimum total group area in hectares. Default: 5.0
    pub min_group_area_ha: f64,

    /// Maximum total group area in hectares. Default: 15.0
    pub max_group_area_ha: f64,

    /// Minimum plots per group. Default: 3
    pub min_plots_per_group: usize,

    /// Maximum plots per group. Default: 10
    pub max_plots_per_group: usize,

    /// Date substituted for missing planting dates.
    /// Default: None (the local date when the run starts)
    #[serde(default)]
    pub reference_date: Option<NaiveDate>,
}

impl Default for GroupingParameters {
    fn default() -> Self {
        Self {
            proximity_threshold_meters: 100.0,
            planting_date_tolerance_days: 2,
            min_group_area_ha: 5.0,
            max_group_area_ha: 15.0,
            min_plots_per_group: 3,
            max_plots_per_group: 10,
            reference_date: None,
        }
    }
}

impl GroupingParameters {
    /// Reject parameter sets the engine cannot honour.
    ///
    /// Bounds are never clamped or reordered; an inverted pair is an error.
    pub fn validate(&self) -> Result<()> {
        if !self.proximity_threshold_meters.is_finite() || self.proximity_threshold_meters <= 0.0 {
            return Err(GroupingError::InvalidThreshold {
                value: self.proximity_threshold_meters,
            });
        }
        for value in [self.min_group_area_ha, self.max_group_area_ha] {
            if !value.is_finite() || value < 0.0 {
                return Err(GroupingError::InvalidAreaBound { value });
            }
        }
        if self.min_group_area_ha > self.max_group_area_ha {
            return Err(GroupingError::InvertedAreaBounds {
                min: self.min_group_area_ha,
                max: self.max_group_area_ha,
            });
        }
        if self.min_plots_per_group == 0 {
            return Err(GroupingError::InvalidMinPlots);
        }
        if self.min_plots_per_group > self.max_plots_per_group {
            return Err(GroupingError::InvertedPlotBounds {
                min: self.min_plots_per_group,
                max: self.max_plots_per_group,
            });
        }
        Ok(())
    }

    pub fn resolved_reference_date(&self) -> NaiveDate {
        self.reference_date
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }
}

/// Caller-supplied parameters where every field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupingOverrides {
    pub proximity_threshold_meters: Option<f64>,
    pub planting_date_tolerance_days: Option<u32>,
    pub min_group_area_ha: Option<f64>,
    pub max_group_area_ha: Option<f64>,
    pub min_plots_per_group: Option<usize>,
    pub max_plots_per_group: Option<usize>,
    pub reference_date: Option<NaiveDate>,
}

impl GroupingOverrides {
    /// Resolve onto the built-in defaults.
    pub fn resolve(&self) -> GroupingParameters {
        self.apply_to(GroupingParameters::default())
    }

    /// Fill absent fields from `base`. Provided values are kept verbatim.
    pub fn apply_to(&self, base: GroupingParameters) -> GroupingParameters {
        GroupingParameters {
            proximity_threshold_meters: self
                .proximity_threshold_meters
                .unwrap_or(base.proximity_threshold_meters),
            planting_date_tolerance_days: self
                .planting_date_tolerance_days
                .unwrap_or(base.planting_date_tolerance_days),
            min_group_area_ha: self.min_group_area_ha.unwrap_or(base.min_group_area_ha),
            max_group_area_ha: self.max_group_area_ha.unwrap_or(base.max_group_area_ha),
            min_plots_per_group: self.min_plots_per_group.unwrap_or(base.min_plots_per_group),
            max_plots_per_group: self.max_plots_per_group.unwrap_or(base.max_plots_per_group),
            reference_date: self.reference_date.or(base.reference_date),
        }
    }
}

// ============================================================================
// Output Types
// ============================================================================

/// A proposed production group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposedGroup {
    /// Sequential number, 1-based, stable within one run
    pub group_number: u32,
    pub rice_variety_id: String,
    pub planting_window_start: NaiveDate,
    pub planting_window_end: NaiveDate,
    pub median_planting_date: NaiveDate,
    /// Member plot ids, ascending
    pub plot_ids: Vec<String>,
    /// Distinct farmer ids, ascending
    pub farmer_ids: Vec<String>,
    /// Sum of member areas in hectares
    pub total_area_ha: f64,
    /// Area-weighted centroid in the input coordinate system
    pub centroid: Location,
    /// Convex hull of member boundaries, when any member has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boundary: Option<Vec<Location>>,
}

impl ProposedGroup {
    pub fn plot_count(&self) -> usize {
        self.plot_ids.len()
    }

    pub fn contains_plot(&self, plot_id: &str) -> bool {
        self.plot_ids.binary_search_by(|id| id.as_str().cmp(plot_id)).is_ok()
    }

    /// Days between the earliest and latest member planting date.
    pub fn planting_span_days(&self) -> i64 {
        (self.planting_window_end - self.planting_window_start).num_days()
    }
}

/// Why a plot was left out of every group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RejectionReason {
    /// No compatible plot within the proximity threshold
    IsolatedLocation,
    /// Joining a neighbour would have produced a chain-like group
    NotSpatiallyCoherent,
    /// Its cluster had fewer plots than the minimum
    TooFewPlots,
    /// Its cluster had less area than the minimum
    InsufficientArea,
    /// Spun off while splitting a cluster above the maximum area
    GroupTooLarge,
    /// Spun off while splitting a cluster above the maximum plot count
    TooManyPlots,
    /// Missing coordinates, unusable area, or no more specific reason
    ConstraintViolation,
}

impl RejectionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectionReason::IsolatedLocation => "isolated_location",
            RejectionReason::NotSpatiallyCoherent => "not_spatially_coherent",
            RejectionReason::TooFewPlots => "too_few_plots",
            RejectionReason::InsufficientArea => "insufficient_area",
            RejectionReason::GroupTooLarge => "group_too_large",
            RejectionReason::TooManyPlots => "too_many_plots",
            RejectionReason::ConstraintViolation => "constraint_violation",
        }
    }
}

impl std::fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A plot that could not be placed, with the reason and what to try next.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UngroupedPlotInfo {
    pub plot_id: String,
    pub farmer_id: String,
    pub area_ha: f64,
    pub reason: RejectionReason,
    pub nearest_group_number: Option<u32>,
    /// Centroid distance to the nearest group in meters
    pub distance_to_nearest_group_m: Option<f64>,
    pub suggestions: Vec<String>,
}

/// Counters collected during one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupingStats {
    pub input_plots: usize,
    pub unlocated_plots: usize,
    pub buckets: usize,
    pub components: usize,
    pub merges_accepted: usize,
    pub merges_rejected_incoherent: usize,
    pub splits: usize,
    pub groups: usize,
    pub ungrouped: usize,
}

/// Result of one grouping run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupingOutcome {
    /// Groups ordered by group number
    pub groups: Vec<ProposedGroup>,
    /// Rejected plots ordered by plot id
    pub ungrouped: Vec<UngroupedPlotInfo>,
    pub stats: GroupingStats,
}

impl GroupingOutcome {
    pub fn group(&self, group_number: u32) -> Option<&ProposedGroup> {
        self.groups.iter().find(|g| g.group_number == group_number)
    }

    pub fn group_for_plot(&self, plot_id: &str) -> Option<&ProposedGroup> {
        self.groups.iter().find(|g| g.contains_plot(plot_id))
    }

    pub fn ungrouped_plot(&self, plot_id: &str) -> Option<&UngroupedPlotInfo> {
        self.ungrouped.iter().find(|u| u.plot_id == plot_id)
    }
}

// ============================================================================
// Supervisor Types
// ============================================================================

/// A supervisor who could take on groups this season.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupervisorCandidate {
    pub supervisor_id: String,
    pub cluster_id: String,
    /// Area already assigned this season, in hectares
    pub current_assigned_area_ha: f64,
    /// Capacity in hectares. `None` means unlimited.
    #[serde(default)]
    pub max_area_capacity_ha: Option<f64>,
}

impl SupervisorCandidate {
    pub fn is_available(&self) -> bool {
        match self.max_area_capacity_ha {
            Some(capacity) => self.current_assigned_area_ha < capacity,
            None => true,
        }
    }
}

/// Advisory pairing of a group with a supervisor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub group_number: u32,
    pub supervisor_id: Option<String>,
}
