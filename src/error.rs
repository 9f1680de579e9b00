//! Error types for plot grouping.
//!
//! Only input contract violations are errors. A plot that cannot be placed
//! is reported through [`crate::UngroupedPlotInfo`] instead.

use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, GroupingError>;

/// Input rejected before any clustering runs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GroupingError {
    #[error("no plots supplied for grouping")]
    EmptyPlotSet,

    #[error("plot id '{plot_id}' appears more than once")]
    DuplicatePlotId { plot_id: String },

    #[error("min plots per group ({min}) exceeds max plots per group ({max})")]
    InvertedPlotBounds { min: usize, max: usize },

    #[error("min group area ({min} ha) exceeds max group area ({max} ha)")]
    InvertedAreaBounds { min: f64, max: f64 },

    #[error("proximity threshold must be a finite, positive distance, got {value}")]
    InvalidThreshold { value: f64 },

    #[error("group area bounds must be finite and non-negative, got {value}")]
    InvalidAreaBound { value: f64 },

    #[error("min plots per group must be at least 1")]
    InvalidMinPlots,

    #[error("plots mix geographic and projected coordinates")]
    MixedCoordinateSystems,
}

impl GroupingError {
    /// Stable machine-readable code for API layers.
    pub fn code(&self) -> &'static str {
        match self {
            GroupingError::EmptyPlotSet => "empty_plot_set",
            GroupingError::DuplicatePlotId { .. } => "duplicate_plot_id",
            GroupingError::InvertedPlotBounds { .. } => "inverted_plot_bounds",
            GroupingError::InvertedAreaBounds { .. } => "inverted_area_bounds",
            GroupingError::InvalidThreshold { .. } => "invalid_threshold",
            GroupingError::InvalidAreaBound { .. } => "invalid_area_bound",
            GroupingError::InvalidMinPlots => "invalid_min_plots",
            GroupingError::MixedCoordinateSystems => "mixed_coordinate_systems",
        }
    }
}
