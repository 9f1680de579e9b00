//! Synthetic plot field generator for stress testing and benchmarking.
//!
//! Generates villages of rice plots around known hamlets, plus scattered
//! outliers, so grouping output can be checked against the layout that
//! produced it.
//!
//! Feature-gated behind `synthetic`, not included in production builds.
//!
//! # Example
//!
//! ```rust
//! use plotgroup::synthetic::{HamletConfig, SyntheticScenario};
//!
//! let scenario = SyntheticScenario {
//!     hamlets: vec![HamletConfig::new("OM5451", 12, 150.0)],
//!     scattered_plots: 4,
//!     ..SyntheticScenario::mekong_village()
//! };
//!
//! let field = scenario.generate();
//! assert_eq!(field.plots.len(), 16);
//! ```

use chrono::{NaiveDate, TimeDelta};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;

use crate::geo_utils::{M2_PER_HECTARE, meters_per_degree_lat, meters_to_degrees};
use crate::{GpsPoint, Location, PlotCandidate, SupervisorCandidate};

// ============================================================================
// Types
// ============================================================================

/// A dense patch of plots sharing one variety and planting window.
#[derive(Debug, Clone)]
pub struct HamletConfig {
    pub rice_variety_id: String,
    pub plot_count: usize,
    /// Plots fall uniformly inside this radius around the hamlet centre.
    pub radius_meters: f64,
    /// Shift of the hamlet's planting dates from the scenario base date.
    pub planting_offset_days: i64,
}

impl HamletConfig {
    pub fn new(rice_variety_id: impl Into<String>, plot_count: usize, radius_meters: f64) -> Self {
        Self {
            rice_variety_id: rice_variety_id.into(),
            plot_count,
            radius_meters,
            planting_offset_days: 0,
        }
    }
}

/// Ground truth for one generated hamlet.
#[derive(Debug, Clone)]
pub struct ExpectedHamlet {
    pub name: String,
    pub center: GpsPoint,
    pub rice_variety_id: String,
    pub plot_ids: Vec<String>,
    pub total_area_ha: f64,
}

/// Metadata about a generated field.
#[derive(Debug, Clone)]
pub struct FieldMetadata {
    pub total_plots: usize,
    pub total_area_ha: f64,
    pub hamlet_plots: usize,
    pub scattered_plots: usize,
    /// Plots generated without a planting date
    pub undated_plots: usize,
}

/// A complete synthetic field with ground truth.
pub struct SyntheticField {
    pub plots: Vec<PlotCandidate>,
    pub expected_hamlets: Vec<ExpectedHamlet>,
    pub metadata: FieldMetadata,
}

/// Scenario configuration for generating synthetic plots.
#[derive(Debug, Clone)]
pub struct SyntheticScenario {
    /// Village centre.
    pub origin: GpsPoint,
    pub hamlets: Vec<HamletConfig>,
    /// Hamlet centres sit this far from the origin, evenly spread by angle.
    pub hamlet_spacing_meters: f64,
    /// Outlier plots spread across the whole village.
    pub scattered_plots: usize,
    pub scatter_radius_meters: f64,
    /// Plot areas are drawn uniformly from this range in hectares.
    pub area_range_ha: (f64, f64),
    pub base_planting_date: NaiveDate,
    /// Planting dates vary up to this many days after the hamlet date.
    pub date_jitter_days: i64,
    /// Share of plots generated without a planting date (0.0-1.0).
    pub undated_fraction: f64,
    /// Attach square boundaries matching each plot's area.
    pub with_boundaries: bool,
    /// RNG seed for deterministic reproduction.
    pub seed: u64,
}

// ============================================================================
// Coordinate Helpers
// ============================================================================

/// Offset a point by meters east and north.
fn offset(origin: &GpsPoint, east_m: f64, north_m: f64) -> GpsPoint {
    GpsPoint::new(
        origin.latitude + north_m / meters_per_degree_lat(),
        origin.longitude + meters_to_degrees(east_m, origin.latitude),
    )
}

/// Uniform point inside a disc.
fn random_in_disc(center: &GpsPoint, radius: f64, rng: &mut StdRng) -> GpsPoint {
    let r = radius * rng.r#gen::<f64>().sqrt();
    let theta = rng.gen_range(0.0..(2.0 * PI));
    offset(center, r * theta.cos(), r * theta.sin())
}

/// Square outline with the plot's area, centred on its centroid.
fn square_boundary(center: &GpsPoint, area_ha: f64) -> Vec<Location> {
    let half = (area_ha * M2_PER_HECTARE).sqrt() / 2.0;
    [(-half, -half), (half, -half), (half, half), (-half, half)]
        .iter()
        .map(|&(e, n)| Location::Geographic(offset(center, e, n)))
        .collect()
}

// ============================================================================
// Scenario Implementation
// ============================================================================

impl SyntheticScenario {
    /// Generate a complete synthetic field from this scenario.
    pub fn generate(&self) -> SyntheticField {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let (min_area, max_area) = self.area_range_ha;

        let mut plots = Vec::new();
        let mut expected_hamlets = Vec::with_capacity(self.hamlets.len());
        let mut undated_plots = 0;

        let mut make_plot =
            |id: String, center: GpsPoint, variety: &str, date: NaiveDate, rng: &mut StdRng| {
                let area_ha = if max_area > min_area {
                    rng.gen_range(min_area..max_area)
                } else {
                    min_area
                };
                let dated = rng.r#gen::<f64>() >= self.undated_fraction;
                if !dated {
                    undated_plots += 1;
                }
                let farmer = format!("farmer_{:03}", rng.gen_range(0..400));
                let mut plot = PlotCandidate::new(
                    id,
                    farmer,
                    area_ha,
                    Location::Geographic(center),
                    variety,
                    dated.then_some(date),
                );
                if self.with_boundaries {
                    plot = plot.with_boundary(square_boundary(&center, area_ha));
                }
                plot
            };

        for (hi, hamlet) in self.hamlets.iter().enumerate() {
            let angle = hi as f64 * 2.0 * PI / self.hamlets.len().max(1) as f64;
            let center = offset(
                &self.origin,
                self.hamlet_spacing_meters * angle.cos(),
                self.hamlet_spacing_meters * angle.sin(),
            );
            let hamlet_date = self.base_planting_date + TimeDelta::days(hamlet.planting_offset_days);

            let mut plot_ids = Vec::with_capacity(hamlet.plot_count);
            let mut total_area_ha = 0.0;
            for pi in 0..hamlet.plot_count {
                let id = format!("h{hi}_p{pi:04}");
                let position = random_in_disc(&center, hamlet.radius_meters, &mut rng);
                let jitter = if self.date_jitter_days > 0 {
                    rng.gen_range(0..=self.date_jitter_days)
                } else {
                    0
                };
                let plot = make_plot(
                    id.clone(),
                    position,
                    &hamlet.rice_variety_id,
                    hamlet_date + TimeDelta::days(jitter),
                    &mut rng,
                );
                total_area_ha += plot.area_ha;
                plot_ids.push(id);
                plots.push(plot);
            }

            expected_hamlets.push(ExpectedHamlet {
                name: format!("hamlet_{hi}"),
                center,
                rice_variety_id: hamlet.rice_variety_id.clone(),
                plot_ids,
                total_area_ha,
            });
        }

        let hamlet_plots = plots.len();
        for si in 0..self.scattered_plots {
            let position = random_in_disc(&self.origin, self.scatter_radius_meters, &mut rng);
            let variety = self
                .hamlets
                .get(si % self.hamlets.len().max(1))
                .map(|h| h.rice_variety_id.as_str())
                .unwrap_or("OM5451");
            plots.push(make_plot(
                format!("s_p{si:04}"),
                position,
                variety,
                self.base_planting_date,
                &mut rng,
            ));
        }

        let total_area_ha = plots.iter().map(|p| p.area_ha).sum();
        SyntheticField {
            metadata: FieldMetadata {
                total_plots: plots.len(),
                total_area_ha,
                hamlet_plots,
                scattered_plots: plots.len() - hamlet_plots,
                undated_plots,
            },
            plots,
            expected_hamlets,
        }
    }
}

// ============================================================================
// Predefined Scenarios
// ============================================================================

/// Can Tho origin, a representative Mekong delta latitude.
const CAN_THO: GpsPoint = GpsPoint {
    latitude: 10.0452,
    longitude: 105.7469,
};

fn base_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 11, 2).unwrap_or_default()
}

impl SyntheticScenario {
    /// Three hamlets of 15 plots with two varieties and a few outliers. Baseline benchmark.
    pub fn mekong_village() -> Self {
        Self {
            origin: CAN_THO,
            hamlets: vec![
                HamletConfig::new("OM5451", 15, 120.0),
                HamletConfig::new("OM5451", 15, 120.0),
                HamletConfig {
                    planting_offset_days: 10,
                    ..HamletConfig::new("ST25", 15, 120.0)
                },
            ],
            hamlet_spacing_meters: 1_500.0,
            scattered_plots: 6,
            scatter_radius_meters: 4_000.0,
            area_range_ha: (0.6, 1.6),
            base_planting_date: base_date(),
            date_jitter_days: 2,
            undated_fraction: 0.0,
            with_boundaries: true,
            seed: 42,
        }
    }

    /// Plots spread thinly over a wide area. Worst case: almost nothing groups.
    pub fn scattered() -> Self {
        Self {
            hamlets: vec![],
            scattered_plots: 200,
            scatter_radius_meters: 10_000.0,
            seed: 43,
            ..Self::mekong_village()
        }
    }

    /// Configurable scenario for benchmarks: `count` plots over hamlets of 25.
    pub fn with_plot_count(count: usize) -> Self {
        let hamlet_count = count.div_ceil(25).max(1);
        let hamlets = (0..hamlet_count)
            .map(|i| {
                let size = (count - (i * 25).min(count)).min(25);
                HamletConfig {
                    planting_offset_days: (i % 4) as i64 * 7,
                    ..HamletConfig::new(if i % 2 == 0 { "OM5451" } else { "ST25" }, size, 150.0)
                }
            })
            .collect();
        Self {
            hamlets,
            hamlet_spacing_meters: 400.0 * hamlet_count as f64,
            scattered_plots: 0,
            with_boundaries: false,
            seed: count as u64 * 7919,
            ..Self::mekong_village()
        }
    }
}

/// Supervisors for one cluster with staggered current workloads.
pub fn supervisors(count: usize, cluster_id: &str) -> Vec<SupervisorCandidate> {
    (0..count)
        .map(|i| SupervisorCandidate {
            supervisor_id: format!("sup_{i:02}"),
            cluster_id: cluster_id.to_string(),
            current_assigned_area_ha: (i % 3) as f64 * 5.0,
            max_area_capacity_ha: Some(200.0),
        })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
