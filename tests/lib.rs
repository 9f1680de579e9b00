//! Tests for core types, parameters and overrides

use chrono::NaiveDate;
use plotgroup::{
    GpsPoint, GroupingError, GroupingOverrides, GroupingParameters, Location, PlotCandidate,
    RejectionReason, SupervisorCandidate,
};

fn nov(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 11, day).unwrap()
}

#[test]
fn test_default_parameters() {
    let params = GroupingParameters::default();
    assert_eq!(params.proximity_threshold_meters, 100.0);
    assert_eq!(params.planting_date_tolerance_days, 2);
    assert_eq!(params.min_group_area_ha, 5.0);
    assert_eq!(params.max_group_area_ha, 15.0);
    assert_eq!(params.min_plots_per_group, 3);
    assert_eq!(params.max_plots_per_group, 10);
    assert!(params.validate().is_ok());
}

#[test]
fn test_validate_rejects_bad_parameters() {
    let base = GroupingParameters::default();

    let cases = [
        (
            GroupingParameters {
                min_group_area_ha: 20.0,
                ..base.clone()
            },
            GroupingError::InvertedAreaBounds {
                min: 20.0,
                max: 15.0,
            },
        ),
        (
            GroupingParameters {
                max_plots_per_group: 2,
                ..base.clone()
            },
            GroupingError::InvertedPlotBounds { min: 3, max: 2 },
        ),
        (
            GroupingParameters {
                max_group_area_ha: -1.0,
                ..base.clone()
            },
            GroupingError::InvalidAreaBound { value: -1.0 },
        ),
        (
            GroupingParameters {
                min_plots_per_group: 0,
                ..base.clone()
            },
            GroupingError::InvalidMinPlots,
        ),
    ];

    for (params, expected) in cases {
        assert_eq!(params.validate(), Err(expected));
    }

    let zero_threshold = GroupingParameters {
        proximity_threshold_meters: 0.0,
        ..base.clone()
    };
    assert_eq!(
        zero_threshold.validate(),
        Err(GroupingError::InvalidThreshold { value: 0.0 })
    );

    let nan_threshold = GroupingParameters {
        proximity_threshold_meters: f64::NAN,
        ..base
    };
    assert!(matches!(
        nan_threshold.validate(),
        Err(GroupingError::InvalidThreshold { .. })
    ));
}

#[test]
fn test_equal_bounds_are_valid() {
    let params = GroupingParameters {
        min_group_area_ha: 8.0,
        max_group_area_ha: 8.0,
        min_plots_per_group: 4,
        max_plots_per_group: 4,
        ..GroupingParameters::default()
    };
    assert!(params.validate().is_ok());
}

#[test]
fn test_overrides_resolve_onto_defaults() {
    let overrides = GroupingOverrides {
        proximity_threshold_meters: Some(250.0),
        max_plots_per_group: Some(20),
        ..GroupingOverrides::default()
    };
    let params = overrides.resolve();

    assert_eq!(params.proximity_threshold_meters, 250.0);
    assert_eq!(params.max_plots_per_group, 20);
    assert_eq!(params.min_plots_per_group, 3);
    assert_eq!(params.min_group_area_ha, 5.0);
}

#[test]
fn test_overrides_keep_inverted_values() {
    // Overrides are taken verbatim; validation reports the inversion
    let overrides = GroupingOverrides {
        min_plots_per_group: Some(9),
        max_plots_per_group: Some(4),
        ..GroupingOverrides::default()
    };
    assert_eq!(
        overrides.resolve().validate(),
        Err(GroupingError::InvertedPlotBounds { min: 9, max: 4 })
    );
}

#[test]
fn test_overrides_deserialize_partially() {
    let overrides: GroupingOverrides =
        serde_json::from_str(r#"{"min_group_area_ha": 3.5, "reference_date": "2026-11-05"}"#)
            .unwrap();
    let params = overrides.apply_to(GroupingParameters::default());

    assert_eq!(params.min_group_area_ha, 3.5);
    assert_eq!(params.reference_date, Some(nov(5)));
    assert_eq!(params.max_group_area_ha, 15.0);
}

#[test]
fn test_effective_planting_date() {
    let mut plot = PlotCandidate::new(
        "p",
        "f",
        1.0,
        Location::Projected { x: 0.0, y: 0.0 },
        "v",
        Some(nov(3)),
    );
    assert_eq!(plot.effective_planting_date(nov(9)), nov(3));

    plot.planting_date = None;
    assert_eq!(plot.effective_planting_date(nov(9)), nov(9));

    plot.planting_date = NaiveDate::from_ymd_opt(1899, 12, 31);
    assert_eq!(plot.effective_planting_date(nov(9)), nov(9));

    plot.planting_date = NaiveDate::from_ymd_opt(1900, 1, 1);
    assert_eq!(plot.effective_planting_date(nov(9)), NaiveDate::from_ymd_opt(1900, 1, 1).unwrap());
}

#[test]
fn test_resolved_reference_date() {
    let fixed = GroupingParameters {
        reference_date: Some(nov(1)),
        ..GroupingParameters::default()
    };
    assert_eq!(fixed.resolved_reference_date(), nov(1));
}

#[test]
fn test_location_validity() {
    assert!(Location::Geographic(GpsPoint::new(10.0, 105.0)).is_valid());
    assert!(!Location::Geographic(GpsPoint::new(91.0, 105.0)).is_valid());
    assert!(!Location::Geographic(GpsPoint::new(f64::NAN, 105.0)).is_valid());
    assert!(Location::Projected { x: -5.0, y: 1e7 }.is_valid());
    assert!(!Location::Projected { x: f64::INFINITY, y: 0.0 }.is_valid());
}

#[test]
fn test_resolved_centroid_prefers_centroid_then_boundary() {
    let mut plot = PlotCandidate::new(
        "p",
        "f",
        1.0,
        Location::Projected { x: 1.0, y: 2.0 },
        "v",
        None,
    );
    assert_eq!(plot.resolved_centroid(), Some(Location::Projected { x: 1.0, y: 2.0 }));

    plot.centroid = None;
    assert_eq!(plot.resolved_centroid(), None);

    plot.boundary = Some(vec![
        Location::Projected { x: 0.0, y: 0.0 },
        Location::Projected { x: 4.0, y: 0.0 },
        Location::Projected { x: 4.0, y: 4.0 },
        Location::Projected { x: 0.0, y: 4.0 },
        Location::Projected { x: 0.0, y: 0.0 },
    ]);
    assert_eq!(plot.resolved_centroid(), Some(Location::Projected { x: 2.0, y: 2.0 }));

    plot.boundary = Some(vec![
        Location::Projected { x: 0.0, y: 0.0 },
        Location::Geographic(GpsPoint::new(10.0, 105.0)),
    ]);
    assert_eq!(plot.resolved_centroid(), None);
}

#[test]
fn test_plot_deserializes_with_optional_fields() {
    let json = r#"{
        "plot_id": "p1",
        "farmer_id": "f1",
        "area_ha": 1.2,
        "centroid": {"geographic": {"latitude": 10.03, "longitude": 105.77}},
        "rice_variety_id": "OM5451"
    }"#;
    let plot: PlotCandidate = serde_json::from_str(json).unwrap();

    assert_eq!(plot.planting_date, None);
    assert!(plot.boundary.is_none());
    assert!(!plot.grouped);
    assert!(plot.centroid.is_some_and(|c| c.is_geographic()));
}

#[test]
fn test_rejection_reason_strings() {
    assert_eq!(RejectionReason::IsolatedLocation.as_str(), "isolated_location");
    assert_eq!(RejectionReason::TooManyPlots.to_string(), "too_many_plots");
}

#[test]
fn test_supervisor_availability() {
    let mut sup = SupervisorCandidate {
        supervisor_id: "s".to_string(),
        cluster_id: "c".to_string(),
        current_assigned_area_ha: 30.0,
        max_area_capacity_ha: None,
    };
    assert!(sup.is_available());

    sup.max_area_capacity_ha = Some(30.0);
    assert!(!sup.is_available());

    sup.max_area_capacity_ha = Some(30.5);
    assert!(sup.is_available());
}
