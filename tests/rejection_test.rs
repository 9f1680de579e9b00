//! Integration tests for RejectionClassifier

use plotgroup::engine::cluster_builder::Oversize;
use plotgroup::engine::rejection::suggestions_for;
use plotgroup::{
    GroupingParameters, Location, PlotCandidate, RejectionClassifier, RejectionReason,
    engine::ResidualCause,
};

fn cause() -> ResidualCause {
    ResidualCause {
        cluster_size: 1,
        cluster_area_ha: 1.0,
        split_from: None,
        coherence_blocked: false,
        has_compatible_neighbor: true,
    }
}

fn plot(id: &str, area: f64) -> PlotCandidate {
    PlotCandidate::new(id, "farmer", area, Location::Projected { x: 0.0, y: 0.0 }, "OM5451", None)
}

#[test]
fn test_merged_cluster_below_min_plots() {
    let params = GroupingParameters::default();
    let classifier = RejectionClassifier::new(&params, &[]);

    let reason = classifier.reason(&ResidualCause {
        cluster_size: 2,
        cluster_area_ha: 3.0,
        ..cause()
    });
    assert_eq!(reason, RejectionReason::TooFewPlots);
}

#[test]
fn test_merged_cluster_below_min_area() {
    let params = GroupingParameters::default();
    let classifier = RejectionClassifier::new(&params, &[]);

    let reason = classifier.reason(&ResidualCause {
        cluster_size: 4,
        cluster_area_ha: 2.0,
        ..cause()
    });
    assert_eq!(reason, RejectionReason::InsufficientArea);
}

#[test]
fn test_count_checked_before_area() {
    let params = GroupingParameters::default();
    let classifier = RejectionClassifier::new(&params, &[]);

    // Both minimums missed: plot count wins
    let reason = classifier.reason(&ResidualCause {
        cluster_size: 2,
        cluster_area_ha: 0.5,
        ..cause()
    });
    assert_eq!(reason, RejectionReason::TooFewPlots);
}

#[test]
fn test_singleton_with_min_plots_one_is_insufficient_area() {
    let params = GroupingParameters {
        min_plots_per_group: 1,
        ..GroupingParameters::default()
    };
    let classifier = RejectionClassifier::new(&params, &[]);

    assert_eq!(classifier.reason(&cause()), RejectionReason::InsufficientArea);
}

#[test]
fn test_split_reasons() {
    let params = GroupingParameters::default();
    let classifier = RejectionClassifier::new(&params, &[]);

    let by_area = ResidualCause {
        cluster_size: 4,
        cluster_area_ha: 20.0,
        split_from: Some(Oversize {
            area: true,
            plot_count: true,
        }),
        ..cause()
    };
    assert_eq!(classifier.reason(&by_area), RejectionReason::GroupTooLarge);

    let by_count = ResidualCause {
        cluster_size: 14,
        cluster_area_ha: 7.0,
        split_from: Some(Oversize {
            area: false,
            plot_count: true,
        }),
        ..cause()
    };
    assert_eq!(classifier.reason(&by_count), RejectionReason::TooManyPlots);
}

#[test]
fn test_split_wins_over_coherence() {
    let params = GroupingParameters::default();
    let classifier = RejectionClassifier::new(&params, &[]);

    let reason = classifier.reason(&ResidualCause {
        cluster_size: 12,
        cluster_area_ha: 12.0,
        split_from: Some(Oversize {
            area: false,
            plot_count: true,
        }),
        coherence_blocked: true,
        ..cause()
    });
    assert_eq!(reason, RejectionReason::TooManyPlots);
}

#[test]
fn test_coherence_isolation_and_fallback() {
    let params = GroupingParameters::default();
    let classifier = RejectionClassifier::new(&params, &[]);

    let blocked = ResidualCause {
        coherence_blocked: true,
        ..cause()
    };
    assert_eq!(classifier.reason(&blocked), RejectionReason::NotSpatiallyCoherent);

    let isolated = ResidualCause {
        has_compatible_neighbor: false,
        ..cause()
    };
    assert_eq!(classifier.reason(&isolated), RejectionReason::IsolatedLocation);

    assert_eq!(classifier.reason(&cause()), RejectionReason::ConstraintViolation);
}

#[test]
fn test_nearest_group_reported() {
    let params = GroupingParameters::default();
    let groups = [(2, [1_000.0, 0.0]), (1, [0.0, 0.0])];
    let classifier = RejectionClassifier::new(&params, &groups);

    let info = classifier.classify(
        &plot("far", 1.0),
        [5_000.0, 0.0],
        &ResidualCause {
            has_compatible_neighbor: false,
            ..cause()
        },
    );

    assert_eq!(info.reason, RejectionReason::IsolatedLocation);
    assert_eq!(info.nearest_group_number, Some(2));
    assert_eq!(info.distance_to_nearest_group_m, Some(4_000.0));
    assert!(!info.suggestions.is_empty() && info.suggestions.len() <= 3);
    assert!(info.suggestions[0].contains("#2"));
}

#[test]
fn test_no_groups_no_nearest() {
    let params = GroupingParameters::default();
    let classifier = RejectionClassifier::new(&params, &[]);

    let info = classifier.classify(&plot("a", 1.0), [0.0, 0.0], &cause());
    assert_eq!(info.nearest_group_number, None);
    assert_eq!(info.distance_to_nearest_group_m, None);
}

#[test]
fn test_unplaceable_is_constraint_violation() {
    let params = GroupingParameters::default();
    let classifier = RejectionClassifier::new(&params, &[(1, [0.0, 0.0])]);

    let mut unlocated = plot("u", 1.0);
    unlocated.centroid = None;
    let info = classifier.classify_unplaceable(&unlocated, None);

    assert_eq!(info.reason, RejectionReason::ConstraintViolation);
    assert_eq!(info.nearest_group_number, None);
    assert!(info.suggestions[0].contains("centroid"));

    let bad_area = plot("b", -2.0);
    let info = classifier.classify_unplaceable(&bad_area, Some([10.0, 0.0]));
    assert_eq!(info.nearest_group_number, Some(1));
    assert!(info.suggestions[0].contains("area"));
}

#[test]
fn test_classification_is_idempotent() {
    let params = GroupingParameters::default();
    let classifier = RejectionClassifier::new(&params, &[(1, [0.0, 0.0]), (2, [300.0, 0.0])]);
    let target = plot("x", 0.8);
    let residual = ResidualCause {
        cluster_size: 2,
        cluster_area_ha: 1.6,
        ..cause()
    };

    let first = classifier.classify(&target, [120.0, 40.0], &residual);
    let second = classifier.classify(&target, [120.0, 40.0], &residual);
    assert_eq!(first, second);
}

#[test]
fn test_suggestions_cover_every_reason() {
    let params = GroupingParameters::default();
    let target = plot("s", 22.0);
    let reasons = [
        RejectionReason::IsolatedLocation,
        RejectionReason::NotSpatiallyCoherent,
        RejectionReason::TooFewPlots,
        RejectionReason::InsufficientArea,
        RejectionReason::GroupTooLarge,
        RejectionReason::TooManyPlots,
        RejectionReason::ConstraintViolation,
    ];

    for reason in reasons {
        for nearest in [None, Some((3, 250.0))] {
            let suggestions = suggestions_for(reason, &target, nearest, &params);
            assert!(
                (1..=3).contains(&suggestions.len()),
                "{reason}: {suggestions:?}"
            );
        }
    }
}
