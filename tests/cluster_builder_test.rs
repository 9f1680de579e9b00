//! Integration tests for ClusterBuilder

use chrono::NaiveDate;
use plotgroup::{ClusterBuilder, GroupingParameters, Location, PlotCandidate, PreparedPlot};

fn planted() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 11, 2).unwrap()
}

/// Plots at planar positions, ids `p00`, `p01`, ... in input order.
fn candidates(layout: &[(f64, f64, f64)]) -> Vec<PlotCandidate> {
    layout
        .iter()
        .enumerate()
        .map(|(i, &(x, y, area))| {
            PlotCandidate::new(
                format!("p{i:02}"),
                format!("f{i:02}"),
                area,
                Location::Projected { x, y },
                "OM5451",
                Some(planted()),
            )
        })
        .collect()
}

fn prepared(plots: &[PlotCandidate]) -> Vec<PreparedPlot<'_>> {
    plots
        .iter()
        .map(|p| {
            let position = match p.centroid {
                Some(Location::Projected { x, y }) => [x, y],
                _ => panic!("test plots are planar"),
            };
            PreparedPlot {
                plot: p,
                position,
                planting_date: planted(),
            }
        })
        .collect()
}

#[test]
fn test_empty_bucket() {
    let params = GroupingParameters::default();
    let result = ClusterBuilder::new(&params).build(&[]);

    assert!(result.clusters.is_empty());
    assert!(result.residuals.is_empty());
    assert_eq!(result.stats.components, 0);
}

#[test]
fn test_close_plots_form_one_cluster() {
    let params = GroupingParameters::default();
    let plots = candidates(&[
        (0.0, 0.0, 1.6),
        (25.0, 0.0, 1.6),
        (50.0, 0.0, 1.6),
        (0.0, 25.0, 1.6),
        (25.0, 25.0, 1.6),
    ]);
    let result = ClusterBuilder::new(&params).build(&prepared(&plots));

    assert_eq!(result.clusters, vec![vec![0, 1, 2, 3, 4]]);
    assert!(result.residuals.is_empty());
    assert_eq!(result.stats.components, 1);
    assert_eq!(result.stats.merges_accepted, 4);
}

#[test]
fn test_merges_never_cross_components() {
    let params = GroupingParameters {
        min_group_area_ha: 0.0,
        min_plots_per_group: 2,
        ..GroupingParameters::default()
    };
    let plots = candidates(&[
        (0.0, 0.0, 1.0),
        (50.0, 0.0, 1.0),
        (2_000.0, 0.0, 1.0),
        (2_050.0, 0.0, 1.0),
    ]);
    let result = ClusterBuilder::new(&params).build(&prepared(&plots));

    assert_eq!(result.stats.components, 2);
    assert_eq!(result.clusters, vec![vec![0, 1], vec![2, 3]]);
}

#[test]
fn test_chain_blocked_by_coherence() {
    // Six tiny plots 90 m apart in a line. The width floors at the 100 m
    // threshold, so five plots reach 3.7 and the sixth would reach 4.6.
    let params = GroupingParameters {
        min_group_area_ha: 0.0,
        ..GroupingParameters::default()
    };
    let plots = candidates(&(0..6).map(|i| (i as f64 * 90.0, 0.0, 0.01)).collect::<Vec<_>>());
    let result = ClusterBuilder::new(&params).build(&prepared(&plots));

    assert_eq!(result.clusters, vec![vec![0, 1, 2, 3, 4]]);
    assert_eq!(result.residuals.len(), 1);

    let residual = &result.residuals[0];
    assert_eq!(residual.index, 5);
    assert!(residual.cause.coherence_blocked);
    assert!(residual.cause.has_compatible_neighbor);
    assert_eq!(residual.cause.cluster_size, 1);
    assert_eq!(result.stats.merges_rejected_incoherent, 1);
}

#[test]
fn test_single_file_chain_is_not_one_group() {
    // Ten 0.8 ha plots, 95 m apart in a straight line: every bound holds for
    // the whole chain, only its shape is wrong.
    let params = GroupingParameters::default();
    let plots = candidates(&(0..10).map(|i| (i as f64 * 95.0, 0.0, 0.8)).collect::<Vec<_>>());
    let result = ClusterBuilder::new(&params).build(&prepared(&plots));

    assert!(result.clusters.is_empty());
    assert_eq!(result.residuals.len(), 10);
    assert!(result.stats.merges_rejected_incoherent > 0);
    assert!(result.residuals.iter().all(|r| r.cause.coherence_blocked));
    assert!(result.residuals.iter().all(|r| r.cause.cluster_size <= 4));
}

#[test]
fn test_count_split_is_balanced() {
    // 3 x 4 grid of 1 ha plots: 12 plots exceed the maximum of 10
    let layout: Vec<(f64, f64, f64)> = (0..12)
        .map(|i| ((i % 4) as f64 * 20.0, (i / 4) as f64 * 20.0, 1.0))
        .collect();
    let params = GroupingParameters::default();
    let plots = candidates(&layout);
    let result = ClusterBuilder::new(&params).build(&prepared(&plots));

    assert_eq!(result.clusters.len(), 2);
    assert!(result.clusters.iter().all(|c| c.len() == 6));
    assert!(result.residuals.is_empty());
    assert_eq!(result.stats.splits, 1);
}

#[test]
fn test_area_split_accepts_both_halves() {
    let params = GroupingParameters {
        min_plots_per_group: 2,
        ..GroupingParameters::default()
    };
    let plots = candidates(&[
        (0.0, 0.0, 5.0),
        (30.0, 0.0, 5.0),
        (200.0, 0.0, 5.0),
        (230.0, 0.0, 5.0),
        (115.0, 0.0, 0.1),
    ]);
    let result = ClusterBuilder::new(&params).build(&prepared(&plots));

    assert_eq!(result.stats.splits, 1);
    for cluster in &result.clusters {
        let area: f64 = cluster.iter().map(|&i| plots[i].area_ha).sum();
        assert!(area <= params.max_group_area_ha);
        assert!(cluster.len() >= 2);
    }
    let placed: usize = result.clusters.iter().map(|c| c.len()).sum();
    assert_eq!(placed + result.residuals.len(), plots.len());
}

#[test]
fn test_area_split_keeps_valid_remainder() {
    // 18 ha exceeds the maximum; halving leaves two pairs below the minimum
    // plot count, peeling one corner leaves a valid 13.5 ha group of three.
    let params = GroupingParameters::default();
    let plots = candidates(&[
        (0.0, 0.0, 4.5),
        (30.0, 0.0, 4.5),
        (0.0, 30.0, 4.5),
        (30.0, 30.0, 4.5),
    ]);
    let result = ClusterBuilder::new(&params).build(&prepared(&plots));

    assert_eq!(result.clusters, vec![vec![1, 2, 3]]);
    assert_eq!(result.stats.splits, 1);
    assert_eq!(result.residuals.len(), 1);

    let peeled = &result.residuals[0];
    assert_eq!(peeled.index, 0);
    assert!(peeled.cause.split_from.is_some_and(|o| o.area && !o.plot_count));
    assert_eq!(peeled.cause.cluster_size, 4);
}

#[test]
fn test_area_split_pieces_below_minimum_become_residuals() {
    // No subset of these 6 ha plots fits: three exceed 15 ha, two are too few
    let params = GroupingParameters::default();
    let plots = candidates(&[
        (0.0, 0.0, 6.0),
        (30.0, 0.0, 6.0),
        (60.0, 0.0, 6.0),
        (90.0, 0.0, 6.0),
    ]);
    let result = ClusterBuilder::new(&params).build(&prepared(&plots));

    assert!(result.clusters.is_empty());
    assert_eq!(result.residuals.len(), 4);
    for residual in &result.residuals {
        let oversize = residual.cause.split_from.expect("spun off a split");
        assert!(oversize.area);
        assert!(!oversize.plot_count);
        assert_eq!(residual.cause.cluster_size, 4);
    }
}

#[test]
fn test_single_oversized_plot_is_residual() {
    let params = GroupingParameters::default();
    let plots = candidates(&[(0.0, 0.0, 20.0)]);
    let result = ClusterBuilder::new(&params).build(&prepared(&plots));

    assert!(result.clusters.is_empty());
    assert_eq!(result.residuals.len(), 1);
    assert!(result.residuals[0].cause.split_from.is_some_and(|o| o.area));
    assert!(!result.residuals[0].cause.has_compatible_neighbor);
}

#[test]
fn test_small_pair_is_rejected_not_absorbed() {
    let params = GroupingParameters::default();
    let plots = candidates(&[(0.0, 0.0, 1.5), (40.0, 0.0, 1.5), (5_000.0, 0.0, 1.0)]);
    let result = ClusterBuilder::new(&params).build(&prepared(&plots));

    assert!(result.clusters.is_empty());
    assert_eq!(result.residuals.len(), 3);

    let pair = &result.residuals[0].cause;
    assert_eq!(pair.cluster_size, 2);
    assert!((pair.cluster_area_ha - 3.0).abs() < 1e-9);
    assert!(pair.split_from.is_none());

    let isolated = &result.residuals[2].cause;
    assert_eq!(isolated.cluster_size, 1);
    assert!(!isolated.has_compatible_neighbor);
}

#[test]
fn test_accepted_clusters_respect_bounds() {
    let layout: Vec<(f64, f64, f64)> = (0..40)
        .map(|i| {
            let ring = (i / 8) as f64;
            let angle = (i % 8) as f64 * std::f64::consts::PI / 4.0;
            (ring * 45.0 * angle.cos(), ring * 45.0 * angle.sin(), 0.5 + (i % 5) as f64 * 0.3)
        })
        .collect();
    let params = GroupingParameters::default();
    let plots = candidates(&layout);
    let result = ClusterBuilder::new(&params).build(&prepared(&plots));

    for cluster in &result.clusters {
        let area: f64 = cluster.iter().map(|&i| plots[i].area_ha).sum();
        assert!(cluster.len() >= params.min_plots_per_group);
        assert!(cluster.len() <= params.max_plots_per_group);
        assert!(area >= params.min_group_area_ha - 1e-9);
        assert!(area <= params.max_group_area_ha + 1e-9);
    }

    let mut seen: Vec<usize> = result
        .clusters
        .iter()
        .flatten()
        .copied()
        .chain(result.residuals.iter().map(|r| r.index))
        .collect();
    seen.sort_unstable();
    assert_eq!(seen, (0..plots.len()).collect::<Vec<_>>());
}

#[test]
fn test_duplicate_centroids_split_deterministically() {
    let params = GroupingParameters::default();
    let plots = candidates(&[(10.0, 10.0, 1.0); 12]);
    let builder = ClusterBuilder::new(&params);

    let first = builder.build(&prepared(&plots));
    let second = builder.build(&prepared(&plots));

    assert_eq!(first.clusters, vec![(0..6).collect::<Vec<_>>(), (6..12).collect()]);
    assert!(first.residuals.is_empty());
    assert_eq!(first.stats.merges_rejected_incoherent, 0);
    assert_eq!(first.clusters, second.clusters);
    assert_eq!(first.stats, second.stats);
}
