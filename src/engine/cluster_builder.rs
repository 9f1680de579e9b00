//! Agglomerative clustering of one compatibility bucket.
//!
//! ## Algorithm
//! 1. Split the bucket into proximity components (Union-Find over all
//!    centroid pairs within the threshold). Merges never cross components.
//! 2. Within a component, repeatedly merge the closest pair of clusters
//!    under single linkage, ties going to the lower plot ids.
//! 3. Before each merge, check the merged cluster stays compact (its length
//!    over its width stays under [`MAX_ELONGATION`]). A failing pair is
//!    blocked and the next closest pair is tried.
//! 4. Split clusters above the plot-count or area maximum, then reject
//!    pieces below either minimum. Rejected members become residuals.

use log::debug;

use crate::geo_utils::{M2_PER_HECTARE, planar_distance};
use crate::union_find::UnionFind;
use crate::GroupingParameters;

use super::PreparedPlot;
use super::spatial_index::SpatialIndex;

/// Largest accepted ratio of a cluster's length to its width.
///
/// Both are padded by the typical plot side and the width never counts as
/// narrower than the proximity threshold, so any pair within the threshold
/// passes and a single-file line of touching plots stops at four.
pub const MAX_ELONGATION: f64 = 4.0;

/// Which maximum a cluster exceeded before it was split.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Oversize {
    pub area: bool,
    pub plot_count: bool,
}

impl Oversize {
    pub fn any(&self) -> bool {
        self.area || self.plot_count
    }
}

/// What happened to a plot that did not end up in an accepted cluster.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResidualCause {
    /// Size of the cluster the plot belonged to when merging stopped
    pub cluster_size: usize,
    /// Area of that cluster in hectares
    pub cluster_area_ha: f64,
    /// Set when that cluster was split for exceeding a maximum
    pub split_from: Option<Oversize>,
    /// A merge involving this plot's cluster failed the compactness check
    pub coherence_blocked: bool,
    /// Another plot of the same bucket lies within the threshold
    pub has_compatible_neighbor: bool,
}

/// A bucket plot left out of every accepted cluster.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Residual {
    /// Index into the bucket's plot slice
    pub index: usize,
    pub cause: ResidualCause,
}

/// Counters for one bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClusterStats {
    pub components: usize,
    pub merges_accepted: usize,
    pub merges_rejected_incoherent: usize,
    pub splits: usize,
}

/// Output of clustering one bucket.
#[derive(Debug, Clone, Default)]
pub struct BucketClustering {
    /// Accepted clusters as ascending indices into the bucket's plots
    pub clusters: Vec<Vec<usize>>,
    /// Residual plots, ascending by index
    pub residuals: Vec<Residual>,
    pub stats: ClusterStats,
}

/// Working state of a cluster during agglomeration.
#[derive(Debug, Clone)]
struct WorkingCluster {
    /// Bucket indices, ascending
    members: Vec<usize>,
    area_ha: f64,
}

/// Clusters one compatibility bucket under a set of grouping parameters.
#[derive(Debug, Clone, Copy)]
pub struct ClusterBuilder<'p> {
    params: &'p GroupingParameters,
}

impl<'p> ClusterBuilder<'p> {
    pub fn new(params: &'p GroupingParameters) -> Self {
        Self { params }
    }

    /// Cluster a bucket. `plots` must be sorted by plot id so that index
    /// order is plot-id order.
    pub fn build(&self, plots: &[PreparedPlot<'_>]) -> BucketClustering {
        debug_assert!(
            plots
                .windows(2)
                .all(|w| w[0].plot.plot_id <= w[1].plot.plot_id),
            "bucket plots must be sorted by plot id"
        );

        let mut result = BucketClustering::default();
        if plots.is_empty() {
            return result;
        }

        let threshold = self.params.proximity_threshold_meters;
        let positions: Vec<[f64; 2]> = plots.iter().map(|p| p.position).collect();
        let index = SpatialIndex::new(&positions);
        let components = proximity_components(&index, threshold);
        result.stats.components = components.len();

        let mut blocked_plots = vec![false; plots.len()];

        for component in &components {
            let merged = self.agglomerate(
                component,
                plots,
                &mut blocked_plots,
                &mut result.stats,
            );

            for cluster in merged {
                self.enforce_bounds(cluster, plots, &index, &blocked_plots, &mut result);
            }
        }

        for cluster in &mut result.clusters {
            cluster.sort_unstable();
        }
        result.clusters.sort_by(|a, b| a.first().cmp(&b.first()));
        result.residuals.sort_by_key(|r| r.index);

        debug!(
            "[ClusterBuilder] {} plots -> {} components, {} clusters, {} residuals ({} merges, {} incoherent, {} splits)",
            plots.len(),
            result.stats.components,
            result.clusters.len(),
            result.residuals.len(),
            result.stats.merges_accepted,
            result.stats.merges_rejected_incoherent,
            result.stats.splits
        );

        result
    }

    /// Single-linkage agglomeration inside one proximity component.
    ///
    /// Slot `i` starts as the singleton of `component[i]`; a merged cluster
    /// always keeps the lower slot, so a slot number is also the rank of
    /// its smallest member.
    ///
    /// Every step rescans all slot pairs and every compactness check walks
    /// the merged members pairwise, so a component of `n` plots costs about
    /// O(n³ log n). This is the first cost to revisit if buckets grow past a
    /// few hundred plots.
    fn agglomerate(
        &self,
        component: &[usize],
        plots: &[PreparedPlot<'_>],
        blocked_plots: &mut [bool],
        stats: &mut ClusterStats,
    ) -> Vec<WorkingCluster> {
        let threshold = self.params.proximity_threshold_meters;
        let n = component.len();

        let mut slots: Vec<Option<WorkingCluster>> = component
            .iter()
            .map(|&idx| {
                Some(WorkingCluster {
                    members: vec![idx],
                    area_ha: plot_area(&plots[idx]),
                })
            })
            .collect();

        let mut linkage = vec![vec![f64::INFINITY; n]; n];
        for i in 0..n {
            for j in (i + 1)..n {
                let d = planar_distance(plots[component[i]].position, plots[component[j]].position);
                linkage[i][j] = d;
                linkage[j][i] = d;
            }
        }
        let mut blocked = vec![vec![false; n]; n];

        loop {
            let mut candidates: Vec<(f64, usize, usize)> = Vec::new();
            for i in 0..n {
                if slots[i].is_none() {
                    continue;
                }
                for j in (i + 1)..n {
                    if slots[j].is_some() && !blocked[i][j] && linkage[i][j] <= threshold {
                        candidates.push((linkage[i][j], i, j));
                    }
                }
            }
            candidates.sort_by(|a, b| {
                a.0.total_cmp(&b.0)
                    .then_with(|| a.1.cmp(&b.1))
                    .then_with(|| a.2.cmp(&b.2))
            });

            let mut merged_pair = None;
            for &(_, i, j) in &candidates {
                let (Some(a), Some(b)) = (&slots[i], &slots[j]) else {
                    continue;
                };
                let merged: Vec<usize> = a.members.iter().chain(&b.members).copied().collect();
                let positions: Vec<[f64; 2]> = merged.iter().map(|&m| plots[m].position).collect();
                let areas: Vec<f64> = merged.iter().map(|&m| plot_area(&plots[m])).collect();
                if is_compact(&positions, &areas, threshold) {
                    merged_pair = Some((i, j, a.area_ha + b.area_ha));
                    break;
                }

                blocked[i][j] = true;
                blocked[j][i] = true;
                stats.merges_rejected_incoherent += 1;
                for &m in a.members.iter().chain(b.members.iter()) {
                    blocked_plots[m] = true;
                }
            }

            let Some((i, j, area_ha)) = merged_pair else {
                break;
            };

            let absorbed = slots[j].take().map(|c| c.members).unwrap_or_default();
            if let Some(target) = slots[i].as_mut() {
                target.members.extend(absorbed);
                target.members.sort_unstable();
                target.area_ha = area_ha;
            }
            stats.merges_accepted += 1;

            for k in 0..n {
                let merged = linkage[i][k].min(linkage[j][k]);
                linkage[i][k] = merged;
                linkage[k][i] = merged;
                // The cluster in slot i changed, so earlier verdicts no longer hold
                blocked[i][k] = false;
                blocked[k][i] = false;
            }
        }

        slots.into_iter().flatten().collect()
    }

    /// Split oversized clusters, then accept or reject every piece.
    fn enforce_bounds(
        &self,
        cluster: WorkingCluster,
        plots: &[PreparedPlot<'_>],
        index: &SpatialIndex,
        blocked_plots: &[bool],
        result: &mut BucketClustering,
    ) {
        let params = self.params;
        let oversize = Oversize {
            area: cluster.area_ha > params.max_group_area_ha,
            plot_count: cluster.members.len() > params.max_plots_per_group,
        };
        let cluster_size = cluster.members.len();
        let cluster_area_ha = cluster.area_ha;

        let pieces = if oversize.any() {
            self.split_oversized(cluster.members, plots, &mut result.stats)
        } else {
            vec![cluster.members]
        };

        for piece in pieces {
            let areas: Vec<f64> = piece.iter().map(|&i| plot_area(&plots[i])).collect();
            if self.fits(&areas) {
                result.clusters.push(piece);
                continue;
            }

            for idx in piece {
                result.residuals.push(Residual {
                    index: idx,
                    cause: ResidualCause {
                        cluster_size,
                        cluster_area_ha,
                        split_from: oversize.any().then_some(oversize),
                        coherence_blocked: blocked_plots[idx],
                        has_compatible_neighbor: index
                            .has_neighbor_within(idx, params.proximity_threshold_meters),
                    },
                });
            }
        }
    }

    /// Split until every piece satisfies both maxima.
    ///
    /// A single plot above the area maximum cannot be split and is returned
    /// as its own piece.
    fn split_oversized(
        &self,
        members: Vec<usize>,
        plots: &[PreparedPlot<'_>],
        stats: &mut ClusterStats,
    ) -> Vec<Vec<usize>> {
        let params = self.params;
        let mut pending = vec![members];
        let mut done = Vec::new();

        while let Some(piece) = pending.pop() {
            let area_ha: f64 = piece.iter().map(|&i| plot_area(&plots[i])).sum();
            let too_many = piece.len() > params.max_plots_per_group;
            let too_large = area_ha > params.max_group_area_ha;

            if (!too_many && !too_large) || piece.len() < 2 {
                done.push(piece);
                continue;
            }

            let (near, far) = self.split_piece(&piece, plots, too_many);
            stats.splits += 1;
            // Depth-first on the near half keeps output order stable
            pending.push(far);
            pending.push(near);
        }

        done
    }

    /// Cut a piece in two along the axis between its most distant seeds.
    ///
    /// The balanced cut (half the count for a plot-count split, half the area
    /// otherwise) is used when both sides still meet the minimums. Failing
    /// that, the fewest members are peeled off either end so that the rest
    /// is a valid group on its own. Only when no such peel exists does the
    /// balanced cut stand anyway.
    fn split_piece(
        &self,
        piece: &[usize],
        plots: &[PreparedPlot<'_>],
        by_count: bool,
    ) -> (Vec<usize>, Vec<usize>) {
        let ordered = order_between_seeds(piece, plots);
        let areas: Vec<f64> = ordered.iter().map(|&i| plot_area(&plots[i])).collect();

        let balanced = balanced_cut(&areas, by_count);
        let (near_areas, far_areas) = areas.split_at(balanced);
        let cut = if self.meets_minimums(near_areas) && self.meets_minimums(far_areas) {
            balanced
        } else {
            self.smallest_peel(&areas).unwrap_or(balanced)
        };

        let mut near = ordered[..cut].to_vec();
        let mut far = ordered[cut..].to_vec();
        near.sort_unstable();
        far.sort_unstable();
        (near, far)
    }

    /// Cut index leaving a valid group after peeling the fewest members off
    /// one end. Ties go to the seed-A end.
    fn smallest_peel(&self, areas: &[f64]) -> Option<usize> {
        let n = areas.len();
        (1..n).find_map(|k| {
            if self.fits(&areas[k..]) {
                Some(k)
            } else if self.fits(&areas[..n - k]) {
                Some(n - k)
            } else {
                None
            }
        })
    }

    fn meets_minimums(&self, areas: &[f64]) -> bool {
        areas.len() >= self.params.min_plots_per_group
            && areas.iter().sum::<f64>() >= self.params.min_group_area_ha
    }

    /// Whether plots with these areas form an acceptable group.
    fn fits(&self, areas: &[f64]) -> bool {
        self.meets_minimums(areas)
            && areas.len() <= self.params.max_plots_per_group
            && areas.iter().sum::<f64>() <= self.params.max_group_area_ha
    }
}

/// Proximity components of a bucket, each sorted, ordered by first member.
fn proximity_components(index: &SpatialIndex, threshold: f64) -> Vec<Vec<usize>> {
    let mut uf = UnionFind::with_capacity(index.len());
    for i in 0..index.len() {
        uf.make_set(i);
    }
    for i in 0..index.len() {
        for j in index.neighbors_of(i, threshold) {
            if j > i {
                uf.union(&i, &j);
            }
        }
    }
    uf.sorted_groups()
}

/// Members of a piece ordered from seed A towards seed B.
///
/// Seed A is the member farthest from the area-weighted centroid, seed B the
/// member farthest from A. Members are ordered by how much closer they are
/// to A than to B, ties by bucket index.
fn order_between_seeds(piece: &[usize], plots: &[PreparedPlot<'_>]) -> Vec<usize> {
    let positions: Vec<[f64; 2]> = piece.iter().map(|&i| plots[i].position).collect();
    let areas: Vec<f64> = piece.iter().map(|&i| plot_area(&plots[i])).collect();
    let center = weighted_center(&positions, &areas);

    let seed_a = farthest_from(&positions, center, None);
    let seed_b = farthest_from(&positions, positions[seed_a], Some(seed_a));

    let mut order: Vec<usize> = (0..piece.len()).collect();
    order.sort_by(|&x, &y| {
        let kx = planar_distance(positions[x], positions[seed_a])
            - planar_distance(positions[x], positions[seed_b]);
        let ky = planar_distance(positions[y], positions[seed_a])
            - planar_distance(positions[y], positions[seed_b]);
        kx.total_cmp(&ky).then_with(|| piece[x].cmp(&piece[y]))
    });
    order.into_iter().map(|o| piece[o]).collect()
}

/// Half the count, or the first point where the running area reaches half
/// the total. Always leaves at least one member on each side.
fn balanced_cut(areas: &[f64], by_count: bool) -> usize {
    let n = areas.len();
    let cut = if by_count {
        n.div_ceil(2)
    } else {
        let total: f64 = areas.iter().sum();
        let mut running = 0.0;
        areas
            .iter()
            .position(|&a| {
                running += a;
                running >= total / 2.0
            })
            .map_or(n, |k| k + 1)
    };
    cut.clamp(1, n - 1)
}

/// Position of the point farthest from `from`; ties go to the lower index.
fn farthest_from(positions: &[[f64; 2]], from: [f64; 2], skip: Option<usize>) -> usize {
    let mut best = None;
    let mut best_distance = f64::NEG_INFINITY;
    for (k, &p) in positions.iter().enumerate() {
        if Some(k) == skip {
            continue;
        }
        let d = planar_distance(p, from);
        if d > best_distance {
            best_distance = d;
            best = Some(k);
        }
    }
    best.unwrap_or(0)
}

/// Area-weighted mean position, falling back to the plain mean when the
/// total area is zero.
pub(crate) fn weighted_center(positions: &[[f64; 2]], areas: &[f64]) -> [f64; 2] {
    if positions.is_empty() {
        return [0.0, 0.0];
    }
    let total: f64 = areas.iter().sum();
    if total > 0.0 {
        let mut x = 0.0;
        let mut y = 0.0;
        for (p, a) in positions.iter().zip(areas) {
            x += p[0] * a;
            y += p[1] * a;
        }
        [x / total, y / total]
    } else {
        let n = positions.len() as f64;
        [
            positions.iter().map(|p| p[0]).sum::<f64>() / n,
            positions.iter().map(|p| p[1]).sum::<f64>() / n,
        ]
    }
}

/// Length over width of a set of plots.
///
/// Length is the longest centroid distance, width the centroid spread across
/// that axis. Both are padded by the side of a square of the mean plot area,
/// and the width is floored at `threshold`.
pub fn elongation(positions: &[[f64; 2]], areas: &[f64], threshold: f64) -> f64 {
    if positions.len() < 2 {
        return 0.0;
    }

    let (mut a, mut b, mut diameter) = (0, 0, 0.0);
    for i in 0..positions.len() {
        for j in (i + 1)..positions.len() {
            let d = planar_distance(positions[i], positions[j]);
            if d > diameter {
                (a, b, diameter) = (i, j, d);
            }
        }
    }

    let width = if diameter > 0.0 {
        let origin = positions[a];
        let normal = [
            -(positions[b][1] - origin[1]) / diameter,
            (positions[b][0] - origin[0]) / diameter,
        ];
        let (lo, hi) = positions
            .iter()
            .map(|p| (p[0] - origin[0]) * normal[0] + (p[1] - origin[1]) * normal[1])
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), t| (lo.min(t), hi.max(t)));
        hi - lo
    } else {
        0.0
    };

    let mean_area = areas.iter().map(|area| area.max(0.0)).sum::<f64>() / areas.len().max(1) as f64;
    let side = (mean_area * M2_PER_HECTARE).sqrt();

    let length = diameter + side;
    let breadth = (width + side).max(threshold);
    if breadth > 0.0 {
        length / breadth
    } else if length > 0.0 {
        f64::INFINITY
    } else {
        0.0
    }
}

/// Whether plots at these positions form a compact cluster.
pub fn is_compact(positions: &[[f64; 2]], areas: &[f64], threshold: f64) -> bool {
    elongation(positions, areas, threshold) <= MAX_ELONGATION
}

/// Plot area for bound checks. Plots reaching the builder have a valid area.
fn plot_area(plot: &PreparedPlot<'_>) -> f64 {
    plot.plot.area_ha
}
