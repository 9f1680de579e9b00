//! Supervisor assignment for accepted groups.
//!
//! Available supervisors are ordered by current workload and groups are
//! dealt out round-robin, so load stays balanced without knowing final
//! post-assignment areas. The plan is advisory; the caller re-validates
//! and persists it when the grouping is committed.

use serde::{Deserialize, Serialize};

use crate::{Assignment, ProposedGroup, SupervisorCandidate};

/// Projected workload of one supervisor after assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupervisorWorkload {
    pub supervisor_id: String,
    pub current_area_ha: f64,
    pub assigned_area_ha: f64,
    pub assigned_groups: usize,
}

impl SupervisorWorkload {
    pub fn projected_area_ha(&self) -> f64 {
        self.current_area_ha + self.assigned_area_ha
    }
}

/// Result of balancing groups across supervisors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentPlan {
    /// One entry per group, ordered by group number
    pub assignments: Vec<Assignment>,
    /// One entry per available supervisor, in assignment order
    pub workloads: Vec<SupervisorWorkload>,
    /// No supervisor was available; every assignment is empty
    pub insufficient_supervisors: bool,
}

impl AssignmentPlan {
    pub fn supervisor_for(&self, group_number: u32) -> Option<&str> {
        self.assignments
            .iter()
            .find(|a| a.group_number == group_number)
            .and_then(|a| a.supervisor_id.as_deref())
    }
}

/// Round-robin balancer over a pre-sorted supervisor roster.
#[derive(Debug, Clone)]
pub struct SupervisorLoadBalancer<'a> {
    available: Vec<&'a SupervisorCandidate>,
}

impl<'a> SupervisorLoadBalancer<'a> {
    /// Keep available supervisors, optionally only those of `cluster_id`,
    /// ordered by current assigned area then supervisor id.
    pub fn new(supervisors: &'a [SupervisorCandidate], cluster_id: Option<&str>) -> Self {
        let mut available: Vec<&SupervisorCandidate> = supervisors
            .iter()
            .filter(|s| s.is_available())
            .filter(|s| cluster_id.is_none_or(|c| s.cluster_id == c))
            .collect();
        available.sort_by(|a, b| {
            a.current_assigned_area_ha
                .total_cmp(&b.current_assigned_area_ha)
                .then_with(|| a.supervisor_id.cmp(&b.supervisor_id))
        });

        Self { available }
    }

    pub fn available(&self) -> &[&'a SupervisorCandidate] {
        &self.available
    }

    /// Deal groups out in group-number order: group `i` goes to supervisor
    /// `i mod count`.
    pub fn assign(&self, groups: &[ProposedGroup]) -> AssignmentPlan {
        let mut ordered: Vec<&ProposedGroup> = groups.iter().collect();
        ordered.sort_by_key(|g| g.group_number);

        let mut workloads: Vec<SupervisorWorkload> = self
            .available
            .iter()
            .map(|s| SupervisorWorkload {
                supervisor_id: s.supervisor_id.clone(),
                current_area_ha: s.current_assigned_area_ha,
                assigned_area_ha: 0.0,
                assigned_groups: 0,
            })
            .collect();

        let count = workloads.len();
        let assignments = ordered
            .iter()
            .enumerate()
            .map(|(i, group)| {
                let supervisor_id = if count == 0 {
                    None
                } else {
                    let workload = &mut workloads[i % count];
                    workload.assigned_area_ha += group.total_area_ha;
                    workload.assigned_groups += 1;
                    Some(workload.supervisor_id.clone())
                };
                Assignment {
                    group_number: group.group_number,
                    supervisor_id,
                }
            })
            .collect();

        AssignmentPlan {
            assignments,
            workloads,
            insufficient_supervisors: count == 0 && !ordered.is_empty(),
        }
    }
}
