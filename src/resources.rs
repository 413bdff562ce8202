use itertools::Itertools;
use parse_display::Display;

use crate::allocator::AllocError;
use crate::types::{Duration, JobId, ResourceId, Time};

/// Allocation state of a single resource unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ResourceState {
    #[display("free")]
    Free,
    /// earmarked for the priority job during one scheduling round
    #[display("reserved-for({0})")]
    Reserved(JobId),
    #[display("busy-with({job})")]
    Busy { job: JobId, since: Time, until: Time },
}

/// A single compute unit
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceUnit {
    pub id: ResourceId,
    pub state: ResourceState,
}

impl ResourceUnit {
    pub fn is_free(&self) -> bool {
        self.state == ResourceState::Free
    }

    /// Nothing is running on it, though it may be reserved
    pub fn is_idle(&self) -> bool {
        !matches!(self.state, ResourceState::Busy { .. })
    }

    /// When the unit is expected to become free again
    pub fn release_time(&self, now: Time) -> Time {
        match self.state {
            ResourceState::Busy { until, .. } => until,
            _ => now,
        }
    }
}

/// Tracks allocation state of every unit on the platform
#[derive(Debug, Clone)]
pub struct ResourcePool {
    units: Vec<ResourceUnit>,
}

impl ResourcePool {
    pub fn new(size: usize) -> Self {
        Self {
            units: (0..size)
                .map(|id| ResourceUnit {
                    id,
                    state: ResourceState::Free,
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn get(&self, id: ResourceId) -> Option<&ResourceUnit> {
        self.units.get(id)
    }

    pub fn list_all(&self) -> &[ResourceUnit] {
        &self.units
    }

    /// ids of all units neither busy nor reserved, ascending
    pub fn list_free(&self) -> Vec<ResourceId> {
        self.units.iter().filter(|u| u.is_free()).map(|u| u.id).collect()
    }

    /// ids of all units with nothing running on them, ascending
    pub fn list_idle(&self) -> Vec<ResourceId> {
        self.units.iter().filter(|u| u.is_idle()).map(|u| u.id).collect()
    }

    pub fn held_by(&self, job: JobId) -> Vec<ResourceId> {
        self.units
            .iter()
            .filter(|u| matches!(u.state, ResourceState::Busy { job: j, .. } if j == job))
            .map(|u| u.id)
            .collect()
    }

    /// Check that every id can be handed to a job right now
    pub fn check_idle(&self, ids: &[ResourceId]) -> Result<(), AllocError> {
        if let Some(dup) = ids.iter().duplicates().next() {
            return Err(AllocError::DuplicateResource { resource: *dup });
        }
        for &id in ids {
            match self.units.get(id) {
                None => return Err(AllocError::UnknownResource { resource: id }),
                Some(ResourceUnit {
                    state: ResourceState::Busy { job, .. },
                    ..
                }) => {
                    return Err(AllocError::Conflict {
                        resource: id,
                        holder: *job,
                    })
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// Bind `ids` to `job`. Either every unit transitions or none does.
    pub fn mark_allocated(&mut self, job: JobId, ids: &[ResourceId], since: Time, until: Time) -> Result<(), AllocError> {
        self.check_idle(ids)?;
        for &id in ids {
            self.units[id].state = ResourceState::Busy { job, since, until };
        }
        Ok(())
    }

    /// Free every unit bound to or reserved for `job`, returns the released busy units
    pub fn release(&mut self, job: JobId) -> Vec<ResourceId> {
        let mut released = vec![];
        for unit in self.units.iter_mut() {
            match unit.state {
                ResourceState::Busy { job: j, .. } if j == job => {
                    unit.state = ResourceState::Free;
                    released.push(unit.id);
                }
                ResourceState::Reserved(j) if j == job => unit.state = ResourceState::Free,
                _ => {}
            }
        }
        released
    }

    /// Earmark free units for `job`. Busy units are left untouched.
    pub fn reserve(&mut self, job: JobId, ids: &[ResourceId]) {
        for &id in ids {
            if let Some(unit) = self.units.get_mut(id) {
                if unit.is_free() {
                    unit.state = ResourceState::Reserved(job);
                }
            }
        }
    }

    pub fn reserved(&self) -> Vec<ResourceId> {
        self.units
            .iter()
            .filter(|u| matches!(u.state, ResourceState::Reserved(_)))
            .map(|u| u.id)
            .collect()
    }

    pub fn clear_reservations(&mut self) {
        for unit in self.units.iter_mut() {
            if let ResourceState::Reserved(_) = unit.state {
                unit.state = ResourceState::Free;
            }
        }
    }

    /// Remaining reserved time of each unit, infinite for jobs without walltime
    pub fn remaining(&self, now: Time) -> Vec<Duration> {
        self.units.iter().map(|u| u.release_time(now) - now).collect()
    }

    /// Fraction of the walltime consumed on each unit. Idle units report 0,
    /// units running a job without walltime report `None`.
    pub fn progress(&self, now: Time) -> Vec<Option<f64>> {
        self.units
            .iter()
            .map(|u| match u.state {
                ResourceState::Busy { since, until, .. } if until.is_finite() => {
                    let span = *(until - since);
                    if span > 0.0 {
                        Some((*(now - since) / span).min(1.0))
                    } else {
                        Some(1.0)
                    }
                }
                ResourceState::Busy { .. } => None,
                _ => Some(0.0),
            })
            .collect()
    }
}

#[derive(Debug, Clone, serde::Deserialize, serde::Serialize)]
pub struct PlatformConfig {
    /// number of interchangeable resource units
    pub resources: usize,
}

pub fn from_config(cfg: &PlatformConfig) -> ResourcePool {
    ResourcePool::new(cfg.resources)
}
