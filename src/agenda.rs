//! Projection of when each resource unit becomes free.
//!
//! The agenda is never stored; it is rebuilt from the resource pool whenever a
//! policy needs to plan ahead.

use itertools::Itertools;

use crate::resources::ResourcePool;
use crate::types::{ResourceId, Time};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgendaEntry {
    pub resource: ResourceId,
    pub release: Time,
}

/// Entries sorted by release time, ties by resource id
#[derive(Debug, Clone, Default)]
pub struct Agenda {
    entries: Vec<AgendaEntry>,
    /// number of entries with a finite release time, they form a prefix
    finite: usize,
}

impl Agenda {
    /// Idle units release at `now`, busy units at their expected release,
    /// which is infinite when the running job declared no walltime.
    pub fn project(now: Time, pool: &ResourcePool) -> Self {
        let entries = pool
            .list_all()
            .iter()
            .map(|u| AgendaEntry {
                resource: u.id,
                release: u.release_time(now),
            })
            .sorted_by_key(|e| (e.release, e.resource))
            .collect_vec();
        let finite = entries.partition_point(|e| e.release.is_finite());
        Self { entries, finite }
    }

    pub fn entries(&self) -> &[AgendaEntry] {
        &self.entries
    }

    /// the prefix of entries usable for planning
    pub fn finite(&self) -> &[AgendaEntry] {
        &self.entries[..self.finite]
    }

    /// Earliest instant by which `res` units are guaranteed free, if that can be known
    pub fn start_time_for(&self, res: usize) -> Option<Time> {
        if res == 0 {
            return None;
        }
        self.finite().get(res - 1).map(|e| e.release)
    }

    /// The `res` units releasing closest to (but not after) `start`.
    ///
    /// Picking the latest ones leaves the earlier releases for backfilling.
    pub fn reservation_for(&self, res: usize, start: Time) -> Vec<ResourceId> {
        let candidates = self.finite().partition_point(|e| e.release <= start);
        self.finite()[candidates.saturating_sub(res)..candidates]
            .iter()
            .map(|e| e.resource)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool() -> ResourcePool {
        // unit 0: free, unit 1: until 10, unit 2: unbounded, unit 3: until 3, unit 4: free
        let mut pool = ResourcePool::new(5);
        pool.mark_allocated(1, &[1], Time(0.0), Time(10.0)).unwrap();
        pool.mark_allocated(2, &[2], Time(0.0), Time::INFINITY).unwrap();
        pool.mark_allocated(3, &[3], Time(0.0), Time(3.0)).unwrap();
        pool
    }

    #[test]
    fn sorted_projection() {
        let agenda = Agenda::project(Time(1.0), &pool());
        let order = agenda.entries().iter().map(|e| (e.resource, e.release)).collect_vec();
        assert_eq!(
            order,
            vec![
                (0, Time(1.0)),
                (4, Time(1.0)),
                (3, Time(3.0)),
                (1, Time(10.0)),
                (2, Time::INFINITY),
            ]
        );
        assert_eq!(agenda.finite().len(), 4);
    }

    #[test]
    fn projection_is_stable() {
        let pool = pool();
        let a = Agenda::project(Time(1.0), &pool);
        let b = Agenda::project(Time(1.0), &pool);
        assert_eq!(a.entries(), b.entries());
    }

    #[test]
    fn start_time() {
        let agenda = Agenda::project(Time(1.0), &pool());
        assert_eq!(agenda.start_time_for(2), Some(Time(1.0)));
        assert_eq!(agenda.start_time_for(3), Some(Time(3.0)));
        assert_eq!(agenda.start_time_for(4), Some(Time(10.0)));
        // the unbounded unit can never be counted on
        assert_eq!(agenda.start_time_for(5), None);
        assert_eq!(agenda.start_time_for(6), None);
    }

    #[test]
    fn reservation_takes_latest_releases() {
        let agenda = Agenda::project(Time(1.0), &pool());
        assert_eq!(agenda.reservation_for(2, Time(10.0)), vec![3, 1]);
        assert_eq!(agenda.reservation_for(3, Time(3.0)), vec![0, 4, 3]);
        assert_eq!(agenda.reservation_for(1, Time(1.0)), vec![4]);
    }
}
