use std::collections::HashMap;

use super::event::{Event, EventKind, EventQueue};
use crate::allocator::Engine;
use crate::types::{Duration, Job, JobId, ResourceId, Time};
use crate::utils::prelude::*;

/// Stands in for the execution platform: runs started jobs and produces
/// their completion or kill events.
#[derive(Debug, Default)]
pub struct SimEngine {
    pub(crate) future: EventQueue,
    /// actual run length of every submitted job
    runtimes: HashMap<JobId, Duration>,
    notifications: Vec<Event>,
}

impl SimEngine {
    pub fn new(future: EventQueue) -> Self {
        Self {
            future,
            ..Default::default()
        }
    }

    pub fn admit(&mut self, job: JobId, runtime: Duration) {
        self.runtimes.insert(job, runtime);
    }

    pub fn notify(&mut self, time: Time, kind: EventKind) {
        let event = self.future.stamp(time, kind);
        self.notifications.push(event);
    }

    pub fn drain_notifications(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.notifications)
    }
}

impl Engine for SimEngine {
    /// A job running past its walltime is killed when the walltime expires
    fn execute_job(&mut self, now: Time, job: &Job, resources: &[ResourceId]) {
        let runtime = match self.runtimes.get(&job.id) {
            Some(r) => *r,
            None => {
                error!(job.id, "starting a job the engine never saw submitted");
                Duration(0.0)
            }
        };
        info!(time = %now, job.id, ?resources, "start job");
        self.notify(
            now,
            EventKind::JobStarted {
                job: job.id,
                resources: resources.to_vec(),
            },
        );

        match job.walltime {
            Some(walltime) if runtime > walltime => {
                self.future.push(now + walltime, EventKind::JobKilled { job: job.id });
            }
            _ => self.future.push(now + runtime, EventKind::JobCompleted { job: job.id }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_or_kill() {
        let mut engine = SimEngine::default();
        engine.admit(0, Duration(3.0));
        engine.admit(1, Duration(9.0));

        engine.execute_job(Time(1.0), &Job::new(0, 1, Time(0.0), Some(Duration(5.0))), &[0]);
        engine.execute_job(Time(1.0), &Job::new(1, 1, Time(0.0), Some(Duration(5.0))), &[1]);

        let first = engine.future.pop_instant();
        assert_eq!(first[0].time, Time(4.0));
        assert_eq!(first[0].kind, EventKind::JobCompleted { job: 0 });
        let second = engine.future.pop_instant();
        assert_eq!(second[0].time, Time(6.0));
        assert_eq!(second[0].kind, EventKind::JobKilled { job: 1 });

        let notes = engine.drain_notifications();
        assert_eq!(notes.len(), 2);
        assert!(notes.iter().all(|e| e.kind.is_notification()));
        assert!(engine.drain_notifications().is_empty());
    }
}
