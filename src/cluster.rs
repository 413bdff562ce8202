use crate::allocator::{AllocError, Allocation, Allocator};
use crate::queue::JobQueue;
use crate::resources::ResourcePool;
use crate::types::{Duration, Job, JobId, JobStatus, Time};
use crate::utils::prelude::*;

/// All scheduling state of one run, handed to the policy every round
#[derive(Debug, Clone)]
pub struct Cluster {
    pub(crate) queue: JobQueue,
    pub(crate) pool: ResourcePool,
    pub(crate) allocator: Allocator,
    finished: Vec<Job>,
    rejected: Vec<Job>,
}

impl Cluster {
    pub fn new(pool: ResourcePool) -> Self {
        Self {
            queue: Default::default(),
            pool,
            allocator: Default::default(),
            finished: vec![],
            rejected: vec![],
        }
    }

    /// Admit a job into the queue.
    ///
    /// A job asking for more units than the platform has can never run, it is
    /// rejected instead of blocking the queue forever.
    pub fn submit(&mut self, mut job: Job) -> Result<(), AllocError> {
        let total = self.pool.len();
        if job.res == 0 || job.res > total {
            let err = AllocError::InsufficientCapacity {
                job: job.id,
                res: job.res,
                total,
            };
            job.status = JobStatus::Rejected;
            self.rejected.push(job);
            return Err(err);
        }
        self.queue.push(job);
        Ok(())
    }

    /// Handle completion or kill of a running job, freeing its units
    pub fn finish(&mut self, id: JobId, now: Time, status: JobStatus) -> Option<&Job> {
        let Allocation { mut job, resources, .. } = match self.allocator.release(id) {
            Some(a) => a,
            None => {
                warn!(job.id = id, %status, "finish event for a job that is not running");
                return None;
            }
        };
        let released = self.pool.release(id);
        debug_assert_eq!(released, resources);

        job.status = status;
        job.finish = Some(now);
        self.finished.push(job);
        self.finished.last()
    }

    pub fn queue(&self) -> &JobQueue {
        &self.queue
    }

    pub fn pool(&self) -> &ResourcePool {
        &self.pool
    }

    pub fn allocator(&self) -> &Allocator {
        &self.allocator
    }

    pub fn finished(&self) -> &[Job] {
        &self.finished
    }

    pub fn rejected(&self) -> &[Job] {
        &self.rejected
    }

    pub fn nb_running(&self) -> usize {
        self.allocator.len()
    }

    pub fn nb_queued(&self) -> usize {
        self.queue.len()
    }

    pub fn nb_completed(&self) -> usize {
        self.finished
            .iter()
            .filter(|j| j.status == JobStatus::Completed)
            .count()
    }

    pub fn nb_killed(&self) -> usize {
        self.finished
            .iter()
            .filter(|j| j.status == JobStatus::Killed)
            .count()
    }

    /// Nothing is waiting or running
    pub fn is_drained(&self) -> bool {
        self.queue.is_empty() && self.allocator.is_empty()
    }

    pub fn reserved_time(&self, now: Time) -> Vec<Duration> {
        self.pool.remaining(now)
    }

    pub fn progress(&self, now: Time) -> Vec<Option<f64>> {
        self.pool.progress(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::tests::RecordingEngine;

    #[test]
    fn rejects_oversized_jobs() {
        let mut cluster = Cluster::new(ResourcePool::new(1));
        let err = cluster.submit(Job::new(0, 2, Time(0.0), None)).unwrap_err();
        assert_eq!(err, AllocError::InsufficientCapacity { job: 0, res: 2, total: 1 });
        assert!(cluster.queue().is_empty());
        assert_eq!(cluster.rejected()[0].status, JobStatus::Rejected);

        cluster.submit(Job::new(1, 1, Time(0.0), None)).unwrap();
        assert_eq!(cluster.nb_queued(), 1);
    }

    #[test]
    fn finish_frees_resources() {
        let mut cluster = Cluster::new(ResourcePool::new(2));
        let mut engine = RecordingEngine::default();
        let job = Job::new(0, 2, Time(0.0), None);
        cluster
            .allocator
            .allocate(Time(1.0), &job, vec![0, 1], &mut cluster.pool, &mut engine)
            .unwrap();
        assert_eq!(cluster.nb_running(), 1);

        let job = cluster.finish(0, Time(4.0), JobStatus::Killed).unwrap();
        assert_eq!(job.finish, Some(Time(4.0)));
        assert_eq!(job.status, JobStatus::Killed);
        assert_eq!(cluster.pool().list_free(), vec![0, 1]);
        assert_eq!(cluster.nb_killed(), 1);
        assert!(cluster.is_drained());

        assert!(cluster.finish(0, Time(5.0), JobStatus::Completed).is_none());
    }
}
