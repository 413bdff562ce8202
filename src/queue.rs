use std::collections::VecDeque;

use crate::types::{Job, JobId, JobStatus};

/// Waiting list of jobs that have not started yet, kept in arrival order.
///
/// Jobs submitted at the same instant keep their submission order.
#[derive(Debug, Clone, Default)]
pub struct JobQueue {
    jobs: VecDeque<Job>,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert behind every job that arrived no later than `job`
    pub fn push(&mut self, mut job: Job) {
        job.status = JobStatus::Queued;
        let idx = self.jobs.partition_point(|j| j.submitted <= job.submitted);
        self.jobs.insert(idx, job);
    }

    pub fn head(&self) -> Option<&Job> {
        self.jobs.front()
    }

    pub fn get(&self, id: JobId) -> Option<&Job> {
        self.jobs.iter().find(|j| j.id == id)
    }

    pub fn remove(&mut self, id: JobId) -> Option<Job> {
        let idx = self.jobs.iter().position(|j| j.id == id)?;
        self.jobs.remove(idx)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Job> + '_ {
        self.jobs.iter()
    }

    /// ids in arrival order, detached from the queue so it can be mutated while iterating
    pub fn ids(&self) -> Vec<JobId> {
        self.jobs.iter().map(|j| j.id).collect()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Time;

    fn job(id: JobId, submitted: f64) -> Job {
        Job::new(id, 1, Time(submitted), None)
    }

    #[test]
    fn arrival_order() {
        let mut queue = JobQueue::new();
        queue.push(job(0, 1.0));
        queue.push(job(1, 0.0));
        queue.push(job(2, 1.0));
        queue.push(job(3, 0.5));

        assert_eq!(queue.ids(), vec![1, 3, 0, 2]);
        assert_eq!(queue.head().map(|j| j.id), Some(1));
        assert!(queue.iter().all(|j| j.status == JobStatus::Queued));
    }

    #[test]
    fn remove_by_id() {
        let mut queue = JobQueue::new();
        queue.push(job(0, 0.0));
        queue.push(job(1, 1.0));

        assert_eq!(queue.remove(0).map(|j| j.id), Some(0));
        assert!(queue.remove(0).is_none());
        assert_eq!(queue.len(), 1);
        assert!(queue.get(1).is_some());
    }
}
