use std::collections::BTreeMap;

use thiserror::Error;

use crate::resources::ResourcePool;
use crate::types::{Job, JobId, JobStatus, ResourceId, Time};
use crate::utils::prelude::*;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AllocError {
    #[error("resource {resource} is busy with job {holder}")]
    Conflict { resource: ResourceId, holder: JobId },
    #[error("job {job} needs {res} resources but the platform only has {total}")]
    InsufficientCapacity { job: JobId, res: usize, total: usize },
    #[error("job {job} needs {res} resources, got {given}")]
    SizeMismatch { job: JobId, res: usize, given: usize },
    #[error("resource {resource} does not exist")]
    UnknownResource { resource: ResourceId },
    #[error("resource {resource} given more than once")]
    DuplicateResource { resource: ResourceId },
    #[error("job {job} is not waiting in the queue")]
    NotQueued { job: JobId },
    #[error("job {job} is already allocated")]
    AlreadyAllocated { job: JobId },
}

/// The command channel to whatever actually runs jobs
pub trait Engine {
    fn execute_job(&mut self, now: Time, job: &Job, resources: &[ResourceId]);
}

/// A job bound to an exact set of resource units
#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
    pub job: Job,
    pub resources: Vec<ResourceId>,
    pub start: Time,
}

impl Allocation {
    pub fn expected_end(&self) -> Time {
        self.job.expected_end(self.start)
    }
}

/// Binds jobs to resources and keeps the allocation table
#[derive(Debug, Clone, Default)]
pub struct Allocator {
    allocations: BTreeMap<JobId, Allocation>,
}

impl Allocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commit `job` on `resources` and start it on the engine.
    ///
    /// A failed call changes nothing.
    pub fn allocate(
        &mut self,
        now: Time,
        job: &Job,
        resources: Vec<ResourceId>,
        pool: &mut ResourcePool,
        engine: &mut dyn Engine,
    ) -> Result<&Allocation, AllocError> {
        if resources.len() != job.res {
            return Err(AllocError::SizeMismatch {
                job: job.id,
                res: job.res,
                given: resources.len(),
            });
        }
        if self.allocations.contains_key(&job.id) {
            return Err(AllocError::AlreadyAllocated { job: job.id });
        }
        pool.mark_allocated(job.id, &resources, now, job.expected_end(now))?;

        let mut job = job.clone();
        job.status = JobStatus::Allocated;
        job.start = Some(now);
        debug!(job.id, ?resources, "allocated");

        engine.execute_job(now, &job, &resources);
        job.status = JobStatus::Running;

        let allocation = self.allocations.entry(job.id).or_insert(Allocation {
            job,
            resources,
            start: now,
        });
        Ok(allocation)
    }

    /// Drop the allocation of a finished job
    pub fn release(&mut self, job: JobId) -> Option<Allocation> {
        self.allocations.remove(&job)
    }

    pub fn get(&self, job: JobId) -> Option<&Allocation> {
        self.allocations.get(&job)
    }

    /// running jobs in id order
    pub fn running(&self) -> impl Iterator<Item = &Allocation> + '_ {
        self.allocations.values()
    }

    pub fn len(&self) -> usize {
        self.allocations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.allocations.is_empty()
    }
}
