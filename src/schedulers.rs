use parse_display::Display;

use crate::allocator::{AllocError, Engine};
use crate::cluster::Cluster;
use crate::types::{JobId, ResourceId, Time};
use crate::utils::prelude::*;

mod easy;
mod fcfs;

pub use easy::EasyBackfilling;
pub use fcfs::Fcfs;

/// Everything a policy may look at or touch during one round
pub struct Context<'a> {
    pub now: Time,
    pub cluster: &'a mut Cluster,
    pub engine: &'a mut dyn Engine,
}

impl<'a> Context<'a> {
    pub fn new(now: Time, cluster: &'a mut Cluster, engine: &'a mut dyn Engine) -> Self {
        Self { now, cluster, engine }
    }

    /// Start a queued job on exactly `resources`, taking it out of the queue.
    ///
    /// Failures are local to the job, which stays queued.
    pub fn allocate(&mut self, job: JobId, resources: Vec<ResourceId>) -> Result<(), AllocError> {
        let cluster = &mut *self.cluster;
        let queued = match cluster.queue.get(job) {
            Some(j) => j,
            None => {
                error!(job.id = job, "allocating a job that is not queued");
                return Err(AllocError::NotQueued { job });
            }
        };
        match cluster
            .allocator
            .allocate(self.now, queued, resources, &mut cluster.pool, &mut *self.engine)
        {
            Ok(_) => {
                cluster.queue.remove(job);
                Ok(())
            }
            Err(err) => {
                error!(job.id = job, %err, "allocation failed");
                Err(err)
            }
        }
    }
}

/// The capability shared by every policy: make decisions for the current round
pub trait Scheduler {
    /// Returns the number of jobs started
    fn schedule(&mut self, ctx: &mut Context<'_>) -> usize;
}

/// The closed set of policies
#[derive(Debug, Clone, Display)]
pub enum Policy {
    #[display("FCFS")]
    Fcfs(Fcfs),
    #[display("EASY")]
    Easy(EasyBackfilling),
}

impl Scheduler for Policy {
    fn schedule(&mut self, ctx: &mut Context<'_>) -> usize {
        match self {
            Policy::Fcfs(p) => p.schedule(ctx),
            Policy::Easy(p) => p.schedule(ctx),
        }
    }
}

pub fn from_config(cfg: &PolicyConfig) -> Policy {
    info!(policy = %cfg, "using");
    match cfg {
        PolicyConfig::Fcfs => Policy::Fcfs(Fcfs),
        PolicyConfig::Easy => Policy::Easy(EasyBackfilling),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize, serde::Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[display("{}")]
pub enum PolicyConfig {
    Fcfs,
    Easy,
}
