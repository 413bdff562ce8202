use super::{Context, Scheduler};
use crate::utils::prelude::*;

/// First-come-first-served with strict head-of-line blocking
#[derive(Debug, Clone, Copy, Default)]
pub struct Fcfs;

impl Fcfs {
    /// Start jobs in arrival order until the head does not fit
    pub(super) fn start_in_order(ctx: &mut Context<'_>) -> usize {
        let mut started = 0;
        for id in ctx.cluster.queue.ids() {
            let res = match ctx.cluster.queue.get(id) {
                Some(job) => job.res,
                None => continue,
            };
            let free = ctx.cluster.pool.list_free();
            if free.len() < res {
                debug!(job.id = id, job.res = res, free = free.len(), "head of queue blocked");
                break;
            }
            let chosen = free.into_iter().take(res).collect();
            if ctx.allocate(id, chosen).is_err() {
                break;
            }
            started += 1;
        }
        started
    }
}

impl Scheduler for Fcfs {
    #[instrument(
        level = "debug",
        skip(self, ctx),
        fields(now = %ctx.now, queue.len = ctx.cluster.queue.len())
    )]
    fn schedule(&mut self, ctx: &mut Context<'_>) -> usize {
        Self::start_in_order(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedulers::tests::{assert_no_oversubscription, cluster_with, round, submit};
    use crate::types::Time;

    #[test]
    fn starts_in_arrival_order() {
        let mut cluster = cluster_with(&[None, None, None, None]);
        submit(&mut cluster, 0, 2, 0.0, None);
        submit(&mut cluster, 1, 1, 1.0, Some(3.0));

        let engine = round(&mut Fcfs, &mut cluster, 1.0);
        assert_eq!(
            engine.started,
            vec![(Time(1.0), 0, vec![0, 1]), (Time(1.0), 1, vec![2])]
        );
        assert!(cluster.queue().is_empty());
        assert_no_oversubscription(&cluster);
    }

    #[test]
    fn head_of_line_blocking() {
        let mut cluster = cluster_with(&[Some(Time(10.0)), None, None]);
        submit(&mut cluster, 0, 3, 0.0, None);
        submit(&mut cluster, 1, 1, 1.0, Some(1.0));

        // job 1 would fit but must wait behind job 0
        let engine = round(&mut Fcfs, &mut cluster, 2.0);
        assert!(engine.started.is_empty());
        assert_eq!(cluster.queue().ids(), vec![0, 1]);
    }

    #[test]
    fn stops_at_first_blocked_job() {
        let mut cluster = cluster_with(&[None, None, None]);
        submit(&mut cluster, 0, 1, 0.0, None);
        submit(&mut cluster, 1, 3, 1.0, None);
        submit(&mut cluster, 2, 1, 2.0, None);

        let engine = round(&mut Fcfs, &mut cluster, 2.0);
        assert_eq!(engine.started, vec![(Time(2.0), 0, vec![0])]);
        assert_eq!(cluster.queue().ids(), vec![1, 2]);
    }

    #[test]
    fn idempotent_round() {
        let mut cluster = cluster_with(&[None, Some(Time(4.0)), None]);
        submit(&mut cluster, 0, 1, 0.0, None);
        submit(&mut cluster, 1, 2, 0.0, None);

        assert_eq!(round(&mut Fcfs, &mut cluster, 1.0).started.len(), 1);
        assert!(round(&mut Fcfs, &mut cluster, 1.0).started.is_empty());
    }

    #[test]
    fn oversized_job_stays_queued() {
        let mut cluster = cluster_with(&[None]);
        // bypass admission to hand the policy an unschedulable job
        cluster.queue.push(crate::types::Job::new(0, 2, Time(0.0), None));

        assert!(round(&mut Fcfs, &mut cluster, 0.0).started.is_empty());
        assert!(round(&mut Fcfs, &mut cluster, 5.0).started.is_empty());
        assert_eq!(cluster.queue().ids(), vec![0]);
    }
}
