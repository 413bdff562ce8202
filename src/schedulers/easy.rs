use std::collections::BTreeSet;

use super::{Context, Fcfs, Scheduler};
use crate::agenda::Agenda;
use crate::types::{JobId, ResourceId, Time};
use crate::utils::prelude::*;

/// FCFS followed by EASY backfilling.
///
/// After the FCFS pass, the job at the head of the queue (the priority job)
/// gets a reservation: the units that are guaranteed free by the earliest
/// instant it can start. Later jobs may jump ahead only if they leave that
/// reservation untouched, or if their walltime guarantees they are gone by
/// then.
#[derive(Debug, Clone, Copy, Default)]
pub struct EasyBackfilling;

/// The priority job's protected start
#[derive(Debug, Clone, PartialEq)]
struct Reservation {
    job: JobId,
    start: Time,
    resources: BTreeSet<ResourceId>,
}

/// Why a candidate was or was not backfilled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Backfill {
    /// fits on units outside the reservation
    Unreserved,
    /// done before the priority job starts, may use reserved units
    BeforeReservation,
    /// no walltime, so its end can not be bounded
    Unbounded,
    NoRoom,
}

impl EasyBackfilling {
    /// Compute the priority job's start time and reserve units for it.
    ///
    /// `None` when the start can not be estimated, either because too few units
    /// ever have a finite release or the job is bigger than the platform.
    fn reserve(ctx: &mut Context<'_>, job: JobId, res: usize) -> Option<Reservation> {
        let agenda = Agenda::project(ctx.now, &ctx.cluster.pool);
        let start = agenda.start_time_for(res)?;
        let resources = agenda.reservation_for(res, start);
        ctx.cluster.pool.reserve(job, &resources);
        Some(Reservation {
            job,
            start,
            resources: resources.into_iter().collect(),
        })
    }

    /// Pick units for a candidate job, or say why it has to wait
    fn choose(ctx: &Context<'_>, reservation: Option<&Reservation>, id: JobId) -> (Backfill, Vec<ResourceId>) {
        let job = match ctx.cluster.queue.get(id) {
            Some(job) => job,
            None => return (Backfill::NoRoom, vec![]),
        };
        let pool = &ctx.cluster.pool;

        let unreserved = pool.list_free();
        if unreserved.len() >= job.res {
            return (Backfill::Unreserved, unreserved.into_iter().take(job.res).collect());
        }

        let start = match reservation {
            Some(r) => r.start,
            None => return (Backfill::NoRoom, vec![]),
        };
        if job.walltime.is_none() {
            return (Backfill::Unbounded, vec![]);
        }
        if !job.fits_before(ctx.now, start) {
            return (Backfill::NoRoom, vec![]);
        }
        // any idle unit will do. Idle units all release now and the reservation
        // takes the last of them, so the lowest ids are the unreserved ones.
        let idle = pool.list_idle();
        if idle.len() < job.res {
            return (Backfill::NoRoom, vec![]);
        }
        (Backfill::BeforeReservation, idle.into_iter().take(job.res).collect())
    }

    fn backfill(ctx: &mut Context<'_>) -> usize {
        let mut queued = ctx.cluster.queue.ids().into_iter();
        let p_job = match queued.next().and_then(|id| ctx.cluster.queue.get(id)) {
            Some(job) => job.clone(),
            None => return 0,
        };

        let reservation = Self::reserve(ctx, p_job.id, p_job.res);
        match &reservation {
            Some(r) => debug!(
                p_job.id = r.job,
                p_job.res,
                p_start = %r.start,
                reserved = ?r.resources,
                "reservation for priority job"
            ),
            None => debug!(p_job.id, p_job.res, "priority job start can not be estimated"),
        }

        let mut started = 0;
        for id in queued {
            let (decision, chosen) = Self::choose(ctx, reservation.as_ref(), id);
            match decision {
                Backfill::Unreserved | Backfill::BeforeReservation => {
                    debug!(job.id = id, ?decision, resources = ?chosen, "backfilling");
                    if ctx.allocate(id, chosen).is_ok() {
                        started += 1;
                    }
                }
                Backfill::Unbounded => {
                    info!(job.id = id, "no walltime, can not backfill onto reserved resources");
                }
                Backfill::NoRoom => {}
            }
        }

        // reservations never outlive the round
        ctx.cluster.pool.clear_reservations();
        started
    }
}

impl Scheduler for EasyBackfilling {
    #[instrument(
        level = "debug",
        skip(self, ctx),
        fields(now = %ctx.now, queue.len = ctx.cluster.queue.len())
    )]
    fn schedule(&mut self, ctx: &mut Context<'_>) -> usize {
        let mut started = Fcfs::start_in_order(ctx);
        if ctx.cluster.queue.len() >= 2 {
            started += Self::backfill(ctx);
        }
        started
    }
}
