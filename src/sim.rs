use serde::{Deserialize, Serialize};

use crate::cluster::Cluster;
use crate::resources::ResourcePool;
use crate::schedulers::{Context, Policy, Scheduler};
use crate::types::{JobSpec, JobStatus, Time};
use crate::utils::prelude::*;

mod engine;
mod event;

pub use engine::SimEngine;
pub use event::{Event, EventKind, EventQueue};

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub enum EndCondition {
    /// run until nothing is left to happen
    NoEvents,
    /// stop before the first event later than this
    Time(Time),
}

/// Drives the scheduling core from a queue of timestamped events.
///
/// All events of an instant are delivered first, then the policy gets exactly
/// one round.
pub struct Simulation {
    time: Time,
    cluster: Cluster,
    policy: Policy,
    engine: SimEngine,
    processed: Vec<Event>,
    rounds: usize,
}

impl Simulation {
    pub fn new(pool: ResourcePool, policy: Policy, workload: impl IntoIterator<Item = JobSpec>) -> Self {
        let mut future = EventQueue::new();
        for spec in workload {
            future.push(spec.submit, EventKind::JobSubmitted(spec));
        }
        Self::with_queue(pool, policy, future)
    }

    /// Replay the submissions of a recorded run.
    ///
    /// Everything else is produced again by the engine.
    pub fn from_events(pool: ResourcePool, policy: Policy, events: impl IntoIterator<Item = Event>) -> Self {
        let submissions = events
            .into_iter()
            .filter(|e| matches!(e.kind, EventKind::JobSubmitted(_)));
        Self::with_queue(pool, policy, EventQueue::from_events(submissions))
    }

    fn with_queue(pool: ResourcePool, policy: Policy, future: EventQueue) -> Self {
        Self {
            time: Time(0.0),
            cluster: Cluster::new(pool),
            policy,
            engine: SimEngine::new(future),
            processed: vec![],
            rounds: 0,
        }
    }

    /// Process the next instant. Returns false once there is nothing left.
    pub fn step(&mut self) -> bool {
        let events = self.engine.future.pop_instant();
        let time = match events.first() {
            Some(e) => e.time,
            None => return false,
        };
        debug_assert!(time >= self.time, "simulated time must not go backwards");
        self.time = time;

        for event in events {
            info!(time = %self.time, %event, "handling event");
            self.handle(&event);
            self.processed.push(event);
        }

        let _g = debug_span!("round", n = self.rounds, time = %self.time).entered();
        let mut ctx = Context::new(self.time, &mut self.cluster, &mut self.engine);
        let started = self.policy.schedule(&mut ctx);
        self.rounds += 1;
        debug!(
            started,
            queued = self.cluster.nb_queued(),
            running = self.cluster.nb_running(),
            "round done"
        );

        let notifications = self.engine.drain_notifications();
        self.processed.extend(notifications);
        true
    }

    fn handle(&mut self, event: &Event) {
        match &event.kind {
            EventKind::JobSubmitted(spec) => {
                self.engine.admit(spec.id, spec.runtime);
                let job = spec.clone().into_job(self.time);
                if let Err(err) = self.cluster.submit(job) {
                    warn!(job.id = spec.id, %err, "rejecting job");
                    self.engine
                        .notify(self.time, EventKind::JobRejected { job: spec.id });
                }
            }
            EventKind::JobCompleted { job } => {
                self.cluster.finish(*job, self.time, JobStatus::Completed);
            }
            EventKind::JobKilled { job } => {
                self.cluster.finish(*job, self.time, JobStatus::Killed);
            }
            EventKind::JobStarted { .. } | EventKind::JobRejected { .. } => {}
        }
    }

    fn is_end(&self, until: &EndCondition) -> bool {
        match (self.engine.future.peek_time(), until) {
            (None, _) => true,
            (Some(next), EndCondition::Time(t)) => next > *t,
            (Some(_), EndCondition::NoEvents) => false,
        }
    }

    pub fn run(&mut self, until: EndCondition) {
        let _g = info_span!("run").entered();
        while !self.is_end(&until) {
            self.step();
        }
        info!(
            time = %self.time,
            rounds = self.rounds,
            completed = self.cluster.nb_completed(),
            killed = self.cluster.nb_killed(),
            rejected = self.cluster.rejected().len(),
            queued = self.cluster.nb_queued(),
            running = self.cluster.nb_running(),
            "simulation ended"
        );
    }

    pub fn time(&self) -> Time {
        self.time
    }

    pub fn cluster(&self) -> &Cluster {
        &self.cluster
    }

    pub fn rounds(&self) -> usize {
        self.rounds
    }

    pub fn processed_events(&self) -> &[Event] {
        &self.processed
    }

    pub fn pending_events(&self) -> usize {
        self.engine.future.len()
    }
}
