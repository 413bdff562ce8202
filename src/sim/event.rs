use std::cmp::Reverse;
use std::collections::BinaryHeap;

use educe::Educe;
use parse_display::Display;
use serde::{Deserialize, Serialize};

use crate::types::{JobId, JobSpec, ResourceId, Time};

/// What happened
#[derive(Debug, Clone, PartialEq, Display, Serialize, Deserialize)]
pub enum EventKind {
    #[display("JobSubmitted({0})")]
    JobSubmitted(JobSpec),
    #[display("JobCompleted({job})")]
    JobCompleted { job: JobId },
    #[display("JobKilled({job})")]
    JobKilled { job: JobId },
    /// notification only, the engine started a job
    #[display("JobStarted({job})")]
    JobStarted { job: JobId, resources: Vec<ResourceId> },
    /// notification only, a job was refused at submission
    #[display("JobRejected({job})")]
    JobRejected { job: JobId },
}

impl EventKind {
    /// Notifications are recorded in the log but never delivered to the scheduler
    pub fn is_notification(&self) -> bool {
        matches!(self, EventKind::JobStarted { .. } | EventKind::JobRejected { .. })
    }
}

/// A timestamped event. Events at the same instant keep their insertion order.
#[derive(Debug, Clone, Display, Educe, Serialize, Deserialize)]
#[educe(PartialEq, Eq, PartialOrd, Ord)]
#[display("@{time:.2} -> {kind}")]
pub struct Event {
    pub time: Time,
    pub seq: u64,
    #[educe(PartialEq(ignore))]
    #[educe(PartialOrd(ignore))]
    #[educe(Ord(ignore))]
    pub kind: EventKind,
}

/// Future events, earliest first
#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    heap: BinaryHeap<Reverse<Event>>,
    next_seq: u64,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a queue from recorded events, keeping their relative order
    pub fn from_events(events: impl IntoIterator<Item = Event>) -> Self {
        let mut events: Vec<_> = events.into_iter().collect();
        events.sort();
        let mut queue = Self::new();
        for event in events {
            queue.push(event.time, event.kind);
        }
        queue
    }

    /// Give `kind` a place in the global order without queuing it
    pub fn stamp(&mut self, time: Time, kind: EventKind) -> Event {
        let seq = self.next_seq;
        self.next_seq += 1;
        Event { time, seq, kind }
    }

    pub fn push(&mut self, time: Time, kind: EventKind) {
        let event = self.stamp(time, kind);
        self.heap.push(Reverse(event));
    }

    pub fn peek_time(&self) -> Option<Time> {
        self.heap.peek().map(|Reverse(e)| e.time)
    }

    /// Every event of the earliest pending instant
    pub fn pop_instant(&mut self) -> Vec<Event> {
        let time = match self.peek_time() {
            Some(t) => t,
            None => return vec![],
        };
        let mut events = vec![];
        while self.peek_time() == Some(time) {
            if let Some(Reverse(event)) = self.heap.pop() {
                events.push(event);
            }
        }
        events
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
