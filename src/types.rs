use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, AddAssign, Deref, Sub};

use parse_display::Display;
use serde::{Deserialize, Serialize};

pub type JobId = usize;
pub type ResourceId = usize;

/// A time point in simulation
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Time(pub f64);

/// A duration of time in simulation
#[derive(Debug, Clone, Copy, Default, PartialOrd, PartialEq, Serialize, Deserialize)]
pub struct Duration(pub f64);

impl Time {
    /// A release time that is never reached
    pub const INFINITY: Time = Time(f64::INFINITY);

    pub fn is_finite(&self) -> bool {
        self.0.is_finite()
    }
}

// events are kept in a heap, so time needs a total order
impl PartialEq for Time {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Time {}

impl PartialOrd for Time {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Time {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl From<f64> for Time {
    fn from(t: f64) -> Self {
        Time(t)
    }
}

impl Deref for Duration {
    type Target = f64;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Add<Duration> for Time {
    type Output = Time;

    fn add(self, rhs: Duration) -> Self::Output {
        Time(self.0 + rhs.0)
    }
}

impl AddAssign<Duration> for Time {
    fn add_assign(&mut self, rhs: Duration) {
        self.0 += rhs.0;
    }
}

impl Sub for Time {
    type Output = Duration;

    fn sub(self, rhs: Self) -> Self::Output {
        Duration(self.0 - rhs.0)
    }
}

/// Lifecycle of a job inside the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[display(style = "snake_case")]
pub enum JobStatus {
    Submitted,
    Queued,
    Allocated,
    Running,
    Completed,
    Killed,
    Rejected,
}

impl JobStatus {
    pub fn is_finished(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Killed | JobStatus::Rejected)
    }
}

/// A workload entry, not yet submitted to the system.
///
/// `runtime` is the actual execution length, only known to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSpec {
    pub id: JobId,
    pub submit: Time,
    pub res: usize,
    #[serde(default)]
    pub walltime: Option<Duration>,
    pub runtime: Duration,
}

impl fmt::Display for JobSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.walltime {
            Some(w) => write!(f, "JobSpec({}, res={}, {:.2}<{:.2})", self.id, self.res, self.runtime, w),
            None => write!(f, "JobSpec({}, res={}, {:.2}<None)", self.id, self.res, self.runtime),
        }
    }
}

impl JobSpec {
    pub fn into_job(self, submitted: Time) -> Job {
        Job::new(self.id, self.res, submitted, self.walltime)
    }
}

/// A job accepted by the system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    /// number of resource units required
    pub res: usize,
    pub submitted: Time,
    /// declared upper bound on run time, `None` means unbounded
    pub walltime: Option<Duration>,
    pub status: JobStatus,
    pub start: Option<Time>,
    pub finish: Option<Time>,
}

impl Job {
    pub fn new(id: JobId, res: usize, submitted: Time, walltime: Option<Duration>) -> Self {
        Self {
            id,
            res,
            submitted,
            walltime,
            status: JobStatus::Submitted,
            start: None,
            finish: None,
        }
    }

    /// The instant this job is guaranteed to have released its resources, if started at `start`
    pub fn expected_end(&self, start: Time) -> Time {
        self.walltime.map(|w| start + w).unwrap_or(Time::INFINITY)
    }

    /// Whether this job, started at `now`, finishes no later than `deadline`
    pub fn fits_before(&self, now: Time, deadline: Time) -> bool {
        self.walltime.map(|w| now + w <= deadline).unwrap_or(false)
    }

    pub fn waiting_time(&self) -> Option<Duration> {
        self.start.map(|s| s - self.submitted)
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.walltime {
            Some(w) => write!(f, "Job({}, res={}, @{:.2}<{:.2})", self.id, self.res, self.submitted, w),
            None => write!(f, "Job({}, res={}, @{:.2}<None)", self.id, self.res, self.submitted),
        }
    }
}
