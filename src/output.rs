use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};

use itertools::Itertools;
use serde::Serialize;

use crate::cluster::Cluster;
use crate::sim::{Event, EventKind};
use crate::types::{Job, JobId, ResourceId, Time};
use crate::utils::prelude::*;

/// One line of the job trace
#[derive(Debug, Serialize)]
struct JobRecord {
    id: JobId,
    res: usize,
    submit: f64,
    walltime: Option<f64>,
    start: Option<f64>,
    finish: Option<f64>,
    status: String,
    waiting: Option<f64>,
    resources: String,
}

impl JobRecord {
    fn new(job: &Job, resources: &[usize]) -> Self {
        Self {
            id: job.id,
            res: job.res,
            submit: job.submitted.0,
            walltime: job.walltime.map(|w| w.0),
            start: job.start.map(|t| t.0),
            finish: job.finish.map(|t| t.0),
            status: job.status.to_string(),
            waiting: job.waiting_time().map(|w| w.0),
            resources: resources.iter().join(" "),
        }
    }
}

/// Finished and rejected jobs, ordered by id
pub fn write_job_trace(writer: impl io::Write, cluster: &Cluster, events: &[Event]) -> Result<()> {
    let started: HashMap<JobId, &[ResourceId]> = events
        .iter()
        .filter_map(|e| match &e.kind {
            EventKind::JobStarted { job, resources } => Some((*job, resources.as_slice())),
            _ => None,
        })
        .collect();

    let mut wtr = csv::Writer::from_writer(writer);
    for job in cluster
        .finished()
        .iter()
        .chain(cluster.rejected())
        .sorted_by_key(|j| j.id)
    {
        let resources = started.get(&job.id).copied().unwrap_or_default();
        wtr.serialize(JobRecord::new(job, resources))?;
    }
    wtr.flush()?;
    Ok(())
}

/// One processed event per line
pub fn write_event_log(mut writer: impl io::Write, events: &[Event]) -> Result<()> {
    for event in events {
        serde_json::to_writer(&mut writer, event)?;
        writer.write_all(b"\n")?;
    }
    Ok(())
}

/// Headline numbers of a run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub completed: usize,
    pub killed: usize,
    pub rejected: usize,
    pub unfinished: usize,
    pub makespan: f64,
    pub mean_waiting: f64,
}

impl Summary {
    pub fn new(cluster: &Cluster) -> Self {
        let finished = cluster.finished();
        let makespan = finished
            .iter()
            .filter_map(|j| j.finish)
            .max()
            .unwrap_or(Time(0.0));
        let waits = finished.iter().filter_map(|j| j.waiting_time()).map(|w| w.0).collect_vec();
        let mean_waiting = if waits.is_empty() {
            0.0
        } else {
            waits.iter().sum::<f64>() / waits.len() as f64
        };
        Self {
            completed: cluster.nb_completed(),
            killed: cluster.nb_killed(),
            rejected: cluster.rejected().len(),
            unfinished: cluster.nb_queued() + cluster.nb_running(),
            makespan: makespan.0,
            mean_waiting,
        }
    }
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "jobs completed: {}", self.completed)?;
        writeln!(f, "jobs killed: {}", self.killed)?;
        writeln!(f, "jobs rejected: {}", self.rejected)?;
        writeln!(f, "jobs unfinished: {}", self.unfinished)?;
        writeln!(f, "makespan: {:.2}", self.makespan)?;
        write!(f, "mean waiting time: {:.2}", self.mean_waiting)
    }
}

/// Write `jobs.csv` and `events.jsonl` under the configured output dir
pub fn render(cluster: &Cluster, events: &[Event]) -> Result<()> {
    let dir = config().output_dir()?;

    let path = dir.file("jobs.csv")?;
    write_job_trace(BufWriter::new(File::create(&path)?), cluster, events)?;
    info!(path = %path.display(), "job trace written");

    let path = dir.file("events.jsonl")?;
    let mut file = BufWriter::new(File::create(&path)?);
    write_event_log(&mut file, events)?;
    file.flush()?;
    info!(path = %path.display(), "event log written");
    Ok(())
}
