use std::collections::HashSet;

use rand::Rng;
use statrs::distribution::Exp;

use crate::types::{Duration, JobSpec, Time};
use crate::utils::prelude::*;

#[derive(Debug, Clone, serde::Deserialize, serde::Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WorkloadConfig {
    /// jobs listed one by one
    Static { jobs: Vec<JobSpec> },
    /// Poisson arrivals with uniformly drawn demand and run length
    Random {
        n_jobs: usize,
        /// mean number of arrivals per time unit
        arrival_rate: f64,
        max_res: usize,
        min_runtime: f64,
        max_runtime: f64,
        /// walltime = runtime * factor
        #[serde(default = "default_walltime_factor")]
        walltime_factor: f64,
        /// share of jobs declaring no walltime at all
        #[serde(default)]
        unbounded_ratio: f64,
    },
}

fn default_walltime_factor() -> f64 {
    1.5
}

/// Build the submission list, ordered by submission time
pub fn from_config(mut rng: impl Rng, cfg: &WorkloadConfig) -> Result<Vec<JobSpec>> {
    let mut jobs = match cfg {
        WorkloadConfig::Static { jobs } => jobs.clone(),
        WorkloadConfig::Random {
            n_jobs,
            arrival_rate,
            max_res,
            min_runtime,
            max_runtime,
            walltime_factor,
            unbounded_ratio,
        } => {
            let bounds_ok = min_runtime.is_finite()
                && max_runtime.is_finite()
                && *min_runtime >= 0.0
                && min_runtime <= max_runtime
                && walltime_factor.is_finite()
                && *walltime_factor >= 0.0;
            if *max_res == 0 || !bounds_ok || !(0.0..=1.0).contains(unbounded_ratio) {
                return Err(anyhow::anyhow!("invalid random workload: {:?}", cfg).into());
            }
            let inter_arrival = Exp::new(*arrival_rate).map_err(|e| anyhow::anyhow!("arrival_rate: {}", e))?;
            let mut now = 0.0;
            (0..*n_jobs)
                .map(|id| {
                    now += rng.sample(&inter_arrival);
                    let runtime = rng.gen_range(*min_runtime..=*max_runtime);
                    let walltime = if rng.gen_bool(*unbounded_ratio) {
                        None
                    } else {
                        Some(Duration(runtime * walltime_factor))
                    };
                    JobSpec {
                        id,
                        submit: Time(now),
                        res: rng.gen_range(1..=*max_res),
                        walltime,
                        runtime: Duration(runtime),
                    }
                })
                .collect()
        }
    };
    validate(&jobs)?;
    jobs.sort_by_key(|j| j.submit);
    info!(jobs.len = jobs.len(), "workload ready");
    Ok(jobs)
}

/// Every time field is a finite non-negative number and ids are unique
fn validate(jobs: &[JobSpec]) -> Result<()> {
    let mut seen = HashSet::new();
    for job in jobs {
        if !seen.insert(job.id) {
            return Err(anyhow::anyhow!("duplicate job id {}", job.id).into());
        }
        let times = [Some(job.submit.0), Some(job.runtime.0), job.walltime.map(|w| w.0)];
        if times.iter().flatten().any(|t| !t.is_finite() || *t < 0.0) {
            return Err(anyhow::anyhow!("job {} has a negative or non-finite time: {}", job.id, job).into());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_seeder::{Seeder, SipRng};

    fn random(unbounded_ratio: f64) -> WorkloadConfig {
        WorkloadConfig::Random {
            n_jobs: 50,
            arrival_rate: 0.5,
            max_res: 4,
            min_runtime: 1.0,
            max_runtime: 10.0,
            walltime_factor: 2.0,
            unbounded_ratio,
        }
    }

    #[test]
    fn random_is_seeded() {
        let a = from_config(Seeder::from("seed").make_rng::<SipRng>(), &random(0.2)).unwrap();
        let b = from_config(Seeder::from("seed").make_rng::<SipRng>(), &random(0.2)).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 50);
        assert!(a.windows(2).all(|w| w[0].submit <= w[1].submit));
        assert!(a.iter().all(|j| j.res >= 1 && j.res <= 4));
        assert!(a
            .iter()
            .filter_map(|j| j.walltime.map(|w| (w, j.runtime)))
            .all(|(w, r)| *w >= *r));
    }

    #[test]
    fn random_without_walltimes() {
        let jobs = from_config(Seeder::from("x").make_rng::<SipRng>(), &random(1.0)).unwrap();
        assert!(jobs.iter().all(|j| j.walltime.is_none()));
    }

    #[test]
    fn rejects_bad_config() {
        let rng = Seeder::from("x").make_rng::<SipRng>();
        assert!(from_config(rng, &random(2.0)).is_err());
    }

    fn static_jobs(jobs: &str) -> Result<Vec<JobSpec>> {
        let cfg: WorkloadConfig = serde_yaml::from_str(&format!("type: static\njobs:\n{}", jobs)).unwrap();
        from_config(Seeder::from("x").make_rng::<SipRng>(), &cfg)
    }

    #[test]
    fn rejects_negative_times() {
        assert!(static_jobs("  - { id: 0, submit: 5.0, res: 1, runtime: -3.0 }").is_err());
        assert!(static_jobs("  - { id: 0, submit: -1.0, res: 1, runtime: 3.0 }").is_err());
        assert!(static_jobs("  - { id: 0, submit: 0.0, res: 1, walltime: -1.0, runtime: 3.0 }").is_err());
        assert!(static_jobs("  - { id: 0, submit: 0.0, res: 1, walltime: 0.0, runtime: 0.0 }").is_ok());
    }

    #[test]
    fn rejects_non_finite_times() {
        assert!(static_jobs("  - { id: 0, submit: 0.0, res: 1, runtime: .nan }").is_err());
        assert!(static_jobs("  - { id: 0, submit: .inf, res: 1, runtime: 1.0 }").is_err());
        assert!(static_jobs("  - { id: 0, submit: 0.0, res: 1, walltime: .inf, runtime: 1.0 }").is_err());
    }

    #[test]
    fn rejects_duplicate_ids() {
        let err = static_jobs(
            "  - { id: 0, submit: 0.0, res: 1, walltime: 5.0, runtime: 5.0 }\n  - { id: 0, submit: 0.0, res: 1, walltime: 5.0, runtime: 1.0 }",
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate job id 0"));
    }

    #[test]
    fn rejects_bad_runtime_bounds() {
        let with_bounds = |min_runtime: f64, max_runtime: f64| WorkloadConfig::Random {
            n_jobs: 5,
            arrival_rate: 1.0,
            max_res: 2,
            min_runtime,
            max_runtime,
            walltime_factor: 1.0,
            unbounded_ratio: 0.0,
        };
        let rng = || Seeder::from("x").make_rng::<SipRng>();
        assert!(from_config(rng(), &with_bounds(-1.0, 2.0)).is_err());
        assert!(from_config(rng(), &with_bounds(f64::NAN, f64::NAN)).is_err());
        assert!(from_config(rng(), &with_bounds(1.0, f64::INFINITY)).is_err());
        assert!(from_config(rng(), &with_bounds(3.0, 2.0)).is_err());
        assert!(from_config(rng(), &with_bounds(0.0, 2.0)).is_ok());
    }

    #[test]
    fn static_is_sorted() {
        let cfg: WorkloadConfig = serde_yaml::from_str(
            r#"
type: static
jobs:
  - { id: 0, submit: 5.0, res: 1, runtime: 1.0 }
  - { id: 1, submit: 0.0, res: 2, walltime: 3.0, runtime: 2.0 }
"#,
        )
        .unwrap();
        let jobs = from_config(Seeder::from("x").make_rng::<SipRng>(), &cfg).unwrap();
        assert_eq!(jobs.iter().map(|j| j.id).collect::<Vec<_>>(), vec![1, 0]);
        assert_eq!(jobs[0].walltime, Some(Duration(3.0)));
        assert_eq!(jobs[1].walltime, None);
    }
}
