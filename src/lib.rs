use rand_seeder::{Seeder, SipRng};

use crate::utils::prelude::*;

pub mod agenda;
pub mod allocator;
pub mod cluster;
pub mod output;
pub mod queue;
pub mod resources;
pub mod schedulers;
pub mod sim;
pub mod types;
pub mod utils;
pub mod workload;

pub use crate::output::Summary;
pub use crate::sim::{EndCondition, Simulation};

/// The `sim` section of the config
#[derive(Debug, Clone, serde::Deserialize, serde::Serialize)]
pub struct SimConfig {
    seed: Option<String>,
    until: EndCondition,
    policy: schedulers::PolicyConfig,
    platform: resources::PlatformConfig,
    workload: workload::WorkloadConfig,
}

/// Run the configured simulation end-to-end and write its outputs
pub fn run_sim() -> Result<Summary> {
    let _g = info_span!("sim").entered();

    let cfg: SimConfig = config().get("sim")?;
    let mut sim = {
        let _g = info_span!("setup").entered();

        let rng: SipRng = Seeder::from(cfg.seed.as_deref().unwrap_or("stripy zebra")).make_rng();
        let jobs = workload::from_config(rng, &cfg.workload)?;
        let pool = resources::from_config(&cfg.platform);
        let policy = schedulers::from_config(&cfg.policy);
        Simulation::new(pool, policy, jobs)
    };
    sim.run(cfg.until);

    {
        let _g = info_span!("output").entered();
        output::render(sim.cluster(), sim.processed_events())?;
    }

    Ok(Summary::new(sim.cluster()))
}
