use structopt::StructOpt;

use easysim::utils::prelude::*;
use easysim::SimConfig;

/// Should be implemented by individual subcommand
pub trait Cmd {
    fn run(self) -> Result<()>;
}

/// Show the merged `sim` configuration
#[derive(StructOpt)]
pub struct Config {}

impl Cmd for Config {
    fn run(self) -> Result<()> {
        let cfg: SimConfig = config().get("sim")?;
        print!("{}", serde_yaml::to_string(&cfg)?);
        Ok(())
    }
}

/// Run simulation end-to-end
#[derive(StructOpt)]
pub struct Run {}

impl Cmd for Run {
    fn run(self) -> Result<()> {
        let summary = easysim::run_sim()?;
        println!("{}", summary);
        Ok(())
    }
}
