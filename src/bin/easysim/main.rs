use structopt::StructOpt;

use easysim::utils::{self, prelude::*};

mod cli;
mod commands;

fn main() -> Result<()> {
    // panic setup should be done early
    utils::panic::setup();

    let cli = cli::Cli::from_args();
    utils::app_config::setup(cli.config.as_deref(), cli.preset.as_deref())?;

    // every subcommand prints its result to stdout
    let _guard = utils::logging::setup(true)?;
    trace!("Start cli execution");

    cli.execute()
}
