use std::path::PathBuf;

use structopt::StructOpt;

use crate::commands::{self, Cmd};
use easysim::utils::Result;

#[derive(StructOpt)]
#[structopt(about)]
pub struct Cli {
    /// Set a custom config file
    #[structopt(short, long, parse(from_os_str), value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Apply a preset from the `presets` section of the config
    #[structopt(short, long, value_name = "NAME")]
    pub preset: Option<String>,

    #[structopt(subcommand)]
    pub cmd: Command,
}

#[derive(StructOpt)]
pub enum Command {
    Run(commands::Run),
    Config(commands::Config),
}

impl Cli {
    pub fn execute(self) -> Result<()> {
        match self.cmd {
            Command::Run(cmd) => cmd.run(),
            Command::Config(cmd) => cmd.run(),
        }
    }
}
