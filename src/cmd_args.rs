use clap::Parser;
use clap_complete::Shell;

/// run a stimulus through a grid of fixed-point processing elements
#[derive(Parser, Debug)]
#[clap(author, version, about)]
pub struct Args {
    /// extra config files, applied on top of configs/default.toml
    pub config_names: Vec<String>,

    /// more output: -v for debug, -vv for the per-cycle trace
    #[clap(short, long, parse(from_occurrences))]
    pub verbose: u8,

    /// print the shell completion script and exit
    #[clap(long = "generate", arg_enum)]
    pub generator: Option<Shell>,
}

impl Args {
    pub fn log_level(&self) -> log::Level {
        match self.verbose {
            0 => log::Level::Info,
            1 => log::Level::Debug,
            _ => log::Level::Trace,
        }
    }
}
