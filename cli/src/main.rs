mod cli;
mod commands;

use cli::{Cli, Commands};
use commands::{polygonize, run};
use env_logger::{Env, TimestampPrecision};

fn init_logger(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(level))
        .format_timestamp(Some(TimestampPrecision::Millis))
        .init();
}

pub fn run() -> anyhow::Result<()> {
    use clap::Parser;

    let cli = Cli::parse();
    init_logger(cli.verbose);
    match &cli.command {
        Commands::Run(args) => run::run(&cli, args),
        Commands::Polygonize(args) => polygonize::run(&cli, args),
    }
}

fn main() -> anyhow::Result<()> { run() }
