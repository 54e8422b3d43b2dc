//! ioprobe CLI entry point

use anyhow::Result;
use clap::CommandFactory;
use ioprobe::config::{cli::Cli, validator, Config, ConfigError};
use ioprobe::coordinator::Coordinator;
use ioprobe::output::text;

fn main() {
    let cli = Cli::parse_args();

    match run(cli) {
        Ok(()) => {}
        Err(err) => {
            eprintln!("ioprobe: {:#}", err);
            std::process::exit(1);
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    // Flag resolution and validation happen before any device is opened
    // for I/O; the size probe only runs when -e was left unset.
    let mut config = match Config::from_cli(&cli) {
        Ok(config) => config,
        Err(err) => usage_error(err),
    };
    if let Err(err) = validator::resolve_and_validate(&mut config) {
        usage_error(err);
    }

    if config.verbosity >= 1 {
        text::print_config(&config);
    }

    let coordinator = Coordinator::new(config.clone())?;
    let run = coordinator.run()?;

    text::print_report(&config, &run);
    Ok(())
}

fn usage_error(err: ConfigError) -> ! {
    eprintln!("Error: {}", err);
    eprintln!("{}", Cli::command().render_usage());
    std::process::exit(1);
}
