//! heepflash - W25Q128JW flash tool for X-HEEP
//!
//! Drives the real `heepflash-core` driver against the simulated X-HEEP
//! SPI host from `heepflash-sim`, with the flash contents kept in an image
//! file between invocations.
//!
//! # Architecture
//!
//! Every command opens a [`session::Session`]: the image is loaded into
//! the flash model, the driver is initialised exactly as on hardware
//! (SPI host selection, clock divider, power-up, quad enable), the command
//! runs, and mutating commands write the image back.

mod cli;
mod commands;
mod error;
mod session;

use clap::Parser;
use cli::{Cli, Commands};
use error::CliError;
use session::Session;
use std::process::ExitCode;

fn main() -> ExitCode {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

fn run(cli: &Cli) -> Result<(), CliError> {
    let mut session = Session::open(cli)?;

    match &cli.command {
        Commands::Info => commands::run_info(&mut session, cli.core_hz)?,
        Commands::Read {
            output,
            start,
            length,
            transfer,
        } => commands::run_read(&mut session, output, *start, *length, *transfer)?,
        Commands::Write {
            input,
            start,
            transfer,
            no_erase,
            no_verify,
        } => commands::run_write(
            &mut session,
            input,
            *start,
            *transfer,
            *no_erase,
            *no_verify,
        )?,
        Commands::Erase {
            chip: _,
            start,
            length,
        } => {
            let region = start.zip(*length);
            commands::run_erase(&mut session, region)?
        }
        Commands::Verify { input, start, quad } => {
            commands::run_verify(&mut session, input, *start, *quad)?
        }
        Commands::Reset { force } => commands::run_reset(&mut session, *force)?,
        Commands::PowerDown => commands::run_power_down(&mut session)?,
    }

    session.finish();
    Ok(())
}
