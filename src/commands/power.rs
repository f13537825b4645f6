//! Reset and power-down commands

use crate::error::CliError;
use crate::session::Session;

/// Run the reset command
pub fn run_reset(session: &mut Session, force: bool) -> Result<(), CliError> {
    if force {
        session.flash.reset_force()?;
    } else {
        session.flash.reset()?;
    }
    println!("Flash reset");
    Ok(())
}

/// Run the power-down command
pub fn run_power_down(session: &mut Session) -> Result<(), CliError> {
    session.flash.power_down()?;
    println!("Flash in deep power-down");
    Ok(())
}
