//! Erase command implementation

use crate::error::CliError;
use crate::session::Session;
use indicatif::ProgressBar;
use std::time::Duration;

/// Run the erase command
///
/// Without a region the whole chip is erased.
pub fn run_erase(session: &mut Session, region: Option<(u32, u32)>) -> Result<(), CliError> {
    let spinner = ProgressBar::new_spinner();
    spinner.enable_steady_tick(Duration::from_millis(100));

    match region {
        Some((start, length)) => {
            spinner.set_message(format!("Erasing {} bytes @ {:#08x}...", length, start));
            session.flash.erase_range(start, length as usize)?;
        }
        None => {
            spinner.set_message("Erasing chip...");
            session.flash.erase_chip()?;
        }
    }
    spinner.finish_with_message("Erase complete");
    session.save()
}
