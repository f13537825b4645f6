//! Info command implementation

use crate::error::CliError;
use crate::session::Session;
use heepflash_core::flash::FLASH_SIZE;
use heepflash_core::spi::{opcodes, sck_hz};

/// Run the info command
pub fn run_info(session: &mut Session, core_hz: u32) -> Result<(), CliError> {
    let (manufacturer, device) = session.flash.read_jedec_id()?;
    let sr1 = session.flash.read_status1()?;
    let sr2 = session.flash.read_status2()?;
    let clkdiv = session.host().configopts(0).clkdiv;
    let config = *session.flash.config();

    println!("Flash Information:");
    println!("  JEDEC ID:     {:02X} {:04X}", manufacturer, device);
    println!(
        "  Size:         {} bytes ({} MiB)",
        FLASH_SIZE,
        FLASH_SIZE / (1024 * 1024)
    );
    println!(
        "  Status:       SR1={:02X} SR2={:02X} (busy: {}, quad: {})",
        sr1,
        sr2,
        sr1 & opcodes::SR1_BUSY != 0,
        sr2 & opcodes::SR2_QE != 0
    );
    println!(
        "  Clock:        {} Hz core, {} Hz SCK (clkdiv {})",
        core_hz,
        sck_hz(core_hz, clkdiv),
        clkdiv
    );
    println!("  Quad dummy:   {} cycles", config.quad_dummy_cycles);
    Ok(())
}
