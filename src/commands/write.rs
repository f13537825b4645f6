//! Write command implementation

use super::verify::{check_fits, verify_flash};
use super::progress_bar;
use crate::cli::TransferArgs;
use crate::error::CliError;
use crate::session::Session;
use heepflash_core::flash::{ReadMode, SectorSpans};
use std::fs;
use std::path::Path;

/// Run the write command
///
/// Data goes out one 4 KiB sector span at a time. Unless `no_erase` is
/// set, each span is merged into its sector, which is then erased and
/// rewritten, so bytes around the written range are preserved.
pub fn run_write(
    session: &mut Session,
    input: &Path,
    start: u32,
    transfer: TransferArgs,
    no_erase: bool,
    no_verify: bool,
) -> Result<(), CliError> {
    let data = fs::read(input)?;
    if data.is_empty() {
        return Err(CliError::Empty(input.to_path_buf()));
    }
    println!("Read {} bytes from {:?}", data.len(), input);
    check_fits(input, start, data.len())?;

    let mode = transfer.write_mode();
    log::info!(
        "Writing {} bytes @ {:#08x} ({:?}{})",
        data.len(),
        start,
        mode,
        if no_erase { ", no erase" } else { "" }
    );

    let pb = progress_bar(data.len(), "Writing");
    let mut written = 0usize;
    for span in SectorSpans::new(start, data.len()) {
        let addr = span.sector + span.sector_offset as u32;
        let bytes = &data[span.offset..span.offset + span.len];
        if no_erase {
            session.flash.write(addr, bytes, mode)?;
        } else {
            session.flash.erase_and_write(addr, bytes, mode)?;
        }
        session.drain_trace();
        written += span.len;
        pb.set_position(written as u64);
    }
    pb.finish_with_message("Write complete");
    session.save()?;

    if !no_verify {
        let read_mode = ReadMode::new(mode.speed, mode.transfer);
        verify_flash(session, start, &data, read_mode)?;
        println!("Verification passed!");
    }
    Ok(())
}
