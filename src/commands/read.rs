//! Read command implementation

use super::{progress_bar, ChunkBuf, CHUNK_SIZE};
use crate::cli::TransferArgs;
use crate::error::CliError;
use crate::session::Session;
use heepflash_core::flash::{ReadMode, FLASH_SIZE};
use std::fs;
use std::path::Path;

/// Run the read command
pub fn run_read(
    session: &mut Session,
    output: &Path,
    start: u32,
    length: Option<u32>,
    transfer: TransferArgs,
) -> Result<(), CliError> {
    let len = match length {
        Some(len) => len as usize,
        None => (FLASH_SIZE as usize).saturating_sub(start as usize),
    };
    let mode = transfer.read_mode();
    log::info!("Reading {} bytes @ {:#08x} ({:?})", len, start, mode);

    let mut data = vec![0u8; len];
    read_with_progress(session, start, &mut data, mode, "Reading")?;

    fs::write(output, &data)?;
    println!("Wrote {} bytes to {:?}", data.len(), output);
    Ok(())
}

/// Fill `data` from `start`, one chunk per driver call
pub(crate) fn read_with_progress(
    session: &mut Session,
    start: u32,
    data: &mut [u8],
    mode: ReadMode,
    phase: &str,
) -> Result<(), CliError> {
    if data.is_empty() {
        // Let the driver reject it
        session.flash.read(start, data, mode)?;
    }

    let pb = progress_bar(data.len(), phase);
    let mut buf = ChunkBuf::new();
    for (i, chunk) in data.chunks_mut(CHUNK_SIZE).enumerate() {
        let offset = i * CHUNK_SIZE;
        let bounce = &mut buf.0[..chunk.len()];
        session.flash.read(start + offset as u32, bounce, mode)?;
        chunk.copy_from_slice(bounce);
        session.drain_trace();
        pb.set_position((offset + chunk.len()) as u64);
    }
    pb.finish_with_message(format!("{} complete", phase));
    Ok(())
}
