//! Verify command implementation

use super::read::read_with_progress;
use crate::error::CliError;
use crate::session::Session;
use heepflash_core::flash::{ReadMode, FLASH_SIZE};
use std::fs;
use std::path::Path;

/// Run the verify command
pub fn run_verify(
    session: &mut Session,
    input: &Path,
    start: u32,
    quad: bool,
) -> Result<(), CliError> {
    let expected = fs::read(input)?;
    if expected.is_empty() {
        return Err(CliError::Empty(input.to_path_buf()));
    }
    println!("Read {} bytes from {:?}", expected.len(), input);
    check_fits(input, start, expected.len())?;

    let mode = if quad {
        ReadMode::QUAD
    } else {
        ReadMode::STANDARD
    };
    verify_flash(session, start, &expected, mode)?;
    println!("Verification passed!");
    Ok(())
}

/// Fail early when `len` bytes at `start` don't fit in the flash
pub(crate) fn check_fits(path: &Path, start: u32, len: usize) -> Result<(), CliError> {
    if start as usize + len > FLASH_SIZE as usize {
        return Err(CliError::TooLarge {
            path: path.to_path_buf(),
            len,
            start,
            size: FLASH_SIZE as usize,
        });
    }
    Ok(())
}

/// Read back `expected.len()` bytes at `start` and compare
pub(crate) fn verify_flash(
    session: &mut Session,
    start: u32,
    expected: &[u8],
    mode: ReadMode,
) -> Result<(), CliError> {
    let mut actual = vec![0u8; expected.len()];
    read_with_progress(session, start, &mut actual, mode, "Verifying")?;

    let mut mismatches = actual
        .iter()
        .zip(expected)
        .enumerate()
        .filter(|(_, (a, e))| a != e);
    if let Some((i, (&actual_byte, &expected_byte))) = mismatches.next() {
        return Err(CliError::VerifyFailed {
            count: mismatches.count() + 1,
            addr: start + i as u32,
            expected: expected_byte,
            actual: actual_byte,
        });
    }
    Ok(())
}
