//! CLI error type

use heepflash_core::flash::ConfigError;
use heepflash_core::StatusCode;
use std::path::PathBuf;
use thiserror::Error;

/// Errors reported by the command line tool
#[derive(Debug, Error)]
pub enum CliError {
    /// The driver failed
    #[error("flash error: {0}")]
    Flash(#[from] heepflash_core::Error),

    /// File access failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Driver configuration could not be loaded
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Flash image or input file does not fit
    #[error("{path:?}: {len} bytes at {start:#x} exceeds the {size} byte flash")]
    TooLarge {
        /// Offending file
        path: PathBuf,
        /// File length
        len: usize,
        /// Start address
        start: u32,
        /// Flash size
        size: usize,
    },

    /// Nothing to do
    #[error("{0} is empty")]
    Empty(PathBuf),

    /// Read-back differs from the expected data
    #[error(
        "Verification failed: {count} byte(s) differ. First mismatch at 0x{addr:08X}: expected 0x{expected:02X}, got 0x{actual:02X}"
    )]
    VerifyFailed {
        /// Number of differing bytes
        count: usize,
        /// First differing address
        addr: u32,
        /// Expected byte at `addr`
        expected: u8,
        /// Byte read at `addr`
        actual: u8,
    },
}

impl CliError {
    /// Process exit code: driver status codes pass through, the rest is 1
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Flash(e) => e.status_code() as u8,
            _ => StatusCode::Error as u8,
        }
    }
}
