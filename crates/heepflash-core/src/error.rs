//! Error types for heepflash-core
//!
//! This module provides a no_std compatible error type that can be used
//! throughout the crate, plus the numeric status codes exposed to C-style
//! callers.

use core::fmt;

/// Which hardware wait ran out of polls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitTarget {
    /// The SPI host never reported READY for a new command
    SpiReady,
    /// The RX FIFO never reached the requested watermark
    RxWatermark,
    /// The TX FIFO never freed up space for another word
    TxSpace,
    /// The flash kept the BUSY bit set
    FlashBusy,
    /// The DMA channel never reported completion
    DmaDone,
}

/// Reasons a DMA transfer descriptor can be rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DmaFailure {
    /// Buffer address is not aligned to the transfer data type
    Misaligned,
    /// Transfer length is zero or not a whole number of words
    InvalidLength,
    /// The channel is still running a previous transfer
    Busy,
    /// No DMA channel is attached to this driver
    Unavailable,
}

/// Core error type - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    // Argument errors
    /// Address or address + length is beyond the flash
    AddressOutOfBounds,
    /// Zero-length transfer
    InvalidLength,
    /// Operation requires an aligned address or size
    InvalidAlignment,

    // Hardware mode errors
    /// The flash is mapped into the address space (XIP / SPIMEMIO mode)
    MemoryMappedMode,

    // Protocol errors
    /// Quad Enable bit did not latch after writing status register 2
    QuadEnableFailed,

    // Wait errors
    /// A bounded hardware wait expired
    Timeout(WaitTarget),

    // DMA errors
    /// The DMA channel rejected the transfer
    Dma(DmaFailure),

    // Host errors
    /// The SPI host reported an error condition
    SpiHostError,
}

/// Numeric status codes matching the C driver interface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum StatusCode {
    /// Operation completed
    Ok = 0,
    /// Generic failure (arguments, mode conflict, timeout, verification)
    Error = 1,
    /// DMA descriptor rejected
    ErrorDma = 2,
}

impl StatusCode {
    /// Collapse an operation result into its status code
    pub fn from_result<T>(result: &Result<T>) -> Self {
        match result {
            Ok(_) => Self::Ok,
            Err(e) => e.status_code(),
        }
    }
}

impl Error {
    /// Status code reported for this error
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Dma(_) => StatusCode::ErrorDma,
            _ => StatusCode::Error,
        }
    }
}

impl fmt::Display for WaitTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SpiReady => write!(f, "SPI host ready"),
            Self::RxWatermark => write!(f, "RX FIFO watermark"),
            Self::TxSpace => write!(f, "TX FIFO space"),
            Self::FlashBusy => write!(f, "flash busy bit"),
            Self::DmaDone => write!(f, "DMA completion"),
        }
    }
}

impl fmt::Display for DmaFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Misaligned => write!(f, "buffer is not word aligned"),
            Self::InvalidLength => write!(f, "invalid transfer length"),
            Self::Busy => write!(f, "channel busy"),
            Self::Unavailable => write!(f, "no DMA channel available"),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AddressOutOfBounds => write!(f, "address out of bounds"),
            Self::InvalidLength => write!(f, "invalid length"),
            Self::InvalidAlignment => write!(f, "invalid alignment"),
            Self::MemoryMappedMode => {
                write!(f, "flash is in memory-mapped mode, command access unavailable")
            }
            Self::QuadEnableFailed => write!(f, "quad enable bit did not latch"),
            Self::Timeout(target) => write!(f, "timed out waiting for {}", target),
            Self::Dma(failure) => write!(f, "DMA transfer rejected: {}", failure),
            Self::SpiHostError => write!(f, "SPI host error"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(StatusCode::from_result(&Ok::<(), Error>(())) as u8, 0);
        assert_eq!(
            StatusCode::from_result::<()>(&Err(Error::AddressOutOfBounds)) as u8,
            1
        );
        assert_eq!(
            StatusCode::from_result::<()>(&Err(Error::Timeout(WaitTarget::FlashBusy))),
            StatusCode::Error
        );
        assert_eq!(
            StatusCode::from_result::<()>(&Err(Error::Dma(DmaFailure::Misaligned))) as u8,
            2
        );
    }
}
