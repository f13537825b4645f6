//! Hardware collaborator trait definitions
//!
//! The flash driver never touches registers itself. It talks to three
//! collaborators:
//!
//! - [`SpiHost`]: the SPI host's FIFOs, command queue and status flags
//! - [`DmaChannel`]: an optional DMA engine moving words between memory
//!   and the SPI host FIFOs
//! - [`SocControl`]: the SoC control block (flash mode, system clock)
//!
//! These traits use `maybe_async` to support both sync and async modes.
//! - By default, traits are async (suitable for Embassy-style executors)
//! - With the `is_sync` feature, traits become synchronous

use crate::error::DmaFailure;
use crate::spi::{Command, ConfigOpts, COMMAND_MAX_LEN};
use bitflags::bitflags;
use maybe_async::maybe_async;

bitflags! {
    /// SPI host STATUS register flags
    ///
    /// Bit positions match the hardware register so the raw word can be
    /// truncated straight into this type.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct StatusFlags: u32 {
        /// RX FIFO depth is at or above the watermark
        const RXWM      = 1 << 20;
        /// Host is configured for big-endian byte order
        const BYTEORDER = 1 << 22;
        /// A segment is stalled on a full RX FIFO
        const RXSTALL   = 1 << 23;
        /// RX FIFO is empty
        const RXEMPTY   = 1 << 24;
        /// RX FIFO is full
        const RXFULL    = 1 << 25;
        /// TX FIFO depth is below the watermark
        const TXWM      = 1 << 26;
        /// A segment is stalled on an empty TX FIFO
        const TXSTALL   = 1 << 27;
        /// TX FIFO is empty
        const TXEMPTY   = 1 << 28;
        /// TX FIFO is full
        const TXFULL    = 1 << 29;
        /// A transaction is in progress
        const ACTIVE    = 1 << 30;
        /// The host can accept another command
        const READY     = 1 << 31;
    }
}

const TXQD_MASK: u32 = 0xFF;
const RXQD_OFFSET: u32 = 8;
const RXQD_MASK: u32 = 0xFF;
const CMDQD_OFFSET: u32 = 16;
const CMDQD_MASK: u32 = 0xF;

/// Decoded SPI host STATUS register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostStatus {
    /// Flag bits
    pub flags: StatusFlags,
    /// Words queued in the TX FIFO
    pub tx_depth: u8,
    /// Words queued in the RX FIFO
    pub rx_depth: u8,
    /// Segments queued in the command FIFO
    pub cmd_depth: u8,
}

impl HostStatus {
    /// Decode the raw STATUS register word
    pub fn from_register(word: u32) -> Self {
        Self {
            flags: StatusFlags::from_bits_truncate(word),
            tx_depth: (word & TXQD_MASK) as u8,
            rx_depth: ((word >> RXQD_OFFSET) & RXQD_MASK) as u8,
            cmd_depth: ((word >> CMDQD_OFFSET) & CMDQD_MASK) as u8,
        }
    }

    /// Encode back into the STATUS register layout
    pub fn to_register(&self) -> u32 {
        self.flags.bits()
            | self.tx_depth as u32
            | ((self.rx_depth as u32) << RXQD_OFFSET)
            | ((self.cmd_depth as u32 & CMDQD_MASK) << CMDQD_OFFSET)
    }

    /// The host can accept another command segment
    pub fn is_ready(&self) -> bool {
        self.flags.contains(StatusFlags::READY)
    }

    /// The RX FIFO reached the configured watermark
    pub fn rx_watermark(&self) -> bool {
        self.flags.contains(StatusFlags::RXWM)
    }

    /// The TX FIFO cannot take another word
    pub fn tx_full(&self) -> bool {
        self.flags.contains(StatusFlags::TXFULL)
    }
}

/// SPI host trait (sync or async depending on `is_sync` feature)
///
/// This is the transactional substrate the flash driver is built on. An
/// implementation owns one SPI host instance. Methods map one-to-one onto
/// register accesses; none of them block. Blocking waits are built on
/// top of [`SpiHost::status`] by the helpers in [`crate::host`] so that
/// every wait is bounded.
///
/// ## Ordering
///
/// Command segments execute strictly in the order they are queued. A
/// segment with `csaat` set keeps chip select asserted so the next queued
/// segment continues the same flash transaction.
///
/// ## Example
///
/// ```ignore
/// #[maybe_async(AFIT)]
/// impl SpiHost for MyHost {
///     fn write_word(&mut self, word: u32) {
///         self.regs.txdata.set(word);
///     }
///     // ...
///     async fn delay_us(&mut self, us: u32) {
///         self.timer.delay_us(us).await
///     }
/// }
/// ```
#[maybe_async(AFIT)]
pub trait SpiHost {
    /// Enable or disable the host
    fn set_enable(&mut self, enable: bool);

    /// Enable or disable the output drivers
    fn output_enable(&mut self, enable: bool);

    /// Program clock and chip-select timing for one chip select line
    fn set_configopts(&mut self, csid: u32, opts: ConfigOpts);

    /// Select the active chip select line
    fn set_csid(&mut self, csid: u32);

    /// Set the RX FIFO watermark in words
    fn set_rx_watermark(&mut self, words: u8);

    /// Push one word into the TX FIFO
    fn write_word(&mut self, word: u32);

    /// Pop one word from the RX FIFO
    fn read_word(&mut self) -> u32;

    /// Queue one command segment
    fn set_command(&mut self, command: Command);

    /// Read the STATUS register
    fn status(&mut self) -> HostStatus;

    /// Whether the host has latched an error (overflow, invalid command...)
    fn has_error(&mut self) -> bool {
        false
    }

    /// TX FIFO capacity in words
    fn tx_fifo_depth(&self) -> usize;

    /// RX FIFO capacity in words
    fn rx_fifo_depth(&self) -> usize;

    /// Largest byte count one command segment can carry
    fn max_segment_len(&self) -> usize {
        COMMAND_MAX_LEN
    }

    /// Bus address of the RXDATA window, used as a DMA source
    fn rx_fifo_addr(&self) -> usize;

    /// Bus address of the TXDATA window, used as a DMA destination
    fn tx_fifo_addr(&self) -> usize;

    /// Delay for the specified number of microseconds
    async fn delay_us(&mut self, us: u32);
}

/// Hardware request line pacing a DMA transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DmaTrigger {
    /// Wait for the SPI flash host's RX FIFO to hold a word
    SpiFlashRx,
    /// Wait for the SPI flash host's TX FIFO to have room
    SpiFlashTx,
}

/// Memory side of a DMA transfer
#[derive(Debug)]
pub enum DmaBuffer<'a> {
    /// FIFO to memory, destination increments
    ToMemory(&'a mut [u8]),
    /// Memory to FIFO, source increments
    FromMemory(&'a [u8]),
}

/// A word-wide transfer between a fixed FIFO register and a memory buffer
#[derive(Debug)]
pub struct DmaTransfer<'a> {
    /// FIFO register address (never increments)
    pub fifo_addr: usize,
    /// Request line pacing the transfer
    pub trigger: DmaTrigger,
    /// Memory buffer
    pub buffer: DmaBuffer<'a>,
}

impl<'a> DmaTransfer<'a> {
    /// Drain the RX FIFO at `fifo_addr` into `dest`
    pub fn from_fifo(fifo_addr: usize, dest: &'a mut [u8]) -> Self {
        Self {
            fifo_addr,
            trigger: DmaTrigger::SpiFlashRx,
            buffer: DmaBuffer::ToMemory(dest),
        }
    }

    /// Feed `src` into the TX FIFO at `fifo_addr`
    pub fn to_fifo(fifo_addr: usize, src: &'a [u8]) -> Self {
        Self {
            fifo_addr,
            trigger: DmaTrigger::SpiFlashTx,
            buffer: DmaBuffer::FromMemory(src),
        }
    }

    /// Length of the memory buffer in bytes
    pub fn len(&self) -> usize {
        match &self.buffer {
            DmaBuffer::ToMemory(b) => b.len(),
            DmaBuffer::FromMemory(b) => b.len(),
        }
    }

    /// Bus address of the memory buffer
    pub fn buffer_addr(&self) -> usize {
        match &self.buffer {
            DmaBuffer::ToMemory(b) => b.as_ptr() as usize,
            DmaBuffer::FromMemory(b) => b.as_ptr() as usize,
        }
    }

    /// Check the descriptor against the word data type
    pub fn validate(&self) -> Result<(), DmaFailure> {
        let len = self.len();
        if len == 0 || len % 4 != 0 {
            return Err(DmaFailure::InvalidLength);
        }
        if self.buffer_addr() % 4 != 0 {
            return Err(DmaFailure::Misaligned);
        }
        Ok(())
    }
}

/// DMA channel trait (sync or async depending on `is_sync` feature)
///
/// The driver validates and launches a transfer, then polls for its
/// completion, calling [`DmaChannel::idle`] between polls. `idle` is the
/// place to sleep (`wfi`, power gating) until the completion interrupt.
///
/// The same `transfer` is passed to `launch` and every `poll` so that the
/// memory buffer stays borrowed for the whole lifetime of the transfer.
#[maybe_async(AFIT)]
pub trait DmaChannel {
    /// Check a descriptor without starting anything
    fn check(&self, transfer: &DmaTransfer<'_>) -> Result<(), DmaFailure> {
        transfer.validate()
    }

    /// Validate, load and start a transfer
    fn launch(&mut self, transfer: &mut DmaTransfer<'_>) -> Result<(), DmaFailure>;

    /// Returns true once the transfer has completed
    fn poll(&mut self, transfer: &mut DmaTransfer<'_>) -> bool;

    /// Wait for something to happen (interrupt, next poll)
    async fn idle(&mut self);
}

/// Placeholder for drivers built without a DMA channel
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDma;

#[maybe_async(AFIT)]
impl DmaChannel for NoDma {
    fn check(&self, _transfer: &DmaTransfer<'_>) -> Result<(), DmaFailure> {
        Err(DmaFailure::Unavailable)
    }

    fn launch(&mut self, _transfer: &mut DmaTransfer<'_>) -> Result<(), DmaFailure> {
        Err(DmaFailure::Unavailable)
    }

    fn poll(&mut self, _transfer: &mut DmaTransfer<'_>) -> bool {
        true
    }

    async fn idle(&mut self) {}
}

/// How the SPI flash pads are currently driven
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashMode {
    /// Command access through the SPI host
    SpiHost,
    /// Memory-mapped (XIP) access through the SPI memory controller
    MemoryMapped,
}

/// SoC control block access needed by the flash driver
pub trait SocControl {
    /// Current flash access mode
    fn spi_flash_mode(&self) -> FlashMode;

    /// Route the flash pads to the SPI host
    fn select_spi_host(&mut self);

    /// System (core) clock frequency
    fn system_frequency_hz(&self) -> u32;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_decode() {
        let word = (1 << 31) | (1 << 20) | (3 << 16) | (5 << 8) | 7;
        let status = HostStatus::from_register(word);
        assert!(status.is_ready());
        assert!(status.rx_watermark());
        assert!(!status.tx_full());
        assert_eq!(status.tx_depth, 7);
        assert_eq!(status.rx_depth, 5);
        assert_eq!(status.cmd_depth, 3);
        assert_eq!(status.to_register(), word);
    }

    #[repr(align(4))]
    struct Aligned([u8; 16]);

    #[test]
    fn test_dma_validate() {
        let mut buf = Aligned([0; 16]);
        let xfer = DmaTransfer::from_fifo(0x2000_0024, &mut buf.0[..8]);
        assert_eq!(xfer.validate(), Ok(()));

        let xfer = DmaTransfer::from_fifo(0x2000_0024, &mut buf.0[1..5]);
        assert_eq!(xfer.validate(), Err(DmaFailure::Misaligned));

        let src = Aligned([0; 16]);
        let xfer = DmaTransfer::to_fifo(0x2000_0028, &src.0[..6]);
        assert_eq!(xfer.validate(), Err(DmaFailure::InvalidLength));
        assert_eq!(NoDma.check(&xfer), Err(DmaFailure::Unavailable));
    }
}
