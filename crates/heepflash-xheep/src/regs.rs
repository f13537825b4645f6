//! X-HEEP peripheral register definitions
//!
//! Offsets and bit definitions for the OpenTitan-derived SPI host, the
//! SoC control block and the DMA engine, as laid out in the X-HEEP
//! memory map.

// ============================================================================
// Default base addresses
// ============================================================================

/// SoC control block
pub const SOC_CTRL_BASE: usize = 0x2000_0000;
/// SPI host wired to the boot flash
pub const SPI_FLASH_BASE: usize = 0x2002_0000;
/// DMA engine
pub const DMA_BASE: usize = 0x2004_0000;

// ============================================================================
// SPI host
// ============================================================================

/// Interrupt state
pub const SPI_HOST_INTR_STATE: usize = 0x00;
/// Interrupt enable
pub const SPI_HOST_INTR_ENABLE: usize = 0x04;
/// Control register
pub const SPI_HOST_CONTROL: usize = 0x10;
/// Status register
pub const SPI_HOST_STATUS: usize = 0x14;
/// Timing configuration for chip select 0 (one register per chip select)
pub const SPI_HOST_CONFIGOPTS: usize = 0x18;
/// Active chip select
pub const SPI_HOST_CSID: usize = 0x1c;
/// Command segment
pub const SPI_HOST_COMMAND: usize = 0x20;
/// RX FIFO window
pub const SPI_HOST_RXDATA: usize = 0x24;
/// TX FIFO window
pub const SPI_HOST_TXDATA: usize = 0x28;
/// Error interrupt enables
pub const SPI_HOST_ERROR_ENABLE: usize = 0x2c;
/// Latched error flags (write 1 to clear)
pub const SPI_HOST_ERROR_STATUS: usize = 0x30;
/// Event interrupt enables
pub const SPI_HOST_EVENT_ENABLE: usize = 0x34;

// CONTROL bits
/// RX watermark field mask
pub const CONTROL_RX_WATERMARK_MASK: u32 = 0xFF;
/// TX watermark field offset
pub const CONTROL_TX_WATERMARK_OFFSET: u32 = 8;
/// Drive the SPI outputs
pub const CONTROL_OUTPUT_EN: u32 = 1 << 29;
/// Software reset
pub const CONTROL_SW_RST: u32 = 1 << 30;
/// Enable the host
pub const CONTROL_SPIEN: u32 = 1 << 31;

/// Chip select lines on the flash SPI host
pub const SPI_FLASH_NUM_CS: u32 = 1;
/// TX FIFO depth in words
pub const SPI_HOST_TX_DEPTH: usize = 72;
/// RX FIFO depth in words
pub const SPI_HOST_RX_DEPTH: usize = 64;

// ============================================================================
// SoC control
// ============================================================================

/// Boot select strap
pub const SOC_CTRL_BOOT_SELECT: usize = 0x08;
/// Flash accessed through the memory-mapped controller when bit 0 is set
pub const SOC_CTRL_USE_SPIMEMIO: usize = 0x14;
/// Route the SPI pads to the SPI host
pub const SOC_CTRL_ENABLE_SPI_SEL: usize = 0x18;
/// System clock frequency in Hz
pub const SOC_CTRL_SYSTEM_FREQUENCY_HZ: usize = 0x1c;

// ============================================================================
// DMA
// ============================================================================

/// Source address
pub const DMA_PTR_IN: usize = 0x00;
/// Destination address
pub const DMA_PTR_OUT: usize = 0x04;
/// Writing the byte count starts the transfer
pub const DMA_START: usize = 0x08;
/// Non-zero once the transfer completed
pub const DMA_DONE: usize = 0x0c;
/// Source increment in bytes
pub const DMA_SRC_PTR_INC: usize = 0x10;
/// Destination increment in bytes
pub const DMA_DST_PTR_INC: usize = 0x14;
/// Trigger slots: RX in [15:0], TX in [31:16]
pub const DMA_SLOT: usize = 0x18;
/// Element width
pub const DMA_DATA_TYPE: usize = 0x1c;

/// TX slot field offset
pub const DMA_SLOT_TX_OFFSET: u32 = 16;
/// 32-bit elements
pub const DMA_DATA_TYPE_WORD: u32 = 0;

/// Trigger: SPI host RX FIFO not empty
pub const DMA_TRIG_SPI_RX: u32 = 0x1;
/// Trigger: SPI host TX FIFO not full
pub const DMA_TRIG_SPI_TX: u32 = 0x2;
/// Trigger: SPI flash host RX FIFO not empty
pub const DMA_TRIG_SPI_FLASH_RX: u32 = 0x4;
/// Trigger: SPI flash host TX FIFO not full
pub const DMA_TRIG_SPI_FLASH_TX: u32 = 0x8;
