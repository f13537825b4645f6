//! W25Q128JW command opcodes
//!
//! Values are taken from the Winbond W25Q128JW datasheet. Names follow the
//! usual JEDEC mnemonics.

// ============================================================================
// Write control
// ============================================================================

/// Write Enable - required before any program/erase/status write
pub const WREN: u8 = 0x06;

// ============================================================================
// Status register operations
// ============================================================================

/// Read Status Register 1
pub const RDSR1: u8 = 0x05;
/// Read Status Register 2
pub const RDSR2: u8 = 0x35;
/// Write Status Register 2
pub const WRSR2: u8 = 0x31;

// ============================================================================
// Identification
// ============================================================================

/// Read JEDEC ID (manufacturer + memory type + capacity)
pub const RDID: u8 = 0x9F;

// ============================================================================
// Read commands
// ============================================================================

/// Read Data (1-1-1)
pub const READ: u8 = 0x03;
/// Fast Read Quad I/O (1-4-4) with mode byte and dummy cycles
pub const QIOR: u8 = 0xEB;

// ============================================================================
// Page Program
// ============================================================================

/// Page Program (1-1-1)
pub const PP: u8 = 0x02;
/// Quad Input Page Program (1-1-4)
pub const QPP: u8 = 0x32;

// ============================================================================
// Erase commands
// ============================================================================

/// Sector Erase 4KB
pub const SE_20: u8 = 0x20;
/// Block Erase 32KB
pub const BE_52: u8 = 0x52;
/// Block Erase 64KB
pub const BE_D8: u8 = 0xD8;
/// Chip Erase
pub const CE_C7: u8 = 0xC7;

// ============================================================================
// Power management
// ============================================================================

/// Power Down
pub const DP: u8 = 0xB9;
/// Release Power Down
pub const RDP: u8 = 0xAB;

// ============================================================================
// Software Reset
// ============================================================================

/// Enable Reset
pub const RSTEN: u8 = 0x66;
/// Reset Device
pub const RST: u8 = 0x99;

// ============================================================================
// Status register bit definitions
// ============================================================================

/// Status Register 1: Erase/Write in progress
pub const SR1_BUSY: u8 = 0x01;
/// Status Register 1: Write Enable Latch
pub const SR1_WEL: u8 = 0x02;

/// Status Register 2: Quad Enable
pub const SR2_QE: u8 = 0x02;

// ============================================================================
// Fast Read Quad I/O
// ============================================================================

/// Continuous read mode bits sent after the address; 0xFF keeps the
/// device out of continuous read mode
pub const QIOR_MODE_BITS: u8 = 0xFF;
