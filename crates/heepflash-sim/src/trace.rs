//! Transaction trace recorded by the flash model

use std::fmt;

use heepflash_core::spi::Speed;

/// One chip-select assertion as seen by the flash
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transaction {
    /// First byte of the transaction
    pub opcode: u8,
    /// Bus width of the opcode byte
    pub opcode_speed: Speed,
    /// 24-bit address, once all address bytes arrived
    pub address: Option<u32>,
    /// Bus width of the address phase
    pub address_speed: Option<Speed>,
    /// Bytes shifted in after the address phase
    pub tx_bytes: usize,
    /// Bytes shifted out after the address phase
    pub rx_bytes: usize,
    /// Bus width of the data phase
    pub data_speed: Option<Speed>,
    /// Idle clocks between address and data
    pub dummy_cycles: u32,
    /// The flash ignored this transaction
    pub ignored: bool,
}

/// Protocol rule broken by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
    /// Command sent while BUSY was set
    WhileBusy {
        /// Offending opcode
        opcode: u8,
    },
    /// Program/erase/status write without a preceding Write Enable
    WriteNotEnabled {
        /// Offending opcode
        opcode: u8,
    },
    /// Quad command while the QE bit is clear
    QuadDisabled {
        /// Offending opcode
        opcode: u8,
    },
    /// Command other than Release Power-Down during deep power-down
    PoweredDown {
        /// Offending opcode
        opcode: u8,
    },
    /// Reset Device not immediately preceded by Enable Reset
    ResetNotEnabled,
    /// Wrong number of dummy clocks before quad read data
    DummyCycles {
        /// Clocks the flash expects
        expected: u32,
        /// Clocks the host sent
        actual: u32,
    },
    /// Phase sent at the wrong bus width
    WrongSpeed {
        /// Opcode of the transaction
        opcode: u8,
        /// Width required by the datasheet
        expected: Speed,
        /// Width used by the host
        actual: Speed,
    },
    /// Chip select released before the address was complete
    Truncated {
        /// Opcode of the transaction
        opcode: u8,
    },
    /// Opcode not implemented by the W25Q128JW
    UnknownOpcode(u8),
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WhileBusy { opcode } => write!(f, "opcode {:#04x} sent while busy", opcode),
            Self::WriteNotEnabled { opcode } => {
                write!(f, "opcode {:#04x} sent without write enable", opcode)
            }
            Self::QuadDisabled { opcode } => {
                write!(f, "quad opcode {:#04x} sent with QE clear", opcode)
            }
            Self::PoweredDown { opcode } => {
                write!(f, "opcode {:#04x} sent during power-down", opcode)
            }
            Self::ResetNotEnabled => write!(f, "reset without enable reset"),
            Self::DummyCycles { expected, actual } => {
                write!(f, "{} dummy cycles, expected {}", actual, expected)
            }
            Self::WrongSpeed {
                opcode,
                expected,
                actual,
            } => write!(
                f,
                "opcode {:#04x} phase at {:?} speed, expected {:?}",
                opcode, actual, expected
            ),
            Self::Truncated { opcode } => write!(f, "opcode {:#04x} address truncated", opcode),
            Self::UnknownOpcode(opcode) => write!(f, "unknown opcode {:#04x}", opcode),
        }
    }
}
