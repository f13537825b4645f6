//! SPI types and command structures
//!
//! This module provides the SPI host command segment encoding, the
//! CONFIGOPTS timing register, address framing, and the W25Q128JW opcodes.

mod address;
mod command;
mod configopts;
pub mod opcodes;

pub use address::{
    frame_address_command, opcode_word, quad_address_word, register_write_word, FramedCommand,
    ADDRESS_MASK,
};
pub use command::{Command, Direction, Speed, COMMAND_LEN_BITS, COMMAND_MAX_LEN};
pub use configopts::{clock_divider, sck_hz, ConfigOpts};
pub use opcodes::*;
