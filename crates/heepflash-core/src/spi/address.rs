//! Address/command framing
//!
//! The SPI host shifts TX FIFO words out least significant byte first,
//! while the flash expects the opcode followed by a big-endian address.
//! These helpers build FIFO words whose byte order on the wire matches
//! the datasheet.

use super::{Command, Speed};

/// Mask for the 24-bit flash address space
pub const ADDRESS_MASK: u32 = 0x00FF_FFFF;

/// A FIFO word plus the segment that transmits it
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FramedCommand {
    /// Word to push into the TX FIFO
    pub word: u32,
    /// Segment sending the opcode and the three address bytes
    pub command: Command,
}

impl FramedCommand {
    /// Bytes in the order they appear on the wire
    pub const fn wire_bytes(&self) -> [u8; 4] {
        self.word.to_le_bytes()
    }
}

/// Frame an opcode and a 24-bit address into one TX word
///
/// The segment is 4 bytes, TX only, standard speed and keeps chip select
/// asserted so the caller can append data or dummy segments. Callers that
/// end the transaction here (erase) clear `csaat` themselves.
pub const fn frame_address_command(opcode: u8, address: u32) -> FramedCommand {
    FramedCommand {
        word: (address & ADDRESS_MASK).swap_bytes() | opcode as u32,
        command: Command::tx(4, Speed::Standard, true),
    }
}

/// Build the address phase word for Fast Read Quad I/O
///
/// Wire order is `[A23..16, A15..8, A7..0, mode]`.
pub const fn quad_address_word(address: u32, mode: u8) -> u32 {
    ((address & ADDRESS_MASK).swap_bytes() >> 8) | ((mode as u32) << 24)
}

/// Build a TX word carrying only an opcode
pub const fn opcode_word(opcode: u8) -> u32 {
    opcode as u32
}

/// Build a TX word carrying an opcode followed by one register value
pub const fn register_write_word(opcode: u8, value: u8) -> u32 {
    opcode as u32 | ((value as u32) << 8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spi::{opcodes, Direction};

    #[test]
    fn test_frame_read_command() {
        let framed = frame_address_command(opcodes::READ, 0x00ABCD);
        assert_eq!(framed.wire_bytes(), [0x03, 0x00, 0xAB, 0xCD]);
        assert_eq!(framed.word, 0xCDAB_0003);
        assert_eq!(framed.command.count(), 4);
        assert!(framed.command.csaat);
        assert_eq!(framed.command.direction, Direction::TxOnly);
        assert_eq!(framed.command.speed, Speed::Standard);
    }

    #[test]
    fn test_frame_ignores_upper_byte() {
        let framed = frame_address_command(opcodes::SE_20, 0xFF12_3456);
        assert_eq!(framed.wire_bytes(), [0x20, 0x12, 0x34, 0x56]);
    }

    #[test]
    fn test_quad_address_word() {
        let word = quad_address_word(0x00ABCD, opcodes::QIOR_MODE_BITS);
        assert_eq!(word.to_le_bytes(), [0x00, 0xAB, 0xCD, 0xFF]);
    }

    #[test]
    fn test_register_write_word() {
        let word = register_write_word(opcodes::WRSR2, 0x02);
        assert_eq!(word.to_le_bytes(), [0x31, 0x02, 0x00, 0x00]);
    }
}
