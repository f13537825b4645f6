//! SPI host command segment descriptor
//!
//! The SPI host executes a transaction as a sequence of command segments.
//! Each segment is written to the COMMAND register as a packed word:
//!
//! | Bits    | Field     |
//! |---------|-----------|
//! | [8:0]   | LEN       |
//! | 9       | CSAAT     |
//! | [11:10] | SPEED     |
//! | [13:12] | DIRECTION |

/// Width of the LEN field
pub const COMMAND_LEN_BITS: u32 = 9;
/// Largest byte count a single segment can carry
pub const COMMAND_MAX_LEN: usize = 1 << COMMAND_LEN_BITS;

const LEN_MASK: u32 = (1 << COMMAND_LEN_BITS) - 1;
const CSAAT_BIT: u32 = 9;
const SPEED_OFFSET: u32 = 10;
const DIRECTION_OFFSET: u32 = 12;

/// Bus width of a segment
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Speed {
    /// One data line
    #[default]
    Standard = 0,
    /// Two data lines
    Dual = 1,
    /// Four data lines
    Quad = 2,
}

impl Speed {
    /// Number of data lines used by this speed
    pub const fn lines(&self) -> u8 {
        match self {
            Self::Standard => 1,
            Self::Dual => 2,
            Self::Quad => 4,
        }
    }

    const fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            0 => Some(Self::Standard),
            1 => Some(Self::Dual),
            2 => Some(Self::Quad),
            _ => None,
        }
    }
}

/// Data direction of a segment
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Clock cycles with no data (LEN counts cycles)
    #[default]
    Dummy = 0,
    /// Receive only
    RxOnly = 1,
    /// Transmit only
    TxOnly = 2,
    /// Full duplex
    Bidir = 3,
}

impl Direction {
    const fn from_bits(bits: u32) -> Self {
        match bits & 0x3 {
            0 => Self::Dummy,
            1 => Self::RxOnly,
            2 => Self::TxOnly,
            _ => Self::Bidir,
        }
    }
}

/// One command segment
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Command {
    /// Number of bytes (or dummy cycles) minus one
    pub len: u16,
    /// Keep chip select asserted after this segment
    pub csaat: bool,
    /// Bus width
    pub speed: Speed,
    /// Data direction
    pub direction: Direction,
}

impl Command {
    /// Transmit `bytes` bytes (must be at least 1)
    pub const fn tx(bytes: usize, speed: Speed, csaat: bool) -> Self {
        Self {
            len: (bytes - 1) as u16,
            csaat,
            speed,
            direction: Direction::TxOnly,
        }
    }

    /// Receive `bytes` bytes (must be at least 1)
    pub const fn rx(bytes: usize, speed: Speed, csaat: bool) -> Self {
        Self {
            len: (bytes - 1) as u16,
            csaat,
            speed,
            direction: Direction::RxOnly,
        }
    }

    /// Clock `cycles` dummy cycles (must be at least 1)
    pub const fn dummy(cycles: u8, speed: Speed, csaat: bool) -> Self {
        Self {
            len: (cycles - 1) as u16,
            csaat,
            speed,
            direction: Direction::Dummy,
        }
    }

    /// Number of bytes (or cycles for dummy segments) this segment covers
    pub const fn count(&self) -> usize {
        self.len as usize + 1
    }

    /// Pack into the COMMAND register layout
    pub const fn encode(&self) -> u32 {
        (self.len as u32 & LEN_MASK)
            | ((self.csaat as u32) << CSAAT_BIT)
            | ((self.speed as u32) << SPEED_OFFSET)
            | ((self.direction as u32) << DIRECTION_OFFSET)
    }

    /// Unpack a COMMAND register word
    ///
    /// Returns `None` for the reserved speed encoding.
    pub const fn decode(word: u32) -> Option<Self> {
        let speed = match Speed::from_bits((word >> SPEED_OFFSET) & 0x3) {
            Some(s) => s,
            None => return None,
        };
        Some(Self {
            len: (word & LEN_MASK) as u16,
            csaat: (word >> CSAAT_BIT) & 1 != 0,
            speed,
            direction: Direction::from_bits(word >> DIRECTION_OFFSET),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_address_segment() {
        // 4 bytes, CS held, standard, TX only
        let cmd = Command::tx(4, Speed::Standard, true);
        assert_eq!(cmd.encode(), 0x0000_2203);
    }

    #[test]
    fn test_encode_quad_rx() {
        let cmd = Command::rx(256, Speed::Quad, false);
        assert_eq!(cmd.encode(), (1 << 12) | (2 << 10) | 0xFF);
    }

    #[test]
    fn test_encode_dummy() {
        let cmd = Command::dummy(8, Speed::Quad, true);
        assert_eq!(cmd.encode(), (2 << 10) | (1 << 9) | 7);
        assert_eq!(cmd.count(), 8);
    }

    #[test]
    fn test_decode() {
        let cmd = Command::rx(10, Speed::Standard, false);
        assert_eq!(Command::decode(cmd.encode()), Some(cmd));
        assert_eq!(Command::decode(3 << 10), None);
    }

    #[test]
    fn test_max_len_fits() {
        let cmd = Command::rx(COMMAND_MAX_LEN, Speed::Standard, false);
        assert_eq!(cmd.encode() & 0x1FF, 0x1FF);
    }
}
