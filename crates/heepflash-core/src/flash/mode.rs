//! Read/write mode selection

use crate::spi::{opcodes, Speed};

/// How data words move between the SPI host FIFOs and memory
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Transfer {
    /// The CPU pushes/pops every word
    #[default]
    Polled,
    /// The DMA channel moves whole words, the CPU handles the tail
    Dma,
}

/// Read mode: bus width and data mover
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ReadMode {
    /// Standard (Read Data 0x03) or Quad (Fast Read Quad I/O 0xEB)
    pub speed: Speed,
    /// Data mover
    pub transfer: Transfer,
}

/// Write mode: bus width and data mover
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct WriteMode {
    /// Standard (Page Program 0x02) or Quad (Quad Page Program 0x32)
    pub speed: Speed,
    /// Data mover
    pub transfer: Transfer,
}

impl ReadMode {
    /// Single-line read, CPU driven
    pub const STANDARD: Self = Self::new(Speed::Standard, Transfer::Polled);
    /// Quad I/O read, CPU driven
    pub const QUAD: Self = Self::new(Speed::Quad, Transfer::Polled);
    /// Single-line read, DMA driven
    pub const STANDARD_DMA: Self = Self::new(Speed::Standard, Transfer::Dma);
    /// Quad I/O read, DMA driven
    pub const QUAD_DMA: Self = Self::new(Speed::Quad, Transfer::Dma);

    /// Build a read mode
    pub const fn new(speed: Speed, transfer: Transfer) -> Self {
        Self { speed, transfer }
    }

    /// Every read mode, for exhaustive checks
    pub const ALL: [Self; 4] = [Self::STANDARD, Self::QUAD, Self::STANDARD_DMA, Self::QUAD_DMA];
}

impl WriteMode {
    /// Page Program, CPU driven
    pub const STANDARD: Self = Self::new(Speed::Standard, Transfer::Polled);
    /// Quad Page Program, CPU driven
    pub const QUAD: Self = Self::new(Speed::Quad, Transfer::Polled);
    /// Page Program, DMA driven
    pub const STANDARD_DMA: Self = Self::new(Speed::Standard, Transfer::Dma);
    /// Quad Page Program, DMA driven
    pub const QUAD_DMA: Self = Self::new(Speed::Quad, Transfer::Dma);

    /// Build a write mode
    pub const fn new(speed: Speed, transfer: Transfer) -> Self {
        Self { speed, transfer }
    }

    /// Every write mode, for exhaustive checks
    pub const ALL: [Self; 4] = [Self::STANDARD, Self::QUAD, Self::STANDARD_DMA, Self::QUAD_DMA];

    /// Program opcode for this bus width
    pub const fn opcode(&self) -> u8 {
        match self.speed {
            Speed::Quad => opcodes::QPP,
            _ => opcodes::PP,
        }
    }

    /// The data phase uses four lines
    pub const fn is_quad(&self) -> bool {
        matches!(self.speed, Speed::Quad)
    }
}

impl ReadMode {
    /// The whole read uses Fast Read Quad I/O
    pub const fn is_quad(&self) -> bool {
        matches!(self.speed, Speed::Quad)
    }
}
