//! W25Q128JW geometry and page/sector splitting

use crate::spi::opcodes;

/// Program page size
pub const PAGE_SIZE: usize = 256;
/// Smallest erasable unit
pub const SECTOR_SIZE: usize = 4096;
/// 32 KiB erase block
pub const BLOCK_32K_SIZE: usize = 32 * 1024;
/// 64 KiB erase block
pub const BLOCK_64K_SIZE: usize = 64 * 1024;
/// Total capacity (128 Mbit)
pub const FLASH_SIZE: u32 = 0x0100_0000;

/// Erase command granularity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EraseGranule {
    /// 4 KiB sector erase (0x20)
    Sector4K,
    /// 32 KiB block erase (0x52)
    Block32K,
    /// 64 KiB block erase (0xD8)
    Block64K,
}

impl EraseGranule {
    /// Size in bytes
    pub const fn size(&self) -> usize {
        match self {
            Self::Sector4K => SECTOR_SIZE,
            Self::Block32K => BLOCK_32K_SIZE,
            Self::Block64K => BLOCK_64K_SIZE,
        }
    }

    /// Erase opcode
    pub const fn opcode(&self) -> u8 {
        match self {
            Self::Sector4K => opcodes::SE_20,
            Self::Block32K => opcodes::BE_52,
            Self::Block64K => opcodes::BE_D8,
        }
    }

    /// Round `addr` down to the start of its granule
    pub const fn align(&self, addr: u32) -> u32 {
        addr & !(self.size() as u32 - 1)
    }

    /// Pick the largest granule starting at `addr` that fits in `len`
    pub fn largest_fitting(addr: u32, len: usize) -> Option<Self> {
        [Self::Block64K, Self::Block32K, Self::Sector4K]
            .into_iter()
            .find(|g| g.align(addr) == addr && len >= g.size())
    }
}

/// One page-bounded piece of a write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageChunk {
    /// Flash address of the first byte
    pub addr: u32,
    /// Offset into the caller's buffer
    pub offset: usize,
    /// Number of bytes (1..=PAGE_SIZE)
    pub len: usize,
}

/// Split `[addr, addr + len)` into pieces that never cross a page boundary
#[derive(Debug, Clone)]
pub struct PageChunks {
    addr: u32,
    offset: usize,
    remaining: usize,
}

impl PageChunks {
    /// Iterate over the page pieces of a write
    pub fn new(addr: u32, len: usize) -> Self {
        Self {
            addr,
            offset: 0,
            remaining: len,
        }
    }
}

impl Iterator for PageChunks {
    type Item = PageChunk;

    fn next(&mut self) -> Option<PageChunk> {
        if self.remaining == 0 {
            return None;
        }
        let room = PAGE_SIZE - (self.addr as usize % PAGE_SIZE);
        let len = room.min(self.remaining);
        let chunk = PageChunk {
            addr: self.addr,
            offset: self.offset,
            len,
        };
        self.addr += len as u32;
        self.offset += len;
        self.remaining -= len;
        Some(chunk)
    }
}

/// One sector touched by a write, for read-modify-write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectorSpan {
    /// Sector start address
    pub sector: u32,
    /// Offset of the written bytes inside the sector
    pub sector_offset: usize,
    /// Offset into the caller's buffer
    pub offset: usize,
    /// Number of written bytes inside this sector
    pub len: usize,
}

/// Split `[addr, addr + len)` along 4 KiB sector boundaries
#[derive(Debug, Clone)]
pub struct SectorSpans {
    addr: u32,
    offset: usize,
    remaining: usize,
}

impl SectorSpans {
    /// Iterate over the sectors touched by a write
    pub fn new(addr: u32, len: usize) -> Self {
        Self {
            addr,
            offset: 0,
            remaining: len,
        }
    }
}

impl Iterator for SectorSpans {
    type Item = SectorSpan;

    fn next(&mut self) -> Option<SectorSpan> {
        if self.remaining == 0 {
            return None;
        }
        let sector = EraseGranule::Sector4K.align(self.addr);
        let sector_offset = (self.addr - sector) as usize;
        let len = (SECTOR_SIZE - sector_offset).min(self.remaining);
        let span = SectorSpan {
            sector,
            sector_offset,
            offset: self.offset,
            len,
        };
        self.addr += len as u32;
        self.offset += len;
        self.remaining -= len;
        Some(span)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lens(addr: u32, len: usize) -> ([usize; 8], usize) {
        let mut out = [0; 8];
        let mut n = 0;
        for chunk in PageChunks::new(addr, len) {
            out[n] = chunk.len;
            n += 1;
        }
        (out, n)
    }

    #[test]
    fn test_page_chunks_aligned() {
        assert_eq!(lens(0x1000, 256), ([256, 0, 0, 0, 0, 0, 0, 0], 1));
        assert_eq!(lens(0x1000, 257), ([256, 1, 0, 0, 0, 0, 0, 0], 2));
    }

    #[test]
    fn test_page_chunks_unaligned() {
        assert_eq!(lens(0x10, 600), ([240, 256, 104, 0, 0, 0, 0, 0], 3));
        let last = PageChunks::new(0x10, 600).last().unwrap();
        assert_eq!(last.addr, 0x200);
        assert_eq!(last.offset, 496);
    }

    #[test]
    fn test_page_chunks_never_cross() {
        for chunk in PageChunks::new(0xF7, 2000) {
            let first_page = chunk.addr as usize / PAGE_SIZE;
            let last_page = (chunk.addr as usize + chunk.len - 1) / PAGE_SIZE;
            assert_eq!(first_page, last_page);
        }
    }

    #[test]
    fn test_sector_spans() {
        let spans: [SectorSpan; 2] = {
            let mut it = SectorSpans::new(0x0FF0, 0x20);
            [it.next().unwrap(), it.next().unwrap()]
        };
        assert_eq!(
            spans[0],
            SectorSpan {
                sector: 0,
                sector_offset: 0xFF0,
                offset: 0,
                len: 0x10
            }
        );
        assert_eq!(
            spans[1],
            SectorSpan {
                sector: 0x1000,
                sector_offset: 0,
                offset: 0x10,
                len: 0x10
            }
        );
    }

    #[test]
    fn test_largest_fitting() {
        assert_eq!(
            EraseGranule::largest_fitting(0x10000, 0x10000),
            Some(EraseGranule::Block64K)
        );
        assert_eq!(
            EraseGranule::largest_fitting(0x8000, 0x10000),
            Some(EraseGranule::Block32K)
        );
        assert_eq!(
            EraseGranule::largest_fitting(0x1000, 0x10000),
            Some(EraseGranule::Sector4K)
        );
        assert_eq!(EraseGranule::largest_fitting(0x1000, 0x800), None);
    }
}
