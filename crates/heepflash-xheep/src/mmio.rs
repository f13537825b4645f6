//! Volatile register block access

/// A block of 32-bit memory-mapped registers
#[derive(Debug)]
pub struct Mmio {
    base: usize,
}

impl Mmio {
    /// Wrap the register block at `base`
    ///
    /// # Safety
    ///
    /// The caller must ensure that:
    /// - `base` is the word-aligned address of a register block
    /// - No other code is accessing the same block
    pub const unsafe fn new(base: usize) -> Self {
        Self { base }
    }

    /// Base address of the block
    pub fn base(&self) -> usize {
        self.base
    }

    /// Address of the register at `offset`
    pub fn addr(&self, offset: usize) -> usize {
        self.base + offset
    }

    /// Read a 32-bit register
    #[inline]
    pub fn read32(&self, offset: usize) -> u32 {
        debug_assert!(offset & 3 == 0, "unaligned 32-bit read");
        // SAFETY: `new` requires `base` to point at a register block we own
        unsafe { core::ptr::read_volatile((self.base + offset) as *const u32) }
    }

    /// Write a 32-bit register
    #[inline]
    pub fn write32(&self, offset: usize, value: u32) {
        debug_assert!(offset & 3 == 0, "unaligned 32-bit write");
        // SAFETY: see `read32`
        unsafe { core::ptr::write_volatile((self.base + offset) as *mut u32, value) }
    }

    /// Read-modify-write the bits in `mask`
    #[inline]
    pub fn modify32(&self, offset: usize, mask: u32, value: u32) {
        let old = self.read32(offset);
        self.write32(offset, (old & !mask) | (value & mask));
    }
}
