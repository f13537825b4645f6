//! SoC control block

use heepflash_core::host::{FlashMode, SocControl};

use crate::mmio::Mmio;
use crate::regs::*;

/// X-HEEP SoC control registers
#[derive(Debug)]
pub struct XheepSocCtrl {
    regs: Mmio,
}

impl XheepSocCtrl {
    /// Bind the SoC control block at `base`
    ///
    /// # Safety
    ///
    /// `base` must be the address of the SoC control register block.
    pub unsafe fn new(base: usize) -> Self {
        Self {
            regs: unsafe { Mmio::new(base) },
        }
    }

    /// Bind the SoC control block at its default address
    ///
    /// # Safety
    ///
    /// See [`XheepSocCtrl::new`].
    pub unsafe fn default_base() -> Self {
        unsafe { Self::new(SOC_CTRL_BASE) }
    }

    /// Boot select strap (0: JTAG, 1: flash)
    pub fn boot_select(&self) -> u32 {
        self.regs.read32(SOC_CTRL_BOOT_SELECT)
    }

    /// Route the SPI pads to the SPI host or back to the memory controller
    pub fn set_spi_memio(&mut self, memory_mapped: bool) {
        self.regs
            .write32(SOC_CTRL_USE_SPIMEMIO, memory_mapped as u32);
    }
}

impl SocControl for XheepSocCtrl {
    fn spi_flash_mode(&self) -> FlashMode {
        if self.regs.read32(SOC_CTRL_USE_SPIMEMIO) & 1 != 0 {
            FlashMode::MemoryMapped
        } else {
            FlashMode::SpiHost
        }
    }

    fn select_spi_host(&mut self) {
        self.set_spi_memio(false);
    }

    fn system_frequency_hz(&self) -> u32 {
        self.regs.read32(SOC_CTRL_SYSTEM_FREQUENCY_HZ)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flash_mode() {
        let mut regs = [0u32; 8];
        regs[SOC_CTRL_USE_SPIMEMIO / 4] = 1;
        regs[SOC_CTRL_SYSTEM_FREQUENCY_HZ / 4] = 100_000_000;
        let regs_ptr = regs.as_mut_ptr();
        let mut soc = unsafe { XheepSocCtrl::new(regs_ptr as usize) };

        assert_eq!(soc.spi_flash_mode(), FlashMode::MemoryMapped);
        assert_eq!(soc.system_frequency_hz(), 100_000_000);
        soc.select_spi_host();
        assert_eq!(soc.spi_flash_mode(), FlashMode::SpiHost);
        drop(soc);
        assert_eq!(regs[SOC_CTRL_USE_SPIMEMIO / 4], 0);
    }
}
