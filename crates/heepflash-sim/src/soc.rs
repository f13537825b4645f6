//! Simulated SoC control block

use heepflash_core::host::{FlashMode, SocControl};

/// Simulated SoC control registers relevant to the flash
#[derive(Debug, Clone)]
pub struct SimSocCtrl {
    mode: FlashMode,
    system_hz: u32,
    host_selected: bool,
}

impl SimSocCtrl {
    /// SoC running at `system_hz` with the flash behind the SPI host
    pub fn new(system_hz: u32) -> Self {
        Self {
            mode: FlashMode::SpiHost,
            system_hz,
            host_selected: false,
        }
    }

    /// SoC booted in execute-in-place mode
    pub fn memory_mapped(system_hz: u32) -> Self {
        Self {
            mode: FlashMode::MemoryMapped,
            ..Self::new(system_hz)
        }
    }

    /// Whether [`SocControl::select_spi_host`] was called
    pub fn host_selected(&self) -> bool {
        self.host_selected
    }
}

impl SocControl for SimSocCtrl {
    fn spi_flash_mode(&self) -> FlashMode {
        self.mode
    }

    fn select_spi_host(&mut self) {
        self.host_selected = true;
    }

    fn system_frequency_hz(&self) -> u32 {
        self.system_hz
    }
}
