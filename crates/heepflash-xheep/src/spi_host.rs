//! SPI host register driver

use heepflash_core::host::{HostStatus, SpiHost};
use heepflash_core::spi::{Command, ConfigOpts};
use maybe_async::maybe_async;

use crate::mmio::Mmio;
use crate::regs::*;

/// Loop iterations per microsecond are derived assuming this many core
/// cycles per iteration of the delay loop.
const DELAY_LOOP_CYCLES: u32 = 4;

/// The X-HEEP SPI host wired to the boot flash
#[derive(Debug)]
pub struct XheepSpiHost {
    regs: Mmio,
    core_hz: u32,
}

impl XheepSpiHost {
    /// Bind the SPI host at `base`
    ///
    /// `core_hz` is only used to calibrate [`SpiHost::delay_us`].
    ///
    /// # Safety
    ///
    /// `base` must be the address of an SPI host register block that is
    /// not driven by anything else for the lifetime of this value.
    pub unsafe fn new(base: usize, core_hz: u32) -> Self {
        Self {
            regs: unsafe { Mmio::new(base) },
            core_hz,
        }
    }

    /// Bind the flash SPI host at its default address
    ///
    /// # Safety
    ///
    /// See [`XheepSpiHost::new`].
    pub unsafe fn flash(core_hz: u32) -> Self {
        unsafe { Self::new(SPI_FLASH_BASE, core_hz) }
    }

    /// Pulse the software reset bit, flushing FIFOs and the command queue
    pub fn sw_reset(&mut self) {
        self.regs
            .modify32(SPI_HOST_CONTROL, CONTROL_SW_RST, CONTROL_SW_RST);
        self.regs.modify32(SPI_HOST_CONTROL, CONTROL_SW_RST, 0);
    }

    /// Raw ERROR_STATUS word
    pub fn error_status(&self) -> u32 {
        self.regs.read32(SPI_HOST_ERROR_STATUS)
    }

    /// Clear latched errors
    pub fn clear_errors(&mut self) {
        let status = self.error_status();
        self.regs.write32(SPI_HOST_ERROR_STATUS, status);
    }

    /// Update the delay calibration after a clock change
    pub fn set_core_hz(&mut self, core_hz: u32) {
        self.core_hz = core_hz;
    }

    fn spin(&self, us: u32) {
        let per_us = (self.core_hz / 1_000_000 / DELAY_LOOP_CYCLES).max(1);
        for _ in 0..us.saturating_mul(per_us) {
            core::hint::spin_loop();
        }
    }
}

#[maybe_async(AFIT)]
impl SpiHost for XheepSpiHost {
    fn set_enable(&mut self, enable: bool) {
        let value = if enable { CONTROL_SPIEN } else { 0 };
        self.regs.modify32(SPI_HOST_CONTROL, CONTROL_SPIEN, value);
    }

    fn output_enable(&mut self, enable: bool) {
        let value = if enable { CONTROL_OUTPUT_EN } else { 0 };
        self.regs.modify32(SPI_HOST_CONTROL, CONTROL_OUTPUT_EN, value);
    }

    fn set_configopts(&mut self, csid: u32, opts: ConfigOpts) {
        if csid >= SPI_FLASH_NUM_CS {
            log::warn!("xheep spi: no chip select {}, configopts ignored", csid);
            return;
        }
        self.regs
            .write32(SPI_HOST_CONFIGOPTS + 4 * csid as usize, opts.encode());
    }

    fn set_csid(&mut self, csid: u32) {
        self.regs.write32(SPI_HOST_CSID, csid);
    }

    fn set_rx_watermark(&mut self, words: u8) {
        self.regs
            .modify32(SPI_HOST_CONTROL, CONTROL_RX_WATERMARK_MASK, words as u32);
    }

    fn write_word(&mut self, word: u32) {
        self.regs.write32(SPI_HOST_TXDATA, word);
    }

    fn read_word(&mut self) -> u32 {
        self.regs.read32(SPI_HOST_RXDATA)
    }

    fn set_command(&mut self, command: Command) {
        self.regs.write32(SPI_HOST_COMMAND, command.encode());
    }

    fn status(&mut self) -> HostStatus {
        HostStatus::from_register(self.regs.read32(SPI_HOST_STATUS))
    }

    fn has_error(&mut self) -> bool {
        self.error_status() != 0
    }

    fn tx_fifo_depth(&self) -> usize {
        SPI_HOST_TX_DEPTH
    }

    fn rx_fifo_depth(&self) -> usize {
        SPI_HOST_RX_DEPTH
    }

    fn rx_fifo_addr(&self) -> usize {
        self.regs.addr(SPI_HOST_RXDATA)
    }

    fn tx_fifo_addr(&self) -> usize {
        self.regs.addr(SPI_HOST_TXDATA)
    }

    async fn delay_us(&mut self, us: u32) {
        self.spin(us);
    }
}
