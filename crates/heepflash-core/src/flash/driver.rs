//! W25Q128JW flash operation driver
//!
//! [`W25q128jw`] owns an SPI host (and optionally a DMA channel) and turns
//! byte-addressed read/write/erase requests into framed W25Q command
//! sequences. Every argument is checked before the first register access.

use crate::error::{Error, Result, WaitTarget};
use crate::host::{
    DmaChannel, DmaTransfer, FlashMode, NoDma, PollBudget, SocControl, SpiHost,
};
use crate::protocol;
use crate::spi::{opcodes, Command, Speed, COMMAND_MAX_LEN};
use maybe_async::maybe_async;

use super::config::DriverConfig;
use super::geometry::{
    EraseGranule, PageChunks, SectorSpans, FLASH_SIZE, PAGE_SIZE, SECTOR_SIZE,
};
use super::mode::{ReadMode, Transfer, WriteMode};

/// Chip select line the flash is wired to
pub const FLASH_CSID: u32 = 0;

#[repr(align(4))]
struct SectorBuffer([u8; SECTOR_SIZE]);

/// DMA source for one page, so the caller's buffer alignment never matters
#[repr(align(4))]
struct PageBuffer([u8; PAGE_SIZE]);

/// Check that `[addr, addr + len)` is a non-empty range inside the flash
fn check_range(addr: u32, len: usize) -> Result<()> {
    if len == 0 {
        return Err(Error::InvalidLength);
    }
    if (addr as u64).saturating_add(len as u64) > FLASH_SIZE as u64 {
        return Err(Error::AddressOutOfBounds);
    }
    Ok(())
}

/// Bus width of the data phase, only Standard and Quad are wired up
fn data_speed(speed: Speed) -> Speed {
    match speed {
        Speed::Quad => Speed::Quad,
        _ => Speed::Standard,
    }
}

/// W25Q128JW driver over an [`SpiHost`] and an optional [`DmaChannel`]
pub struct W25q128jw<H, D = NoDma> {
    host: H,
    dma: D,
    config: DriverConfig,
}

impl<H: SpiHost> W25q128jw<H, NoDma> {
    /// Create a driver that only uses polled transfers
    pub fn without_dma(host: H, config: DriverConfig) -> Self {
        Self::new(host, NoDma, config)
    }
}

impl<H: SpiHost, D: DmaChannel> W25q128jw<H, D> {
    /// Create a driver; call [`Self::init`] before anything else
    pub fn new(host: H, dma: D, config: DriverConfig) -> Self {
        Self { host, dma, config }
    }

    /// Active configuration
    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Borrow the SPI host
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Mutably borrow the SPI host
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Tear down the driver and give back the host and DMA channel
    pub fn release(self) -> (H, D) {
        (self.host, self.dma)
    }

    /// Largest read transaction, kept a whole number of words
    fn read_chunk_len(&self) -> usize {
        (self.host.max_segment_len().min(COMMAND_MAX_LEN) & !3).max(4)
    }

    /// Reject a DMA write up front so no page is left half programmed
    fn check_dma_source(&self, addr: u32, source: &[u8]) -> Result<()> {
        let xfer = DmaTransfer::to_fifo(self.host.tx_fifo_addr(), source);
        self.dma.check(&xfer).map_err(|e| {
            log::error!("DMA write rejected at {:#08x}: {}", addr, e);
            Error::Dma(e)
        })
    }
}

#[maybe_async]
impl<H: SpiHost, D: DmaChannel> W25q128jw<H, D> {
    /// Bring up the SPI host and the flash
    ///
    /// Refuses to run while the flash is memory mapped. Otherwise routes
    /// the pads to the SPI host, programs clock and chip-select timing,
    /// wakes the flash from power-down and sets the Quad Enable bit.
    pub async fn init<S: SocControl + ?Sized>(&mut self, soc: &mut S) -> Result<()> {
        if soc.spi_flash_mode() == FlashMode::MemoryMapped {
            log::error!("flash is memory mapped, refusing to drive it through the SPI host");
            return Err(Error::MemoryMappedMode);
        }
        soc.select_spi_host();

        self.host.set_enable(true);
        self.host.output_enable(true);

        let core_hz = soc.system_frequency_hz();
        let opts = self.config.configopts(core_hz);
        log::debug!(
            "flash: core {} Hz, clkdiv {}, SCK {} Hz",
            core_hz,
            opts.clkdiv,
            crate::spi::sck_hz(core_hz, opts.clkdiv)
        );
        self.host.set_configopts(FLASH_CSID, opts);
        self.host.set_csid(FLASH_CSID);

        self.power_up().await?;
        protocol::set_quad_enable(&mut self.host, &self.config.poll).await
    }

    /// Read `buf.len()` bytes starting at `addr`
    pub async fn read(&mut self, addr: u32, buf: &mut [u8], mode: ReadMode) -> Result<()> {
        check_range(addr, buf.len())?;
        log::debug!("flash: read {} bytes @ {:#08x} ({:?})", buf.len(), addr, mode);

        let chunk_len = self.read_chunk_len();
        let mut chunk_addr = addr;
        for chunk in buf.chunks_mut(chunk_len) {
            self.read_transaction(chunk_addr, chunk, mode).await?;
            chunk_addr += chunk.len() as u32;
        }
        Ok(())
    }

    async fn read_transaction(&mut self, addr: u32, buf: &mut [u8], mode: ReadMode) -> Result<()> {
        let limits = self.config.poll;
        let speed = data_speed(mode.speed);
        let dummy = self.config.quad_dummy_cycles;
        let len = buf.len();
        let (words, tail) = buf.split_at_mut(len & !3);

        match mode.transfer {
            Transfer::Dma if !words.is_empty() => {
                let mut xfer = DmaTransfer::from_fifo(self.host.rx_fifo_addr(), words);
                self.dma.launch(&mut xfer).map_err(|e| {
                    log::error!("DMA read rejected at {:#08x}: {}", addr, e);
                    Error::Dma(e)
                })?;
                protocol::start_read(&mut self.host, &limits, speed, dummy, addr, len)?;
                self.wait_dma(&mut xfer).await?;
            }
            _ => {
                protocol::start_read(&mut self.host, &limits, speed, dummy, addr, len)?;
                protocol::drain_words(&mut self.host, &limits, words)?;
            }
        }
        protocol::read_tail(&mut self.host, &limits, tail)
    }

    async fn wait_dma(&mut self, xfer: &mut DmaTransfer<'_>) -> Result<()> {
        let mut budget = PollBudget::new(self.config.poll.max_dma_polls);
        while budget.tick() {
            if self.dma.poll(xfer) {
                return Ok(());
            }
            self.dma.idle().await;
        }
        log::warn!(
            "DMA transfer not done after {} polls",
            self.config.poll.max_dma_polls
        );
        Err(Error::Timeout(WaitTarget::DmaDone))
    }

    /// Read using Read Data (0x03)
    pub async fn read_standard(&mut self, addr: u32, buf: &mut [u8]) -> Result<()> {
        self.read(addr, buf, ReadMode::STANDARD).await
    }

    /// Read using Fast Read Quad I/O (0xEB)
    pub async fn read_quad(&mut self, addr: u32, buf: &mut [u8]) -> Result<()> {
        self.read(addr, buf, ReadMode::QUAD).await
    }

    /// Read using Read Data (0x03), words moved by DMA
    pub async fn read_standard_dma(&mut self, addr: u32, buf: &mut [u8]) -> Result<()> {
        self.read(addr, buf, ReadMode::STANDARD_DMA).await
    }

    /// Read using Fast Read Quad I/O (0xEB), words moved by DMA
    pub async fn read_quad_dma(&mut self, addr: u32, buf: &mut [u8]) -> Result<()> {
        self.read(addr, buf, ReadMode::QUAD_DMA).await
    }

    /// Program `data` at `addr`, one page at a time
    ///
    /// The target range must already be erased; programming can only clear
    /// bits. See [`Self::erase_and_write`] for a read-modify-write variant.
    /// DMA modes stage each page in an aligned buffer, so `data` may sit at
    /// any address.
    pub async fn write(&mut self, addr: u32, data: &[u8], mode: WriteMode) -> Result<()> {
        check_range(addr, data.len())?;
        let mut page = PageBuffer([0; PAGE_SIZE]);
        if mode.transfer == Transfer::Dma {
            self.check_dma_source(addr, &page.0)?;
        }
        log::debug!("flash: write {} bytes @ {:#08x} ({:?})", data.len(), addr, mode);

        let limits = self.config.poll;
        let opcode = mode.opcode();
        let speed = data_speed(mode.speed);

        for chunk in PageChunks::new(addr, data.len()) {
            let bytes = &data[chunk.offset..chunk.offset + chunk.len];
            match mode.transfer {
                Transfer::Polled => {
                    protocol::program_page(&mut self.host, &limits, opcode, speed, chunk.addr, bytes)
                        .await?;
                }
                Transfer::Dma => {
                    // Whole words go through the aligned page buffer, the tail via the CPU
                    let whole = chunk.len & !3;
                    page.0[..whole].copy_from_slice(&bytes[..whole]);
                    protocol::start_page_program(&mut self.host, &limits, opcode, chunk.addr)?;
                    if whole > 0 {
                        let mut xfer =
                            DmaTransfer::to_fifo(self.host.tx_fifo_addr(), &page.0[..whole]);
                        self.dma.launch(&mut xfer).map_err(Error::Dma)?;
                        self.wait_dma(&mut xfer).await?;
                    }
                    protocol::push_data(&mut self.host, &limits, &bytes[whole..])?;
                    protocol::issue(&mut self.host, &limits, Command::tx(chunk.len, speed, false))?;
                    protocol::wait_idle(&mut self.host, &limits).await?;
                }
            }
        }
        Ok(())
    }

    /// Program with Page Program (0x02)
    pub async fn write_standard(&mut self, addr: u32, data: &[u8]) -> Result<()> {
        self.write(addr, data, WriteMode::STANDARD).await
    }

    /// Program with Quad Page Program (0x32)
    pub async fn write_quad(&mut self, addr: u32, data: &[u8]) -> Result<()> {
        self.write(addr, data, WriteMode::QUAD).await
    }

    /// Program with Page Program (0x02), words fed by DMA
    pub async fn write_standard_dma(&mut self, addr: u32, data: &[u8]) -> Result<()> {
        self.write(addr, data, WriteMode::STANDARD_DMA).await
    }

    /// Program with Quad Page Program (0x32), words fed by DMA
    pub async fn write_quad_dma(&mut self, addr: u32, data: &[u8]) -> Result<()> {
        self.write(addr, data, WriteMode::QUAD_DMA).await
    }

    /// Write `data` at `addr` regardless of the current contents
    ///
    /// Every 4 KiB sector touched is read, patched, erased and written back,
    /// so bytes outside `[addr, addr + data.len())` are preserved. Sectors
    /// fully covered by `data` skip the read.
    pub async fn erase_and_write(&mut self, addr: u32, data: &[u8], mode: WriteMode) -> Result<()> {
        check_range(addr, data.len())?;
        let mut sector = SectorBuffer([0; SECTOR_SIZE]);
        if mode.transfer == Transfer::Dma {
            self.check_dma_source(addr, &sector.0)?;
        }
        log::debug!(
            "flash: erase and write {} bytes @ {:#08x} ({:?})",
            data.len(),
            addr,
            mode
        );

        let read_mode = ReadMode::new(mode.speed, mode.transfer);

        for span in SectorSpans::new(addr, data.len()) {
            if span.len < SECTOR_SIZE {
                self.read(span.sector, &mut sector.0, read_mode).await?;
            }
            sector.0[span.sector_offset..span.sector_offset + span.len]
                .copy_from_slice(&data[span.offset..span.offset + span.len]);
            self.erase_4k(span.sector).await?;
            self.write(span.sector, &sector.0, mode).await?;
        }
        Ok(())
    }

    /// [`Self::erase_and_write`] with Page Program (0x02)
    pub async fn erase_and_write_standard(&mut self, addr: u32, data: &[u8]) -> Result<()> {
        self.erase_and_write(addr, data, WriteMode::STANDARD).await
    }

    /// [`Self::erase_and_write`] with Quad Page Program (0x32)
    pub async fn erase_and_write_quad(&mut self, addr: u32, data: &[u8]) -> Result<()> {
        self.erase_and_write(addr, data, WriteMode::QUAD).await
    }

    async fn erase_granule(&mut self, granule: EraseGranule, addr: u32) -> Result<()> {
        if addr >= FLASH_SIZE {
            return Err(Error::AddressOutOfBounds);
        }
        let start = granule.align(addr);
        log::debug!("flash: erase {} KiB @ {:#08x}", granule.size() / 1024, start);
        protocol::erase(&mut self.host, &self.config.poll, granule.opcode(), start).await
    }

    /// Erase the 4 KiB sector containing `addr`
    pub async fn erase_4k(&mut self, addr: u32) -> Result<()> {
        self.erase_granule(EraseGranule::Sector4K, addr).await
    }

    /// Erase the 32 KiB block containing `addr`
    pub async fn erase_32k(&mut self, addr: u32) -> Result<()> {
        self.erase_granule(EraseGranule::Block32K, addr).await
    }

    /// Erase the 64 KiB block containing `addr`
    pub async fn erase_64k(&mut self, addr: u32) -> Result<()> {
        self.erase_granule(EraseGranule::Block64K, addr).await
    }

    /// Erase the whole chip
    pub async fn erase_chip(&mut self) -> Result<()> {
        log::debug!("flash: chip erase");
        protocol::chip_erase(&mut self.host, &self.config.poll).await
    }

    /// Erase a sector-aligned range with the largest granules that fit
    pub async fn erase_range(&mut self, addr: u32, len: usize) -> Result<()> {
        check_range(addr, len)?;
        if addr as usize % SECTOR_SIZE != 0 || len % SECTOR_SIZE != 0 {
            return Err(Error::InvalidAlignment);
        }

        let mut addr = addr;
        let mut remaining = len;
        while remaining > 0 {
            let granule =
                EraseGranule::largest_fitting(addr, remaining).ok_or(Error::InvalidAlignment)?;
            self.erase_granule(granule, addr).await?;
            addr += granule.size() as u32;
            remaining -= granule.size();
        }
        Ok(())
    }

    /// Wait for the flash to go idle, then reset it
    pub async fn reset(&mut self) -> Result<()> {
        protocol::wait_idle(&mut self.host, &self.config.poll).await?;
        self.reset_force().await
    }

    /// Reset the flash without waiting for a running operation
    pub async fn reset_force(&mut self) -> Result<()> {
        log::debug!("flash: reset");
        protocol::software_reset(&mut self.host, &self.config.poll).await?;
        protocol::wait_idle(&mut self.host, &self.config.poll).await
    }

    /// Enter deep power-down (only Release Power-Down is accepted afterwards)
    pub async fn power_down(&mut self) -> Result<()> {
        log::debug!("flash: power down");
        protocol::power_down(&mut self.host, &self.config.poll)
    }

    /// Release from deep power-down
    pub async fn power_up(&mut self) -> Result<()> {
        log::debug!("flash: power up");
        protocol::power_up(&mut self.host, &self.config.poll).await
    }

    /// Read status register 1
    pub async fn read_status1(&mut self) -> Result<u8> {
        protocol::read_status1(&mut self.host, &self.config.poll)
    }

    /// Read status register 2
    pub async fn read_status2(&mut self) -> Result<u8> {
        protocol::read_status2(&mut self.host, &self.config.poll)
    }

    /// Whether an erase/program/status write is in progress
    pub async fn is_busy(&mut self) -> Result<bool> {
        Ok(self.read_status1().await? & opcodes::SR1_BUSY != 0)
    }

    /// Whether the Quad Enable bit is set
    pub async fn quad_enabled(&mut self) -> Result<bool> {
        Ok(self.read_status2().await? & opcodes::SR2_QE != 0)
    }

    /// Read the JEDEC ID as (manufacturer, device)
    pub async fn read_jedec_id(&mut self) -> Result<(u8, u16)> {
        protocol::read_jedec_id(&mut self.host, &self.config.poll)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_range() {
        assert_eq!(check_range(0, 0), Err(Error::InvalidLength));
        assert_eq!(check_range(0, 1), Ok(()));
        assert_eq!(check_range(FLASH_SIZE - 1, 1), Ok(()));
        assert_eq!(check_range(FLASH_SIZE - 1, 2), Err(Error::AddressOutOfBounds));
        assert_eq!(check_range(FLASH_SIZE, 1), Err(Error::AddressOutOfBounds));
        assert_eq!(check_range(u32::MAX, usize::MAX), Err(Error::AddressOutOfBounds));
    }
}
