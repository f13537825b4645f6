//! Behavioural model of the SPI host FIFOs and command queue
//!
//! Segments execute lazily: every status read, command push or FIFO access
//! lets the bus make as much progress as the FIFOs allow. An RX segment
//! stalls while the RX FIFO is full, a TX segment stalls while the TX FIFO
//! is empty, exactly like the hardware holds SCK.

use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;

use heapless::Deque;
use heepflash_core::host::{HostStatus, SpiHost, StatusFlags};
use heepflash_core::spi::{Command, ConfigOpts, Direction};

use crate::model::FlashModel;

/// Command FIFO depth
pub const CMD_FIFO_DEPTH: usize = 4;
/// TX FIFO depth in words
pub const TX_FIFO_DEPTH: usize = 72;
/// RX FIFO depth in words
pub const RX_FIFO_DEPTH: usize = 64;

/// Fake bus address of the RXDATA window
pub const RXDATA_ADDR: usize = 0x2002_0024;
/// Fake bus address of the TXDATA window
pub const TXDATA_ADDR: usize = 0x2002_0028;

/// Segment currently being clocked out
#[derive(Debug)]
struct Segment {
    command: Command,
    remaining: usize,
}

/// Shared state behind [`SimSpiHost`] and [`crate::SimDma`]
pub struct SimBus {
    pub(crate) flash: FlashModel,
    enabled: bool,
    output_enabled: bool,
    csid: u32,
    configopts: [ConfigOpts; 2],
    rx_watermark: u8,
    cmd: Deque<Command, CMD_FIFO_DEPTH>,
    tx: Deque<u32, TX_FIFO_DEPTH>,
    rx: Deque<u32, RX_FIFO_DEPTH>,
    segment: Option<Segment>,
    /// Word being shifted out and bytes of it already used
    tx_word: Option<([u8; 4], usize)>,
    /// Bytes received but not yet pushed as a word
    rx_pack: ([u8; 4], usize),
    cs_asserted: bool,
    rx_stalled: bool,
    tx_stalled: bool,
    error: bool,
    segments_executed: usize,
}

impl SimBus {
    fn new(flash: FlashModel) -> Self {
        Self {
            flash,
            enabled: false,
            output_enabled: false,
            csid: 0,
            configopts: [ConfigOpts::default(); 2],
            rx_watermark: 0,
            cmd: Deque::new(),
            tx: Deque::new(),
            rx: Deque::new(),
            segment: None,
            tx_word: None,
            rx_pack: ([0; 4], 0),
            cs_asserted: false,
            rx_stalled: false,
            tx_stalled: false,
            error: false,
            segments_executed: 0,
        }
    }

    fn flag_error(&mut self, what: &str) {
        log::warn!("sim spi_host: {}", what);
        self.error = true;
    }

    /// Push a packed RX word, false if the FIFO is full
    fn flush_rx(&mut self) -> bool {
        let (bytes, count) = self.rx_pack;
        if count == 0 {
            return true;
        }
        if self.rx.push_back(u32::from_le_bytes(bytes)).is_err() {
            return false;
        }
        self.rx_pack = ([0; 4], 0);
        true
    }

    fn next_tx_byte(&mut self) -> Option<u8> {
        if self.tx_word.is_none() {
            let word = self.tx.pop_front()?;
            self.tx_word = Some((word.to_le_bytes(), 0));
        }
        let (bytes, used) = self.tx_word.as_mut()?;
        let byte = bytes[*used];
        *used += 1;
        if *used == 4 {
            self.tx_word = None;
        }
        Some(byte)
    }

    /// Run queued segments until one stalls or the queue is empty
    pub(crate) fn pump(&mut self) {
        if !self.enabled {
            return;
        }
        self.rx_stalled = false;
        self.tx_stalled = false;

        loop {
            if self.segment.is_none() {
                let Some(command) = self.cmd.pop_front() else {
                    return;
                };
                if !self.cs_asserted {
                    self.flash.cs_assert();
                    self.cs_asserted = true;
                }
                self.segment = Some(Segment {
                    command,
                    remaining: command.count(),
                });
            }

            let Some(segment) = self.segment.as_mut() else {
                return;
            };
            let command = segment.command;

            match command.direction {
                Direction::Dummy => {
                    self.flash.dummy(segment.remaining as u32);
                    segment.remaining = 0;
                }
                Direction::TxOnly | Direction::Bidir => {
                    while self.segment.as_ref().is_some_and(|s| s.remaining > 0) {
                        if command.direction == Direction::Bidir && self.rx_pack.1 == 4 && !self.flush_rx() {
                            self.rx_stalled = true;
                            return;
                        }
                        let Some(byte) = self.next_tx_byte() else {
                            self.tx_stalled = true;
                            return;
                        };
                        self.flash.write_byte(byte, command.speed);
                        if command.direction == Direction::Bidir {
                            let (bytes, count) = &mut self.rx_pack;
                            bytes[*count] = self.flash.read_byte(command.speed);
                            *count += 1;
                        }
                        if let Some(s) = self.segment.as_mut() {
                            s.remaining -= 1;
                        }
                    }
                    // Unused bytes of the last word never reach the wire
                    self.tx_word = None;
                }
                Direction::RxOnly => {
                    while self.segment.as_ref().is_some_and(|s| s.remaining > 0) {
                        if self.rx_pack.1 == 4 && !self.flush_rx() {
                            self.rx_stalled = true;
                            return;
                        }
                        let byte = self.flash.read_byte(command.speed);
                        let (bytes, count) = &mut self.rx_pack;
                        bytes[*count] = byte;
                        *count += 1;
                        if let Some(s) = self.segment.as_mut() {
                            s.remaining -= 1;
                        }
                    }
                }
            }

            if matches!(command.direction, Direction::RxOnly | Direction::Bidir) && !self.flush_rx() {
                self.rx_stalled = true;
                return;
            }

            self.segment = None;
            self.segments_executed += 1;
            if !command.csaat {
                self.flash.cs_deassert();
                self.cs_asserted = false;
            }
        }
    }

    fn status(&self) -> HostStatus {
        let mut flags = StatusFlags::empty();
        if self.enabled && !self.cmd.is_full() {
            flags |= StatusFlags::READY;
        }
        if self.segment.is_some() || !self.cmd.is_empty() {
            flags |= StatusFlags::ACTIVE;
        }
        if self.rx.len() >= self.rx_watermark as usize {
            flags |= StatusFlags::RXWM;
        }
        if self.rx.is_empty() {
            flags |= StatusFlags::RXEMPTY;
        }
        if self.rx.is_full() {
            flags |= StatusFlags::RXFULL;
        }
        if self.rx_stalled {
            flags |= StatusFlags::RXSTALL;
        }
        if self.tx.is_empty() {
            flags |= StatusFlags::TXEMPTY;
        }
        if self.tx.is_full() {
            flags |= StatusFlags::TXFULL;
        }
        if self.tx_stalled {
            flags |= StatusFlags::TXSTALL;
        }
        HostStatus {
            flags,
            tx_depth: self.tx.len() as u8,
            rx_depth: self.rx.len() as u8,
            cmd_depth: self.cmd.len() as u8,
        }
    }

    /// Move one RX word to a DMA destination
    pub(crate) fn pop_rx(&mut self) -> Option<u32> {
        self.pump();
        let word = self.rx.pop_front();
        self.pump();
        word
    }

    /// Accept one TX word from a DMA source, false if the FIFO is full
    pub(crate) fn push_tx(&mut self, word: u32) -> bool {
        self.pump();
        let accepted = self.tx.push_back(word).is_ok();
        self.pump();
        accepted
    }
}

/// Simulated SPI host
///
/// Cloning gives another handle onto the same bus, which is how tests keep
/// access to the flash model while the driver owns the host.
#[derive(Clone)]
pub struct SimSpiHost {
    bus: Rc<RefCell<SimBus>>,
}

impl SimSpiHost {
    /// Attach a flash model to a fresh SPI host
    pub fn new(flash: FlashModel) -> Self {
        Self {
            bus: Rc::new(RefCell::new(SimBus::new(flash))),
        }
    }

    pub(crate) fn bus(&self) -> Rc<RefCell<SimBus>> {
        Rc::clone(&self.bus)
    }

    /// Borrow the flash model
    pub fn flash(&self) -> Ref<'_, FlashModel> {
        Ref::map(self.bus.borrow(), |bus| &bus.flash)
    }

    /// Mutably borrow the flash model
    pub fn flash_mut(&self) -> RefMut<'_, FlashModel> {
        RefMut::map(self.bus.borrow_mut(), |bus| &mut bus.flash)
    }

    /// CONFIGOPTS programmed for a chip select line
    pub fn configopts(&self, csid: u32) -> ConfigOpts {
        self.bus.borrow().configopts[csid as usize % 2]
    }

    /// Whether the host and its outputs are enabled
    pub fn is_enabled(&self) -> bool {
        let bus = self.bus.borrow();
        bus.enabled && bus.output_enabled
    }

    /// Selected chip select line
    pub fn csid(&self) -> u32 {
        self.bus.borrow().csid
    }

    /// Number of command segments run to completion
    pub fn segments_executed(&self) -> usize {
        self.bus.borrow().segments_executed
    }
}

impl SpiHost for SimSpiHost {
    fn set_enable(&mut self, enable: bool) {
        self.bus.borrow_mut().enabled = enable;
    }

    fn output_enable(&mut self, enable: bool) {
        self.bus.borrow_mut().output_enabled = enable;
    }

    fn set_configopts(&mut self, csid: u32, opts: ConfigOpts) {
        let mut bus = self.bus.borrow_mut();
        match bus.configopts.get_mut(csid as usize) {
            Some(slot) => *slot = opts,
            None => bus.flag_error("CONFIGOPTS for missing chip select"),
        }
    }

    fn set_csid(&mut self, csid: u32) {
        self.bus.borrow_mut().csid = csid;
    }

    fn set_rx_watermark(&mut self, words: u8) {
        self.bus.borrow_mut().rx_watermark = words;
    }

    fn write_word(&mut self, word: u32) {
        let mut bus = self.bus.borrow_mut();
        bus.pump();
        if bus.tx.push_back(word).is_err() {
            bus.flag_error("TX FIFO overflow");
        }
    }

    fn read_word(&mut self) -> u32 {
        let mut bus = self.bus.borrow_mut();
        bus.pump();
        let word = match bus.rx.pop_front() {
            Some(word) => word,
            None => {
                bus.flag_error("RX FIFO underflow");
                0
            }
        };
        bus.pump();
        word
    }

    fn set_command(&mut self, command: Command) {
        let mut bus = self.bus.borrow_mut();
        if !bus.enabled {
            bus.flag_error("command while disabled");
            return;
        }
        if bus.cmd.push_back(command).is_err() {
            bus.flag_error("command FIFO overflow");
            return;
        }
        bus.pump();
    }

    fn status(&mut self) -> HostStatus {
        let mut bus = self.bus.borrow_mut();
        bus.pump();
        bus.status()
    }

    fn has_error(&mut self) -> bool {
        self.bus.borrow().error
    }

    fn tx_fifo_depth(&self) -> usize {
        TX_FIFO_DEPTH
    }

    fn rx_fifo_depth(&self) -> usize {
        RX_FIFO_DEPTH
    }

    fn rx_fifo_addr(&self) -> usize {
        RXDATA_ADDR
    }

    fn tx_fifo_addr(&self) -> usize {
        TXDATA_ADDR
    }

    fn delay_us(&mut self, _us: u32) {
        // No delay needed for an in-memory model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FlashModelConfig;
    use heepflash_core::spi::{opcodes, Speed};

    fn host() -> SimSpiHost {
        let mut host = SimSpiHost::new(FlashModel::new(FlashModelConfig::default()));
        host.set_enable(true);
        host.output_enable(true);
        host
    }

    #[test]
    fn test_rx_packs_little_endian() {
        let mut host = host();
        host.write_word(opcodes::RDID as u32);
        host.set_command(Command::tx(1, Speed::Standard, true));
        host.set_command(Command::rx(3, Speed::Standard, false));
        host.set_rx_watermark(1);
        assert!(host.status().rx_watermark());
        assert_eq!(host.read_word(), 0x0018_60EF);
        assert!(!host.has_error());
    }

    #[test]
    fn test_tx_stalls_until_data() {
        let mut host = host();
        host.set_command(Command::tx(1, Speed::Standard, false));
        let status = host.status();
        assert!(status.flags.contains(StatusFlags::TXSTALL));
        assert_eq!(host.flash().transactions().len(), 1);
        host.write_word(opcodes::WREN as u32);
        let status = host.status();
        assert!(!status.flags.contains(StatusFlags::ACTIVE));
        assert_ne!(host.flash().status1() & opcodes::SR1_WEL, 0);
    }

    #[test]
    fn test_rx_stalls_when_full() {
        let mut host = host();
        host.write_word(0x0000_0003);
        host.set_command(Command::tx(4, Speed::Standard, true));
        host.set_command(Command::rx(512, Speed::Standard, false));
        let status = host.status();
        assert_eq!(status.rx_depth as usize, RX_FIFO_DEPTH);
        assert!(status.flags.contains(StatusFlags::RXSTALL));
        for _ in 0..128 {
            assert_eq!(host.read_word(), 0xFFFF_FFFF);
        }
        assert!(!host.status().flags.contains(StatusFlags::ACTIVE));
        assert!(!host.has_error());
    }

    #[test]
    fn test_underflow_flags_error() {
        let mut host = host();
        host.read_word();
        assert!(host.has_error());
    }
}
