//! Byte-level W25Q128JW behavioural model
//!
//! The model sees the bus exactly as the flash pins would: chip select
//! edges, bytes shifted in and out at a given bus width, and dummy clocks.
//! Commands are decoded from the first byte after CS assert; writes take
//! effect at CS deassert like on the real part.

use heepflash_core::flash::{FLASH_SIZE, PAGE_SIZE, SECTOR_SIZE};
use heepflash_core::spi::{opcodes, Speed};

use crate::trace::{Transaction, Violation};

/// Configuration for the flash model
#[derive(Debug, Clone)]
pub struct FlashModelConfig {
    /// JEDEC manufacturer ID
    pub manufacturer_id: u8,
    /// JEDEC device ID (memory type, capacity)
    pub device_id: u16,
    /// Status register 1 reads that report BUSY after a program/erase/SR write
    pub busy_polls: u32,
    /// Never clear BUSY once set
    pub stuck_busy: bool,
    /// Dummy clocks expected between address and data of 0xEB
    pub quad_dummy_cycles: u32,
    /// Whether writes to the QE bit latch
    pub qe_writable: bool,
    /// Initial value of status register 2
    pub initial_sr2: u8,
    /// Start in deep power-down
    pub powered_down: bool,
}

impl Default for FlashModelConfig {
    fn default() -> Self {
        Self {
            manufacturer_id: 0xEF, // Winbond
            device_id: 0x6018,     // W25Q128JW
            busy_polls: 2,
            stuck_busy: false,
            quad_dummy_cycles: 8,
            qe_writable: true,
            initial_sr2: 0,
            powered_down: false,
        }
    }
}

/// Number of address bytes following an opcode
fn address_len(opcode: u8) -> u8 {
    match opcode {
        opcodes::READ
        | opcodes::PP
        | opcodes::QPP
        | opcodes::SE_20
        | opcodes::BE_52
        | opcodes::BE_D8 => 3,
        // Three address bytes plus the continuous-read mode byte
        opcodes::QIOR => 4,
        _ => 0,
    }
}

fn erase_size(opcode: u8) -> Option<usize> {
    match opcode {
        opcodes::SE_20 => Some(SECTOR_SIZE),
        opcodes::BE_52 => Some(32 * 1024),
        opcodes::BE_D8 => Some(64 * 1024),
        _ => None,
    }
}

#[derive(Debug)]
struct Active {
    opcode: Option<u8>,
    ignored: bool,
    addr: u32,
    addr_bytes: u8,
    /// Bytes shifted in after the address phase
    data_in: usize,
    /// Bytes shifted out after the address phase
    data_out: usize,
    /// Page latch for program commands
    latch: Option<Box<[u8; PAGE_SIZE]>>,
    /// Value captured by Write Status Register 2
    sr2_value: Option<u8>,
    /// Status register value captured at opcode time
    register: u8,
}

impl Active {
    fn new() -> Self {
        Self {
            opcode: None,
            ignored: false,
            addr: 0,
            addr_bytes: 0,
            data_in: 0,
            data_out: 0,
            latch: None,
            sr2_value: None,
            register: 0,
        }
    }
}

/// Emulated W25Q128JW
pub struct FlashModel {
    config: FlashModelConfig,
    data: Vec<u8>,
    wel: bool,
    busy: Option<u32>,
    sr2: u8,
    powered_down: bool,
    reset_armed: bool,
    active: Option<Active>,
    transactions: Vec<Transaction>,
    violations: Vec<Violation>,
}

impl FlashModel {
    /// Create an erased flash
    pub fn new(config: FlashModelConfig) -> Self {
        let data = vec![0xFF; FLASH_SIZE as usize];
        Self::with_data(config, data)
    }

    /// Create a flash from an existing image (padded with 0xFF)
    pub fn with_data(config: FlashModelConfig, mut data: Vec<u8>) -> Self {
        data.resize(FLASH_SIZE as usize, 0xFF);
        Self {
            sr2: config.initial_sr2,
            powered_down: config.powered_down,
            config,
            data,
            wel: false,
            busy: None,
            reset_armed: false,
            active: None,
            transactions: Vec::new(),
            violations: Vec::new(),
        }
    }

    /// Flash contents
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mutable flash contents (bypasses the protocol)
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Model configuration
    pub fn config(&self) -> &FlashModelConfig {
        &self.config
    }

    /// Every transaction seen since creation or the last [`Self::clear_trace`]
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Every protocol violation seen
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Forget recorded transactions and violations
    pub fn clear_trace(&mut self) {
        self.transactions.clear();
        self.violations.clear();
    }

    /// Current status register 1
    pub fn status1(&self) -> u8 {
        let mut sr1 = 0;
        if self.busy.is_some() {
            sr1 |= opcodes::SR1_BUSY;
        }
        if self.wel {
            sr1 |= opcodes::SR1_WEL;
        }
        sr1
    }

    /// Current status register 2
    pub fn status2(&self) -> u8 {
        self.sr2
    }

    /// Whether the model is in deep power-down
    pub fn is_powered_down(&self) -> bool {
        self.powered_down
    }

    /// Chip select asserted: a new transaction begins
    pub fn cs_assert(&mut self) {
        self.active = Some(Active::new());
        self.transactions.push(Transaction::default());
    }

    fn violation(&mut self, violation: Violation) {
        log::warn!("sim flash: {}", violation);
        self.violations.push(violation);
        if let Some(active) = self.active.as_mut() {
            active.ignored = true;
        }
        if let Some(t) = self.transactions.last_mut() {
            t.ignored = true;
        }
    }

    fn record(&mut self) -> &mut Transaction {
        if self.transactions.is_empty() {
            self.transactions.push(Transaction::default());
        }
        let last = self.transactions.len() - 1;
        &mut self.transactions[last]
    }

    fn start_busy(&mut self) {
        if self.config.stuck_busy {
            self.busy = Some(u32::MAX);
        } else if self.config.busy_polls > 0 {
            self.busy = Some(self.config.busy_polls);
        }
    }

    fn tick_busy(&mut self) {
        if self.config.stuck_busy {
            return;
        }
        self.busy = match self.busy {
            Some(n) if n > 1 => Some(n - 1),
            _ => None,
        };
    }

    fn decode_opcode(&mut self, opcode: u8, speed: Speed) {
        {
            let t = self.record();
            t.opcode = opcode;
            t.opcode_speed = speed;
        }
        if let Some(active) = self.active.as_mut() {
            active.opcode = Some(opcode);
        }
        if speed != Speed::Standard {
            self.violation(Violation::WrongSpeed {
                opcode,
                expected: Speed::Standard,
                actual: speed,
            });
            return;
        }

        let reset_armed = std::mem::take(&mut self.reset_armed);

        if self.powered_down && opcode != opcodes::RDP {
            self.violation(Violation::PoweredDown { opcode });
            return;
        }

        let allowed_while_busy = matches!(
            opcode,
            opcodes::RDSR1 | opcodes::RDSR2 | opcodes::RSTEN | opcodes::RST
        );
        if self.busy.is_some() && !allowed_while_busy {
            self.violation(Violation::WhileBusy { opcode });
            return;
        }

        match opcode {
            opcodes::RDSR1 => {
                let sr1 = self.status1();
                self.tick_busy();
                self.set_register(sr1);
            }
            opcodes::RDSR2 => {
                let sr2 = self.sr2;
                self.set_register(sr2);
            }
            opcodes::PP | opcodes::SE_20 | opcodes::BE_52 | opcodes::BE_D8 | opcodes::CE_C7
            | opcodes::WRSR2
                if !self.wel =>
            {
                self.violation(Violation::WriteNotEnabled { opcode });
            }
            opcodes::QPP | opcodes::QIOR if self.sr2 & opcodes::SR2_QE == 0 => {
                self.violation(Violation::QuadDisabled { opcode });
            }
            opcodes::QPP if !self.wel => {
                self.violation(Violation::WriteNotEnabled { opcode });
            }
            opcodes::RST if !reset_armed => {
                self.violation(Violation::ResetNotEnabled);
            }
            opcodes::WREN
            | opcodes::RDID
            | opcodes::READ
            | opcodes::QIOR
            | opcodes::PP
            | opcodes::QPP
            | opcodes::SE_20
            | opcodes::BE_52
            | opcodes::BE_D8
            | opcodes::CE_C7
            | opcodes::WRSR2
            | opcodes::DP
            | opcodes::RDP
            | opcodes::RSTEN
            | opcodes::RST => {}
            _ => self.violation(Violation::UnknownOpcode(opcode)),
        }
    }

    fn set_register(&mut self, value: u8) {
        if let Some(active) = self.active.as_mut() {
            active.register = value;
        }
    }

    /// A byte shifted into the flash
    pub fn write_byte(&mut self, byte: u8, speed: Speed) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        let Some(opcode) = active.opcode else {
            self.decode_opcode(byte, speed);
            return;
        };
        if active.ignored {
            return;
        }

        let needed = address_len(opcode);
        if active.addr_bytes < needed {
            if active.addr_bytes < 3 {
                active.addr = (active.addr << 8) | byte as u32;
            }
            active.addr_bytes += 1;
            let addr_done = active.addr_bytes == needed;
            let addr = active.addr;
            let expected = if opcode == opcodes::QIOR {
                Speed::Quad
            } else {
                Speed::Standard
            };
            {
                let t = self.record();
                t.address_speed = Some(speed);
                if addr_done {
                    t.address = Some(addr);
                }
            }
            if speed != expected {
                self.violation(Violation::WrongSpeed {
                    opcode,
                    expected,
                    actual: speed,
                });
            }
            return;
        }

        let index = active.data_in;
        active.data_in += 1;
        match opcode {
            opcodes::PP | opcodes::QPP => {
                let page_offset = active.addr as usize % PAGE_SIZE;
                let latch = active
                    .latch
                    .get_or_insert_with(|| Box::new([0xFF; PAGE_SIZE]));
                latch[(page_offset + index) % PAGE_SIZE] = byte;
                let expected = if opcode == opcodes::QPP {
                    Speed::Quad
                } else {
                    Speed::Standard
                };
                {
                    let t = self.record();
                    t.tx_bytes += 1;
                    t.data_speed = Some(speed);
                }
                if index == 0 && speed != expected {
                    self.violation(Violation::WrongSpeed {
                        opcode,
                        expected,
                        actual: speed,
                    });
                }
            }
            opcodes::WRSR2 => {
                if index == 0 {
                    active.sr2_value = Some(byte);
                }
                self.record().tx_bytes += 1;
            }
            _ => self.record().tx_bytes += 1,
        }
    }

    /// A byte shifted out of the flash
    pub fn read_byte(&mut self, speed: Speed) -> u8 {
        let expected_dummy = self.config.quad_dummy_cycles;
        let Some(active) = self.active.as_mut() else {
            return 0xFF;
        };
        let Some(opcode) = active.opcode else {
            return 0xFF;
        };
        if active.ignored || active.addr_bytes < address_len(opcode) {
            return 0xFF;
        }

        let index = active.data_out;
        active.data_out += 1;
        let byte = match opcode {
            opcodes::RDSR1 | opcodes::RDSR2 => active.register,
            opcodes::RDID => match index {
                0 => self.config.manufacturer_id,
                1 => (self.config.device_id >> 8) as u8,
                2 => self.config.device_id as u8,
                _ => 0xFF,
            },
            opcodes::READ | opcodes::QIOR => {
                let addr = (active.addr as usize + index) % self.data.len();
                self.data[addr]
            }
            _ => 0xFF,
        };

        let t = self.record();
        t.rx_bytes += 1;
        t.data_speed = Some(speed);
        let dummy = t.dummy_cycles;

        if index == 0 {
            if opcode == opcodes::QIOR && dummy != expected_dummy {
                self.violation(Violation::DummyCycles {
                    expected: expected_dummy,
                    actual: dummy,
                });
            }
            let expected = if opcode == opcodes::QIOR {
                Speed::Quad
            } else {
                Speed::Standard
            };
            if speed != expected {
                self.violation(Violation::WrongSpeed {
                    opcode,
                    expected,
                    actual: speed,
                });
            }
        }
        byte
    }

    /// Idle clocks with no data
    pub fn dummy(&mut self, cycles: u32) {
        if self.active.is_some() {
            self.record().dummy_cycles += cycles;
        }
    }

    /// Chip select released: commit the transaction
    pub fn cs_deassert(&mut self) {
        let Some(active) = self.active.take() else {
            return;
        };
        let Some(opcode) = active.opcode else {
            return;
        };
        log::trace!("sim flash: {:?}", self.transactions.last());
        if active.ignored {
            return;
        }
        let addr_complete = active.addr_bytes >= address_len(opcode);

        match opcode {
            opcodes::WREN => self.wel = true,
            opcodes::PP | opcodes::QPP => {
                if let (true, Some(latch)) = (addr_complete, active.latch) {
                    let page = active.addr as usize & !(PAGE_SIZE - 1);
                    for (dst, src) in self.data[page..page + PAGE_SIZE].iter_mut().zip(latch.iter()) {
                        *dst &= *src;
                    }
                    self.start_busy();
                }
                self.wel = false;
            }
            opcodes::SE_20 | opcodes::BE_52 | opcodes::BE_D8 => {
                if addr_complete {
                    if let Some(size) = erase_size(opcode) {
                        let start = active.addr as usize & !(size - 1);
                        self.data[start..start + size].fill(0xFF);
                        self.start_busy();
                    }
                } else {
                    self.violation(Violation::Truncated { opcode });
                }
                self.wel = false;
            }
            opcodes::CE_C7 => {
                self.data.fill(0xFF);
                self.wel = false;
                self.start_busy();
            }
            opcodes::WRSR2 => {
                if let Some(value) = active.sr2_value {
                    let mut value = value;
                    if !self.config.qe_writable {
                        value = (value & !opcodes::SR2_QE) | (self.sr2 & opcodes::SR2_QE);
                    }
                    self.sr2 = value;
                    self.start_busy();
                }
                self.wel = false;
            }
            opcodes::DP => self.powered_down = true,
            opcodes::RDP => self.powered_down = false,
            opcodes::RSTEN => self.reset_armed = true,
            opcodes::RST => {
                self.wel = false;
                self.busy = None;
            }
            _ => {}
        }
    }
}

impl core::fmt::Debug for FlashModel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FlashModel")
            .field("sr1", &self.status1())
            .field("sr2", &self.sr2)
            .field("powered_down", &self.powered_down)
            .field("transactions", &self.transactions.len())
            .field("violations", &self.violations.len())
            .finish()
    }
}
