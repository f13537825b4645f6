//! W25Q128JW command sequences over the SPI host
//!
//! Each function here issues one complete flash command as a sequence of
//! SPI host segments. Segments that continue the same flash transaction
//! keep chip select asserted (`csaat`); the last segment releases it.
//!
//! Uses `maybe_async` to support both sync and async modes. Only the
//! sequences that sleep between polls are async; pure FIFO and command
//! queue traffic never waits on anything but the host's own status.

use crate::error::{Error, Result, WaitTarget};
use crate::host::{wait_ready, wait_rx_watermark, wait_tx_space, PollBudget, PollLimits, SpiHost};
use crate::spi::{
    frame_address_command, opcode_word, opcodes, quad_address_word, register_write_word, Command,
    Speed,
};
use maybe_async::maybe_async;

/// Reset recovery time (tRST) in microseconds
pub const RESET_DELAY_US: u32 = 30;
/// Release from power-down time (tRES1) in microseconds
pub const POWER_UP_DELAY_US: u32 = 3;

/// Queue one segment once the host has room for it
pub fn issue<H: SpiHost + ?Sized>(host: &mut H, limits: &PollLimits, cmd: Command) -> Result<()> {
    wait_ready(host, limits)?;
    host.set_command(cmd);
    Ok(())
}

/// Send a single-byte command with no address or data
pub fn send_opcode<H: SpiHost + ?Sized>(host: &mut H, limits: &PollLimits, opcode: u8) -> Result<()> {
    log::trace!("flash: opcode {:#04x}", opcode);
    wait_ready(host, limits)?;
    host.write_word(opcode_word(opcode));
    issue(host, limits, Command::tx(1, Speed::Standard, false))?;
    wait_ready(host, limits)
}

/// Send the Write Enable command
pub fn write_enable<H: SpiHost + ?Sized>(host: &mut H, limits: &PollLimits) -> Result<()> {
    send_opcode(host, limits, opcodes::WREN)
}

/// Read a single-byte register (status registers)
pub fn read_register<H: SpiHost + ?Sized>(
    host: &mut H,
    limits: &PollLimits,
    opcode: u8,
) -> Result<u8> {
    wait_ready(host, limits)?;
    host.set_rx_watermark(1);
    host.write_word(opcode_word(opcode));
    issue(host, limits, Command::tx(1, Speed::Standard, true))?;
    issue(host, limits, Command::rx(1, Speed::Standard, false))?;
    wait_rx_watermark(host, limits)?;
    Ok(host.read_word() as u8)
}

/// Read the status register 1
pub fn read_status1<H: SpiHost + ?Sized>(host: &mut H, limits: &PollLimits) -> Result<u8> {
    read_register(host, limits, opcodes::RDSR1)
}

/// Read the status register 2
pub fn read_status2<H: SpiHost + ?Sized>(host: &mut H, limits: &PollLimits) -> Result<u8> {
    read_register(host, limits, opcodes::RDSR2)
}

/// Read the JEDEC ID
///
/// Returns (manufacturer_id, device_id) on success.
pub fn read_jedec_id<H: SpiHost + ?Sized>(host: &mut H, limits: &PollLimits) -> Result<(u8, u16)> {
    wait_ready(host, limits)?;
    host.set_rx_watermark(1);
    host.write_word(opcode_word(opcodes::RDID));
    issue(host, limits, Command::tx(1, Speed::Standard, true))?;
    issue(host, limits, Command::rx(3, Speed::Standard, false))?;
    wait_rx_watermark(host, limits)?;
    let [manufacturer, memory_type, capacity, _] = host.read_word().to_le_bytes();
    Ok((manufacturer, ((memory_type as u16) << 8) | capacity as u16))
}

/// Wait for the BUSY bit to clear
///
/// Polls status register 1 until BUSY clears, at most
/// `limits.max_status_polls` times (zero means forever), sleeping
/// `limits.status_poll_delay_us` between polls.
#[maybe_async]
pub async fn wait_idle<H: SpiHost + ?Sized>(host: &mut H, limits: &PollLimits) -> Result<()> {
    let mut budget = PollBudget::new(limits.max_status_polls);
    while budget.tick() {
        let status = read_status1(host, limits)?;
        if status & opcodes::SR1_BUSY == 0 {
            return Ok(());
        }
        if limits.status_poll_delay_us > 0 {
            host.delay_us(limits.status_poll_delay_us).await;
        }
    }
    log::warn!(
        "flash still busy after {} status polls",
        limits.max_status_polls
    );
    Err(Error::Timeout(WaitTarget::FlashBusy))
}

/// Write the status register 2
///
/// Automatically sends WREN before writing and waits for completion.
#[maybe_async]
pub async fn write_status2<H: SpiHost + ?Sized>(
    host: &mut H,
    limits: &PollLimits,
    value: u8,
) -> Result<()> {
    write_enable(host, limits)?;
    wait_ready(host, limits)?;
    host.write_word(register_write_word(opcodes::WRSR2, value));
    issue(host, limits, Command::tx(2, Speed::Standard, false))?;
    wait_idle(host, limits).await
}

/// Set the Quad Enable bit and check that it latched
#[maybe_async]
pub async fn set_quad_enable<H: SpiHost + ?Sized>(host: &mut H, limits: &PollLimits) -> Result<()> {
    let sr2 = read_status2(host, limits)?;
    if sr2 & opcodes::SR2_QE != 0 {
        log::debug!("flash: QE already set (SR2={:#04x})", sr2);
        return Ok(());
    }

    write_status2(host, limits, sr2 | opcodes::SR2_QE).await?;

    let sr2 = read_status2(host, limits)?;
    if sr2 & opcodes::SR2_QE == 0 {
        log::error!("flash: QE did not latch (SR2={:#04x})", sr2);
        return Err(Error::QuadEnableFailed);
    }
    log::debug!("flash: QE set (SR2={:#04x})", sr2);
    Ok(())
}

/// Erase the region at `addr` with an address-framed erase opcode
///
/// Waits for the flash to be idle before and after the erase.
#[maybe_async]
pub async fn erase<H: SpiHost + ?Sized>(
    host: &mut H,
    limits: &PollLimits,
    opcode: u8,
    addr: u32,
) -> Result<()> {
    log::trace!("flash: erase {:#04x} @ {:#08x}", opcode, addr);
    wait_idle(host, limits).await?;
    write_enable(host, limits)?;

    let framed = frame_address_command(opcode, addr);
    wait_ready(host, limits)?;
    host.write_word(framed.word);
    issue(
        host,
        limits,
        Command {
            csaat: false,
            ..framed.command
        },
    )?;
    wait_idle(host, limits).await
}

/// Erase the whole chip
#[maybe_async]
pub async fn chip_erase<H: SpiHost + ?Sized>(host: &mut H, limits: &PollLimits) -> Result<()> {
    wait_idle(host, limits).await?;
    write_enable(host, limits)?;
    send_opcode(host, limits, opcodes::CE_C7)?;
    wait_idle(host, limits).await
}

/// Start a page program: WREN, then opcode and address with CS held
///
/// The address phase is always single-line, even for Quad Page Program.
pub fn start_page_program<H: SpiHost + ?Sized>(
    host: &mut H,
    limits: &PollLimits,
    opcode: u8,
    addr: u32,
) -> Result<()> {
    write_enable(host, limits)?;
    let framed = frame_address_command(opcode, addr);
    wait_ready(host, limits)?;
    host.write_word(framed.word);
    issue(host, limits, framed.command)
}

/// Push bytes into the TX FIFO, one little-endian word at a time
///
/// A trailing partial word is zero padded; the segment length decides how
/// many of its bytes reach the wire.
pub fn push_data<H: SpiHost + ?Sized>(host: &mut H, limits: &PollLimits, data: &[u8]) -> Result<()> {
    for chunk in data.chunks(4) {
        let mut word = [0u8; 4];
        word[..chunk.len()].copy_from_slice(chunk);
        wait_tx_space(host, limits)?;
        host.write_word(u32::from_le_bytes(word));
    }
    Ok(())
}

/// Program up to one page with data pushed by the CPU
///
/// `data` must not cross a page boundary; the flash would wrap around
/// inside the page.
#[maybe_async]
pub async fn program_page<H: SpiHost + ?Sized>(
    host: &mut H,
    limits: &PollLimits,
    opcode: u8,
    speed: Speed,
    addr: u32,
    data: &[u8],
) -> Result<()> {
    log::trace!("flash: program {} bytes @ {:#08x}", data.len(), addr);
    start_page_program(host, limits, opcode, addr)?;
    push_data(host, limits, data)?;
    issue(host, limits, Command::tx(data.len(), speed, false))?;
    wait_idle(host, limits).await
}

/// Queue every segment of a read transaction
///
/// `Speed::Quad` issues Fast
/// Read Quad I/O (0xEB): opcode on one line, then address and mode bits
/// on four lines, then `dummy_cycles` idle clocks, then the data. Any
/// other speed issues Read Data (0x03) on a single line.
/// `len` must be in `1..=host.max_segment_len()`.
pub fn start_read<H: SpiHost + ?Sized>(
    host: &mut H,
    limits: &PollLimits,
    speed: Speed,
    dummy_cycles: u8,
    addr: u32,
    len: usize,
) -> Result<()> {
    wait_ready(host, limits)?;
    let data_speed = match speed {
        Speed::Quad => {
            host.write_word(opcode_word(opcodes::QIOR));
            host.write_word(quad_address_word(addr, opcodes::QIOR_MODE_BITS));
            issue(host, limits, Command::tx(1, Speed::Standard, true))?;
            issue(host, limits, Command::tx(4, Speed::Quad, true))?;
            if dummy_cycles > 0 {
                issue(host, limits, Command::dummy(dummy_cycles, Speed::Quad, true))?;
            }
            Speed::Quad
        }
        _ => {
            let framed = frame_address_command(opcodes::READ, addr);
            host.write_word(framed.word);
            issue(host, limits, framed.command)?;
            Speed::Standard
        }
    };
    issue(host, limits, Command::rx(len, data_speed, false))
}

/// Pop whole words from the RX FIFO into `out`
///
/// `out.len()` must be a multiple of 4. The watermark is set to the
/// smaller of the remaining words and the FIFO depth before each batch.
pub fn drain_words<H: SpiHost + ?Sized>(host: &mut H, limits: &PollLimits, out: &mut [u8]) -> Result<()> {
    let depth = host.rx_fifo_depth().clamp(1, u8::MAX as usize);
    let mut words = out.chunks_exact_mut(4);
    let mut remaining = words.len();

    while remaining > 0 {
        let batch = remaining.min(depth);
        host.set_rx_watermark(batch as u8);
        wait_rx_watermark(host, limits)?;
        for chunk in words.by_ref().take(batch) {
            chunk.copy_from_slice(&host.read_word().to_le_bytes());
        }
        remaining -= batch;
    }
    Ok(())
}

/// Pop the final partial word and copy its low bytes into `out`
pub fn read_tail<H: SpiHost + ?Sized>(host: &mut H, limits: &PollLimits, out: &mut [u8]) -> Result<()> {
    if out.is_empty() {
        return Ok(());
    }
    host.set_rx_watermark(1);
    wait_rx_watermark(host, limits)?;
    let word = host.read_word().to_le_bytes();
    out.copy_from_slice(&word[..out.len()]);
    Ok(())
}

/// Reset the flash (Enable Reset + Reset Device)
#[maybe_async]
pub async fn software_reset<H: SpiHost + ?Sized>(host: &mut H, limits: &PollLimits) -> Result<()> {
    send_opcode(host, limits, opcodes::RSTEN)?;
    send_opcode(host, limits, opcodes::RST)?;
    host.delay_us(RESET_DELAY_US).await;
    Ok(())
}

/// Enter deep power-down
pub fn power_down<H: SpiHost + ?Sized>(host: &mut H, limits: &PollLimits) -> Result<()> {
    send_opcode(host, limits, opcodes::DP)
}

/// Release from deep power-down
#[maybe_async]
pub async fn power_up<H: SpiHost + ?Sized>(host: &mut H, limits: &PollLimits) -> Result<()> {
    send_opcode(host, limits, opcodes::RDP)?;
    host.delay_us(POWER_UP_DELAY_US).await;
    Ok(())
}
