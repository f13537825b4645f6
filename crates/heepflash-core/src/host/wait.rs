//! Bounded waits on SPI host status
//!
//! Every busy-wait in the driver goes through these helpers so that a
//! wedged host or flash turns into [`Error::Timeout`] instead of a hang.

use super::traits::{HostStatus, SpiHost};
use crate::error::{Error, Result, WaitTarget};

/// Upper bounds for the driver's polling loops
///
/// A limit of zero means "poll forever". The defaults leave room for the
/// slowest flash operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "std", serde(default))]
pub struct PollLimits {
    /// STATUS reads while waiting for READY, RX watermark or TX space
    pub max_ready_polls: u32,
    /// Status register 1 reads while waiting for the flash to go idle
    pub max_status_polls: u32,
    /// Completion polls while waiting for a DMA transfer
    pub max_dma_polls: u32,
    /// Delay between flash status register reads
    pub status_poll_delay_us: u32,
}

const STATUS_POLL_DELAY_US: u32 = 10;
// 250 s, worst-case chip erase is 200 s
const MAX_STATUS_POLLS: u32 = 250_000_000 / STATUS_POLL_DELAY_US;

impl Default for PollLimits {
    fn default() -> Self {
        Self {
            max_ready_polls: 1_000_000,
            max_status_polls: MAX_STATUS_POLLS,
            max_dma_polls: 10_000_000,
            status_poll_delay_us: STATUS_POLL_DELAY_US,
        }
    }
}

impl PollLimits {
    /// No limits at all
    pub const fn unbounded() -> Self {
        Self {
            max_ready_polls: 0,
            max_status_polls: 0,
            max_dma_polls: 0,
            status_poll_delay_us: 0,
        }
    }
}

/// Count polls against a limit where zero means unbounded
#[derive(Debug)]
pub(crate) struct PollBudget {
    remaining: Option<u32>,
}

impl PollBudget {
    pub(crate) fn new(limit: u32) -> Self {
        Self {
            remaining: (limit != 0).then_some(limit),
        }
    }

    /// Consume one poll, returns false once the budget is spent
    pub(crate) fn tick(&mut self) -> bool {
        match &mut self.remaining {
            None => true,
            Some(0) => false,
            Some(n) => {
                *n -= 1;
                true
            }
        }
    }
}

fn wait_for<H, F>(host: &mut H, limit: u32, target: WaitTarget, mut done: F) -> Result<()>
where
    H: SpiHost + ?Sized,
    F: FnMut(&HostStatus) -> bool,
{
    let mut budget = PollBudget::new(limit);
    while budget.tick() {
        let status = host.status();
        if done(&status) {
            return Ok(());
        }
        if host.has_error() {
            log::error!("SPI host error while waiting for {}", target);
            return Err(Error::SpiHostError);
        }
    }
    log::warn!("Gave up waiting for {} after {} polls", target, limit);
    Err(Error::Timeout(target))
}

/// Wait until the host can accept another command segment
pub fn wait_ready<H: SpiHost + ?Sized>(host: &mut H, limits: &PollLimits) -> Result<()> {
    wait_for(host, limits.max_ready_polls, WaitTarget::SpiReady, |s| {
        s.is_ready()
    })
}

/// Wait until the RX FIFO holds at least the configured watermark
pub fn wait_rx_watermark<H: SpiHost + ?Sized>(host: &mut H, limits: &PollLimits) -> Result<()> {
    wait_for(host, limits.max_ready_polls, WaitTarget::RxWatermark, |s| {
        s.rx_watermark()
    })
}

/// Wait until the TX FIFO can take another word
pub fn wait_tx_space<H: SpiHost + ?Sized>(host: &mut H, limits: &PollLimits) -> Result<()> {
    wait_for(host, limits.max_ready_polls, WaitTarget::TxSpace, |s| {
        !s.tx_full()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_budget() {
        let mut budget = PollBudget::new(2);
        assert!(budget.tick());
        assert!(budget.tick());
        assert!(!budget.tick());

        let mut unbounded = PollBudget::new(0);
        for _ in 0..10_000 {
            assert!(unbounded.tick());
        }
    }
}
