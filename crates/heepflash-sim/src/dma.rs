//! Simulated DMA channel wired to the SPI host FIFOs

use std::cell::RefCell;
use std::rc::Rc;

use heepflash_core::error::DmaFailure;
use heepflash_core::host::{Completion, DmaBuffer, DmaChannel, DmaTransfer};

use crate::bus::{SimBus, SimSpiHost};

impl SimSpiHost {
    /// A DMA channel wired to this host's FIFOs
    pub fn dma(&self) -> SimDma {
        SimDma::new(self.bus())
    }
}

/// Simulated DMA channel
///
/// Words move only when [`DmaChannel::poll`] runs, so the driver's
/// completion loop is what drives the transfer forward.
pub struct SimDma {
    bus: Rc<RefCell<SimBus>>,
    completion: Completion,
    /// Bytes moved so far in the active transfer
    progress: Option<usize>,
    reject: Option<DmaFailure>,
    transfers: usize,
    words_moved: usize,
}

impl SimDma {
    pub(crate) fn new(bus: Rc<RefCell<SimBus>>) -> Self {
        Self {
            bus,
            completion: Completion::new(),
            progress: None,
            reject: None,
            transfers: 0,
            words_moved: 0,
        }
    }

    /// Make every following transfer fail with `failure`
    pub fn reject_with(&mut self, failure: DmaFailure) {
        self.reject = Some(failure);
    }

    /// Accept transfers again
    pub fn accept(&mut self) {
        self.reject = None;
    }

    /// Transfers launched so far
    pub fn transfers(&self) -> usize {
        self.transfers
    }

    /// Words moved so far across all transfers
    pub fn words_moved(&self) -> usize {
        self.words_moved
    }

    fn step(&mut self, transfer: &mut DmaTransfer<'_>, mut done: usize) -> usize {
        let mut bus = self.bus.borrow_mut();
        match &mut transfer.buffer {
            DmaBuffer::ToMemory(dest) => {
                while done < dest.len() {
                    let Some(word) = bus.pop_rx() else {
                        break;
                    };
                    dest[done..done + 4].copy_from_slice(&word.to_le_bytes());
                    done += 4;
                    self.words_moved += 1;
                }
            }
            DmaBuffer::FromMemory(src) => {
                while done < src.len() {
                    let mut word = [0u8; 4];
                    word.copy_from_slice(&src[done..done + 4]);
                    if !bus.push_tx(u32::from_le_bytes(word)) {
                        break;
                    }
                    done += 4;
                    self.words_moved += 1;
                }
            }
        }
        done
    }
}

impl DmaChannel for SimDma {
    fn check(&self, transfer: &DmaTransfer<'_>) -> Result<(), DmaFailure> {
        if let Some(failure) = self.reject {
            return Err(failure);
        }
        if self.progress.is_some() {
            return Err(DmaFailure::Busy);
        }
        transfer.validate()
    }

    fn launch(&mut self, transfer: &mut DmaTransfer<'_>) -> Result<(), DmaFailure> {
        self.check(transfer)?;
        log::trace!(
            "sim dma: {:?} {} bytes, fifo {:#x}",
            transfer.trigger,
            transfer.len(),
            transfer.fifo_addr
        );
        self.completion.reset();
        self.progress = Some(0);
        self.transfers += 1;
        Ok(())
    }

    fn poll(&mut self, transfer: &mut DmaTransfer<'_>) -> bool {
        if let Some(done) = self.progress {
            let done = self.step(transfer, done);
            if done >= transfer.len() {
                self.progress = None;
                // Stands in for the transaction-done interrupt
                self.completion.signal();
            } else {
                self.progress = Some(done);
            }
        }
        self.completion.take()
    }

    fn idle(&mut self) {}
}
