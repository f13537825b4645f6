//! DMA engine driver
//!
//! The X-HEEP DMA copies words between a fixed FIFO register and a memory
//! buffer, paced by a trigger slot. Completion is reported through the
//! transaction-done interrupt. Install a handler that calls
//! [`Completion::signal`] on the same `static` the channel was built with:
//!
//! ```ignore
//! static DMA_DONE: Completion = Completion::new();
//!
//! #[no_mangle]
//! extern "C" fn handler_irq_dma() {
//!     DMA_DONE.signal();
//! }
//!
//! let dma = unsafe { XheepDma::new(DMA_BASE, &DMA_DONE) }.with_wfi(true);
//! ```
//!
//! Without the interrupt the channel falls back to the DONE register.

use core::sync::atomic::{fence, Ordering};

use heepflash_core::error::DmaFailure;
use heepflash_core::host::{Completion, DmaBuffer, DmaChannel, DmaTransfer, DmaTrigger};
use maybe_async::maybe_async;

use crate::mmio::Mmio;
use crate::regs::*;

/// One channel of the X-HEEP DMA engine
#[derive(Debug)]
pub struct XheepDma {
    regs: Mmio,
    completion: &'static Completion,
    active: bool,
    wfi: bool,
}

impl XheepDma {
    /// Bind the DMA engine at `base`
    ///
    /// # Safety
    ///
    /// `base` must be the address of the DMA register block and nothing
    /// else may program the engine while this value exists.
    pub unsafe fn new(base: usize, completion: &'static Completion) -> Self {
        Self {
            regs: unsafe { Mmio::new(base) },
            completion,
            active: false,
            wfi: false,
        }
    }

    /// Sleep with `wfi` between polls
    ///
    /// Only enable this when the transaction-done interrupt is routed to a
    /// handler signalling the completion, or the core never wakes up.
    pub fn with_wfi(mut self, wfi: bool) -> Self {
        self.wfi = wfi;
        self
    }

    /// A transfer was launched and not yet observed as complete
    pub fn is_active(&self) -> bool {
        self.active
    }

    fn slot(trigger: DmaTrigger) -> u32 {
        match trigger {
            DmaTrigger::SpiFlashRx => DMA_TRIG_SPI_FLASH_RX,
            DmaTrigger::SpiFlashTx => DMA_TRIG_SPI_FLASH_TX << DMA_SLOT_TX_OFFSET,
        }
    }
}

#[maybe_async(AFIT)]
impl DmaChannel for XheepDma {
    fn check(&self, transfer: &DmaTransfer<'_>) -> Result<(), DmaFailure> {
        if self.active {
            return Err(DmaFailure::Busy);
        }
        transfer.validate()
    }

    fn launch(&mut self, transfer: &mut DmaTransfer<'_>) -> Result<(), DmaFailure> {
        self.check(transfer)?;

        let buffer = transfer.buffer_addr() as u32;
        let fifo = transfer.fifo_addr as u32;
        let (src, dst, src_inc, dst_inc) = match transfer.buffer {
            DmaBuffer::ToMemory(_) => (fifo, buffer, 0, 4),
            DmaBuffer::FromMemory(_) => (buffer, fifo, 4, 0),
        };
        log::trace!(
            "xheep dma: {:?} {:#010x} -> {:#010x}, {} bytes",
            transfer.trigger,
            src,
            dst,
            transfer.len()
        );

        self.regs.write32(DMA_PTR_IN, src);
        self.regs.write32(DMA_PTR_OUT, dst);
        self.regs.write32(DMA_SRC_PTR_INC, src_inc);
        self.regs.write32(DMA_DST_PTR_INC, dst_inc);
        self.regs.write32(DMA_SLOT, Self::slot(transfer.trigger));
        self.regs.write32(DMA_DATA_TYPE, DMA_DATA_TYPE_WORD);
        self.completion.reset();
        self.active = true;

        // Buffer contents must be visible to the engine before it starts
        fence(Ordering::Release);
        self.regs.write32(DMA_START, transfer.len() as u32);
        Ok(())
    }

    fn poll(&mut self, _transfer: &mut DmaTransfer<'_>) -> bool {
        if !self.active {
            return true;
        }
        if self.completion.take() || self.regs.read32(DMA_DONE) != 0 {
            fence(Ordering::Acquire);
            self.active = false;
            return true;
        }
        false
    }

    async fn idle(&mut self) {
        if self.wfi {
            #[cfg(target_arch = "riscv32")]
            {
                // SAFETY: wfi only stalls the hart until the next interrupt
                unsafe { core::arch::asm!("wfi") };
                return;
            }
        }
        core::hint::spin_loop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[repr(align(4))]
    struct Aligned([u8; 16]);

    fn channel(regs: &mut [u32; 8], done: &'static Completion) -> XheepDma {
        unsafe { XheepDma::new(regs.as_mut_ptr() as usize, done) }
    }

    #[test]
    fn test_rx_transfer_programming() {
        static DONE: Completion = Completion::new();
        let mut regs = [0u32; 8];
        let mut buf = Aligned([0; 16]);
        let dest = buf.0.as_ptr() as usize as u32;
        let mut dma = channel(&mut regs, &DONE);

        let mut xfer = DmaTransfer::from_fifo(0x2002_0024, &mut buf.0[..12]);
        dma.launch(&mut xfer).unwrap();
        assert!(dma.is_active());
        assert!(!dma.poll(&mut xfer));
        assert_eq!(dma.check(&xfer), Err(DmaFailure::Busy));

        DONE.signal();
        assert!(dma.poll(&mut xfer));
        assert!(!dma.is_active());
        drop(dma);

        assert_eq!(regs[DMA_PTR_IN / 4], 0x2002_0024);
        assert_eq!(regs[DMA_PTR_OUT / 4], dest);
        assert_eq!(regs[DMA_SRC_PTR_INC / 4], 0);
        assert_eq!(regs[DMA_DST_PTR_INC / 4], 4);
        assert_eq!(regs[DMA_SLOT / 4], DMA_TRIG_SPI_FLASH_RX);
        assert_eq!(regs[DMA_DATA_TYPE / 4], DMA_DATA_TYPE_WORD);
        assert_eq!(regs[DMA_START / 4], 12);
    }

    #[test]
    fn test_tx_transfer_done_register() {
        static DONE: Completion = Completion::new();
        let mut regs = [0u32; 8];
        let src = Aligned([0xA5; 16]);
        let regs_ptr = regs.as_mut_ptr();
        let mut dma = channel(&mut regs, &DONE);

        let mut xfer = DmaTransfer::to_fifo(0x2002_0028, &src.0);
        dma.launch(&mut xfer).unwrap();
        assert!(!dma.poll(&mut xfer));
        // Interrupt not wired: the DONE register completes the transfer
        unsafe { regs_ptr.add(DMA_DONE / 4).write_volatile(1) };
        assert!(dma.poll(&mut xfer));
        drop(dma);

        assert_eq!(regs[DMA_PTR_IN / 4], src.0.as_ptr() as usize as u32);
        assert_eq!(regs[DMA_PTR_OUT / 4], 0x2002_0028);
        assert_eq!(regs[DMA_SRC_PTR_INC / 4], 4);
        assert_eq!(regs[DMA_DST_PTR_INC / 4], 0);
        assert_eq!(regs[DMA_SLOT / 4], DMA_TRIG_SPI_FLASH_TX << 16);
        assert_eq!(regs[DMA_START / 4], 16);
    }

    #[test]
    fn test_rejects_bad_descriptors() {
        static DONE: Completion = Completion::new();
        let mut regs = [0u32; 8];
        let buf = Aligned([0; 16]);
        let mut dma = channel(&mut regs, &DONE);

        let mut xfer = DmaTransfer::to_fifo(0x2002_0028, &buf.0[1..9]);
        assert_eq!(dma.launch(&mut xfer), Err(DmaFailure::Misaligned));
        let mut xfer = DmaTransfer::to_fifo(0x2002_0028, &buf.0[..6]);
        assert_eq!(dma.launch(&mut xfer), Err(DmaFailure::InvalidLength));
        assert!(!dma.is_active());
        drop(dma);
        assert_eq!(regs[DMA_START / 4], 0);
    }
}
