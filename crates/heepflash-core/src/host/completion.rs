//! Interrupt-to-driver completion flag

use core::sync::atomic::{AtomicBool, Ordering};

/// One-shot flag set from an interrupt handler and consumed by the driver
///
/// Only plain loads and stores are used so this works on cores without
/// atomic read-modify-write instructions (riscv32imc). That is sound as
/// long as there is a single consumer, which is the driver holding the
/// DMA channel.
#[derive(Debug)]
pub struct Completion {
    done: AtomicBool,
}

impl Completion {
    /// A cleared flag, usable in a `static`
    pub const fn new() -> Self {
        Self {
            done: AtomicBool::new(false),
        }
    }

    /// Mark the transfer as done (called from interrupt context)
    pub fn signal(&self) {
        self.done.store(true, Ordering::Release);
    }

    /// Check the flag without clearing it
    pub fn is_signaled(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }

    /// Consume the flag, returns true if it was set
    pub fn take(&self) -> bool {
        if self.done.load(Ordering::Acquire) {
            self.done.store(false, Ordering::Relaxed);
            true
        } else {
            false
        }
    }

    /// Clear the flag before starting a new transfer
    pub fn reset(&self) {
        self.done.store(false, Ordering::Release);
    }
}

impl Default for Completion {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_consumes() {
        static DONE: Completion = Completion::new();
        assert!(!DONE.take());
        DONE.signal();
        assert!(DONE.is_signaled());
        assert!(DONE.take());
        assert!(!DONE.take());
        DONE.signal();
        DONE.reset();
        assert!(!DONE.is_signaled());
    }
}
