//! heepflash-xheep - Register-level X-HEEP bindings for heepflash
//!
//! This crate implements the [`heepflash_core::host`] traits on top of the
//! X-HEEP peripherals, using volatile MMIO accesses:
//!
//! - [`XheepSpiHost`]: the OpenTitan-derived SPI host wired to the flash
//! - [`XheepDma`]: the system DMA, paced by the SPI flash FIFO triggers
//! - [`XheepSocCtrl`]: the SoC control block (SPIMEMIO select, clock)
//!
//! # Usage
//!
//! ```ignore
//! use heepflash_core::flash::{DriverConfig, W25q128jw};
//! use heepflash_core::host::{Completion, SocControl};
//! use heepflash_xheep::{regs, XheepDma, XheepSocCtrl, XheepSpiHost};
//!
//! static DMA_DONE: Completion = Completion::new();
//!
//! let mut soc = unsafe { XheepSocCtrl::default_base() };
//! let host = unsafe { XheepSpiHost::flash(soc.system_frequency_hz()) };
//! let dma = unsafe { XheepDma::new(regs::DMA_BASE, &DMA_DONE) };
//! let mut flash = W25q128jw::new(host, dma, DriverConfig::fpga());
//! flash.init(&mut soc)?;
//! ```
//!
//! # Safety
//!
//! Constructors are `unsafe`: the caller vouches that the base address
//! points at the right peripheral and that it is not shared.

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

mod dma;
mod mmio;
pub mod regs;
mod soc_ctrl;
mod spi_host;

pub use dma::XheepDma;
pub use mmio::Mmio;
pub use soc_ctrl::XheepSocCtrl;
pub use spi_host::XheepSpiHost;
