//! heepflash-core - W25Q128JW SPI flash driver for X-HEEP
//!
//! This crate drives a Winbond W25Q128JW serial NOR flash through an
//! OpenTitan-style SPI host: 24-bit address framing, standard and quad
//! reads and page programs, sector/block/chip erase, reset and power
//! management, with optional DMA-assisted data movement. It is `no_std`
//! and talks to hardware only through the traits in [`host`].
//!
//! # Features
//!
//! - `std` - Enable standard library support (TOML configuration loading)
//! - `is_sync` - Make every driver operation a blocking call
//!
//! # Example
//!
//! ```ignore
//! use heepflash_core::flash::{DriverConfig, W25q128jw};
//!
//! fn dump<H: SpiHost, S: SocControl>(host: H, soc: &mut S) -> heepflash_core::Result<()> {
//!     let mut flash = W25q128jw::without_dma(host, DriverConfig::fpga());
//!     flash.init(soc)?;
//!     let mut buf = [0u8; 256];
//!     flash.read_quad(0x1000, &mut buf)?;
//!     Ok(())
//! }
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
// Allow async fn in traits - we use maybe-async for dual sync/async support
#![allow(async_fn_in_trait)]

#[cfg(feature = "std")]
extern crate std;

pub mod error;
pub mod flash;
pub mod host;
pub mod protocol;
pub mod spi;

pub use error::{Error, Result, StatusCode};
