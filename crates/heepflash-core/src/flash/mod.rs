//! W25Q128JW flash driver
//!
//! This module provides the high-level [`W25q128jw`] driver together with
//! its configuration, read/write mode selection and the flash geometry
//! helpers used to split transfers on page and sector boundaries.

mod config;
mod driver;
pub mod geometry;
mod mode;

#[cfg(feature = "std")]
pub use config::ConfigError;
pub use config::{DriverConfig, FPGA_QUAD_DUMMY_CYCLES, MAX_FLASH_HZ, SIM_QUAD_DUMMY_CYCLES};
pub use driver::{W25q128jw, FLASH_CSID};
pub use geometry::{
    EraseGranule, PageChunk, PageChunks, SectorSpan, SectorSpans, BLOCK_32K_SIZE, BLOCK_64K_SIZE,
    FLASH_SIZE, PAGE_SIZE, SECTOR_SIZE,
};
pub use mode::{ReadMode, Transfer, WriteMode};
