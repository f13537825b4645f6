//! Protocol implementations
//!
//! This module contains the W25Q128JW command sequences expressed as
//! SPI host command segments.

mod w25q;

pub use w25q::*;
