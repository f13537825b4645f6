//! Command implementations

mod erase;
mod info;
mod power;
mod read;
mod verify;
mod write;

pub use erase::run_erase;
pub use info::run_info;
pub use power::{run_power_down, run_reset};
pub use read::run_read;
pub use verify::run_verify;
pub use write::run_write;

use crate::cli::TransferArgs;
use heepflash_core::flash::{ReadMode, Transfer, WriteMode, SECTOR_SIZE};
use heepflash_core::spi::Speed;
use indicatif::{ProgressBar, ProgressStyle};

/// Bytes moved per driver call
pub(crate) const CHUNK_SIZE: usize = SECTOR_SIZE;

/// Word-aligned transfer buffer, usable as a DMA target
#[repr(align(4))]
pub(crate) struct ChunkBuf(pub [u8; CHUNK_SIZE]);

impl ChunkBuf {
    pub(crate) fn new() -> Box<Self> {
        Box::new(Self([0; CHUNK_SIZE]))
    }
}

impl TransferArgs {
    fn speed(&self) -> Speed {
        if self.quad {
            Speed::Quad
        } else {
            Speed::Standard
        }
    }

    fn transfer(&self) -> Transfer {
        if self.dma {
            Transfer::Dma
        } else {
            Transfer::Polled
        }
    }

    pub(crate) fn read_mode(&self) -> ReadMode {
        ReadMode::new(self.speed(), self.transfer())
    }

    pub(crate) fn write_mode(&self) -> WriteMode {
        WriteMode::new(self.speed(), self.transfer())
    }
}

/// Byte progress bar labelled with `phase`
pub(crate) fn progress_bar(total: usize, phase: &str) -> ProgressBar {
    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(&format!(
                "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{bytes}}/{{total_bytes}} ({{bytes_per_sec}}, {{eta}}) {}",
                phase
            ))
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb
}
