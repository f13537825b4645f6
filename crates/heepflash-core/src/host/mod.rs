//! SPI host, DMA and SoC control abstractions

mod completion;
mod traits;
mod wait;

pub use completion::Completion;
pub use traits::{
    DmaBuffer, DmaChannel, DmaTransfer, DmaTrigger, FlashMode, HostStatus, NoDma, SocControl,
    SpiHost, StatusFlags,
};
pub(crate) use wait::PollBudget;
pub use wait::{wait_ready, wait_rx_watermark, wait_tx_space, PollLimits};
