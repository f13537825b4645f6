//! heepflash-sim - Simulated X-HEEP SPI host with a W25Q128JW attached
//!
//! This crate provides software stand-ins for every collaborator of the
//! flash driver: an SPI host with real FIFO and command-queue behaviour, a
//! byte-level flash model that checks the command protocol, a DMA channel
//! and the SoC control block. It's useful for testing and for running the
//! CLI against a flash image without hardware.

mod bus;
mod dma;
mod model;
mod soc;
mod trace;

pub use bus::{SimSpiHost, CMD_FIFO_DEPTH, RXDATA_ADDR, RX_FIFO_DEPTH, TXDATA_ADDR, TX_FIFO_DEPTH};
pub use dma::SimDma;
pub use model::{FlashModel, FlashModelConfig};
pub use soc::SimSocCtrl;
pub use trace::{Transaction, Violation};

#[cfg(test)]
mod tests {
    use super::*;
    use heepflash_core::error::{DmaFailure, Error, StatusCode, WaitTarget};
    use heepflash_core::flash::{
        DriverConfig, ReadMode, W25q128jw, WriteMode, FLASH_SIZE, SECTOR_SIZE,
    };
    use heepflash_core::host::PollLimits;
    use heepflash_core::spi::{opcodes, Speed};

    const CORE_HZ: u32 = 100_000_000;

    #[repr(align(4))]
    struct Aligned<const N: usize>([u8; N]);

    impl<const N: usize> Aligned<N> {
        fn pattern(seed: u8) -> Self {
            let mut buf = [0u8; N];
            for (i, b) in buf.iter_mut().enumerate() {
                *b = (i as u8).wrapping_mul(31).wrapping_add(seed);
            }
            Self(buf)
        }
    }

    fn setup_with(
        model: FlashModelConfig,
        config: DriverConfig,
    ) -> (W25q128jw<SimSpiHost, SimDma>, SimSpiHost) {
        let host = SimSpiHost::new(FlashModel::new(model));
        let mut flash = W25q128jw::new(host.clone(), host.dma(), config);
        let mut soc = SimSocCtrl::new(CORE_HZ);
        flash.init(&mut soc).unwrap();
        host.flash_mut().clear_trace();
        (flash, host)
    }

    fn setup() -> (W25q128jw<SimSpiHost, SimDma>, SimSpiHost) {
        setup_with(FlashModelConfig::default(), DriverConfig::simulation())
    }

    fn count(host: &SimSpiHost, opcode: u8) -> usize {
        host.flash()
            .transactions()
            .iter()
            .filter(|t| t.opcode == opcode)
            .count()
    }

    #[test]
    fn test_init() {
        let host = SimSpiHost::new(FlashModel::new(FlashModelConfig::default()));
        let mut flash = W25q128jw::without_dma(host.clone(), DriverConfig::simulation());
        let mut soc = SimSocCtrl::new(400_000_000);
        flash.init(&mut soc).unwrap();

        assert!(soc.host_selected());
        assert!(host.is_enabled());
        assert_eq!(host.csid(), 0);
        let opts = host.configopts(0);
        assert_eq!(opts.clkdiv, 1);
        assert_eq!((opts.csnidle, opts.csntrail, opts.csnlead), (0xF, 0xF, 0xF));
        assert!(!opts.cpha && !opts.cpol);

        assert!(flash.quad_enabled().unwrap());
        let model = host.flash();
        assert_eq!(model.transactions()[0].opcode, opcodes::RDP);
        assert!(model.violations().is_empty());
    }

    #[test]
    fn test_init_wakes_from_power_down() {
        let model = FlashModelConfig {
            powered_down: true,
            ..Default::default()
        };
        let (mut flash, host) = setup_with(model, DriverConfig::simulation());
        assert!(!host.flash().is_powered_down());
        assert_eq!(flash.read_jedec_id().unwrap(), (0xEF, 0x6018));
    }

    #[test]
    fn test_init_refuses_memory_mapped() {
        let host = SimSpiHost::new(FlashModel::new(FlashModelConfig::default()));
        let mut flash = W25q128jw::without_dma(host.clone(), DriverConfig::simulation());
        let mut soc = SimSocCtrl::memory_mapped(CORE_HZ);

        assert_eq!(flash.init(&mut soc), Err(Error::MemoryMappedMode));
        assert!(!soc.host_selected());
        assert!(!host.is_enabled());
        assert!(host.flash().transactions().is_empty());
    }

    #[test]
    fn test_init_quad_enable_failure() {
        let host = SimSpiHost::new(FlashModel::new(FlashModelConfig {
            qe_writable: false,
            ..Default::default()
        }));
        let mut flash = W25q128jw::without_dma(host, DriverConfig::simulation());
        let mut soc = SimSocCtrl::new(CORE_HZ);
        let result = flash.init(&mut soc);
        assert_eq!(result, Err(Error::QuadEnableFailed));
        assert_eq!(StatusCode::from_result(&result), StatusCode::Error);
    }

    #[test]
    fn test_read_jedec_id() {
        let (mut flash, _host) = setup();
        assert_eq!(flash.read_jedec_id().unwrap(), (0xEF, 0x6018));
    }

    #[test]
    fn test_round_trip_all_modes() {
        let (mut flash, host) = setup();
        let data = Aligned::<1024>::pattern(7);
        let len = 602;

        let mut sector = 0u32;
        for write_mode in WriteMode::ALL {
            for read_mode in ReadMode::ALL {
                let addr = sector * SECTOR_SIZE as u32 + 0x40;
                flash.write(addr, &data.0[..len], write_mode).unwrap();

                let mut buf = Aligned::<1024>([0; 1024]);
                flash.read(addr, &mut buf.0[..len], read_mode).unwrap();
                assert_eq!(
                    &buf.0[..len],
                    &data.0[..len],
                    "{:?} / {:?}",
                    write_mode,
                    read_mode
                );
                sector += 1;
            }
        }

        assert!(host.flash().violations().is_empty());
        assert_eq!(count(&host, opcodes::QPP), 8 * 3);
        assert_eq!(count(&host, opcodes::PP), 8 * 3);
    }

    #[test]
    fn test_dma_moves_whole_words() {
        let (mut flash, host) = setup();
        host.flash_mut().data_mut()[0x100..0x10A].copy_from_slice(b"0123456789");

        let mut buf = Aligned::<16>([0; 16]);
        flash.read_quad_dma(0x100, &mut buf.0[..10]).unwrap();
        assert_eq!(&buf.0[..10], b"0123456789");

        let (_, dma) = flash.release();
        assert_eq!(dma.transfers(), 1);
        assert_eq!(dma.words_moved(), 2);
    }

    #[test]
    fn test_read_framing() {
        let (mut flash, host) = setup();
        let mut buf = [0u8; 4];
        flash.read_standard(0x00ABCD, &mut buf).unwrap();

        let model = host.flash();
        let t = model.transactions().last().unwrap();
        assert_eq!(t.opcode, opcodes::READ);
        assert_eq!(t.address, Some(0x00ABCD));
        assert_eq!(t.address_speed, Some(Speed::Standard));
        assert_eq!(t.rx_bytes, 4);
    }

    #[test]
    fn test_quad_read_framing() {
        let (mut flash, host) = setup();
        let mut buf = [0u8; 8];
        flash.read_quad(0x123456, &mut buf).unwrap();

        let model = host.flash();
        let t = model.transactions().last().unwrap();
        assert_eq!(t.opcode, opcodes::QIOR);
        assert_eq!(t.opcode_speed, Speed::Standard);
        assert_eq!(t.address, Some(0x123456));
        assert_eq!(t.address_speed, Some(Speed::Quad));
        assert_eq!(t.dummy_cycles, 8);
        assert_eq!(t.data_speed, Some(Speed::Quad));
    }

    #[test]
    fn test_quad_dummy_cycle_mismatch_detected() {
        let (mut flash, host) = setup_with(FlashModelConfig::default(), DriverConfig::fpga());
        let mut buf = [0u8; 4];
        flash.read_quad(0, &mut buf).unwrap();
        assert_eq!(
            host.flash().violations(),
            &[Violation::DummyCycles {
                expected: 8,
                actual: 4
            }]
        );
    }

    #[test]
    fn test_read_partial_word_tail() {
        let (mut flash, host) = setup();
        host.flash_mut().data_mut()[0x2000..0x200A].copy_from_slice(b"abcdefghij");

        let mut buf = [0u8; 10];
        flash.read_standard(0x2000, &mut buf).unwrap();
        assert_eq!(&buf, b"abcdefghij");
        assert_eq!(host.flash().transactions().last().unwrap().rx_bytes, 10);

        let mut buf = [0u8; 3];
        flash.read_quad(0x2007, &mut buf).unwrap();
        assert_eq!(&buf, b"hij");
    }

    #[test]
    fn test_large_read_is_segmented() {
        let (mut flash, host) = setup();
        let image: Vec<u8> = (0..2000u32).map(|i| (i * 7) as u8).collect();
        host.flash_mut().data_mut()[0x10000..0x10000 + 2000].copy_from_slice(&image);

        let mut buf = vec![0u8; 2000];
        flash.read_quad(0x10000, &mut buf).unwrap();
        assert_eq!(buf, image);
        assert_eq!(count(&host, opcodes::QIOR), 4);
    }

    #[test]
    fn test_page_program_counts() {
        let (mut flash, host) = setup();
        let data = [0x5Au8; 257];

        flash.write_standard(0x1000, &data[..256]).unwrap();
        assert_eq!(count(&host, opcodes::PP), 1);

        host.flash_mut().clear_trace();
        flash.write_standard(0x2000, &data).unwrap();
        assert_eq!(count(&host, opcodes::PP), 2);

        host.flash_mut().clear_trace();
        flash.write_quad(0x30F0, &data[..256]).unwrap();
        assert_eq!(count(&host, opcodes::QPP), 2);
    }

    #[test]
    fn test_write_never_wraps_in_page() {
        let (mut flash, host) = setup();
        let data = [0x00u8; 0x20];
        flash.write_standard(0x10F0, &data).unwrap();

        let model = host.flash();
        let mem = model.data();
        assert!(mem[0x1000..0x10F0].iter().all(|&b| b == 0xFF));
        assert!(mem[0x10F0..0x1110].iter().all(|&b| b == 0x00));
        assert!(mem[0x1110..0x1200].iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn test_erase_is_idempotent() {
        let (mut flash, host) = setup();
        let data = [0x11u8; 64];
        flash.write_standard(0x5000, &data).unwrap();
        flash.write_standard(0x6000, &data).unwrap();

        flash.erase_4k(0x5010).unwrap();
        let after_first = host.flash().data()[0x5000..0x7000].to_vec();
        flash.erase_4k(0x5000).unwrap();
        assert_eq!(host.flash().data()[0x5000..0x7000], after_first[..]);

        assert!(after_first[..SECTOR_SIZE].iter().all(|&b| b == 0xFF));
        assert_eq!(&after_first[SECTOR_SIZE..SECTOR_SIZE + 64], &data[..]);
    }

    #[test]
    fn test_erase_blocks_and_chip() {
        let (mut flash, host) = setup();
        host.flash_mut().data_mut()[..0x20000].fill(0);

        flash.erase_32k(0x9000).unwrap();
        {
            let model = host.flash();
            let t = model
                .transactions()
                .iter()
                .find(|t| t.opcode == opcodes::BE_52)
                .unwrap();
            assert_eq!(t.address, Some(0x8000));
            assert!(model.data()[0x8000..0x10000].iter().all(|&b| b == 0xFF));
            assert_eq!(model.data()[0x7FFF], 0);
        }

        flash.erase_64k(0x1FFFF).unwrap();
        assert!(host.flash().data()[0x10000..0x20000].iter().all(|&b| b == 0xFF));

        flash.erase_chip().unwrap();
        assert!(host.flash().data().iter().all(|&b| b == 0xFF));
        assert!(host.flash().violations().is_empty());
    }

    #[test]
    fn test_erase_range_picks_largest_granules() {
        let (mut flash, host) = setup();
        flash.erase_range(0x7000, 0x1A000).unwrap();

        let model = host.flash();
        let erases: Vec<(u8, Option<u32>)> = model
            .transactions()
            .iter()
            .filter(|t| matches!(t.opcode, opcodes::SE_20 | opcodes::BE_52 | opcodes::BE_D8))
            .map(|t| (t.opcode, t.address))
            .collect();
        assert_eq!(
            erases,
            vec![
                (opcodes::SE_20, Some(0x7000)),
                (opcodes::BE_52, Some(0x8000)),
                (opcodes::BE_D8, Some(0x10000)),
                (opcodes::SE_20, Some(0x20000)),
            ]
        );
    }

    #[test]
    fn test_busy_gating() {
        let model = FlashModelConfig {
            busy_polls: 5,
            ..Default::default()
        };
        let (mut flash, host) = setup_with(model, DriverConfig::simulation());
        let data = Aligned::<1024>::pattern(3);

        flash.write_standard(0x40, &data.0).unwrap();
        flash.write_quad_dma(0x8000, &data.0).unwrap();
        flash.erase_4k(0x8000).unwrap();
        flash.reset().unwrap();

        let model = host.flash();
        assert!(model.violations().is_empty(), "{:?}", model.violations());
        assert!(model.transactions().iter().all(|t| !t.ignored));
        assert!(count(&host, opcodes::RDSR1) > 0);
    }

    #[test]
    fn test_stuck_busy_times_out() {
        let model = FlashModelConfig {
            stuck_busy: true,
            initial_sr2: opcodes::SR2_QE,
            ..Default::default()
        };
        let config = DriverConfig {
            poll: PollLimits {
                max_status_polls: 64,
                ..Default::default()
            },
            ..DriverConfig::simulation()
        };
        let (mut flash, host) = setup_with(model, config);

        let result = flash.write_standard(0, &[0u8; 16]);
        assert_eq!(result, Err(Error::Timeout(WaitTarget::FlashBusy)));
        assert_eq!(count(&host, opcodes::RDSR1), 64);
        assert!(flash.is_busy().unwrap());
    }

    #[test]
    fn test_argument_errors_issue_no_transactions() {
        let (mut flash, host) = setup();
        let segments = host.segments_executed();
        let mut buf = [0u8; 4];

        assert_eq!(flash.read_standard(0, &mut []), Err(Error::InvalidLength));
        assert_eq!(
            flash.read_quad(FLASH_SIZE - 2, &mut buf),
            Err(Error::AddressOutOfBounds)
        );
        assert_eq!(
            flash.write_standard(FLASH_SIZE, &buf),
            Err(Error::AddressOutOfBounds)
        );
        assert_eq!(flash.write_quad(0, &[]), Err(Error::InvalidLength));
        assert_eq!(flash.erase_4k(FLASH_SIZE), Err(Error::AddressOutOfBounds));
        assert_eq!(flash.erase_range(0x800, 0x1000), Err(Error::InvalidAlignment));
        assert_eq!(
            flash.erase_and_write_standard(FLASH_SIZE - 1, &buf),
            Err(Error::AddressOutOfBounds)
        );

        assert!(host.flash().transactions().is_empty());
        assert_eq!(host.segments_executed(), segments);
    }

    #[test]
    fn test_dma_misaligned_buffer() {
        let (mut flash, host) = setup();
        let mut buf = Aligned::<16>([0; 16]);

        let result = flash.read_standard_dma(0, &mut buf.0[1..9]);
        assert_eq!(result, Err(Error::Dma(DmaFailure::Misaligned)));
        assert_eq!(StatusCode::from_result(&result) as u8, 2);

        assert!(host.flash().transactions().is_empty());
    }

    #[test]
    fn test_dma_write_unaligned_start() {
        let (mut flash, host) = setup();
        let data = Aligned::<1024>::pattern(3);

        for (addr, mode) in [(0x2012, WriteMode::STANDARD_DMA), (0x3012, WriteMode::QUAD_DMA)] {
            flash.write(addr, &data.0[..600], mode).unwrap();
            let start = addr as usize;
            assert_eq!(&host.flash().data()[start..start + 600], &data.0[..600]);
        }

        // Source slice off a word boundary
        flash
            .write(0x4001, &data.0[1..301], WriteMode::STANDARD_DMA)
            .unwrap();
        assert_eq!(&host.flash().data()[0x4001..0x412D], &data.0[1..301]);

        let mut buf = Aligned::<1024>([0; 1024]);
        flash.read_quad_dma(0x2012, &mut buf.0[..600]).unwrap();
        assert_eq!(&buf.0[..600], &data.0[..600]);
        assert!(host.flash().violations().is_empty());

        let (_, dma) = flash.release();
        // 3 page chunks per 600 byte write, 2 for the 300 byte one, 2 read segments
        assert_eq!(dma.transfers(), 3 + 3 + 2 + 2);
    }

    #[test]
    fn test_dma_rejected_by_channel() {
        let host = SimSpiHost::new(FlashModel::new(FlashModelConfig::default()));
        let mut dma = host.dma();
        dma.reject_with(DmaFailure::Busy);
        let mut flash = W25q128jw::new(host.clone(), dma, DriverConfig::simulation());
        flash.init(&mut SimSocCtrl::new(CORE_HZ)).unwrap();

        let mut buf = Aligned::<8>([0; 8]);
        assert_eq!(
            flash.read_quad_dma(0, &mut buf.0),
            Err(Error::Dma(DmaFailure::Busy))
        );
        // Polled reads still work
        flash.read_quad(0, &mut buf.0).unwrap();
    }

    #[test]
    fn test_dma_without_channel() {
        let host = SimSpiHost::new(FlashModel::new(FlashModelConfig::default()));
        let mut flash = W25q128jw::without_dma(host, DriverConfig::simulation());
        flash.init(&mut SimSocCtrl::new(CORE_HZ)).unwrap();

        let mut buf = Aligned::<8>([0; 8]);
        assert_eq!(
            flash.read_standard_dma(0, &mut buf.0),
            Err(Error::Dma(DmaFailure::Unavailable))
        );
    }

    #[test]
    fn test_erase_and_write_preserves_neighbours() {
        let (mut flash, host) = setup();
        let old: Vec<u8> = (0..0x2000u32).map(|i| (i % 251) as u8).collect();
        host.flash_mut().data_mut()[0x3000..0x5000].copy_from_slice(&old);

        let new = [0xA5u8; 0x80];
        flash.erase_and_write_standard(0x3FC0, &new).unwrap();

        let model = host.flash();
        let mem = &model.data()[0x3000..0x5000];
        assert_eq!(&mem[..0xFC0], &old[..0xFC0]);
        assert_eq!(&mem[0xFC0..0x1040], &new[..]);
        assert_eq!(&mem[0x1040..], &old[0x1040..]);
        assert_eq!(count(&host, opcodes::SE_20), 2);
        assert!(model.violations().is_empty());
    }

    #[test]
    fn test_erase_and_write_full_sector_dma() {
        let (mut flash, host) = setup();
        host.flash_mut().data_mut()[0x4000..0x5000].fill(0);

        let data = Aligned::<4096>::pattern(9);
        flash
            .erase_and_write(0x4000, &data.0, WriteMode::QUAD_DMA)
            .unwrap();
        assert_eq!(&host.flash().data()[0x4000..0x5000], &data.0[..]);
        // Fully covered sector is not read back first
        assert_eq!(count(&host, opcodes::QIOR), 0);
    }

    #[test]
    fn test_reset_and_power_down() {
        let (mut flash, host) = setup();
        flash.reset().unwrap();
        {
            let model = host.flash();
            let ops: Vec<u8> = model
                .transactions()
                .iter()
                .map(|t| t.opcode)
                .filter(|&op| op != opcodes::RDSR1)
                .collect();
            assert_eq!(ops, vec![opcodes::RSTEN, opcodes::RST]);
        }

        flash.power_down().unwrap();
        assert!(host.flash().is_powered_down());
        flash.power_up().unwrap();
        assert!(!host.flash().is_powered_down());

        flash.reset_force().unwrap();
        assert!(host.flash().violations().is_empty());
        // QE is non-volatile
        assert!(flash.quad_enabled().unwrap());
    }
}
