//! Simulated flash session backed by an image file

use crate::cli::{Cli, Target};
use crate::error::CliError;
use heepflash_core::flash::{DriverConfig, W25q128jw, FLASH_SIZE};
use heepflash_core::spi::sck_hz;
use heepflash_sim::{FlashModel, FlashModelConfig, SimDma, SimSocCtrl, SimSpiHost};
use std::fs;
use std::path::{Path, PathBuf};

/// Driver handle used by every command
pub type Flash = W25q128jw<SimSpiHost, SimDma>;

/// An initialised driver talking to the simulated flash
pub struct Session {
    /// The driver
    pub flash: Flash,
    host: SimSpiHost,
    image: PathBuf,
    violations: usize,
}

fn preset(target: Target) -> DriverConfig {
    match target {
        Target::Fpga => DriverConfig::fpga(),
        Target::Sim => DriverConfig::simulation(),
    }
}

fn load_image(path: &Path) -> Result<Vec<u8>, CliError> {
    if !path.exists() {
        log::info!("{:?} not found, starting from an erased flash", path);
        return Ok(vec![0xFF; FLASH_SIZE as usize]);
    }
    let data = fs::read(path)?;
    if data.len() > FLASH_SIZE as usize {
        return Err(CliError::TooLarge {
            path: path.to_path_buf(),
            len: data.len(),
            start: 0,
            size: FLASH_SIZE as usize,
        });
    }
    Ok(data)
}

impl Session {
    /// Load the image, build the simulated SoC and initialise the driver
    pub fn open(cli: &Cli) -> Result<Self, CliError> {
        let target = preset(cli.target);
        let config = match &cli.config {
            Some(path) => {
                log::info!("Loading driver configuration from {:?}", path);
                DriverConfig::from_toml_file(path)?
            }
            None => target,
        };
        log::debug!("driver config: {:?}", config);

        // The flash model follows the hardware target, not the config file,
        // so a mismatched configuration shows up as protocol violations.
        let model = FlashModelConfig {
            quad_dummy_cycles: target.quad_dummy_cycles as u32,
            ..Default::default()
        };
        let host = SimSpiHost::new(FlashModel::with_data(model, load_image(&cli.image)?));
        let mut flash = W25q128jw::new(host.clone(), host.dma(), config);
        let mut soc = SimSocCtrl::new(cli.core_hz);
        flash.init(&mut soc)?;

        let clkdiv = host.configopts(0).clkdiv;
        log::info!(
            "Initialised W25Q128JW on {:?} target, SCK {} Hz (clkdiv {})",
            cli.target,
            sck_hz(cli.core_hz, clkdiv),
            clkdiv
        );

        let mut session = Self {
            flash,
            host,
            image: cli.image.clone(),
            violations: 0,
        };
        session.drain_trace();
        Ok(session)
    }

    /// The simulated SPI host
    pub fn host(&self) -> &SimSpiHost {
        &self.host
    }

    /// Drop the recorded transactions, keeping count of protocol violations
    ///
    /// Called between chunks so long transfers don't accumulate a trace.
    pub fn drain_trace(&mut self) {
        let mut model = self.host.flash_mut();
        self.violations += model.violations().len();
        model.clear_trace();
    }

    /// Write the flash contents back to the image file
    pub fn save(&mut self) -> Result<(), CliError> {
        self.drain_trace();
        fs::write(&self.image, self.host.flash().data())?;
        log::debug!("saved {:?}", self.image);
        Ok(())
    }

    /// Warn about protocol violations seen by the flash model
    pub fn finish(mut self) {
        self.drain_trace();
        if self.violations > 0 {
            log::warn!(
                "The flash model reported {} protocol violation(s)",
                self.violations
            );
        }
    }
}
