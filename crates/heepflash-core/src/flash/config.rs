//! Driver configuration
//!
//! With the `std` feature the configuration can be loaded from TOML:
//!
//! ```toml
//! quad_dummy_cycles = 4
//! max_flash_hz = 133000000
//!
//! [poll]
//! max_status_polls = 100000
//! status_poll_delay_us = 10
//! ```
//!
//! Missing keys fall back to the [`DriverConfig::fpga`] preset.

use crate::host::PollLimits;
use crate::spi::{clock_divider, ConfigOpts};

/// Fast Read Quad I/O dummy cycles on the FPGA target
pub const FPGA_QUAD_DUMMY_CYCLES: u8 = 4;
/// Fast Read Quad I/O dummy cycles expected by the RTL flash model
pub const SIM_QUAD_DUMMY_CYCLES: u8 = 8;
/// Maximum SCK frequency supported by the W25Q128JW
pub const MAX_FLASH_HZ: u32 = 133_000_000;

/// Tunables for [`super::W25q128jw`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "std", serde(default))]
pub struct DriverConfig {
    /// Dummy cycles between the address phase and data of a quad read
    pub quad_dummy_cycles: u8,
    /// SCK ceiling used to derive the clock divider
    pub max_flash_hz: u32,
    /// Minimum idle cycles between transactions (4 bits)
    pub cs_idle_cycles: u8,
    /// Cycles from last SCK edge to CS deassert (4 bits)
    pub cs_trail_cycles: u8,
    /// Cycles from CS assert to first SCK edge (4 bits)
    pub cs_lead_cycles: u8,
    /// Bounds for the polling loops
    pub poll: PollLimits,
}

impl DriverConfig {
    /// Preset for FPGA boards
    pub fn fpga() -> Self {
        Self {
            quad_dummy_cycles: FPGA_QUAD_DUMMY_CYCLES,
            max_flash_hz: MAX_FLASH_HZ,
            cs_idle_cycles: 0xF,
            cs_trail_cycles: 0xF,
            cs_lead_cycles: 0xF,
            poll: PollLimits::default(),
        }
    }

    /// Preset for RTL simulation
    pub fn simulation() -> Self {
        Self {
            quad_dummy_cycles: SIM_QUAD_DUMMY_CYCLES,
            ..Self::fpga()
        }
    }

    /// CONFIGOPTS value for the flash chip select at `core_hz`
    pub fn configopts(&self, core_hz: u32) -> ConfigOpts {
        ConfigOpts {
            clkdiv: clock_divider(core_hz, self.max_flash_hz),
            csnidle: self.cs_idle_cycles,
            csntrail: self.cs_trail_cycles,
            csnlead: self.cs_lead_cycles,
            fullcyc: false,
            cpha: false,
            cpol: false,
        }
    }
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self::fpga()
    }
}

#[cfg(feature = "std")]
mod file {
    use super::DriverConfig;
    use std::path::Path;
    use std::string::String;

    /// Errors loading a configuration file
    #[derive(Debug, thiserror::Error)]
    pub enum ConfigError {
        /// File could not be read
        #[error("failed to read config file: {0}")]
        Io(#[from] std::io::Error),
        /// File is not valid TOML for [`DriverConfig`]
        #[error("invalid config: {0}")]
        Parse(String),
        /// Value out of range
        #[error("invalid config value for {field}: {reason}")]
        Invalid {
            /// Offending key
            field: &'static str,
            /// What is wrong with it
            reason: &'static str,
        },
    }

    impl DriverConfig {
        /// Parse a configuration from a TOML string
        pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
            let config: Self =
                toml::from_str(content).map_err(|e| ConfigError::Parse(e.message().into()))?;
            config.validate()?;
            Ok(config)
        }

        /// Load a configuration from a TOML file
        pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
            let content = std::fs::read_to_string(path)?;
            Self::from_toml_str(&content)
        }

        fn validate(&self) -> Result<(), ConfigError> {
            if self.max_flash_hz == 0 {
                return Err(ConfigError::Invalid {
                    field: "max_flash_hz",
                    reason: "must be non-zero",
                });
            }
            for (field, value) in [
                ("cs_idle_cycles", self.cs_idle_cycles),
                ("cs_trail_cycles", self.cs_trail_cycles),
                ("cs_lead_cycles", self.cs_lead_cycles),
            ] {
                if value > 0xF {
                    return Err(ConfigError::Invalid {
                        field,
                        reason: "must fit in 4 bits",
                    });
                }
            }
            Ok(())
        }
    }
}

#[cfg(feature = "std")]
pub use file::ConfigError;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        assert_eq!(DriverConfig::fpga().quad_dummy_cycles, 4);
        assert_eq!(DriverConfig::simulation().quad_dummy_cycles, 8);
        assert_eq!(DriverConfig::default(), DriverConfig::fpga());
    }

    #[test]
    fn test_configopts() {
        let opts = DriverConfig::fpga().configopts(400_000_000);
        assert_eq!(opts.encode(), 0x0FFF_0001);
    }

    #[cfg(feature = "std")]
    #[test]
    fn test_from_toml() {
        let config = DriverConfig::from_toml_str(
            "quad_dummy_cycles = 8\n[poll]\nmax_status_polls = 500\n",
        )
        .unwrap();
        assert_eq!(config.quad_dummy_cycles, 8);
        assert_eq!(config.poll.max_status_polls, 500);
        assert_eq!(config.poll.max_ready_polls, PollLimits::default().max_ready_polls);
        assert_eq!(config.max_flash_hz, MAX_FLASH_HZ);

        assert!(matches!(
            DriverConfig::from_toml_str("cs_idle_cycles = 16"),
            Err(ConfigError::Invalid { field: "cs_idle_cycles", .. })
        ));
        assert!(matches!(
            DriverConfig::from_toml_str("quad_dummy_cycles = \"many\""),
            Err(ConfigError::Parse(_))
        ));
    }
}
