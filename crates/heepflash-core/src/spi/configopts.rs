//! Per-chip-select timing configuration (CONFIGOPTS register)

const CLKDIV_MASK: u32 = 0xFFFF;
const CSNIDLE_OFFSET: u32 = 16;
const CSNTRAIL_OFFSET: u32 = 20;
const CSNLEAD_OFFSET: u32 = 24;
const NIBBLE_MASK: u32 = 0xF;
const FULLCYC_BIT: u32 = 29;
const CPHA_BIT: u32 = 30;
const CPOL_BIT: u32 = 31;

/// Clock and chip-select timing for one chip select line
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub struct ConfigOpts {
    /// SCK = core clock / (2 * (clkdiv + 1))
    pub clkdiv: u16,
    /// Minimum idle cycles between transactions (4 bits)
    pub csnidle: u8,
    /// Cycles between last SCK edge and CS deassert (4 bits)
    pub csntrail: u8,
    /// Cycles between CS assert and first SCK edge (4 bits)
    pub csnlead: u8,
    /// Sample on full cycle instead of half cycle
    pub fullcyc: bool,
    /// Clock phase
    pub cpha: bool,
    /// Clock polarity
    pub cpol: bool,
}

impl ConfigOpts {
    /// Pack into the CONFIGOPTS register layout
    pub const fn encode(&self) -> u32 {
        (self.clkdiv as u32 & CLKDIV_MASK)
            | ((self.csnidle as u32 & NIBBLE_MASK) << CSNIDLE_OFFSET)
            | ((self.csntrail as u32 & NIBBLE_MASK) << CSNTRAIL_OFFSET)
            | ((self.csnlead as u32 & NIBBLE_MASK) << CSNLEAD_OFFSET)
            | ((self.fullcyc as u32) << FULLCYC_BIT)
            | ((self.cpha as u32) << CPHA_BIT)
            | ((self.cpol as u32) << CPOL_BIT)
    }

    /// Unpack a CONFIGOPTS register word
    pub const fn decode(word: u32) -> Self {
        Self {
            clkdiv: (word & CLKDIV_MASK) as u16,
            csnidle: ((word >> CSNIDLE_OFFSET) & NIBBLE_MASK) as u8,
            csntrail: ((word >> CSNTRAIL_OFFSET) & NIBBLE_MASK) as u8,
            csnlead: ((word >> CSNLEAD_OFFSET) & NIBBLE_MASK) as u8,
            fullcyc: (word >> FULLCYC_BIT) & 1 != 0,
            cpha: (word >> CPHA_BIT) & 1 != 0,
            cpol: (word >> CPOL_BIT) & 1 != 0,
        }
    }
}

/// Compute the smallest clock divider keeping SCK at or below `max_sck_hz`
///
/// SCK is `core_hz / (2 * (clkdiv + 1))`, so the divider is
/// `ceil(core_hz / (2 * max_sck_hz)) - 1`, clamped to the 16-bit field.
pub fn clock_divider(core_hz: u32, max_sck_hz: u32) -> u16 {
    if max_sck_hz == 0 {
        return u16::MAX;
    }
    let div = (core_hz as u64)
        .div_ceil(2 * max_sck_hz as u64)
        .saturating_sub(1);
    div.min(u16::MAX as u64) as u16
}

/// SCK frequency produced by a divider
pub const fn sck_hz(core_hz: u32, clkdiv: u16) -> u32 {
    core_hz / (2 * (clkdiv as u32 + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_divider() {
        const MAX: u32 = 133_000_000;
        // Core too slow to exceed the flash limit
        assert_eq!(clock_divider(100_000_000, MAX), 0);
        assert_eq!(clock_divider(266_000_000, MAX), 0);
        // One cycle over the limit bumps the divider
        assert_eq!(clock_divider(267_000_000, MAX), 1);
        assert_eq!(clock_divider(400_000_000, MAX), 1);
        assert_eq!(clock_divider(1_000_000_000, MAX), 3);
        assert_eq!(clock_divider(300_000_000, 50_000_000), 2);
    }

    #[test]
    fn test_divider_respects_limit() {
        for core in [20_000_000u32, 99_999_999, 150_000_000, 533_000_000] {
            let div = clock_divider(core, 133_000_000);
            assert!(sck_hz(core, div) <= 133_000_000);
            if div > 0 {
                // Any smaller divider would overclock the flash
                assert!(core as u64 > 2 * 133_000_000u64 * div as u64);
            }
        }
    }

    #[test]
    fn test_configopts_encode() {
        let opts = ConfigOpts {
            clkdiv: 3,
            csnidle: 0xF,
            csntrail: 0xF,
            csnlead: 0xF,
            fullcyc: false,
            cpha: false,
            cpol: false,
        };
        assert_eq!(opts.encode(), 0x0FFF_0003);
        assert_eq!(ConfigOpts::decode(opts.encode()), opts);
    }

    #[test]
    fn test_configopts_mode_bits() {
        let opts = ConfigOpts {
            cpol: true,
            cpha: true,
            fullcyc: true,
            ..Default::default()
        };
        assert_eq!(opts.encode(), 0xE000_0000);
    }
}
