//! CLI argument parsing

use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Parse a string as a hex or decimal u32
pub fn parse_hex_u32(s: &str) -> Result<u32, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u32>().map_err(|e| format!("Invalid number: {}", e))
    }
}

#[derive(Parser)]
#[command(name = "heepflash")]
#[command(author, version, about = "X-HEEP W25Q128JW flash tool (simulated SPI host)", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Flash image backing the simulated W25Q128JW (created erased if missing)
    #[arg(long, global = true, default_value = "flash.bin")]
    pub image: PathBuf,

    /// Driver configuration file (TOML), overrides the --target preset
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Hardware target the flash model and default configuration follow
    #[arg(long, global = true, value_enum, default_value_t = Target::Fpga)]
    pub target: Target,

    /// Core clock frequency in Hz
    #[arg(long, global = true, value_parser = parse_hex_u32, default_value = "100000000")]
    pub core_hz: u32,

    #[command(subcommand)]
    pub command: Commands,
}

/// Hardware target
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Target {
    /// FPGA board (4 quad-read dummy cycles)
    Fpga,
    /// RTL simulation (8 quad-read dummy cycles)
    Sim,
}

/// Transfer options shared by the data commands
#[derive(Args, Debug, Clone, Copy, Default)]
pub struct TransferArgs {
    /// Use the quad opcodes (Fast Read Quad I/O, Quad Page Program)
    #[arg(long)]
    pub quad: bool,

    /// Move data through the DMA channel instead of the CPU
    #[arg(long)]
    pub dma: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialise the flash and show its identification and status
    Info,

    /// Read flash contents to file
    Read {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Start address (hex, e.g., 0x10000)
        #[arg(long, value_parser = parse_hex_u32, default_value = "0")]
        start: u32,

        /// Number of bytes to read (defaults to the rest of the flash)
        #[arg(long, value_parser = parse_hex_u32)]
        length: Option<u32>,

        #[command(flatten)]
        transfer: TransferArgs,
    },

    /// Write file to flash
    Write {
        /// Input file path
        #[arg(short, long)]
        input: PathBuf,

        /// Start address (hex, e.g., 0x10000)
        #[arg(long, value_parser = parse_hex_u32, default_value = "0")]
        start: u32,

        #[command(flatten)]
        transfer: TransferArgs,

        /// Don't erase before writing (bits can only be cleared)
        #[arg(long)]
        no_erase: bool,

        /// Skip the read-back verification
        #[arg(long)]
        no_verify: bool,
    },

    /// Erase the chip or a sector-aligned region
    #[command(group(ArgGroup::new("region").required(true).args(["chip", "start"])))]
    Erase {
        /// Erase the whole chip
        #[arg(long)]
        chip: bool,

        /// Start address of the region (hex, 4 KiB aligned)
        #[arg(long, value_parser = parse_hex_u32, requires = "length")]
        start: Option<u32>,

        /// Length of the region (hex or decimal, multiple of 4 KiB)
        #[arg(long, value_parser = parse_hex_u32, requires = "start")]
        length: Option<u32>,
    },

    /// Verify flash contents against file
    Verify {
        /// Input file path to verify against
        #[arg(short, long)]
        input: PathBuf,

        /// Start address (hex, e.g., 0x10000)
        #[arg(long, value_parser = parse_hex_u32, default_value = "0")]
        start: u32,

        /// Read back with Fast Read Quad I/O
        #[arg(long)]
        quad: bool,
    },

    /// Software reset the flash
    Reset {
        /// Don't wait for a running erase or program to finish
        #[arg(long)]
        force: bool,
    },

    /// Put the flash into deep power-down
    PowerDown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_u32() {
        assert_eq!(parse_hex_u32("0x1000"), Ok(0x1000));
        assert_eq!(parse_hex_u32("0XFF"), Ok(0xFF));
        assert_eq!(parse_hex_u32("4096"), Ok(4096));
        assert!(parse_hex_u32("0xZZ").is_err());
        assert!(parse_hex_u32("-1").is_err());
    }

    #[test]
    fn test_erase_needs_a_region() {
        assert!(Cli::try_parse_from(["heepflash", "erase"]).is_err());
        assert!(Cli::try_parse_from(["heepflash", "erase", "--chip", "--start", "0"]).is_err());
        assert!(Cli::try_parse_from(["heepflash", "erase", "--start", "0x1000"]).is_err());

        let cli =
            Cli::try_parse_from(["heepflash", "erase", "--start", "0x1000", "--length", "8192"])
                .unwrap();
        match cli.command {
            Commands::Erase {
                chip,
                start,
                length,
            } => {
                assert!(!chip);
                assert_eq!(start, Some(0x1000));
                assert_eq!(length, Some(8192));
            }
            _ => panic!("expected erase"),
        }
    }

    #[test]
    fn test_global_options() {
        let cli = Cli::try_parse_from([
            "heepflash",
            "read",
            "-o",
            "out.bin",
            "--quad",
            "--dma",
            "--target",
            "sim",
            "--core-hz",
            "0x17D78400",
        ])
        .unwrap();
        assert_eq!(cli.target, Target::Sim);
        assert_eq!(cli.core_hz, 400_000_000);
        match cli.command {
            Commands::Read { transfer, .. } => assert!(transfer.quad && transfer.dma),
            _ => panic!("expected read"),
        }
    }
}
