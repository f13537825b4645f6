//! Man page generator for heepflash
//!
//! Writes `heepflash.1` plus one `heepflash-<command>.1` page per
//! subcommand.
//!
//! Usage: cargo run --bin gen-manpage -- [output-dir]

use clap::CommandFactory;
use std::fs;
use std::path::PathBuf;

#[path = "../cli.rs"]
#[allow(dead_code)]
mod cli;

/// Render the top-level page and one page per subcommand as (file name, roff)
fn render_pages(cmd: clap::Command) -> std::io::Result<Vec<(String, Vec<u8>)>> {
    let name = cmd.get_name().to_string();
    let mut pages = Vec::new();

    for sub in cmd.get_subcommands().filter(|s| s.get_name() != "help") {
        let title = format!("{}-{}", name, sub.get_name());
        let mut buffer = Vec::new();
        clap_mangen::Man::new(sub.clone())
            .title(title.clone())
            .render(&mut buffer)?;
        pages.push((format!("{}.1", title), buffer));
    }

    let mut buffer = Vec::new();
    clap_mangen::Man::new(cmd).render(&mut buffer)?;
    pages.insert(0, (format!("{}.1", name), buffer));
    Ok(pages)
}

fn main() -> std::io::Result<()> {
    let args: Vec<String> = std::env::args().collect();

    // Default to ./man directory
    let output_dir = if args.len() > 1 {
        PathBuf::from(&args[1])
    } else {
        PathBuf::from("man")
    };

    fs::create_dir_all(&output_dir)?;

    for (file, page) in render_pages(cli::Cli::command())? {
        let output_path = output_dir.join(file);
        fs::write(&output_path, page)?;
        println!("Generated {}", output_path.display());
    }
    println!("\nTo view the main page:");
    println!("  man -l {}", output_dir.join("heepflash.1").display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_page_per_command() {
        let pages = render_pages(cli::Cli::command()).unwrap();
        let names: Vec<&str> = pages.iter().map(|(name, _)| name.as_str()).collect();

        assert_eq!(names[0], "heepflash.1");
        // info, read, write, erase, verify, reset, power-down
        assert_eq!(pages.len(), 8);
        assert!(names.contains(&"heepflash-write.1"));
        assert!(names.contains(&"heepflash-power-down.1"));
        assert!(pages.iter().all(|(_, roff)| !roff.is_empty()));
    }
}
