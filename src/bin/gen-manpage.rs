//! Man page generator for hwmem
//!
//! Usage: cargo run --bin gen-manpage -- [output-dir]
//!
//! Like devmem, hwmem is an administration tool, so the page goes to
//! section 8.

use clap::CommandFactory;
use std::fs;
use std::path::PathBuf;

#[path = "../cli.rs"]
mod cli;

const SECTION: &str = "8";

fn render() -> std::io::Result<Vec<u8>> {
    let man = clap_mangen::Man::new(cli::Cli::command())
        .section(SECTION)
        .source(format!("hwmem {}", env!("CARGO_PKG_VERSION")))
        .manual("System Administration");
    let mut buffer = Vec::new();
    man.render(&mut buffer)?;
    Ok(buffer)
}

fn main() -> std::io::Result<()> {
    let output_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("man"));

    fs::create_dir_all(&output_dir)?;

    let buffer = render()?;
    let output_path = output_dir.join(format!("hwmem.{}", SECTION));
    fs::write(&output_path, buffer)?;

    println!("Man page generated at: {}", output_path.display());
    println!("View it with: man -l {}", output_path.display());
    println!(
        "Install it with: sudo install -Dm644 {} /usr/local/share/man/man{}/hwmem.{}",
        output_path.display(),
        SECTION,
        SECTION
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_section() {
        let page = String::from_utf8(render().unwrap()).unwrap();
        assert!(page.contains(".TH hwmem 8"));
        assert!(page.contains("System Administration"));
    }
}
