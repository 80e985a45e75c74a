use anyhow::{anyhow, Result};
use flashpack_core::config::{write_config, PackConfig};
use flashpack_core::model::{format_offset, known_chip, ChipProfile, FlashFreq, FlashMode};

use crate::canonicalize_or_current;

/// Write a starter config for `board`, pre-filled with the chip's default layout.
pub fn init_config_command(
    config: &str,
    board: &str,
    version: &str,
    chip_id: &str,
    flash_mode: &str,
    flash_freq: &str,
    flash_size: &str,
) -> Result<()> {
    let flash_mode: FlashMode = flash_mode.parse().map_err(|e: String| anyhow!(e))?;
    let flash_freq: FlashFreq = flash_freq.parse().map_err(|e: String| anyhow!(e))?;
    let chip = ChipProfile::new(chip_id, flash_mode, flash_freq, flash_size);

    let path = canonicalize_or_current(config)?;
    let pack_config = PackConfig::example(board, version, chip);
    write_config(&path, &pack_config)?;

    println!("Initialized flashpack config:");
    println!("  Config: {}", path.display());
    println!("  Board: {}", pack_config.target.board);
    println!("  Version: {}", pack_config.target.version);
    println!("  Build dir: {}", pack_config.build_dir);
    match known_chip(chip_id) {
        Some(known) => {
            println!("  Chip: {} (bootloader at {})", known.name, format_offset(known.bootloader_offset))
        }
        None => println!("  Chip: {chip_id} (unknown; add extra_images by hand)"),
    }

    Ok(())
}
