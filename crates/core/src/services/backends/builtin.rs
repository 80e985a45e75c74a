use std::fs;
use std::path::Path;

use log::{debug, warn};

use crate::error::{PackError, PackResult};
use crate::model::chip::{flash_size_nibble, IMAGE_MAGIC};
use crate::model::{known_chip, ChipProfile};
use crate::services::composer::MergeBackend;
use crate::services::validator::ValidatedLayout;

/// Value of erased NOR flash; gaps between sections are filled with it.
pub const ERASED_BYTE: u8 = 0xFF;

/// Largest image the builtin merger assembles in memory (the biggest flash
/// size an image header can express).
pub const MAX_IMAGE_SIZE: u64 = 128 * 1024 * 1024;

/// In-process merge with the same layout rules as `merge-bin`.
///
/// Sections are copied to their offsets, gaps are padded with `0xFF`, and the
/// bootloader header (when present at the chip's bootloader offset) gets the
/// flash mode, frequency and size from the chip profile.
pub struct BuiltinMerger;

impl MergeBackend for BuiltinMerger {
    fn merge(&self, layout: &ValidatedLayout, chip: &ChipProfile, output: &Path) -> PackResult<()> {
        let bootloader_offset = match known_chip(&chip.chip_id) {
            Some(known) => Some(known.bootloader_offset),
            None => {
                warn!("Unknown chip '{}'; bootloader header left as built", chip.chip_id);
                None
            }
        };

        if layout.image_end() > MAX_IMAGE_SIZE {
            return Err(PackError::ImageTooLarge {
                end: layout.image_end(),
                flash_size: MAX_IMAGE_SIZE,
            });
        }

        let mut image: Vec<u8> = Vec::with_capacity(layout.image_end() as usize);
        for entry in layout.entries() {
            let data =
                fs::read(&entry.section.path).map_err(|e| PackError::io(&entry.section.path, e))?;
            let start = entry.section.offset as usize;
            let end = start + data.len();
            if image.len() < end {
                image.resize(end, ERASED_BYTE);
            }
            image[start..end].copy_from_slice(&data);

            if Some(entry.section.offset) == bootloader_offset {
                patch_flash_params(&mut image[start..end], chip);
            }
        }

        fs::write(output, &image).map_err(|e| PackError::io(output, e))
    }

    fn name(&self) -> &'static str {
        "builtin"
    }
}

/// Rewrite bytes 2-3 of an image header with the chip profile's flash settings.
///
/// Headers without the image magic are left alone. A flash size the header
/// cannot express keeps the size nibble already in the image.
pub fn patch_flash_params(header: &mut [u8], chip: &ChipProfile) {
    if header.len() < 8 || header[0] != IMAGE_MAGIC {
        debug!("No image header at bootloader offset; skipping flash parameter update");
        return;
    }

    let size_nibble = flash_size_nibble(&chip.flash_size).unwrap_or(header[3] & 0xF0);
    header[2] = chip.flash_mode.header_byte();
    header[3] = size_nibble | chip.flash_freq.header_nibble();
    debug!("Bootloader header: mode {:#04x}, size/freq {:#04x}", header[2], header[3]);
}
