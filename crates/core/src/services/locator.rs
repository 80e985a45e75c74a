use std::path::Path;

use log::debug;

use crate::error::{PackError, PackResult};
use crate::model::{format_offset, parse_offset, Section};

/// Parse one line of the toolchain's extra-images manifest (`"<offset> <path>"`).
///
/// Only the first space separates the fields, so paths may contain spaces.
pub fn parse_extra_image_line(line: &str) -> PackResult<Section> {
    let trimmed = line.trim();
    let (offset, path) = trimmed
        .split_once(' ')
        .ok_or_else(|| PackError::InvalidImageEntry(line.to_string()))?;
    let path = path.trim();
    if path.is_empty() {
        return Err(PackError::InvalidImageEntry(line.to_string()));
    }
    Ok(Section::new(parse_offset(offset)?, path))
}

/// Resolve every blob that must appear in the image.
///
/// Platform images keep their manifest order and the application binary is
/// appended at `app_offset`. Any path missing on disk fails immediately, before
/// time is spent validating or merging.
pub fn locate_sections(
    extra_images: &[Section],
    app_binary: &Path,
    app_offset: u64,
) -> PackResult<Vec<Section>> {
    let mut sections = Vec::with_capacity(extra_images.len() + 1);
    sections.extend(extra_images.iter().cloned());
    sections.push(Section::new(app_offset, app_binary));

    for section in &sections {
        if !section.path.is_file() {
            return Err(PackError::MissingSection {
                offset: section.offset,
                path: section.path.clone(),
            });
        }
        debug!("Located {} at {}", section.path.display(), format_offset(section.offset));
    }

    Ok(sections)
}
