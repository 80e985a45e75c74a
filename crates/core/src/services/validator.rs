use std::fs;

use serde::Serialize;

use crate::error::{PackError, PackResult};
use crate::model::{format_offset, Section};

/// A section together with the size of its file on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayoutEntry {
    pub section: Section,
    pub size: u64,
}

impl LayoutEntry {
    /// First byte past this section.
    pub fn end(&self) -> u64 {
        self.section.offset.saturating_add(self.size)
    }
}

/// A section list that passed validation: every file exists and is non-empty,
/// offsets strictly ascend, and no section runs into the next.
///
/// Only `validate_layout` constructs this, so the composer never sees an
/// unchecked list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidatedLayout {
    entries: Vec<LayoutEntry>,
}

impl ValidatedLayout {
    pub fn entries(&self) -> &[LayoutEntry] {
        &self.entries
    }

    pub fn sections(&self) -> impl Iterator<Item = &Section> {
        self.entries.iter().map(|e| &e.section)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First byte past the last section.
    pub fn image_end(&self) -> u64 {
        self.entries.last().map(LayoutEntry::end).unwrap_or(0)
    }

    /// Diagnostic `Offset | File` table, one line per section.
    pub fn table(&self) -> String {
        let mut out = String::from("    Offset | File\n");
        for entry in &self.entries {
            out.push_str(&format!(
                " - {:>8} | {}\n",
                format_offset(entry.section.offset),
                entry.section.path.display()
            ));
        }
        out
    }
}

/// Check a resolved section list before anything is merged.
///
/// Order is checked on the sequence as given; a duplicate or descending offset
/// is a misconfiguration and is reported, never reordered. When `flash_size` is
/// known the image must also fit in it.
pub fn validate_layout(sections: &[Section], flash_size: Option<u64>) -> PackResult<ValidatedLayout> {
    if sections.is_empty() {
        return Err(PackError::NoSections);
    }

    let mut entries = Vec::with_capacity(sections.len());
    for section in sections {
        let size = section_size(section)?;
        entries.push(LayoutEntry { section: section.clone(), size });
    }

    for pair in entries.windows(2) {
        let (first, second) = (&pair[0], &pair[1]);
        if second.section.offset <= first.section.offset {
            return Err(PackError::LayoutConflict {
                first: first.section.clone(),
                second: second.section.clone(),
            });
        }
        if first.end() > second.section.offset {
            return Err(PackError::Overlap {
                first: first.section.clone(),
                first_size: first.size,
                second: second.section.clone(),
                overflow: first.end() - second.section.offset,
            });
        }
    }

    let layout = ValidatedLayout { entries };
    if let Some(flash_size) = flash_size {
        if layout.image_end() > flash_size {
            return Err(PackError::ImageTooLarge { end: layout.image_end(), flash_size });
        }
    }

    Ok(layout)
}

fn section_size(section: &Section) -> PackResult<u64> {
    let missing = || PackError::MissingSection { offset: section.offset, path: section.path.clone() };
    let metadata = match fs::metadata(&section.path) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Err(missing()),
        Err(err) => return Err(PackError::io(&section.path, err)),
    };
    if !metadata.is_file() {
        return Err(missing());
    }
    if metadata.len() == 0 {
        return Err(PackError::EmptySection { offset: section.offset, path: section.path.clone() });
    }
    Ok(metadata.len())
}
