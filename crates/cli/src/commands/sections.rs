use anyhow::{Context, Result};
use flashpack_core::model::format_offset;
use flashpack_core::services::pipeline::resolve_layout;
use serde::Serialize;

use crate::{load_with_overrides, ConfigOverrides};

#[derive(Serialize)]
pub struct SectionInfo {
    pub offset: String,
    pub size: u64,
    pub path: String,
}

/// Locate and validate the factory image sections without merging anything.
pub fn sections_command(config: &str, json: bool) -> Result<()> {
    let loaded = load_with_overrides(config, &ConfigOverrides::default())?;
    let layout = resolve_layout(&loaded)?;

    if json {
        let sections: Vec<SectionInfo> = layout
            .entries()
            .iter()
            .map(|e| SectionInfo {
                offset: format_offset(e.section.offset),
                size: e.size,
                path: e.section.path.display().to_string(),
            })
            .collect();
        let serialized =
            serde_json::to_string_pretty(&sections).context("Failed to serialize sections to JSON")?;
        println!("{}", serialized);
    } else {
        print!("{}", layout.table());
        println!("Image end: {} ({} sections)", format_offset(layout.image_end()), layout.len());
    }

    Ok(())
}
