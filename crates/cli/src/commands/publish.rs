use anyhow::{anyhow, Result};
use flashpack_core::services::pipeline::{publish_application, publish_filesystem};

use crate::commands::{ensure_published, print_publish_report};
use crate::{canonicalize_or_current, load_with_overrides, ConfigOverrides};

/// Publish the plain application binary.
pub fn publish_app_command(config: &str, overrides: &ConfigOverrides) -> Result<()> {
    let loaded = load_with_overrides(config, overrides)?;
    let report = publish_application(&loaded);
    print_publish_report(&report);
    ensure_published(&report)
}

/// Publish a filesystem image built by a separate step.
///
/// Falls back to `filesystem_image` from the config when `image` is not given.
pub fn publish_fs_command(
    config: &str,
    image: Option<&str>,
    overrides: &ConfigOverrides,
) -> Result<()> {
    let loaded = load_with_overrides(config, overrides)?;
    let image_path = match image {
        Some(path) => canonicalize_or_current(path)?,
        None => loaded.filesystem_image().ok_or_else(|| {
            anyhow!("No filesystem image given; pass --image or set filesystem_image in the config")
        })?,
    };

    let report = publish_filesystem(&loaded, &image_path);
    print_publish_report(&report);
    ensure_published(&report)
}
