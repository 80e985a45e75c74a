use anyhow::{Context, Result};
use flashpack_core::services::composer::CancelToken;
use flashpack_core::services::pipeline::{compose_factory, merge_backend, package_firmware};

use crate::commands::{ensure_published, print_publish_report};
use crate::{load_with_overrides, ConfigOverrides};

/// Compose the factory image into the build directory without publishing it.
pub fn compose_command(config: &str, overrides: &ConfigOverrides, cancel: CancelToken) -> Result<()> {
    let loaded = load_with_overrides(config, overrides)?;
    let backend = merge_backend(&loaded, cancel);
    let (_layout, image) = compose_factory(&loaded, backend.as_ref())
        .context("Failed to compose factory image")?;

    println!("Composed factory image:");
    println!("  Path: {}", image.path.display());
    println!("  Size: {} bytes", image.size);

    Ok(())
}

/// Post-build step: compose the factory image and publish all firmware artifacts.
pub fn package_command(
    config: &str,
    overrides: &ConfigOverrides,
    cancel: CancelToken,
    json: bool,
) -> Result<()> {
    let loaded = load_with_overrides(config, overrides)?;
    let backend = merge_backend(&loaded, cancel);
    let outcome = package_firmware(&loaded, backend.as_ref())
        .context("Failed to package firmware")?;

    if json {
        let serialized = serde_json::to_string_pretty(&outcome.report)
            .context("Failed to serialize publish report to JSON")?;
        println!("{}", serialized);
    } else {
        println!("Composed {} ({} bytes)", outcome.image.path.display(), outcome.image.size);
        print_publish_report(&outcome.report);
    }

    ensure_published(&outcome.report)
}
