use std::path::Path;

use log::info;

use crate::config::{LoadedConfig, MergeBackendKind};
use crate::error::PackResult;
use crate::model::{ArtifactKind, ComposedImage};
use crate::services::backends::{BuiltinMerger, ExternalMerger};
use crate::services::composer::{compose_image, CancelToken, MergeBackend};
use crate::services::locator::locate_sections;
use crate::services::publisher::{publish, Artifact, PublishReport};
use crate::services::validator::{validate_layout, ValidatedLayout};

/// Everything one post-build packaging run produced.
#[derive(Debug, Clone)]
pub struct PackageOutcome {
    pub layout: ValidatedLayout,
    pub image: ComposedImage,
    pub report: PublishReport,
}

/// Merge backend selected by the config.
pub fn merge_backend(config: &LoadedConfig, cancel: CancelToken) -> Box<dyn MergeBackend> {
    match config.config.merge.backend {
        MergeBackendKind::Builtin => Box::new(BuiltinMerger),
        MergeBackendKind::External => Box::new(
            ExternalMerger::new(config.merge_tool())
                .with_tool_args(config.config.merge.tool_args.clone())
                .with_timeout(config.merge_timeout())
                .with_cancel(cancel),
        ),
    }
}

/// Locate and validate the sections of the factory image.
pub fn resolve_layout(config: &LoadedConfig) -> PackResult<ValidatedLayout> {
    let layout = config.layout();
    let sections =
        locate_sections(&config.extra_sections()?, &layout.app_binary, config.app_offset()?)?;
    validate_layout(&sections, config.config.chip.flash_size_bytes())
}

/// Locate, validate and compose the factory image into the build directory.
pub fn compose_factory(
    config: &LoadedConfig,
    backend: &dyn MergeBackend,
) -> PackResult<(ValidatedLayout, ComposedImage)> {
    info!("Generating combined binary for serial flashing");
    let layout = resolve_layout(config)?;
    for line in layout.table().lines() {
        info!("{line}");
    }
    let image = compose_image(&layout, &config.config.chip, &config.layout().factory_image, backend)?;
    Ok((layout, image))
}

/// Full post-build step: compose the factory image, then publish the
/// application binary, factory image and ELF.
///
/// A compose failure returns before anything is published.
pub fn package_firmware(
    config: &LoadedConfig,
    backend: &dyn MergeBackend,
) -> PackResult<PackageOutcome> {
    let (layout, image) = compose_factory(config, backend)?;
    let build = config.layout();
    let target = &config.config.target;
    let artifacts = [
        Artifact::for_kind(&build.app_binary, ArtifactKind::Firmware, target),
        Artifact::for_kind(&image.path, ArtifactKind::Factory, target),
        Artifact::for_kind(&build.elf, ArtifactKind::Elf, target),
    ];
    let report = publish(&artifacts, &build.output_dir);
    Ok(PackageOutcome { layout, image, report })
}

/// Publish only the plain application binary.
pub fn publish_application(config: &LoadedConfig) -> PublishReport {
    let build = config.layout();
    let artifact =
        Artifact::for_kind(&build.app_binary, ArtifactKind::Firmware, &config.config.target);
    publish(&[artifact], &build.output_dir)
}

/// Publish a filesystem image produced by a separate build step.
pub fn publish_filesystem(config: &LoadedConfig, image: &Path) -> PublishReport {
    let artifact = Artifact::for_kind(image, ArtifactKind::Filesystem, &config.config.target);
    publish(&[artifact], &config.layout().output_dir)
}
