//! Build configuration loaded from `flashpack.json` / `flashpack.yaml`.
//!
//! The config is the only place build parameters come from. It is parsed once
//! per invocation and unpacked into explicit values (`ChipProfile`,
//! `BuildTarget`, section lists) before any component runs.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::PackResult;
use crate::layout::BuildLayout;
use crate::model::{parse_offset, BuildTarget, ChipProfile, Section};

/// Environment variable consulted when the config names no merge tool.
pub const MERGE_TOOL_ENV: &str = "FLASHPACK_MERGE_TOOL";

pub const DEFAULT_MERGE_TOOL: &str = "esptool.py";
pub const DEFAULT_APP_OFFSET: u64 = 0x10000;
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_CONFIG_FILE: &str = "flashpack.json";

/// An offset written either as a number or as a hex/decimal string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OffsetValue {
    Number(u64),
    Text(String),
}

impl OffsetValue {
    pub fn resolve(&self) -> PackResult<u64> {
        match self {
            OffsetValue::Number(n) => Ok(*n),
            OffsetValue::Text(text) => parse_offset(text),
        }
    }
}

impl Default for OffsetValue {
    fn default() -> Self {
        OffsetValue::Text(crate::model::format_offset(DEFAULT_APP_OFFSET))
    }
}

/// One entry of the toolchain's "extra flash images" manifest.
///
/// Accepts the manifest's own line format (`"0x1000 path/to/bootloader.bin"`)
/// or an explicit object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExtraImage {
    Line(String),
    Entry { offset: OffsetValue, path: String },
}

/// Which merge implementation composes the image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeBackendKind {
    /// Shell out to the `merge-bin` capable flash tool.
    #[default]
    External,
    /// Merge in-process.
    Builtin,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeSettings {
    #[serde(default)]
    pub backend: MergeBackendKind,
    /// Merge tool executable; falls back to `$FLASHPACK_MERGE_TOOL`, then `esptool.py`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
    /// Arguments placed before the merge arguments (e.g. `["-m", "esptool"]`).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_args: Vec<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for MergeSettings {
    fn default() -> Self {
        Self {
            backend: MergeBackendKind::default(),
            tool: None,
            tool_args: Vec::new(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_prog_name() -> String {
    "firmware".to_string()
}

fn default_config_version() -> String {
    "0.1.0".to_string()
}

/// Serializable description of one build's packaging inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackConfig {
    /// Schema/config version. This is about the config format, not the firmware version.
    #[serde(default = "default_config_version")]
    pub config_version: String,
    pub target: BuildTarget,
    pub chip: ChipProfile,
    /// Toolchain build directory (relative to the config file).
    pub build_dir: String,
    /// Base name of the toolchain outputs (`<prog>.bin`, `<prog>.elf`).
    #[serde(default = "default_prog_name")]
    pub prog_name: String,
    /// Offset of the application partition.
    #[serde(default)]
    pub app_offset: OffsetValue,
    /// Bootloader, partition table, boot selector and any other platform images.
    #[serde(default)]
    pub extra_images: Vec<ExtraImage>,
    /// Filesystem image produced by a separate build step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filesystem_image: Option<String>,
    /// Publish directory; defaults to `build` next to the config file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<String>,
    #[serde(default)]
    pub merge: MergeSettings,
}

impl PackConfig {
    /// Starter config for a board using the chip's default partition layout.
    pub fn example(board: &str, version: &str, chip: ChipProfile) -> Self {
        let known = crate::model::known_chip(&chip.chip_id);
        let build_dir = format!(".pio/build/{board}");
        let extra_images = match known {
            Some(k) => vec![
                ExtraImage::Line(format!(
                    "{} {build_dir}/bootloader.bin",
                    crate::model::format_offset(k.bootloader_offset)
                )),
                ExtraImage::Line(format!(
                    "{} {build_dir}/partitions.bin",
                    crate::model::format_offset(k.partition_table_offset)
                )),
                ExtraImage::Line(format!(
                    "{} {build_dir}/boot_app0.bin",
                    crate::model::format_offset(k.boot_selector_offset)
                )),
            ],
            None => Vec::new(),
        };
        let app_offset = known.map(|k| k.app_offset).unwrap_or(DEFAULT_APP_OFFSET);

        Self {
            config_version: default_config_version(),
            target: BuildTarget::new(board, version),
            chip,
            build_dir,
            prog_name: default_prog_name(),
            app_offset: OffsetValue::Text(crate::model::format_offset(app_offset)),
            extra_images,
            filesystem_image: None,
            output_dir: Some("build".to_string()),
            merge: MergeSettings::default(),
        }
    }
}

/// A parsed config together with the directory its relative paths resolve against.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: PackConfig,
    pub base_dir: PathBuf,
}

impl LoadedConfig {
    pub fn new(config: PackConfig, base_dir: impl Into<PathBuf>) -> Self {
        Self { config, base_dir: base_dir.into() }
    }

    /// Resolve a config path (may be relative or absolute).
    pub fn resolve_path(&self, path: impl AsRef<Path>) -> PathBuf {
        let candidate = path.as_ref();
        if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.base_dir.join(candidate)
        }
    }

    pub fn layout(&self) -> BuildLayout {
        let output_dir = self
            .config
            .output_dir
            .as_deref()
            .map(|dir| self.resolve_path(dir))
            .unwrap_or_else(|| self.base_dir.join("build"));
        BuildLayout::new(self.resolve_path(&self.config.build_dir), &self.config.prog_name, output_dir)
    }

    pub fn app_offset(&self) -> PackResult<u64> {
        self.config.app_offset.resolve()
    }

    /// Extra images as sections, in manifest order, with paths resolved.
    pub fn extra_sections(&self) -> PackResult<Vec<Section>> {
        self.config
            .extra_images
            .iter()
            .map(|image| match image {
                ExtraImage::Line(line) => {
                    let section = crate::services::locator::parse_extra_image_line(line)?;
                    Ok(Section::new(section.offset, self.resolve_path(&section.path)))
                }
                ExtraImage::Entry { offset, path } => {
                    Ok(Section::new(offset.resolve()?, self.resolve_path(path)))
                }
            })
            .collect()
    }

    pub fn filesystem_image(&self) -> Option<PathBuf> {
        self.config.filesystem_image.as_deref().map(|p| self.resolve_path(p))
    }

    /// Merge tool: config value, then `$FLASHPACK_MERGE_TOOL`, then `esptool.py`.
    ///
    /// Values containing a path separator resolve against the config directory;
    /// bare names are left for `PATH` lookup.
    pub fn merge_tool(&self) -> PathBuf {
        let tool = self
            .config
            .merge
            .tool
            .clone()
            .or_else(|| std::env::var(MERGE_TOOL_ENV).ok().filter(|v| !v.is_empty()))
            .unwrap_or_else(|| DEFAULT_MERGE_TOOL.to_string());
        if tool.contains('/') || tool.contains('\\') {
            self.resolve_path(&tool)
        } else {
            PathBuf::from(tool)
        }
    }

    pub fn merge_timeout(&self) -> Duration {
        Duration::from_secs(self.config.merge.timeout_secs)
    }
}

/// Load a config file, choosing the parser from the extension (yaml/yml, else JSON).
pub fn load_config(path: impl AsRef<Path>) -> Result<LoadedConfig> {
    let path = path.as_ref();
    let body = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config at {}", path.display()))?;
    let config: PackConfig = if is_yaml(path) {
        serde_yaml::from_str(&body).context("Failed to parse config YAML")?
    } else {
        serde_json::from_str(&body).context("Failed to parse config JSON")?
    };

    let base_dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().context("Failed to get current directory")?,
    };
    Ok(LoadedConfig::new(config, base_dir))
}

/// Serialize a config to `path`, refusing to overwrite an existing file.
pub fn write_config(path: impl AsRef<Path>, config: &PackConfig) -> Result<()> {
    let path = path.as_ref();
    if path.exists() {
        return Err(anyhow!("Config already exists at {}", path.display()));
    }
    let body = if is_yaml(path) {
        serde_yaml::to_string(config).context("Failed to serialize config YAML")?
    } else {
        serde_json::to_string_pretty(config).context("Failed to serialize config JSON")?
    };
    fs::write(path, body).with_context(|| format!("Failed to write config: {}", path.display()))
}

fn is_yaml(path: &Path) -> bool {
    matches!(path.extension().and_then(|e| e.to_str()), Some("yaml" | "yml"))
}
