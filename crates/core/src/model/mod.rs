//! Core data model for one packaging run.
//!
//! - `Section`: one binary blob placed at a flash offset
//! - `ChipProfile`: target chip and flash parameters
//! - `BuildTarget`: board/version pair used only for naming published files
//! - `ArtifactKind`: the kinds of files a build publishes
//! - `ComposedImage`: the merged factory image on disk
//!
//! Everything here is constructed fresh per build and passed explicitly into
//! each component; nothing is looked up from ambient build state.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{PackError, PackResult};

pub mod chip;

pub use chip::{known_chip, KnownChip, KNOWN_CHIPS};

/// One input to the merge: a file placed at a flash-relative byte offset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub offset: u64,
    pub path: PathBuf,
}

impl Section {
    pub fn new(offset: u64, path: impl Into<PathBuf>) -> Self {
        Self { offset, path: path.into() }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} | {}", format_offset(self.offset), self.path.display())
    }
}

/// Parse a flash offset written as `0x`-prefixed hex or plain decimal.
pub fn parse_offset(text: &str) -> PackResult<u64> {
    let trimmed = text.trim();
    let parsed = match trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => trimmed.parse::<u64>(),
    };
    parsed.map_err(|_| PackError::InvalidOffset(text.to_string()))
}

/// Render an offset the way the merge tool receives it (`0x10000`).
pub fn format_offset(offset: u64) -> String {
    format!("{offset:#x}")
}

/// SPI flash access mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashMode {
    Qio,
    Qout,
    Dio,
    Dout,
}

impl FlashMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlashMode::Qio => "qio",
            FlashMode::Qout => "qout",
            FlashMode::Dio => "dio",
            FlashMode::Dout => "dout",
        }
    }
}

impl fmt::Display for FlashMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FlashMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "qio" => Ok(FlashMode::Qio),
            "qout" => Ok(FlashMode::Qout),
            "dio" => Ok(FlashMode::Dio),
            "dout" => Ok(FlashMode::Dout),
            other => Err(format!("unknown flash mode '{other}' (expected qio, qout, dio, dout)")),
        }
    }
}

/// SPI flash clock frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlashFreq {
    #[serde(rename = "80m")]
    Mhz80,
    #[serde(rename = "40m")]
    Mhz40,
    #[serde(rename = "26m")]
    Mhz26,
    #[serde(rename = "20m")]
    Mhz20,
}

impl FlashFreq {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlashFreq::Mhz80 => "80m",
            FlashFreq::Mhz40 => "40m",
            FlashFreq::Mhz26 => "26m",
            FlashFreq::Mhz20 => "20m",
        }
    }
}

impl fmt::Display for FlashFreq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FlashFreq {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Board configs often spell the frequency in Hz (e.g. `40000000L`).
        let normalized = s.trim().trim_end_matches('L').to_ascii_lowercase();
        match normalized.as_str() {
            "80m" | "80000000" => Ok(FlashFreq::Mhz80),
            "40m" | "40000000" => Ok(FlashFreq::Mhz40),
            "26m" | "26000000" | "26667000" => Ok(FlashFreq::Mhz26),
            "20m" | "20000000" => Ok(FlashFreq::Mhz20),
            _ => Err(format!("unknown flash frequency '{s}' (expected 80m, 40m, 26m, 20m)")),
        }
    }
}

/// Immutable per-build chip and flash parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChipProfile {
    pub chip_id: String,
    pub flash_mode: FlashMode,
    pub flash_freq: FlashFreq,
    /// Flash size as the merge tool spells it, e.g. `4MB`.
    pub flash_size: String,
}

impl ChipProfile {
    pub fn new(
        chip_id: impl Into<String>,
        flash_mode: FlashMode,
        flash_freq: FlashFreq,
        flash_size: impl Into<String>,
    ) -> Self {
        Self { chip_id: chip_id.into(), flash_mode, flash_freq, flash_size: flash_size.into() }
    }

    /// Flash size in bytes, or `None` for symbolic sizes such as `keep` or `detect`.
    pub fn flash_size_bytes(&self) -> Option<u64> {
        parse_size(&self.flash_size)
    }
}

/// Parse sizes like `4MB`, `512KB` or a bare byte count.
pub fn parse_size(text: &str) -> Option<u64> {
    let upper = text.trim().to_ascii_uppercase();
    let (digits, multiplier) = if let Some(n) = upper.strip_suffix("MB") {
        (n, 1024 * 1024)
    } else if let Some(n) = upper.strip_suffix("KB") {
        (n, 1024)
    } else {
        (upper.as_str(), 1)
    };
    digits.trim().parse::<u64>().ok().map(|n| n * multiplier)
}

/// Identifies one build variant. Used only for naming published artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildTarget {
    pub board: String,
    pub version: String,
}

impl BuildTarget {
    pub fn new(board: impl Into<String>, version: impl Into<String>) -> Self {
        Self { board: board.into(), version: version.into() }
    }
}

/// Kinds of files a build stages into the output directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// Standalone application binary.
    Firmware,
    /// Composed factory image, flashed at offset zero.
    Factory,
    /// Raw ELF with symbols.
    Elf,
    /// Filesystem image produced by a separate build step.
    Filesystem,
}

impl ArtifactKind {
    /// Deterministic published file name for this artifact kind and target.
    pub fn file_name(&self, target: &BuildTarget) -> String {
        let (stem, ext) = match self {
            ArtifactKind::Firmware => ("firmware", "bin"),
            ArtifactKind::Factory => ("firmware", "factory.bin"),
            ArtifactKind::Elf => ("firmware", "elf"),
            ArtifactKind::Filesystem => ("filesystem", "bin"),
        };
        format!("{stem}_{}_{}.{ext}", target.board, target.version)
    }
}

/// The merged image written by the composer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposedImage {
    pub path: PathBuf,
    pub size: u64,
}

impl ComposedImage {
    pub fn path(&self) -> &Path {
        &self.path
    }
}
