//! Stage build artifacts into the output directory under stable names.
//!
//! Publishing is lenient, unlike section resolution:
//! - an output directory that does not exist turns the whole step into a no-op
//!   (builds that never configured one still succeed);
//! - a source that does not exist is skipped, since not every build produces
//!   every artifact kind;
//! - each copy is independent, so one failure does not undo or stop the others.
//!
//! There is no cross-build locking. Two concurrent builds for the same
//! board/version race on the published names; callers must serialize them.

use std::fs;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::{PackError, PackResult};
use crate::model::{ArtifactKind, BuildTarget};

/// A source file and the name it is published under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    pub source: PathBuf,
    pub name: String,
}

impl Artifact {
    pub fn new(source: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self { source: source.into(), name: name.into() }
    }

    /// Artifact named by the `<kind>_<board>_<version>.<ext>` template.
    pub fn for_kind(source: impl Into<PathBuf>, kind: ArtifactKind, target: &BuildTarget) -> Self {
        Self::new(source, kind.file_name(target))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PublishOutcome {
    Copied { destination: PathBuf, bytes: u64, sha256: String },
    SkippedMissingSource,
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishedArtifact {
    pub source: PathBuf,
    pub name: String,
    pub outcome: PublishOutcome,
}

/// Per-file results of one publish step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishReport {
    pub output_dir: PathBuf,
    /// True when the output directory was absent and nothing was attempted.
    pub skipped_output_dir: bool,
    pub artifacts: Vec<PublishedArtifact>,
}

impl PublishReport {
    pub fn copied(&self) -> impl Iterator<Item = &PublishedArtifact> {
        self.artifacts.iter().filter(|a| matches!(a.outcome, PublishOutcome::Copied { .. }))
    }

    pub fn failures(&self) -> impl Iterator<Item = &PublishedArtifact> {
        self.artifacts.iter().filter(|a| matches!(a.outcome, PublishOutcome::Failed { .. }))
    }

    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }
}

/// Copy each existing source to `output_dir/name`, overwriting earlier copies.
pub fn publish(artifacts: &[Artifact], output_dir: &Path) -> PublishReport {
    let mut report = PublishReport {
        output_dir: output_dir.to_path_buf(),
        skipped_output_dir: false,
        artifacts: Vec::with_capacity(artifacts.len()),
    };

    if !output_dir.is_dir() {
        info!("Output directory {} does not exist; nothing published", output_dir.display());
        report.skipped_output_dir = true;
        return report;
    }

    for artifact in artifacts {
        let outcome = if !artifact.source.is_file() {
            info!("Skipping {}: not produced by this build", artifact.source.display());
            PublishOutcome::SkippedMissingSource
        } else {
            let destination = output_dir.join(&artifact.name);
            info!("Copying '{}' to '{}'", artifact.source.display(), destination.display());
            match copy_artifact(&artifact.source, &destination) {
                Ok((bytes, sha256)) => PublishOutcome::Copied { destination, bytes, sha256 },
                Err(err) => {
                    warn!("{err}");
                    PublishOutcome::Failed { error: err.to_string() }
                }
            }
        };
        report.artifacts.push(PublishedArtifact {
            source: artifact.source.clone(),
            name: artifact.name.clone(),
            outcome,
        });
    }

    report
}

fn copy_artifact(source: &Path, destination: &Path) -> PackResult<(u64, String)> {
    let bytes = fs::copy(source, destination).map_err(|e| PackError::io(destination, e))?;
    let digest = sha256_file(destination)?;
    Ok((bytes, digest))
}

/// Compute the SHA-256 hash of a file and return it as a hex string.
pub fn sha256_file(path: &Path) -> PackResult<String> {
    let file = fs::File::open(path).map_err(|e| PackError::io(path, e))?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];

    loop {
        let n = reader.read(&mut buf).map_err(|e| PackError::io(path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}
