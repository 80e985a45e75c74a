use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::model::Section;

/// Error type for everything between section resolution and publishing.
///
/// Every variant names the file, offset, or exit code involved; a bare
/// "build failed" is never enough to triage a bad image.
#[derive(Debug, Error)]
pub enum PackError {
    /// A declared section file does not exist.
    #[error("Missing section at {}: {} does not exist", hex(.offset), .path.display())]
    MissingSection { offset: u64, path: PathBuf },

    /// A declared section file exists but has no content.
    #[error("Empty section at {}: {} has no content", hex(.offset), .path.display())]
    EmptySection { offset: u64, path: PathBuf },

    /// Two sections are out of order or share an offset.
    #[error("Layout conflict: {second} must start after {first}")]
    LayoutConflict { first: Section, second: Section },

    /// A section runs into the next one.
    #[error("Overlap: {first} ({first_size} bytes) overruns {second} by {overflow} bytes")]
    Overlap { first: Section, first_size: u64, second: Section, overflow: u64 },

    /// The last section ends past the configured flash size.
    #[error("Image too large: sections end at {}, flash size is {}", hex(.end), hex(.flash_size))]
    ImageTooLarge { end: u64, flash_size: u64 },

    #[error("No sections to compose")]
    NoSections,

    #[error("Invalid offset '{0}': expected 0x-prefixed hex or decimal")]
    InvalidOffset(String),

    #[error("Invalid flash image entry '{0}': expected '<offset> <path>'")]
    InvalidImageEntry(String),

    /// The merge tool ran and exited unsuccessfully.
    #[error("Merge tool failed with {}: {}", describe_exit(.exit_code), describe_diagnostic(.diagnostic))]
    ComposeExecution { exit_code: Option<i32>, diagnostic: String },

    /// The merge reported success but the image is shorter than its layout.
    #[error("Merge produced {size} bytes, expected at least {expected}")]
    TruncatedOutput { size: u64, expected: u64 },

    #[error("Merge tool did not finish within {timeout_secs}s and was killed")]
    ComposeTimeout { timeout_secs: u64 },

    #[error("Merge was cancelled; the merge tool was killed")]
    Cancelled,

    #[error("Merge tool not found: {}", .0.display())]
    MissingMergeTool(PathBuf),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PackError {
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io { path: path.as_ref().to_path_buf(), source }
    }
}

/// Convenience result type for packaging operations.
pub type PackResult<T> = Result<T, PackError>;

fn hex(value: &u64) -> String {
    crate::model::format_offset(*value)
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

fn describe_diagnostic(diagnostic: &str) -> &str {
    if diagnostic.is_empty() {
        "(no diagnostic output)"
    } else {
        diagnostic
    }
}
