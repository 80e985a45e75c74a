use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, info};

use crate::error::{PackError, PackResult};
use crate::model::{format_offset, ChipProfile, ComposedImage};
use crate::services::validator::ValidatedLayout;

/// Trait implemented by merge backends (external flash tool, in-process merge).
///
/// A backend writes the full image to `output`. It may leave a partial file
/// behind on failure; `compose_image` owns cleanup.
pub trait MergeBackend: Send + Sync {
    fn merge(&self, layout: &ValidatedLayout, chip: &ChipProfile, output: &Path) -> PackResult<()>;
    fn name(&self) -> &'static str;
}

/// Shared flag used to abort an in-flight merge (e.g. from a Ctrl-C handler).
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Program and argument list for one `merge-bin` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl MergeCommand {
    /// `[tool_args...] --chip <id> merge-bin -o <out> --flash-mode <m> --flash-freq <f>
    /// --flash-size <s> <offset> <path>...`, sections in ascending offset order.
    pub fn build(
        program: impl Into<PathBuf>,
        tool_args: &[String],
        chip: &ChipProfile,
        output: &Path,
        layout: &ValidatedLayout,
    ) -> Self {
        let mut args: Vec<String> = tool_args.to_vec();
        args.extend([
            "--chip".to_string(),
            chip.chip_id.clone(),
            "merge-bin".to_string(),
            "-o".to_string(),
            output.display().to_string(),
            "--flash-mode".to_string(),
            chip.flash_mode.to_string(),
            "--flash-freq".to_string(),
            chip.flash_freq.to_string(),
            "--flash-size".to_string(),
            chip.flash_size.clone(),
        ]);
        for section in layout.sections() {
            args.push(format_offset(section.offset));
            args.push(section.path.display().to_string());
        }
        Self { program: program.into(), args }
    }
}

impl fmt::Display for MergeCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            if arg.contains(' ') {
                write!(f, " \"{arg}\"")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// Merge a validated layout into one image at `output`.
///
/// The backend writes to a temporary file next to `output`, which is renamed
/// into place only on success. On failure the temporary file is removed and a
/// previous `output`, if any, is left untouched.
pub fn compose_image(
    layout: &ValidatedLayout,
    chip: &ChipProfile,
    output: &Path,
    backend: &dyn MergeBackend,
) -> PackResult<ComposedImage> {
    let dir = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir).map_err(|e| PackError::io(&dir, e))?;

    let file_name = output.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
    let staging = tempfile::Builder::new()
        .prefix(&format!(".{file_name}."))
        .suffix(".partial")
        .tempfile_in(&dir)
        .map_err(|e| PackError::io(&dir, e))?
        .into_temp_path();

    info!(
        "Composing {} sections for {} ({} {} {}) with {} backend",
        layout.len(),
        chip.chip_id,
        chip.flash_mode,
        chip.flash_freq,
        chip.flash_size,
        backend.name()
    );
    backend.merge(layout, chip, &staging)?;

    let size = fs::metadata(&staging).map_err(|e| PackError::io(&staging, e))?.len();
    if size < layout.image_end() {
        return Err(PackError::TruncatedOutput { size, expected: layout.image_end() });
    }
    staging.persist(output).map_err(|e| PackError::io(output, e.error))?;
    debug!("Wrote {} ({size} bytes)", output.display());

    Ok(ComposedImage { path: output.to_path_buf(), size })
}
