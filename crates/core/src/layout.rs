use std::path::{Path, PathBuf};

/// Logical layout of one build's files on disk.
///
/// This is derived from the build directory and program name. It does *not*
/// perform any IO itself; the toolchain produces the inputs and the pipeline
/// decides what to read or write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildLayout {
    /// Directory the toolchain writes its outputs into.
    pub build_dir: PathBuf,
    /// Application binary (`<prog>.bin`).
    pub app_binary: PathBuf,
    /// Composed factory image (`<prog>.factory.bin`).
    pub factory_image: PathBuf,
    /// Linked ELF (`<prog>.elf`).
    pub elf: PathBuf,
    /// Directory published artifacts are copied into.
    pub output_dir: PathBuf,
}

impl BuildLayout {
    /// Compute the layout for `prog_name` inside `build_dir`.
    pub fn new(
        build_dir: impl AsRef<Path>,
        prog_name: &str,
        output_dir: impl AsRef<Path>,
    ) -> Self {
        let build_dir = build_dir.as_ref().to_path_buf();
        let app_binary = build_dir.join(format!("{prog_name}.bin"));
        let factory_image = build_dir.join(format!("{prog_name}.factory.bin"));
        let elf = build_dir.join(format!("{prog_name}.elf"));

        Self { build_dir, app_binary, factory_image, elf, output_dir: output_dir.as_ref().to_path_buf() }
    }
}
