use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use flashpack_core::config::{load_config, LoadedConfig, MergeBackendKind};

pub mod commands;

/// Resolve the config path against the current working directory when relative.
pub fn canonicalize_or_current(config: &str) -> Result<PathBuf> {
    let path = Path::new(config);
    // Canonicalize when possible; a missing file still gets an absolute path so
    // the eventual read error names it clearly.
    match path.canonicalize() {
        Ok(p) => Ok(p),
        Err(_) => {
            let cwd = env::current_dir().context("Failed to get current directory")?;
            Ok(cwd.join(path))
        }
    }
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub merge_tool: Option<String>,
    pub builtin: bool,
    pub timeout_secs: Option<u64>,
    pub output_dir: Option<String>,
}

/// Load the config at `config` and apply command-line overrides.
pub fn load_with_overrides(config: &str, overrides: &ConfigOverrides) -> Result<LoadedConfig> {
    let path = canonicalize_or_current(config)?;
    let mut loaded = load_config(&path)?;

    if let Some(tool) = &overrides.merge_tool {
        // Command-line paths are relative to the caller, not the config file.
        let tool = if tool.contains('/') || tool.contains('\\') {
            canonicalize_or_current(tool)?.display().to_string()
        } else {
            tool.clone()
        };
        loaded.config.merge.tool = Some(tool);
        loaded.config.merge.backend = MergeBackendKind::External;
    }
    if overrides.builtin {
        loaded.config.merge.backend = MergeBackendKind::Builtin;
    }
    if let Some(secs) = overrides.timeout_secs {
        loaded.config.merge.timeout_secs = secs;
    }
    if let Some(dir) = &overrides.output_dir {
        loaded.config.output_dir = Some(dir.clone());
    }
    Ok(loaded)
}
