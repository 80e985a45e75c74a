use std::fs;

use flashpack::{canonicalize_or_current, load_with_overrides, ConfigOverrides};
use flashpack_core::config::{write_config, MergeBackendKind, PackConfig};
use flashpack_core::model::{ChipProfile, FlashFreq, FlashMode};
use tempfile::tempdir;

fn write_sample_config(dir: &std::path::Path) -> String {
    let path = dir.join("flashpack.json");
    let config = PackConfig::example(
        "lolin32",
        "1.0.0",
        ChipProfile::new("esp32", FlashMode::Dio, FlashFreq::Mhz40, "4MB"),
    );
    write_config(&path, &config).expect("write config");
    path.display().to_string()
}

#[test]
fn canonicalize_or_current_resolves_existing_relative_path() {
    let original = std::env::current_dir().expect("cwd");
    let tmp = tempdir().expect("tempdir");
    let subdir = tmp.path().join("nested");
    fs::create_dir_all(&subdir).expect("create nested");
    std::env::set_current_dir(tmp.path()).expect("chdir tmp");

    let result = canonicalize_or_current("nested").expect("canonicalize nested");
    assert_eq!(result, subdir.canonicalize().expect("canonicalize subdir"));

    std::env::set_current_dir(original).expect("restore cwd");
}

#[test]
fn canonicalize_or_current_keeps_missing_paths_absolute() {
    let result = canonicalize_or_current("does-not-exist/flashpack.json").expect("resolve");
    assert!(result.is_absolute());
    assert!(result.ends_with("does-not-exist/flashpack.json"));
}

#[test]
fn overrides_leave_config_alone_by_default() {
    let tmp = tempdir().expect("tempdir");
    let config = write_sample_config(tmp.path());

    let loaded = load_with_overrides(&config, &ConfigOverrides::default()).expect("load");
    assert_eq!(loaded.config.merge.backend, MergeBackendKind::External);
    assert_eq!(loaded.config.output_dir.as_deref(), Some("build"));
    assert!(loaded.config.merge.tool.is_none());
}

#[test]
fn merge_tool_override_selects_external_backend() {
    let tmp = tempdir().expect("tempdir");
    let config = write_sample_config(tmp.path());
    let overrides = ConfigOverrides {
        merge_tool: Some("/opt/esptool/esptool".to_string()),
        timeout_secs: Some(5),
        output_dir: Some("/srv/out".to_string()),
        ..Default::default()
    };

    let loaded = load_with_overrides(&config, &overrides).expect("load");
    assert_eq!(loaded.config.merge.backend, MergeBackendKind::External);
    assert_eq!(loaded.merge_tool(), std::path::PathBuf::from("/opt/esptool/esptool"));
    assert_eq!(loaded.config.merge.timeout_secs, 5);
    assert_eq!(loaded.layout().output_dir, std::path::PathBuf::from("/srv/out"));
}

#[test]
fn builtin_override_selects_builtin_backend() {
    let tmp = tempdir().expect("tempdir");
    let config = write_sample_config(tmp.path());
    let overrides = ConfigOverrides { builtin: true, ..Default::default() };

    let loaded = load_with_overrides(&config, &overrides).expect("load");
    assert_eq!(loaded.config.merge.backend, MergeBackendKind::Builtin);
}

#[test]
fn missing_config_names_the_file() {
    let tmp = tempdir().expect("tempdir");
    let missing = tmp.path().join("absent.json");

    let err = load_with_overrides(&missing.display().to_string(), &ConfigOverrides::default())
        .unwrap_err();
    assert!(err.to_string().contains("absent.json"), "{err}");
}

#[test]
fn relative_merge_tool_override_resolves_against_caller() {
    let tmp = tempdir().expect("tempdir");
    let config = write_sample_config(tmp.path());
    let overrides = ConfigOverrides {
        merge_tool: Some("scripts/merge-tool.sh".to_string()),
        ..Default::default()
    };

    let loaded = load_with_overrides(&config, &overrides).expect("load");
    let tool = loaded.merge_tool();
    assert!(tool.is_absolute());
    assert!(tool.ends_with("scripts/merge-tool.sh"));
    assert!(!tool.starts_with(tmp.path()), "{} resolved against config dir", tool.display());
}

#[test]
fn bare_merge_tool_override_stays_on_path() {
    let tmp = tempdir().expect("tempdir");
    let config = write_sample_config(tmp.path());
    let overrides = ConfigOverrides { merge_tool: Some("esptool".to_string()), ..Default::default() };

    let loaded = load_with_overrides(&config, &overrides).expect("load");
    assert_eq!(loaded.merge_tool(), std::path::PathBuf::from("esptool"));
}
