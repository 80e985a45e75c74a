use std::fs;
use std::path::Path;

use flashpack_core::config::{ExtraImage, LoadedConfig, MergeBackendKind, OffsetValue, PackConfig};
use flashpack_core::model::{BuildTarget, ChipProfile, FlashFreq, FlashMode};
use flashpack_core::services::backends::{BuiltinMerger, ExternalMerger};
use flashpack_core::services::composer::CancelToken;
use flashpack_core::services::pipeline::{
    merge_backend, package_firmware, publish_application, publish_filesystem, resolve_layout,
};
use flashpack_core::PackError;
use tempfile::tempdir;

/// Config for a fake `lolin32` build under `root/.pio/build/lolin32`.
fn sample_config(root: &Path) -> LoadedConfig {
    let mut config = PackConfig::example(
        "lolin32",
        "2.1.0",
        ChipProfile::new("esp32", FlashMode::Dio, FlashFreq::Mhz40, "4MB"),
    );
    config.merge.backend = MergeBackendKind::Builtin;
    LoadedConfig::new(config, root)
}

fn write_build_outputs(config: &LoadedConfig) {
    let build = config.layout();
    fs::create_dir_all(&build.build_dir).unwrap();
    fs::write(build.build_dir.join("bootloader.bin"), vec![0x11; 4096]).unwrap();
    fs::write(build.build_dir.join("partitions.bin"), vec![0x22; 3072]).unwrap();
    fs::write(build.build_dir.join("boot_app0.bin"), vec![0x33; 8192]).unwrap();
    fs::write(&build.app_binary, vec![0x44; 200_000]).unwrap();
    fs::write(&build.elf, b"\x7fELF fake").unwrap();
}

#[test]
fn package_composes_and_publishes_all_artifacts() {
    let temp = tempdir().unwrap();
    let config = sample_config(temp.path());
    write_build_outputs(&config);
    fs::create_dir_all(temp.path().join("build")).unwrap();

    let outcome = package_firmware(&config, &BuiltinMerger).expect("package");

    assert_eq!(outcome.layout.len(), 4);
    assert_eq!(outcome.image.size, 0x10000 + 200_000);
    assert_eq!(outcome.image.path, config.layout().factory_image);
    assert!(outcome.report.is_success());
    assert_eq!(outcome.report.copied().count(), 3);

    let published = temp.path().join("build");
    let factory = fs::read(published.join("firmware_lolin32_2.1.0.factory.bin")).unwrap();
    assert_eq!(&factory[0x1000..0x1004], &[0x11; 4]);
    assert_eq!(&factory[0x8000..0x8004], &[0x22; 4]);
    assert_eq!(&factory[0xe000..0xe004], &[0x33; 4]);
    assert_eq!(&factory[0x10000..0x10004], &[0x44; 4]);
    assert!(published.join("firmware_lolin32_2.1.0.bin").is_file());
    assert!(published.join("firmware_lolin32_2.1.0.elf").is_file());
}

#[test]
fn package_without_output_dir_still_composes() {
    let temp = tempdir().unwrap();
    let config = sample_config(temp.path());
    write_build_outputs(&config);

    let outcome = package_firmware(&config, &BuiltinMerger).expect("package");

    assert!(outcome.report.skipped_output_dir);
    assert!(config.layout().factory_image.is_file());
    assert!(!temp.path().join("build").exists());
}

#[test]
fn missing_section_fails_before_merge_tool_runs() {
    let temp = tempdir().unwrap();
    let config = sample_config(temp.path());
    write_build_outputs(&config);
    fs::remove_file(config.layout().build_dir.join("boot_app0.bin")).unwrap();
    fs::create_dir_all(temp.path().join("build")).unwrap();

    let marker = temp.path().join("tool-ran");
    let script = temp.path().join("tool.sh");
    fs::write(&script, format!("touch '{}'\n", marker.display())).unwrap();
    let merger = ExternalMerger::new("/bin/sh").with_tool_args(vec![script.display().to_string()]);

    let err = package_firmware(&config, &merger).unwrap_err();
    match err {
        PackError::MissingSection { offset, path } => {
            assert_eq!(offset, 0xe000);
            assert!(path.ends_with("boot_app0.bin"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!marker.exists());
    assert_eq!(fs::read_dir(temp.path().join("build")).unwrap().count(), 0);
}

#[cfg(unix)]
#[test]
fn failed_compose_publishes_nothing() {
    let temp = tempdir().unwrap();
    let config = sample_config(temp.path());
    write_build_outputs(&config);
    fs::create_dir_all(temp.path().join("build")).unwrap();
    let script = temp.path().join("tool.sh");
    fs::write(&script, "echo 'chip mismatch' >&2\nexit 2\n").unwrap();
    let merger = ExternalMerger::new("/bin/sh").with_tool_args(vec![script.display().to_string()]);

    let err = package_firmware(&config, &merger).unwrap_err();

    assert!(matches!(err, PackError::ComposeExecution { exit_code: Some(2), .. }));
    assert_eq!(fs::read_dir(temp.path().join("build")).unwrap().count(), 0);
    assert!(!config.layout().factory_image.exists());
}

#[test]
fn overlapping_layout_is_rejected_before_merge() {
    let temp = tempdir().unwrap();
    let mut config = sample_config(temp.path());
    config.config.extra_images.insert(
        2,
        ExtraImage::Entry {
            offset: OffsetValue::Number(0x9000),
            path: ".pio/build/lolin32/nvs.bin".to_string(),
        },
    );
    write_build_outputs(&config);
    fs::write(config.layout().build_dir.join("nvs.bin"), vec![0; 0x6000]).unwrap();

    let err = resolve_layout(&config).unwrap_err();
    assert!(matches!(err, PackError::Overlap { .. }), "{err}");
}

#[test]
fn publish_application_copies_only_the_app_binary() {
    let temp = tempdir().unwrap();
    let config = sample_config(temp.path());
    write_build_outputs(&config);
    fs::create_dir_all(temp.path().join("build")).unwrap();

    let report = publish_application(&config);

    assert!(report.is_success());
    let names: Vec<_> = fs::read_dir(temp.path().join("build"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(names, vec!["firmware_lolin32_2.1.0.bin".to_string()]);
}

#[test]
fn publish_filesystem_uses_filesystem_name() {
    let temp = tempdir().unwrap();
    let config = sample_config(temp.path());
    fs::create_dir_all(temp.path().join("build")).unwrap();
    let image = temp.path().join("spiffs.bin");
    fs::write(&image, vec![0xAB; 1024]).unwrap();

    let report = publish_filesystem(&config, &image);

    assert!(report.is_success());
    let published = temp.path().join("build/filesystem_lolin32_2.1.0.bin");
    assert_eq!(fs::read(published).unwrap(), vec![0xAB; 1024]);
}

#[test]
fn publish_filesystem_with_missing_output_dir_succeeds() {
    let temp = tempdir().unwrap();
    let config = sample_config(temp.path());
    let image = temp.path().join("spiffs.bin");
    fs::write(&image, b"fs").unwrap();

    let report = publish_filesystem(&config, &image);

    assert!(report.skipped_output_dir);
    assert!(report.is_success());
}

#[test]
fn merge_backend_follows_config() {
    let temp = tempdir().unwrap();
    let mut config = sample_config(temp.path());
    assert_eq!(merge_backend(&config, CancelToken::new()).name(), "builtin");

    config.config.merge.backend = MergeBackendKind::External;
    assert_eq!(merge_backend(&config, CancelToken::new()).name(), "external");
    assert_eq!(config.config.target, BuildTarget::new("lolin32", "2.1.0"));
}
