use flashpack_core::model::{
    format_offset, known_chip, parse_offset, parse_size, ArtifactKind, BuildTarget, ChipProfile,
    FlashFreq, FlashMode, Section,
};
use flashpack_core::{version, PackError};

#[test]
fn version_is_non_empty() {
    let v = version();
    assert!(!v.is_empty());
}

#[test]
fn parse_offset_accepts_hex_and_decimal() {
    assert_eq!(parse_offset("0x1000").unwrap(), 0x1000);
    assert_eq!(parse_offset(" 0XE000 ").unwrap(), 0xe000);
    assert_eq!(parse_offset("65536").unwrap(), 0x10000);
}

#[test]
fn parse_offset_rejects_garbage() {
    assert!(matches!(parse_offset("0xZZ"), Err(PackError::InvalidOffset(_))));
    assert!(matches!(parse_offset("-16"), Err(PackError::InvalidOffset(_))));
    assert!(matches!(parse_offset(""), Err(PackError::InvalidOffset(_))));
}

#[test]
fn format_offset_matches_merge_tool_spelling() {
    assert_eq!(format_offset(0x10000), "0x10000");
    assert_eq!(format_offset(0xe000), "0xe000");
    assert_eq!(format_offset(0), "0x0");
}

#[test]
fn section_display_names_offset_and_path() {
    let section = Section::new(0x8000, "build/partitions.bin");
    assert_eq!(section.to_string(), "0x8000 | build/partitions.bin");
}

#[test]
fn artifact_names_follow_template() {
    let target = BuildTarget::new("nodemcu_32s", "1.4.3");
    assert_eq!(ArtifactKind::Firmware.file_name(&target), "firmware_nodemcu_32s_1.4.3.bin");
    assert_eq!(ArtifactKind::Factory.file_name(&target), "firmware_nodemcu_32s_1.4.3.factory.bin");
    assert_eq!(ArtifactKind::Elf.file_name(&target), "firmware_nodemcu_32s_1.4.3.elf");
    assert_eq!(ArtifactKind::Filesystem.file_name(&target), "filesystem_nodemcu_32s_1.4.3.bin");
}

#[test]
fn flash_mode_and_freq_parse_and_display() {
    assert_eq!("DIO".parse::<FlashMode>().unwrap(), FlashMode::Dio);
    assert_eq!(FlashMode::Qout.to_string(), "qout");
    assert!("spi".parse::<FlashMode>().is_err());

    assert_eq!("40000000L".parse::<FlashFreq>().unwrap(), FlashFreq::Mhz40);
    assert_eq!("80m".parse::<FlashFreq>().unwrap(), FlashFreq::Mhz80);
    assert_eq!(FlashFreq::Mhz26.to_string(), "26m");
    assert!("33m".parse::<FlashFreq>().is_err());
}

#[test]
fn chip_profile_serializes_lowercase_values() {
    let chip = ChipProfile::new("esp32", FlashMode::Dio, FlashFreq::Mhz40, "4MB");
    let json = serde_json::to_value(&chip).unwrap();
    assert_eq!(json["flash_mode"], "dio");
    assert_eq!(json["flash_freq"], "40m");
    assert_eq!(chip.flash_size_bytes(), Some(4 * 1024 * 1024));
}

#[test]
fn flash_size_parses_units() {
    assert_eq!(parse_size("4MB"), Some(4 * 1024 * 1024));
    assert_eq!(parse_size("512KB"), Some(512 * 1024));
    assert_eq!(parse_size("4096"), Some(4096));
    assert_eq!(parse_size("keep"), None);
    assert_eq!(parse_size("detect"), None);
}

#[test]
fn known_chip_lookup_ignores_case_and_dashes() {
    assert_eq!(known_chip("ESP32-S3").map(|c| c.name), Some("esp32s3"));
    assert_eq!(known_chip("esp32").map(|c| c.bootloader_offset), Some(0x1000));
    assert_eq!(known_chip("esp32c3").map(|c| c.bootloader_offset), Some(0x0));
    assert!(known_chip("esp8266").is_none());
}
