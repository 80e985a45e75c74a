use crate::model::{FlashFreq, FlashMode};

/// Static facts about a chip family that the packaging step relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnownChip {
    pub name: &'static str,
    /// Flash offset the ROM loads the second-stage bootloader from.
    pub bootloader_offset: u64,
    /// Offset of the partition table in the default layouts.
    pub partition_table_offset: u64,
    /// Offset of the OTA boot-selector data in the default layouts.
    pub boot_selector_offset: u64,
    /// First application partition in the default layouts.
    pub app_offset: u64,
}

pub const KNOWN_CHIPS: &[KnownChip] = &[
    KnownChip {
        name: "esp32",
        bootloader_offset: 0x1000,
        partition_table_offset: 0x8000,
        boot_selector_offset: 0xe000,
        app_offset: 0x10000,
    },
    KnownChip {
        name: "esp32s2",
        bootloader_offset: 0x1000,
        partition_table_offset: 0x8000,
        boot_selector_offset: 0xe000,
        app_offset: 0x10000,
    },
    KnownChip {
        name: "esp32s3",
        bootloader_offset: 0x0,
        partition_table_offset: 0x8000,
        boot_selector_offset: 0xe000,
        app_offset: 0x10000,
    },
    KnownChip {
        name: "esp32c3",
        bootloader_offset: 0x0,
        partition_table_offset: 0x8000,
        boot_selector_offset: 0xe000,
        app_offset: 0x10000,
    },
];

/// Look up a chip by id, ignoring case and dashes (`ESP32-S3` matches `esp32s3`).
pub fn known_chip(chip_id: &str) -> Option<&'static KnownChip> {
    let normalized: String =
        chip_id.chars().filter(|c| *c != '-' && *c != '_').collect::<String>().to_lowercase();
    KNOWN_CHIPS.iter().find(|chip| chip.name == normalized)
}

/// First byte of every bootloader/app image.
pub const IMAGE_MAGIC: u8 = 0xE9;

impl FlashMode {
    /// Value stored in byte 2 of the image header.
    pub fn header_byte(&self) -> u8 {
        match self {
            FlashMode::Qio => 0,
            FlashMode::Qout => 1,
            FlashMode::Dio => 2,
            FlashMode::Dout => 3,
        }
    }
}

impl FlashFreq {
    /// Low nibble of byte 3 of the image header.
    pub fn header_nibble(&self) -> u8 {
        match self {
            FlashFreq::Mhz40 => 0x0,
            FlashFreq::Mhz26 => 0x1,
            FlashFreq::Mhz20 => 0x2,
            FlashFreq::Mhz80 => 0xf,
        }
    }
}

/// High nibble of byte 3 of the image header, or `None` for sizes the
/// header cannot express (including `keep`/`detect`).
pub fn flash_size_nibble(flash_size: &str) -> Option<u8> {
    let nibble = match flash_size.trim().to_ascii_uppercase().as_str() {
        "1MB" => 0x00,
        "2MB" => 0x10,
        "4MB" => 0x20,
        "8MB" => 0x30,
        "16MB" => 0x40,
        "32MB" => 0x50,
        "64MB" => 0x60,
        "128MB" => 0x70,
        _ => return None,
    };
    Some(nibble)
}
