//! Marker registry
//!
//! Maps a one-byte marker id to its display name and to the way its segment
//! length is encoded. Everything here is `const` data; lookups never allocate
//! and never fail. Unknown markers have an empty name and a standard 16-bit
//! length field.

/// Byte that prefixes every marker.
pub const PREFIX: u8 = 0xFF;

/// Pseudo marker id used for scan-data blocks.
pub const SCAN_DATA: u8 = 0x00;
/// Display name of scan-data blocks.
pub const SCAN_DATA_NAME: &str = "!SCANDATA";

pub const SOF0: u8 = 0xC0;
pub const SOF1: u8 = 0xC1;
pub const SOF2: u8 = 0xC2;
pub const SOF3: u8 = 0xC3;
pub const DHT: u8 = 0xC4;
pub const SOF5: u8 = 0xC5;
pub const SOF6: u8 = 0xC6;
pub const SOF7: u8 = 0xC7;
pub const JPG: u8 = 0xC8;
pub const SOF9: u8 = 0xC9;
pub const SOF10: u8 = 0xCA;
pub const SOF11: u8 = 0xCB;
pub const DAC: u8 = 0xCC;
pub const SOF13: u8 = 0xCD;
pub const SOF14: u8 = 0xCE;
pub const SOF15: u8 = 0xCF;

pub const RST0: u8 = 0xD0;
pub const RST7: u8 = 0xD7;
pub const SOI: u8 = 0xD8; // Start of Image
pub const EOI: u8 = 0xD9; // End of Image
pub const SOS: u8 = 0xDA; // Start of Scan
pub const DQT: u8 = 0xDB; // Define Quantization Table
pub const DNL: u8 = 0xDC;
pub const DRI: u8 = 0xDD;

pub const APP0: u8 = 0xE0;
pub const APP1: u8 = 0xE1;
pub const APP15: u8 = 0xEF;
pub const COM: u8 = 0xFE; // Comment

// JPEG-2000 codestream markers
pub const SIZ: u8 = 0x51;
pub const CME: u8 = 0x64;
pub const SOD: u8 = 0x93;

/// Leading bytes of a baseline/extended JPEG file.
pub const JPEG_MAGIC: [u8; 3] = [PREFIX, SOI, PREFIX];
/// Leading bytes of a JPEG-2000 codestream.
pub const JPEG2000_MAGIC: [u8; 3] = [PREFIX, 0x4F, PREFIX];

/// How the length of a marker's segment is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthClass {
    /// No length field, the segment has no payload.
    Implicit,

    /// 2-byte big-endian length that counts its own two bytes.
    Standard16,

    /// 4-byte big-endian length that counts its own four bytes.
    Extended32,
}

impl LengthClass {
    /// Size of the length field in bytes.
    pub const fn field_size(self) -> usize {
        match self {
            LengthClass::Implicit => 0,
            LengthClass::Standard16 => 2,
            LengthClass::Extended32 => 4,
        }
    }

    /// Marker prefix + id + length field.
    pub const fn header_size(self) -> usize {
        2 + self.field_size()
    }
}

/// Returns the length encoding used by `marker`.
pub const fn length_class(marker: u8) -> LengthClass {
    match marker {
        0x00 | 0x01 | RST0..=RST7 | SOI | EOI | SOS => LengthClass::Implicit,
        // JPEG-2000 standalone markers
        0x30..=0x3F | 0x4F | 0x92 | SOD => LengthClass::Implicit,
        // JPEG-2000 extensions with a 32-bit length
        0x74 | 0x75 | 0x77 => LengthClass::Extended32,
        _ => LengthClass::Standard16,
    }
}

/// Returns the display name of `marker`, or `""` when it is not registered.
pub const fn marker_name(marker: u8) -> &'static str {
    match marker {
        SOI => "SOI",
        EOI => "EOI",
        SOS => "SOS",
        SOD => "SOD",
        DQT => "DQT",
        DNL => "DNL",
        DRI => "DRI",
        0xD0 => "RST0",
        0xD1 => "RST1",
        0xD2 => "RST2",
        0xD3 => "RST3",
        0xD4 => "RST4",
        0xD5 => "RST5",
        0xD6 => "RST6",
        0xD7 => "RST7",
        0xE0 => "APP0",
        0xE1 => "APP1",
        0xE2 => "APP2",
        0xE3 => "APP3",
        0xE4 => "APP4",
        0xE5 => "APP5",
        0xE6 => "APP6",
        0xE7 => "APP7",
        0xE8 => "APP8",
        0xE9 => "APP9",
        0xEA => "APP10",
        0xEB => "APP11",
        0xEC => "APP12",
        0xED => "APP13",
        0xEE => "APP14",
        0xEF => "APP15",
        COM => "COM",
        CME => "CME",
        SIZ => "SIZ",
        DHT => "DHT",
        JPG => "JPG",
        DAC => "DAC",
        SOF0 => "SOF0",
        SOF1 => "SOF1",
        SOF2 => "SOF2",
        SOF3 => "SOF3",
        SOF5 => "SOF5",
        SOF6 => "SOF6",
        SOF7 => "SOF7",
        SOF9 => "SOF9",
        SOF10 => "SOF10",
        SOF11 => "SOF11",
        SOF13 => "SOF13",
        SOF14 => "SOF14",
        SOF15 => "SOF15",
        _ => "",
    }
}

/// Start-Of-Frame markers. DHT, JPG and DAC share the 0xC0 range but carry no
/// frame header.
pub const fn is_sof(marker: u8) -> bool {
    matches!(marker, SOF0..=SOF15) && !matches!(marker, DHT | JPG | DAC)
}

/// APP0..APP15.
pub const fn is_app(marker: u8) -> bool {
    matches!(marker, APP0..=APP15)
}

/// Resolves a marker from a CLI-style spelling: a registered name
/// (case-insensitive) or a hex byte such as `e1` / `0xE1`.
pub fn parse_marker(text: &str) -> Option<u8> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    let hex = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    if let Some(id) = (1..=u8::MAX).find(|&id| marker_name(id).eq_ignore_ascii_case(trimmed)) {
        return Some(id);
    }

    u8::from_str_radix(hex, 16).ok()
}
