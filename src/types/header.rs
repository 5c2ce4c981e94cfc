use bon::Builder;
use serde::Serialize;

/// Size of the fixed binary header; the data block starts here in every
/// format family.
pub const DATA_OFFSET: u64 = 4100;

/// Byte offset of the u64 XML footer location (v3 files)
pub const FOOTER_OFFSET_POS: usize = 678;
/// Byte offset of the f32 format version
pub const VERSION_POS: usize = 1992;

/// Byte offsets of the 2.x fixed layout
pub const LEGACY_PIXEL_TYPE_POS: usize = 108;
pub const LEGACY_WIDTH_POS: usize = 42;
pub const LEGACY_HEIGHT_POS: usize = 656;
pub const LEGACY_FRAME_COUNT_POS: usize = 1446;

/// Fields read from fixed offsets of every SPE file
#[derive(Debug, Clone, Copy, PartialEq, Builder)]
pub struct Header {
    /// Absolute byte offset of the XML footer (meaningless for 2.x)
    pub footer_offset: u64,
    pub version: f32,
}

/// Additional fixed fields of 2.x files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Builder)]
pub struct LegacyHeader {
    pub pixel_type_code: i16,
    pub width: u16,
    pub height: u16,
    pub frame_count: i32,
}

/// Format family discriminated by the version field
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum SpeVersion {
    /// version >= 3: XML footer layout
    Current(f32),
    /// 2 <= version < 3: fixed-offset layout
    Legacy(f32),
}

impl SpeVersion {
    /// `None` when the version lies outside both families (including NaN)
    pub fn classify(version: f32) -> Option<Self> {
        if version >= 3.0 {
            Some(SpeVersion::Current(version))
        } else if (2.0..3.0).contains(&version) {
            Some(SpeVersion::Legacy(version))
        } else {
            None
        }
    }

    pub fn value(self) -> f32 {
        match self {
            SpeVersion::Current(version) | SpeVersion::Legacy(version) => version,
        }
    }

    pub fn is_legacy(self) -> bool {
        matches!(self, SpeVersion::Legacy(_))
    }
}
