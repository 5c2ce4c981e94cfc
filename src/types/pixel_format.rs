//! Pixel formats of the data block, per format family

use serde::{Deserialize, Serialize};
use std::fmt;

/// Primitive element type stored in the data block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementType {
    U8,
    I16,
    U16,
    I32,
    U32,
    F32,
    F64,
}

impl ElementType {
    /// Bytes occupied by one element
    pub fn byte_width(self) -> u64 {
        match self {
            ElementType::U8 => 1,
            ElementType::I16 | ElementType::U16 => 2,
            ElementType::I32 | ElementType::U32 | ElementType::F32 => 4,
            ElementType::F64 => 8,
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ElementType::U8 => "u8",
            ElementType::I16 => "i16",
            ElementType::U16 => "u16",
            ElementType::I32 => "i32",
            ElementType::U32 => "u32",
            ElementType::F32 => "f32",
            ElementType::F64 => "f64",
        };
        f.write_str(name)
    }
}

/// Pixel formats declared by the `pixelFormat` attribute of v3 footers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CurrentPixelFormat {
    MonochromeUnsigned16,
    MonochromeUnsigned32,
    MonochromeFloating32,
}

impl CurrentPixelFormat {
    pub fn key(self) -> &'static str {
        match self {
            CurrentPixelFormat::MonochromeUnsigned16 => "MonochromeUnsigned16",
            CurrentPixelFormat::MonochromeUnsigned32 => "MonochromeUnsigned32",
            CurrentPixelFormat::MonochromeFloating32 => "MonochromeFloating32",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        [
            CurrentPixelFormat::MonochromeUnsigned16,
            CurrentPixelFormat::MonochromeUnsigned32,
            CurrentPixelFormat::MonochromeFloating32,
        ]
        .into_iter()
        .find(|format| format.key().eq_ignore_ascii_case(key.trim()))
    }
}

/// Data type codes of the 2.x fixed header (byte 108)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LegacyPixelType {
    Float32,
    Int32,
    Int16,
    UInt16,
    Float64,
    UInt8,
    UInt32,
}

impl LegacyPixelType {
    /// Codes 4 and 7 are reserved and never written
    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            0 => Some(LegacyPixelType::Float32),
            1 => Some(LegacyPixelType::Int32),
            2 => Some(LegacyPixelType::Int16),
            3 => Some(LegacyPixelType::UInt16),
            5 => Some(LegacyPixelType::Float64),
            6 => Some(LegacyPixelType::UInt8),
            8 => Some(LegacyPixelType::UInt32),
            _ => None,
        }
    }

    pub fn code(self) -> i16 {
        match self {
            LegacyPixelType::Float32 => 0,
            LegacyPixelType::Int32 => 1,
            LegacyPixelType::Int16 => 2,
            LegacyPixelType::UInt16 => 3,
            LegacyPixelType::Float64 => 5,
            LegacyPixelType::UInt8 => 6,
            LegacyPixelType::UInt32 => 8,
        }
    }
}

/// Pixel format of a file, tagged by format family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelFormat {
    Current(CurrentPixelFormat),
    Legacy(LegacyPixelType),
}

impl PixelFormat {
    pub fn element_type(self) -> ElementType {
        match self {
            PixelFormat::Current(CurrentPixelFormat::MonochromeUnsigned16) => ElementType::U16,
            PixelFormat::Current(CurrentPixelFormat::MonochromeUnsigned32) => ElementType::U32,
            PixelFormat::Current(CurrentPixelFormat::MonochromeFloating32) => ElementType::F32,
            PixelFormat::Legacy(LegacyPixelType::Float32) => ElementType::F32,
            PixelFormat::Legacy(LegacyPixelType::Int32) => ElementType::I32,
            PixelFormat::Legacy(LegacyPixelType::Int16) => ElementType::I16,
            PixelFormat::Legacy(LegacyPixelType::UInt16) => ElementType::U16,
            PixelFormat::Legacy(LegacyPixelType::Float64) => ElementType::F64,
            PixelFormat::Legacy(LegacyPixelType::UInt8) => ElementType::U8,
            PixelFormat::Legacy(LegacyPixelType::UInt32) => ElementType::U32,
        }
    }

    pub fn bytes_per_pixel(self) -> u64 {
        self.element_type().byte_width()
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PixelFormat::Current(format) => f.write_str(format.key()),
            PixelFormat::Legacy(kind) => write!(f, "legacy type {} ({})", kind.code(), self.element_type()),
        }
    }
}
