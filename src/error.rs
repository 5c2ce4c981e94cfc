//! Error type shared by every SPE parsing and query operation

use std::fmt;

/// Which kind of index a caller supplied out of range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    Roi,
    Frame,
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexKind::Roi => write!(f, "ROI"),
            IndexKind::Frame => write!(f, "frame"),
        }
    }
}

/// Errors that can occur while opening or querying an SPE file
#[derive(Debug, thiserror::Error)]
pub enum SpeError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The path does not carry the `.spe` extension
    #[error("Not an SPE file: {0}")]
    NotSpeFormat(String),

    /// Version field outside both known format families
    #[error("Unsupported SPE version: {0}")]
    UnsupportedVersion(f32),

    /// A required fixed-offset header field is missing or inconsistent
    #[error("Corrupt header: {0}")]
    CorruptHeader(String),

    /// The XML footer is malformed or lacks a required element/attribute
    #[error("Corrupt footer: {0}")]
    CorruptFooter(String),

    /// The footer declares a metadata block this reader does not know
    #[error("Unrecognized metadata type: {0}")]
    UnrecognizedMetadataType(String),

    /// A caller supplied ROI or frame index is not in `0..count`
    #[error("{kind} index {index} out of range (valid: 0..{count})")]
    IndexOutOfRange {
        kind: IndexKind,
        index: usize,
        count: usize,
    },

    /// Operation not available for this format family
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// Reader configuration could not be loaded
    #[error("Config error: {0}")]
    Config(String),
}

impl From<quick_xml::Error> for SpeError {
    fn from(err: quick_xml::Error) -> Self {
        SpeError::CorruptFooter(format!("XML parsing error: {err}"))
    }
}

impl From<quick_xml::events::attributes::AttrError> for SpeError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        SpeError::CorruptFooter(format!("XML attribute error: {err}"))
    }
}

impl From<toml::de::Error> for SpeError {
    fn from(err: toml::de::Error) -> Self {
        SpeError::Config(err.to_string())
    }
}

/// Check that every index in `indices` lies in `0..count`
pub(crate) fn check_indices(indices: &[usize], count: usize, kind: IndexKind) -> Result<(), SpeError> {
    match indices.iter().find(|&&index| index >= count) {
        Some(&index) => Err(SpeError::IndexOutOfRange { kind, index, count }),
        None => Ok(()),
    }
}
