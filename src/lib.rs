pub mod config;
pub mod error;
pub mod parser;
pub mod spe_file;
pub mod types;
pub mod utils;

// Re-export main types for convenience
pub use config::ReaderConfig;
pub use error::{IndexKind, SpeError};
pub use parser::SettingRule;
pub use spe_file::{SpeFile, SpeSummary, window_wavelengths};
pub use types::{
    CurrentPixelFormat, DataLayout, ElementType, ExperimentSetting, LegacyPixelType, MetaDataType,
    MetaDescriptor, MetaValue, PixelFormat, RegionData, Roi, SensorDims, SettingType, SettingValue,
    SpeVersion, Unit,
};
