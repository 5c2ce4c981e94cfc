//! Type definitions for the SPE file format

pub mod header;
pub mod layout;
pub mod metadata;
pub mod pixel_format;
pub mod region_data;
pub mod roi;
pub mod setting;

// Re-export the main types for convenience
pub use header::{DATA_OFFSET, Header, LegacyHeader, SpeVersion};
pub use layout::{Calibration, DataLayout};
pub use metadata::{MetaDataType, MetaDescriptor, MetaValue};
pub use pixel_format::{CurrentPixelFormat, ElementType, LegacyPixelType, PixelFormat};
pub use region_data::RegionData;
pub use roi::{Roi, SensorDims};
pub use setting::{ExperimentSetting, SettingType, SettingValue, Unit};
