//! Per-frame metadata descriptors declared in the footer's `MetaBlock`

use super::setting::Unit;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Numeric type of a metadata value as declared by the `type` attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetaDataType {
    Int64,
    Double,
}

/// One field of the per-frame metadata record.
///
/// The ordered descriptor list applies to every frame: each frame's record
/// holds one value per descriptor, in descriptor order, right after the
/// frame's pixel payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MetaDescriptor {
    /// Tick count since `absolute_time`, reported in milliseconds
    TimeStamp {
        event: String,
        data_type: MetaDataType,
        bit_depth: u32,
        /// Ticks per second
        resolution: u64,
        /// ISO-8601 origin
        absolute_time: String,
    },
    FrameTrackingNumber {
        data_type: MetaDataType,
        bit_depth: u32,
    },
    /// Gate delay/width tracking for intensified cameras
    GateTracking {
        component: String,
        data_type: MetaDataType,
        bit_depth: u32,
        monotonic: bool,
    },
}

impl MetaDescriptor {
    pub fn event(&self) -> &str {
        match self {
            MetaDescriptor::TimeStamp { event, .. } => event,
            MetaDescriptor::FrameTrackingNumber { .. } => "Frame Tracking Number",
            MetaDescriptor::GateTracking { component, .. } => component,
        }
    }

    pub fn data_type(&self) -> MetaDataType {
        match self {
            MetaDescriptor::TimeStamp { data_type, .. }
            | MetaDescriptor::FrameTrackingNumber { data_type, .. }
            | MetaDescriptor::GateTracking { data_type, .. } => *data_type,
        }
    }

    pub fn bit_depth(&self) -> u32 {
        match self {
            MetaDescriptor::TimeStamp { bit_depth, .. }
            | MetaDescriptor::FrameTrackingNumber { bit_depth, .. }
            | MetaDescriptor::GateTracking { bit_depth, .. } => *bit_depth,
        }
    }

    /// Bytes this field occupies in each frame's metadata record
    pub fn byte_width(&self) -> u64 {
        u64::from(self.bit_depth() / 8)
    }

    pub fn unit(&self) -> Unit {
        match self {
            MetaDescriptor::TimeStamp { .. } => Unit::Ms,
            MetaDescriptor::FrameTrackingNumber { .. } => Unit::None,
            MetaDescriptor::GateTracking { .. } => Unit::Ns,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            MetaDescriptor::TimeStamp { .. } => "TimeStamp",
            MetaDescriptor::FrameTrackingNumber { .. } => "FrameTrackingNumber",
            MetaDescriptor::GateTracking { .. } => "GateTracking",
        }
    }
}

/// A decoded per-frame metadata value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Int(i64),
    Float(f64),
}

impl MetaValue {
    pub fn as_f64(self) -> f64 {
        match self {
            MetaValue::Int(value) => value as f64,
            MetaValue::Float(value) => value,
        }
    }
}

impl fmt::Display for MetaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetaValue::Int(value) => write!(f, "{value}"),
            MetaValue::Float(value) => write!(f, "{value}"),
        }
    }
}
