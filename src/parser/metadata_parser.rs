//! Per-frame metadata records.
//!
//! Each frame's record follows the frame's pixel payload and holds one value
//! per descriptor, `bit_depth / 8` bytes each, in descriptor order.

use crate::error::SpeError;
use crate::types::{DataLayout, MetaDataType, MetaDescriptor, MetaValue};
use crate::utils::file_utils::slice_at;
use log::trace;
use winnow::{
    Parser,
    binary::{le_f32, le_f64, le_i8, le_i16, le_i32, le_i64},
    error::ContextError,
};

fn parse_raw(input: &mut &[u8], data_type: MetaDataType, bit_depth: u32) -> Option<Result<MetaValue, ContextError>> {
    let value = match (data_type, bit_depth) {
        (MetaDataType::Int64, 8) => le_i8.parse_next(input).map(|v| MetaValue::Int(i64::from(v))),
        (MetaDataType::Int64, 16) => le_i16.parse_next(input).map(|v| MetaValue::Int(i64::from(v))),
        (MetaDataType::Int64, 32) => le_i32.parse_next(input).map(|v| MetaValue::Int(i64::from(v))),
        (MetaDataType::Int64, 64) => le_i64.parse_next(input).map(MetaValue::Int),
        (MetaDataType::Double, 32) => le_f32.parse_next(input).map(|v| MetaValue::Float(f64::from(v))),
        (MetaDataType::Double, 64) => le_f64.parse_next(input).map(MetaValue::Float),
        _ => return None,
    };
    Some(value)
}

/// Decodes one descriptor's value from the front of `input`.
///
/// TimeStamp tick counts are converted to milliseconds.
pub fn parse_meta_value(input: &mut &[u8], descriptor: &MetaDescriptor) -> Result<MetaValue, SpeError> {
    let raw = parse_raw(input, descriptor.data_type(), descriptor.bit_depth())
        .ok_or_else(|| {
            SpeError::CorruptFooter(format!(
                "{} has unsupported {}-bit {:?} values",
                descriptor.kind_name(),
                descriptor.bit_depth(),
                descriptor.data_type()
            ))
        })?
        .map_err(|e| SpeError::CorruptHeader(format!("failed to decode {}: {e:?}", descriptor.kind_name())))?;

    match descriptor {
        MetaDescriptor::TimeStamp { resolution: 0, .. } => {
            Err(SpeError::CorruptFooter("TimeStamp resolution is zero".to_string()))
        }
        MetaDescriptor::TimeStamp { resolution, .. } => {
            Ok(MetaValue::Float(raw.as_f64() / *resolution as f64 * 1000.0))
        }
        _ => Ok(raw),
    }
}

/// Decodes the metadata record of `frame`
pub fn parse_frame_metadata(
    data: &[u8],
    layout: &DataLayout,
    descriptors: &[MetaDescriptor],
    frame: u64,
) -> Result<Vec<MetaValue>, SpeError> {
    if descriptors.is_empty() {
        return Ok(Vec::new());
    }
    let offset = layout.metadata_byte_offset(frame);
    let size: u64 = descriptors.iter().map(MetaDescriptor::byte_width).sum();
    trace!("reading metadata of frame {frame}: {size} bytes at byte {offset}");

    let mut input = slice_at(data, offset, size).ok_or_else(|| {
        SpeError::CorruptHeader(format!(
            "metadata of frame {frame} at byte {offset} lies past the end of the file"
        ))
    })?;
    descriptors
        .iter()
        .map(|descriptor| parse_meta_value(&mut input, descriptor))
        .collect()
}

/// Decodes the metadata record of every frame in the file.
///
/// Without descriptors there are no records and the table is empty.
pub fn parse_all_frame_metadata(
    data: &[u8],
    layout: &DataLayout,
    descriptors: &[MetaDescriptor],
) -> Result<Vec<Vec<MetaValue>>, SpeError> {
    if descriptors.is_empty() {
        return Ok(Vec::new());
    }
    (0..layout.frame_count)
        .map(|frame| parse_frame_metadata(data, layout, descriptors, frame))
        .collect()
}
