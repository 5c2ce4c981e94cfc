//! Decoded pixel data for one region across the requested frames

use super::pixel_format::ElementType;
use ndarray::Array3;

/// A `[frames, rows, cols]` block typed by the file's pixel format
#[derive(Debug, Clone, PartialEq)]
pub enum RegionData {
    U8(Array3<u8>),
    I16(Array3<i16>),
    U16(Array3<u16>),
    I32(Array3<i32>),
    U32(Array3<u32>),
    F32(Array3<f32>),
    F64(Array3<f64>),
}

impl RegionData {
    pub fn element_type(&self) -> ElementType {
        match self {
            RegionData::U8(_) => ElementType::U8,
            RegionData::I16(_) => ElementType::I16,
            RegionData::U16(_) => ElementType::U16,
            RegionData::I32(_) => ElementType::I32,
            RegionData::U32(_) => ElementType::U32,
            RegionData::F32(_) => ElementType::F32,
            RegionData::F64(_) => ElementType::F64,
        }
    }

    /// `(frames, rows, cols)`
    pub fn shape(&self) -> (usize, usize, usize) {
        match self {
            RegionData::U8(data) => data.dim(),
            RegionData::I16(data) => data.dim(),
            RegionData::U16(data) => data.dim(),
            RegionData::I32(data) => data.dim(),
            RegionData::U32(data) => data.dim(),
            RegionData::F32(data) => data.dim(),
            RegionData::F64(data) => data.dim(),
        }
    }

    /// Widen to f64; exact for every supported element type
    pub fn to_f64(&self) -> Array3<f64> {
        match self {
            RegionData::U8(data) => data.mapv(f64::from),
            RegionData::I16(data) => data.mapv(f64::from),
            RegionData::U16(data) => data.mapv(f64::from),
            RegionData::I32(data) => data.mapv(f64::from),
            RegionData::U32(data) => data.mapv(f64::from),
            RegionData::F32(data) => data.mapv(f64::from),
            RegionData::F64(data) => data.clone(),
        }
    }

    pub fn as_u16(&self) -> Option<&Array3<u16>> {
        match self {
            RegionData::U16(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_u32(&self) -> Option<&Array3<u32>> {
        match self {
            RegionData::U32(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<&Array3<f32>> {
        match self {
            RegionData::F32(data) => Some(data),
            _ => None,
        }
    }
}
