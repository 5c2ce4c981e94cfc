use crate::error::SpeError;
use crate::types::{DataLayout, ElementType, RegionData};
use crate::utils::file_utils::slice_at;
use log::trace;
use ndarray::Array3;
use winnow::{
    Parser,
    binary::{le_f32, le_f64, le_i16, le_i32, le_u8, le_u16, le_u32},
    combinator::repeat,
    error::ContextError,
};

/// A pixel element type stored little-endian in the data block
pub trait PixelElement: Copy + Send + Sync + 'static {
    fn parse_le(input: &mut &[u8]) -> Result<Self, ContextError>;
}

macro_rules! pixel_element {
    ($ty:ty, $parser:ident) => {
        impl PixelElement for $ty {
            fn parse_le(input: &mut &[u8]) -> Result<Self, ContextError> {
                $parser.parse_next(input)
            }
        }
    };
}

pixel_element!(u8, le_u8);
pixel_element!(i16, le_i16);
pixel_element!(u16, le_u16);
pixel_element!(i32, le_i32);
pixel_element!(u32, le_u32);
pixel_element!(f32, le_f32);
pixel_element!(f64, le_f64);

/// Parses exactly `count` elements from the start of `input`
pub fn parse_elements<T: PixelElement>(input: &[u8], count: usize) -> Result<Vec<T>, ContextError> {
    let mut input = input;
    repeat(count, T::parse_le).parse_next(&mut input)
}

/// Reads one readout of region `roi` in frame `frame`, row-major
fn read_region_frame<T: PixelElement>(
    data: &[u8],
    layout: &DataLayout,
    roi: usize,
    frame: usize,
) -> Result<Vec<T>, SpeError> {
    let region = &layout.rois[roi];
    let offset = layout.region_byte_offset(roi, frame as u64);
    let out_of_file = || {
        SpeError::CorruptHeader(format!(
            "region {roi} of frame {frame} at byte {offset} lies past the end of the file"
        ))
    };
    let pixels = region
        .pixel_count()
        .and_then(|pixels| usize::try_from(pixels).ok())
        .ok_or_else(out_of_file)?;
    trace!("reading region {roi} frame {frame}: {pixels} pixels at byte {offset}");

    let bytes = (pixels as u64)
        .checked_mul(layout.pixel_format.bytes_per_pixel())
        .and_then(|len| slice_at(data, offset, len))
        .ok_or_else(out_of_file)?;
    parse_elements(bytes, pixels).map_err(|e| {
        SpeError::CorruptHeader(format!("failed to decode region {roi} of frame {frame}: {e:?}"))
    })
}

/// Decodes region `roi` for each of `frames` into a `[frames, height, width]` array
pub fn decode_region<T: PixelElement>(
    data: &[u8],
    layout: &DataLayout,
    roi: usize,
    frames: &[usize],
) -> Result<Array3<T>, SpeError> {
    let region = &layout.rois[roi];

    #[cfg(feature = "parallel")]
    let per_frame: Vec<Vec<T>> = {
        use rayon::prelude::*;
        frames
            .par_iter()
            .map(|&frame| read_region_frame(data, layout, roi, frame))
            .collect::<Result<_, _>>()?
    };

    #[cfg(not(feature = "parallel"))]
    let per_frame: Vec<Vec<T>> = frames
        .iter()
        .map(|&frame| read_region_frame(data, layout, roi, frame))
        .collect::<Result<_, _>>()?;

    let flat: Vec<T> = per_frame.into_iter().flatten().collect();
    Array3::from_shape_vec(
        (frames.len(), region.height as usize, region.width as usize),
        flat,
    )
    .map_err(|e| SpeError::CorruptHeader(format!("region {roi} does not match its declared shape: {e}")))
}

/// Decodes region `roi` with the element type of the file's pixel format
pub fn decode_region_data(
    data: &[u8],
    layout: &DataLayout,
    roi: usize,
    frames: &[usize],
) -> Result<RegionData, SpeError> {
    Ok(match layout.pixel_format.element_type() {
        ElementType::U8 => RegionData::U8(decode_region(data, layout, roi, frames)?),
        ElementType::I16 => RegionData::I16(decode_region(data, layout, roi, frames)?),
        ElementType::U16 => RegionData::U16(decode_region(data, layout, roi, frames)?),
        ElementType::I32 => RegionData::I32(decode_region(data, layout, roi, frames)?),
        ElementType::U32 => RegionData::U32(decode_region(data, layout, roi, frames)?),
        ElementType::F32 => RegionData::F32(decode_region(data, layout, roi, frames)?),
        ElementType::F64 => RegionData::F64(decode_region(data, layout, roi, frames)?),
    })
}
