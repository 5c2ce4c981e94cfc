//! Data block geometry and calibration shared by both format families

use super::header::DATA_OFFSET;
use super::pixel_format::PixelFormat;
use super::roi::{Roi, SensorDims};
use bon::bon;

/// Geometry of the data block.
///
/// Frames are laid out back to back, `frame_stride` bytes apart. Inside each
/// frame the regions follow each other in declaration order (together
/// `readout_size` bytes), followed by that frame's metadata record.
#[derive(Debug, Clone, PartialEq)]
pub struct DataLayout {
    pub pixel_format: PixelFormat,
    /// Bytes from the start of one frame to the start of the next
    pub frame_stride: u64,
    /// Bytes of pixel payload (all regions) per frame
    pub readout_size: u64,
    pub frame_count: u64,
    pub rois: Vec<Roi>,
}

#[bon]
impl DataLayout {
    #[builder]
    pub fn new(
        pixel_format: PixelFormat,
        frame_stride: u64,
        readout_size: Option<u64>,
        frame_count: u64,
        rois: Vec<Roi>,
    ) -> Self {
        let readout_size = readout_size
            .unwrap_or_else(|| rois.iter().fold(0u64, |total, roi| total.saturating_add(roi.stride)));
        Self {
            pixel_format,
            frame_stride,
            readout_size,
            frame_count,
            rois,
        }
    }

    /// Bytes preceding region `roi` inside one frame's readout
    pub fn region_prefix(&self, roi: usize) -> u64 {
        self.rois
            .iter()
            .take(roi)
            .fold(0u64, |prefix, region| prefix.saturating_add(region.stride))
    }

    fn frame_byte_offset(&self, frame: u64) -> u64 {
        frame.saturating_mul(self.frame_stride).saturating_add(DATA_OFFSET)
    }

    /// Absolute file offset of region `roi` in frame `frame`.
    ///
    /// Saturates at `u64::MAX`, which no file reaches.
    pub fn region_byte_offset(&self, roi: usize, frame: u64) -> u64 {
        self.frame_byte_offset(frame).saturating_add(self.region_prefix(roi))
    }

    /// Absolute file offset of the metadata record of frame `frame`
    pub fn metadata_byte_offset(&self, frame: u64) -> u64 {
        self.frame_byte_offset(frame).saturating_add(self.readout_size)
    }

    /// Bytes available for the metadata record inside each frame
    pub fn metadata_capacity(&self) -> u64 {
        self.frame_stride.saturating_sub(self.readout_size)
    }

    /// End of the data block, `None` on arithmetic overflow
    pub fn data_block_end(&self) -> Option<u64> {
        self.frame_count
            .checked_mul(self.frame_stride)
            .and_then(|size| size.checked_add(DATA_OFFSET))
    }
}

/// Calibration data from the footer's `Calibrations` section
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Calibration {
    /// One wavelength per original sensor column
    pub wavelengths: Option<Vec<f64>>,
    pub sensor: Option<SensorDims>,
}
