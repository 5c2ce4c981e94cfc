use bon::Builder;
use serde::{Deserialize, Serialize};

/// A region of interest as stored in each frame's readout.
///
/// `width` and `height` are post-binning pixel counts; `x` and `y` are the
/// sensor origin of the region before binning. `stride` is the number of bytes
/// one readout of this region occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Builder)]
pub struct Roi {
    #[builder(default)]
    pub x: u64,
    #[builder(default)]
    pub y: u64,
    pub width: u64,
    pub height: u64,
    #[builder(default = 1)]
    pub x_bin: u64,
    #[builder(default = 1)]
    pub y_bin: u64,
    pub stride: u64,
}

impl Roi {
    /// Number of pixels in one readout of this region, `None` on overflow
    pub fn pixel_count(&self) -> Option<u64> {
        self.width.checked_mul(self.height)
    }
}

/// Full-chip sensor dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Builder)]
pub struct SensorDims {
    pub width: u64,
    pub height: u64,
}
