use crate::config::ReaderConfig;
use crate::error::{IndexKind, SpeError, check_indices};
use crate::parser::{
    builtin_rules, decode_region_data, extract_settings, parse_all_frame_metadata, parse_footer,
    parse_header, parse_legacy_header, parse_xml_tree, pretty_print,
};
use crate::types::{
    Calibration, DATA_OFFSET, DataLayout, ExperimentSetting, Header, LegacyPixelType, MetaDescriptor,
    MetaValue, PixelFormat, RegionData, Roi, SensorDims, SpeVersion,
};
use crate::utils::file_utils::{has_extension, read_binary_file_mmap, split_file_path};
use itertools::Itertools;
use log::{debug, warn};
use memmap2::Mmap;
use ndarray::Array1;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// A parsed SPE file with random access to its pixel data and metadata.
///
/// Header, footer and per-frame metadata are parsed once at open. Pixel data
/// stays in the memory map until [`SpeFile::get_data`] asks for it.
pub struct SpeFile {
    path: PathBuf,
    version: SpeVersion,
    layout: DataLayout,
    metadata_fields: Vec<MetaDescriptor>,
    calibration: Calibration,
    xml_footer: Option<String>,
    experiment_settings: Vec<ExperimentSetting>,
    frame_metadata: Vec<Vec<MetaValue>>,
    mmap_data: Mmap,
}

/// Serializable overview of an open file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeSummary {
    pub path: String,
    pub version: SpeVersion,
    pub pixel_format: PixelFormat,
    pub frame_count: u64,
    pub frame_stride: u64,
    pub readout_size: u64,
    pub rois: Vec<Roi>,
    pub metadata_fields: Vec<String>,
    pub wavelength_points: usize,
    pub sensor: Option<SensorDims>,
    pub settings: Vec<ExperimentSetting>,
}

impl SpeSummary {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Parsed state of a v3 file
struct CurrentContents {
    layout: DataLayout,
    metadata_fields: Vec<MetaDescriptor>,
    calibration: Calibration,
    xml_footer: String,
    experiment_settings: Vec<ExperimentSetting>,
}

fn footer_text(data: &[u8], header: &Header) -> Result<String, SpeError> {
    let offset = usize::try_from(header.footer_offset)
        .ok()
        .filter(|&offset| offset as u64 >= DATA_OFFSET && offset <= data.len())
        .ok_or_else(|| {
            SpeError::CorruptHeader(format!(
                "footer offset {} outside data range {DATA_OFFSET}..={}",
                header.footer_offset,
                data.len()
            ))
        })?;
    let text = std::str::from_utf8(&data[offset..])
        .map_err(|e| SpeError::CorruptFooter(format!("invalid UTF-8 in footer: {e}")))?;
    Ok(text.to_string())
}

fn open_current(data: &[u8], header: &Header, config: &ReaderConfig) -> Result<CurrentContents, SpeError> {
    let xml_footer = footer_text(data, header)?;
    let root = parse_xml_tree(&xml_footer)?;
    let footer = parse_footer(&root)?;

    let mut rules = builtin_rules();
    rules.extend(config.extra_settings.iter().cloned());
    let experiment_settings = extract_settings(&root, &rules);
    debug!("found {} experiment setting(s)", experiment_settings.len());

    Ok(CurrentContents {
        layout: footer.layout,
        metadata_fields: footer.metadata_fields,
        calibration: footer.calibration,
        xml_footer,
        experiment_settings,
    })
}

/// Builds the single full-frame region of a 2.x file
fn open_legacy(data: &[u8]) -> Result<DataLayout, SpeError> {
    let legacy = parse_legacy_header(data)?;
    let pixel_type = LegacyPixelType::from_code(legacy.pixel_type_code).ok_or_else(|| {
        SpeError::CorruptHeader(format!("unknown legacy pixel type code {}", legacy.pixel_type_code))
    })?;
    let frame_count = u64::try_from(legacy.frame_count)
        .map_err(|_| SpeError::CorruptHeader(format!("negative frame count {}", legacy.frame_count)))?;
    if legacy.width == 0 || legacy.height == 0 {
        return Err(SpeError::CorruptHeader(format!(
            "frame size {}x{} is empty",
            legacy.width, legacy.height
        )));
    }

    let pixel_format = PixelFormat::Legacy(pixel_type);
    let width = u64::from(legacy.width);
    let height = u64::from(legacy.height);
    let stride = width * height * pixel_format.bytes_per_pixel();

    Ok(DataLayout::builder()
        .pixel_format(pixel_format)
        .frame_stride(stride)
        .readout_size(stride)
        .frame_count(frame_count)
        .rois(vec![Roi::builder().width(width).height(height).stride(stride).build()])
        .build())
}

/// The data block must fit in the file and end before the footer
fn verify_data_block(layout: &DataLayout, file_len: u64, footer_offset: Option<u64>) -> Result<(), SpeError> {
    let end = layout
        .data_block_end()
        .ok_or_else(|| SpeError::CorruptHeader("data block size overflows".to_string()))?;
    if end > file_len {
        return Err(SpeError::CorruptHeader(format!(
            "data block ends at byte {end}, file is only {file_len} bytes"
        )));
    }
    match footer_offset {
        Some(footer_offset) if end > footer_offset => Err(SpeError::CorruptHeader(format!(
            "data block ends at byte {end}, overlapping the footer at byte {footer_offset}"
        ))),
        _ => Ok(()),
    }
}

/// Frame count as an index bound
fn frame_bound(frame_count: u64) -> Result<usize, SpeError> {
    usize::try_from(frame_count).map_err(|_| {
        SpeError::CorruptHeader(format!("frame count {frame_count} exceeds the address space"))
    })
}

/// Explicit indices after a range check, or every index when empty
fn resolve_indices(indices: &[usize], count: usize, kind: IndexKind) -> Result<Vec<usize>, SpeError> {
    if indices.is_empty() {
        return Ok((0..count).collect());
    }
    check_indices(indices, count, kind)?;
    Ok(indices.to_vec())
}

/// Wavelengths of the post-binning columns of `roi`: curve indices
/// `x, x + x_bin, x + 2 * x_bin, ...`, `width` values at most.
pub fn window_wavelengths(curve: &[f64], roi: &Roi) -> Array1<f64> {
    let window: Vec<f64> = (0..roi.width)
        .map(|column| roi.x.saturating_add(column.saturating_mul(roi.x_bin)))
        .map_while(|index| usize::try_from(index).ok().and_then(|index| curve.get(index)).copied())
        .collect();
    if (window.len() as u64) < roi.width {
        warn!(
            "wavelength calibration has {} points, region at x={} needs {} columns with binning {}",
            curve.len(),
            roi.x,
            roi.width,
            roi.x_bin
        );
    }
    Array1::from_vec(window)
}

impl SpeFile {
    /// Open and parse an SPE file with the default configuration
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SpeError> {
        Self::open_with_config(path, &ReaderConfig::default())
    }

    pub fn open_with_config(path: impl AsRef<Path>, config: &ReaderConfig) -> Result<Self, SpeError> {
        let path = path.as_ref().to_path_buf();
        if config.require_spe_extension && !has_extension(&path, "spe") {
            return Err(SpeError::NotSpeFormat(path.display().to_string()));
        }

        // Memory map the file
        let mmap_data = read_binary_file_mmap(&path)?;

        let header = parse_header(&mmap_data)?;
        let version =
            SpeVersion::classify(header.version).ok_or(SpeError::UnsupportedVersion(header.version))?;
        debug!("{}: SPE version {}", path.display(), version.value());

        let (layout, footer_offset, contents) = match version {
            SpeVersion::Current(_) => {
                let contents = open_current(&mmap_data, &header, config)?;
                (contents.layout.clone(), Some(header.footer_offset), Some(contents))
            }
            SpeVersion::Legacy(_) => (open_legacy(&mmap_data)?, None, None),
        };
        debug!(
            "{} region(s), {} frame(s) of {} bytes, {}",
            layout.rois.len(),
            layout.frame_count,
            layout.frame_stride,
            layout.pixel_format
        );

        if config.verify_data_block {
            verify_data_block(&layout, mmap_data.len() as u64, footer_offset)?;
        }

        let (metadata_fields, calibration, xml_footer, experiment_settings) = match contents {
            Some(contents) => (
                contents.metadata_fields,
                contents.calibration,
                Some(contents.xml_footer),
                contents.experiment_settings,
            ),
            None => (Vec::new(), Calibration::default(), None, Vec::new()),
        };

        let frame_metadata = parse_all_frame_metadata(&mmap_data, &layout, &metadata_fields)?;

        Ok(Self {
            path,
            version,
            layout,
            metadata_fields,
            calibration,
            xml_footer,
            experiment_settings,
            frame_metadata,
            mmap_data,
        })
    }

    /// Reads the requested regions for the requested frames.
    ///
    /// Empty `rois` or `frames` select all of them. One `[frames, height, width]`
    /// array is returned per requested region, in request order. 2.x files
    /// have a single region and reject any other selection.
    pub fn get_data(&self, rois: &[usize], frames: &[usize]) -> Result<Vec<RegionData>, SpeError> {
        if self.is_legacy() && !matches!(rois, [] | [0]) {
            return Err(SpeError::UnsupportedOperation(format!(
                "version {} files have a single region, requested {rois:?}",
                self.spe_version()
            )));
        }
        let rois = resolve_indices(rois, self.layout.rois.len(), IndexKind::Roi)?;
        let frames = resolve_indices(frames, frame_bound(self.num_frames())?, IndexKind::Frame)?;

        rois.iter()
            .map(|&roi| decode_region_data(&self.mmap_data, &self.layout, roi, &frames))
            .collect()
    }

    /// Wavelength axis per requested region (empty `rois` selects all).
    ///
    /// Files without calibration, and 2.x files, yield one empty array per
    /// region.
    pub fn get_wavelengths(&self, rois: &[usize]) -> Result<Vec<Array1<f64>>, SpeError> {
        let rois = resolve_indices(rois, self.layout.rois.len(), IndexKind::Roi)?;

        if self.is_legacy() {
            warn!(
                "{}: version {} files have no wavelength calibration",
                self.path.display(),
                self.spe_version()
            );
        }
        let Some(curve) = self.calibration.wavelengths.as_deref() else {
            debug!("{}: no wavelength calibration", self.path.display());
            return Ok(rois.iter().map(|_| Array1::zeros(0)).collect());
        };

        Ok(rois
            .iter()
            .map(|&roi| window_wavelengths(curve, &self.layout.rois[roi]))
            .collect())
    }

    /// Every recognized experiment setting, in footer order
    pub fn retrieve_all_experiment_settings(&self) -> &[ExperimentSetting] {
        &self.experiment_settings
    }

    /// Settings whose name matches one of `names`, ignoring case
    pub fn retrieve_experiment_settings<S: AsRef<str>>(&self, names: &[S]) -> Vec<ExperimentSetting> {
        self.experiment_settings
            .iter()
            .filter(|setting| {
                names
                    .iter()
                    .any(|name| name.as_ref().eq_ignore_ascii_case(&setting.name))
            })
            .cloned()
            .collect()
    }

    /// Metadata values per requested frame (empty `frames` selects all),
    /// one per descriptor in [`SpeFile::meta_list`] order.
    ///
    /// Files without metadata fields give an empty row per frame.
    pub fn get_frame_metadata_value(&self, frames: &[usize]) -> Result<Vec<Vec<MetaValue>>, SpeError> {
        let frames = resolve_indices(frames, frame_bound(self.num_frames())?, IndexKind::Frame)?;
        Ok(frames
            .iter()
            .map(|&frame| self.frame_metadata.get(frame).cloned().unwrap_or_default())
            .collect())
    }

    /// Absolute byte offset of region `roi` in frame `frame`
    pub fn region_byte_offset(&self, roi: usize, frame: usize) -> Result<u64, SpeError> {
        check_indices(&[roi], self.layout.rois.len(), IndexKind::Roi)?;
        check_indices(&[frame], frame_bound(self.num_frames())?, IndexKind::Frame)?;
        Ok(self.layout.region_byte_offset(roi, frame as u64))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_directory(&self) -> String {
        split_file_path(&self.path).0
    }

    /// File name without extension
    pub fn file_name(&self) -> String {
        split_file_path(&self.path).1
    }

    pub fn file_extension(&self) -> String {
        split_file_path(&self.path).2
    }

    pub fn version(&self) -> SpeVersion {
        self.version
    }

    pub fn spe_version(&self) -> f32 {
        self.version.value()
    }

    pub fn is_legacy(&self) -> bool {
        self.version.is_legacy()
    }

    pub fn pixel_format(&self) -> PixelFormat {
        self.layout.pixel_format
    }

    pub fn layout(&self) -> &DataLayout {
        &self.layout
    }

    pub fn roi_list(&self) -> &[Roi] {
        &self.layout.rois
    }

    pub fn num_frames(&self) -> u64 {
        self.layout.frame_count
    }

    /// Bytes from one frame to the next, metadata included
    pub fn frame_stride(&self) -> u64 {
        self.layout.frame_stride
    }

    /// Bytes of pixel payload per frame
    pub fn readout_size(&self) -> u64 {
        self.layout.readout_size
    }

    pub fn meta_list(&self) -> &[MetaDescriptor] {
        &self.metadata_fields
    }

    /// Decoded metadata of every frame, indexed `[frame][descriptor]`.
    /// Empty when the file declares no metadata fields.
    pub fn frame_metadata_values(&self) -> &[Vec<MetaValue>] {
        &self.frame_metadata
    }

    pub fn sensor_dims(&self) -> Option<SensorDims> {
        self.calibration.sensor
    }

    /// The full-sensor wavelength curve, if calibrated
    pub fn wavelengths(&self) -> Option<&[f64]> {
        self.calibration.wavelengths.as_deref()
    }

    /// Raw footer text; `None` for 2.x files
    pub fn xml_footer(&self) -> Option<&str> {
        self.xml_footer.as_deref()
    }

    pub fn xml_footer_pretty(&self) -> Result<Option<String>, SpeError> {
        self.xml_footer.as_deref().map(pretty_print).transpose()
    }

    pub fn summary(&self) -> SpeSummary {
        SpeSummary {
            path: self.path.display().to_string(),
            version: self.version,
            pixel_format: self.layout.pixel_format,
            frame_count: self.layout.frame_count,
            frame_stride: self.layout.frame_stride,
            readout_size: self.layout.readout_size,
            rois: self.layout.rois.clone(),
            metadata_fields: self
                .metadata_fields
                .iter()
                .map(|field| format!("{} ({})", field.kind_name(), field.event()))
                .collect(),
            wavelength_points: self.wavelengths().map_or(0, <[f64]>::len),
            sensor: self.sensor_dims(),
            settings: self.experiment_settings.clone(),
        }
    }

    /// Get a summary of the file contents
    pub fn get_summary(&self) -> String {
        let mut result = String::new();

        result.push_str(&format!("SPE file: {}\n", self.path.display()));
        result.push_str(&format!("  Version: {}\n", self.spe_version()));
        result.push_str(&format!("  Pixel format: {}\n", self.layout.pixel_format));
        result.push_str(&format!(
            "  Frames: {} ({} byte stride, {} byte readout)\n",
            self.layout.frame_count, self.layout.frame_stride, self.layout.readout_size
        ));

        result.push_str(&format!("\nRegions ({}):\n", self.layout.rois.len()));
        for (index, roi) in self.layout.rois.iter().enumerate() {
            result.push_str(&format!(
                "  {index}: {}x{} at ({}, {}), binning {}x{}\n",
                roi.width, roi.height, roi.x, roi.y, roi.x_bin, roi.y_bin
            ));
        }

        if !self.metadata_fields.is_empty() {
            result.push_str(&format!(
                "\nFrame metadata: {}\n",
                self.metadata_fields
                    .iter()
                    .map(|field| format!("{} [{}]", field.event(), field.unit()))
                    .join(", ")
            ));
        }

        if let Some(sensor) = self.sensor_dims() {
            result.push_str(&format!("\nSensor: {}x{}\n", sensor.width, sensor.height));
        }
        if let Some(curve) = self.wavelengths() {
            if let (Some(first), Some(last)) = (curve.first(), curve.last()) {
                result.push_str(&format!(
                    "Wavelength calibration: {} points, {first:.3} to {last:.3} nm\n",
                    curve.len()
                ));
            }
        }

        if !self.experiment_settings.is_empty() {
            result.push_str("\nExperiment settings:\n");
            for setting in &self.experiment_settings {
                result.push_str(&format!("  {setting}\n"));
            }
        }

        result
    }
}
