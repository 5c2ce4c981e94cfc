//! Parsers for the v3 XML footer: data layout, metadata descriptors and
//! calibration.

use super::xml_tree::XmlNode;
use crate::error::SpeError;
use crate::types::{
    Calibration, CurrentPixelFormat, DataLayout, MetaDataType, MetaDescriptor, PixelFormat, Roi,
    SensorDims,
};
use log::{debug, warn};
use std::str::FromStr;

/// Structured content of a v3 footer
#[derive(Debug, Clone, PartialEq)]
pub struct Footer {
    pub layout: DataLayout,
    pub metadata_fields: Vec<MetaDescriptor>,
    pub calibration: Calibration,
}

fn attr_value<T: FromStr>(node: &XmlNode, name: &str) -> Result<Option<T>, SpeError> {
    match node.attr(name) {
        None => Ok(None),
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| {
            SpeError::CorruptFooter(format!(
                "attribute '{name}' of <{}> has invalid value '{raw}'",
                node.name
            ))
        }),
    }
}

fn required_attr<T: FromStr>(node: &XmlNode, name: &str) -> Result<T, SpeError> {
    attr_value(node, name)?.ok_or_else(|| {
        SpeError::CorruptFooter(format!("<{}> is missing required attribute '{name}'", node.name))
    })
}

fn parse_bool(node: &XmlNode, name: &str) -> Result<Option<bool>, SpeError> {
    match node.attr(name).map(str::trim) {
        None => Ok(None),
        Some(raw) if raw.eq_ignore_ascii_case("true") => Ok(Some(true)),
        Some(raw) if raw.eq_ignore_ascii_case("false") => Ok(Some(false)),
        Some(raw) => Err(SpeError::CorruptFooter(format!(
            "attribute '{name}' of <{}> is not a boolean: '{raw}'",
            node.name
        ))),
    }
}

/// Parses `DataFormat/DataBlock` and its region children
pub fn parse_data_format(root: &XmlNode) -> Result<DataLayout, SpeError> {
    let data_format = root
        .child("DataFormat")
        .ok_or_else(|| SpeError::CorruptFooter("footer has no <DataFormat> element".to_string()))?;
    let frame_block = data_format
        .child("DataBlock")
        .ok_or_else(|| SpeError::CorruptFooter("<DataFormat> has no <DataBlock> element".to_string()))?;

    let frame_stride: u64 = required_attr(frame_block, "stride")?;
    if frame_stride == 0 {
        return Err(SpeError::CorruptFooter("frame <DataBlock> has zero stride".to_string()));
    }
    let readout_size: Option<u64> = attr_value(frame_block, "size")?;
    let frame_count: u64 = required_attr(frame_block, "count")?;
    let format_key: String = required_attr(frame_block, "pixelFormat")?;
    let pixel_format = CurrentPixelFormat::from_key(&format_key)
        .ok_or_else(|| SpeError::CorruptFooter(format!("unknown pixel format '{format_key}'")))?;

    let rois = frame_block
        .children_named("DataBlock")
        .enumerate()
        .map(|(index, region)| {
            let roi = Roi::builder()
                .stride(required_attr(region, "stride")?)
                .width(required_attr(region, "width")?)
                .height(required_attr(region, "height")?)
                .build();
            if roi.width == 0 || roi.height == 0 || roi.stride == 0 {
                return Err(SpeError::CorruptFooter(format!(
                    "region {index} is empty: {}x{} pixels, stride {}",
                    roi.width, roi.height, roi.stride
                )));
            }
            Ok(roi)
        })
        .collect::<Result<Vec<_>, SpeError>>()?;

    if rois.is_empty() {
        return Err(SpeError::CorruptFooter("frame <DataBlock> declares no regions".to_string()));
    }

    Ok(DataLayout::builder()
        .pixel_format(PixelFormat::Current(pixel_format))
        .frame_stride(frame_stride)
        .maybe_readout_size(readout_size)
        .frame_count(frame_count)
        .rois(rois)
        .build())
}

fn parse_meta_data_type(node: &XmlNode) -> Result<MetaDataType, SpeError> {
    let raw: String = required_attr(node, "type")?;
    if raw.eq_ignore_ascii_case("Int64") {
        Ok(MetaDataType::Int64)
    } else if raw.eq_ignore_ascii_case("Double") {
        Ok(MetaDataType::Double)
    } else {
        Err(SpeError::CorruptFooter(format!(
            "metadata <{}> has unknown value type '{raw}'",
            node.name
        )))
    }
}

fn parse_bit_depth(node: &XmlNode, data_type: MetaDataType) -> Result<u32, SpeError> {
    let bit_depth: u32 = required_attr(node, "bitDepth")?;
    let supported = match data_type {
        MetaDataType::Int64 => matches!(bit_depth, 8 | 16 | 32 | 64),
        MetaDataType::Double => matches!(bit_depth, 32 | 64),
    };
    if supported {
        Ok(bit_depth)
    } else {
        Err(SpeError::CorruptFooter(format!(
            "metadata <{}> has unsupported bit depth {bit_depth} for {data_type:?}",
            node.name
        )))
    }
}

fn parse_meta_descriptor(node: &XmlNode) -> Result<MetaDescriptor, SpeError> {
    let kind = node.name.as_str();
    let known = ["TimeStamp", "FrameTrackingNumber", "GateTracking"]
        .iter()
        .any(|name| kind.eq_ignore_ascii_case(name));
    if !known {
        return Err(SpeError::UnrecognizedMetadataType(kind.to_string()));
    }

    let data_type = parse_meta_data_type(node)?;
    let bit_depth = parse_bit_depth(node, data_type)?;

    if kind.eq_ignore_ascii_case("TimeStamp") {
        let resolution: u64 = required_attr(node, "resolution")?;
        if resolution == 0 {
            return Err(SpeError::CorruptFooter("TimeStamp resolution is zero".to_string()));
        }
        Ok(MetaDescriptor::TimeStamp {
            event: node.attr("event").unwrap_or_default().to_string(),
            data_type,
            bit_depth,
            resolution,
            absolute_time: node.attr("absoluteTime").unwrap_or_default().to_string(),
        })
    } else if kind.eq_ignore_ascii_case("GateTracking") {
        Ok(MetaDescriptor::GateTracking {
            component: node.attr("component").unwrap_or_default().to_string(),
            data_type,
            bit_depth,
            monotonic: parse_bool(node, "monotonic")?.unwrap_or(false),
        })
    } else {
        Ok(MetaDescriptor::FrameTrackingNumber { data_type, bit_depth })
    }
}

/// Parses every descriptor under `MetaFormat/MetaBlock`, in order
pub fn parse_meta_format(root: &XmlNode) -> Result<Vec<MetaDescriptor>, SpeError> {
    let Some(meta_format) = root.child("MetaFormat") else {
        return Ok(Vec::new());
    };
    meta_format
        .children_named("MetaBlock")
        .flat_map(|block| block.children.iter())
        .map(parse_meta_descriptor)
        .collect()
}

fn parse_wavelength_list(text: &str) -> Result<Vec<f64>, SpeError> {
    text.split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| {
            value
                .parse::<f64>()
                .map_err(|_| SpeError::CorruptFooter(format!("invalid wavelength value '{value}'")))
        })
        .collect()
}

/// `WavelengthError` holds whitespace separated `wavelength,error` pairs
fn parse_wavelength_error_list(text: &str) -> Result<Vec<f64>, SpeError> {
    text.split_whitespace()
        .map(|pair| {
            let wavelength = pair.split(',').next().unwrap_or_default().trim();
            wavelength
                .parse::<f64>()
                .map_err(|_| SpeError::CorruptFooter(format!("invalid wavelength pair '{pair}'")))
        })
        .collect()
}

/// Parses `Calibrations`, windowing each ROI with its sensor mapping.
///
/// Sensor mappings are assigned to ROIs in declaration order; binning turns
/// the mapping's original width/height into the region's post-binning size.
pub fn parse_calibrations(root: &XmlNode, rois: &mut [Roi]) -> Result<Calibration, SpeError> {
    let mut calibration = Calibration::default();
    let Some(calibrations) = root.child("Calibrations") else {
        return Ok(calibration);
    };

    let mut mapped = 0usize;
    for entry in &calibrations.children {
        if entry.is_named("WavelengthMapping") {
            for curve in &entry.children {
                if curve.is_named("WavelengthError") {
                    calibration.wavelengths = Some(parse_wavelength_error_list(&curve.text)?);
                } else if curve.is_named("Wavelength") {
                    calibration.wavelengths = Some(parse_wavelength_list(&curve.text)?);
                }
            }
        } else if entry.is_named("SensorInformation") {
            calibration.sensor = Some(
                SensorDims::builder()
                    .width(required_attr(entry, "width")?)
                    .height(required_attr(entry, "height")?)
                    .build(),
            );
        } else if entry.is_named("SensorMapping") {
            let Some(roi) = rois.get_mut(mapped) else {
                continue;
            };
            let x_bin: u64 = attr_value(entry, "xBinning")?.unwrap_or(1);
            let y_bin: u64 = attr_value(entry, "yBinning")?.unwrap_or(1);
            if x_bin == 0 || y_bin == 0 {
                return Err(SpeError::CorruptFooter(format!(
                    "sensor mapping {mapped} has zero binning"
                )));
            }
            let original_width: u64 = required_attr(entry, "width")?;
            let original_height: u64 = required_attr(entry, "height")?;
            let width = original_width / x_bin;
            let height = original_height / y_bin;
            if width != roi.width || height != roi.height {
                warn!(
                    "sensor mapping {mapped} gives {width}x{height}, region block declares {}x{}",
                    roi.width, roi.height
                );
            }

            roi.x = attr_value(entry, "x")?.unwrap_or(0);
            roi.y = attr_value(entry, "y")?.unwrap_or(0);
            roi.x_bin = x_bin;
            roi.y_bin = y_bin;
            roi.width = width;
            roi.height = height;
            mapped += 1;
        }
    }

    Ok(calibration)
}

/// Cross-checks region strides, readout size, frame stride and metadata size
pub fn validate_layout(layout: &DataLayout, metadata_fields: &[MetaDescriptor]) -> Result<(), SpeError> {
    let bpp = layout.pixel_format.bytes_per_pixel();
    for (index, roi) in layout.rois.iter().enumerate() {
        if roi.stride % bpp != 0 {
            return Err(SpeError::CorruptFooter(format!(
                "region {index} stride {} is not a multiple of {bpp} byte pixels",
                roi.stride
            )));
        }
        let needed = roi.pixel_count().and_then(|pixels| pixels.checked_mul(bpp));
        if needed.is_none_or(|needed| needed > roi.stride) {
            return Err(SpeError::CorruptFooter(format!(
                "region {index} is {}x{} pixels but its stride holds only {} bytes",
                roi.width, roi.height, roi.stride
            )));
        }
    }

    let region_total = layout
        .rois
        .iter()
        .try_fold(0u64, |total, roi| total.checked_add(roi.stride))
        .ok_or_else(|| SpeError::CorruptFooter("region strides overflow".to_string()))?;
    if region_total > layout.readout_size {
        return Err(SpeError::CorruptFooter(format!(
            "region strides sum to {region_total} bytes, more than the {} byte readout",
            layout.readout_size
        )));
    }
    if region_total < layout.readout_size {
        warn!(
            "region strides sum to {region_total} bytes, readout declares {}",
            layout.readout_size
        );
    }
    if layout.readout_size > layout.frame_stride {
        return Err(SpeError::CorruptFooter(format!(
            "readout size {} exceeds frame stride {}",
            layout.readout_size, layout.frame_stride
        )));
    }

    let metadata_size: u64 = metadata_fields.iter().map(MetaDescriptor::byte_width).sum();
    if metadata_size > layout.metadata_capacity() {
        return Err(SpeError::CorruptFooter(format!(
            "metadata record needs {metadata_size} bytes, frame leaves {}",
            layout.metadata_capacity()
        )));
    }
    Ok(())
}

/// Parses the structured content of a v3 footer tree
pub fn parse_footer(root: &XmlNode) -> Result<Footer, SpeError> {
    let mut layout = parse_data_format(root)?;
    let metadata_fields = parse_meta_format(root)?;
    let calibration = parse_calibrations(root, &mut layout.rois)?;
    validate_layout(&layout, &metadata_fields)?;

    debug!(
        "footer: {} region(s), {} frame(s), {}, {} metadata field(s)",
        layout.rois.len(),
        layout.frame_count,
        layout.pixel_format,
        metadata_fields.len()
    );

    Ok(Footer {
        layout,
        metadata_fields,
        calibration,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::xml_tree::parse_xml_tree;

    const FOOTER: &str = r#"<SpeFormat version="3.0" xmlns="http://www.princetoninstruments.com/spe/2009">
  <DataFormat>
    <DataBlock type="Frame" count="4" pixelFormat="MonochromeUnsigned16" size="264" stride="288">
      <DataBlock type="Region" count="1" width="10" height="2" size="40" stride="40" />
      <DataBlock type="Region" count="1" width="8" height="14" size="224" stride="224" />
    </DataBlock>
  </DataFormat>
  <MetaFormat>
    <MetaBlock type="Frame">
      <TimeStamp event="ExposureStarted" type="Int64" bitDepth="64" resolution="1000000" absoluteTime="2024-03-01T10:00:00.0000000-05:00" />
      <FrameTrackingNumber type="Int64" bitDepth="64" />
      <GateTracking component="Delay" type="Double" bitDepth="64" monotonic="True" />
    </MetaBlock>
  </MetaFormat>
  <Calibrations>
    <WavelengthMapping id="1">
      <Wavelength xml:space="preserve">500,501,502,503,504,505,506,507,508,509,510,511,512,513,514,515,516,517,518,519</Wavelength>
    </WavelengthMapping>
    <SensorInformation id="1" width="20" height="30" />
    <SensorMapping id="2" x="0" y="0" width="20" height="20" xBinning="2" yBinning="10" />
    <SensorMapping id="3" x="4" y="2" width="8" height="14" xBinning="1" yBinning="1" />
  </Calibrations>
</SpeFormat>"#;

    #[test]
    fn test_parse_full_footer() {
        let root = parse_xml_tree(FOOTER).unwrap();
        let footer = parse_footer(&root).unwrap();

        let layout = &footer.layout;
        assert_eq!(
            layout.pixel_format,
            PixelFormat::Current(CurrentPixelFormat::MonochromeUnsigned16)
        );
        assert_eq!(layout.frame_stride, 288);
        assert_eq!(layout.readout_size, 264);
        assert_eq!(layout.frame_count, 4);
        assert_eq!(layout.rois.len(), 2);

        let first = layout.rois[0];
        assert_eq!((first.width, first.height), (10, 2));
        assert_eq!((first.x_bin, first.y_bin), (2, 10));
        let second = layout.rois[1];
        assert_eq!((second.x, second.y), (4, 2));
        assert_eq!(second.stride, 224);

        assert_eq!(footer.metadata_fields.len(), 3);
        assert_eq!(footer.metadata_fields[0].event(), "ExposureStarted");
        assert!(matches!(
            footer.metadata_fields[2],
            MetaDescriptor::GateTracking { monotonic: true, .. }
        ));

        let wavelengths = footer.calibration.wavelengths.as_ref().unwrap();
        assert_eq!(wavelengths.len(), 20);
        assert_eq!(wavelengths[3], 503.0);
        assert_eq!(
            footer.calibration.sensor,
            Some(SensorDims { width: 20, height: 30 })
        );
    }

    #[test]
    fn test_unrecognized_metadata_type() {
        let xml = FOOTER.replace(
            "<FrameTrackingNumber type=\"Int64\" bitDepth=\"64\" />",
            "<ExposureEnded type=\"Int64\" bitDepth=\"64\" />",
        );
        let root = parse_xml_tree(&xml).unwrap();
        match parse_footer(&root) {
            Err(SpeError::UnrecognizedMetadataType(name)) => assert_eq!(name, "ExposureEnded"),
            other => panic!("expected UnrecognizedMetadataType, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_data_format() {
        let root = parse_xml_tree("<SpeFormat><Calibrations/></SpeFormat>").unwrap();
        assert!(matches!(parse_footer(&root), Err(SpeError::CorruptFooter(_))));
    }

    #[test]
    fn test_unknown_pixel_format() {
        let xml = FOOTER.replace("MonochromeUnsigned16", "RgbUnsigned8");
        let root = parse_xml_tree(&xml).unwrap();
        assert!(matches!(parse_footer(&root), Err(SpeError::CorruptFooter(_))));
    }

    #[test]
    fn test_non_numeric_stride() {
        let xml = FOOTER.replace("stride=\"288\"", "stride=\"lots\"");
        let root = parse_xml_tree(&xml).unwrap();
        assert!(matches!(parse_footer(&root), Err(SpeError::CorruptFooter(_))));
    }

    #[test]
    fn test_zero_resolution_rejected() {
        let xml = FOOTER.replace("resolution=\"1000000\"", "resolution=\"0\"");
        let root = parse_xml_tree(&xml).unwrap();
        assert!(matches!(parse_footer(&root), Err(SpeError::CorruptFooter(_))));
    }

    #[test]
    fn test_metadata_must_fit_in_frame() {
        // 3 x 8 bytes of metadata but only 24 - 24 = 0 spare bytes
        let xml = FOOTER.replace("stride=\"288\"", "stride=\"264\"");
        let root = parse_xml_tree(&xml).unwrap();
        assert!(matches!(parse_footer(&root), Err(SpeError::CorruptFooter(_))));
    }

    #[test]
    fn test_wavelength_error_pairs() {
        let values = parse_wavelength_error_list("500.5,0.01 501.5,0.02\n502.5,0.03").unwrap();
        assert_eq!(values, vec![500.5, 501.5, 502.5]);
    }

    #[test]
    fn test_no_optional_sections() {
        let xml = r#"<SpeFormat>
  <DataFormat>
    <DataBlock type="Frame" count="1" pixelFormat="MonochromeFloating32" size="16" stride="16">
      <DataBlock type="Region" width="2" height="2" stride="16" />
    </DataBlock>
  </DataFormat>
</SpeFormat>"#;
        let root = parse_xml_tree(xml).unwrap();
        let footer = parse_footer(&root).unwrap();
        assert!(footer.metadata_fields.is_empty());
        assert_eq!(footer.calibration, Calibration::default());
        assert_eq!(footer.layout.rois[0].x_bin, 1);
    }

    /// One u16 region with no metadata or calibration
    fn minimal_footer(frame_stride: &str, region: &str) -> String {
        format!(
            r#"<SpeFormat>
  <DataFormat>
    <DataBlock type="Frame" count="2" pixelFormat="MonochromeUnsigned16" stride="{frame_stride}">
      <DataBlock type="Region" {region} />
      <DataBlock type="Region" width="2" height="2" stride="8" />
    </DataBlock>
  </DataFormat>
</SpeFormat>"#
        )
    }

    fn assert_corrupt_footer(xml: &str) {
        let root = parse_xml_tree(xml).unwrap();
        match parse_footer(&root) {
            Err(SpeError::CorruptFooter(_)) => {}
            other => panic!("expected CorruptFooter, got {other:?}"),
        }
    }

    #[test]
    fn test_minimal_footer_is_valid() {
        let root = parse_xml_tree(&minimal_footer("48", r#"width="4" height="5" stride="40""#)).unwrap();
        let footer = parse_footer(&root).unwrap();
        assert_eq!(footer.layout.readout_size, 48);
    }

    #[test]
    fn test_oversized_region_rejected() {
        assert_corrupt_footer(&minimal_footer(
            "48",
            r#"width="4294967296" height="4294967296" stride="40""#,
        ));
    }

    #[test]
    fn test_region_bytes_overflow_rejected() {
        // 2^63 pixels fit in u64, their u16 byte count does not
        assert_corrupt_footer(&minimal_footer(
            "48",
            r#"width="2147483648" height="4294967296" stride="40""#,
        ));
    }

    #[test]
    fn test_region_strides_overflow_rejected() {
        assert_corrupt_footer(&minimal_footer(
            "18446744073709551614",
            r#"width="2" height="2" stride="18446744073709551612""#,
        ));
    }

    #[test]
    fn test_zero_frame_stride_rejected() {
        assert_corrupt_footer(&minimal_footer("0", r#"width="4" height="5" stride="40""#));
    }

    #[test]
    fn test_empty_region_rejected() {
        for region in [
            r#"width="0" height="5" stride="40""#,
            r#"width="4" height="0" stride="40""#,
            r#"width="0" height="0" stride="0""#,
        ] {
            assert_corrupt_footer(&minimal_footer("48", region));
        }
    }
}
