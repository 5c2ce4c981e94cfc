//! Synthetic SPE files for integration tests
#![allow(dead_code)]

use byteorder::{LittleEndian, WriteBytesExt};
use std::path::{Path, PathBuf};

pub const DATA_OFFSET: usize = 4100;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Deterministic u16 pixel value of element `index` of region `roi` in `frame`
pub fn pixel_value(roi: usize, frame: u64, index: u64) -> u16 {
    ((roi as u64 * 7919 + frame * 131 + index) % 65536) as u16
}

#[derive(Debug, Clone, Copy)]
pub struct RegionSpec {
    pub x: u64,
    pub y: u64,
    /// Post-binning width
    pub width: u64,
    /// Post-binning height
    pub height: u64,
    pub x_bin: u64,
    pub y_bin: u64,
}

impl RegionSpec {
    pub fn new(width: u64, height: u64) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
            x_bin: 1,
            y_bin: 1,
        }
    }

    pub fn stride(&self) -> u64 {
        self.width * self.height * 2
    }
}

#[derive(Debug, Clone)]
pub enum MetaField {
    /// 64-bit tick count, `frame * ticks_per_frame`
    TimeStamp { resolution: u64, ticks_per_frame: i64 },
    /// 64-bit, `frame + 1`
    FrameTrackingNumber,
    /// 64-bit float gate delay, `frame * step`
    GateDelay { step: f64 },
    /// Any other element name, 64-bit zero payload
    Unknown(&'static str),
}

impl MetaField {
    fn xml(&self) -> String {
        match self {
            MetaField::TimeStamp { resolution, .. } => format!(
                r#"<TimeStamp event="ExposureStarted" type="Int64" bitDepth="64" resolution="{resolution}" absoluteTime="2024-03-01T10:00:00.0000000-05:00" />"#
            ),
            MetaField::FrameTrackingNumber => r#"<FrameTrackingNumber type="Int64" bitDepth="64" />"#.to_string(),
            MetaField::GateDelay { .. } => {
                r#"<GateTracking component="Delay" type="Double" bitDepth="64" monotonic="True" />"#.to_string()
            }
            MetaField::Unknown(name) => format!(r#"<{name} type="Int64" bitDepth="64" />"#),
        }
    }

    fn write(&self, out: &mut Vec<u8>, frame: u64) {
        match self {
            MetaField::TimeStamp { ticks_per_frame, .. } => {
                out.write_i64::<LittleEndian>(frame as i64 * ticks_per_frame).unwrap()
            }
            MetaField::FrameTrackingNumber => out.write_i64::<LittleEndian>(frame as i64 + 1).unwrap(),
            MetaField::GateDelay { step } => out.write_f64::<LittleEndian>(frame as f64 * step).unwrap(),
            MetaField::Unknown(_) => out.write_i64::<LittleEndian>(0).unwrap(),
        }
    }
}

/// A v3 file with u16 pixels
#[derive(Debug, Clone)]
pub struct CurrentFixture {
    pub version: f32,
    pub regions: Vec<RegionSpec>,
    pub frames: u64,
    pub meta_fields: Vec<MetaField>,
    /// Emits a `Calibrations` section with one sensor mapping per region
    pub wavelengths: Option<Vec<f64>>,
    /// Appended inside the root element
    pub extra_xml: String,
}

impl CurrentFixture {
    pub fn new(regions: Vec<RegionSpec>, frames: u64) -> Self {
        Self {
            version: 3.0,
            regions,
            frames,
            meta_fields: Vec::new(),
            wavelengths: None,
            extra_xml: String::new(),
        }
    }

    pub fn readout_size(&self) -> u64 {
        self.regions.iter().map(RegionSpec::stride).sum()
    }

    pub fn frame_stride(&self) -> u64 {
        self.readout_size() + 8 * self.meta_fields.len() as u64
    }

    pub fn footer(&self) -> String {
        let mut xml = String::from("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
        xml.push_str("<SpeFormat version=\"3.0\" xmlns=\"http://www.princetoninstruments.com/spe/2009\">\n");
        xml.push_str(&format!(
            "  <DataFormat>\n    <DataBlock type=\"Frame\" count=\"{}\" pixelFormat=\"MonochromeUnsigned16\" size=\"{}\" stride=\"{}\">\n",
            self.frames,
            self.readout_size(),
            self.frame_stride()
        ));
        for region in &self.regions {
            xml.push_str(&format!(
                "      <DataBlock type=\"Region\" count=\"1\" width=\"{}\" height=\"{}\" size=\"{stride}\" stride=\"{stride}\" />\n",
                region.width,
                region.height,
                stride = region.stride()
            ));
        }
        xml.push_str("    </DataBlock>\n  </DataFormat>\n");

        if !self.meta_fields.is_empty() {
            xml.push_str("  <MetaFormat>\n    <MetaBlock type=\"Frame\">\n");
            for field in &self.meta_fields {
                xml.push_str(&format!("      {}\n", field.xml()));
            }
            xml.push_str("    </MetaBlock>\n  </MetaFormat>\n");
        }

        if let Some(curve) = &self.wavelengths {
            let values: Vec<String> = curve.iter().map(|v| v.to_string()).collect();
            xml.push_str("  <Calibrations>\n");
            xml.push_str(&format!(
                "    <WavelengthMapping id=\"1\"><Wavelength xml:space=\"preserve\">{}</Wavelength></WavelengthMapping>\n",
                values.join(",")
            ));
            xml.push_str(&format!(
                "    <SensorInformation id=\"1\" width=\"{}\" height=\"100\" />\n",
                curve.len()
            ));
            for region in &self.regions {
                xml.push_str(&format!(
                    "    <SensorMapping x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" xBinning=\"{}\" yBinning=\"{}\" />\n",
                    region.x,
                    region.y,
                    region.width * region.x_bin,
                    region.height * region.y_bin,
                    region.x_bin,
                    region.y_bin
                ));
            }
            xml.push_str("  </Calibrations>\n");
        }

        xml.push_str(&self.extra_xml);
        xml.push_str("</SpeFormat>\n");
        xml
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = vec![0u8; DATA_OFFSET];
        (&mut bytes[1992..1996]).write_f32::<LittleEndian>(self.version).unwrap();

        for frame in 0..self.frames {
            for (roi, region) in self.regions.iter().enumerate() {
                for index in 0..region.width * region.height {
                    bytes.write_u16::<LittleEndian>(pixel_value(roi, frame, index)).unwrap();
                }
            }
            for field in &self.meta_fields {
                field.write(&mut bytes, frame);
            }
        }

        let footer_offset = bytes.len() as u64;
        (&mut bytes[678..686]).write_u64::<LittleEndian>(footer_offset).unwrap();
        bytes.extend_from_slice(self.footer().as_bytes());
        bytes
    }

    pub fn write(&self, dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, self.to_bytes()).unwrap();
        path
    }

    /// Writes the fixture with its footer passed through `edit`
    pub fn write_edited(&self, dir: &Path, name: &str, edit: impl FnOnce(String) -> String) -> PathBuf {
        let mut bytes = self.to_bytes();
        bytes.truncate(bytes.len() - self.footer().len());
        bytes.extend_from_slice(edit(self.footer()).as_bytes());
        let path = dir.join(name);
        std::fs::write(&path, &bytes).unwrap();
        path
    }
}

/// A 2.x file whose pixels are [`pixel_value`] stored as the element type of
/// `type_code`; unknown codes get u16 pixels
pub fn legacy_bytes(width: u16, height: u16, frames: i32, type_code: i16) -> Vec<u8> {
    let mut bytes = vec![0u8; DATA_OFFSET];
    (&mut bytes[42..44]).write_u16::<LittleEndian>(width).unwrap();
    (&mut bytes[108..110]).write_i16::<LittleEndian>(type_code).unwrap();
    (&mut bytes[656..658]).write_u16::<LittleEndian>(height).unwrap();
    (&mut bytes[1446..1450]).write_i32::<LittleEndian>(frames).unwrap();
    (&mut bytes[1992..1996]).write_f32::<LittleEndian>(2.0).unwrap();

    for frame in 0..frames.max(0) as u64 {
        for index in 0..u64::from(width) * u64::from(height) {
            let value = pixel_value(0, frame, index);
            match type_code {
                0 => bytes.write_f32::<LittleEndian>(f32::from(value)).unwrap(),
                1 => bytes.write_i32::<LittleEndian>(i32::from(value)).unwrap(),
                5 => bytes.write_f64::<LittleEndian>(f64::from(value)).unwrap(),
                8 => bytes.write_u32::<LittleEndian>(u32::from(value)).unwrap(),
                _ => bytes.write_u16::<LittleEndian>(value).unwrap(),
            }
        }
    }
    bytes
}

pub fn write_legacy(dir: &Path, name: &str, width: u16, height: u16, frames: i32) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, legacy_bytes(width, height, frames, 3)).unwrap();
    path
}

/// A `DataHistories` subtree with a handful of camera settings
pub fn settings_xml(adc_speed_relevant: bool) -> String {
    let relevance = if adc_speed_relevant { "" } else { " relevance=\"False\"" };
    format!(
        r#"  <DataHistories>
    <DataHistory>
      <Origin softwareName="LightField" softwareVersion="6.16">
        <Experiment>
          <Devices>
            <Cameras>
              <Camera>
                <ShutterTiming><ExposureTime>100</ExposureTime></ShutterTiming>
                <Adc><Speed{relevance}>4</Speed><AnalogGain>High</AnalogGain><BitDepth>16</BitDepth></Adc>
                <ReadoutControl><Time>12.5</Time><VerticalShiftRate>3.2</VerticalShiftRate><PortsUsed>2</PortsUsed></ReadoutControl>
                <Sensor>
                  <Temperature><Reading>-70</Reading></Temperature>
                  <Information><SensorName>eXcelon3</SensorName><Pixel><Width>13.5</Width></Pixel></Information>
                </Sensor>
              </Camera>
            </Cameras>
          </Devices>
          <System><Cameras><Camera model="PyLoN: 400BR" serialNumber="0123" /></Cameras></System>
        </Experiment>
      </Origin>
    </DataHistory>
  </DataHistories>
"#
    )
}
