//! Experiment settings lookup over the flattened footer tree.
//!
//! Each [`SettingRule`] names a slash-delimited path from the footer root
//! (lowercase, root element excluded) and optionally an attribute of the
//! element at that path. One pass over [`XmlNode::flatten`] emits a setting
//! for every relevant node matched by a rule, in document order.

use super::xml_tree::XmlNode;
use crate::types::{ExperimentSetting, SettingType, SettingValue, Unit};
use bon::Builder;
use log::warn;
use serde::{Deserialize, Serialize};

/// Maps a footer path (and optional attribute) to a named, typed setting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Builder)]
pub struct SettingRule {
    #[builder(into)]
    pub name: String,
    #[builder(into)]
    pub path: String,
    /// Read this attribute instead of the element text
    #[serde(default)]
    #[builder(into)]
    pub attribute: Option<String>,
    pub value_type: SettingType,
    #[serde(default)]
    #[builder(default)]
    pub unit: Unit,
}

macro_rules! camera {
    ($tail:literal) => {
        concat!("datahistories/datahistory/origin/experiment/devices/cameras/camera/", $tail)
    };
}

macro_rules! spectrometer {
    ($tail:literal) => {
        concat!("datahistories/datahistory/origin/experiment/devices/spectrometers/spectrometer/", $tail)
    };
}

macro_rules! system {
    ($tail:literal) => {
        concat!("datahistories/datahistory/origin/experiment/system/", $tail)
    };
}

type RuleRow = (&'static str, &'static str, Option<&'static str>, SettingType, Unit);

const BUILTIN_RULES: &[RuleRow] = &[
    ("EXPOSURE_TIME", camera!("shuttertiming/exposuretime"), None, SettingType::Float64, Unit::Ms),
    ("SHUTTER_MODE", camera!("shuttertiming/mode"), None, SettingType::Text, Unit::None),
    ("ADC_SPEED", camera!("adc/speed"), None, SettingType::Float64, Unit::Mhz),
    ("ADC_ANALOG_GAIN", camera!("adc/analoggain"), None, SettingType::Text, Unit::None),
    ("ADC_EM_GAIN", camera!("adc/emgain"), None, SettingType::Int64, Unit::None),
    ("ADC_QUALITY", camera!("adc/quality"), None, SettingType::Text, Unit::None),
    ("BIT_DEPTH", camera!("adc/bitdepth"), None, SettingType::Int64, Unit::Bits),
    ("READOUT_MODE", camera!("readoutcontrol/mode"), None, SettingType::Text, Unit::None),
    ("READOUT_TIME", camera!("readoutcontrol/time"), None, SettingType::Float64, Unit::Ms),
    ("VERTICAL_SHIFT_RATE", camera!("readoutcontrol/verticalshiftrate"), None, SettingType::Float64, Unit::Us),
    ("STORAGE_SHIFT_RATE", camera!("readoutcontrol/storageshiftrate"), None, SettingType::Float64, Unit::Us),
    ("PORTS_USED", camera!("readoutcontrol/portsused"), None, SettingType::Int64, Unit::None),
    ("ACCUMULATIONS", camera!("readoutcontrol/accumulations"), None, SettingType::Int64, Unit::None),
    ("SENSOR_TEMPERATURE", camera!("sensor/temperature/reading"), None, SettingType::Float64, Unit::DegreesCelsius),
    ("SENSOR_TEMPERATURE_STATUS", camera!("sensor/temperature/status"), None, SettingType::Text, Unit::None),
    ("SENSOR_INFORMATION", camera!("sensor/information/sensorname"), None, SettingType::Text, Unit::None),
    ("PIXEL_PITCH", camera!("sensor/information/pixel/width"), None, SettingType::Float64, Unit::Um),
    ("FRAME_RATE", camera!("shuttertiming/framerate"), None, SettingType::Float64, Unit::None),
    ("INTENSIFIER_GAIN", camera!("intensifier/gain"), None, SettingType::Int64, Unit::None),
    ("GATING_MODE", camera!("gating/mode"), None, SettingType::Text, Unit::None),
    ("REPETITIVE_GATE_WIDTH", camera!("gating/repetitivegate/pulse"), Some("width"), SettingType::Float64, Unit::Ns),
    ("REPETITIVE_GATE_DELAY", camera!("gating/repetitivegate/pulse"), Some("delay"), SettingType::Float64, Unit::Ns),
    ("SEQUENTIAL_STARTING_GATE_WIDTH", camera!("gating/sequential/startinggate/pulse"), Some("width"), SettingType::Float64, Unit::Ns),
    ("SEQUENTIAL_STARTING_GATE_DELAY", camera!("gating/sequential/startinggate/pulse"), Some("delay"), SettingType::Float64, Unit::Ns),
    ("SEQUENTIAL_ENDING_GATE_WIDTH", camera!("gating/sequential/endinggate/pulse"), Some("width"), SettingType::Float64, Unit::Ns),
    ("SEQUENTIAL_ENDING_GATE_DELAY", camera!("gating/sequential/endinggate/pulse"), Some("delay"), SettingType::Float64, Unit::Ns),
    ("GRATING", spectrometer!("grating/selected"), None, SettingType::Text, Unit::None),
    ("CENTER_WAVELENGTH", spectrometer!("grating/centerwavelength"), None, SettingType::Float64, Unit::Nm),
    ("CAMERA_MODEL", system!("cameras/camera"), Some("model"), SettingType::Text, Unit::None),
    ("SERIAL_NUMBER", system!("cameras/camera"), Some("serialNumber"), SettingType::Text, Unit::None),
    ("SPECTROMETER_MODEL", system!("spectrometers/spectrometer"), Some("model"), SettingType::Text, Unit::None),
    ("SPECTROMETER_SERIAL_NUMBER", system!("spectrometers/spectrometer"), Some("serialNumber"), SettingType::Text, Unit::None),
    ("SOFTWARE_VERSION", "datahistories/datahistory/origin", Some("softwareVersion"), SettingType::Text, Unit::None),
];

/// The settings recognized in every file
pub fn builtin_rules() -> Vec<SettingRule> {
    BUILTIN_RULES
        .iter()
        .map(|&(name, path, attribute, value_type, unit)| SettingRule {
            name: name.to_string(),
            path: path.to_string(),
            attribute: attribute.map(str::to_string),
            value_type,
            unit,
        })
        .collect()
}

fn parse_value(raw: &str, value_type: SettingType) -> Option<SettingValue> {
    let raw = raw.trim();
    match value_type {
        SettingType::Int64 => raw.parse::<i64>().ok().map(SettingValue::Int),
        SettingType::Float64 => raw.parse::<f64>().ok().map(SettingValue::Float),
        SettingType::Text if raw.is_empty() => None,
        SettingType::Text => Some(SettingValue::Text(raw.to_string())),
    }
}

fn apply_rule(rule: &SettingRule, node: &XmlNode) -> Option<ExperimentSetting> {
    let raw = match &rule.attribute {
        Some(attribute) => node.attr(attribute)?,
        None => node.text.as_str(),
    };
    let Some(value) = parse_value(raw, rule.value_type) else {
        if !raw.trim().is_empty() {
            warn!("setting {} has unparseable value '{raw}', skipping", rule.name);
        }
        return None;
    };
    Some(ExperimentSetting {
        name: rule.name.clone(),
        value,
        setting_type: rule.value_type,
        unit: rule.unit,
    })
}

/// Every setting matched by `rules`, in the order found in the tree.
///
/// Nodes that are (or sit below) an element marked `relevance="False"` are
/// skipped. Settings with several matches are reported once per match.
pub fn extract_settings(root: &XmlNode, rules: &[SettingRule]) -> Vec<ExperimentSetting> {
    root.flatten()
        .into_iter()
        .filter(|flat| flat.relevant)
        .flat_map(|flat| {
            rules
                .iter()
                .filter(|rule| rule.path.eq_ignore_ascii_case(&flat.path))
                .filter_map(|rule| apply_rule(rule, flat.node))
                .collect::<Vec<_>>()
        })
        .collect()
}
