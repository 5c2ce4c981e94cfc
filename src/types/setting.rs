//! Acquisition settings extracted from the footer's experiment tree

use serde::{Deserialize, Serialize};
use std::fmt;

/// Physical unit attached to a setting or metadata value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    #[default]
    None,
    Ms,
    Us,
    Ns,
    Um,
    Nm,
    Mhz,
    DegreesCelsius,
    Bits,
}

impl Unit {
    pub fn symbol(self) -> &'static str {
        match self {
            Unit::None => "",
            Unit::Ms => "ms",
            Unit::Us => "µs",
            Unit::Ns => "ns",
            Unit::Um => "µm",
            Unit::Nm => "nm",
            Unit::Mhz => "MHz",
            Unit::DegreesCelsius => "°C",
            Unit::Bits => "bits",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Declared type of a setting value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingType {
    Int64,
    Float64,
    Text,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl SettingValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SettingValue::Int(value) => Some(*value as f64),
            SettingValue::Float(value) => Some(*value),
            SettingValue::Text(_) => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SettingValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SettingValue::Text(value) => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingValue::Int(value) => write!(f, "{value}"),
            SettingValue::Float(value) => write!(f, "{value}"),
            SettingValue::Text(value) => f.write_str(value),
        }
    }
}

/// A (name, value, type, unit) snapshot of one acquisition setting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentSetting {
    pub name: String,
    pub value: SettingValue,
    pub setting_type: SettingType,
    pub unit: Unit,
}

impl fmt::Display for ExperimentSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.unit {
            Unit::None => write!(f, "{}: {}", self.name, self.value),
            unit => write!(f, "{}: {} {}", self.name, self.value, unit),
        }
    }
}
