use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HvacMode {
    Off,
    #[serde(rename = "AC")]
    Cooling,
    Heat,
}

impl HvacMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Off => "OFF",
            Self::Cooling => "AC",
            Self::Heat => "HEAT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OpeningStatus {
    Open,
    Closed,
}

impl OpeningStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Closed => "CLOSED",
        }
    }
}

/// The three indicator lines. Each has a normal meaning and is strobed
/// together with the others during an evacuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Indicator {
    /// Green: motion present.
    Motion,
    /// Red: heating.
    Heat,
    /// Blue: cooling.
    Cooling,
}

impl Indicator {
    pub const ALL: [Indicator; 3] = [Indicator::Motion, Indicator::Heat, Indicator::Cooling];
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClimateReading {
    pub temperature_c: f32,
    pub humidity: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ControllerStatus {
    #[serde(rename = "temperature")]
    pub temperature_c: f32,
    pub humidity: f32,
    #[serde(rename = "desiredTemperature")]
    pub desired_temperature_c: i32,
    #[serde(rename = "weatherIndex")]
    pub weather_index: f32,
    #[serde(rename = "hvacStatus")]
    pub hvac: &'static str,
    #[serde(rename = "doorStatus")]
    pub door: &'static str,
    #[serde(rename = "windowStatus")]
    pub window: &'static str,
    #[serde(rename = "energyConsumption")]
    pub energy_consumption: f64,
    #[serde(rename = "energyCost")]
    pub energy_cost: f64,
    #[serde(rename = "fireAlarmActive")]
    pub fire_alarm_active: bool,
    #[serde(rename = "fireThreshold")]
    pub fire_threshold_c: i32,
    #[serde(rename = "motionDetected")]
    pub motion_detected: bool,
}
