use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub tick_ms: u64,
    pub motion_dwell_ms: u64,
    pub idle_dwell_ms: u64,
    pub initial_desired_temp_c: i32,
    pub comfort_band_c: f32,
    pub humidity_weight: f64,
    pub debounce_ms: u64,
    pub intent_queue_capacity: usize,
    pub energy: EnergyConfig,
    pub alarm: AlarmConfig,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            tick_ms: 250,
            motion_dwell_ms: 10_000,
            idle_dwell_ms: 5_000,
            initial_desired_temp_c: 29,
            comfort_band_c: 3.0,
            humidity_weight: 0.05,
            debounce_ms: 200,
            intent_queue_capacity: 16,
            energy: EnergyConfig::default(),
            alarm: AlarmConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnergyConfig {
    pub cooling_rate: f64,
    pub heating_rate: f64,
    pub rate_scale: f64,
    pub cost_per_unit: f64,
}

impl Default for EnergyConfig {
    fn default() -> Self {
        Self {
            cooling_rate: 18.0,
            heating_rate: 36.0,
            rate_scale: 0.001,
            cost_per_unit: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlarmConfig {
    pub initial_threshold_c: i32,
    pub raised_threshold_c: i32,
    pub announce_ms: u64,
    pub strobe_cycles: u8,
    pub strobe_interval_ms: u64,
}

impl Default for AlarmConfig {
    fn default() -> Self {
        Self {
            initial_threshold_c: 20,
            raised_threshold_c: 35,
            announce_ms: 3_000,
            strobe_cycles: 10,
            strobe_interval_ms: 1_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    pub retries: u32,
    pub retry_delay_ms: u64,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            retries: 15,
            retry_delay_ms: 2_000,
        }
    }
}

/// BCM pin numbers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PinConfig {
    pub motion: u8,
    pub led_green: u8,
    pub led_red: u8,
    pub led_blue: u8,
    pub button_up: u8,
    pub button_down: u8,
    pub button_ack: u8,
    pub dht11: u8,
}

impl Default for PinConfig {
    fn default() -> Self {
        Self {
            motion: 18,
            led_green: 23,
            led_red: 24,
            led_blue: 25,
            button_up: 17,
            button_down: 27,
            button_ack: 22,
            dht11: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DisplayConfig {
    pub i2c_bus: u8,
    pub address: u8,
    pub columns: usize,
    pub rows: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            i2c_bus: 1,
            address: 0x3f,
            columns: 16,
            rows: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherServiceConfig {
    pub enabled: bool,
    pub base_url: String,
    pub app_key: String,
    pub targets: String,
    pub data_items: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub lookback_days: u32,
    pub timeout_ms: u64,
}

impl Default for WeatherServiceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "http://et.water.ca.gov/api/data".to_string(),
            app_key: String::new(),
            targets: "71".to_string(),
            data_items: "humidity".to_string(),
            start_date: NaiveDate::from_ymd_opt(2023, 5, 1),
            end_date: NaiveDate::from_ymd_opt(2023, 5, 29),
            lookback_days: 28,
            timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub controller: ControllerConfig,
    pub sensor: SensorConfig,
    pub pins: PinConfig,
    pub display: DisplayConfig,
    pub weather: WeatherServiceConfig,
}

impl RuntimeConfig {
    pub fn from_json(raw: &[u8]) -> Result<Self, crate::ConfigError> {
        let mut config: Self = serde_json::from_slice(raw)?;
        config.sanitize();
        Ok(config)
    }

    /// Repairs timing values that would stall or spin the loop. The desired
    /// temperature is never bounded.
    pub fn sanitize(&mut self) {
        let controller = &mut self.controller;
        controller.tick_ms = controller.tick_ms.clamp(10, 10_000);
        controller.intent_queue_capacity = controller.intent_queue_capacity.max(1);
        controller.alarm.strobe_interval_ms = controller.alarm.strobe_interval_ms.max(1);
        if !controller.humidity_weight.is_finite() {
            controller.humidity_weight = ControllerConfig::default().humidity_weight;
        }
        if !controller.comfort_band_c.is_finite() || controller.comfort_band_c < 0.0 {
            controller.comfort_band_c = ControllerConfig::default().comfort_band_c;
        }

        self.sensor.retries = self.sensor.retries.max(1);
        self.display.columns = self.display.columns.max(1);
        self.display.rows = self.display.rows.max(1);
    }
}
