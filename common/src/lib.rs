pub mod alarm;
pub mod climate;
pub mod config;
pub mod display;
pub mod engine;
pub mod error;
pub mod input;
pub mod types;
pub mod weather;

pub use alarm::{AlarmStep, FireAlarm};
pub use config::{
    AlarmConfig, ControllerConfig, DisplayConfig, EnergyConfig, PinConfig, RuntimeConfig,
    SensorConfig, WeatherServiceConfig,
};
pub use display::DisplayFrame;
pub use engine::{ControllerEngine, ControllerState, EngineAction, Sample};
pub use error::{ConfigError, WeatherError};
pub use input::{Debouncer, EdgeFilter, InputLine, Intent};
pub use types::{ClimateReading, ControllerStatus, HvacMode, Indicator, OpeningStatus};
