//! Hardware capabilities the control loop depends on. Each back-end (host
//! simulation, Raspberry Pi) supplies one implementation of each.

use bms_common::{ClimateReading, Indicator};

pub trait MotionSensor {
    fn motion_detected(&mut self) -> anyhow::Result<bool>;
}

/// A single blocking read attempt. Retries are layered on top by
/// [`crate::sensors::RetryingClimateSensor`].
pub trait ClimateSensor: Send + 'static {
    fn read(&mut self) -> anyhow::Result<ClimateReading>;
}

pub trait Indicators {
    fn set(&mut self, indicator: Indicator, on: bool) -> anyhow::Result<()>;

    fn release(&mut self) -> anyhow::Result<()> {
        for indicator in Indicator::ALL {
            self.set(indicator, false)?;
        }
        Ok(())
    }
}

pub trait TextDisplay {
    /// Clears the panel and writes `lines` from the top row down.
    fn show(&mut self, lines: &[String]) -> anyhow::Result<()>;

    fn clear(&mut self) -> anyhow::Result<()>;
}

pub trait HumiditySource {
    /// `None` whenever the remote value is unavailable for any reason.
    async fn fetch_humidity(&self) -> Option<f32>;
}

