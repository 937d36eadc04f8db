use std::time::Duration;

use bms_common::{ClimateReading, SensorConfig};
use tracing::{debug, error, warn};

use crate::ports::ClimateSensor;

/// Runs each read attempt on the blocking pool and retries with a fixed
/// delay. Gives up with `None` after `retries` attempts, leaving the caller
/// to keep its previous values.
pub struct RetryingClimateSensor<C> {
    sensor: Option<C>,
    retries: u32,
    retry_delay: Duration,
}

impl<C: ClimateSensor> RetryingClimateSensor<C> {
    pub fn new(sensor: C, config: &SensorConfig) -> Self {
        Self {
            sensor: Some(sensor),
            retries: config.retries.max(1),
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        }
    }

    pub async fn read(&mut self) -> Option<ClimateReading> {
        for attempt in 1..=self.retries {
            let Some(mut sensor) = self.sensor.take() else {
                return None;
            };

            let joined = tokio::task::spawn_blocking(move || {
                let result = sensor.read();
                (sensor, result)
            })
            .await;

            let (sensor, result) = match joined {
                Ok(pair) => pair,
                Err(err) => {
                    error!("climate sensor task died, sensor disabled: {err}");
                    return None;
                }
            };
            self.sensor = Some(sensor);

            match result {
                Ok(reading)
                    if reading.temperature_c.is_finite() && reading.humidity.is_finite() =>
                {
                    return Some(reading);
                }
                Ok(reading) => debug!(attempt, ?reading, "discarding non-finite climate reading"),
                Err(err) => debug!(attempt, "climate read failed: {err:#}"),
            }

            if attempt < self.retries {
                tokio::time::sleep(self.retry_delay).await;
            }
        }

        warn!(
            attempts = self.retries,
            "climate sensor unavailable, keeping last reading"
        );
        None
    }

    #[cfg(test)]
    pub fn inner(&self) -> Option<&C> {
        self.sensor.as_ref()
    }
}
