use std::time::Duration;

use anyhow::Context;
use bms_common::{
    weather::{parse_humidity, query_params},
    WeatherError, WeatherServiceConfig,
};
use reqwest::StatusCode;
use tracing::{debug, warn};

use crate::ports::HumiditySource;

pub struct WeatherClient {
    http: reqwest::Client,
    config: WeatherServiceConfig,
    enabled: bool,
}

impl WeatherClient {
    pub fn new(config: WeatherServiceConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .context("failed to build weather service client")?;

        let enabled = config.enabled && !config.app_key.is_empty();
        if config.enabled && !enabled {
            warn!("no weather service app key configured, remote humidity disabled");
        }

        Ok(Self {
            http,
            config,
            enabled,
        })
    }

    async fn fetch(&self) -> Result<f32, WeatherError> {
        let today = chrono::Local::now().date_naive();
        let response = self
            .http
            .get(&self.config.base_url)
            .query(&query_params(&self.config, today))
            .send()
            .await
            .map_err(|err| WeatherError::Transport(err.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(WeatherError::Status(status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| WeatherError::Transport(err.to_string()))?;
        parse_humidity(&body)
    }
}

impl HumiditySource for WeatherClient {
    async fn fetch_humidity(&self) -> Option<f32> {
        if !self.enabled {
            return None;
        }

        match self.fetch().await {
            Ok(humidity) => {
                debug!(humidity, "remote humidity");
                Some(humidity)
            }
            Err(err) => {
                warn!("remote humidity unavailable, using local sensor: {err}");
                None
            }
        }
    }
}
