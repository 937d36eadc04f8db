use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid runtime config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Reasons a remote humidity reading is unavailable. The controller treats
/// every variant the same way (fall back to the local reading); the variants
/// only exist so the cause can be logged.
#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("weather service returned HTTP {0}")]
    Status(u16),
    #[error("weather service request failed: {0}")]
    Transport(String),
    #[error("malformed weather payload: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("weather payload has no data records")]
    EmptyData,
    #[error("first weather record has no humidity value")]
    MissingHumidity,
}
