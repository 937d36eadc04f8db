use chrono::{Days, NaiveDate};
use serde::Deserialize;

use crate::{climate::round_tenth, config::WeatherServiceConfig, WeatherError};

#[derive(Debug, Deserialize)]
struct WeatherResponse {
    #[serde(rename = "Data", default)]
    data: Vec<WeatherRecord>,
}

#[derive(Debug, Deserialize)]
struct WeatherRecord {
    #[serde(default)]
    humidity: Option<f64>,
}

/// Extracts the humidity of the first `Data` record, rounded to 0.1.
pub fn parse_humidity(body: &[u8]) -> Result<f32, WeatherError> {
    let response: WeatherResponse = serde_json::from_slice(body)?;
    let first = response.data.first().ok_or(WeatherError::EmptyData)?;
    let humidity = first
        .humidity
        .filter(|value| value.is_finite())
        .ok_or(WeatherError::MissingHumidity)?;
    Ok(round_tenth(humidity as f32))
}

/// Query string for the data endpoint. A fixed date range is used when both
/// ends are configured; otherwise a trailing window ending on `today`.
pub fn query_params(config: &WeatherServiceConfig, today: NaiveDate) -> Vec<(&'static str, String)> {
    let (start, end) = match (config.start_date, config.end_date) {
        (Some(start), Some(end)) => (start, end),
        // A window reaching past the calendar collapses to `today`.
        _ => (
            today
                .checked_sub_days(Days::new(u64::from(config.lookback_days)))
                .unwrap_or(today),
            today,
        ),
    };

    vec![
        ("appKey", config.app_key.clone()),
        ("targets", config.targets.clone()),
        ("startDate", start.format("%Y-%m-%d").to_string()),
        ("endDate", end.format("%Y-%m-%d").to_string()),
        ("dataItems", config.data_items.clone()),
    ]
}
