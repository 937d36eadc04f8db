use std::cmp::Ordering;

use crate::{config::EnergyConfig, types::HvacMode};

/// Rounds to `decimals` places with halves going to the even neighbour.
/// Only values whose binary representation sits exactly halfway count as
/// halves: 22.25 rounds to 22.2, while 0.15 (stored just below) rounds to 0.1.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    if !value.is_finite() {
        return value;
    }

    let factor = 10f64.powi(decimals);
    let scaled = value * factor;
    if (scaled - scaled.trunc()).abs() != 0.5 {
        return scaled.round() / factor;
    }

    let below = scaled.abs().trunc();
    let magnitude = match halfway_ordering(value, decimals) {
        Some(Ordering::Less) => below,
        Some(Ordering::Greater) => below + 1.0,
        _ if below % 2.0 == 0.0 => below,
        _ => below + 1.0,
    };
    magnitude.copysign(value) / factor
}

/// Compares the exact fractional part of `|value| * 10^decimals` with one
/// half. `None` when the value is out of range for the exact check.
fn halfway_ordering(value: f64, decimals: i32) -> Option<Ordering> {
    let decimals = u32::try_from(decimals).ok().filter(|d| *d <= 18)?;
    let bits = value.abs().to_bits();
    let exponent = ((bits >> 52) & 0x7ff) as i32;
    let fraction = bits & ((1u64 << 52) - 1);
    // |value| == mantissa * 2^-shift
    let (mantissa, shift) = if exponent == 0 {
        (fraction, 1074)
    } else {
        (fraction | (1u64 << 52), 1075 - exponent)
    };
    if !(1..=127).contains(&shift) {
        return None;
    }

    let scaled = u128::from(mantissa) * 10u128.pow(decimals);
    let modulus = 1u128 << shift;
    Some((scaled % modulus).cmp(&(modulus >> 1)))
}

pub fn round_tenth(value: f32) -> f32 {
    round_to(f64::from(value), 1) as f32
}

/// Temperature plus weighted humidity, rounded to one decimal.
pub fn weather_index(temperature_c: f32, humidity: f32, humidity_weight: f64) -> f32 {
    let raw = f64::from(temperature_c) + humidity_weight * f64::from(humidity);
    round_to(raw, 1) as f32
}

/// Three-way threshold decision with no hysteresis. An index exactly on
/// either edge of the band resolves to `Off`.
pub fn hvac_decision(weather_index: f32, desired_c: i32, band_c: f32) -> HvacMode {
    let desired = desired_c as f32;
    if weather_index > desired + band_c {
        HvacMode::Cooling
    } else if weather_index < desired - band_c {
        HvacMode::Heat
    } else {
        HvacMode::Off
    }
}

#[derive(Debug, Clone)]
pub struct EnergyMeter {
    consumption: f64,
    cost: f64,
    config: EnergyConfig,
}

impl EnergyMeter {
    pub fn new(config: EnergyConfig) -> Self {
        Self {
            consumption: 0.0,
            cost: 0.0,
            config,
        }
    }

    pub fn consumption(&self) -> f64 {
        self.consumption
    }

    pub fn cost(&self) -> f64 {
        self.cost
    }

    pub fn increment_for(&self, mode: HvacMode) -> f64 {
        let rate = match mode {
            HvacMode::Cooling => self.config.cooling_rate,
            HvacMode::Heat => self.config.heating_rate,
            HvacMode::Off => 0.0,
        };
        // Consumption must never decrease.
        (rate * self.config.rate_scale).max(0.0)
    }

    /// Adds one tick of consumption for `mode` and reprices the total.
    pub fn accrue(&mut self, mode: HvacMode) -> f64 {
        let increment = self.increment_for(mode);
        self.consumption += increment;
        self.cost = round_to(self.consumption * self.config.cost_per_unit, 2);
        increment
    }
}
