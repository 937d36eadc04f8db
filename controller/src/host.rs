//! Development back-end: simulated sensors, indicators and LCD rendered to the
//! log, and buttons driven from stdin (`+`, `-`, `a`).

use anyhow::anyhow;
use bms_common::{ClimateReading, EdgeFilter, Indicator, InputLine};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc,
};
use tracing::{debug, info, warn};

use crate::{
    config::load_runtime_config,
    ports::{ClimateSensor, Indicators, MotionSensor, TextDisplay},
    runtime::{monotonic_ms, post_intent, serve, Hardware},
    weather::WeatherClient,
};

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let runtime = load_runtime_config();
    let (tx, rx) = mpsc::channel(runtime.controller.intent_queue_capacity);
    spawn_stdin_buttons(tx, runtime.controller.debounce_ms);

    let hardware = Hardware {
        motion: SimulatedMotion::default(),
        climate: SimulatedClimate::default(),
        indicators: LogIndicators::default(),
        display: LogDisplay::default(),
    };
    let weather = WeatherClient::new(runtime.weather.clone())?;

    info!("simulated controller started; type +, - or a and press enter for buttons");
    serve(runtime, hardware, weather, rx).await
}

fn spawn_stdin_buttons(tx: mpsc::Sender<bms_common::Intent>, debounce_ms: u64) {
    tokio::spawn(async move {
        let mut filter = EdgeFilter::new(debounce_ms);
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(err) => {
                    warn!("stdin read failed, buttons disabled: {err}");
                    break;
                }
            };

            for key in line.trim().chars() {
                let input = match key {
                    '+' | 'u' => InputLine::Raise,
                    '-' | 'd' => InputLine::Lower,
                    'a' => InputLine::Acknowledge,
                    _ => continue,
                };
                if let Some(intent) = filter.on_edge(input, monotonic_ms()) {
                    post_intent(&tx, intent);
                }
            }
        }
    });
}

#[derive(Default)]
struct SimulatedMotion {
    samples: u64,
}

impl MotionSensor for SimulatedMotion {
    fn motion_detected(&mut self) -> anyhow::Result<bool> {
        self.samples = self.samples.wrapping_add(1);
        Ok(self.samples % 3 == 0)
    }
}

/// Slow sawtooth around the comfort band that fails every seventh read, so
/// retries and stale values show up in the log.
#[derive(Default)]
struct SimulatedClimate {
    reads: u64,
}

impl ClimateSensor for SimulatedClimate {
    fn read(&mut self) -> anyhow::Result<ClimateReading> {
        self.reads = self.reads.wrapping_add(1);
        if self.reads % 7 == 0 {
            return Err(anyhow!("simulated DHT11 timeout"));
        }

        Ok(ClimateReading {
            temperature_c: 14.0 + (self.reads % 16) as f32 * 0.5,
            humidity: 35.0 + (self.reads % 6) as f32 * 2.5,
        })
    }
}

#[derive(Default)]
struct LogIndicators {
    lit: [bool; 3],
}

impl Indicators for LogIndicators {
    fn set(&mut self, indicator: Indicator, on: bool) -> anyhow::Result<()> {
        let slot = match indicator {
            Indicator::Motion => 0,
            Indicator::Heat => 1,
            Indicator::Cooling => 2,
        };
        if self.lit[slot] != on {
            self.lit[slot] = on;
            debug!(?indicator, on, "indicator");
        }
        Ok(())
    }
}

#[derive(Default)]
struct LogDisplay {
    lines: Vec<String>,
}

impl TextDisplay for LogDisplay {
    fn show(&mut self, lines: &[String]) -> anyhow::Result<()> {
        if self.lines != lines {
            self.lines = lines.to_vec();
            info!("lcd | {}", self.lines.join(" | "));
        }
        Ok(())
    }

    fn clear(&mut self) -> anyhow::Result<()> {
        self.lines.clear();
        info!("lcd cleared");
        Ok(())
    }
}
