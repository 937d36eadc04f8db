//! Raspberry Pi back-end: PIR on a GPIO input, DHT11 on a bidirectional GPIO
//! line, three indicator LEDs, an HD44780 LCD behind a PCF8574 I2C expander
//! and three active-low push buttons.

use std::convert::Infallible;

use anyhow::{anyhow, Context};
use bms_common::{
    ClimateReading, Debouncer, DisplayConfig, Indicator, InputLine, Intent, PinConfig,
};
use dht_sensor::dht11;
use embedded_hal::digital::{ErrorType, InputPin as _, OutputPin as _};
use hd44780_driver::{bus::I2CBus, HD44780};
use rppal::{
    gpio::{Gpio, InputPin, IoPin, Mode, OutputPin, PullUpDown, Trigger},
    hal::Delay,
    i2c::I2c,
};
use tokio::sync::mpsc;
use tracing::info;

use crate::{
    config::load_runtime_config,
    ports::{ClimateSensor, Indicators, MotionSensor, TextDisplay},
    runtime::{monotonic_ms, post_intent, serve, Hardware},
    weather::WeatherClient,
};

/// DDRAM address of the first cell of each row.
const ROW_ADDRESSES: [u8; 4] = [0x00, 0x40, 0x14, 0x54];

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let runtime = load_runtime_config();
    let gpio = Gpio::new().context("failed to open GPIO")?;
    let pins = &runtime.pins;

    let (tx, rx) = mpsc::channel(runtime.controller.intent_queue_capacity);
    // Interrupt threads stop when these pins drop.
    let _buttons = attach_buttons(&gpio, pins, runtime.controller.debounce_ms, &tx)?;
    drop(tx);

    let hardware = Hardware {
        motion: PirSensor::new(&gpio, pins.motion)?,
        climate: Dht11Sensor::new(&gpio, pins.dht11)?,
        indicators: LedIndicators::new(&gpio, pins)?,
        display: Lcd::new(&runtime.display)?,
    };
    let weather = WeatherClient::new(runtime.weather.clone())?;

    info!(
        motion = pins.motion,
        dht11 = pins.dht11,
        lcd_address = runtime.display.address,
        "raspberry pi peripherals ready"
    );
    serve(runtime, hardware, weather, rx).await
}

fn attach_buttons(
    gpio: &Gpio,
    pins: &PinConfig,
    debounce_ms: u64,
    tx: &mpsc::Sender<Intent>,
) -> anyhow::Result<Vec<InputPin>> {
    let lines = [
        (pins.button_up, InputLine::Raise, Trigger::FallingEdge),
        (pins.button_down, InputLine::Lower, Trigger::FallingEdge),
        (pins.button_ack, InputLine::Acknowledge, Trigger::Both),
    ];

    let mut attached = Vec::with_capacity(lines.len());
    for (pin, line, trigger) in lines {
        let mut input = gpio
            .get(pin)
            .with_context(|| format!("failed to claim button GPIO{pin}"))?
            .into_input_pullup();
        let mut debouncer = Debouncer::new(debounce_ms);
        let tx = tx.clone();
        input
            .set_async_interrupt(trigger, None, move |_event| {
                if debouncer.accept(monotonic_ms()) {
                    post_intent(&tx, line.intent());
                }
            })
            .with_context(|| format!("failed to watch button GPIO{pin}"))?;
        attached.push(input);
    }
    Ok(attached)
}

struct PirSensor {
    pin: InputPin,
}

impl PirSensor {
    fn new(gpio: &Gpio, pin: u8) -> anyhow::Result<Self> {
        let pin = gpio
            .get(pin)
            .with_context(|| format!("failed to claim PIR GPIO{pin}"))?
            .into_input();
        Ok(Self { pin })
    }
}

impl MotionSensor for PirSensor {
    fn motion_detected(&mut self) -> anyhow::Result<bool> {
        Ok(self.pin.is_high())
    }
}

/// Open-drain emulation for the DHT11 data line: driving low switches the
/// pin to output, releasing it switches back to input and lets the pull-up
/// raise the line.
struct OpenDrainPin {
    pin: IoPin,
}

impl ErrorType for OpenDrainPin {
    type Error = Infallible;
}

impl embedded_hal::digital::InputPin for OpenDrainPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.pin.is_high())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(self.pin.is_low())
    }
}

impl embedded_hal::digital::OutputPin for OpenDrainPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.pin.set_mode(Mode::Output);
        self.pin.set_low();
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.pin.set_mode(Mode::Input);
        Ok(())
    }
}

struct Dht11Sensor {
    pin: OpenDrainPin,
    delay: Delay,
}

impl Dht11Sensor {
    fn new(gpio: &Gpio, pin: u8) -> anyhow::Result<Self> {
        let mut io = gpio
            .get(pin)
            .with_context(|| format!("failed to claim DHT11 GPIO{pin}"))?
            .into_io(Mode::Input);
        io.set_pullupdown(PullUpDown::PullUp);

        Ok(Self {
            pin: OpenDrainPin { pin: io },
            delay: Delay::new(),
        })
    }
}

impl ClimateSensor for Dht11Sensor {
    fn read(&mut self) -> anyhow::Result<ClimateReading> {
        self.pin.set_high()?;
        let reading = dht11::blocking::read(&mut self.delay, &mut self.pin)
            .map_err(|err| anyhow!("DHT11 read failed: {err:?}"))?;

        Ok(ClimateReading {
            temperature_c: f32::from(reading.temperature),
            humidity: f32::from(reading.relative_humidity),
        })
    }
}

/// Green follows motion, red is heat, blue is cooling. Pins are driven low
/// again when dropped.
struct LedIndicators {
    green: OutputPin,
    red: OutputPin,
    blue: OutputPin,
}

impl LedIndicators {
    fn new(gpio: &Gpio, pins: &PinConfig) -> anyhow::Result<Self> {
        let output = |pin: u8| -> anyhow::Result<OutputPin> {
            Ok(gpio
                .get(pin)
                .with_context(|| format!("failed to claim LED GPIO{pin}"))?
                .into_output_low())
        };

        Ok(Self {
            green: output(pins.led_green)?,
            red: output(pins.led_red)?,
            blue: output(pins.led_blue)?,
        })
    }
}

impl Indicators for LedIndicators {
    fn set(&mut self, indicator: Indicator, on: bool) -> anyhow::Result<()> {
        let pin = match indicator {
            Indicator::Motion => &mut self.green,
            Indicator::Heat => &mut self.red,
            Indicator::Cooling => &mut self.blue,
        };
        if on {
            pin.set_high();
        } else {
            pin.set_low();
        }
        Ok(())
    }
}

struct Lcd {
    driver: HD44780<I2CBus<I2c>>,
    delay: Delay,
    rows: usize,
}

impl Lcd {
    fn new(config: &DisplayConfig) -> anyhow::Result<Self> {
        let i2c = I2c::with_bus(config.i2c_bus)
            .with_context(|| format!("failed to open I2C bus {}", config.i2c_bus))?;
        let mut delay = Delay::new();
        let mut driver = HD44780::new_i2c(i2c, config.address, &mut delay)
            .map_err(|err| anyhow!("failed to initialize LCD at {:#04x}: {err:?}", config.address))?;
        driver
            .reset(&mut delay)
            .map_err(|err| anyhow!("LCD reset failed: {err:?}"))?;

        Ok(Self {
            driver,
            delay,
            rows: config.rows.min(ROW_ADDRESSES.len()),
        })
    }
}

impl TextDisplay for Lcd {
    fn show(&mut self, lines: &[String]) -> anyhow::Result<()> {
        self.clear()?;
        for (address, line) in ROW_ADDRESSES.iter().zip(lines).take(self.rows) {
            self.driver
                .set_cursor_pos(*address, &mut self.delay)
                .map_err(|err| anyhow!("LCD cursor move failed: {err:?}"))?;
            self.driver
                .write_str(line, &mut self.delay)
                .map_err(|err| anyhow!("LCD write failed: {err:?}"))?;
        }
        Ok(())
    }

    fn clear(&mut self) -> anyhow::Result<()> {
        self.driver
            .clear(&mut self.delay)
            .map_err(|err| anyhow!("LCD clear failed: {err:?}"))
    }
}
