use std::{
    sync::OnceLock,
    time::{Duration, Instant},
};

use bms_common::{
    ControllerEngine, DisplayConfig, EngineAction, Intent, RuntimeConfig, Sample,
};
use tokio::{
    sync::mpsc,
    time::{self, MissedTickBehavior},
};
use tracing::{debug, info, warn};

use crate::{
    ports::{ClimateSensor, HumiditySource, Indicators, MotionSensor, TextDisplay},
    sensors::RetryingClimateSensor,
};

pub struct Hardware<M, C, I, D> {
    pub motion: M,
    pub climate: C,
    pub indicators: I,
    pub display: D,
}

/// The control loop. It is the only owner of the engine, so every state
/// change (including button intents) happens on this task.
pub struct Controller<M, C, I, D, W> {
    engine: ControllerEngine,
    motion: M,
    climate: RetryingClimateSensor<C>,
    indicators: I,
    display: D,
    weather: W,
    display_config: DisplayConfig,
}

impl<M, C, I, D, W> Controller<M, C, I, D, W>
where
    M: MotionSensor,
    C: ClimateSensor,
    I: Indicators,
    D: TextDisplay,
    W: HumiditySource,
{
    pub fn new(runtime: &RuntimeConfig, hardware: Hardware<M, C, I, D>, weather: W) -> Self {
        Self {
            engine: ControllerEngine::new(runtime.controller.clone()),
            motion: hardware.motion,
            climate: RetryingClimateSensor::new(hardware.climate, &runtime.sensor),
            indicators: hardware.indicators,
            display: hardware.display,
            weather,
            display_config: runtime.display.clone(),
        }
    }

    pub fn engine(&self) -> &ControllerEngine {
        &self.engine
    }

    pub async fn run(&mut self, intents: &mut mpsc::Receiver<Intent>) {
        let mut ticker =
            time::interval(Duration::from_millis(self.engine.config.tick_ms));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => self.step(monotonic_ms()).await,
                Some(intent) = intents.recv() => self.handle_intent(intent),
            }
        }
    }

    pub fn handle_intent(&mut self, intent: Intent) {
        let changed = self.engine.apply_intent(intent);
        match intent {
            Intent::AdjustTarget(_) if changed => info!(
                desired = self.engine.state().desired_temperature_c,
                "target temperature adjusted"
            ),
            Intent::AdjustTarget(_) => {}
            Intent::Acknowledge => debug!("sensor button acknowledged"),
        }
    }

    pub async fn step(&mut self, now_ms: u64) {
        let was_evacuating = self.engine.is_evacuating();
        let mut actions = self.engine.tick(now_ms);

        match self.engine.due_sample(now_ms) {
            Some(Sample::Motion) => {
                let detected = self.motion.motion_detected().unwrap_or_else(|err| {
                    warn!("motion read failed: {err:#}");
                    false
                });
                actions.extend(self.engine.record_motion(detected, now_ms));
            }
            Some(Sample::Climate) => {
                let previous_mode = self.engine.state().hvac;
                let started = time::Instant::now();
                let local = self.climate.read().await;
                let remote = self.weather.fetch_humidity().await;
                // Deadlines set by this step start after the slow reads.
                let completed_ms = now_ms.saturating_add(elapsed_ms(started));
                actions.extend(self.engine.record_climate(local, remote, completed_ms));

                let state = self.engine.state();
                if state.hvac != previous_mode {
                    info!(
                        "hvac {} -> {} (index {:.1}, desired {})",
                        previous_mode.as_str(),
                        state.hvac.as_str(),
                        state.weather_index,
                        state.desired_temperature_c
                    );
                }
                match serde_json::to_string(&self.engine.status()) {
                    Ok(status) => debug!(%status, "climate step"),
                    Err(err) => warn!("status serialization failed: {err}"),
                }
            }
            None => {}
        }

        self.execute(actions);

        let evacuating = self.engine.is_evacuating();
        if evacuating && !was_evacuating {
            warn!(
                index = self.engine.state().weather_index,
                threshold = self.engine.state().fire_threshold_c,
                "fire alarm triggered, starting evacuation"
            );
        } else if was_evacuating && !evacuating {
            info!("evacuation sequence complete");
        }
    }

    /// Returns every output to its idle state. Called on the shutdown path.
    pub fn release(&mut self) {
        if let Err(err) = self.indicators.release() {
            warn!("failed to release indicators: {err:#}");
        }
        if let Err(err) = self.display.clear() {
            warn!("failed to clear display: {err:#}");
        }
    }

    fn execute(&mut self, actions: Vec<EngineAction>) {
        for action in actions {
            let result = match &action {
                EngineAction::SetIndicator(indicator, on) => self.indicators.set(*indicator, *on),
                EngineAction::Show(frame) => self.display.show(
                    &frame.fitted(self.display_config.columns, self.display_config.rows),
                ),
            };
            if let Err(err) = result {
                warn!("engine action {action:?} failed: {err:#}");
            }
        }
    }
}

/// Runs the controller until Ctrl-C or SIGTERM, then releases the outputs.
pub async fn serve<M, C, I, D, W>(
    runtime: RuntimeConfig,
    hardware: Hardware<M, C, I, D>,
    weather: W,
    mut intents: mpsc::Receiver<Intent>,
) -> anyhow::Result<()>
where
    M: MotionSensor,
    C: ClimateSensor,
    I: Indicators,
    D: TextDisplay,
    W: HumiditySource,
{
    let mut controller = Controller::new(&runtime, hardware, weather);
    info!(
        tick_ms = runtime.controller.tick_ms,
        desired = controller.engine().state().desired_temperature_c,
        threshold = controller.engine().state().fire_threshold_c,
        "controller loop started"
    );

    let outcome = tokio::select! {
        _ = controller.run(&mut intents) => Ok(()),
        signal = shutdown_signal() => signal,
    };

    info!("shutting down, releasing outputs");
    controller.release();
    outcome
}

/// Hands an intent to the control loop without blocking. Safe to call from
/// GPIO interrupt threads.
pub fn post_intent(tx: &mpsc::Sender<Intent>, intent: Intent) {
    if let Err(err) = tx.try_send(intent) {
        warn!("dropping {intent:?}: {err}");
    }
}

async fn shutdown_signal() -> anyhow::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate = signal(SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result?,
            _ = terminate.recv() => {}
        }
    }

    #[cfg(not(unix))]
    tokio::signal::ctrl_c().await?;

    Ok(())
}

fn elapsed_ms(since: time::Instant) -> u64 {
    since.elapsed().as_millis().try_into().unwrap_or(u64::MAX)
}

pub fn monotonic_ms() -> u64 {
    static START: OnceLock<Instant> = OnceLock::new();
    START
        .get_or_init(Instant::now)
        .elapsed()
        .as_millis()
        .try_into()
        .unwrap_or(u64::MAX)
}
