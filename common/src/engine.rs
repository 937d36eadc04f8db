use crate::{
    alarm::{AlarmStep, FireAlarm},
    climate::{hvac_decision, round_tenth, weather_index, EnergyMeter},
    config::ControllerConfig,
    display::{evacuation_frame, motion_frame, status_frame, DisplayFrame},
    input::Intent,
    types::{ClimateReading, ControllerStatus, HvacMode, Indicator, OpeningStatus},
};

#[derive(Debug, Clone, PartialEq)]
pub enum EngineAction {
    SetIndicator(Indicator, bool),
    Show(DisplayFrame),
}

/// What the loop should sample next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sample {
    Motion,
    Climate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CyclePhase {
    AwaitMotion,
    Dwell { climate_due_ms: u64 },
}

#[derive(Debug, Clone)]
pub struct ControllerState {
    pub temperature_c: f32,
    pub humidity: f32,
    pub desired_temperature_c: i32,
    pub weather_index: f32,
    pub hvac: HvacMode,
    pub door: OpeningStatus,
    pub window: OpeningStatus,
    pub energy: EnergyMeter,
    pub fire_alarm_active: bool,
    pub fire_threshold_c: i32,
}

/// Owns the canonical [`ControllerState`]. Every mutation goes through this
/// type and comes back as a list of [`EngineAction`]s for the caller to
/// execute against hardware.
#[derive(Debug, Clone)]
pub struct ControllerEngine {
    pub config: ControllerConfig,
    state: ControllerState,
    alarm: FireAlarm,
    cycle: CyclePhase,
    motion_detected: bool,
}

impl ControllerEngine {
    pub fn new(config: ControllerConfig) -> Self {
        let alarm = FireAlarm::new(config.alarm.clone());
        let state = ControllerState {
            temperature_c: 0.0,
            humidity: 0.0,
            desired_temperature_c: config.initial_desired_temp_c,
            weather_index: 0.0,
            hvac: HvacMode::Off,
            door: OpeningStatus::Closed,
            window: OpeningStatus::Closed,
            energy: EnergyMeter::new(config.energy.clone()),
            fire_alarm_active: false,
            fire_threshold_c: alarm.threshold_c(),
        };

        Self {
            config,
            state,
            alarm,
            cycle: CyclePhase::AwaitMotion,
            motion_detected: false,
        }
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    pub fn is_evacuating(&self) -> bool {
        self.alarm.is_active()
    }

    /// Sensors are not sampled while an evacuation is running.
    pub fn due_sample(&self, now_ms: u64) -> Option<Sample> {
        if self.alarm.is_active() {
            return None;
        }

        match self.cycle {
            CyclePhase::AwaitMotion => Some(Sample::Motion),
            CyclePhase::Dwell { climate_due_ms } if now_ms >= climate_due_ms => {
                Some(Sample::Climate)
            }
            CyclePhase::Dwell { .. } => None,
        }
    }

    pub fn record_motion(&mut self, detected: bool, now_ms: u64) -> Vec<EngineAction> {
        self.motion_detected = detected;

        let dwell_ms = if detected {
            self.config.motion_dwell_ms
        } else {
            self.config.idle_dwell_ms
        };
        self.cycle = CyclePhase::Dwell {
            climate_due_ms: now_ms.saturating_add(dwell_ms),
        };

        vec![
            EngineAction::SetIndicator(Indicator::Motion, detected),
            EngineAction::Show(motion_frame(detected)),
        ]
    }

    /// One climate step. `local` is `None` when the sensor gave up; the last
    /// good values are then reused. `remote_humidity` replaces the local
    /// humidity whenever it is present.
    pub fn record_climate(
        &mut self,
        local: Option<ClimateReading>,
        remote_humidity: Option<f32>,
        now_ms: u64,
    ) -> Vec<EngineAction> {
        let mut actions = Vec::new();

        if let Some(reading) = local {
            self.state.temperature_c = round_tenth(reading.temperature_c);
            self.state.humidity = round_tenth(reading.humidity);
        }
        if let Some(humidity) = remote_humidity {
            self.state.humidity = round_tenth(humidity);
        }

        self.state.weather_index = weather_index(
            self.state.temperature_c,
            self.state.humidity,
            self.config.humidity_weight,
        );
        self.update_hvac(&mut actions);
        self.state.energy.accrue(self.state.hvac);
        actions.push(EngineAction::Show(status_frame(&self.state)));

        self.cycle = CyclePhase::AwaitMotion;

        if self.alarm.should_trigger(self.state.weather_index) {
            let steps = self.alarm.trigger(now_ms);
            self.apply_alarm_steps(steps, &mut actions);
        }

        actions
    }

    /// Returns true when the intent changed state.
    pub fn apply_intent(&mut self, intent: Intent) -> bool {
        match intent {
            Intent::AdjustTarget(delta) => {
                // No comfort bounds: the target moves as far as the buttons take it.
                let next = self.state.desired_temperature_c.saturating_add(delta);
                let changed = next != self.state.desired_temperature_c;
                self.state.desired_temperature_c = next;
                changed
            }
            Intent::Acknowledge => false,
        }
    }

    /// Advances time-driven work (the evacuation sequence).
    pub fn tick(&mut self, now_ms: u64) -> Vec<EngineAction> {
        let mut actions = Vec::new();
        let steps = self.alarm.advance(now_ms);
        self.apply_alarm_steps(steps, &mut actions);
        actions
    }

    pub fn status(&self) -> ControllerStatus {
        ControllerStatus {
            temperature_c: self.state.temperature_c,
            humidity: self.state.humidity,
            desired_temperature_c: self.state.desired_temperature_c,
            weather_index: self.state.weather_index,
            hvac: self.state.hvac.as_str(),
            door: self.state.door.as_str(),
            window: self.state.window.as_str(),
            energy_consumption: self.state.energy.consumption(),
            energy_cost: self.state.energy.cost(),
            fire_alarm_active: self.state.fire_alarm_active,
            fire_threshold_c: self.state.fire_threshold_c,
            motion_detected: self.motion_detected,
        }
    }

    fn update_hvac(&mut self, actions: &mut Vec<EngineAction>) {
        let mode = hvac_decision(
            self.state.weather_index,
            self.state.desired_temperature_c,
            self.config.comfort_band_c,
        );
        self.state.hvac = mode;
        actions.push(EngineAction::SetIndicator(
            Indicator::Cooling,
            mode == HvacMode::Cooling,
        ));
        actions.push(EngineAction::SetIndicator(
            Indicator::Heat,
            mode == HvacMode::Heat,
        ));
    }

    fn apply_alarm_steps(&mut self, steps: Vec<AlarmStep>, actions: &mut Vec<EngineAction>) {
        for step in steps {
            match step {
                AlarmStep::Announce => actions.push(EngineAction::Show(evacuation_frame())),
                AlarmStep::SecureBuilding => {
                    self.state.door = OpeningStatus::Open;
                    self.state.window = OpeningStatus::Open;
                    self.state.hvac = HvacMode::Off;
                }
                AlarmStep::Strobe(on) => {
                    actions.extend(
                        Indicator::ALL
                            .iter()
                            .map(|indicator| EngineAction::SetIndicator(*indicator, on)),
                    );
                }
                AlarmStep::Cleared => {
                    actions.push(EngineAction::SetIndicator(Indicator::Motion, false));
                }
            }
        }

        self.state.fire_alarm_active = self.alarm.is_active();
        self.state.fire_threshold_c = self.alarm.threshold_c();
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn reading(temperature_c: f32, humidity: f32) -> Option<ClimateReading> {
        Some(ClimateReading {
            temperature_c,
            humidity,
        })
    }

    fn engine_with_threshold_out_of_reach() -> ControllerEngine {
        let mut config = ControllerConfig::default();
        config.alarm.initial_threshold_c = 1_000;
        ControllerEngine::new(config)
    }

    #[test]
    fn cycle_alternates_motion_and_climate() {
        let mut engine = engine_with_threshold_out_of_reach();
        assert_eq!(engine.due_sample(0), Some(Sample::Motion));

        let actions = engine.record_motion(true, 0);
        assert_eq!(
            actions,
            vec![
                EngineAction::SetIndicator(Indicator::Motion, true),
                EngineAction::Show(motion_frame(true)),
            ]
        );
        assert_eq!(engine.due_sample(9_999), None);
        assert_eq!(engine.due_sample(10_000), Some(Sample::Climate));

        let _ = engine.record_climate(reading(22.0, 40.0), None, 10_000);
        assert_eq!(engine.due_sample(10_000), Some(Sample::Motion));

        let _ = engine.record_motion(false, 10_250);
        assert_eq!(engine.due_sample(15_249), None);
        assert_eq!(engine.due_sample(15_250), Some(Sample::Climate));
    }

    #[test]
    fn hot_reading_turns_on_cooling() {
        let mut engine = engine_with_threshold_out_of_reach();
        let _ = engine.record_motion(false, 0);

        let actions = engine.record_climate(reading(32.0, 40.0), None, 5_000);

        assert_eq!(engine.state().weather_index, 34.0);
        assert_eq!(engine.state().hvac, HvacMode::Cooling);
        assert!((engine.state().energy.consumption() - 0.018).abs() < 1e-12);
        assert_eq!(
            actions,
            vec![
                EngineAction::SetIndicator(Indicator::Cooling, true),
                EngineAction::SetIndicator(Indicator::Heat, false),
                EngineAction::Show(DisplayFrame::new(["T:32.0C H:40.0%", "W:34.0C D:29C"])),
            ]
        );
    }

    #[test]
    fn cold_reading_turns_on_heat() {
        let mut engine = engine_with_threshold_out_of_reach();
        let actions = engine.record_climate(reading(18.0, 20.0), None, 0);

        assert_eq!(engine.state().weather_index, 19.0);
        assert_eq!(engine.state().hvac, HvacMode::Heat);
        assert!((engine.state().energy.consumption() - 0.036).abs() < 1e-12);
        assert!(actions.contains(&EngineAction::SetIndicator(Indicator::Heat, true)));
        assert!(actions.contains(&EngineAction::SetIndicator(Indicator::Cooling, false)));
    }

    #[test]
    fn remote_humidity_overrides_local() {
        let mut engine = engine_with_threshold_out_of_reach();
        let _ = engine.record_climate(reading(30.0, 40.0), Some(55.0), 0);

        assert_eq!(engine.state().humidity, 55.0);
        assert_eq!(engine.state().weather_index, 32.8);
    }

    #[test]
    fn failed_read_keeps_stale_values() {
        let mut engine = engine_with_threshold_out_of_reach();
        let _ = engine.record_climate(reading(27.3, 61.0), None, 0);
        let _ = engine.record_climate(None, None, 5_000);

        assert_eq!(engine.state().temperature_c, 27.3);
        assert_eq!(engine.state().humidity, 61.0);

        let _ = engine.record_climate(None, Some(10.0), 10_000);
        assert_eq!(engine.state().temperature_c, 27.3);
        assert_eq!(engine.state().humidity, 10.0);
    }

    #[test]
    fn energy_cost_follows_each_step() {
        let mut engine = engine_with_threshold_out_of_reach();
        for step in 0..50u64 {
            let _ = engine.record_climate(reading(40.0, 0.0), None, step * 5_000);
            let energy = &engine.state().energy;
            assert_eq!(
                energy.cost(),
                crate::climate::round_to(energy.consumption() * 0.5, 2)
            );
        }
        assert!((engine.state().energy.consumption() - 0.9).abs() < 1e-9);
    }

    #[test]
    fn target_adjustment_is_unbounded() {
        let mut engine = engine_with_threshold_out_of_reach();
        for _ in 0..100 {
            assert!(engine.apply_intent(Intent::AdjustTarget(1)));
        }
        assert_eq!(engine.state().desired_temperature_c, 129);

        for _ in 0..200 {
            engine.apply_intent(Intent::AdjustTarget(-1));
        }
        assert_eq!(engine.state().desired_temperature_c, -71);
        assert!(!engine.apply_intent(Intent::Acknowledge));
        assert_eq!(engine.state().desired_temperature_c, -71);
    }

    #[test]
    fn target_change_feeds_next_decision() {
        let mut engine = engine_with_threshold_out_of_reach();
        let _ = engine.record_climate(reading(32.0, 40.0), None, 0);
        assert_eq!(engine.state().hvac, HvacMode::Cooling);

        for _ in 0..2 {
            engine.apply_intent(Intent::AdjustTarget(1));
        }
        let _ = engine.record_climate(None, None, 5_000);
        assert_eq!(engine.state().hvac, HvacMode::Off);
    }

    #[test]
    fn alarm_triggers_above_threshold_and_ratchets() {
        let mut engine = ControllerEngine::new(ControllerConfig::default());
        let actions = engine.record_climate(reading(22.0, 10.0), None, 1_000);

        assert!(engine.is_evacuating());
        assert!(engine.state().fire_alarm_active);
        assert_eq!(engine.state().fire_threshold_c, 35);
        assert_eq!(
            actions.last(),
            Some(&EngineAction::Show(evacuation_frame()))
        );
        assert_eq!(engine.due_sample(2_000), None);
    }

    #[test]
    fn evacuation_forces_openings_and_hvac_off() {
        let mut engine = ControllerEngine::new(ControllerConfig::default());
        let _ = engine.record_climate(reading(45.0, 50.0), None, 0);
        assert_eq!(engine.state().hvac, HvacMode::Cooling);
        assert_eq!(engine.state().door, OpeningStatus::Closed);

        let actions = engine.tick(3_000);

        assert_eq!(engine.state().door, OpeningStatus::Open);
        assert_eq!(engine.state().window, OpeningStatus::Open);
        assert_eq!(engine.state().hvac, HvacMode::Off);
        assert_eq!(
            actions,
            vec![
                EngineAction::SetIndicator(Indicator::Motion, true),
                EngineAction::SetIndicator(Indicator::Heat, true),
                EngineAction::SetIndicator(Indicator::Cooling, true),
            ]
        );
    }

    #[test]
    fn evacuation_turns_heating_off_too() {
        let mut engine = ControllerEngine::new(ControllerConfig::default());
        let _ = engine.record_climate(reading(22.0, 0.0), None, 0);
        assert_eq!(engine.state().hvac, HvacMode::Heat);
        assert!(engine.is_evacuating());

        let _ = engine.tick(2_999);
        assert_eq!(engine.state().hvac, HvacMode::Heat);

        let _ = engine.tick(3_000);
        assert_eq!(engine.state().hvac, HvacMode::Off);
        assert_eq!(engine.status().hvac, "OFF");
        assert_eq!(engine.state().door, OpeningStatus::Open);
    }

    #[test]
    fn evacuation_completes_and_resumes_sampling() {
        let mut engine = ControllerEngine::new(ControllerConfig::default());
        let _ = engine.record_motion(true, 0);
        let _ = engine.record_climate(reading(25.0, 10.0), None, 10_000);

        let mut now = 10_000;
        let mut last = Vec::new();
        while engine.is_evacuating() {
            now += 250;
            assert_eq!(engine.due_sample(now), None);
            let actions = engine.tick(now);
            if !actions.is_empty() {
                last = actions;
            }
        }

        assert_eq!(now, 33_000);
        assert_eq!(
            last,
            vec![EngineAction::SetIndicator(Indicator::Motion, false)]
        );
        assert!(!engine.state().fire_alarm_active);
        assert_eq!(engine.state().fire_threshold_c, 35);
        assert_eq!(engine.due_sample(now), Some(Sample::Motion));

        // 25.5 is below the raised threshold, so no second evacuation.
        let _ = engine.record_climate(None, None, now + 5_000);
        assert!(!engine.is_evacuating());
    }

    #[test]
    fn doors_stay_open_after_evacuation() {
        let mut engine = ControllerEngine::new(ControllerConfig::default());
        let _ = engine.record_climate(reading(25.0, 0.0), None, 0);
        let _ = engine.tick(60_000);

        assert!(!engine.is_evacuating());
        assert_eq!(engine.state().door, OpeningStatus::Open);
        assert_eq!(engine.state().window, OpeningStatus::Open);
    }

    #[test]
    fn status_snapshot_reflects_state() {
        let mut engine = engine_with_threshold_out_of_reach();
        let _ = engine.record_motion(true, 0);
        let _ = engine.record_climate(reading(32.0, 40.0), None, 10_000);

        let status = engine.status();
        assert_eq!(status.hvac, "AC");
        assert_eq!(status.door, "CLOSED");
        assert_eq!(status.weather_index, 34.0);
        assert_eq!(status.fire_threshold_c, 1_000);
        assert!(status.motion_detected);

        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["hvacStatus"], "AC");
        assert_eq!(json["desiredTemperature"], 29);
    }
}
