//! Fire-alarm escalation.
//!
//! The evacuation sequence is a timed state machine advanced by the control
//! loop's tick rather than a blocking call:
//!
//! ```text
//! Normal ──(index > threshold)──▶ Announcing ──(announce_ms)──▶ Strobing ──(N cycles)──▶ Normal
//! ```
//!
//! Triggering raises the threshold to `raised_threshold_c` and it is never
//! lowered again.

use crate::config::AlarmConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmPhase {
    Normal,
    Announcing {
        until_ms: u64,
    },
    Strobing {
        completed_cycles: u8,
        lit: bool,
        next_ms: u64,
    },
}

/// Side effects the engine has to carry out, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmStep {
    Announce,
    /// Force door and window open, HVAC off.
    SecureBuilding,
    Strobe(bool),
    Cleared,
}

#[derive(Debug, Clone)]
pub struct FireAlarm {
    config: AlarmConfig,
    threshold_c: i32,
    phase: AlarmPhase,
}

impl FireAlarm {
    pub fn new(config: AlarmConfig) -> Self {
        Self {
            threshold_c: config.initial_threshold_c,
            config,
            phase: AlarmPhase::Normal,
        }
    }

    pub fn threshold_c(&self) -> i32 {
        self.threshold_c
    }

    pub fn phase(&self) -> AlarmPhase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        self.phase != AlarmPhase::Normal
    }

    pub fn should_trigger(&self, weather_index: f32) -> bool {
        !self.is_active() && weather_index > self.threshold_c as f32
    }

    pub fn trigger(&mut self, now_ms: u64) -> Vec<AlarmStep> {
        if self.is_active() {
            return Vec::new();
        }

        self.threshold_c = self.config.raised_threshold_c;
        self.phase = AlarmPhase::Announcing {
            until_ms: now_ms.saturating_add(self.config.announce_ms),
        };
        vec![AlarmStep::Announce]
    }

    /// Emits every step that has come due by `now_ms`. Steps are scheduled
    /// from the previous deadline, not from `now_ms`, so a late tick catches
    /// up without stretching the sequence.
    pub fn advance(&mut self, now_ms: u64) -> Vec<AlarmStep> {
        let mut steps = Vec::new();
        let interval = self.config.strobe_interval_ms.max(1);

        loop {
            match self.phase {
                AlarmPhase::Normal => break,
                AlarmPhase::Announcing { until_ms } => {
                    if now_ms < until_ms {
                        break;
                    }
                    steps.push(AlarmStep::SecureBuilding);
                    if self.config.strobe_cycles == 0 {
                        steps.push(AlarmStep::Cleared);
                        self.phase = AlarmPhase::Normal;
                        break;
                    }
                    steps.push(AlarmStep::Strobe(true));
                    self.phase = AlarmPhase::Strobing {
                        completed_cycles: 0,
                        lit: true,
                        next_ms: until_ms.saturating_add(interval),
                    };
                }
                AlarmPhase::Strobing {
                    completed_cycles,
                    lit,
                    next_ms,
                } => {
                    if now_ms < next_ms {
                        break;
                    }
                    let following = next_ms.saturating_add(interval);
                    if lit {
                        steps.push(AlarmStep::Strobe(false));
                        self.phase = AlarmPhase::Strobing {
                            completed_cycles: completed_cycles.saturating_add(1),
                            lit: false,
                            next_ms: following,
                        };
                    } else if completed_cycles >= self.config.strobe_cycles {
                        steps.push(AlarmStep::Cleared);
                        self.phase = AlarmPhase::Normal;
                    } else {
                        steps.push(AlarmStep::Strobe(true));
                        self.phase = AlarmPhase::Strobing {
                            completed_cycles,
                            lit: true,
                            next_ms: following,
                        };
                    }
                }
            }
        }

        steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strobe_counts(steps: &[AlarmStep]) -> (usize, usize) {
        let on = steps.iter().filter(|s| **s == AlarmStep::Strobe(true)).count();
        let off = steps.iter().filter(|s| **s == AlarmStep::Strobe(false)).count();
        (on, off)
    }

    #[test]
    fn triggers_only_above_threshold() {
        let alarm = FireAlarm::new(AlarmConfig::default());
        assert!(!alarm.should_trigger(20.0));
        assert!(alarm.should_trigger(20.1));
    }

    #[test]
    fn threshold_ratchets_and_stays_raised() {
        let mut alarm = FireAlarm::new(AlarmConfig::default());
        assert_eq!(alarm.trigger(0), vec![AlarmStep::Announce]);
        assert_eq!(alarm.threshold_c(), 35);

        let _ = alarm.advance(60_000);
        assert!(!alarm.is_active());
        assert_eq!(alarm.threshold_c(), 35);
        assert!(!alarm.should_trigger(30.0));
        assert!(alarm.should_trigger(35.5));

        let _ = alarm.trigger(61_000);
        assert_eq!(alarm.threshold_c(), 35);
    }

    #[test]
    fn announce_pause_precedes_securing() {
        let mut alarm = FireAlarm::new(AlarmConfig::default());
        let _ = alarm.trigger(1_000);

        assert!(alarm.advance(3_999).is_empty());
        assert_eq!(
            alarm.advance(4_000),
            vec![AlarmStep::SecureBuilding, AlarmStep::Strobe(true)]
        );
    }

    #[test]
    fn full_sequence_strobes_ten_cycles_then_clears() {
        let mut alarm = FireAlarm::new(AlarmConfig::default());
        let _ = alarm.trigger(0);
        let mut steps = Vec::new();

        let mut now = 0;
        while alarm.is_active() {
            now += 250;
            steps.extend(alarm.advance(now));
        }

        assert_eq!(strobe_counts(&steps), (10, 10));
        assert_eq!(steps.first(), Some(&AlarmStep::SecureBuilding));
        assert_eq!(steps.last(), Some(&AlarmStep::Cleared));
        // 3 s announce + 10 × (1 s on + 1 s off)
        assert_eq!(now, 23_000);
    }

    #[test]
    fn late_tick_catches_up_in_order() {
        let mut alarm = FireAlarm::new(AlarmConfig::default());
        let _ = alarm.trigger(0);

        let steps = alarm.advance(6_500);
        assert_eq!(
            steps,
            vec![
                AlarmStep::SecureBuilding,
                AlarmStep::Strobe(true),
                AlarmStep::Strobe(false),
                AlarmStep::Strobe(true),
                AlarmStep::Strobe(false),
            ]
        );

        let rest = alarm.advance(u64::MAX / 2);
        assert_eq!(rest.last(), Some(&AlarmStep::Cleared));
        assert!(!alarm.is_active());
    }

    #[test]
    fn retrigger_while_active_is_ignored() {
        let mut alarm = FireAlarm::new(AlarmConfig::default());
        let _ = alarm.trigger(0);
        assert!(alarm.trigger(100).is_empty());
        assert!(!alarm.should_trigger(99.0));
    }

    #[test]
    fn zero_cycles_secures_and_clears() {
        let config = AlarmConfig {
            strobe_cycles: 0,
            ..AlarmConfig::default()
        };
        let mut alarm = FireAlarm::new(config);
        let _ = alarm.trigger(0);

        assert_eq!(
            alarm.advance(3_000),
            vec![AlarmStep::SecureBuilding, AlarmStep::Cleared]
        );
        assert_eq!(alarm.phase(), AlarmPhase::Normal);
    }
}
