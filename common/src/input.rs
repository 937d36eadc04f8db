//! Button edges to intents.
//!
//! Edge callbacks never touch controller state. They run each edge through a
//! per-line [`Debouncer`] and post the resulting [`Intent`] to the control
//! loop, which is the only writer.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputLine {
    Raise,
    Lower,
    Acknowledge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    AdjustTarget(i32),
    Acknowledge,
}

impl InputLine {
    pub fn intent(self) -> Intent {
        match self {
            Self::Raise => Intent::AdjustTarget(1),
            Self::Lower => Intent::AdjustTarget(-1),
            Self::Acknowledge => Intent::Acknowledge,
        }
    }
}

/// Accepts an edge only if `window_ms` has passed since the last accepted
/// edge on the same line.
#[derive(Debug, Clone)]
pub struct Debouncer {
    window_ms: u64,
    last_accepted_ms: Option<u64>,
}

impl Debouncer {
    pub fn new(window_ms: u64) -> Self {
        Self {
            window_ms,
            last_accepted_ms: None,
        }
    }

    pub fn accept(&mut self, at_ms: u64) -> bool {
        let accepted = self
            .last_accepted_ms
            .map(|last| at_ms.saturating_sub(last) >= self.window_ms)
            .unwrap_or(true);
        if accepted {
            self.last_accepted_ms = Some(at_ms);
        }
        accepted
    }
}

/// One debouncer per line, for edge sources that multiplex all buttons.
#[derive(Debug, Clone)]
pub struct EdgeFilter {
    raise: Debouncer,
    lower: Debouncer,
    acknowledge: Debouncer,
}

impl EdgeFilter {
    pub fn new(window_ms: u64) -> Self {
        Self {
            raise: Debouncer::new(window_ms),
            lower: Debouncer::new(window_ms),
            acknowledge: Debouncer::new(window_ms),
        }
    }

    pub fn on_edge(&mut self, line: InputLine, at_ms: u64) -> Option<Intent> {
        let debouncer = match line {
            InputLine::Raise => &mut self.raise,
            InputLine::Lower => &mut self.lower,
            InputLine::Acknowledge => &mut self.acknowledge,
        };
        debouncer.accept(at_ms).then(|| line.intent())
    }
}
