use crate::engine::ControllerState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayFrame {
    lines: Vec<String>,
}

impl DisplayFrame {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Lines clipped to the panel geometry. Extra rows are dropped and each
    /// line is cut at `columns` characters.
    pub fn fitted(&self, columns: usize, rows: usize) -> Vec<String> {
        self.lines
            .iter()
            .take(rows)
            .map(|line| line.chars().take(columns).collect())
            .collect()
    }
}

pub fn motion_frame(motion_detected: bool) -> DisplayFrame {
    DisplayFrame::new([if motion_detected {
        "LED: ON"
    } else {
        "LED: OFF"
    }])
}

pub fn status_frame(state: &ControllerState) -> DisplayFrame {
    DisplayFrame::new([
        format!("T:{:.1}C H:{:.1}%", state.temperature_c, state.humidity),
        format!(
            "W:{:.1}C D:{}C",
            state.weather_index, state.desired_temperature_c
        ),
    ])
}

pub fn evacuation_frame() -> DisplayFrame {
    DisplayFrame::new(["FIRE ALARM!", "EVACUATE!"])
}
