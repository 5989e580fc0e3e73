use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Parses a time of day in `HH:MM` or `HH:MM:SS` form.
pub fn parse_clock(s: &str) -> Option<NaiveTime> {
    let s = s.trim();
    let fmt = if s.matches(':').count() == 2 {
        "%H:%M:%S"
    } else {
        "%H:%M"
    };
    NaiveTime::parse_from_str(s, fmt).ok()
}

/// Inclusive `[start, end]` window of the day mapped to a meal label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "(String, String, String)", into = "(String, String, String)")]
pub struct MealWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub label: String,
}

impl MealWindow {
    pub fn new(start: NaiveTime, end: NaiveTime, label: &str) -> Self {
        MealWindow {
            start,
            end,
            label: label.to_string(),
        }
    }

    /// A window whose end precedes its start contains nothing; wrap-around
    /// spans are expressed as two windows.
    pub fn contains(&self, time: NaiveTime) -> bool {
        self.start <= time && time <= self.end
    }
}

impl fmt::Display for MealWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{} {}",
            self.start.format("%H:%M"),
            self.end.format("%H:%M"),
            self.label
        )
    }
}

impl TryFrom<(String, String, String)> for MealWindow {
    type Error = String;

    fn try_from((start, end, label): (String, String, String)) -> Result<Self, Self::Error> {
        let start = parse_clock(&start).ok_or_else(|| format!("Invalid start time: '{start}'"))?;
        let end = parse_clock(&end).ok_or_else(|| format!("Invalid end time: '{end}'"))?;
        Ok(MealWindow { start, end, label })
    }
}

impl From<MealWindow> for (String, String, String) {
    fn from(w: MealWindow) -> Self {
        (
            w.start.format("%H:%M").to_string(),
            w.end.format("%H:%M").to_string(),
            w.label,
        )
    }
}

pub const BREAKFAST: &str = "早餐";
pub const LUNCH: &str = "午餐";
pub const DINNER: &str = "晚餐";
pub const LATE_SNACK: &str = "夜宵";

/// Ordered meal windows; the first window containing a time wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MealSchedule {
    windows: Vec<MealWindow>,
}

impl Default for MealSchedule {
    fn default() -> Self {
        let hm = |h, m| NaiveTime::from_hms_opt(h, m, 0).unwrap_or_default();
        MealSchedule::new(vec![
            MealWindow::new(hm(6, 0), hm(11, 0), BREAKFAST),
            MealWindow::new(hm(11, 0), hm(14, 0), LUNCH),
            MealWindow::new(hm(17, 0), hm(20, 0), DINNER),
            MealWindow::new(hm(20, 0), hm(23, 59), LATE_SNACK),
            MealWindow::new(hm(0, 0), hm(3, 0), LATE_SNACK),
        ])
    }
}

impl MealSchedule {
    pub fn new(windows: Vec<MealWindow>) -> Self {
        MealSchedule { windows }
    }

    pub fn classify(&self, time: NaiveTime) -> Option<&str> {
        self.windows
            .iter()
            .find(|w| w.contains(time))
            .map(|w| w.label.as_str())
    }

    /// Unparseable input classifies as no period.
    pub fn classify_str(&self, clock: &str) -> Option<&str> {
        parse_clock(clock).and_then(|t| self.classify(t))
    }
}

/// Classifies a clock string against the default schedule.
pub fn classify_time(clock: &str) -> Option<String> {
    MealSchedule::default()
        .classify_str(clock)
        .map(str::to_string)
}
