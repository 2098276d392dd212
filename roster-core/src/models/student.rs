use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Points deducted from the daily grade per behavior or instruction mark.
pub const MARK_PENALTY: u32 = 5;

/// Verses owed per dot (or per behavior mark in behavior mode).
pub const VERSES_PER_MARK: u32 = 10;

/// Which counters a deployment tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackingMode {
    /// A single dot counter per student.
    #[default]
    Dots,
    /// Daily behavior/instruction marks with weekly accumulators.
    Behavior,
}

impl fmt::Display for TrackingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackingMode::Dots => write!(f, "dots"),
            TrackingMode::Behavior => write!(f, "behavior"),
        }
    }
}

impl std::str::FromStr for TrackingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dots" => Ok(TrackingMode::Dots),
            "behavior" => Ok(TrackingMode::Behavior),
            _ => Err(format!("Invalid tracking mode: {}", s)),
        }
    }
}

/// Counters that `adjust_counter` may change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterField {
    Dots,
    BehaviorMarks,
    InstructionMarks,
}

impl fmt::Display for CounterField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CounterField::Dots => write!(f, "dots"),
            CounterField::BehaviorMarks => write!(f, "behavior"),
            CounterField::InstructionMarks => write!(f, "instruction"),
        }
    }
}

/// Boolean flags that `toggle_flag` may flip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagField {
    Warn,
}

/// One student within one class.
///
/// Every counter is always present; fields missing from stored JSON, or
/// stored as `null`, default to zero. Fields this version does not know about are kept in `extra` so
/// they survive a load/save cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRecord {
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub dots: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub behavior_marks: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub instruction_marks: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub weekly_behavior: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub weekly_instruction: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub days_tracked: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_score: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub warn: bool,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Reads `null` as the type's default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl StudentRecord {
    /// Creates a record with every counter zeroed and `warn` cleared.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dots: 0,
            behavior_marks: 0,
            instruction_marks: 0,
            weekly_behavior: 0,
            weekly_instruction: 0,
            days_tracked: 0,
            total_score: 0,
            warn: false,
            extra: serde_json::Map::new(),
        }
    }

    pub fn counter(&self, field: CounterField) -> u32 {
        match field {
            CounterField::Dots => self.dots,
            CounterField::BehaviorMarks => self.behavior_marks,
            CounterField::InstructionMarks => self.instruction_marks,
        }
    }

    fn counter_mut(&mut self, field: CounterField) -> &mut u32 {
        match field {
            CounterField::Dots => &mut self.dots,
            CounterField::BehaviorMarks => &mut self.behavior_marks,
            CounterField::InstructionMarks => &mut self.instruction_marks,
        }
    }

    /// Applies `delta` to a counter, clamping at zero.
    pub fn adjust(&mut self, field: CounterField, delta: i64) {
        let slot = self.counter_mut(field);
        let next = (*slot as i64).saturating_add(delta).max(0);
        *slot = u32::try_from(next).unwrap_or(u32::MAX);
    }

    pub fn toggle(&mut self, flag: FlagField) {
        match flag {
            FlagField::Warn => self.warn = !self.warn,
        }
    }

    /// Today's grade: 100 minus five points per mark, never below zero.
    pub fn daily_grade(&self) -> u32 {
        let penalty = MARK_PENALTY
            .saturating_mul(self.behavior_marks)
            .saturating_add(MARK_PENALTY.saturating_mul(self.instruction_marks));
        100u32.saturating_sub(penalty)
    }

    pub fn verses_owed(&self, mode: TrackingMode) -> u32 {
        let marks = match mode {
            TrackingMode::Dots => self.dots,
            TrackingMode::Behavior => self.behavior_marks,
        };
        marks.saturating_mul(VERSES_PER_MARK)
    }

    /// Average daily grade since the last week reset.
    pub fn weekly_average(&self) -> Option<f64> {
        if self.days_tracked == 0 {
            return None;
        }
        Some(self.total_score as f64 / self.days_tracked as f64)
    }

    /// Folds today's marks into the weekly accumulators and clears the day.
    pub fn end_day(&mut self) {
        self.weekly_behavior = self.weekly_behavior.saturating_add(self.behavior_marks);
        self.weekly_instruction = self
            .weekly_instruction
            .saturating_add(self.instruction_marks);
        self.total_score = self.total_score.saturating_add(self.daily_grade());
        self.days_tracked = self.days_tracked.saturating_add(1);
        self.behavior_marks = 0;
        self.instruction_marks = 0;
        self.warn = false;
    }

    pub fn reset_week(&mut self) {
        self.weekly_behavior = 0;
        self.weekly_instruction = 0;
        self.days_tracked = 0;
        self.total_score = 0;
    }

    /// Case-insensitive name comparison used for uniqueness checks.
    pub fn name_matches(&self, candidate: &str) -> bool {
        self.name.to_lowercase() == candidate.to_lowercase()
    }
}
