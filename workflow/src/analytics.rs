use serde::Deserialize;
use serde::Serialize;
use std::fmt;

/// Replay counters for one flow. Slots are 0-based and sized to the flow's
/// capacity; counters only ever grow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analytics {
    times_started: u64,
    times_completed: u64,
    skips: Vec<u64>,
    errors: Vec<u64>,
}

impl Analytics {
    pub fn new(capacity: usize) -> Self {
        Self {
            times_started: 0,
            times_completed: 0,
            skips: vec![0; capacity],
            errors: vec![0; capacity],
        }
    }

    pub fn capacity(&self) -> usize {
        self.skips.len()
    }

    pub fn times_started(&self) -> u64 {
        self.times_started
    }

    pub fn times_completed(&self) -> u64 {
        self.times_completed
    }

    pub fn skips(&self, slot: usize) -> u64 {
        self.skips.get(slot).copied().unwrap_or_default()
    }

    pub fn errors(&self, slot: usize) -> u64 {
        self.errors.get(slot).copied().unwrap_or_default()
    }

    pub fn on_start(&mut self) {
        self.times_started += 1;
    }

    pub fn on_complete(&mut self) {
        self.times_completed += 1;
    }

    pub fn on_skip(&mut self, slot: usize) {
        if let Some(count) = self.skips.get_mut(slot) {
            *count += 1;
        }
    }

    pub fn on_error(&mut self, slot: usize) {
        if let Some(count) = self.errors.get_mut(slot) {
            *count += 1;
        }
    }

    pub fn report(&self) -> AnalyticsReport {
        let slots = self
            .skips
            .iter()
            .zip(&self.errors)
            .enumerate()
            .map(|(index, (skips, errors))| SlotCounts {
                step: index + 1,
                skips: *skips,
                errors: *errors,
            })
            .collect();
        AnalyticsReport {
            times_started: self.times_started,
            times_completed: self.times_completed,
            slots,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalyticsReport {
    pub times_started: u64,
    pub times_completed: u64,
    pub slots: Vec<SlotCounts>,
}

/// Counters for one slot; `step` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotCounts {
    pub step: usize,
    pub skips: u64,
    pub errors: u64,
}

impl fmt::Display for AnalyticsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Times started: {}", self.times_started)?;
        writeln!(f, "Times completed: {}", self.times_completed)?;
        writeln!(f, "Skip counts:")?;
        for slot in &self.slots {
            writeln!(f, "  Step {}: {}", slot.step, slot.skips)?;
        }
        writeln!(f, "Error counts:")?;
        for slot in &self.slots {
            writeln!(f, "  Step {}: {}", slot.step, slot.errors)?;
        }
        Ok(())
    }
}
