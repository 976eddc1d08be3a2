use serde::{Deserialize, Serialize};

/// Default number of steps in a lane (one bar of half-beats)
pub const DEFAULT_STEPS: usize = 16;

/// Note indices are semitone offsets inside a fixed window; index
/// `NOTE_CENTER` plays the instrument's base pitch.
pub const NOTE_RANGE: u8 = 25;
pub const NOTE_CENTER: u8 = 12;

/// One cell in a lane. Read as a single copy so `active` and `note_index`
/// are never observed torn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub active: bool,
    pub note_index: u8,
}

impl Step {
    pub fn off() -> Self {
        Self {
            active: false,
            note_index: NOTE_CENTER,
        }
    }
}

/// One instrument's row of steps
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Lane {
    pub instrument: String,
    steps: Vec<Step>,
}

impl Lane {
    fn new(instrument: &str, step_count: usize) -> Self {
        Self {
            instrument: instrument.to_string(),
            steps: vec![Step::off(); step_count],
        }
    }
}

/// Authoritative step/note state for one grid panel.
///
/// Lane length is fixed for the lifetime of the pattern; changing the step
/// count is a destructive rebuild. Lanes are independent except that they
/// share the step count and step timing.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PatternStore {
    lanes: Vec<Lane>,
    step_count: usize,
}

impl PatternStore {
    pub fn new(instruments: &[&str], step_count: usize) -> Self {
        Self {
            lanes: instruments
                .iter()
                .map(|name| Lane::new(name, step_count))
                .collect(),
            step_count,
        }
    }

    pub fn step_count(&self) -> usize {
        self.step_count
    }

    pub fn lane_count(&self) -> usize {
        self.lanes.len()
    }

    pub fn lane_instrument(&self, lane: usize) -> Option<&str> {
        self.lanes.get(lane).map(|l| l.instrument.as_str())
    }

    /// Read-only snapshot of one step. Out-of-bounds reads return an
    /// inactive step; never panics, never mutates.
    pub fn get_step(&self, lane: usize, index: usize) -> Step {
        self.lanes
            .get(lane)
            .and_then(|l| l.steps.get(index))
            .copied()
            .unwrap_or_else(Step::off)
    }

    /// Flip a step's active state. Returns the new state.
    pub fn toggle_step(&mut self, lane: usize, index: usize) -> bool {
        if let Some(step) = self.lanes.get_mut(lane).and_then(|l| l.steps.get_mut(index)) {
            step.active = !step.active;
            step.active
        } else {
            false
        }
    }

    /// Set a step's note index, clamped to the valid note range
    pub fn set_note(&mut self, lane: usize, index: usize, note_index: u8) {
        if let Some(step) = self.lanes.get_mut(lane).and_then(|l| l.steps.get_mut(index)) {
            step.note_index = note_index.min(NOTE_RANGE - 1);
        }
    }

    pub fn clear_lane(&mut self, lane: usize) {
        if let Some(l) = self.lanes.get_mut(lane) {
            l.steps.fill(Step::off());
        }
    }

    pub fn clear_all(&mut self) {
        for lane in 0..self.lanes.len() {
            self.clear_lane(lane);
        }
    }

    /// Destructive rebuild with a new step count; all steps come back
    /// inactive. Lane instruments are preserved.
    pub fn rebuild(&mut self, step_count: usize) {
        for lane in &mut self.lanes {
            lane.steps = vec![Step::off(); step_count];
        }
        self.step_count = step_count;
    }
}
