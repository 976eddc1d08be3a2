use std::sync::Arc;

use parking_lot::RwLock;

use crate::audio::{AudioClock, PlaybackSink};
use crate::instrument::InstrumentResolver;

use super::pattern::PatternStore;
use super::sync::{Panel, StepSync};

/// How far ahead of the clock the scheduler commits events. Timing
/// accuracy comes from this window plus the engine's own queue, not from
/// the polling cadence.
pub const LOOKAHEAD_SECS: f64 = 0.120;

/// Suggested polling period for `tick`. Anything coarser than the
/// lookahead window risks gaps; anything finer just wastes wakeups.
pub const TICK_MS: u64 = 25;

/// Delay between `start()` and the first scheduled step
pub const START_DELAY_SECS: f64 = 0.05;

/// Steps are half-beats
pub const STEPS_PER_BEAT: u32 = 2;

pub const MIN_BPM: u32 = 40;
pub const MAX_BPM: u32 = 240;

/// The step lattice the toys quantize against: absolute times
/// `epoch + k * step_duration`.
#[derive(Clone, Copy, Debug)]
pub struct GridTiming {
    pub epoch: f64,
    pub step_duration: f64,
}

/// Lookahead scheduler: converts pattern state into sample-accurate
/// trigger events.
///
/// Runs on a coarse polling timer; each `tick` commits every step whose
/// time falls inside the lookahead window to the playback sink at its
/// absolute clock time. The tick may emit zero, one, or several steps -
/// catch-up after a late poll emits exactly the pending steps, in order.
///
/// `current_step` and `next_event_time` are owned exclusively by this
/// struct; nothing else may advance them.
pub struct Scheduler {
    clock: Arc<dyn AudioClock>,
    pattern: Arc<RwLock<PatternStore>>,
    resolver: Arc<InstrumentResolver>,
    sink: Arc<dyn PlaybackSink>,
    sync: StepSync,
    bpm: u32,
    current_step: usize,
    next_event_time: f64,
    epoch: f64,
    playing: bool,
}

impl Scheduler {
    pub fn new(
        clock: Arc<dyn AudioClock>,
        pattern: Arc<RwLock<PatternStore>>,
        resolver: Arc<InstrumentResolver>,
        sink: Arc<dyn PlaybackSink>,
        sync: StepSync,
    ) -> Self {
        Self {
            clock,
            pattern,
            resolver,
            sink,
            sync,
            bpm: 120,
            current_step: 0,
            next_event_time: 0.0,
            epoch: 0.0,
            playing: false,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn bpm(&self) -> u32 {
        self.bpm
    }

    pub fn current_step(&self) -> usize {
        self.current_step
    }

    /// Seconds per step at the current tempo
    pub fn step_duration(&self) -> f64 {
        60.0 / self.bpm as f64 / STEPS_PER_BEAT as f64
    }

    /// Grid lattice for the quantized generators; None while stopped
    pub fn timing(&self) -> Option<GridTiming> {
        if self.playing {
            Some(GridTiming {
                epoch: self.epoch,
                step_duration: self.step_duration(),
            })
        } else {
            None
        }
    }

    /// Clamped to [40, 240]; applies to steps scheduled after the call,
    /// already-committed events keep their absolute times.
    pub fn set_tempo(&mut self, bpm: u32) {
        self.bpm = bpm.clamp(MIN_BPM, MAX_BPM);
    }

    /// Begin playback. Returns false (and stays stopped) when the audio
    /// clock is not running yet. No-op when already playing.
    pub fn start(&mut self) -> bool {
        if self.playing {
            return true;
        }
        if !self.clock.is_running() {
            return false;
        }
        self.epoch = self.clock.now() + START_DELAY_SECS;
        self.next_event_time = self.epoch;
        self.playing = true;
        true
    }

    /// Halt scheduling and rewind to step 0. Idempotent. Voices already
    /// handed to the engine still sound; the hand-off is irrevocable.
    pub fn stop(&mut self) {
        self.playing = false;
        self.current_step = 0;
    }

    /// One poll of the lookahead loop. Commits every step due inside the
    /// window. A non-positive step duration or an empty pattern halts the
    /// scheduler instead of spinning.
    pub fn tick(&mut self) {
        if !self.playing {
            return;
        }

        let step_count = self.pattern.read().step_count();
        if self.step_duration() <= 0.0 || step_count == 0 {
            eprintln!("Scheduler halted: invalid step timing configuration");
            self.stop();
            return;
        }

        let horizon = self.clock.now() + LOOKAHEAD_SECS;
        while self.next_event_time < horizon {
            self.emit_step(self.current_step, self.next_event_time);
            // Recomputed each step so tempo changes land on the next
            // boundary, never retroactively
            self.next_event_time += self.step_duration();
            self.current_step = (self.current_step + 1) % step_count;
        }
    }

    fn emit_step(&self, step: usize, time: f64) {
        let pattern = self.pattern.read();
        for lane in 0..pattern.lane_count() {
            let cell = pattern.get_step(lane, step);
            if !cell.active {
                continue;
            }
            let Some(name) = pattern.lane_instrument(lane) else {
                continue;
            };
            // A failed lookup silences this lane only; sibling lanes in
            // the same step still play
            if let Ok(plan) = self.resolver.resolve(name, cell.note_index) {
                self.sink.play(plan, time);
            }
        }
        drop(pattern);
        self.sync.notify(Panel::Grid, step, time);
    }
}
