use crate::audio::PlaybackSink;
use crate::instrument::InstrumentResolver;
use crate::sequencer::{GridTiming, Panel, StepSync, LOOKAHEAD_SECS};

use super::quantize_up;

/// A note target sitting on the unit board
#[derive(Clone, Debug)]
pub struct Target {
    pub instrument: String,
    pub note_index: u8,
    pub x: f32,
    pub y: f32,
}

impl Target {
    pub fn new(instrument: &str, note_index: u8, x: f32, y: f32) -> Self {
        Self {
            instrument: instrument.to_string(),
            note_index,
            x: x.clamp(0.0, 1.0),
            y: y.clamp(0.0, 1.0),
        }
    }
}

/// Distance from a point to the farthest corner of the unit board. The
/// wave speed is chosen so one full traversal covers this distance in
/// exactly one loop.
pub fn corner_distance(x: f32, y: f32) -> f32 {
    let corners = [(0.0f32, 0.0f32), (1.0, 0.0), (0.0, 1.0), (1.0, 1.0)];
    corners
        .iter()
        .map(|(cx, cy)| ((cx - x).powi(2) + (cy - y).powi(2)).sqrt())
        .fold(0.0, f32::max)
}

/// Distance to step-offset quantization: round up to the nearest whole
/// step so a target never fires before the wave actually reaches it.
pub fn phase_for(distance: f32, d_max: f32, steps_per_loop: u32) -> u32 {
    if d_max <= 0.0 || steps_per_loop == 0 {
        return 0;
    }
    let step_distance = d_max / steps_per_loop as f32;
    let phase = (distance / step_distance).ceil().max(0.0) as u32;
    phase.min(steps_per_loop - 1)
}

/// A radial wave generator: every loop, a ripple expands from the origin
/// and fires each target at a step offset derived from its distance.
pub struct Rippler {
    origin: (f32, f32),
    targets: Vec<Target>,
    steps_per_loop: u32,
    /// Step offsets per target, recomputed on reset
    phases: Vec<u32>,
    /// Target indices in firing order (ascending phase)
    order: Vec<usize>,
    cursor: usize,
    loop_start: Option<f64>,
}

impl Rippler {
    pub fn new(origin: (f32, f32), targets: Vec<Target>, steps_per_loop: u32) -> Self {
        Self {
            origin: (origin.0.clamp(0.0, 1.0), origin.1.clamp(0.0, 1.0)),
            targets,
            steps_per_loop: steps_per_loop.max(1),
            phases: Vec::new(),
            order: Vec::new(),
            cursor: 0,
            loop_start: None,
        }
    }

    pub fn phases(&self) -> &[u32] {
        &self.phases
    }

    pub fn is_armed(&self) -> bool {
        self.loop_start.is_some()
    }

    pub fn move_origin(&mut self, x: f32, y: f32) {
        self.origin = (x.clamp(0.0, 1.0), y.clamp(0.0, 1.0));
    }

    /// Place or reset the generator: recompute every target's phase from
    /// its distance and align the first loop to the next grid point.
    pub fn reset(&mut self, now: f64, timing: GridTiming) {
        let d_max = corner_distance(self.origin.0, self.origin.1);
        self.phases = self
            .targets
            .iter()
            .map(|t| {
                let d = ((t.x - self.origin.0).powi(2) + (t.y - self.origin.1).powi(2)).sqrt();
                phase_for(d, d_max, self.steps_per_loop)
            })
            .collect();

        let mut order: Vec<usize> = (0..self.targets.len()).collect();
        order.sort_by_key(|&i| self.phases[i]);
        self.order = order;
        self.cursor = 0;
        self.loop_start = Some(quantize_up(now, timing));
    }

    pub fn disarm(&mut self) {
        self.loop_start = None;
    }

    /// Commit all target hits inside the lookahead window, in phase
    /// order; advance to the next loop when the current one is exhausted.
    pub fn tick(
        &mut self,
        now: f64,
        timing: GridTiming,
        resolver: &InstrumentResolver,
        sink: &dyn PlaybackSink,
        sync: &StepSync,
    ) {
        let Some(mut loop_start) = self.loop_start else {
            return;
        };
        let loop_len = self.steps_per_loop as f64 * timing.step_duration;
        if loop_len <= 0.0 {
            self.loop_start = None;
            return;
        }

        let horizon = now + LOOKAHEAD_SECS;

        if self.order.is_empty() {
            // No targets: just keep the loop aligned
            while loop_start < horizon {
                loop_start += loop_len;
            }
            self.loop_start = Some(loop_start);
            return;
        }

        loop {
            while self.cursor < self.order.len() {
                let idx = self.order[self.cursor];
                let phase = self.phases[idx];
                let t = loop_start + phase as f64 * timing.step_duration;
                if t >= horizon {
                    self.loop_start = Some(loop_start);
                    return;
                }
                let target = &self.targets[idx];
                if let Ok(plan) = resolver.resolve(&target.instrument, target.note_index) {
                    sink.play(plan, t);
                }
                sync.notify(Panel::Rippler, phase as usize, t);
                self.cursor += 1;
            }
            self.cursor = 0;
            loop_start += loop_len;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::VoicePlan;
    use crate::instrument::{default_library, SampleCache};
    use crate::sequencer::NOTE_CENTER;
    use parking_lot::Mutex;

    struct RecordingSink {
        times: Mutex<Vec<f64>>,
    }

    impl PlaybackSink for RecordingSink {
        fn play(&self, _plan: VoicePlan, when: f64) {
            self.times.lock().push(when);
        }
    }

    fn timing() -> GridTiming {
        GridTiming {
            epoch: 0.0,
            step_duration: 0.25,
        }
    }

    fn resolver() -> InstrumentResolver {
        InstrumentResolver::new(default_library(), SampleCache::new())
    }

    #[test]
    fn p6_phase_is_ceil_of_distance_over_step_distance() {
        // d_max 1.0, 8 steps: step distance 0.125
        assert_eq!(phase_for(0.0, 1.0, 8), 0);
        assert_eq!(phase_for(0.125, 1.0, 8), 1);
        // Just past a boundary rounds up, never down
        assert_eq!(phase_for(0.126, 1.0, 8), 2);
        assert_eq!(phase_for(0.3, 1.0, 8), 3);
    }

    #[test]
    fn p6_phase_clamps_to_last_step() {
        assert_eq!(phase_for(1.0, 1.0, 8), 7);
        assert_eq!(phase_for(5.0, 1.0, 8), 7);
    }

    #[test]
    fn corner_distance_from_origin_corner_is_the_diagonal() {
        assert!((corner_distance(0.0, 0.0) - 2f32.sqrt()).abs() < 1e-6);
        // Center: every corner is half a diagonal away
        assert!((corner_distance(0.5, 0.5) - (0.5f32 * 2f32.sqrt())).abs() < 1e-6);
    }

    #[test]
    fn reset_orders_targets_by_phase() {
        let mut r = Rippler::new(
            (0.0, 0.0),
            vec![
                Target::new("chime", NOTE_CENTER, 1.0, 1.0), // farthest
                Target::new("kick", NOTE_CENTER, 0.1, 0.0),  // nearest
            ],
            8,
        );
        r.reset(0.0, timing());
        assert!(r.phases()[1] < r.phases()[0]);
    }

    #[test]
    fn targets_fire_at_loop_start_plus_phase_steps() {
        let mut r = Rippler::new(
            (0.0, 0.0),
            vec![Target::new("kick", NOTE_CENTER, 0.5, 0.0)],
            8,
        );
        let sink = RecordingSink {
            times: Mutex::new(Vec::new()),
        };
        let (sync, _rx) = StepSync::channel();
        let res = resolver();

        r.reset(0.0, timing());
        let phase = r.phases()[0] as f64;

        // Two full loops fit inside the horizon
        r.tick(4.0, timing(), &res, &sink, &sync);
        let times = sink.times.lock().clone();
        assert!(times.len() >= 2);
        assert!((times[0] - phase * 0.25).abs() < 1e-9);
        // Next loop re-derives the same phase, one loop later
        assert!((times[1] - (2.0 + phase * 0.25)).abs() < 1e-9);
    }

    #[test]
    fn emission_is_in_nondecreasing_time_order() {
        let mut r = Rippler::new(
            (0.2, 0.3),
            vec![
                Target::new("kick", NOTE_CENTER, 0.9, 0.9),
                Target::new("bass", NOTE_CENTER, 0.2, 0.4),
                Target::new("chime", NOTE_CENTER, 0.6, 0.1),
            ],
            16,
        );
        let sink = RecordingSink {
            times: Mutex::new(Vec::new()),
        };
        let (sync, _rx) = StepSync::channel();
        let res = resolver();

        r.reset(0.0, timing());
        r.tick(10.0, timing(), &res, &sink, &sync);

        let times = sink.times.lock().clone();
        assert!(times.len() >= 6);
        for pair in times.windows(2) {
            assert!(pair[1] >= pair[0] - 1e-9);
        }
    }

    #[test]
    fn no_targets_keeps_the_loop_aligned_without_firing() {
        let mut r = Rippler::new((0.5, 0.5), Vec::new(), 8);
        let sink = RecordingSink {
            times: Mutex::new(Vec::new()),
        };
        let (sync, _rx) = StepSync::channel();
        let res = resolver();

        r.reset(0.0, timing());
        r.tick(5.0, timing(), &res, &sink, &sync);
        assert!(sink.times.lock().is_empty());
        assert!(r.is_armed());
    }
}
