use crate::audio::PlaybackSink;
use crate::instrument::InstrumentResolver;
use crate::sequencer::{GridTiming, Panel, StepSync, LOOKAHEAD_SECS};

use super::{quantize_up, step_index};

/// A bouncing object whose wall hits are quantized to the step grid.
///
/// Arming picks the next grid-aligned time at or after "now" as the first
/// hit; after that, hits repeat every `travel_steps` steps. Hits are
/// committed ahead of time through the same lookahead window as the grid,
/// so they stay rhythmically locked to it.
pub struct Bouncer {
    instrument: String,
    note_index: u8,
    travel_steps: u32,
    next_hit: Option<f64>,
}

impl Bouncer {
    pub fn new(instrument: &str, note_index: u8, travel_steps: u32) -> Self {
        Self {
            instrument: instrument.to_string(),
            note_index,
            travel_steps: travel_steps.max(1),
            next_hit: None,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.next_hit.is_some()
    }

    pub fn next_hit(&self) -> Option<f64> {
        self.next_hit
    }

    /// Place or reset the bouncer: the first hit lands on the next grid
    /// point at or after `now`, never before it.
    pub fn arm(&mut self, now: f64, timing: GridTiming) {
        self.next_hit = Some(quantize_up(now, timing));
    }

    pub fn disarm(&mut self) {
        self.next_hit = None;
    }

    /// Commit all hits inside the lookahead window
    pub fn tick(
        &mut self,
        now: f64,
        timing: GridTiming,
        step_count: usize,
        resolver: &InstrumentResolver,
        sink: &dyn PlaybackSink,
        sync: &StepSync,
    ) {
        let Some(mut hit) = self.next_hit else {
            return;
        };
        if timing.step_duration <= 0.0 {
            self.next_hit = None;
            return;
        }

        let horizon = now + LOOKAHEAD_SECS;
        let period = self.travel_steps as f64 * timing.step_duration;
        while hit < horizon {
            if let Ok(plan) = resolver.resolve(&self.instrument, self.note_index) {
                sink.play(plan, hit);
            }
            sync.notify(Panel::Bouncer, step_index(hit, timing, step_count), hit);
            hit += period;
        }
        self.next_hit = Some(hit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::VoicePlan;
    use crate::instrument::{default_library, SampleCache};
    use crate::sequencer::NOTE_CENTER;
    use parking_lot::Mutex;
    use std::sync::Arc;

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
            epoch: 0.05,
            step_duration: 0.25,
        }
    }

    fn resolver() -> InstrumentResolver {
        InstrumentResolver::new(default_library(), SampleCache::new())
    }

    #[test]
    fn arm_quantizes_up_never_down() {
        let mut b = Bouncer::new("kick", NOTE_CENTER, 4);
        b.arm(0.26, timing());
        assert!((b.next_hit().unwrap() - 0.30).abs() < 1e-9);

        // Exactly on the lattice stays put
        b.arm(0.30, timing());
        assert!((b.next_hit().unwrap() - 0.30).abs() < 1e-9);
    }

    #[test]
    fn hits_repeat_every_travel_steps() {
        let mut b = Bouncer::new("kick", NOTE_CENTER, 4);
        let sink = Arc::new(RecordingSink {
            times: Mutex::new(Vec::new()),
        });
        let (sync, _rx) = StepSync::channel();
        let res = resolver();

        b.arm(0.0, timing());
        // Window 0..2.12 holds hits at 0.05, 1.05, 2.05
        b.tick(2.0, timing(), 16, &res, sink.as_ref(), &sync);

        let times = sink.times.lock().clone();
        assert_eq!(times.len(), 3);
        assert!((times[0] - 0.05).abs() < 1e-9);
        assert!((times[1] - 1.05).abs() < 1e-9);
        assert!((times[2] - 2.05).abs() < 1e-9);
        assert!((b.next_hit().unwrap() - 3.05).abs() < 1e-9);
    }

    #[test]
    fn disarmed_bouncer_emits_nothing() {
        let mut b = Bouncer::new("kick", NOTE_CENTER, 2);
        let sink = Arc::new(RecordingSink {
            times: Mutex::new(Vec::new()),
        });
        let (sync, _rx) = StepSync::channel();
        let res = resolver();

        b.tick(1.0, timing(), 16, &res, sink.as_ref(), &sync);
        assert!(sink.times.lock().is_empty());
    }

    #[test]
    fn unknown_instrument_still_advances_the_hit() {
        let mut b = Bouncer::new("ghost", NOTE_CENTER, 4);
        let sink = Arc::new(RecordingSink {
            times: Mutex::new(Vec::new()),
        });
        let (sync, rx) = StepSync::channel();
        let res = resolver();

        b.arm(0.0, timing());
        b.tick(0.0, timing(), 16, &res, sink.as_ref(), &sync);

        assert!(sink.times.lock().is_empty());
        // The visual notice and the forward march are unaffected
        assert!(rx.try_recv().is_ok());
        assert!(b.next_hit().unwrap() > 0.05);
    }
}
