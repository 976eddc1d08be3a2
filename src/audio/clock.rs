use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Monotonic audio-domain time source, in seconds.
///
/// The scheduler never looks at wall-clock time; every trigger time it
/// computes is relative to this clock, so accuracy is the audio engine's
/// problem, not the polling timer's.
pub trait AudioClock: Send + Sync {
    /// Current audio time in seconds. Non-decreasing; never pauses while
    /// the output stream exists.
    fn now(&self) -> f64;

    /// False until the output stream has actually produced audio.
    /// Scheduling against a clock that is not running is refused upstream.
    fn is_running(&self) -> bool;
}

/// Clock advanced by the audio callback: frames written so far divided by
/// the stream sample rate.
pub struct EngineClock {
    frames: Arc<AtomicU64>,
    running: Arc<AtomicBool>,
    sample_rate: f64,
}

impl EngineClock {
    pub fn new(frames: Arc<AtomicU64>, running: Arc<AtomicBool>, sample_rate: f64) -> Self {
        Self {
            frames,
            running,
            sample_rate,
        }
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }
}

impl AudioClock for EngineClock {
    fn now(&self) -> f64 {
        self.frames.load(Ordering::Acquire) as f64 / self.sample_rate
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

/// Settable clock for deterministic tests. Time is stored as integer
/// microseconds so `advance` is exact across threads.
pub struct ManualClock {
    micros: AtomicU64,
    running: AtomicBool,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            micros: AtomicU64::new(0),
            running: AtomicBool::new(true),
        }
    }

    pub fn stopped() -> Self {
        let clock = Self::new();
        clock.running.store(false, Ordering::Release);
        clock
    }

    pub fn set(&self, seconds: f64) {
        self.micros
            .store((seconds * 1_000_000.0) as u64, Ordering::Release);
    }

    pub fn advance(&self, seconds: f64) {
        self.micros
            .fetch_add((seconds * 1_000_000.0) as u64, Ordering::AcqRel);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioClock for ManualClock {
    fn now(&self) -> f64 {
        self.micros.load(Ordering::Acquire) as f64 / 1_000_000.0
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_clock_tracks_frames() {
        let frames = Arc::new(AtomicU64::new(0));
        let running = Arc::new(AtomicBool::new(true));
        let clock = EngineClock::new(frames.clone(), running, 44100.0);

        assert_eq!(clock.now(), 0.0);
        frames.store(44100, Ordering::Release);
        assert!((clock.now() - 1.0).abs() < 1e-9);
        frames.store(66150, Ordering::Release);
        assert!((clock.now() - 1.5).abs() < 1e-9);
    }

    #[test]
    fn manual_clock_set_and_advance() {
        let clock = ManualClock::new();
        assert!(clock.is_running());
        clock.set(0.5);
        assert!((clock.now() - 0.5).abs() < 1e-6);
        clock.advance(0.25);
        assert!((clock.now() - 0.75).abs() < 1e-6);
    }

    #[test]
    fn stopped_manual_clock_reports_not_running() {
        let clock = ManualClock::stopped();
        assert!(!clock.is_running());
    }
}
