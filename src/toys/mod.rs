pub mod bouncer;
pub mod rippler;

pub use bouncer::Bouncer;
pub use rippler::{Rippler, Target};

use crate::sequencer::GridTiming;

/// First lattice time `>= now` on the grid `epoch + k * step_duration`.
/// Times before the epoch snap to the epoch itself.
pub fn quantize_up(now: f64, timing: GridTiming) -> f64 {
    let k = ((now - timing.epoch) / timing.step_duration).ceil().max(0.0);
    timing.epoch + k * timing.step_duration
}

/// Which step of an N-step loop a lattice time falls on
pub fn step_index(time: f64, timing: GridTiming, step_count: usize) -> usize {
    if step_count == 0 {
        return 0;
    }
    let k = ((time - timing.epoch) / timing.step_duration).round().max(0.0) as usize;
    k % step_count
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timing() -> GridTiming {
        GridTiming {
            epoch: 0.05,
            step_duration: 0.25,
        }
    }

    #[test]
    fn quantize_rounds_up_to_the_next_lattice_point() {
        assert!((quantize_up(0.26, timing()) - 0.30).abs() < 1e-9);
        assert!((quantize_up(0.06, timing()) - 0.30).abs() < 1e-9);
    }

    #[test]
    fn quantize_keeps_exact_lattice_points() {
        assert!((quantize_up(0.30, timing()) - 0.30).abs() < 1e-9);
        assert!((quantize_up(0.05, timing()) - 0.05).abs() < 1e-9);
    }

    #[test]
    fn quantize_clamps_to_epoch() {
        assert!((quantize_up(0.0, timing()) - 0.05).abs() < 1e-9);
    }

    #[test]
    fn step_index_wraps_on_the_loop() {
        let t = timing();
        assert_eq!(step_index(0.05, t, 8), 0);
        assert_eq!(step_index(0.30, t, 8), 1);
        assert_eq!(step_index(0.05 + 8.0 * 0.25, t, 8), 0);
    }
}
