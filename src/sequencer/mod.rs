pub mod pattern;
pub mod scheduler;
pub mod sync;

pub use pattern::{Lane, PatternStore, Step, DEFAULT_STEPS, NOTE_CENTER, NOTE_RANGE};
pub use scheduler::{
    GridTiming, Scheduler, LOOKAHEAD_SECS, MAX_BPM, MIN_BPM, START_DELAY_SECS, STEPS_PER_BEAT,
    TICK_MS,
};
pub use sync::{Panel, StepNotice, StepSync};
