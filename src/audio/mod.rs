pub mod clock;
pub mod engine;
pub mod voice;

pub use clock::{AudioClock, EngineClock, ManualClock};
pub use engine::{AudioEngine, EngineHandle, PlaybackSink};
pub use voice::{Envelope, Voice, VoicePlan, WaveShape};
