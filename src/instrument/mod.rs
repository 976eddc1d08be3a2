pub mod cache;
pub mod resolver;

pub use cache::{load_wav, CacheEntry, SampleCache};
pub use resolver::{
    default_library, midi_to_freq, InstrumentDef, InstrumentKind, InstrumentResolver, ResolveError,
};
