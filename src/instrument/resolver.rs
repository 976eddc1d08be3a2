use std::collections::HashMap;

use crate::audio::{Envelope, VoicePlan, WaveShape};
use crate::sequencer::pattern::{NOTE_CENTER, NOTE_RANGE};

use super::cache::{CacheEntry, SampleCache};

/// MIDI note number to frequency in Hz (equal temperament, A4 = 440)
pub fn midi_to_freq(note: u8) -> f32 {
    440.0 * 2f32.powf((note as f32 - 69.0) / 12.0)
}

#[derive(Clone, Debug)]
pub enum InstrumentKind {
    /// Buffer comes from the sample cache under the instrument's name.
    /// Pitch shift is by resampling rate, not time-stretch.
    Sampled,
    Synth { wave: WaveShape, envelope: Envelope },
}

/// One entry in the instrument table
#[derive(Clone, Debug)]
pub struct InstrumentDef {
    pub name: String,
    /// MIDI note sounding at note index `NOTE_CENTER` (rate 1.0 for samples)
    pub base_note: u8,
    pub gain: f32,
    pub kind: InstrumentKind,
}

impl InstrumentDef {
    pub fn synth(name: &str, base_note: u8, wave: WaveShape, gain: f32, decay_ms: f32) -> Self {
        Self {
            name: name.to_string(),
            base_note,
            gain,
            kind: InstrumentKind::Synth {
                wave,
                envelope: Envelope::new(0.0, decay_ms),
            },
        }
    }

    pub fn sampled(name: &str, base_note: u8, gain: f32) -> Self {
        Self {
            name: name.to_string(),
            base_note,
            gain,
            kind: InstrumentKind::Sampled,
        }
    }
}

/// Why a lookup produced no sound. Local and recoverable: the caller
/// skips the event and moves on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResolveError {
    UnknownInstrument,
    NoteOutOfRange,
    SampleUnavailable,
}

/// Maps (instrument name, note index) to playback parameters
pub struct InstrumentResolver {
    defs: HashMap<String, InstrumentDef>,
    cache: SampleCache,
}

impl InstrumentResolver {
    pub fn new(defs: Vec<InstrumentDef>, cache: SampleCache) -> Self {
        Self {
            defs: defs.into_iter().map(|d| (d.name.clone(), d)).collect(),
            cache,
        }
    }

    pub fn resolve(&self, name: &str, note_index: u8) -> Result<VoicePlan, ResolveError> {
        let def = self.defs.get(name).ok_or(ResolveError::UnknownInstrument)?;
        if note_index >= NOTE_RANGE {
            return Err(ResolveError::NoteOutOfRange);
        }
        let semitones = note_index as i32 - NOTE_CENTER as i32;

        match &def.kind {
            InstrumentKind::Sampled => match self.cache.get(name) {
                CacheEntry::Loaded(buffer) => Ok(VoicePlan::Sample {
                    buffer,
                    rate: 2f64.powf(semitones as f64 / 12.0),
                    gain: def.gain,
                }),
                CacheEntry::Pending | CacheEntry::Missing => Err(ResolveError::SampleUnavailable),
            },
            InstrumentKind::Synth { wave, envelope } => {
                let midi = (def.base_note as i32 + semitones).clamp(0, 127) as u8;
                Ok(VoicePlan::Tone {
                    wave: *wave,
                    freq: midi_to_freq(midi),
                    envelope: *envelope,
                    gain: def.gain,
                })
            }
        }
    }
}

/// Built-in synth voices used when no sample library is present
pub fn default_library() -> Vec<InstrumentDef> {
    vec![
        InstrumentDef::synth("kick", 36, WaveShape::Sine, 0.9, 180.0),
        InstrumentDef::synth("bass", 45, WaveShape::Triangle, 0.8, 300.0),
        InstrumentDef::synth("pluck", 57, WaveShape::Saw, 0.5, 200.0),
        InstrumentDef::synth("chime", 72, WaveShape::Square, 0.4, 250.0),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver_with(defs: Vec<InstrumentDef>) -> (InstrumentResolver, SampleCache) {
        let cache = SampleCache::new();
        (InstrumentResolver::new(defs, cache.clone()), cache)
    }

    #[test]
    fn midi_to_freq_hits_reference_pitches() {
        assert!((midi_to_freq(69) - 440.0).abs() < 0.001);
        assert!((midi_to_freq(57) - 220.0).abs() < 0.001);
        assert!((midi_to_freq(81) - 880.0).abs() < 0.001);
    }

    #[test]
    fn unknown_instrument_fails_closed() {
        let (resolver, _) = resolver_with(default_library());
        assert_eq!(
            resolver.resolve("nope", NOTE_CENTER).unwrap_err(),
            ResolveError::UnknownInstrument
        );
    }

    #[test]
    fn note_index_out_of_range_fails_closed() {
        let (resolver, _) = resolver_with(default_library());
        assert_eq!(
            resolver.resolve("kick", NOTE_RANGE).unwrap_err(),
            ResolveError::NoteOutOfRange
        );
    }

    #[test]
    fn synth_resolution_offsets_from_base_note() {
        let (resolver, _) = resolver_with(default_library());
        // chime base is 72; center index plays the base pitch
        match resolver.resolve("chime", NOTE_CENTER).unwrap() {
            VoicePlan::Tone { freq, .. } => {
                assert!((freq - midi_to_freq(72)).abs() < 0.001);
            }
            _ => panic!("expected tone"),
        }
        // one octave up
        match resolver.resolve("chime", NOTE_CENTER + 12).unwrap() {
            VoicePlan::Tone { freq, .. } => {
                assert!((freq - midi_to_freq(84)).abs() < 0.001);
            }
            _ => panic!("expected tone"),
        }
    }

    #[test]
    fn sampled_resolution_computes_resampling_rate() {
        let (resolver, cache) = resolver_with(vec![InstrumentDef::sampled("snap", 60, 1.0)]);
        cache.insert("snap", vec![0.0; 64]);

        match resolver.resolve("snap", NOTE_CENTER + 12).unwrap() {
            VoicePlan::Sample { rate, .. } => assert!((rate - 2.0).abs() < 1e-9),
            _ => panic!("expected sample"),
        }
        match resolver.resolve("snap", NOTE_CENTER - 12).unwrap() {
            VoicePlan::Sample { rate, .. } => assert!((rate - 0.5).abs() < 1e-9),
            _ => panic!("expected sample"),
        }
    }

    #[test]
    fn pending_and_missing_samples_are_unavailable() {
        let (resolver, cache) = resolver_with(vec![InstrumentDef::sampled("snap", 60, 1.0)]);
        assert_eq!(
            resolver.resolve("snap", NOTE_CENTER).unwrap_err(),
            ResolveError::SampleUnavailable
        );
        cache.mark_pending("snap");
        assert_eq!(
            resolver.resolve("snap", NOTE_CENTER).unwrap_err(),
            ResolveError::SampleUnavailable
        );
    }
}
