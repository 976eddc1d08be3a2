use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Oscillator shape for synthesized voices
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WaveShape {
    Sine,
    Triangle,
    Square,
    Saw,
}

/// Attack/decay envelope, in milliseconds
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Envelope {
    pub attack_ms: f32,
    pub decay_ms: f32,
}

impl Envelope {
    pub fn new(attack_ms: f32, decay_ms: f32) -> Self {
        Self {
            attack_ms: attack_ms.clamp(0.0, 50.0),
            decay_ms: decay_ms.clamp(10.0, 2000.0),
        }
    }
}

/// Fully resolved playback parameters for one voice, as handed to the
/// engine. Ephemeral: the engine's pending queue is the system of record.
#[derive(Clone, Debug)]
pub enum VoicePlan {
    Sample {
        buffer: Arc<Vec<f32>>,
        /// Resampling ratio; pitch shift by rate, not time-stretch.
        rate: f64,
        gain: f32,
    },
    Tone {
        wave: WaveShape,
        freq: f32,
        envelope: Envelope,
        gain: f32,
    },
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum EnvelopePhase {
    Attack,
    Decay,
    Off,
}

enum VoiceSource {
    Sample {
        buffer: Arc<Vec<f32>>,
        position: f64,
        rate: f64,
    },
    Tone {
        wave: WaveShape,
        phase: f32,
        phase_inc: f32,
        env: f32,
        env_phase: EnvelopePhase,
        env_samples: usize,
        attack_samples: f32,
        decay_samples: f32,
    },
}

/// One sounding voice. Each trigger creates an independent voice so
/// overlapping identical notes never cut each other off.
pub struct Voice {
    source: VoiceSource,
    gain: f32,
    finished: bool,
}

impl Voice {
    pub fn from_plan(plan: VoicePlan, sample_rate: f32) -> Self {
        match plan {
            VoicePlan::Sample { buffer, rate, gain } => {
                let finished = buffer.is_empty();
                Self {
                    source: VoiceSource::Sample {
                        buffer,
                        position: 0.0,
                        rate,
                    },
                    gain,
                    finished,
                }
            }
            VoicePlan::Tone {
                wave,
                freq,
                envelope,
                gain,
            } => {
                let attack_samples = envelope.attack_ms * 0.001 * sample_rate;
                Self {
                    source: VoiceSource::Tone {
                        wave,
                        phase: 0.0,
                        phase_inc: freq / sample_rate,
                        env: if attack_samples > 0.0 { 0.0 } else { 1.0 },
                        env_phase: if attack_samples > 0.0 {
                            EnvelopePhase::Attack
                        } else {
                            EnvelopePhase::Decay
                        },
                        env_samples: 0,
                        attack_samples,
                        decay_samples: envelope.decay_ms * 0.001 * sample_rate,
                    },
                    gain,
                    finished: false,
                }
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn next_sample(&mut self) -> f32 {
        if self.finished {
            return 0.0;
        }
        match &mut self.source {
            VoiceSource::Sample {
                buffer,
                position,
                rate,
            } => {
                let pos = *position;
                if pos >= buffer.len() as f64 {
                    self.finished = true;
                    return 0.0;
                }
                // Linear interpolation between adjacent frames
                let idx = pos as usize;
                let frac = (pos - idx as f64) as f32;
                let s0 = buffer[idx];
                let s1 = if idx + 1 < buffer.len() {
                    buffer[idx + 1]
                } else {
                    s0
                };
                *position = pos + *rate;
                (s0 + (s1 - s0) * frac) * self.gain
            }
            VoiceSource::Tone {
                wave,
                phase,
                phase_inc,
                env,
                env_phase,
                env_samples,
                attack_samples,
                decay_samples,
            } => {
                let raw = match wave {
                    WaveShape::Sine => (*phase * std::f32::consts::TAU).sin(),
                    WaveShape::Triangle => 4.0 * (*phase - 0.5).abs() - 1.0,
                    WaveShape::Square => {
                        if *phase < 0.5 {
                            1.0
                        } else {
                            -1.0
                        }
                    }
                    WaveShape::Saw => 2.0 * *phase - 1.0,
                };
                *phase += *phase_inc;
                if *phase >= 1.0 {
                    *phase -= 1.0;
                }

                *env_samples += 1;
                match env_phase {
                    EnvelopePhase::Attack => {
                        *env = (*env_samples as f32 / *attack_samples).min(1.0);
                        if *env >= 1.0 {
                            *env_phase = EnvelopePhase::Decay;
                            *env_samples = 0;
                        }
                    }
                    EnvelopePhase::Decay => {
                        if *decay_samples > 0.0 {
                            *env = 1.0 - (*env_samples as f32 / *decay_samples).min(1.0);
                        } else {
                            *env = 0.0;
                        }
                        if *env <= 0.0 {
                            *env_phase = EnvelopePhase::Off;
                            self.finished = true;
                            return 0.0;
                        }
                    }
                    EnvelopePhase::Off => {
                        self.finished = true;
                        return 0.0;
                    }
                }

                raw * *env * self.gain
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone_plan(decay_ms: f32) -> VoicePlan {
        VoicePlan::Tone {
            wave: WaveShape::Sine,
            freq: 440.0,
            envelope: Envelope::new(0.0, decay_ms),
            gain: 1.0,
        }
    }

    #[test]
    fn sample_voice_plays_through_and_finishes() {
        let buffer = Arc::new(vec![1.0f32, 0.5, 0.0, -0.5]);
        let mut voice = Voice::from_plan(
            VoicePlan::Sample {
                buffer,
                rate: 1.0,
                gain: 1.0,
            },
            44100.0,
        );

        assert_eq!(voice.next_sample(), 1.0);
        assert_eq!(voice.next_sample(), 0.5);
        assert_eq!(voice.next_sample(), 0.0);
        assert_eq!(voice.next_sample(), -0.5);
        assert_eq!(voice.next_sample(), 0.0);
        assert!(voice.is_finished());
    }

    #[test]
    fn sample_voice_interpolates_at_fractional_rate() {
        let buffer = Arc::new(vec![0.0f32, 1.0]);
        let mut voice = Voice::from_plan(
            VoicePlan::Sample {
                buffer,
                rate: 0.5,
                gain: 1.0,
            },
            44100.0,
        );

        assert_eq!(voice.next_sample(), 0.0); // pos 0.0
        assert_eq!(voice.next_sample(), 0.5); // pos 0.5, halfway between frames
        assert_eq!(voice.next_sample(), 1.0); // pos 1.0
    }

    #[test]
    fn empty_sample_buffer_is_finished_immediately() {
        let voice = Voice::from_plan(
            VoicePlan::Sample {
                buffer: Arc::new(Vec::new()),
                rate: 1.0,
                gain: 1.0,
            },
            44100.0,
        );
        assert!(voice.is_finished());
    }

    #[test]
    fn tone_voice_decays_to_silence() {
        // 10ms decay at 1kHz sample rate = ten samples of audible output
        let mut voice = Voice::from_plan(tone_plan(10.0), 1000.0);
        let mut produced = 0;
        for _ in 0..100 {
            voice.next_sample();
            if voice.is_finished() {
                break;
            }
            produced += 1;
        }
        assert!(voice.is_finished());
        assert!((9..=11).contains(&produced), "produced {}", produced);
    }

    #[test]
    fn gain_scales_sample_output() {
        let buffer = Arc::new(vec![1.0f32, 1.0]);
        let mut voice = Voice::from_plan(
            VoicePlan::Sample {
                buffer,
                rate: 1.0,
                gain: 0.5,
            },
            44100.0,
        );
        assert_eq!(voice.next_sample(), 0.5);
    }
}
