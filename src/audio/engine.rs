use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

use super::clock::EngineClock;
use super::voice::{Voice, VoicePlan};

/// Upper bound on simultaneously sounding voices; triggers beyond it are
/// dropped by the callback.
const MAX_VOICES: usize = 64;

/// Accepts resolved voices for playback at an absolute clock time.
///
/// Fire-and-forget by contract: `play` never blocks, never reports back,
/// and a delivered voice cannot be recalled.
pub trait PlaybackSink: Send + Sync {
    /// Schedule one independent voice to start sounding at `when`, in
    /// clock seconds. A `when` already in the past starts immediately.
    fn play(&self, plan: VoicePlan, when: f64);
}

enum EngineCommand {
    Schedule { plan: VoicePlan, when: f64 },
}

/// Cloneable sender half of the engine's voice queue
#[derive(Clone)]
pub struct EngineHandle {
    tx: Sender<EngineCommand>,
}

impl PlaybackSink for EngineHandle {
    fn play(&self, plan: VoicePlan, when: f64) {
        match self.tx.try_send(EngineCommand::Schedule { plan, when }) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                eprintln!("Warning: voice queue full, dropping trigger");
            }
            Err(TrySendError::Disconnected(_)) => {}
        }
    }
}

/// A voice waiting in the callback for its start frame
struct PendingVoice {
    start_frame: u64,
    plan: VoicePlan,
}

/// Audio engine: owns the output stream, the sample-accurate clock, and
/// the pending-voice queue that is the system of record for what will
/// play when.
pub struct AudioEngine {
    _stream: Stream,
    clock: Arc<EngineClock>,
    handle: EngineHandle,
}

impl AudioEngine {
    /// Initialize the engine on the default output device
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .context("No output device available")?;

        let config = device.default_output_config()?;
        let sample_rate = config.sample_rate().0 as f64;

        let frames = Arc::new(AtomicU64::new(0));
        let running = Arc::new(AtomicBool::new(false));
        let clock = Arc::new(EngineClock::new(
            frames.clone(),
            running.clone(),
            sample_rate,
        ));

        let (tx, rx) = bounded(256);
        let handle = EngineHandle { tx };

        let stream = match config.sample_format() {
            SampleFormat::F32 => {
                Self::build_stream::<f32>(&device, &config.into(), rx, frames, running)?
            }
            SampleFormat::I16 => {
                Self::build_stream::<i16>(&device, &config.into(), rx, frames, running)?
            }
            SampleFormat::U16 => {
                Self::build_stream::<u16>(&device, &config.into(), rx, frames, running)?
            }
            format => anyhow::bail!("Unsupported sample format: {:?}", format),
        };

        stream.play()?;

        Ok(Self {
            _stream: stream,
            clock,
            handle,
        })
    }

    /// The engine's monotonic clock
    pub fn clock(&self) -> Arc<EngineClock> {
        self.clock.clone()
    }

    /// A cloneable handle for scheduling voices
    pub fn handle(&self) -> EngineHandle {
        self.handle.clone()
    }

    fn build_stream<T>(
        device: &Device,
        config: &StreamConfig,
        command_rx: Receiver<EngineCommand>,
        frames: Arc<AtomicU64>,
        running: Arc<AtomicBool>,
    ) -> Result<Stream>
    where
        T: cpal::SizedSample + cpal::FromSample<f32>,
    {
        let sample_rate = config.sample_rate.0 as f64;
        let channels = config.channels as usize;

        let mut pending: Vec<PendingVoice> = Vec::new();
        let mut active: Vec<Voice> = Vec::new();
        // Local mirror of the shared frame counter
        let mut frame_counter: u64 = 0;

        let stream = device.build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                running.store(true, Ordering::Release);

                // Drain delivered voices into the pending queue. A `when`
                // in the past clamps to now (late delivery, not an error).
                let mut dirty = false;
                while let Ok(cmd) = command_rx.try_recv() {
                    let EngineCommand::Schedule { plan, when } = cmd;
                    let start_frame =
                        ((when * sample_rate).round().max(0.0) as u64).max(frame_counter);
                    pending.push(PendingVoice { start_frame, plan });
                    dirty = true;
                }
                if dirty {
                    pending.sort_by_key(|p| p.start_frame);
                }

                for frame in data.chunks_mut(channels) {
                    // Start voices due at exactly this frame
                    while pending
                        .first()
                        .map(|p| p.start_frame <= frame_counter)
                        .unwrap_or(false)
                    {
                        let p = pending.remove(0);
                        if active.len() < MAX_VOICES {
                            active.push(Voice::from_plan(p.plan, sample_rate as f32));
                        }
                    }

                    let mut mix = 0.0f32;
                    for voice in active.iter_mut() {
                        mix += voice.next_sample();
                    }
                    active.retain(|v| !v.is_finished());

                    let out = soft_clip(mix);
                    for channel_sample in frame.iter_mut() {
                        *channel_sample = T::from_sample(out);
                    }

                    frame_counter += 1;
                }

                frames.store(frame_counter, Ordering::Release);
            },
            |err| {
                eprintln!("Audio stream error: {}", err);
            },
            None,
        )?;

        Ok(stream)
    }
}

/// Soft clipping to prevent harsh digital clipping on the summed mix
fn soft_clip(x: f32) -> f32 {
    if x > 1.0 {
        1.0 - (-x + 1.0).exp() * 0.5
    } else if x < -1.0 {
        -1.0 + (x + 1.0).exp() * 0.5
    } else {
        x
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn soft_clip_passes_through_in_range() {
        assert_eq!(soft_clip(0.0), 0.0);
        assert_eq!(soft_clip(0.5), 0.5);
        assert_eq!(soft_clip(-0.9), -0.9);
    }

    #[test]
    fn soft_clip_bounds_extremes() {
        assert!(soft_clip(10.0) <= 1.0);
        assert!(soft_clip(-10.0) >= -1.0);
        assert!(soft_clip(1.5) > soft_clip(1.1));
    }
}
