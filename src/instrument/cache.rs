use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use parking_lot::RwLock;

/// State of one instrument's sample buffer
#[derive(Clone)]
pub enum CacheEntry {
    /// A load has been requested but not finished
    Pending,
    /// No file found or decode failed; resolution fails closed
    Missing,
    Loaded(Arc<Vec<f32>>),
}

/// Async key -> buffer cache shared between the loader thread and the
/// resolver. Lookups never block on decoding.
#[derive(Clone)]
pub struct SampleCache {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
}

impl SampleCache {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Unknown names read as Missing
    pub fn get(&self, name: &str) -> CacheEntry {
        self.entries
            .read()
            .get(name)
            .cloned()
            .unwrap_or(CacheEntry::Missing)
    }

    pub fn insert(&self, name: &str, buffer: Vec<f32>) {
        self.entries
            .write()
            .insert(name.to_string(), CacheEntry::Loaded(Arc::new(buffer)));
    }

    pub fn mark_pending(&self, name: &str) {
        self.entries
            .write()
            .insert(name.to_string(), CacheEntry::Pending);
    }

    pub fn mark_missing(&self, name: &str) {
        self.entries
            .write()
            .insert(name.to_string(), CacheEntry::Missing);
    }

    /// Decode WAVs on a background thread; entries sit at Pending until
    /// the decode lands. One-time startup concern, external to the
    /// scheduling core.
    pub fn load_in_background(&self, jobs: Vec<(String, PathBuf)>, target_rate: f32) {
        for (name, _) in &jobs {
            self.mark_pending(name);
        }
        let cache = self.clone();
        std::thread::spawn(move || {
            for (name, path) in jobs {
                match load_wav(&path, target_rate) {
                    Ok(buffer) => cache.insert(&name, buffer),
                    Err(e) => {
                        eprintln!("Warning: failed to load sample '{}': {}", name, e);
                        cache.mark_missing(&name);
                    }
                }
            }
        });
    }
}

impl Default for SampleCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Load a WAV file as mono f32 at the target sample rate
pub fn load_wav(path: &Path, target_sr: f32) -> Result<Vec<f32>> {
    let reader = hound::WavReader::open(path)
        .with_context(|| format!("Failed to open WAV: {}", path.display()))?;

    let spec = reader.spec();
    let channels = spec.channels as usize;
    let wav_sr = spec.sample_rate as f32;

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Int => {
            let max_val = (1u32 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .filter_map(|s| s.ok())
                .map(|s| s as f32 / max_val)
                .collect()
        }
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .filter_map(|s| s.ok())
            .collect(),
    };

    if samples.is_empty() {
        bail!("WAV file is empty: {}", path.display());
    }

    // Fold down to mono (average channels)
    let mono: Vec<f32> = if channels > 1 {
        samples
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    } else {
        samples
    };

    // Resample with linear interpolation if the rates differ
    if (wav_sr - target_sr).abs() > 1.0 {
        let ratio = wav_sr as f64 / target_sr as f64;
        let new_len = (mono.len() as f64 / ratio) as usize;
        let mut resampled = Vec::with_capacity(new_len);
        for i in 0..new_len {
            let pos = i as f64 * ratio;
            let idx = pos as usize;
            let frac = (pos - idx as f64) as f32;
            let s0 = mono.get(idx).copied().unwrap_or(0.0);
            let s1 = mono.get(idx + 1).copied().unwrap_or(s0);
            resampled.push(s0 + (s1 - s0) * frac);
        }
        Ok(resampled)
    } else {
        Ok(mono)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_name_reads_as_missing() {
        let cache = SampleCache::new();
        assert!(matches!(cache.get("nope"), CacheEntry::Missing));
    }

    #[test]
    fn entry_lifecycle_pending_to_loaded() {
        let cache = SampleCache::new();
        cache.mark_pending("kick");
        assert!(matches!(cache.get("kick"), CacheEntry::Pending));

        cache.insert("kick", vec![0.0, 1.0]);
        match cache.get("kick") {
            CacheEntry::Loaded(buf) => assert_eq!(buf.len(), 2),
            _ => panic!("expected loaded entry"),
        }
    }

    #[test]
    fn failed_load_marks_missing() {
        let cache = SampleCache::new();
        cache.mark_pending("snare");
        cache.mark_missing("snare");
        assert!(matches!(cache.get("snare"), CacheEntry::Missing));
    }
}
