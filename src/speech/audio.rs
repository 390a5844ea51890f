/*!
 * In-memory PCM audio and WAV encoding.
 */

use std::io::Cursor;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use log::warn;

use crate::errors::SpeechError;

/// Interleaved 16-bit PCM audio
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioClip {
    pub fn new(samples: Vec<i16>, sample_rate: u32, channels: u16) -> Self {
        Self {
            samples,
            sample_rate,
            channels: channels.max(1),
        }
    }

    /// Silent clip of the given length
    pub fn silence(duration_ms: u64, sample_rate: u32, channels: u16) -> Self {
        let channels = channels.max(1);
        let frames = (duration_ms * sample_rate as u64 + 500) / 1000;
        Self::new(vec![0; frames as usize * channels as usize], sample_rate, channels)
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    /// Playback length in milliseconds, rounded to the nearest millisecond
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        let rate = self.sample_rate as u64;
        (self.frames() as u64 * 1000 + rate / 2) / rate
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Change playback speed by rewriting the sample rate; the samples are
    /// untouched, so the clip plays `rate` times faster (and higher).
    pub fn with_playback_rate(mut self, rate: f32) -> Self {
        if (rate - 1.0).abs() < f32::EPSILON {
            return self;
        }
        self.sample_rate = ((self.sample_rate as f32 * rate).round() as u32).max(1);
        self
    }

    /// Linear-interpolation resample to another sample rate, keeping duration
    pub fn resampled(&self, target_rate: u32) -> AudioClip {
        if target_rate == self.sample_rate || self.is_empty() || target_rate == 0 {
            return self.clone();
        }

        let channels = self.channels as usize;
        let source_frames = self.frames();
        let target_frames =
            (source_frames as u64 * target_rate as u64 / self.sample_rate as u64) as usize;
        let step = self.sample_rate as f64 / target_rate as f64;

        let mut samples = Vec::with_capacity(target_frames * channels);
        for frame in 0..target_frames {
            let position = frame as f64 * step;
            let left = (position.floor() as usize).min(source_frames - 1);
            let right = (left + 1).min(source_frames - 1);
            let fraction = position - left as f64;
            for channel in 0..channels {
                let a = self.samples[left * channels + channel] as f64;
                let b = self.samples[right * channels + channel] as f64;
                samples.push((a + (b - a) * fraction).round() as i16);
            }
        }

        AudioClip::new(samples, target_rate, self.channels)
    }

    fn spec(&self) -> WavSpec {
        WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        }
    }

    /// Encode as a 16-bit PCM WAV file
    pub fn to_wav_bytes(&self) -> Result<Vec<u8>, SpeechError> {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = WavWriter::new(&mut cursor, self.spec())?;
            for &sample in &self.samples {
                writer.write_sample(sample)?;
            }
            writer.finalize()?;
        }
        Ok(cursor.into_inner())
    }

    /// Decode an integer PCM WAV file of up to 16 bits per sample
    pub fn from_wav_bytes(bytes: &[u8]) -> Result<AudioClip, SpeechError> {
        let reader = WavReader::new(Cursor::new(bytes))?;
        let spec = reader.spec();
        if spec.sample_format != SampleFormat::Int || spec.bits_per_sample > 16 {
            return Err(SpeechError::Audio(format!(
                "unsupported WAV format: {:?} {} bits",
                spec.sample_format, spec.bits_per_sample
            )));
        }

        let samples = reader.into_samples::<i16>().collect::<Result<Vec<_>, _>>()?;
        Ok(AudioClip::new(samples, spec.sample_rate, spec.channels))
    }
}

/// Join clips in order with `gap_ms` of silence between consecutive clips.
///
/// The first clip fixes the output format; clips at other sample rates are
/// resampled, clips with a different channel count are skipped.
pub fn concatenate(clips: &[AudioClip], gap_ms: u64) -> Option<AudioClip> {
    let first = clips.iter().find(|c| !c.is_empty())?;
    let (sample_rate, channels) = (first.sample_rate, first.channels);
    let gap = AudioClip::silence(gap_ms, sample_rate, channels);

    let mut combined = AudioClip::new(Vec::new(), sample_rate, channels);
    for clip in clips.iter().filter(|c| !c.is_empty()) {
        if clip.channels != channels {
            warn!(
                "Skipping clip with {} channel(s) while joining {}-channel audio",
                clip.channels, channels
            );
            continue;
        }

        if !combined.is_empty() {
            combined.samples.extend_from_slice(&gap.samples);
        }
        let clip = clip.resampled(sample_rate);
        combined.samples.extend_from_slice(&clip.samples);
    }

    Some(combined)
}
