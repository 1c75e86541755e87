use crate::SUPPORTED_EXTENSIONS;
use hound::{SampleFormat, WavReader};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("WAV decode error: {0}")]
    Wav(#[from] hound::Error),
    #[error("Unsupported bit depth: {0}")]
    BitDepth(u16),
    #[error("Invalid sample rate: {0}")]
    SampleRate(u32),
    #[error("File contains no samples")]
    NoSamples,
    #[error("Non-finite sample at index {0}")]
    NonFiniteSample(usize),
}

/// Decoded mono audio.
///
/// Always holds at least one finite sample and a positive sample rate.
#[derive(Debug, Clone)]
pub struct Waveform {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl Waveform {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Result<Self, DecodeError> {
        if sample_rate == 0 {
            return Err(DecodeError::SampleRate(sample_rate));
        }
        if samples.is_empty() {
            return Err(DecodeError::NoSamples);
        }
        if let Some(i) = samples.iter().position(|s| !s.is_finite()) {
            return Err(DecodeError::NonFiniteSample(i));
        }
        Ok(Self {
            samples,
            sample_rate,
        })
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Leading samples covering at most `max_secs`.
    pub fn head(&self, max_secs: f64) -> &[f32] {
        let cap = (max_secs * self.sample_rate as f64).floor() as usize;
        &self.samples[..self.samples.len().min(cap.max(1))]
    }
}

/// Load a WAV file as a mono waveform at its native sample rate.
pub fn load_audio(path: &Path) -> Result<Waveform, DecodeError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    if !SUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(DecodeError::UnsupportedFormat(ext));
    }

    let reader = WavReader::open(path)?;
    decode_reader(reader)
}

fn decode_reader<R: std::io::Read>(mut reader: WavReader<R>) -> Result<Waveform, DecodeError> {
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
        SampleFormat::Int => {
            if spec.bits_per_sample == 0 || spec.bits_per_sample > 32 {
                return Err(DecodeError::BitDepth(spec.bits_per_sample));
            }
            let scale = (1_i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()?
        }
    };

    // Average channels; a trailing partial frame is dropped
    let samples: Vec<f32> = interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect();

    log::trace!(
        "Decoded {} frames, {} channel(s) at {} Hz",
        samples.len(),
        channels,
        spec.sample_rate
    );

    Waveform::new(samples, spec.sample_rate)
}
