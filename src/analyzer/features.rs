use super::decode::Waveform;
use super::dsp::chroma::{ChromaMap, N_CHROMA};
use super::dsp::mel::{power_to_db, Dct, MelFilterbank};
use super::dsp::stft::{frames, pad_center, PadMode, StftProcessor};
use super::dsp::{spectral, tempo};
use crate::schema::{FeatureVector, FEATURE_COUNT};
use thiserror::Error;

/// Leading audio analyzed per clip, in seconds.
pub const MAX_DURATION_SECS: f64 = 30.0;
/// FFT size and frame length for every framed feature.
pub const N_FFT: usize = 2048;
/// Hop between frames.
pub const HOP_LENGTH: usize = 512;
/// Mel bands feeding MFCC and onset strength.
pub const N_MELS: usize = 128;
/// Cepstral coefficients kept.
pub const N_MFCC: usize = 20;

#[derive(Error, Debug, PartialEq)]
pub enum ExtractionError {
    #[error("Invalid max duration: {0}")]
    MaxDuration(f64),
    #[error("Signal produced no analysis frames")]
    NoFrames,
    #[error("Wrong number of MFCC means: {0}")]
    MfccCount(usize),
    #[error("Wrong feature vector length: {0}")]
    VectorLength(usize),
    #[error("Non-finite value in column {0}")]
    NonFinite(&'static str),
}

impl ExtractionError {
    pub fn reason(&self) -> &'static str {
        match self {
            Self::MaxDuration(_) => "invalid_max_duration",
            Self::NoFrames => "no_frames",
            Self::MfccCount(_) => "mfcc_count",
            Self::VectorLength(_) => "vector_length",
            Self::NonFinite(_) => "non_finite",
        }
    }
}

/// Turn a waveform into the 27-column feature vector.
///
/// Only the first `max_duration_secs` of audio are used. Both the corpus
/// builder and the predictor call this with [`MAX_DURATION_SECS`]; the output
/// for a given waveform and cap is deterministic.
pub fn extract(wave: &Waveform, max_duration_secs: f64) -> Result<FeatureVector, ExtractionError> {
    if !(max_duration_secs.is_finite() && max_duration_secs > 0.0) {
        return Err(ExtractionError::MaxDuration(max_duration_secs));
    }

    let sr = wave.sample_rate();
    let samples = wave.head(max_duration_secs);

    let stft = StftProcessor::new(N_FFT, HOP_LENGTH);
    let spec = stft.magnitude_spectrogram(samples, sr);
    if spec.n_frames() == 0 {
        return Err(ExtractionError::NoFrames);
    }
    let power = spec.power();
    let bin_hz = spec.bin_hz();

    // Mel spectrogram in dB, shared by tempo and MFCC
    let bank = MelFilterbank::new(sr, N_FFT, N_MELS);
    let mel_power: Vec<Vec<f64>> = power.iter().map(|f| bank.apply(f)).collect();
    let mel_db = power_to_db(&mel_power);

    let envelope = tempo::onset_envelope(&mel_db);
    let tempo_bpm = tempo::estimate_tempo(&envelope, sr, HOP_LENGTH);

    let chroma_map = ChromaMap::new(sr, N_FFT);
    let chroma_mean = mean(power.iter().map(|f| {
        let c = chroma_map.frame(f);
        c.iter().sum::<f64>() / N_CHROMA as f64
    }));

    let padded_zero = pad_center(samples, N_FFT, PadMode::Zero);
    let rms_mean = mean(frames(&padded_zero, N_FFT, HOP_LENGTH).map(spectral::rms));

    let centroids: Vec<f64> = spec
        .frames
        .iter()
        .map(|f| spectral::centroid(f, bin_hz))
        .collect();
    let centroid_mean = mean(centroids.iter().copied());
    let bandwidth_mean = mean(
        spec.frames
            .iter()
            .zip(&centroids)
            .map(|(f, &c)| spectral::bandwidth(f, bin_hz, c)),
    );
    let rolloff_mean = mean(spec.frames.iter().map(|f| spectral::rolloff(f, bin_hz)));

    let padded_edge = pad_center(samples, N_FFT, PadMode::Edge);
    let zcr_mean = mean(
        frames(&padded_edge, N_FFT, HOP_LENGTH).map(spectral::zero_crossing_rate),
    );

    let mfcc_means = mfcc_means(&mel_db);
    if mfcc_means.len() != N_MFCC {
        return Err(ExtractionError::MfccCount(mfcc_means.len()));
    }

    let mut values: Vec<f32> = vec![
        tempo_bpm as f32,
        chroma_mean as f32,
        rms_mean as f32,
        centroid_mean as f32,
        bandwidth_mean as f32,
        rolloff_mean as f32,
        zcr_mean as f32,
    ];
    values.extend(mfcc_means.iter().map(|&m| m as f32));

    let vector = assemble(&values)?;
    log::trace!(
        "Extracted {} features (tempo {:.1} BPM, centroid {:.0} Hz)",
        FEATURE_COUNT,
        vector.tempo(),
        centroid_mean
    );
    Ok(vector)
}

/// Per-coefficient mean of the MFCC matrix.
fn mfcc_means(mel_db: &[Vec<f64>]) -> Vec<f64> {
    let Some(first) = mel_db.first() else {
        return Vec::new();
    };
    let dct = Dct::new(first.len(), N_MFCC);
    let mut sums = vec![0.0_f64; N_MFCC];
    for frame in mel_db {
        for (s, c) in sums.iter_mut().zip(dct.transform(frame)) {
            *s += c;
        }
    }
    let n = mel_db.len() as f64;
    sums.into_iter().map(|s| s / n).collect()
}

fn assemble(values: &[f32]) -> Result<FeatureVector, ExtractionError> {
    FeatureVector::from_slice(values).map_err(|bad| match bad {
        Some(column) => ExtractionError::NonFinite(column),
        None => ExtractionError::VectorLength(values.len()),
    })
}

/// Arithmetic mean; 0.0 for an empty sequence.
fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if count == 0 { 0.0 } else { sum / count as f64 }
}
