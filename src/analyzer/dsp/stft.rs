// Short-time Fourier transform over centred, Hann-windowed frames.
//
// Frames are centred by padding frame_len / 2 samples on both sides, so
// frame t covers samples around t * hop. The magnitude spectrogram keeps only
// the non-negative frequency bins (n_fft / 2 + 1).

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

/// How the signal is extended before centred framing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PadMode {
    Zero,
    Edge,
}

/// Pad `samples` by `frame_len / 2` on each side and return the padded buffer.
pub fn pad_center(samples: &[f32], frame_len: usize, mode: PadMode) -> Vec<f32> {
    let pad = frame_len / 2;
    let (head, tail) = match mode {
        PadMode::Zero => (0.0, 0.0),
        PadMode::Edge => (
            samples.first().copied().unwrap_or(0.0),
            samples.last().copied().unwrap_or(0.0),
        ),
    };
    let mut padded = Vec::with_capacity(samples.len() + 2 * pad);
    padded.resize(pad, head);
    padded.extend_from_slice(samples);
    padded.resize(samples.len() + 2 * pad, tail);
    padded
}

/// Iterate centred frames of `frame_len` samples every `hop` samples.
pub fn frames(padded: &[f32], frame_len: usize, hop: usize) -> impl Iterator<Item = &[f32]> {
    padded.windows(frame_len).step_by(hop.max(1))
}

/// Periodic Hann window (denominator `n`, not `n - 1`), as librosa uses for
/// STFT frames; window crates such as apodize only provide the symmetric form.
pub fn hann(n: usize) -> Vec<f32> {
    (0..n)
        .map(|i| 0.5 - 0.5 * ((2.0 * std::f32::consts::PI * i as f32) / n as f32).cos())
        .collect()
}

/// Magnitude spectrogram, frame-major: `frames[t][k]`.
#[derive(Debug, Clone)]
pub struct Spectrogram {
    pub frames: Vec<Vec<f32>>,
    pub n_fft: usize,
    pub sample_rate: u32,
}

impl Spectrogram {
    pub fn n_bins(&self) -> usize {
        self.n_fft / 2 + 1
    }

    pub fn n_frames(&self) -> usize {
        self.frames.len()
    }

    /// Width of one frequency bin in Hz.
    pub fn bin_hz(&self) -> f64 {
        self.sample_rate as f64 / self.n_fft as f64
    }

    /// Squared magnitudes, same layout.
    pub fn power(&self) -> Vec<Vec<f32>> {
        self.frames
            .iter()
            .map(|f| f.iter().map(|m| m * m).collect())
            .collect()
    }
}

/// Reusable forward-FFT plan plus its analysis window.
pub struct StftProcessor {
    fft: Arc<dyn Fft<f32>>,
    n_fft: usize,
    hop: usize,
    window: Vec<f32>,
}

impl StftProcessor {
    pub fn new(n_fft: usize, hop: usize) -> Self {
        let mut planner = FftPlanner::new();
        Self {
            fft: planner.plan_fft_forward(n_fft),
            n_fft,
            hop,
            window: hann(n_fft),
        }
    }

    pub fn magnitude_spectrogram(&self, samples: &[f32], sample_rate: u32) -> Spectrogram {
        let padded = pad_center(samples, self.n_fft, PadMode::Zero);
        let n_bins = self.n_fft / 2 + 1;

        let mut buffer = vec![Complex::new(0.0_f32, 0.0); self.n_fft];
        let mut scratch = vec![Complex::new(0.0_f32, 0.0); self.fft.get_inplace_scratch_len()];

        let frames = frames(&padded, self.n_fft, self.hop)
            .map(|frame| {
                for ((slot, &s), &w) in buffer.iter_mut().zip(frame).zip(&self.window) {
                    *slot = Complex::new(s * w, 0.0);
                }
                self.fft.process_with_scratch(&mut buffer, &mut scratch);
                buffer[..n_bins].iter().map(|c| c.norm()).collect()
            })
            .collect();

        Spectrogram {
            frames,
            n_fft: self.n_fft,
            sample_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_count() {
        let samples = vec![0.0; 10_000];
        let padded = pad_center(&samples, 2048, PadMode::Zero);
        assert_eq!(padded.len(), 10_000 + 2048);
        // 1 + len / hop for centred frames
        assert_eq!(frames(&padded, 2048, 512).count(), 1 + 10_000 / 512);
    }

    #[test]
    fn test_edge_padding() {
        let padded = pad_center(&[1.0, 2.0, 3.0], 4, PadMode::Edge);
        assert_eq!(padded, vec![1.0, 1.0, 1.0, 2.0, 3.0, 3.0, 3.0]);
    }

    #[test]
    fn test_sine_peak_bin() {
        let sr = 8000;
        let freq = 1000.0;
        let samples: Vec<f32> = (0..sr)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sr as f32).sin())
            .collect();
        let stft = StftProcessor::new(1024, 256);
        let spec = stft.magnitude_spectrogram(&samples, sr as u32);
        assert_eq!(spec.n_bins(), 513);

        let mid = &spec.frames[spec.n_frames() / 2];
        let peak = mid
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(k, _)| k)
            .unwrap();
        assert_eq!(peak, (freq as f64 / spec.bin_hz()).round() as usize);
    }

    #[test]
    fn test_hann_is_periodic() {
        let w = hann(4);
        let expected = [0.0, 0.5, 1.0, 0.5];
        for (a, b) in w.iter().zip(expected) {
            assert!((a - b).abs() < 1e-6);
        }
    }
}
