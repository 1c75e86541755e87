// Mel filterbank, decibel scaling and cepstral coefficients.
//
// Mel scale is the Slaney variant: linear below 1 kHz, logarithmic above.
// Filters are triangular and area-normalised, spanning 0 Hz to Nyquist.

const F_SP: f64 = 200.0 / 3.0;
const MIN_LOG_HZ: f64 = 1000.0;
const MIN_LOG_MEL: f64 = MIN_LOG_HZ / F_SP;

/// Floor applied before taking logarithms.
pub const AMIN: f64 = 1e-10;
/// Dynamic range kept below the spectrogram maximum, in dB.
pub const TOP_DB: f64 = 80.0;

fn log_step() -> f64 {
    6.4_f64.ln() / 27.0
}

pub fn hz_to_mel(hz: f64) -> f64 {
    if hz >= MIN_LOG_HZ {
        MIN_LOG_MEL + (hz / MIN_LOG_HZ).ln() / log_step()
    } else {
        hz / F_SP
    }
}

pub fn mel_to_hz(mel: f64) -> f64 {
    if mel >= MIN_LOG_MEL {
        MIN_LOG_HZ * (log_step() * (mel - MIN_LOG_MEL)).exp()
    } else {
        F_SP * mel
    }
}

/// Triangular mel filters over `n_fft / 2 + 1` FFT bins.
pub struct MelFilterbank {
    weights: Vec<Vec<f64>>,
}

impl MelFilterbank {
    pub fn new(sample_rate: u32, n_fft: usize, n_mels: usize) -> Self {
        let n_bins = n_fft / 2 + 1;
        let fmax = sample_rate as f64 / 2.0;
        let fft_freqs: Vec<f64> = (0..n_bins)
            .map(|k| k as f64 * sample_rate as f64 / n_fft as f64)
            .collect();

        // n_mels + 2 edge frequencies, equally spaced in mel
        let mel_max = hz_to_mel(fmax);
        let edges: Vec<f64> = (0..n_mels + 2)
            .map(|i| mel_to_hz(mel_max * i as f64 / (n_mels + 1) as f64))
            .collect();

        let weights = (0..n_mels)
            .map(|m| {
                let (lo, center, hi) = (edges[m], edges[m + 1], edges[m + 2]);
                let norm = 2.0 / (hi - lo);
                fft_freqs
                    .iter()
                    .map(|&f| {
                        let lower = (f - lo) / (center - lo);
                        let upper = (hi - f) / (hi - center);
                        lower.min(upper).max(0.0) * norm
                    })
                    .collect()
            })
            .collect();

        Self { weights }
    }

    pub fn n_mels(&self) -> usize {
        self.weights.len()
    }

    /// Mel band energies for one power-spectrum frame.
    pub fn apply(&self, power_frame: &[f32]) -> Vec<f64> {
        self.weights
            .iter()
            .map(|w| {
                w.iter()
                    .zip(power_frame)
                    .map(|(&wk, &p)| wk * p as f64)
                    .sum()
            })
            .collect()
    }
}

/// Convert a power spectrogram to dB (reference 1.0), clipped to `TOP_DB`
/// below its global maximum.
pub fn power_to_db(frames: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let mut db: Vec<Vec<f64>> = frames
        .iter()
        .map(|f| f.iter().map(|&p| 10.0 * p.max(AMIN).log10()).collect())
        .collect();

    let peak = db
        .iter()
        .flatten()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);
    let floor = peak - TOP_DB;
    for v in db.iter_mut().flatten() {
        *v = v.max(floor);
    }
    db
}

/// Orthonormal DCT-II basis: `n_out` rows of length `n_in`.
pub struct Dct {
    basis: Vec<Vec<f64>>,
}

impl Dct {
    pub fn new(n_in: usize, n_out: usize) -> Self {
        let n = n_in as f64;
        let basis = (0..n_out)
            .map(|k| {
                let scale = if k == 0 { (1.0 / n).sqrt() } else { (2.0 / n).sqrt() };
                (0..n_in)
                    .map(|i| {
                        scale
                            * (std::f64::consts::PI * k as f64 * (2.0 * i as f64 + 1.0) / (2.0 * n))
                                .cos()
                    })
                    .collect()
            })
            .collect();
        Self { basis }
    }

    pub fn transform(&self, input: &[f64]) -> Vec<f64> {
        self.basis
            .iter()
            .map(|row| row.iter().zip(input).map(|(b, x)| b * x).sum())
            .collect()
    }
}
