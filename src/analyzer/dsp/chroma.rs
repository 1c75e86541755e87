// Chromagram from a power spectrogram.
//
// Each FFT bin above the lowest tracked pitch is folded onto the nearest of
// the 12 pitch classes (C = 0). Frames are scaled so their strongest class is
// 1; silent frames stay at 0.

/// Reference tuning for pitch-class assignment.
const A4_HZ: f64 = 440.0;
/// Bins below C1 carry no reliable pitch information at typical FFT sizes.
const MIN_PITCH_HZ: f64 = 32.7;

pub const N_CHROMA: usize = 12;

/// Pitch class of a frequency, C = 0 .. B = 11.
pub fn pitch_class(hz: f64) -> usize {
    // MIDI 69 = A4, MIDI 60 = C4
    let midi = 69.0 + 12.0 * (hz / A4_HZ).log2();
    (midi.round() as i64).rem_euclid(12) as usize
}

/// Bin → pitch class lookup for one FFT size and sample rate.
pub struct ChromaMap {
    classes: Vec<Option<usize>>,
}

impl ChromaMap {
    pub fn new(sample_rate: u32, n_fft: usize) -> Self {
        let bin_hz = sample_rate as f64 / n_fft as f64;
        let classes = (0..n_fft / 2 + 1)
            .map(|k| {
                let hz = k as f64 * bin_hz;
                (hz >= MIN_PITCH_HZ).then(|| pitch_class(hz))
            })
            .collect();
        Self { classes }
    }

    /// Max-normalised pitch-class energies for one power frame.
    pub fn frame(&self, power_frame: &[f32]) -> [f64; N_CHROMA] {
        let mut chroma = [0.0_f64; N_CHROMA];
        for (class, &p) in self.classes.iter().zip(power_frame) {
            if let Some(c) = class {
                chroma[*c] += p as f64;
            }
        }
        let peak = chroma.iter().copied().fold(0.0, f64::max);
        if peak > f64::MIN_POSITIVE {
            for v in &mut chroma {
                *v /= peak;
            }
        }
        chroma
    }
}
