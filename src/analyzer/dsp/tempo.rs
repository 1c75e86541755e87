// Global tempo estimate from an onset strength envelope.
//
// Algorithm:
// 1. Onset strength per frame = mean over mel bands of max(0, dB[t] - dB[t-1])
// 2. Autocorrelate the envelope over lags up to AC_WINDOW_SECS
// 3. Score each lag: ln(1 + 1e6 * r[lag] / r[0]) + log-normal prior around START_BPM
// 4. Take the best lag, refine it by parabolic interpolation, convert to BPM
//
// Only the scalar tempo is produced; beat positions are not tracked.

/// Centre of the tempo prior.
pub const START_BPM: f64 = 120.0;
/// Prior width in octaves.
pub const STD_BPM_OCTAVES: f64 = 1.0;
/// Fastest tempo considered.
pub const MAX_BPM: f64 = 320.0;
/// Longest autocorrelation lag, in seconds.
pub const AC_WINDOW_SECS: f64 = 8.0;

/// Onset strength envelope from a dB mel spectrogram (frame-major).
pub fn onset_envelope(mel_db: &[Vec<f64>]) -> Vec<f64> {
    if mel_db.is_empty() {
        return Vec::new();
    }
    let mut envelope = Vec::with_capacity(mel_db.len());
    envelope.push(0.0);
    for pair in mel_db.windows(2) {
        let (prev, cur) = (&pair[0], &pair[1]);
        let bands = cur.len().max(1) as f64;
        let flux: f64 = cur
            .iter()
            .zip(prev)
            .map(|(c, p)| (c - p).max(0.0))
            .sum();
        envelope.push(flux / bands);
    }
    envelope
}

fn log_prior(bpm: f64) -> f64 {
    let z = (bpm.log2() - START_BPM.log2()) / STD_BPM_OCTAVES;
    -0.5 * z * z
}

/// Tempo in BPM. Returns 0.0 for an envelope with no onset energy or too few
/// frames to hold a single beat period.
pub fn estimate_tempo(envelope: &[f64], sample_rate: u32, hop: usize) -> f64 {
    let frame_rate = sample_rate as f64 / hop as f64;
    let n = envelope.len();

    let min_lag = ((60.0 * frame_rate / MAX_BPM).ceil() as usize).max(1);
    let max_lag = ((AC_WINDOW_SECS * frame_rate).round() as usize).min(n.saturating_sub(1));
    if n == 0 || max_lag < min_lag {
        return 0.0;
    }

    let ac: Vec<f64> = (0..=max_lag)
        .map(|lag| {
            envelope[..n - lag]
                .iter()
                .zip(&envelope[lag..])
                .map(|(a, b)| a * b)
                .sum()
        })
        .collect();

    let energy = ac[0];
    if energy <= f64::MIN_POSITIVE {
        return 0.0;
    }

    let mut best_lag = min_lag;
    let mut best_score = f64::NEG_INFINITY;
    for lag in min_lag..=max_lag {
        let bpm = 60.0 * frame_rate / lag as f64;
        let score = (1.0 + 1e6 * (ac[lag] / energy).max(0.0)).ln() + log_prior(bpm);
        if score > best_score {
            best_score = score;
            best_lag = lag;
        }
    }

    let refined = refine_lag(&ac, best_lag);
    60.0 * frame_rate / refined
}

/// Parabolic interpolation of a peak at `lag` using its neighbours.
fn refine_lag(ac: &[f64], lag: usize) -> f64 {
    if lag == 0 || lag + 1 >= ac.len() {
        return lag as f64;
    }
    let (a, b, c) = (ac[lag - 1], ac[lag], ac[lag + 1]);
    let denom = a - 2.0 * b + c;
    if denom >= 0.0 {
        return lag as f64;
    }
    let offset = (0.5 * (a - c) / denom).clamp(-0.5, 0.5);
    lag as f64 + offset
}
