// Per-frame spectral and temporal descriptors.
//
// Spectral functions take one magnitude frame plus the bin width in Hz.
// Silent frames yield 0 rather than dividing by zero.

/// Fraction of cumulative magnitude that defines the rolloff frequency.
pub const ROLLOFF_PERCENT: f64 = 0.85;

/// Samples at or below this magnitude count as zero for crossing detection.
const ZERO_THRESHOLD: f32 = 1e-10;

/// Weighted mean frequency: Σ f_k |X_k| / Σ |X_k|.
pub fn centroid(frame: &[f32], bin_hz: f64) -> f64 {
    let total: f64 = frame.iter().map(|&m| m as f64).sum();
    if total <= f64::MIN_POSITIVE {
        return 0.0;
    }
    let weighted: f64 = frame
        .iter()
        .enumerate()
        .map(|(k, &m)| k as f64 * bin_hz * m as f64)
        .sum();
    weighted / total
}

/// Second-order spectral bandwidth around `centroid_hz`.
pub fn bandwidth(frame: &[f32], bin_hz: f64, centroid_hz: f64) -> f64 {
    let total: f64 = frame.iter().map(|&m| m as f64).sum();
    if total <= f64::MIN_POSITIVE {
        return 0.0;
    }
    let spread: f64 = frame
        .iter()
        .enumerate()
        .map(|(k, &m)| {
            let d = k as f64 * bin_hz - centroid_hz;
            (m as f64 / total) * d * d
        })
        .sum();
    spread.sqrt()
}

/// Lowest frequency below which `ROLLOFF_PERCENT` of the magnitude lies.
pub fn rolloff(frame: &[f32], bin_hz: f64) -> f64 {
    let total: f64 = frame.iter().map(|&m| m as f64).sum();
    let threshold = ROLLOFF_PERCENT * total;

    let mut cumulative = 0.0;
    for (k, &m) in frame.iter().enumerate() {
        cumulative += m as f64;
        if cumulative >= threshold {
            return k as f64 * bin_hz;
        }
    }
    (frame.len().saturating_sub(1)) as f64 * bin_hz
}

/// Root-mean-square of a time-domain frame.
pub fn rms(frame: &[f32]) -> f64 {
    if frame.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = frame.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum_sq / frame.len() as f64).sqrt()
}

/// Sign changes per sample within a time-domain frame. Zero counts as positive.
pub fn zero_crossing_rate(frame: &[f32]) -> f64 {
    if frame.is_empty() {
        return 0.0;
    }
    let negative = |s: f32| s.abs() > ZERO_THRESHOLD && s < 0.0;
    let crossings = frame
        .windows(2)
        .filter(|w| negative(w[0]) != negative(w[1]))
        .count();
    crossings as f64 / frame.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centroid_single_bin() {
        let mut frame = vec![0.0; 10];
        frame[4] = 2.0;
        assert!((centroid(&frame, 100.0) - 400.0).abs() < 1e-9);
        assert!(bandwidth(&frame, 100.0, 400.0).abs() < 1e-9);
    }

    #[test]
    fn test_bandwidth_two_bins() {
        let mut frame = vec![0.0; 10];
        frame[2] = 1.0;
        frame[6] = 1.0;
        let c = centroid(&frame, 10.0);
        assert!((c - 40.0).abs() < 1e-9);
        // Both bins sit 20 Hz from the centroid
        assert!((bandwidth(&frame, 10.0, c) - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_silent_frame() {
        let frame = vec![0.0; 16];
        assert_eq!(centroid(&frame, 10.0), 0.0);
        assert_eq!(bandwidth(&frame, 10.0, 0.0), 0.0);
        assert_eq!(rolloff(&frame, 10.0), 0.0);
        assert_eq!(rms(&frame), 0.0);
        assert_eq!(zero_crossing_rate(&frame), 0.0);
    }

    #[test]
    fn test_rolloff_flat() {
        let frame = vec![1.0; 100];
        // 85 of 100 equal bins reached at index 84
        assert!((rolloff(&frame, 1.0) - 84.0).abs() < 1e-9);
    }

    #[test]
    fn test_rms_and_zcr() {
        let square: Vec<f32> = (0..8).map(|i| if i % 2 == 0 { 0.5 } else { -0.5 }).collect();
        assert!((rms(&square) - 0.5).abs() < 1e-9);
        assert!((zero_crossing_rate(&square) - 7.0 / 8.0).abs() < 1e-9);
    }
}
