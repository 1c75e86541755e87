use super::decode::{DecodeError, Waveform};
use thiserror::Error;

/// Clips shorter than this are rejected before extraction.
pub const MIN_DURATION_SECS: f64 = 3.0;

#[derive(Error, Debug)]
pub enum Rejection {
    #[error("decode failed: {0}")]
    Decode(DecodeError),
    #[error("too short: {duration_secs:.2}s (minimum {}s)", MIN_DURATION_SECS)]
    TooShort { duration_secs: f64 },
}

impl Rejection {
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Decode(_) => "decode_error",
            Self::TooShort { .. } => "too_short",
        }
    }
}

/// Pass a decode attempt through unchanged if it is usable for extraction.
///
/// A file that decodes to zero samples counts as too short, not as a decode
/// failure.
pub fn check(attempt: Result<Waveform, DecodeError>) -> Result<Waveform, Rejection> {
    let wave = match attempt {
        Ok(w) => w,
        Err(DecodeError::NoSamples) => {
            return Err(Rejection::TooShort { duration_secs: 0.0 });
        }
        Err(e) => return Err(Rejection::Decode(e)),
    };

    let duration_secs = wave.duration_secs();
    if duration_secs < MIN_DURATION_SECS {
        return Err(Rejection::TooShort { duration_secs });
    }
    Ok(wave)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wave(secs: f64, sr: u32) -> Waveform {
        let n = (secs * sr as f64).round() as usize;
        Waveform::new(vec![0.1; n.max(1)], sr).unwrap()
    }

    #[test]
    fn test_short_clips_rejected() {
        for secs in [0.1, 1.0, 2.5, 2.999] {
            let err = check(Ok(wave(secs, 1000))).unwrap_err();
            assert_eq!(err.reason(), "too_short", "{}s", secs);
        }
    }

    #[test]
    fn test_boundary_passes() {
        assert!(check(Ok(wave(3.0, 1000))).is_ok());
        assert!(check(Ok(wave(45.0, 1000))).is_ok());
    }

    #[test]
    fn test_decode_failures() {
        let err = check(Err(DecodeError::UnsupportedFormat("ogg".into()))).unwrap_err();
        assert_eq!(err.reason(), "decode_error");

        let err = check(Err(DecodeError::NoSamples)).unwrap_err();
        assert_eq!(err.reason(), "too_short");
    }

    #[test]
    fn test_waveform_untouched() {
        let w = check(Ok(wave(4.0, 500))).unwrap();
        assert_eq!(w.samples().len(), 2000);
        assert_eq!(w.sample_rate(), 500);
    }
}
