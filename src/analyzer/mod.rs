pub mod decode;
pub mod dsp;
pub mod features;
pub mod gate;

use crate::schema::FeatureVector;
use decode::DecodeError;
use features::ExtractionError;
use gate::Rejection;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyzeError {
    #[error("Rejected ({r}): {0}", r = .0.reason())]
    Rejected(#[from] Rejection),
    #[error("Extraction failed ({r}): {0}", r = .0.reason())]
    Extraction(#[from] ExtractionError),
}

impl AnalyzeError {
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Rejected(r) => r.reason(),
            Self::Extraction(e) => e.reason(),
        }
    }
}

/// Gate an already-attempted decode and extract its features.
///
/// This is the single path from audio to feature vector; corpus building and
/// prediction both go through it.
pub fn analyze_waveform(
    attempt: Result<decode::Waveform, DecodeError>,
) -> Result<FeatureVector, AnalyzeError> {
    let wave = gate::check(attempt)?;
    let vector = features::extract(&wave, features::MAX_DURATION_SECS)?;
    Ok(vector)
}

/// Decode a file, gate it and extract its features.
pub fn analyze_file(path: &Path) -> Result<FeatureVector, AnalyzeError> {
    log::debug!(
        "Analyzing: {}",
        path.file_name().and_then(|f| f.to_str()).unwrap_or("?")
    );
    analyze_waveform(decode::load_audio(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_reason_and_message() {
        let short = decode::Waveform::new(vec![0.1; 8000], 8000);
        let err = analyze_waveform(short).unwrap_err();
        assert_eq!(err.reason(), "too_short");
        assert!(err.to_string().starts_with("Rejected (too_short): too short: 1.00s"));

        let err = analyze_waveform(Err(DecodeError::BitDepth(12))).unwrap_err();
        assert_eq!(err.reason(), "decode_error");
        assert!(err.to_string().contains("Unsupported bit depth: 12"));

        let err = AnalyzeError::from(ExtractionError::NoFrames);
        assert_eq!(err.to_string(), "Extraction failed (no_frames): Signal produced no analysis frames");
    }
}
