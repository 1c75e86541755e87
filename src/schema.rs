//! The feature schema shared by every phase.
//!
//! Column order here is the only definition in the crate. The corpus writer,
//! the dataset reader, the trainer and the predictor all go through these
//! constants, never through their own copies.

use sha2::{Digest, Sha256};

use crate::analyzer::features::{
    HOP_LENGTH, MAX_DURATION_SECS, N_FFT, N_MELS, N_MFCC,
};

/// Number of scalar features per sample.
pub const FEATURE_COUNT: usize = 27;

/// Feature column names, in vector order.
pub const FEATURE_COLUMNS: [&str; FEATURE_COUNT] = [
    "tempo",
    "chroma_stft",
    "rmse",
    "spectral_centroid",
    "spectral_bandwidth",
    "rolloff",
    "zero_crossing_rate",
    "mfcc1",
    "mfcc2",
    "mfcc3",
    "mfcc4",
    "mfcc5",
    "mfcc6",
    "mfcc7",
    "mfcc8",
    "mfcc9",
    "mfcc10",
    "mfcc11",
    "mfcc12",
    "mfcc13",
    "mfcc14",
    "mfcc15",
    "mfcc16",
    "mfcc17",
    "mfcc18",
    "mfcc19",
    "mfcc20",
];

/// Name of the trailing label column in the dataset file.
pub const LABEL_COLUMN: &str = "label";

/// Index of the first MFCC column.
pub const MFCC_OFFSET: usize = 7;

/// Full dataset header: the 27 feature columns followed by `label`.
pub fn dataset_header() -> Vec<&'static str> {
    let mut header = FEATURE_COLUMNS.to_vec();
    header.push(LABEL_COLUMN);
    header
}

/// Column index for a feature name.
pub fn column_index(name: &str) -> Option<usize> {
    FEATURE_COLUMNS.iter().position(|c| *c == name)
}

/// Hex SHA-256 over the column list and the extraction constants.
///
/// Two builds produce the same fingerprint only if they would turn the same
/// waveform into the same vector layout.
pub fn fingerprint() -> String {
    let mut hasher = Sha256::new();
    hasher.update(FEATURE_COLUMNS.join(",").as_bytes());
    hasher.update(
        format!(
            "|max_duration={}|n_fft={}|hop={}|n_mels={}|n_mfcc={}",
            MAX_DURATION_SECS, N_FFT, HOP_LENGTH, N_MELS, N_MFCC
        )
        .as_bytes(),
    );
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// A feature vector in schema order.
///
/// Values are stored at `f32` width; construction rejects anything that is
/// not exactly [`FEATURE_COUNT`] finite values.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    values: [f32; FEATURE_COUNT],
}

impl FeatureVector {
    /// Build from exactly 27 values. Returns the offending column on a
    /// non-finite value, or `Err(None)` on a length mismatch.
    pub fn from_slice(values: &[f32]) -> Result<Self, Option<&'static str>> {
        if values.len() != FEATURE_COUNT {
            return Err(None);
        }
        let mut out = [0.0_f32; FEATURE_COUNT];
        for (i, &v) in values.iter().enumerate() {
            if !v.is_finite() {
                return Err(Some(FEATURE_COLUMNS[i]));
            }
            out[i] = v;
        }
        Ok(Self { values: out })
    }

    pub fn values(&self) -> &[f32; FEATURE_COUNT] {
        &self.values
    }

    /// Values widened to `f64`, in schema order.
    pub fn to_f64(&self) -> Vec<f64> {
        self.values.iter().map(|&v| v as f64).collect()
    }

    pub fn get(&self, name: &str) -> Option<f32> {
        column_index(name).map(|i| self.values[i])
    }

    pub fn tempo(&self) -> f32 {
        self.values[0]
    }

    /// MFCC coefficients 1..=20.
    pub fn mfccs(&self) -> &[f32] {
        &self.values[MFCC_OFFSET..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_layout() {
        assert_eq!(FEATURE_COLUMNS.len(), 27);
        assert_eq!(FEATURE_COLUMNS[0], "tempo");
        assert_eq!(FEATURE_COLUMNS[6], "zero_crossing_rate");
        assert_eq!(FEATURE_COLUMNS[MFCC_OFFSET], "mfcc1");
        assert_eq!(FEATURE_COLUMNS[26], "mfcc20");
        for i in 1..=20 {
            assert_eq!(column_index(&format!("mfcc{}", i)), Some(MFCC_OFFSET + i - 1));
        }
    }

    #[test]
    fn test_dataset_header() {
        let header = dataset_header();
        assert_eq!(header.len(), 28);
        assert_eq!(header.last(), Some(&"label"));
        assert_eq!(
            header[..7].join(","),
            "tempo,chroma_stft,rmse,spectral_centroid,spectral_bandwidth,rolloff,zero_crossing_rate"
        );
    }

    #[test]
    fn test_fingerprint_stable() {
        let a = fingerprint();
        assert_eq!(a, fingerprint());
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_feature_vector_rejects_bad_input() {
        assert_eq!(FeatureVector::from_slice(&[1.0; 26]), Err(None));
        let mut values = [1.0_f32; 27];
        values[3] = f32::NAN;
        assert_eq!(FeatureVector::from_slice(&values), Err(Some("spectral_centroid")));
        values[3] = 2.0;
        let v = FeatureVector::from_slice(&values).unwrap();
        assert_eq!(v.get("spectral_centroid"), Some(2.0));
        assert_eq!(v.mfccs().len(), 20);
    }
}
