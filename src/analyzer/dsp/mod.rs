//! Signal-processing primitives behind the feature extractor.

pub mod chroma;
pub mod mel;
pub mod spectral;
pub mod stft;
pub mod tempo;
