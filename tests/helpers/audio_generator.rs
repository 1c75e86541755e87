//! WAV fixtures for pipeline tests.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::Path;

pub const SAMPLE_RATE: u32 = 22_050;

/// Synthetic stand-ins for each genre, different enough that their feature
/// vectors separate cleanly.
#[derive(Debug, Clone, Copy)]
pub enum Style {
    /// Soft low tone with a slow vibrato.
    Mellow,
    /// Kick-like clicks over noise.
    Percussive,
    /// Bright high tone.
    Bright,
}

fn sample_at(style: Style, i: usize, variant: u64, rng: &mut StdRng) -> f32 {
    let t = i as f32 / SAMPLE_RATE as f32;
    let detune = 1.0 + variant as f32 * 0.01;
    match style {
        Style::Mellow => {
            let f = 220.0 * detune * (1.0 + 0.005 * (2.0 * std::f32::consts::PI * 5.0 * t).sin());
            0.25 * (2.0 * std::f32::consts::PI * f * t).sin()
        }
        Style::Percussive => {
            let beat = 60.0 / 140.0;
            let phase = t % beat;
            let kick = (-phase * 30.0).exp() * (2.0 * std::f32::consts::PI * 60.0 * t).sin();
            0.6 * kick + 0.1 * rng.gen_range(-1.0..1.0)
        }
        Style::Bright => 0.4 * (2.0 * std::f32::consts::PI * 3000.0 * detune * t).sin(),
    }
}

/// Write a mono 16-bit WAV of `secs` seconds in the given style.
pub fn generate_wav(path: &Path, style: Style, secs: f64, variant: u64) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    let mut rng = StdRng::seed_from_u64(variant);
    let total = (secs * SAMPLE_RATE as f64) as usize;
    for i in 0..total {
        let s = sample_at(style, i, variant, &mut rng).clamp(-1.0, 1.0);
        writer.write_sample((s * i16::MAX as f32) as i16)?;
    }
    writer.finalize()?;
    Ok(())
}
