//! Parametrized ECG waveform synthesis.
//!
//! Builds one base PQRST complex as a fixed sequence of scalar
//! segments (P-wave lobe, flat PQ, sharp QRS excursion, ST segment,
//! T-wave lobe, flat TP), then mutates it per clinical pattern and
//! replays it for the configured number of beats. Uniform noise is
//! added per sample as the final step.
//!
//! The random source is owned by the generator and seedable, so every
//! randomized branch (afib R-R spacing, PVC insertion, noise) is
//! deterministic under test.

mod stream;

pub use stream::{stream, stream_pattern, StreamHandle};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::{HeartwatchError, Result};

/// Samples in the P-wave lobe.
const P_WAVE_LEN: usize = 10;
/// Samples in the flat PQ segment.
const PQ_LEN: usize = 5;
/// Index of the Q deflection (start of the QRS excursion).
const QRS_START: usize = P_WAVE_LEN + PQ_LEN;
/// Index of the first ST-segment sample.
const ST_START: usize = QRS_START + 3;
/// Samples in the ST segment.
const ST_LEN: usize = 10;
/// Index of the first T-wave sample.
const T_START: usize = ST_START + ST_LEN;
/// Samples in the T-wave lobe.
const T_WAVE_LEN: usize = 15;
/// Samples in the flat TP segment.
const TP_LEN: usize = 20;

/// Named clinical ECG pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EcgPattern {
    /// Normal sinus rhythm
    Normal,
    /// Fast rate, slightly reduced amplitude
    Tachycardia,
    /// Slow rate, wider complexes
    Bradycardia,
    /// Fibrillatory baseline, irregular R-R spacing
    AtrialFibrillation,
    /// Elevated ST segment (ischemia indicator)
    StElevation,
    /// Intermittent wide inverted ectopic beats
    PrematureVentricularContraction,
}

impl EcgPattern {
    /// Heart rate used when streaming this pattern without an explicit
    /// configuration.
    pub fn default_heart_rate(&self) -> u32 {
        match self {
            EcgPattern::Normal => 72,
            EcgPattern::Tachycardia => 120,
            EcgPattern::Bradycardia => 45,
            EcgPattern::AtrialFibrillation => 110,
            EcgPattern::StElevation => 90,
            EcgPattern::PrematureVentricularContraction => 85,
        }
    }
}

/// Configuration for one generation run. Immutable once the run starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaveformConfig {
    /// Pattern to synthesize
    pub pattern: EcgPattern,
    /// Heart rate in bpm
    pub heart_rate: u32,
    /// Run length in seconds
    pub duration_secs: f64,
    /// Baseline amplitude scale
    pub amplitude: f64,
    /// Uniform noise amplitude, in [0, 1]
    pub noise_level: f64,
}

impl Default for WaveformConfig {
    fn default() -> Self {
        Self {
            pattern: EcgPattern::Normal,
            heart_rate: 72,
            duration_secs: 10.0,
            amplitude: 1.0,
            noise_level: 0.03,
        }
    }
}

impl WaveformConfig {
    /// Configuration for a pattern at its default stream rate.
    pub fn for_pattern(pattern: EcgPattern) -> Self {
        Self {
            pattern,
            heart_rate: pattern.default_heart_rate(),
            ..Self::default()
        }
    }

    /// Fail fast on malformed parameters; no partial output is ever
    /// produced from an invalid configuration.
    pub fn validate(&self) -> Result<()> {
        if self.heart_rate == 0 {
            return Err(HeartwatchError::InvalidConfig(
                "heart rate must be positive".into(),
            ));
        }
        if !(self.duration_secs > 0.0) {
            return Err(HeartwatchError::InvalidConfig(
                "duration must be positive".into(),
            ));
        }
        if !(self.amplitude > 0.0) {
            return Err(HeartwatchError::InvalidConfig(
                "amplitude must be positive".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.noise_level) {
            return Err(HeartwatchError::InvalidConfig(
                "noise level must be in [0, 1]".into(),
            ));
        }
        Ok(())
    }

    /// Number of complexes in one run: `ceil(rate/60 × duration)`.
    pub fn beats(&self) -> usize {
        (f64::from(self.heart_rate) / 60.0 * self.duration_secs).ceil() as usize
    }
}

/// ECG waveform generator with an owned, seedable random source.
pub struct WaveformGenerator {
    config: WaveformConfig,
    rng: StdRng,
}

impl WaveformGenerator {
    /// Create a generator with a random seed.
    pub fn new(config: WaveformConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            rng: StdRng::from_entropy(),
        })
    }

    /// Create a generator with a fixed seed for deterministic output.
    pub fn with_seed(config: WaveformConfig, seed: u64) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    /// The configuration this generator was built with.
    pub fn config(&self) -> &WaveformConfig {
        &self.config
    }

    /// Generate a complete run: concatenated complexes plus noise.
    pub fn generate(&mut self) -> Vec<f64> {
        let beats = self.config.beats();
        let base = self.build_complex(self.config.pattern);

        let mut signal = Vec::with_capacity(beats * base.len());
        for beat in 0..beats {
            // Irregular R-R spacing between afib complexes
            if self.config.pattern == EcgPattern::AtrialFibrillation
                && self.rng.gen::<f64>() > 0.7
            {
                let extra = self.rng.gen_range(0..15);
                signal.extend(std::iter::repeat(0.0).take(extra));
            }

            // ~30% of beats after the first become ectopic PVC beats
            if self.config.pattern == EcgPattern::PrematureVentricularContraction
                && beat > 0
                && self.rng.gen::<f64>() > 0.7
            {
                let pvc = self.build_complex(EcgPattern::PrematureVentricularContraction);
                signal.extend(pvc);
            } else {
                signal.extend(base.iter().copied());
            }
        }

        let noise = self.config.noise_level;
        for sample in &mut signal {
            *sample += (self.rng.gen::<f64>() * 2.0 - 1.0) * noise;
        }
        signal
    }

    /// Build one PQRST complex for a pattern.
    fn build_complex(&mut self, pattern: EcgPattern) -> Vec<f64> {
        let a = self.config.amplitude;
        let mut points = Vec::with_capacity(P_WAVE_LEN + PQ_LEN + 3 + ST_LEN + T_WAVE_LEN + TP_LEN);

        for i in 0..P_WAVE_LEN {
            points.push(0.2 * a * (i as f64 / P_WAVE_LEN as f64 * std::f64::consts::PI).sin());
        }
        points.extend(std::iter::repeat(0.0).take(PQ_LEN));
        points.push(-0.3 * a); // Q
        points.push(1.2 * a); // R
        points.push(-0.2 * a); // S
        points.extend(std::iter::repeat(0.0).take(ST_LEN));
        for i in 0..T_WAVE_LEN {
            points.push(0.3 * a * (i as f64 / T_WAVE_LEN as f64 * std::f64::consts::PI).sin());
        }
        points.extend(std::iter::repeat(0.0).take(TP_LEN));

        match pattern {
            EcgPattern::Normal => {}
            EcgPattern::Tachycardia => {
                for p in &mut points {
                    *p *= 0.9;
                }
            }
            EcgPattern::Bradycardia => {
                points.extend(std::iter::repeat(0.0).take(10));
            }
            EcgPattern::AtrialFibrillation => {
                // Fibrillatory baseline instead of organized P waves
                for (i, p) in points.iter_mut().take(P_WAVE_LEN).enumerate() {
                    let jitter = self.rng.gen::<f64>() * 2.0;
                    *p = 0.1 * a * (i as f64 * 3.0 + jitter).sin();
                }
                let extend_by = self.rng.gen_range(0..10);
                points.extend(std::iter::repeat(0.0).take(extend_by));
            }
            EcgPattern::StElevation => {
                for p in points.iter_mut().skip(ST_START).take(ST_LEN) {
                    *p = 0.3 * a;
                }
            }
            EcgPattern::PrematureVentricularContraction => {
                points[QRS_START] = -0.5 * a;
                points[QRS_START + 1] = -1.2 * a;
                points[QRS_START + 2] = -0.5 * a;
                for i in 0..T_WAVE_LEN {
                    points[T_START + i] =
                        -0.3 * a * (i as f64 / T_WAVE_LEN as f64 * std::f64::consts::PI).sin();
                }
            }
        }

        points
    }
}
