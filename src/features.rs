//! Signal feature extraction from a rolling ECG sample buffer.
//!
//! Detects R peaks, derives a heart-rate estimate and an R-R
//! irregularity measure, and checks a fixed ST-segment window for
//! elevation. The peak threshold and ST window are demonstration
//! constants carried as configuration; they have no stated clinical
//! basis and the three-tier status cutoff is a design choice, not a
//! clinical guarantee.

use serde::{Deserialize, Serialize};

use crate::domain::sample::SampleBuffer;
use crate::risk::EcgFeature;

/// Classification of the extracted signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalStatus {
    /// Buffer below the minimum analysis window; nothing to report yet.
    /// An expected steady-state condition during monitoring startup.
    Insufficient,
    /// No concerning features
    Normal,
    /// Mild rhythm irregularity
    Warning,
    /// Marked irregularity or ST elevation
    Critical,
}

/// Extraction thresholds and window geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Minimum buffer length before any analysis is attempted
    pub min_samples: usize,
    /// Amplitude a sample must exceed to count as an R peak
    pub peak_threshold: f64,
    /// First buffer index of the assumed ST window
    pub st_window_start: usize,
    /// Length of the assumed ST window
    pub st_window_len: usize,
    /// Mean ST amplitude above which elevation is flagged (mV)
    pub st_threshold_mv: f64,
    /// Spacing between consecutive samples (ms)
    pub sample_interval_ms: u64,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            min_samples: 100,
            peak_threshold: 0.5,
            st_window_start: 5,
            st_window_len: 5,
            st_threshold_mv: 0.2,
            sample_interval_ms: 20,
        }
    }
}

/// Features derived from the current sample buffer.
///
/// Never persisted; always recomputed from the buffer contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EcgFeatureSet {
    /// Detected feature tags (input to the risk scorer)
    pub features: Vec<EcgFeature>,
    /// Estimated heart rate in bpm (0 when undeterminable)
    pub heart_rate: u32,
    /// R-R interval irregularity in [0, 1]
    pub irregularity: f64,
    /// Mean amplitude over the ST window (mV-equivalent)
    pub st_deviation_mv: f64,
    /// Overall signal classification
    pub status: SignalStatus,
}

impl EcgFeatureSet {
    /// The neutral result returned for an under-filled buffer.
    pub fn insufficient() -> Self {
        Self {
            features: Vec::new(),
            heart_rate: 0,
            irregularity: 0.0,
            st_deviation_mv: 0.0,
            status: SignalStatus::Insufficient,
        }
    }
}

/// Pure, synchronous feature extractor. Performs no I/O; safe to call
/// from the data-arrival path.
#[derive(Debug, Clone, Default)]
pub struct FeatureExtractor {
    config: ExtractorConfig,
}

impl FeatureExtractor {
    /// Create an extractor with explicit thresholds.
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    /// The active configuration.
    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Extract features from a monitoring session's buffer.
    pub fn extract(&self, buffer: &SampleBuffer) -> EcgFeatureSet {
        self.extract_from_values(&buffer.values())
    }

    /// Extract features from a raw value slice.
    pub fn extract_from_values(&self, values: &[f64]) -> EcgFeatureSet {
        if values.len() < self.config.min_samples {
            return EcgFeatureSet::insufficient();
        }

        let peaks = self.find_peaks(values);
        let irregularity = self.irregularity(&peaks);
        let heart_rate = self.heart_rate(&peaks);
        let st_deviation_mv = self.st_window_mean(values);
        let st_elevated = st_deviation_mv > self.config.st_threshold_mv;

        let mut features = Vec::new();
        if st_elevated {
            features.push(EcgFeature::StElevation);
        }
        if irregularity > 0.3 {
            features.push(EcgFeature::AtrialFibrillation);
        }
        if heart_rate > 100 {
            features.push(EcgFeature::Tachycardia);
        } else if heart_rate > 0 && heart_rate < 60 {
            features.push(EcgFeature::Bradycardia);
        }

        let status = if irregularity > 0.3 || st_elevated {
            SignalStatus::Critical
        } else if irregularity > 0.15 {
            SignalStatus::Warning
        } else {
            SignalStatus::Normal
        };

        EcgFeatureSet {
            features,
            heart_rate,
            irregularity,
            st_deviation_mv,
            status,
        }
    }

    /// Interior samples above the amplitude threshold and strictly
    /// greater than both neighbors.
    fn find_peaks(&self, values: &[f64]) -> Vec<usize> {
        let mut peaks = Vec::new();
        for i in 1..values.len().saturating_sub(1) {
            if values[i] > self.config.peak_threshold
                && values[i] > values[i - 1]
                && values[i] > values[i + 1]
            {
                peaks.push(i);
            }
        }
        peaks
    }

    /// `min(1, stddev(intervals) / (mean(intervals) × 0.5))`; fewer
    /// than two peaks means no rhythm to judge.
    fn irregularity(&self, peaks: &[usize]) -> f64 {
        if peaks.len() < 2 {
            return 0.0;
        }
        let intervals: Vec<f64> = peaks.windows(2).map(|w| (w[1] - w[0]) as f64).collect();
        let mean = intervals.iter().sum::<f64>() / intervals.len() as f64;
        if mean <= 0.0 {
            return 0.0;
        }
        let variance = intervals
            .iter()
            .map(|x| (x - mean).powi(2))
            .sum::<f64>()
            / intervals.len() as f64;
        (variance.sqrt() / (mean * 0.5)).min(1.0)
    }

    /// Heart rate from mean peak spacing and the sampling interval.
    fn heart_rate(&self, peaks: &[usize]) -> u32 {
        if peaks.len() < 2 {
            return 0;
        }
        let intervals: Vec<f64> = peaks.windows(2).map(|w| (w[1] - w[0]) as f64).collect();
        let mean_samples = intervals.iter().sum::<f64>() / intervals.len() as f64;
        let interval_ms = mean_samples * self.config.sample_interval_ms as f64;
        if interval_ms <= 0.0 {
            return 0;
        }
        (60_000.0 / interval_ms).round() as u32
    }

    /// Mean amplitude over the configured ST window, clamped to the
    /// available data.
    fn st_window_mean(&self, values: &[f64]) -> f64 {
        let start = self.config.st_window_start.min(values.len());
        let end = (start + self.config.st_window_len).min(values.len());
        if start == end {
            return 0.0;
        }
        values[start..end].iter().sum::<f64>() / (end - start) as f64
    }
}
