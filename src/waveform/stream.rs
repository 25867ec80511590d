//! Realtime replay of a synthesized waveform.
//!
//! A streaming run generates one full waveform up front, then replays
//! it sample-by-sample on a tokio timer, looping back to the start
//! when the run is exhausted. The returned handle cancels the task
//! synchronously without leaking the timer.

use std::time::Duration;

use tokio::task::JoinHandle;

use super::{EcgPattern, WaveformConfig, WaveformGenerator};
use crate::{HeartwatchError, Result};

/// Handle to a running waveform stream.
pub struct StreamHandle {
    task: JoinHandle<()>,
}

impl StreamHandle {
    /// Cancel the stream. Takes effect immediately; no further samples
    /// are delivered after this returns.
    pub fn cancel(self) {
        self.task.abort();
    }

    /// Whether the streaming task has stopped.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Stream a pattern at its default heart rate, one sample per tick.
///
/// `on_sample` is invoked from the timer task until the handle is
/// cancelled.
pub fn stream_pattern<F>(pattern: EcgPattern, on_sample: F, interval_ms: u64) -> Result<StreamHandle>
where
    F: FnMut(f64) + Send + 'static,
{
    stream(WaveformConfig::for_pattern(pattern), on_sample, interval_ms)
}

/// Stream an explicit configuration, one sample per tick.
pub fn stream<F>(config: WaveformConfig, mut on_sample: F, interval_ms: u64) -> Result<StreamHandle>
where
    F: FnMut(f64) + Send + 'static,
{
    if interval_ms == 0 {
        return Err(HeartwatchError::InvalidConfig(
            "stream interval must be positive".into(),
        ));
    }

    let mut generator = WaveformGenerator::new(config)?;
    let samples = generator.generate();

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_millis(interval_ms));
        let mut index = 0usize;
        loop {
            ticker.tick().await;
            on_sample(samples[index]);
            index = (index + 1) % samples.len();
        }
    });

    Ok(StreamHandle { task })
}
