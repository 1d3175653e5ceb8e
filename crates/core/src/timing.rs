//! Processed-duration and wall-clock bookkeeping for a pipeline run.

use crate::constants::CHUNK_SECONDS;
use std::fmt;
use std::time::{Duration, Instant};

/// Run state owned by the driver: audio processed so far and the start time.
pub struct RunClock {
    started: Instant,
    runtime_seconds: f64,
    chunks: u64,
}

impl RunClock {
    /// Takes the start timestamp. Call before the first read.
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
            runtime_seconds: 0.0,
            chunks: 0,
        }
    }

    /// Accounts for one processed 10ms chunk.
    pub fn advance_chunk(&mut self) {
        self.runtime_seconds += CHUNK_SECONDS;
        self.chunks += 1;
    }

    pub fn runtime_seconds(&self) -> f64 {
        self.runtime_seconds
    }

    /// Takes the end timestamp and produces the run summary.
    pub fn finish(self) -> RunReport {
        let mut report = RunReport::new(self.runtime_seconds, self.started.elapsed());
        report.chunks = self.chunks;
        report
    }
}

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub runtime_seconds: f64,
    pub elapsed: Duration,
    pub chunks: u64,
    /// Mean voice probability over all frames, if the transform reports one
    pub voice_probability: Option<f32>,
}

impl RunReport {
    pub fn new(runtime_seconds: f64, elapsed: Duration) -> Self {
        Self {
            runtime_seconds,
            elapsed,
            chunks: 0,
            voice_probability: None,
        }
    }

    /// Processed audio duration over wall-clock time. Above 1.0 the pipeline
    /// keeps up with live audio. 0.0 when there is nothing to measure.
    pub fn real_time_factor(&self) -> f64 {
        let elapsed = self.elapsed.as_secs_f64();
        if elapsed == 0.0 || self.runtime_seconds == 0.0 {
            return 0.0;
        }
        self.runtime_seconds / elapsed
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "processed {:.3} seconds in {:.3} seconds ({:.2}x realtime)",
            self.runtime_seconds,
            self.elapsed.as_secs_f64(),
            self.real_time_factor()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_real_time_factor_two_x() {
        let report = RunReport::new(1.0, Duration::from_millis(500));
        assert!((report.real_time_factor() - 2.0).abs() < 0.01);
        assert_eq!(
            report.to_string(),
            "processed 1.000 seconds in 0.500 seconds (2.00x realtime)"
        );
    }

    #[test]
    fn test_empty_run_has_zero_factor() {
        let report = RunReport::new(0.0, Duration::ZERO);
        assert_eq!(report.real_time_factor(), 0.0);
        assert_eq!(
            report.to_string(),
            "processed 0.000 seconds in 0.000 seconds (0.00x realtime)"
        );
    }

    #[test]
    fn test_slower_than_realtime() {
        let report = RunReport::new(0.5, Duration::from_secs(2));
        assert!(report.real_time_factor() < 1.0);
    }

    #[test]
    fn test_clock_accumulates_ten_ms_per_chunk() {
        let mut clock = RunClock::start();
        for _ in 0..100 {
            clock.advance_chunk();
        }
        assert!((clock.runtime_seconds() - 1.0).abs() < 1e-9);
        let report = clock.finish();
        assert_eq!(report.chunks, 100);
        assert!((report.runtime_seconds - 1.0).abs() < 1e-9);
    }
}
