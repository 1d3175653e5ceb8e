//! Stateful, directional sample-rate conversion for the frame pipeline.
//!
//! A session converts fixed-size 10ms blocks from one rate to another. The
//! underlying rubato resampler does not emit the same number of samples on
//! every call, so produced samples go through a FIFO and each call hands out
//! exactly one output block.

use crate::constants::chunk_len;
use crate::convert::{narrow, widen};
use crate::error::{PipelineError, Result};
use ringbuf::traits::{Consumer, Observer, Producer};
use ringbuf::HeapRb;
use rubato::{
    FastFixedIn, PolynomialDegree, Resampler, SincFixedIn, SincInterpolationParameters,
    SincInterpolationType, WindowFunction,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// The resampler runs a fixed ratio, but rubato requires headroom above 1.0.
const MAX_RATIO_RELATIVE: f64 = 1.1;

// Samples kept in reserve once the filter has warmed up. Rubato's per-call
// output count wobbles by one sample around the nominal ratio.
const PRIME_SAMPLES: usize = 2;

// FIFO capacity in output blocks
const FIFO_BLOCKS: usize = 4;

/// Converts one block of input samples into exactly one block of output samples.
///
/// Implementations keep filter state between calls and must be driven with
/// consecutive blocks in stream order.
pub trait Resample {
    fn process(&mut self, input: &[i16], output: &mut [i16]) -> Result<()>;
}

/// Trade-off between conversion cost and filter quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResamplerQuality {
    /// Cubic polynomial interpolation
    Fast,
    /// 64-tap windowed sinc
    #[default]
    Balanced,
    /// 256-tap windowed sinc
    High,
}

impl ResamplerQuality {
    fn sinc_parameters(self) -> SincInterpolationParameters {
        let (sinc_len, oversampling_factor) = match self {
            ResamplerQuality::High => (256, 256),
            _ => (64, 128),
        };
        SincInterpolationParameters {
            sinc_len,
            f_cutoff: 0.95,
            interpolation: SincInterpolationType::Linear,
            oversampling_factor,
            window: WindowFunction::BlackmanHarris2,
        }
    }
}

impl fmt::Display for ResamplerQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResamplerQuality::Fast => "fast",
            ResamplerQuality::Balanced => "balanced",
            ResamplerQuality::High => "high",
        };
        f.write_str(name)
    }
}

impl FromStr for ResamplerQuality {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fast" => Ok(ResamplerQuality::Fast),
            "balanced" => Ok(ResamplerQuality::Balanced),
            "high" => Ok(ResamplerQuality::High),
            other => Err(format!(
                "unknown resampler quality '{}' (expected fast, balanced or high)",
                other
            )),
        }
    }
}

enum Engine {
    Passthrough,
    Sinc(SincFixedIn<f32>),
    Polynomial(FastFixedIn<f32>),
}

/// Resampler session for one direction and one rate pair.
///
/// The conversion ratio is taken from the 10ms block sizes of both rates, so
/// a 44.1kHz stream (440-sample chunks) maps 440 samples onto one 480-sample
/// frame. When both block sizes match, samples pass through unchanged.
pub struct ResamplerSession {
    rate_in: u32,
    rate_out: u32,
    block_in: usize,
    block_out: usize,
    engine: Engine,
    fifo: HeapRb<i16>,
    priming: bool,
    wide_in: Vec<f32>,
    wide_out: Vec<f32>,
    narrow_out: Vec<i16>,
}

impl ResamplerSession {
    /// Creates a session converting `rate_in` blocks into `rate_out` blocks.
    ///
    /// Fails with [`PipelineError::Usage`] when either rate is too low to
    /// hold a 10ms block, and with [`PipelineError::Resampler`] when rubato
    /// rejects the configuration.
    pub fn new(rate_in: u32, rate_out: u32, quality: ResamplerQuality) -> Result<Self> {
        let block_in = chunk_len(rate_in);
        let block_out = chunk_len(rate_out);
        if block_in == 0 || block_out == 0 {
            return Err(PipelineError::Usage(format!(
                "sample rates must be at least 1000 Hz (got {} -> {})",
                rate_in, rate_out
            )));
        }

        let ratio = block_out as f64 / block_in as f64;
        let engine = if block_in == block_out {
            Engine::Passthrough
        } else {
            match quality {
                ResamplerQuality::Fast => Engine::Polynomial(
                    FastFixedIn::<f32>::new(
                        ratio,
                        MAX_RATIO_RELATIVE,
                        PolynomialDegree::Cubic,
                        block_in,
                        1,
                    )
                    .map_err(|e| {
                        PipelineError::Resampler(format!("Failed to create resampler: {}", e))
                    })?,
                ),
                _ => Engine::Sinc(
                    SincFixedIn::<f32>::new(
                        ratio,
                        MAX_RATIO_RELATIVE,
                        quality.sinc_parameters(),
                        block_in,
                        1,
                    )
                    .map_err(|e| {
                        PipelineError::Resampler(format!("Failed to create resampler: {}", e))
                    })?,
                ),
            }
        };

        let frames_max = match &engine {
            Engine::Passthrough => block_out,
            Engine::Sinc(r) => r.output_frames_max(),
            Engine::Polynomial(r) => r.output_frames_max(),
        };

        let fifo = HeapRb::<i16>::new(FIFO_BLOCKS * frames_max.max(block_out) + PRIME_SAMPLES);
        let priming = !matches!(engine, Engine::Passthrough);

        log::debug!(
            "Resampler session {} Hz -> {} Hz ({} -> {} samples/block, quality {}, passthrough {})",
            rate_in,
            rate_out,
            block_in,
            block_out,
            quality,
            matches!(engine, Engine::Passthrough)
        );

        Ok(Self {
            rate_in,
            rate_out,
            block_in,
            block_out,
            engine,
            fifo,
            priming,
            wide_in: vec![0.0; block_in],
            wide_out: vec![0.0; frames_max],
            narrow_out: vec![0; frames_max],
        })
    }

    /// Input samples expected by every `process` call.
    pub fn block_in(&self) -> usize {
        self.block_in
    }

    /// Output samples handed out by every `process` call.
    pub fn block_out(&self) -> usize {
        self.block_out
    }

    pub fn is_passthrough(&self) -> bool {
        matches!(self.engine, Engine::Passthrough)
    }

    /// Converted samples waiting in the FIFO.
    pub fn buffered(&self) -> usize {
        self.fifo.occupied_len()
    }
}

impl Resample for ResamplerSession {
    fn process(&mut self, input: &[i16], output: &mut [i16]) -> Result<()> {
        if input.len() != self.block_in || output.len() != self.block_out {
            return Err(PipelineError::Resampler(format!(
                "{} -> {} Hz session expects {} -> {} samples, got {} -> {}",
                self.rate_in,
                self.rate_out,
                self.block_in,
                self.block_out,
                input.len(),
                output.len()
            )));
        }

        let converted: &[i16] = match &mut self.engine {
            Engine::Passthrough => input,
            Engine::Sinc(engine) => {
                let n = convert_block(engine, input, &mut self.wide_in, &mut self.wide_out)?;
                narrow(&self.wide_out[..n], &mut self.narrow_out[..n]);
                &self.narrow_out[..n]
            }
            Engine::Polynomial(engine) => {
                let n = convert_block(engine, input, &mut self.wide_in, &mut self.wide_out)?;
                narrow(&self.wide_out[..n], &mut self.narrow_out[..n]);
                &self.narrow_out[..n]
            }
        };

        let pushed = self.fifo.push_slice(converted);
        if pushed < converted.len() {
            log::warn!(
                "Resampler FIFO overflow, dropped {} samples",
                converted.len() - pushed
            );
        }

        // While the filter warms up its delay is emitted as leading silence,
        // leaving PRIME_SAMPLES behind to cover later jitter.
        let popped = if self.priming {
            let available = self.fifo.occupied_len();
            let lead = (output.len() + PRIME_SAMPLES)
                .saturating_sub(available)
                .min(output.len());
            output[..lead].fill(0);
            let popped = self.fifo.pop_slice(&mut output[lead..]);
            self.priming = self.fifo.occupied_len() < PRIME_SAMPLES;
            lead + popped
        } else {
            self.fifo.pop_slice(output)
        };
        if popped < output.len() {
            log::warn!(
                "Resampler FIFO underrun, padded {} samples",
                output.len() - popped
            );
            output[popped..].fill(0);
        }

        Ok(())
    }
}

fn convert_block<R: Resampler<f32>>(
    engine: &mut R,
    input: &[i16],
    wide_in: &mut [f32],
    wide_out: &mut [f32],
) -> Result<usize> {
    widen(input, wide_in);
    let wave_in = [&*wide_in];
    let mut wave_out = [wide_out];
    let (_, produced) = engine
        .process_into_buffer(&wave_in[..], &mut wave_out[..], None)
        .map_err(|e| PipelineError::Resampler(format!("Resample failed: {}", e)))?;
    Ok(produced)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(rate: u32, freq: f32, amplitude: f32, len: usize) -> Vec<i16> {
        (0..len)
            .map(|i| {
                let t = i as f32 / rate as f32;
                (amplitude * (2.0 * std::f32::consts::PI * freq * t).sin()) as i16
            })
            .collect()
    }

    fn rms(samples: &[i16]) -> f32 {
        let sum: f32 = samples.iter().map(|&s| (s as f32) * (s as f32)).sum();
        (sum / samples.len() as f32).sqrt()
    }

    #[test]
    fn test_same_rate_is_passthrough() {
        let session = ResamplerSession::new(48000, 48000, ResamplerQuality::High).unwrap();
        assert!(session.is_passthrough());
        assert_eq!(session.block_in(), 480);
        assert_eq!(session.block_out(), 480);
    }

    #[test]
    fn test_passthrough_is_exact_across_calls() {
        let mut session = ResamplerSession::new(48000, 48000, ResamplerQuality::Balanced).unwrap();
        let signal = sine(48000, 300.0, 9000.0, 480 * 5);
        let mut out = vec![0i16; 480];
        for block in signal.chunks(480) {
            session.process(block, &mut out).unwrap();
            assert_eq!(out.as_slice(), block);
        }
        assert_eq!(session.buffered(), 0);
    }

    #[test]
    fn test_upsampling_yields_exact_blocks_without_growth() {
        let mut session = ResamplerSession::new(16000, 48000, ResamplerQuality::Balanced).unwrap();
        assert!(!session.is_passthrough());
        let signal = sine(16000, 440.0, 8000.0, 160 * 300);
        let mut out = vec![0i16; 480];
        for block in signal.chunks(160) {
            session.process(block, &mut out).unwrap();
            // Surplus never accumulates beyond a couple of samples
            assert!(session.buffered() <= PRIME_SAMPLES + 2, "buffered={}", session.buffered());
        }
    }

    #[test]
    fn test_fractional_khz_rate_uses_block_ratio() {
        let mut session = ResamplerSession::new(48000, 44100, ResamplerQuality::Fast).unwrap();
        assert_eq!(session.block_out(), 440);
        let signal = sine(48000, 440.0, 8000.0, 480 * 50);
        let mut out = vec![0i16; 440];
        for block in signal.chunks(480) {
            session.process(block, &mut out).unwrap();
        }
        assert!(session.buffered() <= PRIME_SAMPLES + 2);
    }

    #[test]
    fn test_signal_level_preserved() {
        let mut session = ResamplerSession::new(16000, 48000, ResamplerQuality::High).unwrap();
        let signal = sine(16000, 440.0, 8000.0, 160 * 100);
        let mut converted = Vec::new();
        let mut out = vec![0i16; 480];
        for block in signal.chunks(160) {
            session.process(block, &mut out).unwrap();
            converted.extend_from_slice(&out);
        }
        // Skip the filter warm-up
        let level_in = rms(&signal[1600..]);
        let level_out = rms(&converted[4800..]);
        assert!(
            (level_out / level_in - 1.0).abs() < 0.1,
            "level changed: in={} out={}",
            level_in,
            level_out
        );
    }

    #[test]
    fn test_wrong_block_size_is_resampler_error() {
        let mut session = ResamplerSession::new(16000, 48000, ResamplerQuality::Balanced).unwrap();
        let mut out = vec![0i16; 480];
        let result = session.process(&[0i16; 100], &mut out);
        assert!(matches!(result, Err(PipelineError::Resampler(_))));
    }

    #[test]
    fn test_rate_below_one_khz_is_usage_error() {
        let result = ResamplerSession::new(800, 48000, ResamplerQuality::Balanced);
        assert!(matches!(result, Err(PipelineError::Usage(_))));
    }

    #[test]
    fn test_quality_parsing() {
        assert_eq!("fast".parse::<ResamplerQuality>(), Ok(ResamplerQuality::Fast));
        assert_eq!("HIGH".parse::<ResamplerQuality>(), Ok(ResamplerQuality::High));
        assert!("medium".parse::<ResamplerQuality>().is_err());
        assert_eq!(ResamplerQuality::default().to_string(), "balanced");
    }
}
