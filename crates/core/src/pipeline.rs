//! The rate-adaptive frame pipeline.
//!
//! Each input chunk (10ms at the source rate) becomes exactly one internal
//! 480-sample frame at 48kHz, goes through the transform, and comes back as
//! exactly one output chunk (10ms at the sink rate):
//!
//! `resample_in -> widen -> transform -> narrow -> resample_out`
//!
//! When the source ends on a partial chunk, that chunk is zero-padded, run
//! through the same path, and only the part corresponding to real input is
//! written. The padded part can carry filter edge artifacts, which is accepted.

use crate::constants::{chunk_len, INTERNAL_FRAME_LEN, INTERNAL_SAMPLE_RATE};
use crate::convert::{narrow, widen};
use crate::error::{PipelineError, Result};
use crate::pcm::{SampleSink, SampleSource};
use crate::resampler::{Resample, ResamplerQuality, ResamplerSession};
use crate::timing::{RunClock, RunReport};
use crate::transform::{DenoiseConfig, FrameTransform, RnnoiseTransform};

/// Settings for one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineConfig {
    pub input_rate: u32,
    pub output_rate: u32,
    pub quality: ResamplerQuality,
    pub denoise: DenoiseConfig,
}

impl PipelineConfig {
    /// Same rate in and out, default resampler and denoiser settings.
    pub fn new(sample_rate: u32) -> Self {
        Self {
            input_rate: sample_rate,
            output_rate: sample_rate,
            quality: ResamplerQuality::default(),
            denoise: DenoiseConfig::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        for rate in [self.input_rate, self.output_rate] {
            if chunk_len(rate) == 0 {
                return Err(PipelineError::Usage(format!(
                    "sample rate {} Hz is too low, need at least 1000 Hz",
                    rate
                )));
            }
        }
        self.denoise.validate()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DriverState {
    Streaming,
    /// Source ended after `remaining` samples of a partial chunk
    Draining { remaining: usize },
}

#[derive(Default)]
struct VoiceActivity {
    total: f64,
    frames: u64,
}

impl VoiceActivity {
    fn record(&mut self, probability: Option<f32>) {
        if let Some(p) = probability {
            self.total += p as f64;
            self.frames += 1;
        }
    }

    fn mean(&self) -> Option<f32> {
        (self.frames > 0).then(|| (self.total / self.frames as f64) as f32)
    }
}

/// Drives both resampler sessions and the transform over a sample stream.
///
/// The pipeline exclusively owns its sessions and transform for as long as it
/// lives; each value is meant for a single stream.
pub struct Pipeline<R = ResamplerSession, T = RnnoiseTransform> {
    resample_in: R,
    resample_out: R,
    transform: T,
    chunk_len_in: usize,
    chunk_len_out: usize,
    chunk_in: Vec<i16>,
    frame: [i16; INTERNAL_FRAME_LEN],
    buffer: [f32; INTERNAL_FRAME_LEN],
    chunk_out: Vec<i16>,
    voice: VoiceActivity,
}

impl Pipeline<ResamplerSession, RnnoiseTransform> {
    /// Builds an RNNoise pipeline with rubato resampler sessions.
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        let transform = RnnoiseTransform::new(&config.denoise)?;
        Self::with_transform(config, transform)
    }
}

impl<T: FrameTransform> Pipeline<ResamplerSession, T> {
    /// Builds a pipeline with rubato resampler sessions around `transform`.
    pub fn with_transform(config: &PipelineConfig, transform: T) -> Result<Self> {
        config.validate()?;
        let resample_in =
            ResamplerSession::new(config.input_rate, INTERNAL_SAMPLE_RATE, config.quality)?;
        let resample_out =
            ResamplerSession::new(INTERNAL_SAMPLE_RATE, config.output_rate, config.quality)?;
        Self::from_parts(
            resample_in,
            resample_out,
            transform,
            config.input_rate,
            config.output_rate,
        )
    }
}

impl<R: Resample, T: FrameTransform> Pipeline<R, T> {
    /// Assembles a pipeline from already created parts.
    ///
    /// `resample_in` must turn `chunk_len(input_rate)` samples into one
    /// internal frame, `resample_out` one internal frame into
    /// `chunk_len(output_rate)` samples.
    pub fn from_parts(
        resample_in: R,
        resample_out: R,
        transform: T,
        input_rate: u32,
        output_rate: u32,
    ) -> Result<Self> {
        let chunk_len_in = chunk_len(input_rate);
        let chunk_len_out = chunk_len(output_rate);
        if chunk_len_in == 0 || chunk_len_out == 0 {
            return Err(PipelineError::Usage(format!(
                "sample rates must be at least 1000 Hz (got {} -> {})",
                input_rate, output_rate
            )));
        }

        Ok(Self {
            resample_in,
            resample_out,
            transform,
            chunk_len_in,
            chunk_len_out,
            chunk_in: vec![0; chunk_len_in],
            frame: [0; INTERNAL_FRAME_LEN],
            buffer: [0.0; INTERNAL_FRAME_LEN],
            chunk_out: vec![0; chunk_len_out],
            voice: VoiceActivity::default(),
        })
    }

    pub fn transform(&self) -> &T {
        &self.transform
    }

    /// Processes `source` until it ends, writing to `sink`.
    ///
    /// Any error aborts the run immediately; whatever was already written to
    /// the sink is left incomplete.
    pub fn run<S, K>(&mut self, source: &mut S, sink: &mut K) -> Result<RunReport>
    where
        S: SampleSource + ?Sized,
        K: SampleSink + ?Sized,
    {
        let mut clock = RunClock::start();
        let mut state = DriverState::Streaming;

        loop {
            match state {
                DriverState::Streaming => {
                    let read = source.read_samples(&mut self.chunk_in)?;
                    if read < self.chunk_len_in {
                        log::debug!(
                            "Source ended after {:.3}s with {} of {} samples in the last chunk",
                            clock.runtime_seconds(),
                            read,
                            self.chunk_len_in
                        );
                        state = DriverState::Draining { remaining: read };
                        continue;
                    }

                    self.denoise_chunk()?;
                    sink.write_samples(&self.chunk_out)?;
                    clock.advance_chunk();
                }
                DriverState::Draining { remaining } => {
                    if remaining > 0 {
                        self.chunk_in[remaining..].fill(0);
                        self.denoise_chunk()?;
                        let tail = self.tail_len(remaining);
                        sink.write_samples(&self.chunk_out[..tail])?;
                        clock.advance_chunk();
                        log::trace!("Drained {} input samples into {}", remaining, tail);
                    }
                    break;
                }
            }
        }

        sink.flush()?;

        let mut report = clock.finish();
        report.voice_probability = self.voice.mean();
        log::debug!("Run finished: {}", report);
        Ok(report)
    }

    /// Runs the full chunk path on `chunk_in`, leaving the result in `chunk_out`.
    fn denoise_chunk(&mut self) -> Result<()> {
        self.resample_in.process(&self.chunk_in, &mut self.frame)?;
        widen(&self.frame, &mut self.buffer);
        let vad = self.transform.process_frame(&mut self.buffer);
        narrow(&self.buffer, &mut self.frame);
        self.resample_out.process(&self.frame, &mut self.chunk_out)?;
        self.voice.record(vad);
        log::trace!("Chunk done, voice probability {:?}", vad);
        Ok(())
    }

    /// Output samples that correspond to `remaining` real input samples.
    fn tail_len(&self, remaining: usize) -> usize {
        (remaining * self.chunk_len_out)
            .div_ceil(self.chunk_len_in)
            .min(self.chunk_len_out)
    }
}
