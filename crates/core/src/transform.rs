//! Per-frame denoising transforms.

use crate::constants::INTERNAL_FRAME_LEN;
use crate::error::{PipelineError, Result};
use nnnoiseless::DenoiseState;

/// A stateful transform over consecutive, non-overlapping internal frames.
///
/// Frames are processed in place and must arrive in stream order.
pub trait FrameTransform {
    /// Processes one frame, returning the voice probability when the
    /// transform estimates one.
    fn process_frame(&mut self, frame: &mut [f32; INTERNAL_FRAME_LEN]) -> Option<f32>;
}

/// Settings for [`RnnoiseTransform`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DenoiseConfig {
    /// Blend between raw (0.0) and fully denoised (1.0) audio
    pub strength: f32,
}

impl Default for DenoiseConfig {
    fn default() -> Self {
        Self { strength: 1.0 }
    }
}

impl DenoiseConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.strength) {
            return Err(PipelineError::Usage(format!(
                "suppression strength must be within 0.0..=1.0 (got {})",
                self.strength
            )));
        }
        Ok(())
    }
}

/// RNNoise denoiser operating on 480-sample frames at 48kHz.
pub struct RnnoiseTransform {
    denoise: Box<DenoiseState<'static>>,
    strength: f32,
    dry: [f32; INTERNAL_FRAME_LEN],
}

impl RnnoiseTransform {
    pub fn new(config: &DenoiseConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            denoise: DenoiseState::new(),
            strength: config.strength,
            dry: [0.0; INTERNAL_FRAME_LEN],
        })
    }
}

impl FrameTransform for RnnoiseTransform {
    fn process_frame(&mut self, frame: &mut [f32; INTERNAL_FRAME_LEN]) -> Option<f32> {
        self.dry.copy_from_slice(frame);
        let vad = self.denoise.process_frame(frame, &self.dry);

        // strength=1.0 means full suppression, strength=0.0 means raw audio
        if self.strength < 1.0 {
            for (out, &raw) in frame.iter_mut().zip(self.dry.iter()) {
                *out = raw * (1.0 - self.strength) + *out * self.strength;
            }
        }
        Some(vad)
    }
}

/// Leaves every frame untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct Passthrough;

impl FrameTransform for Passthrough {
    fn process_frame(&mut self, _frame: &mut [f32; INTERNAL_FRAME_LEN]) -> Option<f32> {
        None
    }
}
