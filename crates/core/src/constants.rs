//! Shared constants for the rnstream frame pipeline.

/// Sample rate the denoiser runs at (48kHz)
pub const INTERNAL_SAMPLE_RATE: u32 = 48000;

/// Internal frame size in samples (10ms at 48kHz = 480 samples)
pub const INTERNAL_FRAME_LEN: usize = 480;

/// Duration covered by one chunk or frame, in seconds
pub const CHUNK_SECONDS: f64 = 0.01;

/// Number of samples in a 10ms chunk at `sample_rate`.
///
/// Uses integer division on the kHz part, so 44.1kHz yields 440 samples.
pub const fn chunk_len(sample_rate: u32) -> usize {
    (sample_rate / 1000 * 10) as usize
}
