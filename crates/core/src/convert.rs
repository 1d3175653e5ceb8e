//! Conversion between the integer sample buffers of the stream and the
//! floating-point buffers the denoiser consumes.
//!
//! RNNoise works on samples in the 16-bit range, so neither direction scales.

/// Casts each `i16` sample to `f32`.
pub fn widen(input: &[i16], output: &mut [f32]) {
    debug_assert_eq!(input.len(), output.len());
    for (out, &sample) in output.iter_mut().zip(input) {
        *out = sample as f32;
    }
}

/// Casts each `f32` sample back to `i16`, truncating toward zero.
///
/// Values are expected to already be in the 16-bit range. Anything outside
/// saturates at `i16::MIN`/`i16::MAX`, which is how `as` casts behave.
pub fn narrow(input: &[f32], output: &mut [i16]) {
    debug_assert_eq!(input.len(), output.len());
    for (out, &sample) in output.iter_mut().zip(input) {
        *out = sample as i16;
    }
}
