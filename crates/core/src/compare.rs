//! Bit error rate and RMS deviation between two PCM streams.
//!
//! Streams are compared frame by frame. Comparison stops at the first frame
//! where either stream comes up short or the two reads differ in length, so a
//! trailing partial frame is never counted.

use crate::constants::INTERNAL_FRAME_LEN;
use crate::error::Result;
use crate::pcm::SampleSource;
use std::fmt;

const BITS_PER_SAMPLE: u64 = 16;

/// Accumulated differences between two sample streams.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Comparison {
    pub bit_errors: u64,
    pub bits_total: u64,
    pub squared_error: f64,
}

impl Comparison {
    pub fn samples(&self) -> u64 {
        self.bits_total / BITS_PER_SAMPLE
    }

    /// Percentage of differing bits, 0.0 when nothing was compared.
    pub fn bit_error_rate(&self) -> f64 {
        if self.bits_total == 0 {
            return 0.0;
        }
        100.0 * self.bit_errors as f64 / self.bits_total as f64
    }

    /// Root mean square deviation per sample, 0.0 when nothing was compared.
    pub fn rmsd(&self) -> f64 {
        if self.samples() == 0 {
            return 0.0;
        }
        (self.squared_error / self.samples() as f64).sqrt()
    }

    fn add_frame(&mut self, a: &[i16], b: &[i16]) {
        for (&x, &y) in a.iter().zip(b) {
            self.bit_errors += (x ^ y).count_ones() as u64;
            let diff = x as f64 - y as f64;
            self.squared_error += diff * diff;
        }
        self.bits_total += BITS_PER_SAMPLE * a.len() as u64;
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BER: [{}/{}] ({:.3}%) RMSD: {:.5}",
            self.bit_errors,
            self.bits_total,
            self.bit_error_rate(),
            self.rmsd()
        )
    }
}

/// Compares two streams in 480-sample frames.
pub fn compare<A, B>(a: &mut A, b: &mut B) -> Result<Comparison>
where
    A: SampleSource + ?Sized,
    B: SampleSource + ?Sized,
{
    let mut frame_a = [0i16; INTERNAL_FRAME_LEN];
    let mut frame_b = [0i16; INTERNAL_FRAME_LEN];
    let mut result = Comparison::default();

    loop {
        let read_a = a.read_samples(&mut frame_a)?;
        let read_b = b.read_samples(&mut frame_b)?;
        if read_a != read_b || read_a < INTERNAL_FRAME_LEN {
            if read_a != read_b {
                log::debug!("Streams diverge in length ({} vs {} samples)", read_a, read_b);
            }
            break;
        }
        result.add_frame(&frame_a, &frame_b);
    }

    Ok(result)
}
