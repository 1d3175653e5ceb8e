pub mod compare;
pub mod constants;
pub mod convert;
pub mod error;
pub mod pcm;
pub mod pipeline;
pub mod resampler;
pub mod timing;
pub mod transform;

pub use compare::{compare, Comparison};
pub use error::{PipelineError, Result};
pub use pcm::{PcmReader, PcmWriter, SampleSink, SampleSource};
pub use pipeline::{Pipeline, PipelineConfig};
pub use resampler::{Resample, ResamplerQuality, ResamplerSession};
pub use timing::{RunClock, RunReport};
pub use transform::{DenoiseConfig, FrameTransform, Passthrough, RnnoiseTransform};
