use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rnstream_core::{
    compare, Passthrough, PcmReader, PcmWriter, Pipeline, PipelineConfig, ResamplerQuality,
    RunReport,
};
use std::path::{Path, PathBuf};

mod config;

use config::AppConfig;

#[derive(Parser)]
#[command(name = "rnstream")]
#[command(about = "rnstream: RNNoise denoising for raw PCM at any sample rate", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Denoise a headerless mono s16le PCM file
    Denoise {
        input: PathBuf,
        output: PathBuf,
        /// Sample rate of the input stream in Hz
        #[arg(short = 'r', long)]
        input_rate: Option<u32>,
        /// Sample rate of the output stream in Hz (defaults to the input rate)
        #[arg(short = 'R', long)]
        output_rate: Option<u32>,
        /// Resampler quality: fast, balanced or high
        #[arg(short, long)]
        quality: Option<ResamplerQuality>,
        /// Suppression strength from 0.0 (raw) to 1.0 (fully denoised)
        #[arg(short, long)]
        strength: Option<f32>,
        /// Only resample, skip the denoiser
        #[arg(long)]
        bypass: bool,
        /// Store the effective settings as new defaults
        #[arg(long)]
        save: bool,
    },
    /// Compare two PCM files: bit error rate and RMS deviation
    Compare { a: PathBuf, b: PathBuf },
}

fn main() -> Result<()> {
    env_logger::init();

    // Usage errors exit with 1, help and version output with 0
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if e.use_stderr() => {
            let _ = e.print();
            std::process::exit(1);
        }
        Err(e) => e.exit(),
    };

    match cli.command {
        Commands::Denoise {
            input,
            output,
            input_rate,
            output_rate,
            quality,
            strength,
            bypass,
            save,
        } => {
            let mut config = AppConfig::load();
            if let Some(rate) = input_rate {
                config.input_rate = rate;
            }
            if output_rate.is_some() {
                config.output_rate = output_rate;
            }
            if let Some(quality) = quality {
                config.quality = quality;
            }
            if let Some(strength) = strength {
                config.suppression_strength = strength;
            }

            let pipeline_config = config.pipeline_config();
            pipeline_config.validate()?;

            if save {
                let path = config.save()?;
                println!("Saved defaults to {}", path.display());
            }

            let report = denoise(&input, &output, &pipeline_config, bypass)?;
            println!("{}", report);
            if let Some(p) = report.voice_probability {
                println!("mean voice probability {:.2} over {} frames", p, report.chunks);
            }
        }
        Commands::Compare { a, b } => {
            let mut a = PcmReader::open(&a).context("Failed to open first file")?;
            let mut b = PcmReader::open(&b).context("Failed to open second file")?;
            let result = compare(&mut a, &mut b)?;
            println!("{}", result);
        }
    }

    Ok(())
}

fn denoise(input: &Path, output: &Path, config: &PipelineConfig, bypass: bool) -> Result<RunReport> {
    log::info!(
        "Denoising {} ({} Hz) -> {} ({} Hz), quality {}, strength {}",
        input.display(),
        config.input_rate,
        output.display(),
        config.output_rate,
        config.quality,
        config.denoise.strength
    );

    // Nothing touches the output path until the input is known to be readable
    let mut source = PcmReader::open(input).context("Failed to open input")?;

    let report = if bypass {
        let mut pipeline = Pipeline::with_transform(config, Passthrough)?;
        let mut sink = PcmWriter::create(output).context("Failed to create output")?;
        pipeline.run(&mut source, &mut sink)
    } else {
        let mut pipeline = Pipeline::new(config)?;
        let mut sink = PcmWriter::create(output).context("Failed to create output")?;
        pipeline.run(&mut source, &mut sink)
    };

    report.context("Pipeline run aborted")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_denoise_requires_both_paths() {
        assert!(Cli::try_parse_from(["rnstream", "denoise", "in.raw"]).is_err());
        assert!(Cli::try_parse_from(["rnstream", "denoise", "in.raw", "out.raw"]).is_ok());
    }

    #[test]
    fn test_denoise_flags_parse() {
        let cli = Cli::try_parse_from([
            "rnstream", "denoise", "in.raw", "out.raw", "-r", "16000", "-R", "44100", "-q",
            "high", "--bypass",
        ])
        .unwrap();
        match cli.command {
            Commands::Denoise {
                input_rate,
                output_rate,
                quality,
                bypass,
                ..
            } => {
                assert_eq!(input_rate, Some(16000));
                assert_eq!(output_rate, Some(44100));
                assert_eq!(quality, Some(ResamplerQuality::High));
                assert!(bypass);
            }
            _ => panic!("expected denoise"),
        }
    }

    #[test]
    fn test_unknown_quality_is_usage_error() {
        let err = Cli::try_parse_from(["rnstream", "denoise", "a", "b", "-q", "ultra"])
            .err()
            .unwrap();
        assert!(err.use_stderr());
    }

    #[test]
    fn test_missing_input_fails_before_output_is_created() {
        let dir = std::env::temp_dir().join(format!("rnstream-test-{}", std::process::id()));
        let output = dir.join("out.raw");
        let result = denoise(
            Path::new("/nonexistent/rnstream/in.raw"),
            &output,
            &PipelineConfig::new(48000),
            true,
        );
        assert!(result.is_err());
        assert!(!output.exists());
    }

    #[test]
    fn test_bypass_roundtrip_through_files() {
        let dir = std::env::temp_dir().join(format!("rnstream-roundtrip-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let input = dir.join("in.raw");
        let output = dir.join("out.raw");
        let samples: Vec<i16> = (0..1234).map(|i| (i * 7) as i16).collect();
        let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        std::fs::write(&input, &bytes).unwrap();

        let report = denoise(&input, &output, &PipelineConfig::new(48000), true).unwrap();

        assert_eq!(std::fs::read(&output).unwrap(), bytes);
        assert_eq!(report.chunks, 3);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
