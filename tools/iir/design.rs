//! Print the coefficients for a filter spec and optionally run a WAV file
//! through the real-time engine.
//!
//! ```text
//! iir_design [--spec spec.json] [--json] [--wav in.wav out.wav]
//! ```

use anyhow::{bail, Context, Result};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use iir_filter::{FilterController, FilterFamily, FilterSpec};
use std::path::PathBuf;

struct Args {
    spec: Option<PathBuf>,
    json: bool,
    wav: Option<(PathBuf, PathBuf)>,
}

fn parse_args() -> Result<Args> {
    let mut args = std::env::args().skip(1);
    let mut parsed = Args {
        spec: None,
        json: false,
        wav: None,
    };
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--spec" => {
                parsed.spec = Some(args.next().map(PathBuf::from).context("--spec needs a path")?);
            }
            "--json" => parsed.json = true,
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            "--wav" => {
                let input = args.next().context("--wav needs an input path")?;
                let output = args.next().context("--wav needs an output path")?;
                parsed.wav = Some((PathBuf::from(input), PathBuf::from(output)));
            }
            other => bail!("unknown argument '{other}'"),
        }
    }
    Ok(parsed)
}

fn print_usage() {
    println!("usage: iir_design [--spec spec.json] [--json] [--wav in.wav out.wav]");
    println!();
    println!("Families:");
    for family in [
        FilterFamily::Butterworth,
        FilterFamily::Chebyshev,
        FilterFamily::Elliptical,
    ] {
        println!("  {:<12} {}", family.name(), family.description());
    }
    println!();
    println!("Default spec:");
    println!("{}", FilterSpec::default().to_json_string());
}

fn load_spec(path: Option<&PathBuf>) -> Result<FilterSpec> {
    let Some(path) = path else {
        return Ok(FilterSpec::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read spec '{}'", path.display()))?;
    FilterSpec::from_json_str(&text)
        .with_context(|| format!("failed to parse spec '{}'", path.display()))
}

/// Filter every channel independently at the file's own sample rate.
fn filter_wav(spec: &FilterSpec, input: &PathBuf, output: &PathBuf) -> Result<()> {
    let reader = WavReader::open(input)
        .with_context(|| format!("failed to open WAV '{}'", input.display()))?;
    let wav_spec = reader.spec();
    if wav_spec.sample_format != SampleFormat::Int || wav_spec.bits_per_sample != 16 {
        bail!("only 16-bit integer WAV files are supported");
    }

    let channels = wav_spec.channels as usize;
    let dt = 1.0 / wav_spec.sample_rate as f64;
    let mut engines = Vec::with_capacity(channels);
    let mut controllers = Vec::with_capacity(channels);
    for _ in 0..channels {
        let (mut ctl, engine) = FilterController::new(spec.clone().with_sample_period(dt));
        ctl.init()
            .with_context(|| format!("filter build failed at {} Hz", wav_spec.sample_rate))?;
        controllers.push(ctl);
        engines.push(engine);
    }

    let out_spec = WavSpec {
        channels: wav_spec.channels,
        sample_rate: wav_spec.sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(output, out_spec)
        .with_context(|| format!("failed to create WAV '{}'", output.display()))?;

    let mut frames = 0usize;
    let mut peak = 0.0f64;
    for (i, sample) in reader.into_samples::<i16>().enumerate() {
        let x = sample? as f64 / i16::MAX as f64;
        let y = engines[i % channels].tick(x);
        peak = peak.max(y.abs());
        writer.write_sample((y.clamp(-1.0, 1.0) * i16::MAX as f64).round() as i16)?;
        if i % channels == channels - 1 {
            frames += 1;
        }
    }
    writer.finalize()?;
    for ctl in &mut controllers {
        ctl.collect_retired();
    }

    println!("Filtered '{}' -> '{}':", input.display(), output.display());
    println!("  frames processed : {}", frames);
    println!("  output peak      : {:.6}", peak);
    Ok(())
}

fn main() -> Result<()> {
    let args = parse_args()?;
    let spec = load_spec(args.spec.as_ref())?;

    let (mut ctl, _engine) = FilterController::new(spec.clone());
    ctl.init().context("filter build failed")?;
    let report = ctl.report().context("no design after a successful build")?;

    if args.json {
        println!("{}", report.to_json()?);
    } else {
        print!("{report}");
    }

    if let Some((input, output)) = &args.wav {
        filter_wav(&spec, input, output)?;
    }
    Ok(())
}
