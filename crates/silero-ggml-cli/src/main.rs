use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use silero_ggml::{ConvertOptions, SampleRate, convert_file, inspect_file};

#[derive(Debug, Parser)]
#[command(name = "silero-ggml")]
#[command(about = "Convert Silero-VAD weights (safetensors) to GGML format", long_about = None)]
#[command(version)]
struct Args {
    /// Silero-VAD state dict exported as safetensors.
    #[arg(long, required_unless_present = "inspect")]
    input: Option<PathBuf>,

    /// Path to output GGML model file; version and rate are inserted before the extension.
    #[arg(long, required_unless_present = "inspect")]
    output: Option<PathBuf>,

    /// Use float16 precision.
    #[arg(long, default_value_t = false)]
    use_f16: bool,

    /// Sample rate: 8000 or 16000.
    #[arg(long, default_value = "16000", value_parser = parse_sample_rate)]
    sample_rate: SampleRate,

    /// Model version for the output name (defaults to the `silero_version` metadata entry).
    #[arg(long)]
    model_version: Option<String>,

    /// Validate an existing GGML file instead of converting.
    #[arg(long, conflicts_with_all = ["input", "output"])]
    inspect: Option<PathBuf>,

    /// With --inspect, print the summary as JSON.
    #[arg(long, default_value_t = false, requires = "inspect")]
    json: bool,
}

fn parse_sample_rate(s: &str) -> Result<SampleRate, String> {
    let hz: u32 = s.parse().map_err(|_| format!("not a number: {s}"))?;
    SampleRate::try_from(hz).map_err(|e| e.to_string())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = Args::parse();

    if let Some(path) = &args.inspect {
        return inspect(path, args.json);
    }

    let input = args.input.context("--input is required")?;
    let output = args.output.context("--output is required")?;
    let opts = ConvertOptions {
        output,
        use_f16: args.use_f16,
        sample_rate: args.sample_rate.hz(),
        model_version: args.model_version,
    };

    let report = convert_file(&input, &opts)
        .with_context(|| format!("convert {}", input.display()))?;
    tracing::info!(
        tensors = report.tensors_written,
        bytes = report.bytes_written,
        "wrote {}",
        report.output.display()
    );
    Ok(())
}

fn inspect(path: &Path, json: bool) -> Result<()> {
    let summary = inspect_file(path).with_context(|| format!("inspect {}", path.display()))?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("serialize summary")?
        );
        return Ok(());
    }

    let h = &summary.header;
    println!(
        "file ok: sample_rate={} f16={} parameters={} payload_bytes={}",
        h.sample_rate, h.use_f16, summary.parameter_count, summary.payload_bytes
    );
    for (i, l) in h.encoder.iter().enumerate() {
        println!(
            "  encoder.{i}: in={} out={} kernel={}",
            l.in_channels, l.out_channels, l.kernel_size
        );
    }
    println!(
        "  lstm: input={} hidden={}  final_conv: in={} out={}",
        h.lstm_input, h.lstm_hidden, h.final_conv_in, h.final_conv_out
    );
    Ok(())
}
