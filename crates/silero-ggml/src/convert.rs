//! State dict to GGML file conversion.
//!
//! The whole payload is validated and encoded before the output is touched.
//! Bytes go to a temporary file beside the destination which is renamed into
//! place only after the last write succeeds, so a failed run never leaves a
//! file under the final name.

use std::ffi::OsString;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::ConvertError;
use crate::constants::HEADER_BYTES;
use crate::header::GgmlHeader;
use crate::plan::tensor_plan;
use crate::profile::SampleRate;
use crate::serialize::serialize_tensor;
use crate::source::ParamSource;
use crate::weights::WeightStore;

#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Base output path; the final name is derived with [`output_file_name`].
    pub output: PathBuf,
    pub use_f16: bool,
    /// Raw rate in Hz; only 8000 and 16000 are accepted.
    pub sample_rate: u32,
    /// Overrides the version reported by the parameter source.
    pub model_version: Option<String>,
}

impl ConvertOptions {
    pub fn new(output: impl Into<PathBuf>) -> Self {
        Self {
            output: output.into(),
            use_f16: false,
            sample_rate: SampleRate::Rate16k.hz(),
            model_version: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConvertReport {
    pub output: PathBuf,
    pub header: GgmlHeader,
    pub tensors_written: usize,
    pub bytes_written: u64,
}

/// Insert version and rate tag before the extension:
/// `vad.bin` + `5.0` + 16 kHz -> `vad-v5.0_16k-ggml.bin`.
///
/// A leading `v` on `version` is not doubled.
#[must_use]
pub fn output_file_name(base: &Path, version: &str, rate: SampleRate) -> PathBuf {
    let version = version.strip_prefix('v').unwrap_or(version);
    let stem = match base.extension() {
        Some(_) => base.with_extension(""),
        None => base.to_path_buf(),
    };

    let mut name: OsString = stem.into_os_string();
    name.push(format!("-v{version}_{}-ggml", rate.suffix()));
    if let Some(ext) = base.extension() {
        name.push(".");
        name.push(ext);
    }
    PathBuf::from(name)
}

struct Payload {
    label: String,
    shape: Vec<usize>,
    bytes: Vec<u8>,
}

fn collect_payloads<S: ParamSource + ?Sized>(
    source: &S,
    rate: SampleRate,
    use_f16: bool,
) -> Result<Vec<Payload>, ConvertError> {
    tensor_plan(rate.profile())
        .into_iter()
        .map(|spec| {
            let tensor = source.lookup(&spec.key)?;
            if tensor.shape != spec.shape {
                return Err(ConvertError::ShapeMismatch {
                    key: spec.key,
                    got: tensor.shape,
                    expected: spec.shape,
                });
            }
            let bytes = serialize_tensor(&spec.key, &tensor, use_f16)?;
            Ok(Payload {
                label: spec.label,
                shape: spec.shape,
                bytes,
            })
        })
        .collect()
}

fn write_output(
    path: &Path,
    header: &GgmlHeader,
    payloads: &[Payload],
) -> Result<u64, ConvertError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut builder = tempfile::Builder::new();
    builder.prefix(".silero-ggml-").suffix(".part");
    // Same mode as a plain `File::create` (0o666 minus umask), not 0o600.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(std::fs::Permissions::from_mode(0o666));
    }
    let mut tmp = builder.tempfile_in(dir)?;

    let mut written = HEADER_BYTES as u64;
    {
        let mut w = BufWriter::new(tmp.as_file_mut());
        header.write_to(&mut w)?;
        for p in payloads {
            info!("  Writing {} with shape {:?}", p.label, p.shape);
            w.write_all(&p.bytes)?;
            written += p.bytes.len() as u64;
        }
        w.flush()?;
    }
    tmp.as_file().sync_all()?;

    // Dropping `tmp` on any earlier return deletes the partial file.
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(written)
}

/// Convert the sub-network for `opts.sample_rate` into a GGML file.
///
/// Fails without touching the filesystem on an unsupported rate, unknown
/// version, or any missing / mis-shaped / non-float tensor.
pub fn convert<S: ParamSource + ?Sized>(
    source: &S,
    opts: &ConvertOptions,
) -> Result<ConvertReport, ConvertError> {
    let rate = SampleRate::try_from(opts.sample_rate)?;
    let version = opts
        .model_version
        .clone()
        .or_else(|| source.version())
        .ok_or(ConvertError::MissingVersion)?;
    let output = output_file_name(&opts.output, &version, rate);

    info!("Converting {}kHz model", rate.hz() / 1000);

    let header = GgmlHeader::from_profile(rate, opts.use_f16);
    let payloads = collect_payloads(source, rate, opts.use_f16)?;
    debug!(
        tensors = payloads.len(),
        payload_bytes = payloads.iter().map(|p| p.bytes.len()).sum::<usize>(),
        "validated model parameters"
    );

    info!("Saving GGML Silero-VAD model to {}", output.display());
    info!("Writing model weights:");
    let bytes_written = write_output(&output, &header, &payloads)?;

    info!(
        "Done! {}kHz model has been converted to GGML format: {}",
        rate.hz() / 1000,
        output.display()
    );

    Ok(ConvertReport {
        output,
        header,
        tensors_written: payloads.len(),
        bytes_written,
    })
}

/// Open a safetensors export and convert it. The sample rate is checked
/// before the model file is opened.
pub fn convert_file(
    input: impl AsRef<Path>,
    opts: &ConvertOptions,
) -> Result<ConvertReport, ConvertError> {
    SampleRate::try_from(opts.sample_rate)?;
    let input = input.as_ref();
    info!("Loading model weights from {}", input.display());
    let store = WeightStore::open(input)?;
    convert(&store, opts)
}
