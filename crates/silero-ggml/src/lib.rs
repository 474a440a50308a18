//! Silero VAD to GGML converter.
//!
//! This crate provides:
//! - Sample-rate profiles describing the fixed VAD topology
//! - Safetensors-backed parameter lookup
//! - Header codec and tensor serialization for the GGML layout
//! - An all-or-nothing converter plus a reader for produced files

pub mod constants;
pub mod convert;
pub mod header;
pub mod inspect;
pub mod plan;
pub mod profile;
pub mod serialize;
pub mod source;
pub mod weights;

use safetensors::tensor::{Dtype, SafeTensorError};
use thiserror::Error;

pub use convert::{ConvertOptions, ConvertReport, convert, convert_file, output_file_name};
pub use header::GgmlHeader;
pub use inspect::{FileSummary, inspect_file};
pub use profile::{ArchProfile, SampleRate};
pub use source::{ParamMap, ParamSource};
pub use weights::{Tensor, WeightStore};

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("unsupported sample rate: {0} (expected 8000 or 16000)")]
    UnsupportedSampleRate(u32),
    #[error("missing model parameter: {key}")]
    MissingParameter { key: String },
    #[error("shape mismatch for {key}: got {got:?}, expected {expected:?}")]
    ShapeMismatch {
        key: String,
        got: Vec<usize>,
        expected: Vec<usize>,
    },
    #[error("unsupported dtype for {name}: {dtype:?}")]
    UnsupportedDtype { name: String, dtype: Dtype },
    #[error("invalid tensor byte length for {name}: got {bytes}, expected {expected}")]
    InvalidByteLen {
        name: String,
        bytes: usize,
        expected: usize,
    },
    #[error("model version unknown: pass --model-version or embed `silero_version` metadata")]
    MissingVersion,
    #[error("bad magic: {0:#010x}")]
    BadMagic(i32),
    #[error("unsupported format version: {0}")]
    UnsupportedFormatVersion(i32),
    #[error("invalid header field {field}: {value}")]
    InvalidHeader { field: &'static str, value: i32 },
    #[error("header field {field} is {got}, expected {expected} for {rate}")]
    ProfileMismatch {
        field: &'static str,
        got: i32,
        expected: i32,
        rate: SampleRate,
    },
    #[error("payload length mismatch: got {actual} bytes, expected {expected}")]
    PayloadLengthMismatch { actual: u64, expected: u64 },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("safetensors error: {0}")]
    SafeTensors(#[from] SafeTensorError),
}
