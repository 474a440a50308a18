//! Read back a converted file and check it against the built-in profiles.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::ConvertError;
use crate::constants::HEADER_BYTES;
use crate::header::GgmlHeader;
use crate::profile::SampleRate;

#[derive(Debug, Clone, Serialize)]
pub struct FileSummary {
    pub path: PathBuf,
    pub header: GgmlHeader,
    pub sample_rate: SampleRate,
    pub parameter_count: usize,
    pub payload_bytes: u64,
}

/// Decode the header of `path` and verify that the payload length matches
/// the profile for the stored rate.
///
/// Element width is taken from the f16 flag (2 bytes when set, 4 otherwise).
pub fn inspect_file(path: impl AsRef<Path>) -> Result<FileSummary, ConvertError> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let file_len = file.metadata()?.len();
    let header = GgmlHeader::read_from(BufReader::new(file))?;

    let sample_rate = header.check_profile()?;

    let parameter_count = sample_rate.profile().parameter_count();
    let width: u64 = if header.use_f16 { 2 } else { 4 };
    let expected = parameter_count as u64 * width;
    let payload_bytes = file_len - HEADER_BYTES as u64;
    if payload_bytes != expected {
        return Err(ConvertError::PayloadLengthMismatch {
            actual: payload_bytes,
            expected,
        });
    }

    Ok(FileSummary {
        path: path.to_path_buf(),
        header,
        sample_rate,
        parameter_count,
        payload_bytes,
    })
}
