//! Safetensors-backed model weight loading.

use std::path::Path;

use memmap2::MmapOptions;
use safetensors::SafeTensors;
use safetensors::tensor::{Dtype, SafeTensorError};

use crate::ConvertError;
use crate::source::ParamSource;

/// Metadata keys probed, in order, for the upstream package version.
pub const VERSION_METADATA_KEYS: [&str; 2] = ["silero_version", "version"];

/// A single named parameter: element type, row-major shape and raw
/// little-endian element bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    pub dtype: Dtype,
    pub shape: Vec<usize>,
    pub data: Vec<u8>,
}

impl Tensor {
    pub fn from_f32(shape: Vec<usize>, values: &[f32]) -> Self {
        let mut data = Vec::with_capacity(values.len() * 4);
        for v in values {
            data.extend_from_slice(&v.to_le_bytes());
        }
        Self {
            dtype: Dtype::F32,
            shape,
            data,
        }
    }

    #[must_use]
    pub fn element_count(&self) -> usize {
        self.shape.iter().product()
    }
}

#[derive(Debug)]
pub struct WeightStore {
    mmap: memmap2::Mmap,
}

impl WeightStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ConvertError> {
        let file = std::fs::File::open(path)?;
        // SAFETY: read-only file mapping for immutable tensor access.
        let mmap = unsafe { MmapOptions::new().map(&file)? };
        // Reject a corrupt header up front rather than on first lookup.
        SafeTensors::deserialize(&mmap)?;
        Ok(Self { mmap })
    }

    pub fn names(&self) -> Result<Vec<String>, ConvertError> {
        let st = SafeTensors::deserialize(&self.mmap)?;
        let mut names: Vec<String> = st.names().into_iter().cloned().collect();
        names.sort();
        Ok(names)
    }

    /// Value of a `__metadata__` entry, if the file carries one.
    pub fn metadata(&self, key: &str) -> Result<Option<String>, ConvertError> {
        let (_, meta) = SafeTensors::read_metadata(&self.mmap)?;
        Ok(meta
            .metadata()
            .as_ref()
            .and_then(|m| m.get(key))
            .cloned())
    }

    pub fn tensor(&self, name: &str) -> Result<Tensor, ConvertError> {
        let st = SafeTensors::deserialize(&self.mmap)?;
        let tv = st.tensor(name).map_err(|err| match err {
            SafeTensorError::TensorNotFound(_) => ConvertError::MissingParameter {
                key: name.to_string(),
            },
            other => ConvertError::SafeTensors(other),
        })?;

        Ok(Tensor {
            dtype: tv.dtype(),
            shape: tv.shape().to_vec(),
            data: tv.data().to_vec(),
        })
    }
}

impl ParamSource for WeightStore {
    fn lookup(&self, key: &str) -> Result<Tensor, ConvertError> {
        self.tensor(key)
    }

    fn version(&self) -> Option<String> {
        VERSION_METADATA_KEYS
            .iter()
            .find_map(|key| self.metadata(key).ok().flatten())
    }
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    use safetensors::tensor::{Dtype, View, serialize_to_file};

    use super::WeightStore;
    use crate::ConvertError;
    use crate::source::ParamSource;

    #[derive(Debug, Clone)]
    struct TestTensor {
        dtype: Dtype,
        shape: Vec<usize>,
        data: Vec<u8>,
    }

    impl View for TestTensor {
        fn dtype(&self) -> Dtype {
            self.dtype
        }

        fn shape(&self) -> &[usize] {
            &self.shape
        }

        fn data(&self) -> Cow<'_, [u8]> {
            Cow::Borrowed(&self.data)
        }

        fn data_len(&self) -> usize {
            self.data.len()
        }
    }

    fn tmp_file(name: &str) -> PathBuf {
        let mut p = std::env::temp_dir();
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos();
        p.push(format!("silero-weights-test-{name}-{nanos}.safetensors"));
        p
    }

    fn f32_tensor(shape: Vec<usize>, values: &[f32]) -> TestTensor {
        let mut data = Vec::with_capacity(values.len() * 4);
        for v in values {
            data.extend_from_slice(&v.to_le_bytes());
        }
        TestTensor {
            dtype: Dtype::F32,
            shape,
            data,
        }
    }

    #[test]
    fn looks_up_tensors_by_key() {
        let tensors = vec![
            (
                "_model.encoder.0.reparam_conv.bias".to_string(),
                f32_tensor(vec![2], &[0.5, -1.5]),
            ),
            (
                "_model.decoder.rnn.bias_ih".to_string(),
                f32_tensor(vec![2, 2], &[1.0, 2.0, 3.0, 4.0]),
            ),
        ];
        let path = tmp_file("lookup");
        serialize_to_file(tensors, &None, &path).expect("serialize safetensors");

        let ws = WeightStore::open(&path).expect("open");
        assert_eq!(
            ws.names().expect("names"),
            vec![
                "_model.decoder.rnn.bias_ih".to_string(),
                "_model.encoder.0.reparam_conv.bias".to_string(),
            ]
        );

        let t = ws
            .lookup("_model.decoder.rnn.bias_ih")
            .expect("tensor present");
        assert_eq!(t.dtype, Dtype::F32);
        assert_eq!(t.shape, vec![2, 2]);
        assert_eq!(t.element_count(), 4);
        assert_eq!(&t.data[..4], &1.0f32.to_le_bytes());

        let err = ws.lookup("_model.decoder.rnn.weight_ih").unwrap_err();
        assert!(
            matches!(err, ConvertError::MissingParameter { ref key } if key == "_model.decoder.rnn.weight_ih")
        );
        assert_eq!(ws.version(), None);

        std::fs::remove_file(path).expect("cleanup");
    }

    #[test]
    fn reads_version_from_metadata() {
        let tensors = vec![("x".to_string(), f32_tensor(vec![1], &[0.0]))];
        let meta = HashMap::from([("silero_version".to_string(), "5.1.2".to_string())]);
        let path = tmp_file("version");
        serialize_to_file(tensors, &Some(meta), &path).expect("serialize safetensors");

        let ws = WeightStore::open(&path).expect("open");
        assert_eq!(ws.metadata("silero_version").expect("meta"), Some("5.1.2".to_string()));
        assert_eq!(ws.metadata("other").expect("meta"), None);
        assert_eq!(ws.version(), Some("5.1.2".to_string()));

        std::fs::remove_file(path).expect("cleanup");
    }

    #[test]
    fn rejects_non_safetensors_file() {
        let path = tmp_file("garbage");
        std::fs::write(&path, b"definitely not a safetensors header").expect("write");
        assert!(WeightStore::open(&path).is_err());
        std::fs::remove_file(path).expect("cleanup");
    }
}
