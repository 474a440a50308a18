//! Parameter lookup seam between the converter and whatever holds the weights.

use std::collections::BTreeMap;

use crate::ConvertError;
use crate::weights::Tensor;

/// Something that can resolve a state-dict key to a tensor.
pub trait ParamSource {
    /// Returns [`ConvertError::MissingParameter`] when `key` is absent.
    fn lookup(&self, key: &str) -> Result<Tensor, ConvertError>;

    /// Upstream model version, used in the output file name.
    fn version(&self) -> Option<String> {
        None
    }
}

/// In-memory parameter set.
#[derive(Debug, Clone, Default)]
pub struct ParamMap {
    tensors: BTreeMap<String, Tensor>,
    version: Option<String>,
}

impl ParamMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, tensor: Tensor) -> Option<Tensor> {
        self.tensors.insert(key.into(), tensor)
    }

    pub fn remove(&mut self, key: &str) -> Option<Tensor> {
        self.tensors.remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.tensors.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }
}

impl ParamSource for ParamMap {
    fn lookup(&self, key: &str) -> Result<Tensor, ConvertError> {
        self.tensors
            .get(key)
            .cloned()
            .ok_or_else(|| ConvertError::MissingParameter {
                key: key.to_string(),
            })
    }

    fn version(&self) -> Option<String> {
        self.version.clone()
    }
}

impl FromIterator<(String, Tensor)> for ParamMap {
    fn from_iter<I: IntoIterator<Item = (String, Tensor)>>(iter: I) -> Self {
        Self {
            tensors: iter.into_iter().collect(),
            version: None,
        }
    }
}
