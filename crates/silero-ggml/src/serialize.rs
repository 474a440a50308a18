//! Tensor payload encoding.
//!
//! Elements are emitted row-major, little-endian, with no length prefix or
//! padding. With narrowing on, `f32` tensors become IEEE 754 half precision.

use half::f16;
use safetensors::tensor::Dtype;

use crate::ConvertError;
use crate::weights::Tensor;

/// Encode one tensor's payload. `name` is only used for error reporting.
pub fn serialize_tensor(name: &str, tensor: &Tensor, narrow: bool) -> Result<Vec<u8>, ConvertError> {
    let src_size = match tensor.dtype {
        Dtype::F32 => 4,
        Dtype::F16 => 2,
        other => {
            return Err(ConvertError::UnsupportedDtype {
                name: name.to_string(),
                dtype: other,
            });
        }
    };

    let expected = tensor.element_count() * src_size;
    if tensor.data.len() != expected {
        return Err(ConvertError::InvalidByteLen {
            name: name.to_string(),
            bytes: tensor.data.len(),
            expected,
        });
    }

    if narrow && tensor.dtype == Dtype::F32 {
        let mut out = Vec::with_capacity(tensor.data.len() / 2);
        for c in tensor.data.chunks_exact(4) {
            let v = f32::from_le_bytes([c[0], c[1], c[2], c[3]]);
            out.extend_from_slice(&f16::from_f32(v).to_le_bytes());
        }
        Ok(out)
    } else {
        // Source bytes are already little-endian in the target width.
        Ok(tensor.data.clone())
    }
}
