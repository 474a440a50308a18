//! Fixed 21-word file header.
//!
//! Every field is a little-endian `i32`:
//!
//! | word  | field                                  |
//! |-------|----------------------------------------|
//! | 0     | magic `0x67676d6c`                     |
//! | 1     | format version (`1`)                   |
//! | 2     | f16 flag (0/1)                         |
//! | 3     | sample rate in Hz                      |
//! | 4     | encoder layer count (`4`)              |
//! | 5..16 | (in, out, kernel) per encoder layer    |
//! | 17,18 | LSTM input / hidden size               |
//! | 19,20 | final conv in / out channels           |

use std::io::{Read, Write};

use serde::Serialize;

use crate::ConvertError;
use crate::constants::{ENCODER_LAYERS, FORMAT_VERSION, GGML_MAGIC, HEADER_BYTES, HEADER_WORDS};
use crate::profile::SampleRate;

const FIELD_NAMES: [&str; HEADER_WORDS] = [
    "magic",
    "format_version",
    "use_f16",
    "sample_rate",
    "n_encoder_layers",
    "encoder.0.in_channels",
    "encoder.0.out_channels",
    "encoder.0.kernel_size",
    "encoder.1.in_channels",
    "encoder.1.out_channels",
    "encoder.1.kernel_size",
    "encoder.2.in_channels",
    "encoder.2.out_channels",
    "encoder.2.kernel_size",
    "encoder.3.in_channels",
    "encoder.3.out_channels",
    "encoder.3.kernel_size",
    "lstm_input",
    "lstm_hidden",
    "final_conv_in",
    "final_conv_out",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LayerDims {
    pub in_channels: i32,
    pub out_channels: i32,
    pub kernel_size: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GgmlHeader {
    pub magic: i32,
    pub format_version: i32,
    pub use_f16: bool,
    pub sample_rate: i32,
    pub encoder: [LayerDims; ENCODER_LAYERS],
    pub lstm_input: i32,
    pub lstm_hidden: i32,
    pub final_conv_in: i32,
    pub final_conv_out: i32,
}

impl GgmlHeader {
    #[must_use]
    pub fn from_profile(rate: SampleRate, use_f16: bool) -> Self {
        let p = rate.profile();
        let encoder = p.encoder.map(|l| LayerDims {
            in_channels: l.in_channels as i32,
            out_channels: l.out_channels as i32,
            kernel_size: l.kernel_size as i32,
        });
        Self {
            magic: GGML_MAGIC,
            format_version: FORMAT_VERSION,
            use_f16,
            sample_rate: rate.hz() as i32,
            encoder,
            lstm_input: p.lstm_input as i32,
            lstm_hidden: p.lstm_hidden as i32,
            final_conv_in: p.final_conv_in as i32,
            final_conv_out: p.final_conv_out as i32,
        }
    }

    fn words(&self) -> [i32; HEADER_WORDS] {
        let mut w = [0i32; HEADER_WORDS];
        w[0] = self.magic;
        w[1] = self.format_version;
        w[2] = i32::from(self.use_f16);
        w[3] = self.sample_rate;
        w[4] = ENCODER_LAYERS as i32;
        for (i, l) in self.encoder.iter().enumerate() {
            w[5 + 3 * i] = l.in_channels;
            w[6 + 3 * i] = l.out_channels;
            w[7 + 3 * i] = l.kernel_size;
        }
        w[17] = self.lstm_input;
        w[18] = self.lstm_hidden;
        w[19] = self.final_conv_in;
        w[20] = self.final_conv_out;
        w
    }

    #[must_use]
    pub fn to_bytes(&self) -> [u8; HEADER_BYTES] {
        let mut out = [0u8; HEADER_BYTES];
        for (chunk, word) in out.chunks_exact_mut(4).zip(self.words()) {
            chunk.copy_from_slice(&word.to_le_bytes());
        }
        out
    }

    pub fn write_to<W: Write>(&self, mut w: W) -> Result<(), ConvertError> {
        w.write_all(&self.to_bytes())?;
        Ok(())
    }

    /// Decode a header, checking magic, format version, layer count and the
    /// f16 flag. Dimensions are returned as stored; see [`Self::profile_matches`].
    pub fn read_from<R: Read>(mut r: R) -> Result<Self, ConvertError> {
        let mut buf = [0u8; HEADER_BYTES];
        r.read_exact(&mut buf)?;
        Self::from_bytes(&buf)
    }

    pub fn from_bytes(buf: &[u8; HEADER_BYTES]) -> Result<Self, ConvertError> {
        let mut w = [0i32; HEADER_WORDS];
        for (word, c) in w.iter_mut().zip(buf.chunks_exact(4)) {
            *word = i32::from_le_bytes([c[0], c[1], c[2], c[3]]);
        }

        if w[0] != GGML_MAGIC {
            return Err(ConvertError::BadMagic(w[0]));
        }
        if w[1] != FORMAT_VERSION {
            return Err(ConvertError::UnsupportedFormatVersion(w[1]));
        }
        let use_f16 = match w[2] {
            0 => false,
            1 => true,
            other => {
                return Err(ConvertError::InvalidHeader {
                    field: "use_f16",
                    value: other,
                });
            }
        };
        if w[4] != ENCODER_LAYERS as i32 {
            return Err(ConvertError::InvalidHeader {
                field: "n_encoder_layers",
                value: w[4],
            });
        }

        let encoder = std::array::from_fn(|i| LayerDims {
            in_channels: w[5 + 3 * i],
            out_channels: w[6 + 3 * i],
            kernel_size: w[7 + 3 * i],
        });

        Ok(Self {
            magic: w[0],
            format_version: w[1],
            use_f16,
            sample_rate: w[3],
            encoder,
            lstm_input: w[17],
            lstm_hidden: w[18],
            final_conv_in: w[19],
            final_conv_out: w[20],
        })
    }

    /// Sample rate, if it names a known profile.
    #[must_use]
    pub fn rate(&self) -> Option<SampleRate> {
        u32::try_from(self.sample_rate)
            .ok()
            .and_then(|hz| SampleRate::try_from(hz).ok())
    }

    /// Resolve the stored rate and compare every word against the built-in
    /// profile, reporting the first field that differs.
    pub fn check_profile(&self) -> Result<SampleRate, ConvertError> {
        let hz = u32::try_from(self.sample_rate).map_err(|_| ConvertError::InvalidHeader {
            field: "sample_rate",
            value: self.sample_rate,
        })?;
        let rate = SampleRate::try_from(hz)?;

        let expected = Self::from_profile(rate, self.use_f16).words();
        let got = self.words();
        match (0..HEADER_WORDS).find(|&i| got[i] != expected[i]) {
            Some(i) => Err(ConvertError::ProfileMismatch {
                field: FIELD_NAMES[i],
                got: got[i],
                expected: expected[i],
                rate,
            }),
            None => Ok(rate),
        }
    }

    /// True when every dimension equals the built-in profile for the stored rate.
    #[must_use]
    pub fn profile_matches(&self) -> bool {
        self.check_profile().is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::GgmlHeader;
    use crate::ConvertError;
    use crate::constants::HEADER_BYTES;
    use crate::profile::SampleRate;

    fn words(bytes: &[u8]) -> Vec<i32> {
        bytes
            .chunks_exact(4)
            .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect()
    }

    #[test]
    fn header_layout_16k() {
        let bytes = GgmlHeader::from_profile(SampleRate::Rate16k, false).to_bytes();
        assert_eq!(bytes.len(), 84);
        assert_eq!(&bytes[..4], b"lmgg");
        assert_eq!(
            words(&bytes),
            vec![
                0x6767_6d6c, 1, 0, 16_000, 4, //
                129, 128, 3, //
                128, 64, 3, //
                64, 64, 3, //
                64, 128, 3, //
                128, 128, 128, 1,
            ]
        );
    }

    #[test]
    fn header_layout_8k_f16() {
        let w = words(&GgmlHeader::from_profile(SampleRate::Rate8k, true).to_bytes());
        assert_eq!(w.len(), 21);
        assert_eq!(w[2], 1);
        assert_eq!(w[3], 8_000);
        assert_eq!(w[5], 65);
        assert_eq!(&w[6..17], &[128, 3, 128, 64, 3, 64, 64, 3, 64, 128, 3]);
    }

    #[test]
    fn header_round_trips() {
        for rate in SampleRate::ALL {
            for use_f16 in [false, true] {
                let h = GgmlHeader::from_profile(rate, use_f16);
                let mut buf = Vec::new();
                h.write_to(&mut buf).expect("write");
                assert_eq!(buf.len(), HEADER_BYTES);

                let back = GgmlHeader::read_from(buf.as_slice()).expect("read");
                assert_eq!(back, h);
                assert_eq!(back.rate(), Some(rate));
                assert!(back.profile_matches());
            }
        }
    }

    #[test]
    fn rejects_bad_magic_and_version() {
        let mut bytes = GgmlHeader::from_profile(SampleRate::Rate16k, false).to_bytes();
        bytes[0] = 0;
        assert!(matches!(
            GgmlHeader::from_bytes(&bytes),
            Err(ConvertError::BadMagic(_))
        ));

        let mut bytes = GgmlHeader::from_profile(SampleRate::Rate16k, false).to_bytes();
        bytes[4..8].copy_from_slice(&2i32.to_le_bytes());
        assert!(matches!(
            GgmlHeader::from_bytes(&bytes),
            Err(ConvertError::UnsupportedFormatVersion(2))
        ));
    }

    #[test]
    fn rejects_invalid_flag() {
        let mut bytes = GgmlHeader::from_profile(SampleRate::Rate16k, false).to_bytes();
        bytes[8..12].copy_from_slice(&7i32.to_le_bytes());
        assert!(matches!(
            GgmlHeader::from_bytes(&bytes),
            Err(ConvertError::InvalidHeader { field: "use_f16", value: 7 })
        ));
    }

    #[test]
    fn short_input_is_io_error() {
        let bytes = GgmlHeader::from_profile(SampleRate::Rate16k, false).to_bytes();
        let err = GgmlHeader::read_from(&bytes[..40]).unwrap_err();
        assert!(matches!(err, ConvertError::Io(_)));
    }

    #[test]
    fn profile_check_names_first_bad_field() {
        let mut h = GgmlHeader::from_profile(SampleRate::Rate16k, true);
        assert_eq!(h.check_profile().expect("matches"), SampleRate::Rate16k);

        h.encoder[2].out_channels = 96;
        h.lstm_hidden = 256;
        match h.check_profile() {
            Err(ConvertError::ProfileMismatch {
                field,
                got,
                expected,
                rate,
            }) => {
                assert_eq!(field, "encoder.2.out_channels");
                assert_eq!((got, expected), (96, 64));
                assert_eq!(rate, SampleRate::Rate16k);
            }
            other => panic!("expected ProfileMismatch, got {other:?}"),
        }

        h.sample_rate = -1;
        assert!(matches!(
            h.check_profile(),
            Err(ConvertError::InvalidHeader { field: "sample_rate", value: -1 })
        ));
    }

    #[test]
    fn mismatched_dims_fail_profile_check() {
        let mut h = GgmlHeader::from_profile(SampleRate::Rate8k, false);
        h.encoder[0].in_channels = 129;
        assert!(!h.profile_matches());
        h.sample_rate = 44_100;
        assert_eq!(h.rate(), None);
        assert!(!h.profile_matches());
    }
}
