//! Format and topology constants shared by every sample-rate profile.

// File header.
pub const GGML_MAGIC: i32 = 0x6767_6D6C; // "ggml"
pub const FORMAT_VERSION: i32 = 1;
pub const HEADER_WORDS: usize = 21;
pub const HEADER_BYTES: usize = HEADER_WORDS * 4; // 84

// Encoder stack (reparameterized conv blocks).
pub const ENCODER_LAYERS: usize = 4;
pub const KERNEL_SIZE: usize = 3;
pub const ENCODER_OUT_CHANNELS: [usize; ENCODER_LAYERS] = [128, 64, 64, 128];

// Decoder: one LSTM cell followed by a 1x1 conv.
pub const LSTM_INPUT_SIZE: usize = 128;
pub const LSTM_HIDDEN_SIZE: usize = 128;
pub const LSTM_GATES: usize = 4; // i, f, g, o
pub const FINAL_CONV_IN: usize = 128;
pub const FINAL_CONV_OUT: usize = 1;
pub const FINAL_CONV_KERNEL: usize = 1;
