//! Sample-rate selection and the architecture profile each rate implies.
//!
//! Silero VAD ships two sub-networks in one checkpoint: `_model` (16 kHz) and
//! `_model_8k`. They share the topology except for the STFT bin count feeding
//! the first encoder layer.

use std::fmt;

use serde::Serialize;

use crate::ConvertError;
use crate::constants::{
    ENCODER_LAYERS, ENCODER_OUT_CHANNELS, FINAL_CONV_IN, FINAL_CONV_OUT, KERNEL_SIZE,
    LSTM_HIDDEN_SIZE, LSTM_INPUT_SIZE,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SampleRate {
    Rate16k,
    Rate8k,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EncoderLayer {
    pub in_channels: usize,
    pub out_channels: usize,
    pub kernel_size: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchProfile {
    pub sample_rate: SampleRate,
    /// State-dict prefix of the sub-network for this rate.
    pub key_prefix: &'static str,
    pub input_channels: usize,
    pub encoder: [EncoderLayer; ENCODER_LAYERS],
    pub lstm_input: usize,
    pub lstm_hidden: usize,
    pub final_conv_in: usize,
    pub final_conv_out: usize,
}

const fn encoder_stack(input_channels: usize) -> [EncoderLayer; ENCODER_LAYERS] {
    let ins = [
        input_channels,
        ENCODER_OUT_CHANNELS[0],
        ENCODER_OUT_CHANNELS[1],
        ENCODER_OUT_CHANNELS[2],
    ];
    let mut layers = [EncoderLayer {
        in_channels: 0,
        out_channels: 0,
        kernel_size: KERNEL_SIZE,
    }; ENCODER_LAYERS];
    let mut i = 0;
    while i < ENCODER_LAYERS {
        layers[i].in_channels = ins[i];
        layers[i].out_channels = ENCODER_OUT_CHANNELS[i];
        i += 1;
    }
    layers
}

const fn profile(
    sample_rate: SampleRate,
    key_prefix: &'static str,
    input_channels: usize,
) -> ArchProfile {
    ArchProfile {
        sample_rate,
        key_prefix,
        input_channels,
        encoder: encoder_stack(input_channels),
        lstm_input: LSTM_INPUT_SIZE,
        lstm_hidden: LSTM_HIDDEN_SIZE,
        final_conv_in: FINAL_CONV_IN,
        final_conv_out: FINAL_CONV_OUT,
    }
}

static PROFILES: [ArchProfile; 2] = [
    profile(SampleRate::Rate16k, "_model", 129),
    profile(SampleRate::Rate8k, "_model_8k", 65),
];

impl SampleRate {
    pub const ALL: [SampleRate; 2] = [SampleRate::Rate16k, SampleRate::Rate8k];

    #[must_use]
    pub fn hz(self) -> u32 {
        match self {
            Self::Rate16k => 16_000,
            Self::Rate8k => 8_000,
        }
    }

    /// Short tag used in output file names.
    #[must_use]
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Rate16k => "16k",
            Self::Rate8k => "8k",
        }
    }

    #[must_use]
    pub fn profile(self) -> &'static ArchProfile {
        match self {
            Self::Rate16k => &PROFILES[0],
            Self::Rate8k => &PROFILES[1],
        }
    }
}

impl TryFrom<u32> for SampleRate {
    type Error = ConvertError;

    fn try_from(hz: u32) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|rate| rate.hz() == hz)
            .ok_or(ConvertError::UnsupportedSampleRate(hz))
    }
}

impl fmt::Display for SampleRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Hz", self.hz())
    }
}

impl ArchProfile {
    /// Number of `f32` elements across every tensor the converter writes.
    #[must_use]
    pub fn parameter_count(&self) -> usize {
        crate::plan::tensor_plan(self)
            .iter()
            .map(|spec| spec.element_count())
            .sum()
    }
}
