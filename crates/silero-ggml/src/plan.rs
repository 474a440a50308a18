//! Which tensors go into the file, under which keys, in which order.

use crate::constants::{FINAL_CONV_KERNEL, LSTM_GATES};
use crate::profile::ArchProfile;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorSpec {
    /// Full state-dict key.
    pub key: String,
    /// Name shown in progress output.
    pub label: String,
    pub shape: Vec<usize>,
}

impl TensorSpec {
    fn new(key: String, label: impl Into<String>, shape: Vec<usize>) -> Self {
        Self {
            key,
            label: label.into(),
            shape,
        }
    }

    #[must_use]
    pub fn element_count(&self) -> usize {
        self.shape.iter().product()
    }
}

/// Tensors in file order: encoder conv weight/bias pairs, LSTM cell
/// weights then biases, final 1x1 conv weight and bias.
#[must_use]
pub fn tensor_plan(profile: &ArchProfile) -> Vec<TensorSpec> {
    let prefix = profile.key_prefix;
    let mut plan = Vec::with_capacity(profile.encoder.len() * 2 + 6);

    for (i, layer) in profile.encoder.iter().enumerate() {
        let weight = format!("{prefix}.encoder.{i}.reparam_conv.weight");
        let bias = format!("{prefix}.encoder.{i}.reparam_conv.bias");
        plan.push(TensorSpec::new(
            weight.clone(),
            weight,
            vec![layer.out_channels, layer.in_channels, layer.kernel_size],
        ));
        plan.push(TensorSpec::new(bias.clone(), bias, vec![layer.out_channels]));
    }

    let gates = LSTM_GATES * profile.lstm_hidden;
    let rnn = format!("{prefix}.decoder.rnn");
    plan.push(TensorSpec::new(
        format!("{rnn}.weight_ih"),
        "lstm_weight_ih",
        vec![gates, profile.lstm_input],
    ));
    plan.push(TensorSpec::new(
        format!("{rnn}.weight_hh"),
        "lstm_weight_hh",
        vec![gates, profile.lstm_hidden],
    ));
    plan.push(TensorSpec::new(format!("{rnn}.bias_ih"), "lstm_bias_ih", vec![gates]));
    plan.push(TensorSpec::new(format!("{rnn}.bias_hh"), "lstm_bias_hh", vec![gates]));

    let head = format!("{prefix}.decoder.decoder.2");
    plan.push(TensorSpec::new(
        format!("{head}.weight"),
        "final_conv_weight",
        vec![profile.final_conv_out, profile.final_conv_in, FINAL_CONV_KERNEL],
    ));
    plan.push(TensorSpec::new(
        format!("{head}.bias"),
        "final_conv_bias",
        vec![profile.final_conv_out],
    ));

    plan
}
