use serde::Serialize;

use super::{
    fixed_point::{is_negative, saturate},
    sigmoid,
};

/// the function selected by the 2-bit `act_func_sel` port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ActivationFunction {
    Linear,
    Relu,
    Sigmoid,
    /// reserved code, handled as linear
    Tanh,
}

impl ActivationFunction {
    /// decode `act_func_sel`, codes outside 0..=3 fall back to linear
    pub fn from_bits(bits: u8) -> Self {
        match bits {
            1 => ActivationFunction::Relu,
            2 => ActivationFunction::Sigmoid,
            3 => ActivationFunction::Tanh,
            _ => ActivationFunction::Linear,
        }
    }

    /// # Description
    /// apply the function to the latched mac result
    /// - linear and tanh: saturate to `data_width`
    /// - relu: 0 when the accumulator sign bit is set, else saturate
    /// - sigmoid: the table entry at `sigmoid_index`, latched during compute
    pub fn apply(
        self,
        mac_result: i64,
        sigmoid_index: usize,
        data_width: u32,
        accum_width: u32,
    ) -> i64 {
        match self {
            ActivationFunction::Linear | ActivationFunction::Tanh => {
                saturate(mac_result, data_width)
            }
            ActivationFunction::Relu => {
                if is_negative(mac_result, accum_width) {
                    0
                } else {
                    saturate(mac_result, data_width)
                }
            }
            ActivationFunction::Sigmoid => sigmoid::lookup(sigmoid_index),
        }
    }
}
