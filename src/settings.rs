use config::{Config, ConfigError, File};
use serde::{Deserialize, Serialize};

use crate::error::PeError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub pe_settings: PeConfig,
    pub grid_settings: GridSettings,
    pub stimulus: StimulusSettings,
}

/// # Description
/// the widths and depths of one processing element
///
/// the defaults are the widths of the 8-bit design: 8-bit activations and
/// weights, a 24-bit accumulator, 4 fractional bits, an 8-deep fifo on each
/// side and a 16-slot weight store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeConfig {
    pub data_width: u32,
    pub weight_width: u32,
    pub accum_width: u32,
    pub frac_bits: u32,
    pub fifo_depth: usize,
    pub weight_buffer_depth: usize,
}

impl Default for PeConfig {
    fn default() -> Self {
        PeConfig {
            data_width: 8,
            weight_width: 8,
            accum_width: 24,
            frac_bits: 4,
            fifo_depth: 8,
            weight_buffer_depth: 16,
        }
    }
}

impl PeConfig {
    /// # Description
    /// check the widths can be modelled with 64-bit registers
    /// - operands are 2..=32 bits wide
    /// - the accumulator holds a full product and fits in 63 bits
    /// - the fractional bits are inside the data width
    /// - both fifos and the weight store have at least one slot
    pub fn validate(&self) -> Result<(), PeError> {
        for (name, value) in [
            ("data_width", self.data_width),
            ("weight_width", self.weight_width),
        ] {
            if !(2..=32).contains(&value) {
                return Err(PeError::InvalidWidth {
                    name,
                    value,
                    reason: "operand widths must be between 2 and 32 bits",
                });
            }
        }
        if self.accum_width < self.data_width + self.weight_width || self.accum_width > 63 {
            return Err(PeError::InvalidWidth {
                name: "accum_width",
                value: self.accum_width,
                reason: "must hold a full product and fit in 63 bits",
            });
        }
        if self.frac_bits >= self.data_width {
            return Err(PeError::InvalidWidth {
                name: "frac_bits",
                value: self.frac_bits,
                reason: "must be smaller than data_width",
            });
        }
        if self.fifo_depth == 0 {
            return Err(PeError::ZeroDepth { name: "fifo_depth" });
        }
        if self.weight_buffer_depth == 0 {
            return Err(PeError::ZeroDepth {
                name: "weight_buffer_depth",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridSettings {
    pub rows: usize,
    pub cols: usize,
    /// act_func_sel: 0=linear, 1=relu, 2=sigmoid, 3=tanh
    pub activation: u8,
    /// 0=weight-stationary, 1=output-stationary, 2=input-stationary
    pub dataflow_mode: u8,
    pub forward_output: bool,
    pub max_cycles: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StimulusSettings {
    /// one activation stream per grid row
    pub activations: Vec<Vec<i64>>,
    /// weights[row][col] is the list loaded into that cell
    pub weights: Vec<Vec<Vec<i64>>>,
}

impl Settings {
    /// # Description
    /// build the settings from a list of toml files, later files override earlier ones
    pub fn new(config_path: Vec<String>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        for i in config_path {
            builder = builder.add_source(File::with_name(&i));
        }
        builder.build()?.try_deserialize()
    }
}
