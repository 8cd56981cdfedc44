//! the crate pe_grid is a cycle-level model of a fixed-point processing element (PE)
//! and of a small grid built from it, for matrix-multiply acceleration.
//! there are 4 parts in the crate:
//!
//! - accelerator: the PE, its queues, weight store and FSM, the grid and the stimulus driver.
//! - settings: the layered toml settings.
//! - sim_result: the result statistics to record the result.
//! - error: the configuration and stimulus errors.
//!

pub mod accelerator;
pub mod cmd_args;
pub mod error;
pub mod settings;
pub mod sim_result;

pub use accelerator::{Grid, GridInputs, Pe, PeInputs, System};
pub use error::PeError;
pub use settings::{PeConfig, Settings};
pub use sim_result::{PeGridResult, PeGridStatistics};
