//! # Description
//! - this module is the accelerator module
//! - the main sub module is pe, the processing element and its control fsm
//! - read pe.rs for more details
//!
//! # Components
//! - fixed_point and sigmoid: the arithmetic of the mac and activation stages
//! - circular_queue and weight_store: the buffers of a PE
//! - activation: the activation function selector
//! - pe: one processing element
//! - grid: a rectangle of PEs chained along rows
//! - system: drives a grid with a stimulus and collects the results
//! - event: the per-cycle events a harness can subscribe to
//!

pub mod activation;
pub mod circular_queue;
pub mod component;
pub mod event;
pub mod fixed_point;
pub mod grid;
pub mod pe;
pub mod sigmoid;
pub mod system;
pub mod weight_store;

pub use grid::{Grid, GridInputs};
pub use pe::{Pe, PeInputs, PeState};
pub use system::System;
