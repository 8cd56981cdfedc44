use crate::{accelerator::pe::PeStatistics, settings::Settings};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct PeGridResult {
    pub settings: Option<Settings>,
    pub stats: Option<PeGridStatistics>,
}

impl PeGridResult {
    pub fn new() -> Self {
        PeGridResult {
            settings: None,
            stats: None,
        }
    }
}

impl Default for PeGridResult {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Serialize)]
pub struct PeGridStatistics {
    pub cycle: u64,
    /// false when the run hit `max_cycles` before the grid drained
    pub completed: bool,
    /// the values delivered by the last PE of each row, in order
    pub results: Vec<Vec<i64>>,
    pub pe_stats: Vec<Vec<PeStatistics>>,
    pub simulation_time: String,
}

impl PeGridStatistics {
    pub fn new() -> Self {
        PeGridStatistics {
            cycle: 0,
            completed: false,
            results: vec![],
            pe_stats: vec![],
            simulation_time: String::new(),
        }
    }
}

impl Default for PeGridStatistics {
    fn default() -> Self {
        Self::new()
    }
}
