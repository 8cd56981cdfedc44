use itertools::Itertools;
use log::{debug, info, warn};

use super::{component::Component, event::PeEvent, grid::Grid};
use crate::{
    error::PeError,
    settings::{GridSettings, PeConfig, Settings, StimulusSettings},
    sim_result::PeGridStatistics,
};

/// # Description
/// the state for the system
/// * `LoadingWeights` pulses `load_weight` once per weight of the per-cell lists
/// * `Clearing` pulses `clear_acc` for one cycle
/// * `Streaming` offers the activations under the ready/valid handshake
/// * `Draining` waits for every PE to go idle and every result to leave the grid
/// * `Finished` all results are out, or the cycle limit is reached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SystemState {
    LoadingWeights(usize),
    Clearing,
    Streaming(usize),
    Draining,
    Finished,
}

/// # Description
/// drives a grid with a stimulus and collects the results at the grid boundary
///
/// the driver only asserts `in_valid` while `in_ready` is high and keeps
/// `out_ready` high, so no activation is ever refused by the first column.
#[derive(Debug)]
pub struct System {
    state: SystemState,
    grid: Grid,
    stimulus: StimulusSettings,
    grid_settings: GridSettings,
    results: Vec<Vec<i64>>,
    weights_per_cell: usize,
    stream_len: usize,
}

impl Component for System {
    /// # Description
    /// * set the grid ports for the current phase
    /// * clock the grid
    /// * collect the results delivered by the last column
    /// * move to the next phase
    fn cycle(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let weights = match self.state {
            SystemState::LoadingWeights(index) => Some(self.weights_at(index)),
            SystemState::Streaming(_) | SystemState::Draining => Some(self.next_weights()),
            SystemState::Clearing | SystemState::Finished => None,
        };
        let activations = match self.state {
            SystemState::Streaming(index) if self.grid.in_ready() => Some(
                self.stimulus
                    .activations
                    .iter()
                    .map(|row| row[index])
                    .collect_vec(),
            ),
            _ => None,
        };
        let offered = activations.is_some();

        let inputs = &mut self.grid.inputs;
        inputs.enable = true;
        inputs.out_ready = true;
        inputs.load_weight = matches!(self.state, SystemState::LoadingWeights(_));
        inputs.clear_acc = self.state == SystemState::Clearing;
        inputs.in_valid = offered;
        if let Some(weights) = weights {
            inputs.weight_in = weights;
        }
        if let Some(activations) = activations {
            inputs.act_in_row = activations;
        }

        self.grid.cycle()?;
        self.collect_results();

        self.state = match self.state {
            SystemState::LoadingWeights(index) if index + 1 < self.weights_per_cell => {
                SystemState::LoadingWeights(index + 1)
            }
            SystemState::LoadingWeights(_) => SystemState::Clearing,
            SystemState::Clearing | SystemState::Streaming(_) => {
                let next = match self.state {
                    SystemState::Streaming(index) if offered => index + 1,
                    SystemState::Streaming(index) => index,
                    _ => 0,
                };
                if next < self.stream_len {
                    SystemState::Streaming(next)
                } else {
                    debug!("all activations offered at cycle {}", self.grid.total_cycle());
                    SystemState::Draining
                }
            }
            SystemState::Draining if self.grid.is_drained() => SystemState::Finished,
            other => other,
        };
        Ok(())
    }
}

impl System {
    pub fn new(
        pe_config: PeConfig,
        grid_settings: GridSettings,
        stimulus: StimulusSettings,
    ) -> Result<Self, PeError> {
        let GridSettings {
            rows,
            cols,
            activation,
            dataflow_mode,
            forward_output,
            ..
        } = grid_settings;
        let mut grid = Grid::new(rows, cols, pe_config)?;
        let (weights_per_cell, stream_len) = check_stimulus(&stimulus, rows, cols)?;
        grid.inputs.act_func_sel = activation;
        grid.inputs.dataflow_mode = dataflow_mode;
        grid.inputs.forward_output = forward_output;

        let state = if weights_per_cell > 0 {
            SystemState::LoadingWeights(0)
        } else {
            SystemState::Clearing
        };
        Ok(System {
            state,
            grid,
            stimulus,
            grid_settings,
            results: vec![vec![]; rows],
            weights_per_cell,
            stream_len,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, PeError> {
        System::new(
            settings.pe_settings,
            settings.grid_settings.clone(),
            settings.stimulus.clone(),
        )
    }

    /// the weight of every cell for step `index`, wrapping around each cell's list
    fn weights_at(&self, index: usize) -> Vec<Vec<i64>> {
        self.stimulus
            .weights
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| {
                        if cell.is_empty() {
                            0
                        } else {
                            cell[index % cell.len()]
                        }
                    })
                    .collect_vec()
            })
            .collect_vec()
    }

    /// the weight paired with the next activation each PE will consume,
    /// only read by the PEs in input-stationary mode
    fn next_weights(&self) -> Vec<Vec<i64>> {
        self.stimulus
            .weights
            .iter()
            .enumerate()
            .map(|(row, cells)| {
                cells
                    .iter()
                    .enumerate()
                    .map(|(col, cell)| {
                        let consumed = self
                            .grid
                            .pe(row, col)
                            .map_or(0, |pe| pe.stats().consumed_inputs as usize);
                        if cell.is_empty() {
                            0
                        } else {
                            cell[consumed % cell.len()]
                        }
                    })
                    .collect_vec()
            })
            .collect_vec()
    }

    fn collect_results(&mut self) {
        let last_col = self.grid.cols() - 1;
        for (row, results) in self.results.iter_mut().enumerate() {
            if let Some(pe) = self.grid.pe(row, last_col) {
                results.extend(pe.events().iter().filter_map(|e| match e {
                    PeEvent::ResultDelivered(v) => Some(*v),
                    _ => None,
                }));
            }
        }
    }

    /// # Description
    /// keep running until all finished
    /// * for each cycle, it will call the cycle function
    /// * stop at `max_cycles` even if the grid is not drained
    pub fn run(&mut self) -> Result<PeGridStatistics, Box<dyn std::error::Error>> {
        info!(
            "start running a {}x{} grid, {} activations per row",
            self.grid.rows(),
            self.grid.cols(),
            self.stream_len
        );
        while !self.finished() {
            if self.grid.total_cycle() >= self.grid_settings.max_cycles {
                warn!(
                    "stop at the cycle limit {}, state: {:?}",
                    self.grid_settings.max_cycles, self.state
                );
                break;
            }
            self.cycle()?;
        }
        let stats = self.statistics();
        info!("finished in {} cycles", stats.cycle);
        Ok(stats)
    }

    pub fn statistics(&self) -> PeGridStatistics {
        let mut stats = PeGridStatistics::new();
        stats.cycle = self.grid.total_cycle();
        stats.completed = self.finished();
        stats.results = self.results.clone();
        stats.pe_stats = (0..self.grid.rows())
            .map(|row| {
                (0..self.grid.cols())
                    .filter_map(|col| self.grid.pe(row, col).map(|pe| pe.stats().clone()))
                    .collect_vec()
            })
            .collect_vec();
        stats
    }

    pub fn finished(&self) -> bool {
        self.state == SystemState::Finished
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn grid_mut(&mut self) -> &mut Grid {
        &mut self.grid
    }

    /// the results collected so far, one list per row
    pub fn results(&self) -> &[Vec<i64>] {
        &self.results
    }
}

/// # Description
/// the stimulus must fit the grid
/// - one activation stream per row, all of the same length
/// - one weight list per cell, all of the same length
///
/// weight loads fan out to every PE, so lists of different lengths would load
/// zeros into the shorter cells.
fn check_stimulus(
    stimulus: &StimulusSettings,
    rows: usize,
    cols: usize,
) -> Result<(usize, usize), PeError> {
    if stimulus.activations.len() != rows {
        return Err(PeError::Stimulus(format!(
            "{} activation streams for {} rows",
            stimulus.activations.len(),
            rows
        )));
    }
    let stream_len = stimulus.activations.first().map_or(0, Vec::len);
    if !stimulus.activations.iter().all(|s| s.len() == stream_len) {
        return Err(PeError::Stimulus(
            "activation streams have different lengths".into(),
        ));
    }
    if stimulus.weights.len() != rows || stimulus.weights.iter().any(|r| r.len() != cols) {
        return Err(PeError::Stimulus(format!(
            "weights must be given for each of the {}x{} cells",
            rows, cols
        )));
    }
    let weights_per_cell = stimulus.weights[0][0].len();
    if !stimulus
        .weights
        .iter()
        .flatten()
        .all(|w| w.len() == weights_per_cell)
    {
        return Err(PeError::Stimulus(
            "weight lists have different lengths".into(),
        ));
    }
    Ok((weights_per_cell, stream_len))
}
