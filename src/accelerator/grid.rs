use itertools::iproduct;
use log::{debug, trace, warn};

use super::{
    component::Component,
    event::{EventRecord, EventSink, PeEvent},
    pe::{Pe, PeInputs},
};
use crate::{error::PeError, settings::PeConfig};

/// # Description
/// the ports at the grid boundary
/// - `act_in_row[r]` feeds the first PE of row `r`
/// - `weight_in[r][c]` is the weight port of PE (r, c)
/// - `in_valid` drives the first column only, PE (r, c + 1) takes its valid
///   from the forward-valid register of PE (r, c)
/// - every other signal fans out to all PEs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridInputs {
    pub act_in_row: Vec<i64>,
    pub weight_in: Vec<Vec<i64>>,
    pub enable: bool,
    pub act_func_sel: u8,
    pub load_weight: bool,
    pub clear_acc: bool,
    pub forward_output: bool,
    pub dataflow_mode: u8,
    pub in_valid: bool,
    pub out_ready: bool,
}

impl GridInputs {
    pub fn new(rows: usize, cols: usize) -> Self {
        GridInputs {
            act_in_row: vec![0; rows],
            weight_in: vec![vec![0; cols]; rows],
            enable: false,
            act_func_sel: 0,
            load_weight: false,
            clear_acc: false,
            forward_output: false,
            dataflow_mode: 0,
            in_valid: false,
            out_ready: false,
        }
    }
}

/// # Description
/// a `rows` x `cols` arrangement of PEs
///
/// activations only travel along a row: the forwarded activation of PE (r, c)
/// and its valid drive the activation input of PE (r, c + 1). a PE forwards at
/// most once every three cycles and its neighbour consumes at the same rate, so
/// the interior queues never fill. there is no coupling between rows, so the
/// result of row `r` comes from the last PE of that row alone.
///
/// # Example
/// ```
/// use pe_grid::{Grid, PeConfig};
/// use pe_grid::accelerator::component::Component;
/// let mut grid = Grid::new(2, 2, PeConfig::default()).unwrap();
/// assert!(grid.in_ready());
/// assert!(!grid.out_valid());
/// grid.cycle().unwrap();
/// assert_eq!(grid.total_cycle(), 1);
/// ```
pub struct Grid {
    rows: usize,
    cols: usize,
    pes: Vec<Vec<Pe>>,
    pub inputs: GridInputs,
    total_cycle: u64,
    sinks: Vec<Box<dyn EventSink>>,
}

impl std::fmt::Debug for Grid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Grid")
            .field("rows", &self.rows)
            .field("cols", &self.cols)
            .field("pes", &self.pes)
            .field("inputs", &self.inputs)
            .field("total_cycle", &self.total_cycle)
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

impl Component for Grid {
    /// # Description
    /// * drive every PE from the grid ports and from the forwarded activations
    ///   registered on the previous edge
    /// * clock every PE
    /// * hand the events of this edge to the subscribed sinks
    fn cycle(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let drives = iproduct!(0..self.rows, 0..self.cols)
            .map(|(row, col)| self.drive(row, col))
            .collect::<Vec<_>>();
        for ((row, col), inputs) in iproduct!(0..self.rows, 0..self.cols).zip(drives) {
            self.pes[row][col].inputs = inputs;
        }
        for (row, col) in iproduct!(0..self.rows, 1..self.cols) {
            let pe = &self.pes[row][col];
            if pe.inputs.upstream_valid && !pe.upstream_ready() {
                warn!(
                    "pe ({}, {}) refused the forwarded activation {}",
                    row, col, pe.inputs.activation_in
                );
            }
        }

        for pe in self.pes.iter_mut().flatten() {
            pe.cycle()?;
        }
        self.total_cycle += 1;
        trace!(
            "grid cycle {}: in_ready={} out_valid={}",
            self.total_cycle,
            self.in_ready(),
            self.out_valid()
        );

        if !self.sinks.is_empty() {
            for (row, col) in iproduct!(0..self.rows, 0..self.cols) {
                for event in self.pes[row][col].events() {
                    let record = EventRecord {
                        cycle: self.total_cycle,
                        row,
                        col,
                        event: event.clone(),
                    };
                    for sink in self.sinks.iter_mut() {
                        sink.on_event(&record);
                    }
                }
            }
        }
        Ok(())
    }
}

impl Grid {
    pub fn new(rows: usize, cols: usize, config: PeConfig) -> Result<Self, PeError> {
        if rows == 0 || cols == 0 {
            return Err(PeError::EmptyGrid { rows, cols });
        }
        let pes = (0..rows)
            .map(|_| (0..cols).map(|_| Pe::new(config)).collect::<Result<Vec<_>, _>>())
            .collect::<Result<Vec<_>, _>>()?;
        debug!("build a {}x{} grid", rows, cols);
        Ok(Grid {
            rows,
            cols,
            pes,
            inputs: GridInputs::new(rows, cols),
            total_cycle: 0,
            sinks: Vec::new(),
        })
    }

    /// the input ports of PE (row, col) for the coming edge
    fn drive(&self, row: usize, col: usize) -> PeInputs {
        let (activation_in, upstream_valid) = if col == 0 {
            let activation = self.inputs.act_in_row.get(row).copied().unwrap_or(0);
            (activation, self.inputs.in_valid)
        } else {
            let left = &self.pes[row][col - 1];
            (left.activation_out(), left.activation_out_valid())
        };
        let weight_in = self
            .inputs
            .weight_in
            .get(row)
            .and_then(|r| r.get(col))
            .copied()
            .unwrap_or(0);
        PeInputs {
            enable: self.inputs.enable,
            act_func_sel: self.inputs.act_func_sel,
            load_weight: self.inputs.load_weight,
            clear_acc: self.inputs.clear_acc,
            forward_output: self.inputs.forward_output,
            activation_in,
            weight_in,
            upstream_valid,
            downstream_ready: self.inputs.out_ready,
            dataflow_mode: self.inputs.dataflow_mode,
        }
    }

    /// every first-column PE can accept an activation
    pub fn in_ready(&self) -> bool {
        self.pes.iter().all(|row| row[0].upstream_ready())
    }

    /// every last-column PE holds a result
    pub fn out_valid(&self) -> bool {
        self.pes.iter().all(|row| row[self.cols - 1].downstream_valid())
    }

    /// the result port of the last PE in `row`
    pub fn result_col(&self, row: usize) -> Option<i64> {
        self.pes.get(row).map(|r| r[self.cols - 1].result_out())
    }

    pub fn pe(&self, row: usize, col: usize) -> Option<&Pe> {
        self.pes.get(row).and_then(|r| r.get(col))
    }

    pub fn pes(&self) -> impl Iterator<Item = ((usize, usize), &Pe)> + '_ {
        iproduct!(0..self.rows, 0..self.cols)
            .map(move |(row, col)| ((row, col), &self.pes[row][col]))
    }

    /// every PE idle with empty queues
    pub fn is_drained(&self) -> bool {
        self.pes.iter().flatten().all(Pe::is_drained)
    }

    pub fn subscribe(&mut self, sink: Box<dyn EventSink>) {
        self.sinks.push(sink);
    }

    pub fn reset(&mut self) {
        for (row, col) in iproduct!(0..self.rows, 0..self.cols) {
            let pe = &mut self.pes[row][col];
            pe.reset();
            let record = EventRecord {
                cycle: self.total_cycle,
                row,
                col,
                event: PeEvent::Reset,
            };
            for sink in self.sinks.iter_mut() {
                sink.on_event(&record);
            }
        }
        self.inputs = GridInputs::new(self.rows, self.cols);
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn total_cycle(&self) -> u64 {
        self.total_cycle
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use itertools::Itertools;

    use super::*;
    use crate::accelerator::{event::EventLog, pe::PeState};

    fn new_grid(rows: usize, cols: usize) -> Grid {
        Grid::new(rows, cols, PeConfig::default()).unwrap()
    }

    fn load_weights(grid: &mut Grid, weights: &[Vec<i64>]) {
        grid.inputs.load_weight = true;
        grid.inputs.weight_in = weights.to_vec();
        grid.cycle().unwrap();
        grid.inputs.load_weight = false;
    }

    #[test]
    fn test_empty_grid() {
        assert_eq!(
            Grid::new(0, 2, PeConfig::default()).unwrap_err(),
            PeError::EmptyGrid { rows: 0, cols: 2 }
        );
    }

    #[test]
    fn test_weights_per_cell() {
        let mut grid = new_grid(2, 2);
        load_weights(&mut grid, &[vec![1, 2], vec![3, 4]]);
        let loaded = grid
            .pes()
            .map(|(_, pe)| pe.weights().get(0).unwrap())
            .collect_vec();
        assert_eq!(loaded, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_boundary_flags_are_row_and() {
        let mut grid = new_grid(2, 2);
        load_weights(&mut grid, &[vec![1, 1], vec![1, 1]]);
        // fill the first column while disabled
        grid.inputs.in_valid = true;
        for _ in 0..PeConfig::default().fifo_depth {
            assert!(grid.in_ready());
            grid.cycle().unwrap();
        }
        assert!(!grid.in_ready());
        assert!(!grid.pe(0, 0).unwrap().upstream_ready());
        assert!(!grid.pe(1, 0).unwrap().upstream_ready());

        // the second column only ever sees forwarded activations
        assert!(grid.pe(0, 1).unwrap().input_queue().is_empty());
        assert!(grid.pe(1, 1).unwrap().input_queue().is_empty());

        grid.reset();
        load_weights(&mut grid, &[vec![1, 1], vec![1, 1]]);
        grid.inputs.enable = true;
        grid.inputs.forward_output = true;
        grid.inputs.in_valid = true;
        grid.inputs.act_in_row = vec![1, 1];
        grid.cycle().unwrap();
        grid.inputs.in_valid = false;
        for _ in 0..12 {
            grid.cycle().unwrap();
        }
        assert!(grid.pe(0, 1).unwrap().downstream_valid());
        assert!(grid.pe(1, 1).unwrap().downstream_valid());
        assert!(grid.out_valid());
    }

    #[test]
    fn test_out_valid_needs_every_row() {
        let mut grid = new_grid(2, 1);
        load_weights(&mut grid, &[vec![1], vec![1]]);
        grid.inputs.enable = true;
        grid.inputs.in_valid = true;
        grid.cycle().unwrap();
        grid.inputs.in_valid = false;
        for _ in 0..10 {
            grid.cycle().unwrap();
        }
        assert!(grid.out_valid());
        grid.pes[1][0].inputs.downstream_ready = true;
        grid.pes[1][0].cycle().unwrap();
        assert!(grid.pe(0, 0).unwrap().downstream_valid());
        assert!(!grid.out_valid());
    }

    #[test]
    fn test_forwarding_identity() {
        let mut grid = new_grid(1, 2);
        load_weights(&mut grid, &[vec![1, 1]]);
        grid.inputs.enable = true;
        grid.inputs.forward_output = true;
        grid.inputs.in_valid = true;
        grid.inputs.act_in_row = vec![7];
        grid.cycle().unwrap();
        grid.inputs.in_valid = false;

        grid.cycle().unwrap();
        assert_eq!(grid.pe(0, 0).unwrap().state(), PeState::Compute);
        assert_eq!(grid.pe(0, 0).unwrap().current_activation(), 7);

        for _ in 0..3 {
            assert_eq!(grid.pe(0, 0).unwrap().activation_out(), 0);
            grid.cycle().unwrap();
        }
        assert_eq!(grid.pe(0, 0).unwrap().activation_out(), 7);
        assert!(grid.pe(0, 0).unwrap().activation_out_valid());
        grid.cycle().unwrap();
        // the second PE took the forwarded value into its queue
        let second = grid.pe(0, 1).unwrap();
        assert_eq!(second.inputs.activation_in, 7);
        assert!(second.inputs.upstream_valid);
        assert!(second.events().contains(&PeEvent::InputAccepted(7)));
        assert_eq!(second.input_queue().iter().collect_vec(), vec![7]);

        grid.inputs.out_ready = true;
        for _ in 0..10 {
            grid.cycle().unwrap();
        }
        assert_eq!(grid.result_col(0), Some(7));
        assert_eq!(grid.pe(0, 1).unwrap().stats().accepted_inputs, 1);
        assert!(grid.is_drained());
    }

    #[test]
    fn test_second_column_consumes_forwarded_stream() {
        let sink = Rc::new(RefCell::new(EventLog::new()));
        let mut grid = new_grid(1, 2);
        grid.subscribe(Box::new(sink.clone()));
        load_weights(&mut grid, &[vec![4, 2]]);
        grid.inputs.enable = true;
        grid.inputs.forward_output = true;
        grid.inputs.out_ready = true;
        let mut stream = vec![1, 2, 3, 4].into_iter().peekable();
        let mut results = vec![];
        for _ in 0..60 {
            grid.inputs.in_valid = grid.in_ready() && stream.peek().is_some();
            if grid.inputs.in_valid {
                grid.inputs.act_in_row = vec![stream.next().unwrap()];
            }
            grid.cycle().unwrap();
            let last = grid.pe(0, 1).unwrap();
            if last.events().iter().any(|e| e.as_result_delivered().is_some()) {
                results.push(grid.result_col(0).unwrap());
            }
        }
        assert!(grid.is_drained());

        let sink = sink.borrow();
        let accepted = sink
            .for_pe(0, 1)
            .filter_map(|r| r.event.as_input_accepted().copied())
            .collect_vec();
        let forwarded = sink
            .for_pe(0, 0)
            .filter_map(|r| r.event.as_activation_forwarded().copied())
            .collect_vec();
        assert_eq!(accepted, vec![1, 2, 3, 4]);
        assert_eq!(accepted, forwarded);
        // the first PE weighs by 4, the second by 2
        let first = sink
            .for_pe(0, 0)
            .filter_map(|r| r.event.as_result_delivered().copied())
            .collect_vec();
        assert_eq!(first, vec![4, 12, 24, 40]);
        assert_eq!(results, vec![2, 6, 12, 20]);
    }

    #[test]
    fn test_rows_are_independent() {
        let mut grid = new_grid(2, 1);
        load_weights(&mut grid, &[vec![2], vec![3]]);
        grid.inputs.enable = true;
        grid.inputs.out_ready = true;
        grid.inputs.in_valid = true;
        grid.inputs.act_in_row = vec![5, -4];
        grid.cycle().unwrap();
        grid.inputs.in_valid = false;
        for _ in 0..10 {
            grid.cycle().unwrap();
        }
        assert_eq!(grid.result_col(0), Some(10));
        assert_eq!(grid.result_col(1), Some(-12));
        assert_eq!(grid.result_col(2), None);
        assert!(grid.is_drained());
    }

    #[test]
    fn test_event_sink() {
        let sink = Rc::new(RefCell::new(EventLog::new()));
        let mut grid = new_grid(1, 2);
        grid.subscribe(Box::new(sink.clone()));
        load_weights(&mut grid, &[vec![3, 3]]);
        grid.inputs.enable = true;
        grid.inputs.in_valid = true;
        grid.inputs.act_in_row = vec![2];
        grid.cycle().unwrap();
        grid.inputs.in_valid = false;
        for _ in 0..4 {
            grid.cycle().unwrap();
        }
        let sink = sink.borrow();
        let loads = sink
            .records()
            .iter()
            .filter(|r| r.event.as_weight_loaded().is_some())
            .map(|r| (r.cycle, r.row, r.col))
            .collect_vec();
        assert_eq!(loads, vec![(1, 0, 0), (1, 0, 1)]);
        let first = sink.for_pe(0, 0).map(|r| r.event.clone()).collect_vec();
        assert!(first.contains(&PeEvent::InputAccepted(2)));
        assert!(first.contains(&PeEvent::MacUpdated(6)));
        assert!(first.contains(&PeEvent::OutputEnqueued(6)));
    }
}
