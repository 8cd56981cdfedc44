use log::{debug, trace, warn};
use serde::Serialize;

use super::{
    activation::ActivationFunction,
    circular_queue::CircularQueue,
    component::Component,
    event::PeEvent,
    fixed_point::{accumulate, multiply, wrap},
    sigmoid,
    weight_store::{DataflowMode, WeightStore},
};
use crate::{error::PeError, settings::PeConfig};

/// # Description
/// the control state of the PE pipeline
/// * `Idle` waits for the unit to be enabled and for an input
/// * `Compute` runs the multiply-accumulate on the latched operands
/// * `Activate` applies the activation function, holds while the output queue is full
/// * `Output` writes the result into the output queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PeState {
    Idle,
    Compute,
    Activate,
    Output,
}

/// the input ports of a PE, sampled on every clock edge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PeInputs {
    pub enable: bool,
    pub act_func_sel: u8,
    pub load_weight: bool,
    pub clear_acc: bool,
    pub forward_output: bool,
    pub activation_in: i64,
    pub weight_in: i64,
    pub upstream_valid: bool,
    pub downstream_ready: bool,
    pub dataflow_mode: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PeStatistics {
    pub cycles: u64,
    pub idle_cycles: u64,
    pub accepted_inputs: u64,
    pub consumed_inputs: u64,
    pub produced_results: u64,
    pub delivered_results: u64,
    pub stall_cycles: u64,
}

/// # Description
/// one processing element
///
/// the caller drives [`Pe::inputs`], calls [`Component::cycle`] once per clock
/// edge and reads the outputs. every register written in a cycle is computed
/// from the values held before the edge.
///
/// # Example
/// ```
/// use pe_grid::accelerator::{component::Component, pe::{Pe, PeState}};
/// use pe_grid::PeConfig;
/// let mut pe = Pe::new(PeConfig::default()).unwrap();
/// pe.inputs.load_weight = true;
/// pe.inputs.weight_in = 4;
/// pe.cycle().unwrap();
/// pe.inputs.load_weight = false;
/// pe.inputs.enable = true;
/// pe.inputs.upstream_valid = true;
/// pe.inputs.activation_in = 3;
/// pe.cycle().unwrap();
/// pe.inputs.upstream_valid = false;
/// pe.cycle().unwrap();
/// assert_eq!(pe.state(), PeState::Compute);
/// pe.cycle().unwrap();
/// assert_eq!(pe.mac_result(), 12);
/// ```
#[derive(Debug, Clone)]
pub struct Pe {
    pub inputs: PeInputs,
    config: PeConfig,

    state: PeState,
    prev_state: PeState,
    input_queue: CircularQueue<i64>,
    output_queue: CircularQueue<i64>,
    weights: WeightStore,

    // pipeline registers
    current_activation: i64,
    current_weight: i64,
    accumulator: i64,
    mac_result: i64,
    sigmoid_index: usize,
    activation_result: i64,
    pending_output: i64,

    // output ports
    activation_out: i64,
    activation_out_valid: bool,
    result_out: i64,

    events: Vec<PeEvent>,
    stats: PeStatistics,
}

impl Component for Pe {
    /// # Description
    /// one rising clock edge
    /// * the queue flags, the state and the pipeline registers are sampled first
    /// * each stage then writes its register from the sampled values
    /// * the events of this edge replace the events of the previous one
    fn cycle(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.events.clear();
        let PeConfig {
            data_width,
            weight_width,
            accum_width,
            frac_bits,
            ..
        } = self.config;
        let inputs = self.inputs;
        let activation_in = wrap(inputs.activation_in, data_width);
        let weight_in = wrap(inputs.weight_in, weight_width);
        let function = ActivationFunction::from_bits(inputs.act_func_sel);
        let mode = DataflowMode::from_bits(inputs.dataflow_mode);

        let state = self.state;
        let in_empty = self.input_queue.is_empty();
        let in_full = self.input_queue.is_full();
        let out_empty = self.output_queue.is_empty();
        let out_full = self.output_queue.is_full();
        let next_state = self.next_state(in_empty, out_full);
        // high for the one cycle after a forwarding edge
        self.activation_out_valid = false;

        // the result port drains the output queue on any cycle
        if !out_empty && inputs.downstream_ready {
            if let Some(result) = self.output_queue.pop() {
                self.result_out = result;
                self.stats.delivered_results += 1;
                self.events.push(PeEvent::ResultDelivered(result));
            }
        }

        if state == PeState::Output {
            if self.prev_state == PeState::Activate {
                self.pending_output = self.activation_result;
            }
            if !out_full {
                match self.output_queue.push(self.pending_output) {
                    Ok(()) => {
                        self.stats.produced_results += 1;
                        self.events.push(PeEvent::OutputEnqueued(self.pending_output));
                    }
                    Err(lost) => warn!("output queue refused {}", lost),
                }
            }
            if inputs.forward_output {
                self.activation_out = self.current_activation;
                self.activation_out_valid = true;
                self.events.push(PeEvent::ActivationForwarded(self.current_activation));
            }
        }

        if state == PeState::Activate {
            let result =
                function.apply(self.mac_result, self.sigmoid_index, data_width, accum_width);
            self.activation_result = wrap(result, data_width);
            self.events.push(PeEvent::ActivationApplied(self.activation_result));
            if next_state == PeState::Activate {
                self.stats.stall_cycles += 1;
                self.events.push(PeEvent::OutputStall);
            }
        }

        if state == PeState::Compute {
            let sum = if inputs.clear_acc {
                0
            } else {
                let product = multiply(self.current_activation, self.current_weight);
                accumulate(self.accumulator, product, accum_width)
            };
            self.accumulator = sum;
            self.mac_result = sum;
            if function == ActivationFunction::Sigmoid {
                self.sigmoid_index = sigmoid::index_for(sum, frac_bits);
            }
            if inputs.clear_acc {
                self.events.push(PeEvent::AccumulatorCleared);
            }
            self.events.push(PeEvent::MacUpdated(sum));
        } else if inputs.clear_acc {
            self.accumulator = 0;
            self.mac_result = 0;
            self.events.push(PeEvent::AccumulatorCleared);
        }

        // every entry into compute consumes one queued activation
        if next_state == PeState::Compute {
            if let Some(activation) = self.input_queue.pop() {
                let weight = self.weights.select(mode, weight_in);
                self.current_activation = activation;
                self.current_weight = wrap(weight, weight_width);
                self.stats.consumed_inputs += 1;
                self.events.push(PeEvent::InputDequeued(activation, self.current_weight));
            }
        }

        if inputs.upstream_valid && !in_full && self.input_queue.push(activation_in).is_ok() {
            self.stats.accepted_inputs += 1;
            self.events.push(PeEvent::InputAccepted(activation_in));
        }

        if inputs.load_weight {
            let slot = self.weights.load(weight_in);
            self.events.push(PeEvent::WeightLoaded(slot, weight_in));
        }

        if next_state != state {
            debug!("pe: {:?} -> {:?}", state, next_state);
            self.events.push(PeEvent::StateTransition(state, next_state));
        }
        self.prev_state = state;
        self.state = next_state;

        self.stats.cycles += 1;
        if state == PeState::Idle {
            self.stats.idle_cycles += 1;
        }
        for event in &self.events {
            trace!("pe cycle {}: {:?}", self.stats.cycles, event);
        }
        Ok(())
    }
}

impl Pe {
    pub fn new(config: PeConfig) -> Result<Self, PeError> {
        config.validate()?;
        Ok(Pe {
            inputs: PeInputs::default(),
            config,
            state: PeState::Idle,
            prev_state: PeState::Idle,
            input_queue: CircularQueue::new(config.fifo_depth),
            output_queue: CircularQueue::new(config.fifo_depth),
            weights: WeightStore::new(config.weight_buffer_depth),
            current_activation: 0,
            current_weight: 0,
            accumulator: 0,
            mac_result: 0,
            sigmoid_index: 0,
            activation_result: 0,
            pending_output: 0,
            activation_out: 0,
            activation_out_valid: false,
            result_out: 0,
            events: Vec::new(),
            stats: PeStatistics::default(),
        })
    }

    /// # Description
    /// the transition function of the control fsm
    /// - idle -> compute: enabled and the input queue holds data
    /// - compute -> activate: always, one cycle of mac latency
    /// - activate -> output: the output queue has room, else hold
    /// - output -> compute or idle: same test as idle
    fn next_state(&self, in_empty: bool, out_full: bool) -> PeState {
        let can_start = self.inputs.enable && !in_empty;
        match self.state {
            PeState::Idle | PeState::Output if can_start => PeState::Compute,
            PeState::Idle | PeState::Output => PeState::Idle,
            PeState::Compute => PeState::Activate,
            PeState::Activate if out_full => PeState::Activate,
            PeState::Activate => PeState::Output,
        }
    }

    /// # Description
    /// synchronous reset: back to idle, both queues empty, every register zeroed.
    /// the weight store is cleared as well.
    pub fn reset(&mut self) {
        self.state = PeState::Idle;
        self.prev_state = PeState::Idle;
        self.input_queue.clear();
        self.output_queue.clear();
        self.weights.clear();
        self.current_activation = 0;
        self.current_weight = 0;
        self.accumulator = 0;
        self.mac_result = 0;
        self.sigmoid_index = 0;
        self.activation_result = 0;
        self.pending_output = 0;
        self.activation_out = 0;
        self.activation_out_valid = false;
        self.result_out = 0;
        self.events.clear();
        self.events.push(PeEvent::Reset);
        debug!("pe reset");
    }

    /// = input queue not full
    pub fn upstream_ready(&self) -> bool {
        !self.input_queue.is_full()
    }

    /// = output queue not empty
    pub fn downstream_valid(&self) -> bool {
        !self.output_queue.is_empty()
    }

    pub fn activation_out(&self) -> i64 {
        self.activation_out
    }

    /// `activation_out` was written on the last edge and is offered to the next PE
    pub fn activation_out_valid(&self) -> bool {
        self.activation_out_valid
    }

    pub fn result_out(&self) -> i64 {
        self.result_out
    }

    /// `result_out` read as an unsigned `data_width`-bit pattern, the scale of the sigmoid table
    pub fn result_out_unsigned(&self) -> u64 {
        let mask = (1u64 << self.config.data_width) - 1;
        self.result_out as u64 & mask
    }

    /// idle with both queues empty and no activation on offer
    pub fn is_drained(&self) -> bool {
        self.state == PeState::Idle
            && self.input_queue.is_empty()
            && self.output_queue.is_empty()
            && !self.activation_out_valid
    }

    pub fn state(&self) -> PeState {
        self.state
    }

    pub fn prev_state(&self) -> PeState {
        self.prev_state
    }

    pub fn config(&self) -> &PeConfig {
        &self.config
    }

    pub fn input_queue(&self) -> &CircularQueue<i64> {
        &self.input_queue
    }

    pub fn output_queue(&self) -> &CircularQueue<i64> {
        &self.output_queue
    }

    pub fn weights(&self) -> &WeightStore {
        &self.weights
    }

    pub fn current_activation(&self) -> i64 {
        self.current_activation
    }

    pub fn current_weight(&self) -> i64 {
        self.current_weight
    }

    pub fn accumulator(&self) -> i64 {
        self.accumulator
    }

    pub fn mac_result(&self) -> i64 {
        self.mac_result
    }

    pub fn sigmoid_index(&self) -> usize {
        self.sigmoid_index
    }

    pub fn activation_result(&self) -> i64 {
        self.activation_result
    }

    pub fn pending_output(&self) -> i64 {
        self.pending_output
    }

    /// the events of the last cycle
    pub fn events(&self) -> &[PeEvent] {
        &self.events
    }

    /// move the events of the last cycle out
    pub fn take_events(&mut self) -> Vec<PeEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn stats(&self) -> &PeStatistics {
        &self.stats
    }
}
