//! # Description
//! the observability hook of the PE
//!
//! a PE records what happened on each clock edge as a list of [`PeEvent`].
//! the update logic never reads them back, they only exist for harnesses
//! and logs. a grid forwards the events of all its PEs to every subscribed
//! [`EventSink`], tagged with the cycle and the position of the PE.

use std::{cell::RefCell, rc::Rc};

use enum_as_inner::EnumAsInner;

use super::pe::PeState;

#[derive(Debug, Clone, PartialEq, Eq, EnumAsInner)]
pub enum PeEvent {
    /// from, to
    StateTransition(PeState, PeState),
    /// an activation was written into the input queue
    InputAccepted(i64),
    /// activation and weight latched for the compute stage
    InputDequeued(i64, i64),
    MacUpdated(i64),
    AccumulatorCleared,
    ActivationApplied(i64),
    OutputEnqueued(i64),
    /// a result moved from the output queue to `result_out`
    ResultDelivered(i64),
    ActivationForwarded(i64),
    /// slot, weight
    WeightLoaded(usize, i64),
    /// the output queue is full, activate holds
    OutputStall,
    Reset,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    pub cycle: u64,
    pub row: usize,
    pub col: usize,
    pub event: PeEvent,
}

pub trait EventSink {
    fn on_event(&mut self, record: &EventRecord);
}

/// keeps every record it receives
#[derive(Debug, Default)]
pub struct EventLog {
    records: Vec<EventRecord>,
}

impl EventLog {
    pub fn new() -> Self {
        EventLog::default()
    }

    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    /// the records of the PE at (`row`, `col`)
    pub fn for_pe(&self, row: usize, col: usize) -> impl Iterator<Item = &EventRecord> + '_ {
        self.records
            .iter()
            .filter(move |r| r.row == row && r.col == col)
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}

impl EventSink for EventLog {
    fn on_event(&mut self, record: &EventRecord) {
        self.records.push(record.clone());
    }
}

/// lets a harness keep a handle on a sink it gave to a grid
impl<T: EventSink> EventSink for Rc<RefCell<T>> {
    fn on_event(&mut self, record: &EventRecord) {
        self.borrow_mut().on_event(record);
    }
}
