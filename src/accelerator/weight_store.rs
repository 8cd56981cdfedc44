use serde::Serialize;

/// # Description
/// the policy that picks the weight of a compute cycle
/// * `WeightStationary` always reuses slot 0
/// * `OutputStationary` rotates through the loaded slots
/// * `InputStationary` bypasses the store and takes the weight port as is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DataflowMode {
    WeightStationary,
    OutputStationary,
    InputStationary,
}

impl DataflowMode {
    /// decode the 2-bit `dataflow_mode` port, unknown codes fall back to weight-stationary
    pub fn from_bits(bits: u8) -> Self {
        match bits {
            1 => DataflowMode::OutputStationary,
            2 => DataflowMode::InputStationary,
            _ => DataflowMode::WeightStationary,
        }
    }
}

/// # Description
/// a circular buffer of loaded weights
/// - every load writes at the write pointer and advances it modulo the capacity,
///   whatever the dataflow mode is
/// - a selection never removes a weight
#[derive(Debug, Clone)]
pub struct WeightStore {
    slots: Vec<i64>,
    write_pointer: usize,
    loaded: usize,
    rotation: usize,
}

impl WeightStore {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "weight store capacity must be at least 1");
        WeightStore {
            slots: vec![0; capacity],
            write_pointer: 0,
            loaded: 0,
            rotation: 0,
        }
    }

    /// write `value` at the write pointer and return the slot it landed in
    pub fn load(&mut self, value: i64) -> usize {
        let slot = self.write_pointer;
        self.slots[slot] = value;
        self.write_pointer = (self.write_pointer + 1) % self.capacity();
        self.loaded = (self.loaded + 1).min(self.capacity());
        slot
    }

    /// # Description
    /// pick the weight for the next compute cycle
    ///
    /// in output-stationary mode the selection walks slot 0, 1, ... up to the
    /// slot behind the write pointer and starts again from 0, so a store
    /// loaded with `2, 4, 6` yields `2, 4, 6, 2, ...`.
    ///
    /// # Example
    /// ```
    /// use pe_grid::accelerator::weight_store::{DataflowMode, WeightStore};
    /// let mut store = WeightStore::new(16);
    /// for w in [2, 4, 6] {
    ///     store.load(w);
    /// }
    /// let os = DataflowMode::OutputStationary;
    /// assert_eq!(store.select(os, 0), 2);
    /// assert_eq!(store.select(os, 0), 4);
    /// assert_eq!(store.select(os, 0), 6);
    /// assert_eq!(store.select(DataflowMode::WeightStationary, 0), 2);
    /// assert_eq!(store.select(DataflowMode::InputStationary, 9), 9);
    /// ```
    pub fn select(&mut self, mode: DataflowMode, weight_in: i64) -> i64 {
        match mode {
            DataflowMode::WeightStationary => self.slots[0],
            DataflowMode::OutputStationary => {
                let span = self.loaded.max(1);
                let slot = self.rotation % span;
                self.rotation = (slot + 1) % span;
                self.slots[slot]
            }
            DataflowMode::InputStationary => weight_in,
        }
    }

    pub fn get(&self, slot: usize) -> Option<i64> {
        self.slots.get(slot).copied()
    }

    pub fn write_pointer(&self) -> usize {
        self.write_pointer
    }

    /// the number of slots holding a loaded weight
    pub fn loaded(&self) -> usize {
        self.loaded
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|w| *w = 0);
        self.write_pointer = 0;
        self.loaded = 0;
        self.rotation = 0;
    }
}
