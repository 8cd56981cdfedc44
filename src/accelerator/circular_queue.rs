/// # Description
/// a fixed capacity fifo with a read pointer (`head`), a write pointer (`tail`)
/// and an occupancy count. used for both the input activation queue and the
/// output result queue of a PE.
///
/// slots are overwritten in place, never freed.
#[derive(Debug, Clone)]
pub struct CircularQueue<T> {
    slots: Vec<T>,
    head: usize,
    tail: usize,
    count: usize,
}

impl<T: Copy + Default> CircularQueue<T> {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "queue capacity must be at least 1");
        CircularQueue {
            slots: vec![T::default(); capacity],
            head: 0,
            tail: 0,
            count: 0,
        }
    }

    /// # Description
    /// write `value` at the tail, the value is handed back when the queue is full
    ///
    /// # Example
    /// ```
    /// use pe_grid::accelerator::circular_queue::CircularQueue;
    /// let mut queue = CircularQueue::new(2);
    /// assert_eq!(queue.push(1), Ok(()));
    /// assert_eq!(queue.push(2), Ok(()));
    /// assert_eq!(queue.push(3), Err(3));
    /// assert_eq!(queue.pop(), Some(1));
    /// assert_eq!(queue.push(3), Ok(()));
    /// assert_eq!(queue.pop(), Some(2));
    /// assert_eq!(queue.pop(), Some(3));
    /// assert_eq!(queue.pop(), None);
    /// ```
    pub fn push(&mut self, value: T) -> Result<(), T> {
        if self.is_full() {
            return Err(value);
        }
        self.slots[self.tail] = value;
        self.tail = (self.tail + 1) % self.capacity();
        self.count += 1;
        Ok(())
    }

    pub fn pop(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        let value = self.slots[self.head];
        self.head = (self.head + 1) % self.capacity();
        self.count -= 1;
        Some(value)
    }

    pub fn peek(&self) -> Option<T> {
        if self.is_empty() {
            None
        } else {
            Some(self.slots[self.head])
        }
    }

    pub fn clear(&mut self) {
        self.head = 0;
        self.tail = 0;
        self.count = 0;
    }

    /// the queued values, oldest first
    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        (0..self.count).map(move |i| self.slots[(self.head + i) % self.capacity()])
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_full(&self) -> bool {
        self.count == self.capacity()
    }

    pub fn head(&self) -> usize {
        self.head
    }

    pub fn tail(&self) -> usize {
        self.tail
    }
}
