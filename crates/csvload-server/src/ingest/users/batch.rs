// In-memory batch buffer

use super::models::UserRecord;
use super::DEFAULT_BATCH_SIZE;

/// Buffers mapped rows until a full batch is ready for insertion
#[derive(Debug)]
pub struct BatchAccumulator {
    records: Vec<UserRecord>,
    capacity: usize,
}

impl BatchAccumulator {
    /// Create an accumulator that reports full after `capacity` rows (at least one)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, record: UserRecord) {
        self.records.push(record);
    }

    pub fn is_full(&self) -> bool {
        self.records.len() >= self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Take every buffered row, leaving the accumulator empty
    pub fn drain(&mut self) -> Vec<UserRecord> {
        std::mem::replace(&mut self.records, Vec::with_capacity(self.capacity))
    }
}

impl Default for BatchAccumulator {
    fn default() -> Self {
        Self::new(DEFAULT_BATCH_SIZE)
    }
}
