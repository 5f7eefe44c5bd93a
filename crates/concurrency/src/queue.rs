//! Stack and queue operations over a region
//!
//! A region can double as a bounded LIFO stack or a bounded FIFO ring. Both
//! share the region's insertion counter (`stack_top`); the queue also uses a
//! removal counter (`queue_bottom`). Each counter cell is guarded by its own
//! tag, moved Full -> Busy -> Full around every update, while data cells go
//! Empty -> Full on insert and Full -> Empty on removal. Regions used this way
//! should therefore be created with an Empty initial tag.

use crate::primitives::SharedArray;
use tagmem_core::{Error, Result, Tag, Value};
use tagmem_storage::TaggedCell;

fn counter(cell: &TaggedCell) -> i64 {
    cell.read_value().as_int().unwrap_or_default()
}

impl SharedArray {
    fn lock_counter(&self, operation: &'static str, cell: &TaggedCell) -> Result<i64> {
        self.acquire(operation, cell, |w| w.tag() == Tag::Full)?;
        Ok(counter(cell))
    }

    fn unlock_counter(cell: &TaggedCell, value: i64) {
        cell.replace_value(Value::Int(value));
        cell.set_tag(Tag::Full);
    }

    fn full(&self, what: &str) -> Error {
        Error::CapacityExceeded(format!("{} {} holds {} entries", what, self.name(), self.len()))
    }

    /// Push onto the top of the stack
    pub fn push(&self, value: impl Into<Value>) -> Result<()> {
        let top = self.region().stack_top();
        let idx = self.lock_counter("push", top)?;
        if idx as usize >= self.len() {
            Self::unlock_counter(top, idx);
            return Err(self.full("stack"));
        }
        let written = self.write_ef_at(idx as usize, value.into());
        Self::unlock_counter(top, if written.is_ok() { idx + 1 } else { idx });
        written
    }

    /// Pop the top of the stack, or `None` if it is empty
    pub fn pop(&self) -> Result<Option<Value>> {
        let top = self.region().stack_top();
        let idx = self.lock_counter("pop", top)?;
        if idx <= 0 {
            Self::unlock_counter(top, 0);
            return Ok(None);
        }
        let read = self.read_fe_at((idx - 1) as usize);
        Self::unlock_counter(top, if read.is_ok() { idx - 1 } else { idx });
        read.map(Some)
    }

    /// Append to the tail of the queue
    pub fn enqueue(&self, value: impl Into<Value>) -> Result<()> {
        let top = self.region().stack_top();
        let tail = self.lock_counter("enqueue", top)?;
        let head = counter(self.region().queue_bottom());
        if (tail - head) as usize >= self.len() {
            Self::unlock_counter(top, tail);
            return Err(self.full("queue"));
        }
        let slot = tail as usize % self.len();
        let written = self.write_ef_at(slot, value.into());
        Self::unlock_counter(top, if written.is_ok() { tail + 1 } else { tail });
        written
    }

    /// Remove the head of the queue, or `None` if it is empty
    pub fn dequeue(&self) -> Result<Option<Value>> {
        let bottom = self.region().queue_bottom();
        let head = self.lock_counter("dequeue", bottom)?;
        let tail = counter(self.region().stack_top());
        if head >= tail {
            Self::unlock_counter(bottom, head);
            return Ok(None);
        }
        let slot = head as usize % self.len();
        let read = self.read_fe_at(slot);
        Self::unlock_counter(bottom, if read.is_ok() { head + 1 } else { head });
        read.map(Some)
    }
}
