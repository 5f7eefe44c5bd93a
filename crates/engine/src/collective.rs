//! Collective operations: barrier, single, master, critical
//!
//! Every collective is built from control-block cells and the ordinary tagged
//! primitives; there is no other shared state.
//!
//! ## Barrier
//!
//! The barrier is phased: two arrival counters and a phase flag. Arrivals
//! decrement the counter of the current phase. The last arrival resets that
//! counter to N, bumps the generation, then flips the phase; the others wait
//! for the flip. The next barrier uses the other counter, so a fast
//! participant re-entering cannot disturb stragglers still leaving.
//!
//! A barrier that times out leaves its counter decremented. The domain's
//! collectives are unusable after that.

use crate::control::Slot;
use crate::participant::ParticipantContext;
use std::time::Duration;
use tagmem_core::{Error, Result, Tag};
use tagmem_storage::TaggedCell;

impl ParticipantContext {
    /// Wait until every participant reaches this barrier
    ///
    /// Uses the domain's default timeout. Returns the number of barriers
    /// the domain has completed, this one included.
    pub fn barrier(&self) -> Result<u64> {
        self.barrier_with_timeout(self.policy().timeout)
    }

    /// [`barrier`](Self::barrier) with an explicit timeout
    pub fn barrier_with_timeout(&self, timeout: Duration) -> Result<u64> {
        let control = self.control();
        let array = control.array().with_timeout(timeout);
        let phase = control.int(Slot::BarrierPhase)?;
        let counter = Slot::barrier_counter(phase);

        let remaining = array
            .faa(counter, -1i64)?
            .as_int()
            .ok_or_else(|| Error::protocol("barrier counter is not an integer"))?;
        if remaining < 1 {
            tracing::warn!(rank = self.rank(), remaining, "barrier over-subscribed");
            return Err(Error::protocol(format!(
                "barrier reached by more than {} participants",
                self.participant_count()
            )));
        }

        if remaining == 1 {
            control.set(counter, self.participant_count() as i64)?;
            array.faa(Slot::Generation, 1i64)?;
            control.set(Slot::BarrierPhase, 1 - phase)?;
        } else {
            array.policy().wait_until("barrier", || {
                Ok((control.int(Slot::BarrierPhase)? != phase).then_some(()))
            })?;
        }
        Ok(control.int(Slot::Generation)? as u64)
    }

    /// Run `body` on exactly one participant, then barrier
    ///
    /// Every participant must call `single`. The first to draw a ticket runs
    /// `body` and gets `Some(result)`; the others get `None` once the trailing
    /// barrier completes. Which participant wins is unspecified.
    pub fn single<R>(&self, body: impl FnOnce() -> R) -> Result<Option<R>> {
        let control = self.control();
        let ticket = control
            .array()
            .faa(Slot::Single, 1i64)?
            .as_int()
            .ok_or_else(|| Error::protocol("single ticket counter is not an integer"))?;
        // The last ticket resets the counter for the next `single`
        if ticket == self.participant_count() as i64 - 1 {
            control.set(Slot::Single, 0i64)?;
        }
        let result = (ticket == 0).then(body);
        self.barrier()?;
        Ok(result)
    }

    /// Run `body` on rank 0 only; no barrier
    pub fn master<R>(&self, body: impl FnOnce() -> R) -> Option<R> {
        self.is_master().then(body)
    }

    /// Run `body` while holding the domain-wide critical section
    ///
    /// The lock is released when `body` returns or unwinds.
    pub fn critical<R>(&self, timeout: Duration, body: impl FnOnce() -> R) -> Result<R> {
        let guard = self.enter_critical(timeout)?;
        let result = body();
        guard.release()?;
        Ok(result)
    }

    /// Acquire the domain-wide critical section
    pub fn enter_critical(&self, timeout: Duration) -> Result<CriticalGuard<'_>> {
        let control = self.control();
        control.array().with_timeout(timeout).read_fe(Slot::Critical)?;
        Ok(CriticalGuard {
            cell: control.cell(Slot::Critical)?,
            rank: self.rank(),
            released: false,
        })
    }
}

/// Holder of the domain-wide critical section
///
/// Dropping the guard releases the lock.
#[derive(Debug)]
pub struct CriticalGuard<'a> {
    cell: &'a TaggedCell,
    rank: usize,
    released: bool,
}

impl CriticalGuard<'_> {
    /// Release the lock, reporting a lock that was not held
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        self.unlock()
    }

    fn unlock(&self) -> Result<()> {
        self.cell
            .compare_and_set_tag(Tag::Empty, Tag::Full)
            .map(|_| ())
            .map_err(|_| {
                tracing::warn!(rank = self.rank, "critical section released while not held");
                Error::protocol("critical section released while not held")
            })
    }
}

impl Drop for CriticalGuard<'_> {
    fn drop(&mut self) {
        if !self.released {
            // Errors are already logged by unlock
            let _ = self.unlock();
        }
    }
}
