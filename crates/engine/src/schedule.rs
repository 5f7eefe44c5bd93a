//! Parallel loop scheduling
//!
//! [`ParticipantContext::par_for_each`] splits `[start, end)` across the
//! participants of a domain.
//!
//! | Schedule  | Chunking                                                 |
//! |-----------|----------------------------------------------------------|
//! | `Static`  | one contiguous block of `ceil(len / N)` per rank         |
//! | `Dynamic` | `min_chunk` iterations per grant from a shared cursor     |
//! | `Guided`  | grants shrink as `max(remaining / 2 / N, min_chunk)`     |
//!
//! Dynamic and guided loops keep their cursor in the control block: rank 0
//! initializes it, a barrier publishes it, and participants claim chunks by
//! fetch-and-add until the cursor passes the end. Every schedule finishes
//! with a barrier, so all iterations are done when the call returns.
//!
//! The cursor is an offset from `start`. Each participant overshoots it by
//! at most one chunk past the last grant, so a loop is accepted only if
//! `len + (N + 1) * chunk` fits in an `i64`.

use crate::control::Slot;
use crate::participant::ParticipantContext;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use std::str::FromStr;
use tagmem_core::{Error, Result, Value};

/// How loop iterations are distributed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Schedule {
    /// Fixed contiguous block per participant
    Static,
    /// Fixed-size chunks claimed on demand
    Dynamic,
    /// Shrinking chunks claimed on demand
    #[default]
    Guided,
}

impl Schedule {
    /// Lowercase name
    pub fn name(&self) -> &'static str {
        match self {
            Schedule::Static => "static",
            Schedule::Dynamic => "dynamic",
            Schedule::Guided => "guided",
        }
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Schedule {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "static" => Ok(Schedule::Static),
            "dynamic" => Ok(Schedule::Dynamic),
            "guided" => Ok(Schedule::Guided),
            other => Err(Error::invalid(format!("unknown loop schedule: {}", other))),
        }
    }
}

/// Half-open range of iterations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopPartition {
    /// First iteration
    pub start: i64,
    /// One past the last iteration
    pub end: i64,
}

impl LoopPartition {
    /// Range `[start, end)`; an inverted range is empty
    pub fn new(start: i64, end: i64) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    /// Number of iterations
    pub fn len(&self) -> u64 {
        self.end.abs_diff(self.start)
    }

    /// True if there are no iterations
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Iterations in order
    pub fn iter(&self) -> Range<i64> {
        self.start..self.end
    }
}

impl IntoIterator for LoopPartition {
    type Item = i64;
    type IntoIter = Range<i64>;

    fn into_iter(self) -> Range<i64> {
        self.iter()
    }
}

/// What one participant did in a loop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopSummary {
    /// Iterations this participant ran
    pub iterations: u64,
    /// Chunks this participant was granted
    pub chunks: u64,
}

/// Static block of `rank` among `participants`
///
/// Blocks are `ceil((end - start) / participants)` long, so trailing ranks
/// may get a short or empty block.
pub fn static_partition(start: i64, end: i64, participants: usize, rank: usize) -> LoopPartition {
    if end <= start || participants == 0 || rank >= participants {
        return LoopPartition::new(start, start);
    }
    let total = end.saturating_sub(start);
    let n = participants as i64;
    let block = total / n + i64::from(total % n != 0);
    let lo = start.saturating_add(block.saturating_mul(rank as i64)).min(end);
    let hi = lo.saturating_add(block).min(end);
    LoopPartition::new(lo, hi)
}

fn guided_chunk(remaining: i64, participants: i64, min_chunk: i64) -> i64 {
    ((remaining / 2) / participants).max(min_chunk)
}

/// Number of iterations of `[start, end)`
fn loop_len(start: i64, end: i64, min_chunk: i64) -> Result<i64> {
    if min_chunk < 1 {
        return Err(Error::invalid(format!("min_chunk must be at least 1, got {}", min_chunk)));
    }
    end.max(start)
        .checked_sub(start)
        .ok_or_else(|| Error::invalid(format!("loop [{}, {}) has too many iterations", start, end)))
}

/// Length and first chunk of a dynamic or guided loop
///
/// Rejects loops whose cursor could leave the `i64` range.
fn loop_plan(
    start: i64,
    end: i64,
    schedule: Schedule,
    min_chunk: i64,
    participants: usize,
) -> Result<(i64, i64)> {
    let len = loop_len(start, end, min_chunk)?;
    let n = participants as i64;
    let chunk = match schedule {
        Schedule::Guided => guided_chunk(len, n, min_chunk),
        Schedule::Static | Schedule::Dynamic => min_chunk,
    };
    chunk
        .checked_mul(n + 1)
        .and_then(|overshoot| len.checked_add(overshoot))
        .ok_or_else(|| {
            Error::invalid(format!(
                "loop [{}, {}) with chunk {} overflows the loop cursor",
                start, end, chunk
            ))
        })?;
    Ok((len, chunk))
}

fn schedule_code(schedule: Schedule) -> Value {
    Value::from(schedule.name())
}

impl ParticipantContext {
    /// Run `body` for every iteration of `[start, end)`, split across the
    /// domain's participants
    ///
    /// Collective: every participant calls it with the same arguments. Each
    /// iteration runs exactly once on some participant. `min_chunk` must be
    /// at least 1, and dynamic or guided loops must fit the cursor (see the
    /// module docs); both are checked before the first barrier.
    pub fn par_for_each(
        &self,
        start: i64,
        end: i64,
        schedule: Schedule,
        min_chunk: i64,
        mut body: impl FnMut(i64),
    ) -> Result<LoopSummary> {
        if schedule == Schedule::Static {
            loop_len(start, end, min_chunk)?;
        } else {
            loop_plan(start, end, schedule, min_chunk, self.participant_count())?;
        }
        let mut summary = LoopSummary::default();

        if schedule == Schedule::Static {
            let part = static_partition(start, end, self.participant_count(), self.rank());
            if !part.is_empty() {
                summary.chunks = 1;
                summary.iterations = part.len();
                part.into_iter().for_each(&mut body);
            }
        } else {
            if self.is_master() {
                self.loop_init(start, end, schedule, min_chunk)?;
            }
            self.barrier()?;
            loop {
                let part = self.loop_chunk()?;
                if part.is_empty() {
                    break;
                }
                summary.chunks += 1;
                summary.iterations += part.len();
                part.into_iter().for_each(&mut body);
            }
        }

        self.barrier()?;
        Ok(summary)
    }

    /// Set up the shared cursor of a dynamic or guided loop
    ///
    /// Called by one participant, followed by a barrier, before anyone calls
    /// [`loop_chunk`](Self::loop_chunk).
    pub fn loop_init(&self, start: i64, end: i64, schedule: Schedule, min_chunk: i64) -> Result<()> {
        let (len, chunk) = loop_plan(start, end, schedule, min_chunk, self.participant_count())?;
        let end = start + len;
        let control = self.control();
        control.set(Slot::LoopIndex, 0i64)?;
        control.set(Slot::LoopStart, start)?;
        control.set(Slot::LoopEnd, end)?;
        control.set(Slot::LoopChunk, chunk)?;
        control.set(Slot::LoopMinChunk, min_chunk)?;
        control.set(Slot::LoopSchedule, schedule_code(schedule))?;
        tracing::debug!(start, end, %schedule, chunk, "loop initialized");
        Ok(())
    }

    /// Claim the next chunk of the current loop
    ///
    /// Returns an empty partition once every iteration has been handed out.
    pub fn loop_chunk(&self) -> Result<LoopPartition> {
        let control = self.control();
        let start = control.int(Slot::LoopStart)?;
        let end = control.int(Slot::LoopEnd)?;
        let len = end - start;
        let chunk = control.int(Slot::LoopChunk)?;
        let offset = control
            .array()
            .faa(Slot::LoopIndex, chunk)?
            .as_int()
            .ok_or_else(|| Error::protocol("loop cursor is not an integer"))?;
        if offset >= len {
            return Ok(LoopPartition::new(end, end));
        }
        let part = LoopPartition::new(start + offset, start + (offset + chunk).min(len));

        if control.array().read(Slot::LoopSchedule)? == schedule_code(Schedule::Guided) {
            let min_chunk = control.int(Slot::LoopMinChunk)?;
            let next = guided_chunk(len - offset, self.participant_count() as i64, min_chunk);
            control.set(Slot::LoopChunk, next)?;
        }
        tracing::trace!(rank = self.rank(), start = part.start, end = part.end, "loop chunk granted");
        Ok(part)
    }
}
