//! Control block: the reserved cells behind collectives and loops
//!
//! Every domain owns one control region, id [`CONTROL_REGION_ID`], with one
//! cell per [`Slot`]. Collectives drive these cells through the ordinary
//! tagged primitives.
//!
//! | Slot            | Holds                                  | Initial |
//! |-----------------|----------------------------------------|---------|
//! | `Participants`  | N                                      | N       |
//! | `Barrier0/1`    | arrivals still expected, per phase     | N       |
//! | `BarrierPhase`  | index of the active barrier counter    | 0       |
//! | `Generation`    | completed barriers                     | 0       |
//! | `Critical`      | domain mutex, Full = unlocked          | Full    |
//! | `Single`        | tickets drawn in the current `single`  | 0       |
//! | `Loop*`         | bounds, cursor and chunking of a loop  | 0       |

use std::sync::Arc;
use tagmem_concurrency::{SharedArray, WaitPolicy};
use tagmem_core::{Error, Key, RegionConfig, Result, Value};
use tagmem_storage::{CellStore, Region, TaggedCell, CONTROL_REGION_ID};

/// Name of the control region
pub const CONTROL_REGION_NAME: &str = "__control";

/// A cell of the control block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum Slot {
    /// Number of participants
    Participants,
    /// Barrier counter used in phase 0
    Barrier0,
    /// Barrier counter used in phase 1
    Barrier1,
    /// Active barrier phase
    BarrierPhase,
    /// Number of completed barriers
    Generation,
    /// Domain-wide critical section lock
    Critical,
    /// Ticket counter of `single`
    Single,
    /// Next unclaimed loop iteration
    LoopIndex,
    /// First iteration of the current loop
    LoopStart,
    /// End (exclusive) of the current loop
    LoopEnd,
    /// Size of the next chunk grant
    LoopChunk,
    /// Smallest chunk a grant may have
    LoopMinChunk,
    /// Schedule of the current loop
    LoopSchedule,
}

impl Slot {
    /// Number of slots in a control block
    pub const COUNT: usize = Slot::LoopSchedule as usize + 1;

    /// Address of the slot's cell
    pub fn address(self) -> usize {
        self as usize
    }

    /// Barrier counter for `phase`
    pub fn barrier_counter(phase: i64) -> Slot {
        if phase == 0 {
            Slot::Barrier0
        } else {
            Slot::Barrier1
        }
    }
}

impl From<Slot> for Key {
    fn from(slot: Slot) -> Self {
        Key::Int(slot as i64)
    }
}

/// The control region of a domain
#[derive(Debug, Clone)]
pub struct ControlBlock {
    array: SharedArray,
    participants: usize,
}

impl ControlBlock {
    /// Allocate and initialize a control block for `participants`
    pub fn new(participants: usize, policy: WaitPolicy) -> Result<Self> {
        let n = i64::try_from(participants)
            .map_err(|_| Error::invalid(format!("{} participants is too many", participants)))?;
        let region = Region::new(
            CONTROL_REGION_ID,
            CONTROL_REGION_NAME,
            &RegionConfig::with_len(Slot::COUNT).fill(0i64).persist(false),
        )?;
        let array = SharedArray::new(Arc::new(region), policy);
        array.write(Slot::Participants, n)?;
        array.write(Slot::Barrier0, n)?;
        array.write(Slot::Barrier1, n)?;
        Ok(Self {
            array,
            participants,
        })
    }

    /// Number of participants the block was sized for
    pub fn participants(&self) -> usize {
        self.participants
    }

    /// Array over the control region
    pub fn array(&self) -> &SharedArray {
        &self.array
    }

    /// Raw cell of a slot
    pub fn cell(&self, slot: Slot) -> Result<&TaggedCell> {
        self.array.region().cell(slot.address())
    }

    /// Untagged read of an integer slot
    pub fn int(&self, slot: Slot) -> Result<i64> {
        match self.array.read(slot)? {
            Value::Int(i) => Ok(i),
            other => Err(Error::TypeMismatch {
                expected: "int",
                actual: other.kind(),
            }),
        }
    }

    /// Untagged write of a slot
    pub fn set(&self, slot: Slot, value: impl Into<Value>) -> Result<()> {
        self.array.write(slot, value)
    }
}
