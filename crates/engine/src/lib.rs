//! Coordination engine for tagged shared memory
//!
//! This crate ties regions, primitives and transactions into a domain of N
//! cooperating participants:
//! - Domain: the shared registry, control block and configuration
//! - ParticipantContext: one participant's view (rank, region lifecycle)
//! - Collectives: barrier, single, master, critical
//! - Loop scheduling: static, dynamic and guided partitioning
//!
//! All coordination state lives in the control block of a domain, a reserved
//! region whose cells are driven by the same tagged primitives as user data.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod collective;
pub mod config;
pub mod control;
pub mod domain;
pub mod participant;
pub mod schedule;

pub use collective::CriticalGuard;
pub use config::DomainConfig;
pub use control::{ControlBlock, Slot};
pub use domain::Domain;
pub use participant::ParticipantContext;
pub use schedule::{static_partition, LoopPartition, LoopSummary, Schedule};
