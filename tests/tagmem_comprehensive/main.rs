//! tagmem Comprehensive Test Suite
//!
//! End-to-end tests of the public facade: every test opens its own domain
//! and drives it from one thread per participant.
//!
//! ## Running Tests
//!
//! ```bash
//! # Run the whole suite
//! cargo test --test tagmem_comprehensive
//!
//! # Run the collective tests only
//! cargo test --test tagmem_comprehensive collectives::
//! ```

mod common;

pub mod collectives;
pub mod regions;
pub mod sync_primitives;
pub mod transactions;
