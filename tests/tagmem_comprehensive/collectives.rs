//! Collective Operation Tests
//!
//! Barrier rendezvous, single, master and critical through the facade.

use crate::common::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tagmem::prelude::*;

// =============================================================================
// BARRIER
// =============================================================================

/// Ranks arrive at different times; no rank sees a later round's writes
/// before the barrier, and every rank sees all of them after it.
#[test]
fn test_barrier_with_staggered_arrivals() {
    let mem = open_domain(5);
    mem.run(|ctx| {
        let flags = ctx.create_region(RegionConfig::with_len(5).name("flags").fill(0i64))?;
        for round in 1..=10i64 {
            std::thread::sleep(Duration::from_micros(200 * ctx.rank() as u64));
            flags.write(ctx.rank(), round)?;
            ctx.barrier()?;
            for r in 0..5usize {
                let seen = flags.read(r)?.as_int().unwrap();
                assert!(seen >= round, "rank {} saw {} in round {}", r, seen, round);
            }
            ctx.barrier()?;
        }
        Ok(())
    })
    .unwrap();
}

#[test]
fn test_barrier_generations_agree() {
    let mem = open_domain(3);
    let generations = mem
        .run(|ctx| (0..5).map(|_| ctx.barrier()).collect::<Result<Vec<u64>>>())
        .unwrap();
    assert!(generations.iter().all(|g| g == &generations[0]));
    let first = generations[0][0];
    assert_eq!(generations[0], (first..first + 5).collect::<Vec<_>>());
}

#[test]
fn test_barrier_timeout() {
    let mem = open_domain(2);
    let ctx = mem.participant(1).unwrap();
    let err = ctx.barrier_with_timeout(Duration::from_millis(30)).unwrap_err();
    assert!(err.is_timeout());
}

// =============================================================================
// SINGLE / MASTER
// =============================================================================

#[test]
fn test_single_executes_exactly_once_per_call() {
    let mem = open_domain(4);
    let executions = AtomicUsize::new(0);
    let outcomes = mem
        .run(|ctx| {
            let mut won = 0;
            for _ in 0..25 {
                if ctx.single(|| executions.fetch_add(1, Ordering::SeqCst))?.is_some() {
                    won += 1;
                }
            }
            Ok(won)
        })
        .unwrap();
    assert_eq!(executions.load(Ordering::SeqCst), 25);
    assert_eq!(outcomes.iter().sum::<usize>(), 25);
}

/// The single body's result is visible to everyone after the trailing
/// barrier.
#[test]
fn test_single_initializes_shared_state() {
    let mem = open_domain(3);
    mem.run(|ctx| {
        let config = ctx.create_region(RegionConfig::with_len(1).name("config"))?;
        ctx.single(|| config.write(0, json!({"ready": true})))?.transpose()?;
        assert_eq!(config.read(0)?, Value::Json(json!({"ready": true})));
        Ok(())
    })
    .unwrap();
}

#[test]
fn test_master_only_on_rank_zero() {
    let mem = open_domain(3);
    let ran = mem.run(|ctx| Ok(ctx.master(|| ctx.rank()))).unwrap();
    assert_eq!(ran, vec![Some(0), None, None]);
}

// =============================================================================
// CRITICAL
// =============================================================================

#[test]
fn test_critical_serializes_read_modify_write() {
    let mem = open_domain(4);
    mem.run(|ctx| {
        let total = ctx.create_region(RegionConfig::with_len(1).name("total").fill(0i64))?;
        for _ in 0..50 {
            ctx.critical(Duration::from_secs(10), || -> Result<()> {
                let v = total.read(0)?.as_int().unwrap();
                std::thread::yield_now();
                total.write(0, v + 1)
            })??;
        }
        ctx.barrier()?;
        assert_eq!(total.read(0)?, Value::Int(200));
        Ok(())
    })
    .unwrap();
}

#[test]
fn test_critical_guard_blocks_other_ranks() {
    let mem = open_impatient_domain(2);
    let ps = mem.participants();
    let guard = ps[0].enter_critical(Duration::from_millis(50)).unwrap();
    assert!(ps[1].critical(Duration::from_millis(30), || ()).unwrap_err().is_timeout());
    drop(guard);
    assert_eq!(ps[1].critical(Duration::from_millis(30), || "in").unwrap(), "in");
}
