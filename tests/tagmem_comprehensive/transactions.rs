//! Transaction Tests
//!
//! Sorted multi-cell acquisition across regions: atomicity on abort,
//! shared read-only items, deadlock freedom under contention.

use crate::common::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tagmem::prelude::*;
use tagmem::TransactionStatus;

// =============================================================================
// COMMIT / ABORT
// =============================================================================

#[test]
fn test_commit_publishes_writes() {
    let mem = open_domain(1);
    let ctx = mem.participant(0).unwrap();
    let accounts = ctx
        .create_region(RegionConfig::with_len(2).fill(100i64))
        .unwrap();

    let tx = ctx
        .transaction_begin([TxItem::write(&accounts, 0i64), TxItem::write(&accounts, 1i64)])
        .unwrap();
    assert_eq!(accounts.tag(0).unwrap(), Tag::Empty);
    tx.set(&accounts, 0i64, 70i64).unwrap();
    tx.set(&accounts, 1i64, 130i64).unwrap();
    tx.commit().unwrap();

    assert_eq!(accounts.read_ff(0).unwrap(), Value::Int(70));
    assert_eq!(accounts.read_ff(1).unwrap(), Value::Int(130));
}

#[test]
fn test_abort_restores_every_cell() {
    let mem = open_domain(1);
    let ctx = mem.participant(0).unwrap();
    let a = ctx.create_region(RegionConfig::with_len(2).fill(1i64)).unwrap();
    let b = ctx.create_region(RegionConfig::with_len(2).fill(2i64)).unwrap();

    let mut tx = ctx
        .transaction_begin([
            TxItem::write(&b, 1i64),
            TxItem::write(&a, 0i64),
            TxItem::read(&a, 1i64),
        ])
        .unwrap();
    tx.set(&a, 0i64, "scratch").unwrap();
    tx.set(&b, 1i64, "scratch").unwrap();
    assert!(matches!(tx.set(&a, 1i64, 0i64), Err(Error::ProtocolViolation(_))));
    tx.end(false).unwrap();
    assert!(matches!(tx.status(), TransactionStatus::Aborted { .. }));
    assert!(matches!(tx.end(true), Err(Error::ProtocolViolation(_))));

    for (array, value) in [(&a, 1i64), (&b, 2i64)] {
        for i in 0..2i64 {
            assert_eq!(array.tag(i).unwrap(), Tag::Full);
            assert_eq!(array.read(i).unwrap(), Value::Int(value));
        }
    }
}

#[test]
fn test_dropped_transaction_is_aborted() {
    let mem = open_domain(1);
    let ctx = mem.participant(0).unwrap();
    let cells = ctx.create_region(RegionConfig::with_len(1).fill(5i64)).unwrap();
    {
        let tx = ctx.transaction_begin([TxItem::write(&cells, 0i64)]).unwrap();
        tx.set(&cells, 0i64, 6i64).unwrap();
    }
    assert_eq!(cells.read_ff(0).unwrap(), Value::Int(5));
}

#[test]
fn test_begin_timeout_releases_acquired_cells() {
    let mem = open_impatient_domain(1);
    let ctx = mem.participant(0).unwrap();
    let cells = ctx.create_region(RegionConfig::with_len(2).fill(0i64)).unwrap();
    cells.set_tag(1, Tag::Empty).unwrap();

    let err = ctx
        .transaction_begin([TxItem::write(&cells, 0i64), TxItem::write(&cells, 1i64)])
        .unwrap_err();
    assert!(err.is_timeout());
    assert_eq!(cells.tag(0).unwrap(), Tag::Full);
    assert_eq!(cells.read(0).unwrap(), Value::Int(0));
}

// =============================================================================
// CONTENTION
// =============================================================================

/// Random overlapping transfers between two regions, listed in random order,
/// all finish and conserve the total.
#[test]
fn test_random_transfers_are_deadlock_free_and_conserve_total() {
    let mem = open_domain(6);
    let totals = mem
        .run(|ctx| {
            let left = ctx.create_region(RegionConfig::with_len(8).name("left").fill(1000i64))?;
            let right = ctx.create_region(RegionConfig::with_len(8).name("right").fill(1000i64))?;
            let mut rng = StdRng::seed_from_u64(ctx.rank() as u64);

            for _ in 0..150 {
                let (src_arr, dst_arr) = if rng.gen_bool(0.5) {
                    (&left, &right)
                } else {
                    (&right, &left)
                };
                let src = rng.gen_range(0..8i64);
                let dst = rng.gen_range(0..8i64);
                let audit = rng.gen_range(0..8i64);

                let tx = ctx.transaction_begin([
                    TxItem::write(dst_arr, dst),
                    TxItem::read(&left, audit),
                    TxItem::write(src_arr, src),
                ])?;
                let amount = rng.gen_range(1..10i64);
                let from = tx.value(src_arr, src)?.as_int().unwrap();
                tx.set(src_arr, src, from - amount)?;
                let to = tx.value(dst_arr, dst)?.as_int().unwrap();
                tx.set(dst_arr, dst, to + amount)?;
                tx.commit()?;
            }
            ctx.barrier()?;

            let mut total = 0;
            for i in 0..8i64 {
                total += left.read_ff(i)?.as_int().unwrap();
                total += right.read_ff(i)?.as_int().unwrap();
            }
            Ok(total)
        })
        .unwrap();
    assert!(totals.iter().all(|&t| t == 16_000));
}
