//! Synchronization Primitive Tests
//!
//! Full/empty reads and writes, shared readers, fetch-and-add,
//! compare-and-swap, key-mapped regions, stacks and queues.

use crate::common::*;
use std::collections::HashSet;
use tagmem::prelude::*;

// =============================================================================
// FULL / EMPTY
// =============================================================================

#[test]
fn test_tag_round_trip_for_every_value_kind() {
    let mem = open_domain(1);
    let ctx = mem.participant(0).unwrap();
    let values = standard_test_values();
    let cells = ctx
        .create_region(RegionConfig::with_len(values.len()).initial_tag(Tag::Empty))
        .unwrap();

    for (i, (name, value)) in values.iter().enumerate() {
        cells.write_ef(i, value.clone()).unwrap();
        assert_eq!(cells.tag(i).unwrap(), Tag::Full, "tag after write_ef: {}", name);
        assert_eq!(&cells.read_ff(i).unwrap(), value, "read_ff: {}", name);
        assert_eq!(&cells.read_fe(i).unwrap(), value, "read_fe: {}", name);
        assert_eq!(cells.tag(i).unwrap(), Tag::Empty, "tag after read_fe: {}", name);
    }
}

/// A single Empty cell works as a one-slot channel between two ranks.
#[test]
fn test_producer_consumer_through_one_cell() {
    let mem = open_domain(2);
    let received = mem
        .run(|ctx| {
            let slot = ctx.create_region(
                RegionConfig::with_len(1).name("channel").initial_tag(Tag::Empty),
            )?;
            let mut got = Vec::new();
            for i in 0..200i64 {
                if ctx.rank() == 0 {
                    slot.write_ef(0, i)?;
                } else {
                    got.push(slot.read_fe(0)?.as_int().unwrap());
                }
            }
            Ok(got)
        })
        .unwrap();
    assert_eq!(received[1], (0..200).collect::<Vec<_>>());
}

#[test]
fn test_read_fe_times_out_on_empty_cell() {
    let mem = open_impatient_domain(1);
    let ctx = mem.participant(0).unwrap();
    let cells = ctx
        .create_region(RegionConfig::with_len(1).initial_tag(Tag::Empty))
        .unwrap();
    let err = cells.read_fe(0).unwrap_err();
    assert!(err.is_timeout());
    assert_eq!(cells.tag(0).unwrap(), Tag::Empty);
}

#[test]
fn test_untagged_access_preserves_tags() {
    let mem = open_domain(1);
    let ctx = mem.participant(0).unwrap();
    let cells = ctx
        .create_region(RegionConfig::with_len(2).initial_tag(Tag::Empty))
        .unwrap();
    cells.set(0, "plain").unwrap();
    assert_eq!(cells.get(0).unwrap(), Value::from("plain"));
    assert_eq!(cells.tag(0).unwrap(), Tag::Empty);

    cells.set_tag(1, Tag::Full).unwrap();
    assert!(matches!(cells.set_tag(1, Tag::Busy), Err(Error::InvalidArgument(_))));
    assert_eq!(cells.read_ff(1).unwrap(), Value::Undefined);
}

// =============================================================================
// SHARED READERS
// =============================================================================

/// Every rank holds the same cell as a reader at once; an exclusive reader
/// gets it only after the last release.
#[test]
fn test_readers_share_then_release() {
    let mem = open_domain(4);
    mem.run(|ctx| {
        let cells = ctx.create_region(RegionConfig::with_len(1).name("shared").fill(9i64))?;
        assert_eq!(cells.read_rw(0)?, Value::Int(9));
        ctx.barrier()?;
        assert_eq!(cells.tag(0)?, Tag::RwLocked);
        ctx.barrier()?;
        cells.release_rw(0)?;
        ctx.barrier()?;
        ctx.single(|| cells.read_fe(0)).map(|v| {
            if let Some(v) = v {
                assert_eq!(v.unwrap(), Value::Int(9));
            }
        })
    })
    .unwrap();
}

#[test]
fn test_release_without_readers_is_a_protocol_violation() {
    let mem = open_domain(1);
    let ctx = mem.participant(0).unwrap();
    let cells = ctx.create_region(RegionConfig::with_len(1)).unwrap();
    assert!(matches!(cells.release_rw(0), Err(Error::ProtocolViolation(_))));

    cells.read_rw(0).unwrap();
    assert_eq!(cells.release_rw(0).unwrap(), 0);
    assert_eq!(cells.tag(0).unwrap(), Tag::Full);
}

// =============================================================================
// ATOMIC READ-MODIFY-WRITE
// =============================================================================

/// Concurrent fetch-and-add loses no update and hands out each previous
/// value exactly once.
#[test]
fn test_faa_is_linearizable() {
    let mem = open_domain(4);
    let per_rank = 250i64;
    let observed = mem
        .run(|ctx| {
            let counter = ctx.create_region(RegionConfig::with_len(1).name("counter").fill(0i64))?;
            let mut seen = Vec::new();
            for _ in 0..per_rank {
                seen.push(counter.faa(0, 1i64)?.as_int().unwrap());
            }
            ctx.barrier()?;
            assert_eq!(counter.read(0)?, Value::Int(4 * per_rank));
            Ok(seen)
        })
        .unwrap();

    let all: HashSet<i64> = observed.into_iter().flatten().collect();
    assert_eq!(all, (0..4 * per_rank).collect());
}

#[test]
fn test_faa_type_rules() {
    let mem = open_domain(1);
    let ctx = mem.participant(0).unwrap();
    let cells = ctx.create_region(RegionConfig::with_len(3)).unwrap();

    cells.write(0, i64::MAX).unwrap();
    assert_eq!(cells.faa(0, 1i64).unwrap(), Value::Int(i64::MAX));
    assert!(matches!(cells.read(0).unwrap(), Value::Float(_)));

    cells.write(1, 1i64).unwrap();
    cells.faa(1, 0.5).unwrap();
    assert_eq!(cells.read(1).unwrap(), Value::Float(1.5));

    cells.write(2, "text").unwrap();
    assert!(matches!(cells.faa(2, 1i64), Err(Error::TypeMismatch { .. })));
    assert_eq!(cells.read(2).unwrap(), Value::from("text"));
    assert_eq!(cells.tag(2).unwrap(), Tag::Full);
}

/// A compare-and-swap spin lock protects an untagged counter.
#[test]
fn test_cas_spin_lock() {
    let mem = open_domain(4);
    mem.run(|ctx| {
        let cells = ctx.create_region(RegionConfig::with_len(2).name("lock").fill(0i64))?;
        for _ in 0..100 {
            while cells.cas(0, 0i64, ctx.rank() as i64 + 1)? != Value::Int(0) {
                std::thread::yield_now();
            }
            let v = cells.read(1)?.as_int().unwrap();
            cells.write(1, v + 1)?;
            assert_eq!(cells.cas(0, ctx.rank() as i64 + 1, 0i64)?, Value::Int(ctx.rank() as i64 + 1));
        }
        ctx.barrier()?;
        assert_eq!(cells.read(1)?, Value::Int(400));
        Ok(())
    })
    .unwrap();
}

#[test]
fn test_cas_never_coerces() {
    let mem = open_domain(1);
    let ctx = mem.participant(0).unwrap();
    let cells = ctx.create_region(RegionConfig::with_len(1).fill(1i64)).unwrap();
    assert_eq!(cells.cas(0, 1.0, 2i64).unwrap(), Value::Int(1));
    assert_eq!(cells.read(0).unwrap(), Value::Int(1));
    assert_eq!(cells.cas(0, 1i64, 2i64).unwrap(), Value::Int(1));
    assert_eq!(cells.read(0).unwrap(), Value::Int(2));
}

// =============================================================================
// KEY-MAPPED AND MULTI-DIMENSIONAL REGIONS
// =============================================================================

#[test]
fn test_mapped_region_keys() {
    let mem = open_domain(1);
    let ctx = mem.participant(0).unwrap();
    let dict = ctx
        .create_region(RegionConfig::with_len(16).mapped().name("dict"))
        .unwrap();

    assert_eq!(dict.read("missing").unwrap(), Value::Undefined);
    assert_eq!(dict.resolve(&Key::from("missing"), false).unwrap(), None);

    dict.write_xf("alice", 1i64).unwrap();
    dict.write_xf(7i64, "seven").unwrap();
    dict.write_xf(true, 2.5).unwrap();
    assert_eq!(dict.read_ff("alice").unwrap(), Value::Int(1));
    assert_eq!(dict.read(7i64).unwrap(), Value::from("seven"));
    assert_eq!(dict.read(true).unwrap(), Value::Float(2.5));

    let slot = dict.resolve(&Key::from("alice"), false).unwrap().unwrap();
    assert_eq!(dict.index_to_key(slot).unwrap(), Some(Key::from("alice")));
}

#[test]
fn test_full_key_map_is_capacity_exceeded() {
    let mem = open_domain(1);
    let ctx = mem.participant(0).unwrap();
    let dict = ctx.create_region(RegionConfig::with_len(2).mapped()).unwrap();
    dict.write_xf("a", 1i64).unwrap();
    dict.write_xf("b", 2i64).unwrap();
    assert!(matches!(dict.write_xf("c", 3i64), Err(Error::CapacityExceeded(_))));
}

#[test]
fn test_coordinates_address_the_right_cell() {
    let mem = open_domain(1);
    let ctx = mem.participant(0).unwrap();
    let grid = ctx.create_region(RegionConfig::new(&[4, 3])).unwrap();
    grid.write([3i64, 2], "corner").unwrap();
    assert_eq!(grid.read(11).unwrap(), Value::from("corner"));
    assert!(matches!(grid.read([4i64, 0]), Err(Error::IndexOutOfBounds { .. })));
}

// =============================================================================
// STACK AND QUEUE
// =============================================================================

/// Items pushed by every rank are popped exactly once.
#[test]
fn test_shared_stack() {
    let mem = open_domain(3);
    let popped = mem
        .run(|ctx| {
            let stack = ctx.create_region(
                RegionConfig::with_len(64).name("stack").initial_tag(Tag::Empty),
            )?;
            for i in 0..20i64 {
                stack.push(ctx.rank() as i64 * 100 + i)?;
            }
            ctx.barrier()?;
            let mut mine = Vec::new();
            while let Some(v) = stack.pop()? {
                mine.push(v.as_int().unwrap());
            }
            Ok(mine)
        })
        .unwrap();

    let mut all: Vec<i64> = popped.into_iter().flatten().collect();
    all.sort_unstable();
    let mut expected: Vec<i64> = (0..3).flat_map(|r| (0..20).map(move |i| r * 100 + i)).collect();
    expected.sort_unstable();
    assert_eq!(all, expected);
}

#[test]
fn test_queue_preserves_order_per_producer() {
    let mem = open_domain(2);
    let drained = mem
        .run(|ctx| {
            let queue = ctx.create_region(
                RegionConfig::with_len(8).name("queue").initial_tag(Tag::Empty),
            )?;
            let mut got = Vec::new();
            if ctx.rank() == 0 {
                for i in 0..100i64 {
                    while let Err(e) = queue.enqueue(i) {
                        assert!(matches!(e, Error::CapacityExceeded(_)));
                        std::thread::yield_now();
                    }
                }
            } else {
                while got.len() < 100 {
                    match queue.dequeue()? {
                        Some(v) => got.push(v.as_int().unwrap()),
                        None => std::thread::yield_now(),
                    }
                }
            }
            Ok(got)
        })
        .unwrap();
    assert_eq!(drained[1], (0..100).collect::<Vec<_>>());
}
