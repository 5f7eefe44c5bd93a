//! Region Lifecycle Tests
//!
//! Collective creation, attachment, naming, destruction, and domain
//! configuration.

use crate::common::*;
use std::time::Duration;
use tagmem::prelude::*;

// =============================================================================
// CREATE / ATTACH
// =============================================================================

#[test]
fn test_every_rank_attaches_to_the_same_region() {
    let mem = open_domain(4);
    let ids = mem
        .run(|ctx| {
            let cells = ctx.create_region(RegionConfig::new(&[2, 2]).name("grid").fill(0i64))?;
            cells.faa([ctx.rank() as i64 % 2, ctx.rank() as i64 / 2], 1i64)?;
            ctx.barrier()?;
            for i in 0..4i64 {
                assert_eq!(cells.read(i)?, Value::Int(1));
            }
            Ok(cells.id())
        })
        .unwrap();
    assert!(ids.iter().all(|id| id == &ids[0]));
    assert_eq!(mem.region_names(), vec!["grid".to_string()]);
}

#[test]
fn test_generated_names_match_across_ranks() {
    let mem = open_domain(2);
    let names = mem
        .run(|ctx| {
            let a = ctx.create_region(RegionConfig::with_len(1))?;
            let b = ctx.create_region(RegionConfig::with_len(1))?;
            Ok((a.name().to_string(), b.name().to_string()))
        })
        .unwrap();
    assert_eq!(names[0], names[1]);
    assert_ne!(names[0].0, names[0].1);
}

#[test]
fn test_use_existing_reattaches_to_persisted_data() {
    let mem = open_domain(2);
    mem.run(|ctx| {
        let first = ctx.create_region(RegionConfig::with_len(2).name("persisted"))?;
        ctx.master(|| first.write(0, "from the first attach")).transpose()?;
        assert!(!ctx.destroy_region(&first, false)?);

        let again = ctx.create_region(RegionConfig::with_len(2).name("persisted").use_existing())?;
        assert_eq!(again.read(0)?, Value::from("from the first attach"));
        Ok(())
    })
    .unwrap();
}

#[test]
fn test_use_existing_after_unlink_is_not_found() {
    let mem = open_domain(2);
    let errors = mem
        .run(|ctx| {
            let cells = ctx.create_region(RegionConfig::with_len(2).name("gone"))?;
            assert!(ctx.destroy_region(&cells, true)?);
            Ok(ctx
                .create_region(RegionConfig::with_len(2).name("gone").use_existing())
                .unwrap_err())
        })
        .unwrap();
    assert!(errors.iter().all(Error::is_not_found));
}

#[test]
fn test_non_persistent_regions_are_removed_without_unlink() {
    let mem = open_domain(1);
    let ctx = mem.participant(0).unwrap();
    let scratch = ctx
        .create_region(RegionConfig::with_len(1).name("scratch").persist(false))
        .unwrap();
    assert!(ctx.destroy_region(&scratch, false).unwrap());
    assert!(mem.region_names().is_empty());

    // Handles outlive the registry entry
    scratch.write(0, 1i64).unwrap();
    assert_eq!(scratch.read(0).unwrap(), Value::Int(1));
}

#[test]
fn test_invalid_region_configs() {
    let mem = open_domain(1);
    let ctx = mem.participant(0).unwrap();
    let bad = [
        RegionConfig::new(&[]),
        RegionConfig::new(&[3, 0]),
        RegionConfig::with_len(1).initial_tag(Tag::Busy),
        RegionConfig::with_len(1).use_existing(),
    ];
    for config in bad {
        assert!(matches!(ctx.create_region(config), Err(Error::InvalidArgument(_))));
    }
}

// =============================================================================
// DOMAIN CONFIGURATION
// =============================================================================

#[test]
fn test_domain_from_toml() {
    let config = DomainConfig::from_toml_str(
        r#"
        participants = 3
        default_timeout_ms = 2500
        "#,
    )
    .unwrap();
    let mem = TagMem::builder().config(config).open().unwrap();
    assert_eq!(mem.participant_count(), 3);
    assert_eq!(mem.config().default_timeout(), Duration::from_millis(2500));
    assert_eq!(mem.participants().len(), 3);
}

#[test]
fn test_open_from_config_file() {
    let path = std::env::temp_dir().join(format!("tagmem-suite-{}.toml", std::process::id()));
    std::fs::write(&path, "participants = 2\n").unwrap();
    let mem = TagMem::open(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(mem.participant_count(), 2);
}

#[test]
fn test_participant_out_of_range() {
    let mem = open_domain(2);
    assert!(matches!(mem.participant(2), Err(Error::InvalidArgument(_))));
}
