//! Registry reconciliation properties
//!
//! Drives a multi-body registry through sequences of live-id updates and
//! checks that it always converges to the last update, never builds a second
//! detector for a tracked body and releases every detector exactly once.

mod common;

use bodytrack::core::detector::DetectorSpec;
use bodytrack::core::registry::HandleRegistry;
use bodytrack::error::TrackerError;
use common::MockFactory;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

const POOL: [&str; 8] = ["a", "b", "c", "d", "e", "f", "g", "h"];

fn multi_registry(factory: &MockFactory) -> HandleRegistry {
    HandleRegistry::new_multi(Arc::new(factory.clone()), DetectorSpec::new(""))
}

fn key_set(registry: &HandleRegistry) -> BTreeSet<String> {
    registry.ids().map(str::to_string).collect()
}

#[test]
fn test_converges_to_every_update() {
    let factory = MockFactory::new();
    let mut registry = multi_registry(&factory);
    let mut rng = StdRng::seed_from_u64(0xB0D1);

    for _ in 0..200 {
        // Random update with duplicates and arbitrary order
        let len = rng.random_range(0..=10);
        let update: Vec<&str> = (0..len)
            .map(|_| *POOL.choose(&mut rng).unwrap())
            .collect();

        registry.reconcile(&update).unwrap();

        let expected: BTreeSet<String> = update.iter().map(|s| s.to_string()).collect();
        assert_eq!(key_set(&registry), expected);

        // One live detector per tracked body
        let created = factory.created().len();
        let released = factory.released().len();
        assert_eq!(created - released, registry.len());
    }

    // No body was released more often than it was created
    let mut balance: HashMap<String, i64> = HashMap::new();
    for id in factory.created() {
        *balance.entry(id).or_default() += 1;
    }
    for id in factory.released() {
        *balance.entry(id).or_default() -= 1;
    }
    assert!(balance.values().all(|b| *b == 0 || *b == 1));
}

#[test]
fn test_same_update_twice_constructs_nothing() {
    let factory = MockFactory::new();
    let mut registry = multi_registry(&factory);

    registry.reconcile(["a", "b", "c"]).unwrap();
    let before = registry.snapshot();

    let report = registry.reconcile(["c", "b", "a", "a"]).unwrap();

    assert!(report.is_unchanged());
    assert_eq!(factory.created(), vec!["a", "b", "c"]);
    assert_eq!(registry.snapshot(), before);
}

#[test]
fn test_removal_releases_exactly_once() {
    let factory = MockFactory::new();
    let mut registry = multi_registry(&factory);

    registry.reconcile(["a", "b"]).unwrap();
    registry.reconcile(["b"]).unwrap();
    registry.reconcile(["b"]).unwrap();
    registry.reconcile(["b"]).unwrap();

    assert_eq!(factory.release_count("a"), 1);
    assert_eq!(factory.release_count("b"), 0);
}

#[test]
fn test_returning_body_gets_fresh_detector() {
    let factory = MockFactory::new();
    let mut registry = multi_registry(&factory);

    registry.reconcile(["a"]).unwrap();
    registry.reconcile(Vec::<String>::new()).unwrap();
    registry.reconcile(["a"]).unwrap();

    assert_eq!(factory.created(), vec!["a", "a"]);
    assert_eq!(factory.release_count("a"), 1);
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_last_inserted_follows_new_additions() {
    let factory = MockFactory::new();
    let mut registry = multi_registry(&factory);

    registry.reconcile(["a", "b", "c"]).unwrap();
    assert_eq!(registry.last_inserted(), Some("c"));

    registry.reconcile(["a", "c", "d"]).unwrap();
    assert_eq!(registry.last_inserted(), Some("d"));

    // Reordering alone changes nothing
    registry.reconcile(["d", "c", "a"]).unwrap();
    assert_eq!(registry.last_inserted(), Some("d"));
}

#[test]
fn test_empty_update_empties_registry() {
    let factory = MockFactory::new();
    let mut registry = multi_registry(&factory);

    registry.reconcile(["a", "b"]).unwrap();
    let report = registry.reconcile(Vec::<String>::new()).unwrap();

    assert_eq!(report.removed, vec!["a", "b"]);
    assert!(registry.is_empty());
    assert!(registry.snapshot().is_empty());
    assert_eq!(registry.last_inserted(), None);
}

#[test]
fn test_failed_body_retried_on_next_update() {
    let factory = MockFactory::new();
    let mut registry = multi_registry(&factory);
    factory.fail_for("b");

    let err = registry.reconcile(["a", "b"]).unwrap_err();
    assert!(matches!(err, TrackerError::Reconcile { ref failed, .. } if failed == &["b".to_string()]));
    assert!(!err.is_fatal());
    assert_eq!(key_set(&registry), BTreeSet::from(["a".to_string()]));

    // Still failing: still reported, nothing else disturbed
    assert!(registry.reconcile(["a", "b"]).is_err());
    assert_eq!(factory.created(), vec!["a"]);

    factory.recover("b");
    registry.reconcile(["a", "b"]).unwrap();
    assert_eq!(factory.created(), vec!["a", "b"]);
    assert_eq!(registry.last_inserted(), Some("b"));
}

#[test]
fn test_single_body_registry_is_fixed() {
    let factory = MockFactory::new();
    let mut registry =
        HandleRegistry::new_single(Arc::new(factory.clone()), DetectorSpec::new(""), "vwxyz")
            .unwrap();

    for update in [vec!["a", "b"], vec![], vec!["vwxyz"], vec!["c"]] {
        registry.reconcile(&update).unwrap();
        assert_eq!(registry.len(), 1);
        assert!(registry.contains("vwxyz"));
    }

    assert_eq!(factory.created(), vec!["vwxyz"]);
    assert!(factory.created_specs()[0].single_body);
    assert!(factory.released().is_empty());
}
