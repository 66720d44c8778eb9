//! Tests for the indexable skip list
//!
//! Structural width checks live next to the implementation; these tests
//! exercise the public surface: ordering, positional lookup and removal
//! under a deterministic coin so failures reproduce.

use coffer::keystore::IndexableSkipList;
use rand::rngs::SmallRng;
use rand::SeedableRng;

fn seeded(seed: u64) -> IndexableSkipList<String, u64> {
    IndexableSkipList::with_rng(SmallRng::seed_from_u64(seed), true)
}

#[test]
fn test_iteration_is_sorted() {
    let mut list = seeded(5);
    for word in ["pear", "apple", "fig", "date", "cherry", "banana"] {
        list.insert(word.to_string(), word.len() as u64);
    }

    let keys: Vec<&String> = list.iter().map(|(key, _)| key).collect();
    assert_eq!(keys, ["apple", "banana", "cherry", "date", "fig", "pear"]);
}

#[test]
fn test_positional_lookup_across_sizes() {
    for seed in [1u64, 99, 7777] {
        let mut list = seeded(seed);
        let mut keys: Vec<String> = (0..500u32).map(|i| format!("k{:05}", (i * 211) % 500)).collect();
        for key in &keys {
            list.insert(key.clone(), 1);
        }
        keys.sort();
        keys.dedup();

        assert_eq!(list.len(), keys.len());
        for (index, key) in keys.iter().enumerate() {
            let (found, _) = list.get_by_index(index).unwrap();
            assert_eq!(found, key, "seed {} index {}", seed, index);
        }
        assert!(list.get_by_index(keys.len()).is_none());
    }
}

#[test]
fn test_get_and_contains() {
    let mut list = seeded(2);
    list.insert("a".to_string(), 1);
    list.insert("b".to_string(), 2);

    assert_eq!(list.get(&"a".to_string()), Some(&1));
    assert_eq!(list.get(&"missing".to_string()), None);
    assert!(list.contains(&"b".to_string()));
    assert!(!list.contains(&"c".to_string()));
}

#[test]
fn test_remove_keeps_order_and_index() {
    let mut list = seeded(13);
    for i in 0..100u64 {
        list.insert(format!("k{:03}", i), i);
    }

    for i in (0..100u64).step_by(2) {
        assert_eq!(list.remove(&format!("k{:03}", i)), Some(i));
    }
    assert_eq!(list.len(), 50);

    // Survivors are the odd keys, still addressable by position
    for (index, expected) in (1..100u64).step_by(2).enumerate() {
        let (key, value) = list.get_by_index(index).unwrap();
        assert_eq!(key, &format!("k{:03}", expected));
        assert_eq!(value, &expected);
    }
}

#[test]
fn test_remove_missing_returns_none() {
    let mut list = seeded(3);
    list.insert("a".to_string(), 1);
    assert_eq!(list.remove(&"b".to_string()), None);
    assert_eq!(list.len(), 1);
}

#[test]
fn test_clear_resets() {
    let mut list = seeded(8);
    for i in 0..32u64 {
        list.insert(i.to_string(), i);
    }
    list.clear();
    assert!(list.is_empty());
    assert!(list.get_by_index(0).is_none());

    list.insert("again".to_string(), 1);
    assert_eq!(list.len(), 1);
    assert_eq!(list.get_by_index(0).unwrap().0, "again");
}
