use super::*;

#[test]
fn capacity_plus_one_evicts_least_recently_used() {
    let c = BoundedCache::new(3);
    c.insert("a", 1);
    c.insert("b", 2);
    c.insert("c", 3);
    c.insert("d", 4);
    assert!(!c.contains(&"a"));
    assert_eq!(c.len(), 3);
    assert_eq!(c.get(&"d"), Some(4));
}

#[test]
fn get_refreshes_recency() {
    let c = BoundedCache::new(3);
    c.insert("a", 1);
    c.insert("b", 2);
    c.insert("c", 3);
    assert_eq!(c.get(&"a"), Some(1));
    c.insert("d", 4);
    assert!(c.contains(&"a"));
    assert!(!c.contains(&"b"));
}

#[test]
fn contains_does_not_refresh() {
    let c = BoundedCache::new(2);
    c.insert("a", 1);
    c.insert("b", 2);
    assert!(c.contains(&"a"));
    c.insert("c", 3);
    assert!(!c.contains(&"a"));
}

#[test]
fn zero_capacity_disables_caching() {
    let c = BoundedCache::new(0);
    c.insert("a", 1);
    assert_eq!(c.get(&"a"), None);
    assert!(c.is_empty());
    assert_eq!(c.stats().capacity, 0);
}

#[test]
fn stats_count_hits_and_misses() {
    let c = BoundedCache::new(4);
    c.insert(1u64, "x");
    c.get(&1);
    c.get(&2);
    c.get(&1);
    let s = c.stats();
    assert_eq!((s.hits, s.misses, s.len, s.capacity), (2, 1, 1, 4));
    c.clear();
    assert!(c.is_empty());
}
