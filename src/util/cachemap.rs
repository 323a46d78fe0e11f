use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

/// A `HashMap` where every entry carries the `Instant` it was inserted at.
/// With a timeout configured, entries older than the timeout are treated as
/// absent; expiry is evaluated lazily on access against the monotonic clock.
pub struct CacheMap<K, V> {
    map: HashMap<K, (Instant, V)>,
    timeout: Option<Duration>,
}

impl<K, V> CacheMap<K, V>
    where K: Hash + Eq
{
    /// Creates a `CacheMap` whose entries never expire.
    pub fn new() -> CacheMap<K, V> {
        CacheMap {
            map: HashMap::new(),
            timeout: None,
        }
    }

    pub fn with_timeout(timeout: Duration) -> CacheMap<K, V> {
        CacheMap {
            map: HashMap::new(),
            timeout: Some(timeout),
        }
    }

    pub fn get<Q: ?Sized>(&mut self, k: &Q) -> Option<&V>
        where K: Borrow<Q>,
              Q: Hash + Eq
    {
        let timeout = self.timeout;
        match self.map.get(k) {
            Some(&(ref i, ref v)) if live(timeout, i) => Some(v),
            _ => None,
        }
    }

    pub fn get_mut<Q: ?Sized>(&mut self, k: &Q) -> Option<&mut V>
        where K: Borrow<Q>,
              Q: Hash + Eq
    {
        let timeout = self.timeout;
        match self.map.get_mut(k) {
            Some(&mut (ref i, ref mut v)) if live(timeout, i) => Some(v),
            _ => None,
        }
    }

    /// Inserts or overwrites, refreshing the entry timestamp.
    pub fn insert(&mut self, k: K, v: V) {
        self.map.insert(k, (Instant::now(), v));
    }

    /// Removes the entry for `k`, returning the value only if it was still
    /// live. An expired entry is dropped and reported as absent.
    pub fn remove<Q: ?Sized>(&mut self, k: &Q) -> Option<V>
        where K: Borrow<Q>,
              Q: Hash + Eq
    {
        let timeout = self.timeout;
        match self.map.remove(k) {
            Some((ref i, v)) if live(timeout, i) => Some(v),
            _ => None,
        }
    }

    /// Visits every live entry in unspecified order.
    pub fn iter<'a>(&'a self) -> Box<dyn Iterator<Item = (&'a K, &'a V)> + 'a> {
        let timeout = self.timeout;
        Box::new(self.map
            .iter()
            .filter(move |&(_, &(ref i, _))| live(timeout, i))
            .map(|(k, &(_, ref v))| (k, v)))
    }
}

fn live(timeout: Option<Duration>, inserted: &Instant) -> bool {
    match timeout {
        Some(timeout) => inserted.elapsed() < timeout,
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use std::thread::sleep;
    use std::time::Duration;

    use super::*;

    #[test]
    fn shortlived() {
        let mut testee = CacheMap::with_timeout(Duration::new(0, 0));
        testee.insert(0, 15);
        assert!(testee.get(&0).is_none());
        assert!(testee.get(&15).is_none());
        assert!(testee.remove(&0).is_none());
    }

    #[test]
    fn without_timeout() {
        let mut testee = CacheMap::new();
        testee.insert(0, 15);
        sleep(Duration::new(0, 10_000_000));
        assert_eq!(testee.get(&0), Some(&15));
        assert_eq!(testee.remove(&0), Some(15));
        assert!(testee.get(&0).is_none());
    }

    #[test]
    fn normal() {
        let mut testee = CacheMap::with_timeout(Duration::new(0, 100_000_000));
        testee.insert(0, 15);
        assert_eq!(testee.get(&0), Some(&15));
        assert!(testee.get(&1).is_none());

        sleep(Duration::new(0, 50_000_000));
        assert_eq!(testee.get(&0), Some(&15));
        assert!(testee.get(&1).is_none());

        testee.insert(1, 99);
        assert_eq!(testee.get(&0), Some(&15));
        assert_eq!(testee.get(&1), Some(&99));

        sleep(Duration::new(0, 60_000_000));
        assert!(testee.get(&0).is_none());
        assert_eq!(testee.get(&1), Some(&99));

        sleep(Duration::new(0, 50_000_000));
        assert!(testee.get(&0).is_none());
        assert!(testee.get(&1).is_none());
    }

    #[test]
    fn insert_refreshes_timestamp() {
        let mut testee = CacheMap::with_timeout(Duration::new(0, 100_000_000));
        testee.insert(0, 1);
        sleep(Duration::new(0, 60_000_000));
        testee.insert(0, 2);
        sleep(Duration::new(0, 60_000_000));
        assert_eq!(testee.get(&0), Some(&2));
    }

    #[test]
    fn iter_skips_expired() {
        let mut testee = CacheMap::with_timeout(Duration::new(0, 50_000_000));
        testee.insert(0, 10);
        sleep(Duration::new(0, 60_000_000));
        testee.insert(1, 11);
        let live: Vec<(&i32, &i32)> = testee.iter().collect();
        assert_eq!(live, vec![(&1, &11)]);
    }
}
