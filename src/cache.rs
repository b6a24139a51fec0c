//! Observable result store.
//!
//! [`ResultCache`] is the channel between the component that triggers an
//! upload and the component that renders its outcome. Writers store an
//! [`Outcome`] under an operation tag; every live subscriber is called after
//! the write lands.
//!
//! Writes can be sequenced: [`ResultCache::begin`] hands out a monotonic
//! number per tag and [`ResultCache::write_sequenced`] only accepts the most
//! recently issued one, so a slow, superseded request cannot overwrite a
//! newer result.
//!
//! The cache is single-threaded (`Rc`/`RefCell`). Cloning it yields another
//! handle to the same store.
//!
//! A listener may write while being notified. That write lands in the store
//! at once, but its notification is queued until the current round has
//! reached every listener, so each listener sees writes in the order they
//! were made and its last-seen entry is the stored one.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::debug;

/// Settled result of an operation.
#[derive(Debug)]
pub enum Outcome<T> {
    Success(Rc<T>),
    Failure(String),
}

impl<T> Clone for Outcome<T> {
    fn clone(&self) -> Self {
        match self {
            Outcome::Success(value) => Outcome::Success(Rc::clone(value)),
            Outcome::Failure(message) => Outcome::Failure(message.clone()),
        }
    }
}

/// Status part of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Success,
    Failure,
}

/// Latest entry stored under a tag.
#[derive(Debug)]
pub struct CacheEntry<T> {
    pub sequence: u64,
    pub outcome: Outcome<T>,
}

impl<T> Clone for CacheEntry<T> {
    fn clone(&self) -> Self {
        Self {
            sequence: self.sequence,
            outcome: self.outcome.clone(),
        }
    }
}

impl<T> CacheEntry<T> {
    pub fn status(&self) -> CacheStatus {
        match self.outcome {
            Outcome::Success(_) => CacheStatus::Success,
            Outcome::Failure(_) => CacheStatus::Failure,
        }
    }

    /// The stored value, present only for successful outcomes.
    pub fn value(&self) -> Option<&Rc<T>> {
        match &self.outcome {
            Outcome::Success(value) => Some(value),
            Outcome::Failure(_) => None,
        }
    }

    /// The failure message, present only for failed outcomes.
    pub fn failure(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Success(_) => None,
            Outcome::Failure(message) => Some(message),
        }
    }
}

type Listener<T> = Rc<dyn Fn(&str, &CacheEntry<T>)>;

struct Inner<T> {
    entries: HashMap<String, CacheEntry<T>>,
    issued: HashMap<String, u64>,
    listeners: Vec<(u64, Listener<T>)>,
    next_listener: u64,
    pending: VecDeque<(String, CacheEntry<T>)>,
    notifying: bool,
}

impl<T> Inner<T> {
    fn issue(&mut self, tag: &str) -> u64 {
        let next = self.issued.get(tag).copied().unwrap_or(0) + 1;
        self.issued.insert(tag.to_string(), next);
        next
    }
}

/// Observable key → (status, value) store.
pub struct ResultCache<T> {
    inner: Rc<RefCell<Inner<T>>>,
}

impl<T> Clone for ResultCache<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> Default for ResultCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for ResultCache<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("ResultCache")
            .field("tags", &inner.entries.keys().collect::<Vec<_>>())
            .field("listeners", &inner.listeners.len())
            .finish()
    }
}

impl<T> ResultCache<T> {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                entries: HashMap::new(),
                issued: HashMap::new(),
                listeners: Vec::new(),
                next_listener: 0,
                pending: VecDeque::new(),
                notifying: false,
            })),
        }
    }

    /// Register a listener called after every accepted write.
    ///
    /// Past writes are not replayed. The listener stays registered until the
    /// returned [`Subscription`] is unsubscribed or dropped.
    #[must_use = "dropping the subscription unsubscribes the listener"]
    pub fn subscribe(&self, listener: impl Fn(&str, &CacheEntry<T>) + 'static) -> Subscription
    where
        T: 'static,
    {
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_listener;
        inner.next_listener += 1;
        let listener: Listener<T> = Rc::new(listener);
        inner.listeners.push((id, listener));
        let weak: Weak<RefCell<Inner<T>>> = Rc::downgrade(&self.inner);
        Subscription {
            detach: Some(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.borrow_mut().listeners.retain(|(lid, _)| *lid != id);
                }
            })),
        }
    }

    /// Issue a new sequence number for `tag`, superseding earlier ones.
    pub fn begin(&self, tag: &str) -> u64 {
        self.inner.borrow_mut().issue(tag)
    }

    /// Store an outcome unconditionally and notify subscribers.
    pub fn write(&self, tag: &str, outcome: Outcome<T>) {
        let sequence = self.begin(tag);
        self.store(tag, sequence, outcome);
    }

    /// Store an outcome only if `sequence` is the latest issued for `tag`.
    ///
    /// Returns `false` when the write was discarded as stale.
    pub fn write_sequenced(&self, tag: &str, sequence: u64, outcome: Outcome<T>) -> bool {
        let latest = self.inner.borrow().issued.get(tag).copied().unwrap_or(0);
        if sequence != latest {
            debug!(tag, sequence, latest, "discarding stale cache write");
            return false;
        }
        self.store(tag, sequence, outcome);
        true
    }

    /// Current entry for `tag`, if any.
    pub fn read(&self, tag: &str) -> Option<CacheEntry<T>> {
        self.inner.borrow().entries.get(tag).cloned()
    }

    /// Latest successful value stored under `tag`.
    pub fn value(&self, tag: &str) -> Option<Rc<T>> {
        self.read(tag).and_then(|entry| entry.value().cloned())
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }

    fn store(&self, tag: &str, sequence: u64, outcome: Outcome<T>) {
        let entry = CacheEntry { sequence, outcome };
        {
            let mut inner = self.inner.borrow_mut();
            inner.entries.insert(tag.to_string(), entry.clone());
            inner.pending.push_back((tag.to_string(), entry));
            if inner.notifying {
                debug!(tag, sequence, "cache write during notification, queued");
                return;
            }
            inner.notifying = true;
        }
        let _round = NotifyRound(&*self.inner);
        // Release the borrow before calling out so listeners may read and write.
        loop {
            let next = {
                let mut inner = self.inner.borrow_mut();
                inner.pending.pop_front().map(|(tag, entry)| {
                    let listeners: Vec<Listener<T>> =
                        inner.listeners.iter().map(|(_, l)| Rc::clone(l)).collect();
                    (tag, entry, listeners)
                })
            };
            let Some((tag, entry, listeners)) = next else {
                break;
            };
            debug!(tag = %tag, sequence = entry.sequence, listeners = listeners.len(), "cache write");
            for listener in listeners {
                listener(&tag, &entry);
            }
        }
    }
}

/// Clears the notifying flag when a round ends, even if a listener panics.
struct NotifyRound<'a, T>(&'a RefCell<Inner<T>>);

impl<T> Drop for NotifyRound<'_, T> {
    fn drop(&mut self) {
        if let Ok(mut inner) = self.0.try_borrow_mut() {
            inner.notifying = false;
            inner.pending.clear();
        }
    }
}

/// Handle for a registered cache listener.
///
/// Dropping the handle unsubscribes.
#[must_use = "dropping the subscription unsubscribes the listener"]
pub struct Subscription {
    detach: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    /// Remove the listener now.
    pub fn unsubscribe(mut self) {
        self.detach_now();
    }

    fn detach_now(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.detach_now();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.detach.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn counter(cache: &ResultCache<u32>) -> (Rc<Cell<u32>>, Subscription) {
        let calls = Rc::new(Cell::new(0));
        let seen = Rc::clone(&calls);
        let sub = cache.subscribe(move |_, _| seen.set(seen.get() + 1));
        (calls, sub)
    }

    #[test]
    fn read_absent_tag() {
        let cache: ResultCache<u32> = ResultCache::new();
        assert!(cache.read("schema_cache").is_none());
        assert!(cache.value("schema_cache").is_none());
    }

    #[test]
    fn write_overwrites_entry() {
        let cache = ResultCache::new();
        cache.write("t", Outcome::Success(Rc::new(1)));
        cache.write("t", Outcome::Success(Rc::new(2)));
        assert_eq!(*cache.value("t").unwrap(), 2);

        cache.write("t", Outcome::Failure("boom".into()));
        let entry = cache.read("t").unwrap();
        assert_eq!(entry.status(), CacheStatus::Failure);
        assert_eq!(entry.failure(), Some("boom"));
        assert!(cache.value("t").is_none());
    }

    #[test]
    fn subscribe_write_unsubscribe_write_fires_once() {
        let cache = ResultCache::new();
        let (calls, sub) = counter(&cache);

        cache.write("t", Outcome::Success(Rc::new(1)));
        sub.unsubscribe();
        cache.write("t", Outcome::Success(Rc::new(2)));

        assert_eq!(calls.get(), 1);
        assert_eq!(cache.subscriber_count(), 0);
    }

    #[test]
    fn dropping_subscription_unsubscribes() {
        let cache = ResultCache::new();
        let (calls, sub) = counter(&cache);
        drop(sub);
        cache.write("t", Outcome::Success(Rc::new(1)));
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn late_subscriber_does_not_see_past_writes() {
        let cache = ResultCache::new();
        cache.write("t", Outcome::Success(Rc::new(1)));
        let (calls, _sub) = counter(&cache);
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn multiple_subscribers_all_notified() {
        let cache = ResultCache::new();
        let (a, _sa) = counter(&cache);
        let (b, _sb) = counter(&cache);
        cache.write("t", Outcome::Success(Rc::new(1)));
        assert_eq!((a.get(), b.get()), (1, 1));
    }

    #[test]
    fn listener_sees_stored_entry_and_can_read_cache() {
        let cache: ResultCache<u32> = ResultCache::new();
        let reader = cache.clone();
        let observed = Rc::new(Cell::new(0));
        let seen = Rc::clone(&observed);
        let _sub = cache.subscribe(move |tag, entry| {
            let stored = reader.value(tag).map(|v| *v).unwrap_or(0);
            assert_eq!(entry.value().map(|v| **v), Some(stored));
            seen.set(stored);
        });
        cache.write("t", Outcome::Success(Rc::new(7)));
        assert_eq!(observed.get(), 7);
    }

    #[test]
    fn stale_sequenced_write_discarded() {
        let cache = ResultCache::new();
        let (calls, _sub) = counter(&cache);

        let first = cache.begin("t");
        let second = cache.begin("t");
        assert!(second > first);

        assert!(cache.write_sequenced("t", second, Outcome::Success(Rc::new(2))));
        assert!(!cache.write_sequenced("t", first, Outcome::Success(Rc::new(1))));

        assert_eq!(*cache.value("t").unwrap(), 2);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn sequences_are_per_tag() {
        let cache: ResultCache<u32> = ResultCache::new();
        let a = cache.begin("a");
        let _ = cache.begin("b");
        assert!(cache.write_sequenced("a", a, Outcome::Success(Rc::new(1))));
    }

    #[test]
    fn write_from_listener_is_delivered_after_current_round() {
        let cache: ResultCache<u32> = ResultCache::new();
        let writer = cache.clone();
        let _rewrite = cache.subscribe(move |tag, entry| {
            if entry.value().map(|v| **v) == Some(1) {
                writer.write(tag, Outcome::Success(Rc::new(2)));
            }
        });
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&seen);
        let _observer = cache.subscribe(move |_, entry| {
            log.borrow_mut().push(entry.value().map(|v| **v));
        });

        cache.write("t", Outcome::Success(Rc::new(1)));

        assert_eq!(*seen.borrow(), [Some(1), Some(2)]);
        assert_eq!(seen.borrow().last().copied().flatten(), cache.value("t").map(|v| *v));
    }

    #[test]
    fn stale_queued_notification_still_in_order() {
        let cache: ResultCache<u32> = ResultCache::new();
        let writer = cache.clone();
        let _rewrite = cache.subscribe(move |tag, entry| {
            if entry.value().map(|v| **v) == Some(1) {
                writer.write(tag, Outcome::Failure("replaced".into()));
            }
        });
        let sequences = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&sequences);
        let _observer = cache.subscribe(move |_, entry| log.borrow_mut().push(entry.sequence));

        cache.write("t", Outcome::Success(Rc::new(1)));

        assert_eq!(*sequences.borrow(), [1, 2]);
        assert_eq!(cache.read("t").unwrap().status(), CacheStatus::Failure);
    }

    #[test]
    fn plain_write_supersedes_pending_sequence() {
        let cache = ResultCache::new();
        let pending = cache.begin("t");
        cache.write("t", Outcome::Success(Rc::new(5)));
        assert!(!cache.write_sequenced("t", pending, Outcome::Success(Rc::new(1))));
        assert_eq!(*cache.value("t").unwrap(), 5);
    }
}
