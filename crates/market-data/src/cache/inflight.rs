//! Per-key single-flight registry.
//!
//! The first caller to miss the cache for a key becomes the leader and runs
//! the producer chain. Callers arriving while the leader is busy subscribe to
//! a watch channel and receive the leader's outcome, success or failure.
//! If the leader is dropped before publishing, the channel closes and
//! waiters start over.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use log::warn;
use tokio::sync::watch;

use crate::errors::FetchError;
use crate::models::CacheKey;

/// Outcome shared by the leader with every waiter.
pub(crate) type Outcome<V> = Arc<Result<V, FetchError>>;

type OutcomeSender<V> = Arc<watch::Sender<Option<Outcome<V>>>>;
type OutcomeReceiver<V> = watch::Receiver<Option<Outcome<V>>>;
type InflightMap<V> = Arc<Mutex<HashMap<CacheKey, OutcomeSender<V>>>>;

fn lock_map<V>(map: &InflightMap<V>) -> MutexGuard<'_, HashMap<CacheKey, OutcomeSender<V>>> {
    map.lock().unwrap_or_else(|poisoned| {
        warn!("In-flight registry mutex was poisoned, recovering");
        poisoned.into_inner()
    })
}

/// Result of registering interest in a key.
pub(crate) enum Joined<V, T> {
    /// The recheck found a value; nothing was registered.
    Ready(T),
    /// This caller owns the fetch and must publish through the guard.
    Leader(LeaderGuard<V>),
    /// Another caller owns the fetch; wait on the receiver.
    Follower(OutcomeReceiver<V>),
}

pub(crate) struct InflightRegistry<V> {
    inflight: InflightMap<V>,
}

impl<V> InflightRegistry<V> {
    pub(crate) fn new() -> Self {
        Self {
            inflight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Join the fetch in flight for `key`, or register as its leader.
    ///
    /// `recheck` runs under the registry lock before a new leader is
    /// registered. A leader stores its value before it unregisters, so a
    /// caller that missed the cache just before the leader finished still
    /// sees the stored value here instead of starting a second fetch.
    pub(crate) fn join_or_lead<T>(
        &self,
        key: &CacheKey,
        recheck: impl FnOnce() -> Option<T>,
    ) -> Joined<V, T> {
        let mut inflight = lock_map(&self.inflight);

        if let Some(sender) = inflight.get(key) {
            return Joined::Follower(sender.subscribe());
        }

        if let Some(ready) = recheck() {
            return Joined::Ready(ready);
        }

        let (tx, _rx) = watch::channel(None);
        let sender = Arc::new(tx);
        inflight.insert(key.clone(), Arc::clone(&sender));

        Joined::Leader(LeaderGuard {
            inflight: Arc::clone(&self.inflight),
            key: key.clone(),
            sender,
            published: false,
        })
    }

    /// Wait for the leader's outcome. `None` means the leader went away
    /// without publishing.
    pub(crate) async fn wait(mut rx: OutcomeReceiver<V>) -> Option<Outcome<V>> {
        match rx.wait_for(|outcome| outcome.is_some()).await {
            Ok(outcome) => (*outcome).clone(),
            Err(_) => None,
        }
    }

    pub(crate) fn len(&self) -> usize {
        lock_map(&self.inflight).len()
    }
}

/// Ownership of one in-flight fetch.
///
/// Dropping the guard without publishing unregisters the key and closes the
/// channel, which wakes every waiter.
pub(crate) struct LeaderGuard<V> {
    inflight: InflightMap<V>,
    key: CacheKey,
    sender: OutcomeSender<V>,
    published: bool,
}

impl<V> LeaderGuard<V> {
    /// Unregister the key and hand `outcome` to every waiter.
    pub(crate) fn publish(mut self, outcome: Outcome<V>) {
        self.published = true;
        {
            let mut inflight = lock_map(&self.inflight);
            self.unregister(&mut inflight);
        }
        // Nobody can subscribe once the key is unregistered.
        self.sender.send_replace(Some(outcome));
    }

    fn unregister(&self, inflight: &mut HashMap<CacheKey, OutcomeSender<V>>) {
        let owned = inflight
            .get(&self.key)
            .is_some_and(|current| Arc::ptr_eq(current, &self.sender));
        if owned {
            inflight.remove(&self.key);
        }
    }
}

impl<V> Drop for LeaderGuard<V> {
    fn drop(&mut self) {
        if !self.published {
            let inflight = Arc::clone(&self.inflight);
            let mut map = lock_map(&inflight);
            self.unregister(&mut map);
            // The sender stays alive in `self` until this drop finishes, so
            // waiters observe the close right after.
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> InflightRegistry<u32> {
        InflightRegistry::new()
    }

    #[test]
    fn test_first_caller_leads() {
        let registry = registry();
        let key = CacheKey::current("AAPL");

        let joined = registry.join_or_lead(&key, || None::<u32>);
        assert!(matches!(joined, Joined::Leader(_)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_second_caller_follows() {
        let registry = registry();
        let key = CacheKey::current("AAPL");

        let _leader = registry.join_or_lead(&key, || None::<u32>);
        let joined = registry.join_or_lead(&key, || None::<u32>);
        assert!(matches!(joined, Joined::Follower(_)));
    }

    #[test]
    fn test_recheck_short_circuits() {
        let registry = registry();
        let key = CacheKey::current("AAPL");

        let joined = registry.join_or_lead(&key, || Some(7u32));
        assert!(matches!(joined, Joined::Ready(7)));
        assert_eq!(registry.len(), 0);
    }

    #[tokio::test]
    async fn test_follower_receives_published_outcome() {
        let registry = registry();
        let key = CacheKey::current("AAPL");

        let Joined::Leader(leader) = registry.join_or_lead(&key, || None::<u32>) else {
            panic!("expected leader");
        };
        let Joined::Follower(rx) = registry.join_or_lead(&key, || None::<u32>) else {
            panic!("expected follower");
        };

        leader.publish(Arc::new(Ok(42)));
        assert_eq!(registry.len(), 0);

        let outcome = InflightRegistry::wait(rx).await.unwrap();
        assert_eq!(*outcome, Ok(42));
    }

    #[tokio::test]
    async fn test_dropped_leader_releases_followers() {
        let registry = registry();
        let key = CacheKey::current("AAPL");

        let leader = registry.join_or_lead(&key, || None::<u32>);
        let Joined::Follower(rx) = registry.join_or_lead(&key, || None::<u32>) else {
            panic!("expected follower");
        };

        drop(leader);
        assert_eq!(registry.len(), 0);
        assert!(InflightRegistry::wait(rx).await.is_none());
    }
}
