use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use futures::FutureExt;
use futures::future::{Shared, ready};
use lru::LruCache;

use crate::{LookupKey, TileUrlCache, UrlFuture, url_future};

/// Controls what [`MemoizedUrlCache`] remembers.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MemoOptions {
    /// Number of keys to remember.
    pub capacity: NonZeroUsize,

    /// Remember keys which resolved to no URL too. If disabled, such keys are looked up again
    /// every time they are requested.
    pub remember_misses: bool,
}

/// Four times the default tile cache, so panning back and forth stays local.
const DEFAULT_CAPACITY: NonZeroUsize = match NonZeroUsize::new(1024) {
    Some(capacity) => capacity,
    None => unreachable!(),
};

impl Default for MemoOptions {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            remember_misses: false,
        }
    }
}

struct State {
    resolved: LruCache<LookupKey, Option<String>>,
    in_flight: HashMap<LookupKey, Shared<UrlFuture>>,
}

/// Puts a memory in front of another [`TileUrlCache`]. Answers are remembered, and concurrent
/// lookups of the same key share a single request to the inner cache.
pub struct MemoizedUrlCache<C> {
    inner: C,
    remember_misses: bool,
    state: Arc<Mutex<State>>,
}

impl<C: TileUrlCache> MemoizedUrlCache<C> {
    pub fn new(inner: C) -> Self {
        Self::with_options(inner, MemoOptions::default())
    }

    pub fn with_options(inner: C, options: MemoOptions) -> Self {
        Self {
            inner,
            remember_misses: options.remember_misses,
            state: Arc::new(Mutex::new(State {
                resolved: LruCache::new(options.capacity),
                in_flight: HashMap::new(),
            })),
        }
    }

    /// Forget everything remembered so far. Lookups in flight are not affected.
    pub fn clear(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.resolved.clear();
        }
    }

    /// Number of remembered keys.
    pub fn len(&self) -> usize {
        self.state
            .lock()
            .map(|state| state.resolved.len())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<C: TileUrlCache> TileUrlCache for MemoizedUrlCache<C> {
    fn url_for_key(&self, key: &LookupKey) -> UrlFuture {
        let Ok(mut state) = self.state.lock() else {
            log::warn!("URL memory is poisoned, looking up {key} directly.");
            return self.inner.url_for_key(key);
        };

        if let Some(url) = state.resolved.get(key) {
            log::trace!("{key} is remembered.");
            return url_future(ready(url.clone()));
        }

        let shared = match state.in_flight.get(key) {
            Some(shared) => {
                log::trace!("{key} is already being looked up.");
                shared.clone()
            }
            None => {
                let shared = self.inner.url_for_key(key).shared();
                state.in_flight.insert(key.clone(), shared.clone());
                shared
            }
        };

        let memory = Arc::clone(&self.state);
        let remember_misses = self.remember_misses;
        let key = key.clone();
        let lookup = shared.clone();

        url_future(async move {
            let url = shared.await;
            if let Ok(mut state) = memory.lock() {
                // A newer lookup of the same key might have started after this one finished.
                if state
                    .in_flight
                    .get(&key)
                    .is_some_and(|in_flight| in_flight.ptr_eq(&lookup))
                {
                    state.in_flight.remove(&key);
                }
                if url.is_some() || remember_misses {
                    state.resolved.put(key, url.clone());
                }
            }
            url
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CallbackUrlCache, Responder, TileCoord, derive_key};
    use futures::executor::block_on;
    use futures::future::join;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Inner cache counting its lookups. Resolves keys of zoom 1 only.
    fn counting(lookups: &Arc<AtomicUsize>) -> impl TileUrlCache + use<> {
        let lookups = Arc::clone(lookups);
        CallbackUrlCache::new(move |key: &LookupKey, responder: Responder| {
            lookups.fetch_add(1, Ordering::SeqCst);
            let url = key.as_str().starts_with("/1/").then(|| format!("http://x{key}"));
            responder.respond(url);
        })
    }

    #[test]
    fn resolved_urls_are_remembered() {
        let lookups = Arc::new(AtomicUsize::new(0));
        let cache = MemoizedUrlCache::new(counting(&lookups));
        let key = derive_key(TileCoord::new(1, 0, -1));

        assert_eq!(Some("http://x/1/x0/y0".to_owned()), block_on(cache.url_for_key(&key)));
        assert_eq!(Some("http://x/1/x0/y0".to_owned()), block_on(cache.url_for_key(&key)));
        assert_eq!(1, lookups.load(Ordering::SeqCst));
        assert_eq!(1, cache.len());

        cache.clear();
        assert!(cache.is_empty());
        block_on(cache.url_for_key(&key));
        assert_eq!(2, lookups.load(Ordering::SeqCst));
    }

    #[test]
    fn misses_are_looked_up_again_by_default() {
        let lookups = Arc::new(AtomicUsize::new(0));
        let cache = MemoizedUrlCache::new(counting(&lookups));
        let key = derive_key(TileCoord::new(2, 0, -1));

        assert_eq!(None, block_on(cache.url_for_key(&key)));
        assert_eq!(None, block_on(cache.url_for_key(&key)));
        assert_eq!(2, lookups.load(Ordering::SeqCst));
    }

    #[test]
    fn misses_can_be_remembered() {
        let lookups = Arc::new(AtomicUsize::new(0));
        let cache = MemoizedUrlCache::with_options(
            counting(&lookups),
            MemoOptions {
                remember_misses: true,
                ..Default::default()
            },
        );
        let key = derive_key(TileCoord::new(2, 0, -1));

        assert_eq!(None, block_on(cache.url_for_key(&key)));
        assert_eq!(None, block_on(cache.url_for_key(&key)));
        assert_eq!(1, lookups.load(Ordering::SeqCst));
    }

    #[test]
    fn concurrent_lookups_share_one_request() {
        let parked = Arc::new(Mutex::new(Vec::new()));
        let inner = {
            let parked = Arc::clone(&parked);
            CallbackUrlCache::new(move |_: &LookupKey, responder: Responder| {
                parked.lock().unwrap().push(responder);
            })
        };
        let cache = MemoizedUrlCache::new(inner);
        let key = derive_key(TileCoord::new(3, 1, -1));

        let first = cache.url_for_key(&key);
        let second = cache.url_for_key(&key);
        assert_eq!(1, parked.lock().unwrap().len());

        let responder = parked.lock().unwrap().pop().unwrap();
        responder.respond(Some("http://x/y.png".to_owned()));

        let (first, second) = block_on(join(first, second));
        assert_eq!(Some("http://x/y.png".to_owned()), first);
        assert_eq!(first, second);
        assert_eq!(1, cache.len());
    }

    #[test]
    fn late_waiter_does_not_forget_newer_lookup() {
        let parked = Arc::new(Mutex::new(Vec::<Responder>::new()));
        let inner = {
            let parked = Arc::clone(&parked);
            CallbackUrlCache::new(move |_: &LookupKey, responder: Responder| {
                parked.lock().unwrap().push(responder);
            })
        };
        let cache = MemoizedUrlCache::new(inner);
        let key = derive_key(TileCoord::new(3, 1, -1));

        let first = cache.url_for_key(&key);
        let second = cache.url_for_key(&key);
        parked.lock().unwrap().pop().unwrap().respond(None);
        assert_eq!(None, block_on(first));

        // Misses are not remembered, so this one goes to the inner cache again.
        let third = cache.url_for_key(&key);
        assert_eq!(1, parked.lock().unwrap().len());

        // Second waiter of the finished lookup shows up only now.
        assert_eq!(None, block_on(second));

        let fourth = cache.url_for_key(&key);
        assert_eq!(1, parked.lock().unwrap().len());

        parked.lock().unwrap().pop().unwrap().respond(Some("http://x/y.png".to_owned()));
        let (third, fourth) = block_on(join(third, fourth));
        assert_eq!(Some("http://x/y.png".to_owned()), third);
        assert_eq!(third, fourth);
    }

    #[test]
    fn least_recently_used_keys_are_forgotten() {
        let lookups = Arc::new(AtomicUsize::new(0));
        let cache = MemoizedUrlCache::with_options(
            counting(&lookups),
            MemoOptions {
                capacity: NonZeroUsize::new(1).unwrap(),
                ..Default::default()
            },
        );
        let a = derive_key(TileCoord::new(1, 0, -1));
        let b = derive_key(TileCoord::new(1, 1, -1));

        block_on(cache.url_for_key(&a));
        block_on(cache.url_for_key(&b));
        block_on(cache.url_for_key(&a));
        assert_eq!(3, lookups.load(Ordering::SeqCst));
    }
}
