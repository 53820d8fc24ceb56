//! The external capability resolving [`LookupKey`]s into tile URLs.

use futures::FutureExt;
use futures::channel::oneshot;

use crate::LookupKey;

/// Result of a single lookup: a URL, or `None` if the cache has nothing for the key.
#[cfg(not(target_arch = "wasm32"))]
pub type UrlFuture = futures::future::BoxFuture<'static, Option<String>>;

/// Result of a single lookup: a URL, or `None` if the cache has nothing for the key.
#[cfg(target_arch = "wasm32")]
pub type UrlFuture = futures::future::LocalBoxFuture<'static, Option<String>>;

/// Box the future, so it can be returned from [`TileUrlCache::url_for_key`].
#[cfg(not(target_arch = "wasm32"))]
pub fn url_future<F>(future: F) -> UrlFuture
where
    F: Future<Output = Option<String>> + Send + 'static,
{
    future.boxed()
}

/// Box the future, so it can be returned from [`TileUrlCache::url_for_key`].
#[cfg(target_arch = "wasm32")]
pub fn url_future<F>(future: F) -> UrlFuture
where
    F: Future<Output = Option<String>> + 'static,
{
    future.boxed_local()
}

/// Asynchronous, cache-backed source of tile URLs.
///
/// How the URLs are fetched, cached, retried or evicted is entirely up to the implementation.
/// Every returned future should eventually complete, as tiles wait for it without a timeout.
pub trait TileUrlCache: Send + Sync {
    fn url_for_key(&self, key: &LookupKey) -> UrlFuture;
}

impl<F> TileUrlCache for F
where
    F: Fn(&LookupKey) -> UrlFuture + Send + Sync,
{
    fn url_for_key(&self, key: &LookupKey) -> UrlFuture {
        self(key)
    }
}

/// Completes a single lookup started by [`CallbackUrlCache`].
///
/// Consumed by [`Responder::respond`], so a lookup can be answered only once.
pub struct Responder {
    key: LookupKey,
    tx: oneshot::Sender<Option<String>>,
}

impl Responder {
    pub fn key(&self) -> &LookupKey {
        &self.key
    }

    pub fn respond(self, url: Option<String>) {
        if self.tx.send(url).is_err() {
            log::debug!("Nobody is waiting for {} anymore.", self.key);
        }
    }
}

/// Adapts a callback-style resolver into a [`TileUrlCache`].
///
/// The callback gets the key and a [`Responder`], which it may answer immediately or hand over
/// somewhere else. Dropping the responder without answering counts as "no URL".
pub struct CallbackUrlCache<F> {
    callback: F,
}

impl<F> CallbackUrlCache<F>
where
    F: Fn(&LookupKey, Responder) + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> TileUrlCache for CallbackUrlCache<F>
where
    F: Fn(&LookupKey, Responder) + Send + Sync,
{
    fn url_for_key(&self, key: &LookupKey) -> UrlFuture {
        let (tx, rx) = oneshot::channel();
        (self.callback)(
            key,
            Responder {
                key: key.clone(),
                tx,
            },
        );

        let key = key.clone();
        url_future(async move {
            rx.await.unwrap_or_else(|_| {
                log::warn!("Responder for {key} was dropped without an answer.");
                None
            })
        })
    }
}
