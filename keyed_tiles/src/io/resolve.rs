//! Asynchronous lookup loop.
use std::sync::Arc;

use egui::Context;
use futures::{
    FutureExt, StreamExt,
    channel::mpsc::{UnboundedReceiver, UnboundedSender},
    future::{Either, select},
    stream::FuturesUnordered,
};

use crate::{LookupKey, TileUrlCache};

/// Identifies a single load attempt.
pub(crate) type LoadId = u64;

/// Lookup requested by the coordinator.
#[derive(Debug)]
pub(crate) struct Request {
    pub id: LoadId,
    pub key: LookupKey,
}

/// Answer of the URL cache to a [`Request`].
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct Resolution {
    pub id: LoadId,
    pub key: LookupKey,
    pub url: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum Error {
    #[error("Lookup request channel from the main thread was broken.")]
    RequestChannelBroken,

    #[error("Resolution channel to the main thread was closed.")]
    ResolutionChannelClosed,
}

enum Event {
    Requested(Option<Request>),
    Resolved(Option<Resolution>),
}

#[cfg(not(target_arch = "wasm32"))]
type PendingLookup = futures::future::BoxFuture<'static, Resolution>;

#[cfg(target_arch = "wasm32")]
type PendingLookup = futures::future::LocalBoxFuture<'static, Resolution>;

fn lookup(url_cache: &dyn TileUrlCache, request: Request) -> PendingLookup {
    log::trace!("Looking up {}.", request.key);
    let url = url_cache.url_for_key(&request.key);
    let lookup = async move {
        Resolution {
            id: request.id,
            url: url.await.filter(|url| !url.is_empty()),
            key: request.key,
        }
    };

    #[cfg(not(target_arch = "wasm32"))]
    let lookup = lookup.boxed();

    #[cfg(target_arch = "wasm32")]
    let lookup = lookup.boxed_local();

    lookup
}

fn complete(
    resolution_tx: &UnboundedSender<Resolution>,
    egui_ctx: &Context,
    resolution: Resolution,
) -> Result<(), Error> {
    resolution_tx
        .unbounded_send(resolution)
        .map_err(|_| Error::ResolutionChannelClosed)?;
    egui_ctx.request_repaint();
    Ok(())
}

async fn resolve_continuously_impl(
    url_cache: Arc<dyn TileUrlCache>,
    mut request_rx: UnboundedReceiver<Request>,
    resolution_tx: UnboundedSender<Resolution>,
    egui_ctx: Context,
) -> Result<(), Error> {
    let mut outstanding = FuturesUnordered::<PendingLookup>::new();

    loop {
        let event = if outstanding.is_empty() {
            // Only new lookups might be requested.
            Event::Requested(request_rx.next().await)
        } else {
            // Ongoing lookups might be completed or new ones might be requested. Completions are
            // polled first, so they are not held back by a busy request channel.
            match select(outstanding.next(), request_rx.next()).await {
                Either::Left((resolution, _)) => Event::Resolved(resolution),
                Either::Right((request, _)) => Event::Requested(request),
            }
        };

        match event {
            Event::Requested(request) => {
                let request = request.ok_or(Error::RequestChannelBroken)?;
                outstanding.push(lookup(url_cache.as_ref(), request));
            }
            Event::Resolved(Some(resolution)) => {
                complete(&resolution_tx, &egui_ctx, resolution)?;
            }
            Event::Resolved(None) => {}
        }
    }
}

/// Continuously look up keys requested via the request channel. Every request gets exactly one
/// resolution, unless the URL cache never answers it.
pub(crate) async fn resolve_continuously(
    url_cache: Arc<dyn TileUrlCache>,
    request_rx: UnboundedReceiver<Request>,
    resolution_tx: UnboundedSender<Resolution>,
    egui_ctx: Context,
) {
    match resolve_continuously_impl(url_cache, request_rx, resolution_tx, egui_ctx).await {
        Ok(()) | Err(Error::RequestChannelBroken) | Err(Error::ResolutionChannelClosed) => {
            log::debug!("Tile lookup loop finished.");
        }
    }
}
