use std::time::Duration;

use reqwest::StatusCode;

use crate::{LookupKey, TileUrlCache, UrlFuture, url_future};

pub use reqwest::header::HeaderValue;

/// Controls how [`HttpUrlCache`] talks to the lookup service.
pub struct HttpOptions {
    /// User agent to be sent to the lookup service.
    ///
    /// This should be set only on native targets. The browser sets its own user agent on wasm
    /// targets.
    pub user_agent: Option<HeaderValue>,

    /// Give up on a lookup after this long, which makes the tile fail.
    ///
    /// This option, as well as the user agent, is ignored in WASM.
    pub timeout: Option<Duration>,
}

impl Default for HttpOptions {
    fn default() -> Self {
        #[cfg(not(target_arch = "wasm32"))]
        let user_agent = Some(HeaderValue::from_static(concat!(
            env!("CARGO_PKG_NAME"),
            "/",
            env!("CARGO_PKG_VERSION"),
        )));

        #[cfg(target_arch = "wasm32")]
        let user_agent = None;

        Self {
            user_agent,
            timeout: Some(Duration::from_secs(30)),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// [`TileUrlCache`] asking an HTTP service. The URL of a key is the body of the response to
/// `GET {base_url}{key}`. Service responding with 404, 204 or an empty body has no URL for the
/// key.
pub struct HttpUrlCache {
    base_url: String,
    client: reqwest::Client,
}

impl HttpUrlCache {
    pub fn new(base_url: impl Into<String>) -> Result<Self, LookupError> {
        Self::with_options(base_url, HttpOptions::default())
    }

    pub fn with_options(
        base_url: impl Into<String>,
        http_options: HttpOptions,
    ) -> Result<Self, LookupError> {
        #[cfg_attr(target_arch = "wasm32", allow(unused_mut))]
        let mut builder = reqwest::Client::builder();

        #[cfg(not(target_arch = "wasm32"))]
        if let Some(user_agent) = http_options.user_agent {
            builder = builder.user_agent(user_agent);
        }

        #[cfg(not(target_arch = "wasm32"))]
        if let Some(timeout) = http_options.timeout {
            builder = builder.timeout(timeout);
        }

        let base_url = base_url.into();
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            client: builder.build()?,
        })
    }

    fn url_of(&self, key: &LookupKey) -> String {
        format!("{}{key}", self.base_url)
    }
}

async fn lookup(client: &reqwest::Client, url: &str) -> Result<Option<String>, LookupError> {
    let response = client.get(url).send().await?;

    log::debug!("Lookup responded with {:?}.", response.status());

    let status = response.status();
    if status == StatusCode::NOT_FOUND || status == StatusCode::NO_CONTENT {
        return Ok(None);
    }

    let body = response.error_for_status()?.text().await?;
    let tile_url = body.trim();
    Ok((!tile_url.is_empty()).then(|| tile_url.to_owned()))
}

impl TileUrlCache for HttpUrlCache {
    fn url_for_key(&self, key: &LookupKey) -> UrlFuture {
        let client = self.client.clone();
        let url = self.url_of(key);

        url_future(async move {
            match lookup(&client, &url).await {
                Ok(tile_url) => tile_url,
                Err(e) => {
                    log::warn!("Could not look up '{url}': {e}");
                    None
                }
            }
        })
    }
}
