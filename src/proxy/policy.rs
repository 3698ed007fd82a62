//! Caching policies, one per resource class.
//!
//! Every policy resolves to a response. Store failures are logged and never
//! abort the request that triggered them.

use tracing::{debug, warn};

use crate::proxy::{fallback, Fetcher, InterceptedRequest, ProxyResponse};
use crate::store::{ResponseStores, StoreKind};

/// Store key of the app shell document.
pub const SHELL_PATH: &str = "/index.html";

// == Store Access ==
/// Store lookup that degrades to a miss on failure.
fn lookup(stores: &ResponseStores, kind: StoreKind, key: &str) -> Option<ProxyResponse> {
    match stores.lookup(kind, key) {
        Ok(found) => found,
        Err(e) => {
            warn!(?kind, key, error = %e, "store lookup failed");
            None
        }
    }
}

/// Store write that logs failures. Returns true if the write landed.
fn store(stores: &ResponseStores, kind: StoreKind, key: &str, response: &ProxyResponse) -> bool {
    match stores.put(kind, key, response) {
        Ok(()) => true,
        Err(e) => {
            warn!(?kind, key, error = %e, "store write failed");
            false
        }
    }
}

// == Static Assets ==
/// Cache-first. Navigations are answered with the cached shell when present.
/// Successful network responses are written back to the static store.
pub async fn static_asset(
    request: InterceptedRequest,
    stores: &ResponseStores,
    fetcher: &dyn Fetcher,
) -> ProxyResponse {
    if request.is_navigation() {
        let mut shell_url = request.url.clone();
        shell_url.set_path(SHELL_PATH);
        shell_url.set_query(None);
        let shell_key = crate::proxy::request_key(&request.method, &shell_url);
        if let Some(shell) = lookup(stores, StoreKind::Static, &shell_key) {
            debug!(url = %request.url, "serving cached shell");
            return shell;
        }
    }

    let key = request.cache_key();
    if let Some(cached) = lookup(stores, StoreKind::Static, &key) {
        debug!(%key, "static hit");
        return cached;
    }

    match fetcher.fetch(request).await {
        Ok(response) => {
            if response.is_success() {
                store(stores, StoreKind::Static, &key, &response);
            }
            response
        }
        Err(e) => {
            warn!(%key, error = %e, "static fetch failed, serving offline document");
            fallback::offline_document()
        }
    }
}

// == API Responses ==
/// Network-first. Only successful unauthenticated responses are stored.
/// Authenticated requests never fall back to a stored response.
pub async fn api_response(
    request: InterceptedRequest,
    stores: &ResponseStores,
    fetcher: &dyn Fetcher,
) -> ProxyResponse {
    let key = request.cache_key();
    let authenticated = request.is_authenticated();

    match fetcher.fetch(request).await {
        Ok(response) => {
            if response.is_success() && !authenticated {
                store(stores, StoreKind::Api, &key, &response);
            }
            response
        }
        Err(e) if authenticated => {
            warn!(%key, error = %e, "authenticated request failed offline");
            fallback::offline_api()
        }
        Err(e) => match lookup(stores, StoreKind::Api, &key) {
            Some(cached) => {
                debug!(%key, error = %e, "network failed, serving stored response");
                cached
            }
            None => {
                warn!(%key, error = %e, "network failed with nothing stored");
                fallback::offline_api()
            }
        },
    }
}

// == Images ==
/// Cache-first. Successful fetches are stored, then the image store is
/// trimmed to `limit` entries, oldest first.
pub async fn image(
    request: InterceptedRequest,
    stores: &ResponseStores,
    fetcher: &dyn Fetcher,
    limit: usize,
) -> ProxyResponse {
    let key = request.cache_key();
    if let Some(cached) = lookup(stores, StoreKind::Image, &key) {
        return cached;
    }

    match fetcher.fetch(request).await {
        Ok(response) => {
            if response.is_success() && store(stores, StoreKind::Image, &key, &response) {
                if let Err(e) = stores.enforce_limit(StoreKind::Image, limit) {
                    warn!(error = %e, "image store trim failed");
                }
            }
            response
        }
        Err(e) => {
            debug!(%key, error = %e, "image unavailable, serving placeholder");
            fallback::placeholder_image()
        }
    }
}
