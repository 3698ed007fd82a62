//! Network access for the interception proxy.

use std::time::Duration;

use axum::http::header;
use futures::future::BoxFuture;
use reqwest::Client;
use tracing::debug;
use url::Url;

use crate::error::{CacheError, Result};
use crate::proxy::{InterceptedRequest, ProxyResponse};

/// Headers dropped before a request is forwarded.
const HOP_HEADERS: [header::HeaderName; 4] = [
    header::HOST,
    header::CONNECTION,
    header::CONTENT_LENGTH,
    header::TRANSFER_ENCODING,
];

/// Performs the actual network call for an intercepted request.
///
/// `Ok` carries any HTTP response, including error statuses. `Err` means the
/// network itself failed (no connectivity, DNS, timeout).
pub trait Fetcher: Send + Sync + 'static {
    fn fetch(&self, request: InterceptedRequest) -> BoxFuture<'static, Result<ProxyResponse>>;
}

/// Forwards requests over HTTP. Requests for the app origin are sent to the
/// upstream server instead; other origins are fetched as-is.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
    app_origin: Url,
    upstream: Url,
}

impl HttpFetcher {
    pub fn new(app_origin: Url, upstream: Url, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CacheError::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            app_origin,
            upstream,
        })
    }

    /// Rewrites an app-origin URL onto the upstream server.
    pub fn target_url(&self, url: &Url) -> Url {
        if url.origin() != self.app_origin.origin() {
            return url.clone();
        }

        let mut target = self.upstream.clone();
        target.set_path(url.path());
        target.set_query(url.query());
        target
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, request: InterceptedRequest) -> BoxFuture<'static, Result<ProxyResponse>> {
        let client = self.client.clone();
        let target = self.target_url(&request.url);

        Box::pin(async move {
            let mut headers = request.headers;
            for name in &HOP_HEADERS {
                headers.remove(name);
            }

            debug!(method = %request.method, url = %target, "fetching");
            let mut builder = client.request(request.method, target).headers(headers);
            if !request.body.is_empty() {
                builder = builder.body(request.body);
            }

            let response = builder.send().await?;
            let status = response.status().as_u16();
            let headers = response
                .headers()
                .iter()
                .filter(|(name, _)| !HOP_HEADERS.contains(name))
                .filter_map(|(name, value)| {
                    value
                        .to_str()
                        .ok()
                        .map(|v| (name.as_str().to_string(), v.to_string()))
                })
                .collect();
            let body = response.bytes().await?.to_vec();

            Ok(ProxyResponse {
                status,
                headers,
                body,
            })
        })
    }
}
