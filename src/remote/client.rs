//! Remote API client
//!
//! Typed calls against the application's backend. Every request is routed
//! through the interception agent, so reads get the proxy's caching policies
//! and writes pass straight through.

use std::sync::Arc;

use axum::http::{header, Method};
use chrono::NaiveDate;
use futures::future::BoxFuture;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::auth::SessionStore;
use crate::cache::{DetailKey, ListKey, MovieSource, ResourceKind};
use crate::calendar::{BucketKey, CalendarSource};
use crate::error::{CacheError, Result};
use crate::models::{CalendarEntry, SaveEntryRequest};
use crate::proxy::{is_offline_api, InterceptedRequest, InterceptionAgent, ProxyResponse, OFFLINE_MESSAGE};

// == Api Client ==
/// Typed client for the movie backend.
///
/// Every call goes through the interception agent, so client reads get the
/// same offline fallbacks as any other request from the UI.
#[derive(Clone)]
pub struct ApiClient {
    agent: Arc<InterceptionAgent>,
    session: Arc<SessionStore>,
}

impl ApiClient {
    /// Creates a client that attaches the token held by `session`.
    pub fn new(agent: Arc<InterceptionAgent>, session: Arc<SessionStore>) -> Self {
        Self { agent, session }
    }

    /// The session the bearer token is read from.
    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    // == Request plumbing ==
    fn url(&self, path: &str, query: &[(&str, String)]) -> Result<Url> {
        let mut url = self
            .agent
            .app_origin()
            .join(path)
            .map_err(|e| CacheError::InvalidRequest(format!("bad path {path}: {e}")))?;
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }
        Ok(url)
    }

    /// Builds a request, attaching the bearer token when one is stored.
    fn request(&self, method: Method, url: Url) -> Result<InterceptedRequest> {
        let request = InterceptedRequest::new(method, url)
            .with_header(header::ACCEPT, "application/json")?;
        match self.session.token() {
            Some(token) => request.with_header(header::AUTHORIZATION, &format!("Bearer {token}")),
            None => Ok(request),
        }
    }

    async fn send(&self, request: InterceptedRequest) -> Result<ProxyResponse> {
        debug!(method = %request.method, path = request.url.path(), "api request");
        let response = self.agent.handle_fetch(request).await?;
        self.check(response)
    }

    fn check(&self, response: ProxyResponse) -> Result<ProxyResponse> {
        if response.is_success() {
            return Ok(response);
        }
        if response.status == 401 {
            if let Err(e) = self.session.clear() {
                warn!(error = %e, "failed to clear rejected token");
            }
            return Err(CacheError::Unauthorized);
        }
        if is_offline_api(&response) {
            return Err(CacheError::Offline(OFFLINE_MESSAGE.to_string()));
        }
        Err(CacheError::from_status(response.status, &response.text()))
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        let request = self.request(Method::GET, self.url(path, query)?)?;
        decode(self.send(request).await?)
    }

    // == Movies ==
    /// Fetches one page of a list resource.
    pub async fn movie_list(&self, key: &ListKey) -> Result<Value> {
        let query = match &key.kind {
            // Search pages by `limit`, every other list by `size`
            ResourceKind::Search { query } => vec![
                ("q", query.text().to_string()),
                ("page", key.page.to_string()),
                ("limit", key.size.to_string()),
            ],
            _ => vec![("page", key.page.to_string()), ("size", key.size.to_string())],
        };
        self.get_json(key.kind.path(), &query).await
    }

    /// Fetches one sub-resource of a movie.
    pub async fn movie_detail(&self, key: DetailKey) -> Result<Value> {
        self.get_json(&key.sub.path(key.entity_id), &[]).await
    }

    /// Asks the backend to resync its movie catalogue.
    pub async fn sync_movies(&self) -> Result<Value> {
        let request = self.request(Method::POST, self.url("/api/movies/sync", &[])?)?;
        decode(self.send(request).await?)
    }

    // == Calendar ==
    /// Fetches the raw entries of one month.
    pub async fn calendar_month(&self, bucket: BucketKey) -> Result<Value> {
        let query = [
            ("year", bucket.year.to_string()),
            ("month", bucket.month.to_string()),
        ];
        self.get_json("/api/calendar", &query).await
    }

    /// The entry for `date`, or `None` when the backend has none.
    pub async fn calendar_entry(&self, date: NaiveDate) -> Result<Option<CalendarEntry>> {
        match self
            .get_json("/api/calendar/entry", &[("date", date.to_string())])
            .await
        {
            Ok(value) => CalendarEntry::from_value(value).map(Some),
            Err(CacheError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Fetches an entry by its share identifier.
    pub async fn shared_entry(&self, share_uuid: &str) -> Result<CalendarEntry> {
        let value = self
            .get_json(&format!("/api/calendar/share/{share_uuid}"), &[])
            .await?;
        CalendarEntry::from_value(value)
    }

    /// Creates or replaces the entry for `body.date`.
    pub async fn save_calendar_entry(&self, body: &SaveEntryRequest) -> Result<CalendarEntry> {
        let request = self
            .request(Method::POST, self.url("/api/calendar/entry", &[])?)?
            .with_json_body(&serde_json::to_value(body)?)?;
        CalendarEntry::from_value(decode(self.send(request).await?)?)
    }

    /// Deletes the entry for `date`.
    pub async fn delete_calendar_entry(&self, date: NaiveDate) -> Result<()> {
        let url = self.url("/api/calendar/entry", &[("date", date.to_string())])?;
        self.send(self.request(Method::DELETE, url)?).await?;
        Ok(())
    }
}

// == Decoding ==
/// JSON body, `null` when empty, or the raw text when not JSON.
fn decode(response: ProxyResponse) -> Result<Value> {
    if response.body.is_empty() {
        return Ok(Value::Null);
    }
    match response.json_body() {
        Ok(value) => Ok(value),
        Err(_) if !response.content_type().unwrap_or_default().contains("json") => {
            Ok(Value::String(response.text()))
        }
        Err(e) => Err(e),
    }
}

// == Source Seams ==
impl MovieSource for ApiClient {
    fn fetch_list(&self, key: &ListKey) -> BoxFuture<'static, Result<Value>> {
        let this = self.clone();
        let key = key.clone();
        Box::pin(async move { this.movie_list(&key).await })
    }

    fn fetch_detail(&self, key: DetailKey) -> BoxFuture<'static, Result<Value>> {
        let this = self.clone();
        Box::pin(async move { this.movie_detail(key).await })
    }

    fn sync_movies(&self) -> BoxFuture<'static, Result<Value>> {
        let this = self.clone();
        Box::pin(async move { ApiClient::sync_movies(&this).await })
    }
}

impl CalendarSource for ApiClient {
    fn fetch_month(&self, bucket: BucketKey) -> BoxFuture<'static, Result<Value>> {
        let this = self.clone();
        Box::pin(async move { this.calendar_month(bucket).await })
    }

    fn save_entry(&self, request: SaveEntryRequest) -> BoxFuture<'static, Result<CalendarEntry>> {
        let this = self.clone();
        Box::pin(async move { this.save_calendar_entry(&request).await })
    }

    fn delete_entry(&self, date: NaiveDate) -> BoxFuture<'static, Result<()>> {
        let this = self.clone();
        Box::pin(async move { this.delete_calendar_entry(date).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::SubResource;
    use crate::config::Config;
    use crate::proxy::testing::ScriptedFetcher;
    use crate::store::{MemoryBackend, ResponseStores, StoreKind};

    fn client(fetcher: &ScriptedFetcher) -> ApiClient {
        let stores = ResponseStores::new(Arc::new(MemoryBackend::new()), "v1");
        let agent =
            InterceptionAgent::new(stores, Arc::new(fetcher.clone()), &Config::default()).unwrap();
        agent.activate().unwrap();
        ApiClient::new(Arc::new(agent), Arc::new(SessionStore::in_memory()))
    }

    #[tokio::test]
    async fn test_list_query_parameters() {
        let fetcher = ScriptedFetcher::online();
        let client = client(&fetcher);
        let key = ListKey::new(
            ResourceKind::parse("search", Some("Dune")).unwrap(),
            2,
            20,
        );

        client.movie_list(&key).await.unwrap();

        assert_eq!(
            fetcher.seen()[0].url.as_str(),
            "http://localhost:3000/api/movies/search?q=Dune&page=2&limit=20"
        );
    }

    #[tokio::test]
    async fn test_calendar_month_is_one_based() {
        let fetcher = ScriptedFetcher::online();
        let client = client(&fetcher);

        client
            .calendar_month(BucketKey::new(2025, 1).unwrap())
            .await
            .unwrap();

        assert_eq!(
            fetcher.seen()[0].url.as_str(),
            "http://localhost:3000/api/calendar?year=2025&month=1"
        );
    }

    #[tokio::test]
    async fn test_bearer_token_attached_and_response_not_stored() {
        let fetcher = ScriptedFetcher::online();
        let client = client(&fetcher);
        client.session().set_token("secret").unwrap();

        client.movie_detail(DetailKey::new(SubResource::Basic, 7)).await.unwrap();

        let seen = &fetcher.seen()[0];
        assert_eq!(
            seen.headers.get(header::AUTHORIZATION).unwrap(),
            "Bearer secret"
        );
        assert_eq!(client.agent.stores().len(StoreKind::Api).unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unauthorized_clears_token() {
        let fetcher = ScriptedFetcher::online();
        fetcher.respond(
            "http://localhost:3000/api/calendar?year=2025&month=3",
            ProxyResponse::new(401, "application/json", "{}"),
        );
        let client = client(&fetcher);
        client.session().set_token("expired").unwrap();

        let result = client.calendar_month(BucketKey::new(2025, 3).unwrap()).await;

        assert_eq!(result, Err(CacheError::Unauthorized));
        assert!(!client.session().has_token());
    }

    #[tokio::test]
    async fn test_offline_authenticated_read_is_offline_error() {
        let fetcher = ScriptedFetcher::offline();
        let client = client(&fetcher);
        client.session().set_token("t").unwrap();

        let result = client.calendar_month(BucketKey::new(2025, 3).unwrap()).await;

        assert!(matches!(result, Err(CacheError::Offline(_))));
    }

    #[tokio::test]
    async fn test_missing_entry_is_none() {
        let fetcher = ScriptedFetcher::online();
        fetcher.respond(
            "http://localhost:3000/api/calendar/entry?date=2025-03-09",
            ProxyResponse::new(404, "application/json", "{}"),
        );
        let client = client(&fetcher);

        let date = NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();
        assert_eq!(client.calendar_entry(date).await, Ok(None));
    }

    #[tokio::test]
    async fn test_write_failure_offline_propagates() {
        let client = client(&ScriptedFetcher::offline());
        let date = NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();

        let result = client.delete_calendar_entry(date).await;

        assert!(matches!(result, Err(CacheError::Network(_))));
    }

    #[test]
    fn test_decode_tolerates_empty_and_text_bodies() {
        assert_eq!(decode(ProxyResponse::new(200, "application/json", "")).unwrap(), Value::Null);
        assert_eq!(
            decode(ProxyResponse::new(200, "text/plain", "synced 12 movies")).unwrap(),
            Value::String("synced 12 movies".to_string())
        );
        assert!(decode(ProxyResponse::new(200, "application/json", "{oops")).is_err());
    }
}
