//! Scripted network for proxy tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use serde_json::json;

use crate::error::{CacheError, Result};
use crate::proxy::{Fetcher, InterceptedRequest, ProxyResponse};

#[derive(Default)]
struct Script {
    online: AtomicBool,
    calls: AtomicUsize,
    responses: Mutex<HashMap<String, ProxyResponse>>,
    seen: Mutex<Vec<InterceptedRequest>>,
}

/// Answers from a per-URL script, or `{"url": ...}` with 200 when unscripted.
/// Offline, every fetch fails with a network error.
#[derive(Clone, Default)]
pub struct ScriptedFetcher {
    script: Arc<Script>,
}

impl ScriptedFetcher {
    pub fn online() -> Self {
        let fetcher = Self::default();
        fetcher.go_online();
        fetcher
    }

    pub fn offline() -> Self {
        Self::default()
    }

    pub fn go_online(&self) {
        self.script.online.store(true, Ordering::SeqCst);
    }

    pub fn go_offline(&self) {
        self.script.online.store(false, Ordering::SeqCst);
    }

    pub fn respond(&self, url: &str, response: ProxyResponse) {
        self.script
            .responses
            .lock()
            .unwrap()
            .insert(url.to_string(), response);
    }

    /// Fetch attempts, including ones that failed offline.
    pub fn calls(&self) -> usize {
        self.script.calls.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<InterceptedRequest> {
        self.script.seen.lock().unwrap().clone()
    }
}

impl Fetcher for ScriptedFetcher {
    fn fetch(&self, request: InterceptedRequest) -> BoxFuture<'static, Result<ProxyResponse>> {
        let script = Arc::clone(&self.script);
        Box::pin(async move {
            script.calls.fetch_add(1, Ordering::SeqCst);
            script.seen.lock().unwrap().push(request.clone());
            if !script.online.load(Ordering::SeqCst) {
                return Err(CacheError::Network("connection refused".to_string()));
            }

            let url = request.url.to_string();
            let scripted = script.responses.lock().unwrap().get(&url).cloned();
            Ok(scripted.unwrap_or_else(|| ProxyResponse::json(200, &json!({ "url": url }))))
        })
    }
}
