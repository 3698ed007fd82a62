//! Interception Agent
//!
//! The long-lived object that owns the persistent stores and answers every
//! intercepted request. Lifecycle hooks (install, activate, sync, push) are
//! plain methods; `handle_fetch` is the fetch hook.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::proxy::{
    classify, policy, Fetcher, InterceptedRequest, ProxyResponse, ResourceClass, Scope,
};
use crate::store::{ResponseStores, StoreKind};

/// Shell resources pre-populated into the static store on install.
pub const INSTALL_MANIFEST: [&str; 5] = [
    "/",
    "/index.html",
    "/manifest.json",
    "/logo.svg",
    "/favicon.ico",
];

/// The only sync tag the agent acts on.
pub const BACKGROUND_SYNC_TAG: &str = "background-sync";

const NOTIFICATION_ICON: &str = "/logo192.png";
const NOTIFICATION_VIBRATE: [u32; 3] = [100, 50, 100];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifecycle {
    /// Constructed, nothing pre-populated yet
    Parsed,
    Installed,
    /// Old stores removed; every request is intercepted
    Activated,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    pub cached: Vec<String>,
    pub failed: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct PushPayload {
    title: String,
    #[serde(default)]
    body: String,
}

/// A user-visible notification produced by a push message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub vibrate: Vec<u32>,
    pub arrived_at: DateTime<Utc>,
}

pub struct InterceptionAgent {
    stores: ResponseStores,
    fetcher: Arc<dyn Fetcher>,
    scope: Scope,
    app_origin: Url,
    image_limit: usize,
    lifecycle: Mutex<Lifecycle>,
    notifications: Option<mpsc::Sender<Notification>>,
}

impl InterceptionAgent {
    pub fn new(stores: ResponseStores, fetcher: Arc<dyn Fetcher>, config: &Config) -> Result<Self> {
        let app_origin = Url::parse(&config.app_origin).map_err(|e| {
            CacheError::InvalidRequest(format!("invalid app origin {}: {}", config.app_origin, e))
        })?;

        Ok(Self {
            stores,
            fetcher,
            scope: Scope::new(&app_origin, &config.api_prefix),
            app_origin,
            image_limit: config.image_cache_limit,
            lifecycle: Mutex::new(Lifecycle::Parsed),
            notifications: None,
        })
    }

    /// Delivers push notifications on `sender`.
    pub fn with_notifications(mut self, sender: mpsc::Sender<Notification>) -> Self {
        self.notifications = Some(sender);
        self
    }

    pub fn stores(&self) -> &ResponseStores {
        &self.stores
    }

    pub fn app_origin(&self) -> &Url {
        &self.app_origin
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
            .lock()
            .map(|state| *state)
            .unwrap_or(Lifecycle::Parsed)
    }

    fn set_lifecycle(&self, next: Lifecycle) {
        if let Ok(mut state) = self.lifecycle.lock() {
            *state = next;
        }
    }

    // == Install ==
    /// Fetches each manifest resource and stores the successful ones.
    /// Individual failures are recorded, never fatal.
    pub async fn install(&self) -> InstallReport {
        let mut report = InstallReport::default();
        if let Err(e) = self.stores.open(StoreKind::Static) {
            warn!(error = %e, "failed to open static store");
        }

        for path in INSTALL_MANIFEST {
            match self.precache(path).await {
                Ok(()) => report.cached.push(path.to_string()),
                Err(e) => {
                    warn!(path, error = %e, "precache failed, continuing install");
                    report.failed.push(path.to_string());
                }
            }
        }

        self.set_lifecycle(Lifecycle::Installed);
        info!(
            cached = report.cached.len(),
            failed = report.failed.len(),
            "interception agent installed"
        );
        report
    }

    async fn precache(&self, path: &str) -> Result<()> {
        let url = self
            .app_origin
            .join(path)
            .map_err(|e| CacheError::InvalidRequest(format!("bad manifest path {path}: {e}")))?;
        let request = InterceptedRequest::get(url);
        let key = request.cache_key();

        let response = self.fetcher.fetch(request).await?;
        if !response.is_success() {
            return Err(CacheError::from_status(response.status, &response.text()));
        }
        self.stores.put(StoreKind::Static, &key, &response)
    }

    // == Activate ==
    /// Deletes every store not named by the current version, then takes
    /// control of all requests. Returns the deleted store names.
    pub fn activate(&self) -> Result<Vec<String>> {
        let deleted = self.stores.delete_outdated()?;
        for name in &deleted {
            info!(store = %name, "deleted outdated store");
        }
        for kind in StoreKind::ALL {
            self.stores.open(kind)?;
        }

        self.set_lifecycle(Lifecycle::Activated);
        info!("interception agent activated");
        Ok(deleted)
    }

    pub fn is_controlling(&self) -> bool {
        self.lifecycle() == Lifecycle::Activated
    }

    // == Fetch ==
    /// Answers `request`.
    ///
    /// Intercepted reads always produce a response. Requests that are not
    /// intercepted (non-`GET`, or before activation) go straight to the
    /// network, and only those can fail.
    pub async fn handle_fetch(&self, request: InterceptedRequest) -> Result<ProxyResponse> {
        let class = if self.is_controlling() {
            classify(&request, &self.scope)
        } else {
            None
        };

        let fetcher = self.fetcher.as_ref();
        let response = match class {
            None => {
                debug!(method = %request.method, url = %request.url, "passthrough");
                return fetcher.fetch(request).await;
            }
            Some(ResourceClass::StaticAsset) => {
                policy::static_asset(request, &self.stores, fetcher).await
            }
            Some(ResourceClass::ApiResponse) => {
                policy::api_response(request, &self.stores, fetcher).await
            }
            Some(ResourceClass::Image) => {
                policy::image(request, &self.stores, fetcher, self.image_limit).await
            }
        };
        Ok(response)
    }

    // == Sync / Push ==
    /// Handles a background sync event. Returns true if the tag is recognized.
    pub fn sync(&self, tag: &str) -> bool {
        if tag == BACKGROUND_SYNC_TAG {
            info!(tag, "background sync");
            true
        } else {
            debug!(tag, "ignoring unknown sync tag");
            false
        }
    }

    /// Turns a push payload into a notification. Malformed payloads are
    /// logged and dropped.
    pub fn push(&self, payload: &[u8]) -> Option<Notification> {
        let payload: PushPayload = match serde_json::from_slice(payload) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "dropping malformed push payload");
                return None;
            }
        };

        let notification = Notification {
            title: payload.title,
            body: payload.body,
            icon: NOTIFICATION_ICON.to_string(),
            badge: NOTIFICATION_ICON.to_string(),
            vibrate: NOTIFICATION_VIBRATE.to_vec(),
            arrived_at: Utc::now(),
        };

        if let Some(sender) = &self.notifications {
            if let Err(e) = sender.try_send(notification.clone()) {
                warn!(error = %e, "notification channel unavailable");
            }
        }
        Some(notification)
    }
}
