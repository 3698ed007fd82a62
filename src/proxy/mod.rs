//! Network Interception Proxy
//!
//! Every outbound request from the UI passes through an `InterceptionAgent`.
//! Reads are classified into one of three resource classes, each with its own
//! caching policy over the persistent stores; everything else passes through.

mod agent;
mod classify;
mod fallback;
mod fetcher;
mod message;
mod policy;

#[cfg(test)]
pub(crate) mod testing;

pub use agent::{
    InstallReport, InterceptionAgent, Lifecycle, Notification, BACKGROUND_SYNC_TAG,
    INSTALL_MANIFEST,
};
pub use classify::{classify, has_image_extension, ResourceClass, Scope};
pub use fallback::{
    is_offline_api, offline_api, offline_document, placeholder_image, IMAGE_FAILURE_LABEL,
    OFFLINE_MESSAGE,
};
pub use fetcher::{Fetcher, HttpFetcher};
pub use message::{request_key, Destination, InterceptedRequest, ProxyResponse, RequestMode};
pub use policy::SHELL_PATH;
