//! Client for the remote movie and calendar API.

mod client;

pub use client::ApiClient;
