//! Synthesized responses served when neither network nor store can answer.

use serde_json::json;

use crate::proxy::ProxyResponse;

pub const OFFLINE_MESSAGE: &str = "You are offline. Please check your network connection.";

pub const IMAGE_FAILURE_LABEL: &str = "Image failed to load";

const PLACEHOLDER_SVG: &str = concat!(
    r##"<svg width="300" height="450" xmlns="http://www.w3.org/2000/svg">"##,
    r##"<rect width="100%" height="100%" fill="#333"/>"##,
    r##"<text x="50%" y="50%" text-anchor="middle" fill="#999" font-family="Arial" font-size="14">"##,
    "Image failed to load",
    "</text></svg>"
);

const OFFLINE_DOCUMENT: &str = concat!(
    "<!DOCTYPE html><html><head><title>Offline</title></head>",
    "<body><h1>You are offline</h1>",
    "<p>Please check your network connection.</p></body></html>"
);

/// 503 with a JSON `{ "error": ... }` body.
pub fn offline_api() -> ProxyResponse {
    ProxyResponse::json(503, &json!({ "error": OFFLINE_MESSAGE }))
}

/// 200 with a fixed-size SVG placeholder.
pub fn placeholder_image() -> ProxyResponse {
    ProxyResponse::new(200, "image/svg+xml", PLACEHOLDER_SVG)
}

/// 200 with a minimal HTML page.
pub fn offline_document() -> ProxyResponse {
    ProxyResponse::new(200, "text/html", OFFLINE_DOCUMENT)
}

/// True if `response` is the synthesized offline API response.
pub fn is_offline_api(response: &ProxyResponse) -> bool {
    response.status == 503
        && response
            .json_body()
            .map(|body| body["error"] == OFFLINE_MESSAGE)
            .unwrap_or(false)
}
