//! Resource classification
//!
//! Decides which caching policy applies to an intercepted request. Called
//! exactly once per request.

use axum::http::Method;
use url::{Origin, Url};

use crate::proxy::{Destination, InterceptedRequest};

/// File extensions treated as images when the destination is not reported.
const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "gif", "webp", "svg"];

/// The caching policy a request falls under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceClass {
    StaticAsset,
    ApiResponse,
    Image,
}

/// What counts as "the application's own API".
#[derive(Debug, Clone)]
pub struct Scope {
    origin: Origin,
    api_prefix: String,
}

impl Scope {
    pub fn new(app_origin: &Url, api_prefix: &str) -> Self {
        Self {
            origin: app_origin.origin(),
            api_prefix: api_prefix.to_string(),
        }
    }

    pub fn is_same_origin(&self, url: &Url) -> bool {
        url.origin() == self.origin
    }

    pub fn is_api(&self, url: &Url) -> bool {
        self.is_same_origin(url) && url.path().starts_with(&self.api_prefix)
    }
}

/// Classifies `request`, or returns `None` for requests that are never
/// intercepted (anything other than `GET`).
///
/// Precedence: API, then image, then static asset.
pub fn classify(request: &InterceptedRequest, scope: &Scope) -> Option<ResourceClass> {
    if request.method != Method::GET {
        return None;
    }

    let class = if scope.is_api(&request.url) {
        ResourceClass::ApiResponse
    } else if request.destination == Destination::Image || has_image_extension(&request.url) {
        ResourceClass::Image
    } else {
        ResourceClass::StaticAsset
    };
    Some(class)
}

/// True if the URL path ends in a known image extension (case-insensitive).
pub fn has_image_extension(url: &Url) -> bool {
    url.path()
        .rsplit_once('.')
        .map(|(_, ext)| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope() -> Scope {
        Scope::new(&Url::parse("http://localhost:3000").unwrap(), "/api/")
    }

    fn get(url: &str) -> InterceptedRequest {
        InterceptedRequest::get(Url::parse(url).unwrap())
    }

    #[test]
    fn test_non_get_is_not_intercepted() {
        let req = InterceptedRequest::new(
            Method::POST,
            Url::parse("http://localhost:3000/api/calendar/entry").unwrap(),
        );
        assert_eq!(classify(&req, &scope()), None);

        let req = InterceptedRequest::new(
            Method::DELETE,
            Url::parse("http://localhost:3000/poster.png").unwrap(),
        );
        assert_eq!(classify(&req, &scope()), None);
    }

    #[test]
    fn test_same_origin_api_prefix() {
        let class = classify(&get("http://localhost:3000/api/movies?page=0"), &scope());
        assert_eq!(class, Some(ResourceClass::ApiResponse));
    }

    #[test]
    fn test_cross_origin_api_path_is_not_api() {
        let class = classify(&get("https://other.example/api/movies"), &scope());
        assert_eq!(class, Some(ResourceClass::StaticAsset));

        let class = classify(&get("http://localhost:3001/api/movies"), &scope());
        assert_eq!(class, Some(ResourceClass::StaticAsset));
    }

    #[test]
    fn test_api_takes_precedence_over_image_extension() {
        let class = classify(&get("http://localhost:3000/api/posters/1.png"), &scope());
        assert_eq!(class, Some(ResourceClass::ApiResponse));
    }

    #[test]
    fn test_image_by_extension() {
        for url in [
            "https://image.tmdb.org/t/p/w500/abc.jpg",
            "http://localhost:3000/logo.SVG",
            "https://cdn.example/x.webp?w=300",
        ] {
            assert_eq!(classify(&get(url), &scope()), Some(ResourceClass::Image), "{url}");
        }
    }

    #[test]
    fn test_image_by_destination() {
        let mut req = get("https://cdn.example/poster?id=7");
        req.destination = Destination::Image;
        assert_eq!(classify(&req, &scope()), Some(ResourceClass::Image));
    }

    #[test]
    fn test_everything_else_is_static() {
        for url in [
            "http://localhost:3000/",
            "http://localhost:3000/static/js/main.js",
            "http://localhost:3000/manifest.json",
        ] {
            assert_eq!(
                classify(&get(url), &scope()),
                Some(ResourceClass::StaticAsset),
                "{url}"
            );
        }
    }

    proptest::proptest! {
        #[test]
        fn prop_non_get_never_classified(
            path in "/[a-z]{1,8}(/[a-z]{1,8}){0,2}(\\.png)?",
            method in proptest::sample::select(vec![Method::POST, Method::PUT, Method::DELETE, Method::PATCH]),
        ) {
            let url = Url::parse(&format!("http://localhost:3000{path}")).unwrap();
            let req = InterceptedRequest::new(method, url);
            proptest::prop_assert_eq!(classify(&req, &scope()), None);
        }

        #[test]
        fn prop_same_origin_api_always_wins(
            rest in "[a-z]{1,8}(/[a-z0-9]{1,8}){0,2}",
            ext in proptest::sample::select(vec!["", ".jpg", ".PNG", ".webp", ".js"]),
        ) {
            let req = get(&format!("http://localhost:3000/api/{rest}{ext}"));
            proptest::prop_assert_eq!(classify(&req, &scope()), Some(ResourceClass::ApiResponse));
        }

        #[test]
        fn prop_image_extension_outside_api(
            name in "[a-z]{1,8}",
            ext in proptest::sample::select(vec!["jpg", "JPEG", "png", "Gif", "webp", "svg"]),
        ) {
            let req = get(&format!("https://cdn.example/{name}.{ext}"));
            proptest::prop_assert_eq!(classify(&req, &scope()), Some(ResourceClass::Image));
        }
    }
}
