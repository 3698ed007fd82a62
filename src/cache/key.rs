//! Cache keys for the Response Cache and Detail Cache.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CacheError;

// ============================================================================
// List resources
// ============================================================================

/// Logical list resource served by the Response Cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    /// Full movie list
    Movies,
    /// Featured movies
    Featured,
    /// New releases
    NewReleases,
    /// Personal recommendations
    Recommendations,
    /// Free-text search
    Search { query: SearchQuery },
}

/// Search text as typed (trimmed) plus its normalized cache identity.
///
/// Equality and hashing use only the normalized form, so "Dune" and " dune "
/// share an entry while the backend still receives the text as typed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQuery {
    text: String,
    normalized: String,
}

impl SearchQuery {
    /// Returns `None` for blank input.
    pub fn new(raw: &str) -> Option<Self> {
        let text = raw.trim();
        if text.is_empty() {
            return None;
        }
        Some(Self {
            text: text.to_string(),
            normalized: text.to_lowercase(),
        })
    }

    /// The trimmed text sent to the backend.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn normalized(&self) -> &str {
        &self.normalized
    }
}

impl PartialEq for SearchQuery {
    fn eq(&self, other: &Self) -> bool {
        self.normalized == other.normalized
    }
}

impl Eq for SearchQuery {}

impl Hash for SearchQuery {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.normalized.hash(state);
    }
}

impl ResourceKind {
    /// Parses a route segment, taking the search query from `query` when needed.
    pub fn parse(name: &str, query: Option<&str>) -> Result<Self, CacheError> {
        match name {
            "movies" => Ok(Self::Movies),
            "featured" => Ok(Self::Featured),
            "new-releases" => Ok(Self::NewReleases),
            "recommendations" => Ok(Self::Recommendations),
            "search" => query
                .and_then(SearchQuery::new)
                .map(|query| Self::Search { query })
                .ok_or_else(|| {
                    CacheError::InvalidRequest("search requires a non-empty query".to_string())
                }),
            other => Err(CacheError::InvalidRequest(format!(
                "unknown resource kind: {other}"
            ))),
        }
    }

    /// API path for this resource.
    pub fn path(&self) -> &'static str {
        match self {
            Self::Movies => "/api/movies",
            Self::Featured => "/api/movies/featured",
            Self::NewReleases => "/api/movies/new-releases",
            Self::Recommendations => "/api/movies/recommendations",
            Self::Search { .. } => "/api/movies/search",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Movies => write!(f, "movies"),
            Self::Featured => write!(f, "featured"),
            Self::NewReleases => write!(f, "new-releases"),
            Self::Recommendations => write!(f, "recommendations"),
            Self::Search { query } => write!(f, "search:{}", query.normalized()),
        }
    }
}

/// Composite key: resource kind + page index + page size.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListKey {
    pub kind: ResourceKind,
    pub page: u32,
    pub size: u32,
}

impl ListKey {
    pub fn new(kind: ResourceKind, page: u32, size: u32) -> Self {
        Self { kind, page, size }
    }
}

impl fmt::Display for ListKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.kind, self.page, self.size)
    }
}

// ============================================================================
// Detail resources
// ============================================================================

/// Per-entity secondary resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubResource {
    Basic,
    Videos,
    Photos,
}

impl SubResource {
    /// Sub-resources prefetched after a basic-info request.
    pub const PREFETCHED: [SubResource; 2] = [SubResource::Videos, SubResource::Photos];

    /// API path for this sub-resource of movie `id`.
    pub fn path(&self, id: u64) -> String {
        match self {
            Self::Basic => format!("/api/movies/{id}"),
            Self::Videos => format!("/api/movies/{id}/videos"),
            Self::Photos => format!("/api/movies/{id}/photos"),
        }
    }
}

impl FromStr for SubResource {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic" => Ok(Self::Basic),
            "videos" => Ok(Self::Videos),
            "photos" => Ok(Self::Photos),
            other => Err(CacheError::InvalidRequest(format!(
                "unknown sub-resource: {other}"
            ))),
        }
    }
}

impl fmt::Display for SubResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Basic => "basic",
            Self::Videos => "videos",
            Self::Photos => "photos",
        };
        f.write_str(name)
    }
}

/// Detail Cache key: sub-resource + entity id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DetailKey {
    pub sub: SubResource,
    pub entity_id: u64,
}

impl DetailKey {
    pub fn new(sub: SubResource, entity_id: u64) -> Self {
        Self { sub, entity_id }
    }
}

impl fmt::Display for DetailKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.sub, self.entity_id)
    }
}
