//! Wikipedia article source.
//!
//! Talks to two public read-only APIs:
//!
//! * the REST API (`/page/random/summary`) for the unfiltered feed, one
//!   request per card;
//! * the action API (`list=search`, then `prop=extracts|pageimages|...`
//!   keyed by page id) for category and text searches.
//!
//! Everything upstream returns passes through the `normalize_*` functions
//! in this file and nowhere else.  Any failure on the way (network error,
//! non-2xx status, JSON that does not fit) is logged and replaced with the
//! [`sample`](super::sample) set, so callers only ever see a list.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

use super::categories::{CategoryTable, ALL};
use super::{checked_paging, sample, Article, ArticleSource, Coordinates};

/// Thumbnail width requested from `prop=pageimages`.
const THUMBNAIL_WIDTH: u32 = 200;

/// Errors raised while talking to Wikipedia.
///
/// These never leave this module: [`WikipediaSource`] turns every one of
/// them into the fallback set.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Network-level error (DNS, connection, TLS, timeout)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// Response with a non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// The action API answered with an `error` object
    #[error("API error {code}: {info}")]
    Api { code: String, info: String },
    /// Body was not the JSON shape we expect
    #[error("Malformed response: {0}")]
    Malformed(String),
}

/// Where the Wikipedia APIs live.
///
/// Configurable so tests (and mirrors) can point elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    /// Action API endpoint (`.../w/api.php`).
    pub api_url: String,
    /// REST API root (`.../api/rest_v1`).
    pub rest_url: String,
    /// Prefix that a page title is appended to for its canonical link.
    pub article_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            api_url: "https://en.wikipedia.org/w/api.php".to_string(),
            rest_url: "https://en.wikipedia.org/api/rest_v1".to_string(),
            article_url: "https://en.wikipedia.org/wiki/".to_string(),
        }
    }
}

/// The live Wikipedia source.
#[derive(Debug, Clone)]
pub struct WikipediaSource {
    client: reqwest::Client,
    endpoints: Endpoints,
    categories: CategoryTable,
}

impl WikipediaSource {
    /// Create a source that sends every request through `client`.
    ///
    /// The client carries the transport policy (user agent, timeout); this
    /// type adds none of its own.
    pub fn new(client: reqwest::Client, endpoints: Endpoints, categories: CategoryTable) -> Self {
        Self {
            client,
            endpoints,
            categories,
        }
    }

    // -- random feed ---------------------------------------------------------

    /// `count` independent random summaries, fetched concurrently.
    ///
    /// Individual failures are dropped.  Only when every request fails is
    /// the whole batch an error.
    async fn random_batch(&self, count: usize) -> Result<Vec<Article>, SourceError> {
        let url = format!(
            "{}/page/random/summary",
            self.endpoints.rest_url.trim_end_matches('/')
        );

        let results = join_all((0..count).map(|_| self.random_summary(&url))).await;

        let mut articles = Vec::with_capacity(count);
        let mut last_error = None;
        for result in results {
            match result {
                Ok(Some(article)) => articles.push(article),
                Ok(None) => {}
                Err(e) => {
                    tracing::debug!(error = %e, "Random summary request failed");
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if articles.is_empty() => Err(e),
            _ => Ok(articles),
        }
    }

    async fn random_summary(&self, url: &str) -> Result<Option<Article>, SourceError> {
        let payload: SummaryPayload = self.get_json(self.client.get(url)).await?;
        Ok(self.normalize_summary(payload))
    }

    // -- search --------------------------------------------------------------

    /// One page of full-text search results, enriched with page details.
    ///
    /// If the details request fails the articles are built from the search
    /// snippets alone.
    async fn search(
        &self,
        expression: &str,
        page: u32,
        page_size: usize,
    ) -> Result<Vec<Article>, SourceError> {
        let limit = page_size.to_string();
        let offset = ((page as usize - 1) * page_size).to_string();
        let request = self.client.get(&self.endpoints.api_url).query(&[
            ("action", "query"),
            ("format", "json"),
            ("list", "search"),
            ("srsearch", expression),
            ("srlimit", limit.as_str()),
            ("sroffset", offset.as_str()),
            ("srprop", "snippet|timestamp"),
        ]);

        let payload: SearchPayload = self.get_json(request).await?;
        if let Some(error) = payload.error {
            return Err(SourceError::Api {
                code: error.code,
                info: error.info,
            });
        }
        let hits = payload
            .query
            .ok_or_else(|| SourceError::Malformed("search response has no `query`".into()))?
            .search;

        if hits.is_empty() {
            return Ok(Vec::new());
        }

        let details = match self.page_details(&hits).await {
            Ok(details) => details,
            Err(e) => {
                tracing::warn!(error = %e, hits = hits.len(), "Page details unavailable, using search snippets");
                HashMap::new()
            }
        };

        Ok(hits
            .into_iter()
            .filter_map(|hit| {
                let detail = hit.pageid.and_then(|id| details.get(&id));
                self.normalize_hit(&hit, detail)
            })
            .collect())
    }

    /// Extracts, thumbnails, descriptions, coordinates and categories for
    /// every hit, keyed by page id.
    async fn page_details(&self, hits: &[SearchHit]) -> Result<HashMap<u64, DetailsPage>, SourceError> {
        let ids = hits
            .iter()
            .filter_map(|h| h.pageid)
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join("|");
        let thumb_width = THUMBNAIL_WIDTH.to_string();

        let request = self.client.get(&self.endpoints.api_url).query(&[
            ("action", "query"),
            ("format", "json"),
            ("pageids", ids.as_str()),
            ("prop", "extracts|pageimages|description|coordinates|categories"),
            ("exintro", "1"),
            ("explaintext", "1"),
            ("exlimit", "max"),
            ("piprop", "thumbnail"),
            ("pithumbsize", thumb_width.as_str()),
            ("pilimit", "max"),
            ("colimit", "max"),
            ("clshow", "!hidden"),
            ("cllimit", "max"),
        ]);

        let payload: DetailsPayload = self.get_json(request).await?;
        Ok(payload
            .query
            .map(|q| q.pages)
            .unwrap_or_default()
            .into_values()
            .filter_map(|page| page.pageid.map(|id| (id, page)))
            .collect())
    }

    // -- transport -----------------------------------------------------------

    async fn get_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, SourceError> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::HttpStatus(status.as_u16()));
        }
        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| SourceError::Malformed(e.to_string()))
    }

    // -- normalization -------------------------------------------------------

    fn normalize_summary(&self, payload: SummaryPayload) -> Option<Article> {
        let id = payload.pageid?;
        let title = payload.title.filter(|t| !t.trim().is_empty())?;

        let url = payload
            .content_urls
            .and_then(|c| c.desktop)
            .and_then(|d| d.page)
            .unwrap_or_else(|| self.article_link(&title));

        let mut article = Article::new(id, title, payload.extract.unwrap_or_default(), url);
        article.description = payload.description.filter(|d| !d.is_empty());
        article.image_url = payload
            .thumbnail
            .and_then(|i| i.source)
            .or_else(|| payload.originalimage.and_then(|i| i.source));
        article.coordinates = payload.coordinates.map(|c| Coordinates {
            lat: c.lat,
            lon: c.lon,
        });
        article.touched = payload.timestamp.as_deref().and_then(parse_timestamp);
        Some(article)
    }

    fn normalize_hit(&self, hit: &SearchHit, detail: Option<&DetailsPage>) -> Option<Article> {
        let id = hit.pageid?;
        let title = hit.title.as_deref().filter(|t| !t.trim().is_empty())?;

        let extract = detail
            .and_then(|d| d.extract.as_deref())
            .filter(|e| !e.trim().is_empty())
            .map(str::to_string)
            .or_else(|| hit.snippet.as_deref().map(strip_html))
            .unwrap_or_default();

        let mut article = Article::new(id, title, extract, self.article_link(title));
        article.touched = hit.timestamp.as_deref().and_then(parse_timestamp);

        if let Some(detail) = detail {
            article.description = detail.description.clone().filter(|d| !d.is_empty());
            article.image_url = detail.thumbnail.as_ref().and_then(|t| t.source.clone());
            article.coordinates = detail.coordinates.first().map(|c| Coordinates {
                lat: c.lat,
                lon: c.lon,
            });
            article.categories = detail
                .categories
                .iter()
                .filter_map(|c| c.title.as_deref())
                .map(|t| t.strip_prefix("Category:").unwrap_or(t).to_string())
                .collect();
        }

        Some(article)
    }

    /// Canonical page link for `title`: spaces become underscores and the
    /// rest is percent-encoded as one path segment.
    fn article_link(&self, title: &str) -> String {
        let segment = title.replace(' ', "_");
        match Url::parse(&self.endpoints.article_url) {
            Ok(mut url) => {
                if let Ok(mut segments) = url.path_segments_mut() {
                    segments.pop_if_empty().push(&segment);
                }
                url.to_string()
            }
            Err(_) => format!("{}{}", self.endpoints.article_url, segment),
        }
    }
}

impl ArticleSource for WikipediaSource {
    fn name(&self) -> &str {
        "wikipedia"
    }

    async fn fetch_by_category(&self, category: &str, page: u32, page_size: usize) -> Vec<Article> {
        let (page, page_size) = checked_paging(page, page_size);

        let result = if category == ALL {
            self.random_batch(page_size).await
        } else {
            let expression = self.categories.expand(category);
            tracing::debug!(category, expression = %expression, page, "Category search");
            self.search(&expression, page, page_size).await
        };

        match result {
            Ok(articles) => {
                tracing::debug!(category, page, count = articles.len(), "Category page fetched");
                articles
            }
            Err(e) => {
                tracing::warn!(category, page, error = %e, "Category fetch failed, serving sample articles");
                sample::for_category(page_size)
            }
        }
    }

    async fn search_by_text(&self, query: &str, page: u32, page_size: usize) -> Vec<Article> {
        let query = query.trim();
        if query.is_empty() {
            return Vec::new();
        }
        let (page, page_size) = checked_paging(page, page_size);

        match self.search(query, page, page_size).await {
            Ok(articles) => {
                tracing::debug!(query, page, count = articles.len(), "Search page fetched");
                articles
            }
            Err(e) => {
                tracing::warn!(query, page, error = %e, "Search failed, filtering sample articles");
                sample::for_search(query, page_size)
            }
        }
    }
}

/// Remove markup from a search snippet and decode the few entities the
/// search API emits.
fn strip_html(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;

    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }

    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#039;", "'")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// RFC 3339 timestamp; anything unparsable is treated as absent.
fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

// ---------------------------------------------------------------------------
// Upstream payloads
//
// Every field is optional: the boundary decides what is required.
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SummaryPayload {
    pageid: Option<u64>,
    title: Option<String>,
    extract: Option<String>,
    description: Option<String>,
    thumbnail: Option<ImagePayload>,
    originalimage: Option<ImagePayload>,
    content_urls: Option<ContentUrls>,
    coordinates: Option<CoordinatePayload>,
    timestamp: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ImagePayload {
    source: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ContentUrls {
    desktop: Option<PageUrls>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PageUrls {
    page: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CoordinatePayload {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SearchPayload {
    query: Option<SearchQuery>,
    error: Option<ApiErrorPayload>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SearchQuery {
    search: Vec<SearchHit>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SearchHit {
    pageid: Option<u64>,
    title: Option<String>,
    snippet: Option<String>,
    timestamp: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ApiErrorPayload {
    code: String,
    info: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DetailsPayload {
    query: Option<DetailsQuery>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DetailsQuery {
    pages: HashMap<String, DetailsPage>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DetailsPage {
    pageid: Option<u64>,
    extract: Option<String>,
    description: Option<String>,
    thumbnail: Option<ImagePayload>,
    coordinates: Vec<CoordinatePayload>,
    categories: Vec<CategoryPayload>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CategoryPayload {
    title: Option<String>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
