//! Dropbox HTTP client and the storage boundary used by the sync pipeline

use crate::constants::*;
use crate::error::{Result, SyncError};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::future::Future;
use tracing::debug;

// ============================================================================
// STORAGE BOUNDARY
// ============================================================================

/// One page request of a filename search
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchQuery {
    /// First page for one extension under `path` ("" is the root)
    Start { path: String, extension: String },
    /// Next page of an earlier search
    Continue { cursor: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchMatch {
    pub id: String,
    pub name: String,
    pub path_lower: String,
    pub size: u64,
    pub client_modified: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchPage {
    pub matches: Vec<SearchMatch>,
    /// Present when more matches are available
    pub cursor: Option<String>,
}

/// Photo metadata; any field may be missing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhotoMetadata {
    pub dimensions: Option<(u32, u32)>,
    pub location: Option<(f64, f64)>,
    pub time_taken: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ThumbnailResult {
    Success {
        id: String,
        /// Base64 encoded image
        thumbnail: String,
        media: Option<PhotoMetadata>,
    },
    /// Entry failed; matched to its request by position
    Failure,
}

/// Remote file storage as seen by the sync pipeline
pub trait RemoteStorage: Send + Sync {
    fn search(&self, query: SearchQuery) -> impl Future<Output = Result<SearchPage>> + Send;

    /// Fetch strict-fit thumbnails for `paths`, one result per path in order
    fn thumbnail_batch(
        &self,
        paths: Vec<String>,
    ) -> impl Future<Output = Result<Vec<ThumbnailResult>>> + Send;
}

// ============================================================================
// WIRE FORMAT
// ============================================================================

#[derive(Serialize)]
struct SearchArg<'a> {
    query: &'a str,
    options: SearchOptions<'a>,
}

#[derive(Serialize)]
struct SearchOptions<'a> {
    #[serde(skip_serializing_if = "str::is_empty")]
    path: &'a str,
    max_results: u64,
    file_status: &'static str,
    filename_only: bool,
    file_extensions: Vec<&'a str>,
}

#[derive(Serialize)]
struct SearchContinueArg<'a> {
    cursor: &'a str,
}

#[derive(Deserialize)]
struct SearchResultWire {
    #[serde(default)]
    matches: Vec<SearchMatchWire>,
    #[serde(default)]
    has_more: bool,
    cursor: Option<String>,
}

#[derive(Deserialize)]
struct SearchMatchWire {
    metadata: MetadataV2Wire,
}

#[derive(Deserialize)]
struct MetadataV2Wire {
    metadata: Option<EntryWire>,
}

#[derive(Deserialize)]
#[serde(tag = ".tag", rename_all = "lowercase")]
enum EntryWire {
    File(FileMetadataWire),
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct FileMetadataWire {
    id: String,
    name: String,
    #[serde(default)]
    path_lower: Option<String>,
    #[serde(default)]
    size: u64,
    client_modified: DateTime<Utc>,
    #[serde(default)]
    media_info: Option<MediaInfoWire>,
}

#[derive(Deserialize)]
struct MediaInfoWire {
    metadata: Option<MediaMetadataWire>,
}

#[derive(Deserialize)]
struct MediaMetadataWire {
    dimensions: Option<DimensionsWire>,
    location: Option<LocationWire>,
    time_taken: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct DimensionsWire {
    width: u32,
    height: u32,
}

#[derive(Deserialize)]
struct LocationWire {
    latitude: f64,
    longitude: f64,
}

#[derive(Serialize)]
struct ThumbnailBatchArg<'a> {
    entries: Vec<ThumbnailArg<'a>>,
}

#[derive(Serialize)]
struct ThumbnailArg<'a> {
    path: &'a str,
    format: &'static str,
    size: &'static str,
    mode: &'static str,
}

#[derive(Deserialize)]
struct ThumbnailBatchWire {
    #[serde(default)]
    entries: Vec<ThumbnailEntryWire>,
}

#[derive(Deserialize)]
struct ThumbnailEntryWire {
    #[serde(rename = ".tag")]
    tag: String,
    metadata: Option<FileMetadataWire>,
    thumbnail: Option<String>,
}

impl From<FileMetadataWire> for SearchMatch {
    fn from(m: FileMetadataWire) -> Self {
        let path_lower = m.path_lower.unwrap_or_else(|| m.name.to_lowercase());
        Self {
            id: m.id,
            name: m.name,
            path_lower,
            size: m.size,
            client_modified: m.client_modified,
        }
    }
}

impl From<SearchResultWire> for SearchPage {
    fn from(wire: SearchResultWire) -> Self {
        let matches = wire
            .matches
            .into_iter()
            .filter_map(|m| match m.metadata.metadata {
                Some(EntryWire::File(file)) => Some(SearchMatch::from(file)),
                _ => None,
            })
            .collect();
        Self {
            matches,
            cursor: if wire.has_more { wire.cursor } else { None },
        }
    }
}

impl From<ThumbnailEntryWire> for ThumbnailResult {
    fn from(entry: ThumbnailEntryWire) -> Self {
        match (entry.tag.as_str(), entry.metadata, entry.thumbnail) {
            ("success", Some(meta), Some(thumbnail)) => {
                let media = meta.media_info.and_then(|i| i.metadata).map(|m| PhotoMetadata {
                    dimensions: m.dimensions.map(|d| (d.width, d.height)),
                    location: m.location.map(|l| (l.latitude, l.longitude)),
                    time_taken: m.time_taken,
                });
                ThumbnailResult::Success {
                    id: meta.id,
                    thumbnail,
                    media,
                }
            }
            _ => ThumbnailResult::Failure,
        }
    }
}

// ============================================================================
// CLIENT
// ============================================================================

pub struct DropboxClient {
    http: reqwest::Client,
    token: String,
    api_url: String,
    content_url: String,
}

impl DropboxClient {
    pub fn new(token: String, api_url: &str, content_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            token,
            api_url: api_url.trim_end_matches('/').to_string(),
            content_url: content_url.trim_end_matches('/').to_string(),
        }
    }

    async fn post<A: Serialize, R: DeserializeOwned>(&self, url: String, arg: &A) -> Result<R> {
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .json(arg)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

impl RemoteStorage for DropboxClient {
    async fn search(&self, query: SearchQuery) -> Result<SearchPage> {
        let wire: SearchResultWire = match &query {
            SearchQuery::Start { path, extension } => {
                let ext = extension.trim_start_matches('.');
                debug!(path = %path, extension = ext, "Searching");
                let arg = SearchArg {
                    query: ext,
                    options: SearchOptions {
                        path,
                        max_results: SEARCH_PAGE_SIZE,
                        file_status: "active",
                        filename_only: true,
                        file_extensions: vec![ext],
                    },
                };
                self.post(format!("{}/2/files/search_v2", self.api_url), &arg).await?
            }
            SearchQuery::Continue { cursor } => {
                let arg = SearchContinueArg { cursor };
                self.post(format!("{}/2/files/search/continue_v2", self.api_url), &arg)
                    .await?
            }
        };
        Ok(wire.into())
    }

    async fn thumbnail_batch(&self, paths: Vec<String>) -> Result<Vec<ThumbnailResult>> {
        let arg = ThumbnailBatchArg {
            entries: paths
                .iter()
                .map(|path| ThumbnailArg {
                    path,
                    format: THUMBNAIL_FORMAT,
                    size: THUMBNAIL_SIZE,
                    mode: THUMBNAIL_MODE,
                })
                .collect(),
        };
        let wire: ThumbnailBatchWire = self
            .post(format!("{}/2/files/get_thumbnail_batch", self.content_url), &arg)
            .await?;
        Ok(wire.entries.into_iter().map(ThumbnailResult::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> DropboxClient {
        DropboxClient::new("test-token".into(), &server.uri(), &server.uri())
    }

    #[tokio::test]
    async fn search_parses_files_and_skips_folders() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/2/files/search_v2"))
            .and(header("authorization", "Bearer test-token"))
            .and(body_partial_json(json!({
                "query": "jpg",
                "options": { "path": "/photos", "max_results": 200, "file_extensions": ["jpg"] }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "matches": [
                    { "match_type": { ".tag": "filename" }, "metadata": { ".tag": "metadata", "metadata": {
                        ".tag": "file", "id": "id:A", "name": "A.jpg", "path_lower": "/photos/a.jpg",
                        "size": 2048, "client_modified": "2023-11-14T22:13:20Z"
                    }}},
                    { "match_type": { ".tag": "filename" }, "metadata": { ".tag": "metadata", "metadata": {
                        ".tag": "folder", "id": "id:F", "name": "jpg stuff", "path_lower": "/photos/jpg stuff"
                    }}}
                ],
                "has_more": true,
                "cursor": "next-page"
            })))
            .mount(&server)
            .await;

        let page = client(&server)
            .search(SearchQuery::Start {
                path: "/photos".into(),
                extension: ".jpg".into(),
            })
            .await
            .unwrap();

        assert_eq!(page.matches.len(), 1);
        let m = &page.matches[0];
        assert_eq!(m.id, "id:A");
        assert_eq!(m.path_lower, "/photos/a.jpg");
        assert_eq!(m.size, 2048);
        assert_eq!(m.client_modified.timestamp_millis(), 1_700_000_000_000);
        assert_eq!(page.cursor.as_deref(), Some("next-page"));
    }

    #[tokio::test]
    async fn search_continue_without_more_drops_cursor() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/2/files/search/continue_v2"))
            .and(body_partial_json(json!({ "cursor": "next-page" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "matches": [], "has_more": false, "cursor": "ignored"
            })))
            .mount(&server)
            .await;

        let page = client(&server)
            .search(SearchQuery::Continue {
                cursor: "next-page".into(),
            })
            .await
            .unwrap();
        assert!(page.matches.is_empty());
        assert_eq!(page.cursor, None);
    }

    #[tokio::test]
    async fn api_errors_carry_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/2/files/search_v2"))
            .respond_with(ResponseTemplate::new(409).set_body_string("path/not_found/"))
            .mount(&server)
            .await;

        let err = client(&server)
            .search(SearchQuery::Start {
                path: "/missing".into(),
                extension: ".png".into(),
            })
            .await
            .unwrap_err();
        match err {
            SyncError::Api { status, body } => {
                assert_eq!(status, 409);
                assert!(body.contains("not_found"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn thumbnail_batch_maps_success_and_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/2/files/get_thumbnail_batch"))
            .and(body_partial_json(json!({
                "entries": [
                    { "path": "/a.jpg", "size": "w480h320", "mode": "strict" },
                    { "path": "/b.jpg", "size": "w480h320", "mode": "strict" }
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "entries": [
                    { ".tag": "success", "thumbnail": "aGVsbG8=", "metadata": {
                        "id": "id:A", "name": "a.jpg", "path_lower": "/a.jpg", "size": 10,
                        "client_modified": "2023-11-14T22:13:20Z",
                        "media_info": { ".tag": "metadata", "metadata": {
                            ".tag": "photo",
                            "dimensions": { "width": 4000, "height": 3000 },
                            "location": { "latitude": 55.67, "longitude": 12.56 },
                            "time_taken": "2023-11-14T22:13:20.500Z"
                        }}
                    }},
                    { ".tag": "failure", "failure": { ".tag": "unsupported_image" } }
                ]
            })))
            .mount(&server)
            .await;

        let results = client(&server)
            .thumbnail_batch(vec!["/a.jpg".into(), "/b.jpg".into()])
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        match &results[0] {
            ThumbnailResult::Success { id, thumbnail, media } => {
                assert_eq!(id, "id:A");
                assert_eq!(thumbnail, "aGVsbG8=");
                let media = media.as_ref().unwrap();
                assert_eq!(media.dimensions, Some((4000, 3000)));
                assert_eq!(media.location, Some((55.67, 12.56)));
                assert_eq!(media.time_taken.unwrap().timestamp_millis(), 1_700_000_000_500);
            }
            ThumbnailResult::Failure => panic!("first entry should succeed"),
        }
        assert_eq!(results[1], ThumbnailResult::Failure);
    }
}
