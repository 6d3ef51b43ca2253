//! In-memory storage used by the pipeline tests

use crate::dropbox::{PhotoMetadata, RemoteStorage, SearchMatch, SearchPage, SearchQuery, ThumbnailResult};
use crate::error::{Result, SyncError};
use chrono::{TimeZone, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

pub fn photo(id: &str, name: &str, millis: i64) -> SearchMatch {
    SearchMatch {
        id: id.to_string(),
        name: name.to_string(),
        path_lower: format!("/{}", name.to_lowercase()),
        size: 1000,
        client_modified: Utc.timestamp_millis_opt(1_700_000_000_000 + millis).unwrap(),
    }
}

pub fn thumbnail_ok(id: &str, payload: &str, width: u32, height: u32) -> ThumbnailResult {
    ThumbnailResult::Success {
        id: id.to_string(),
        thumbnail: payload.to_string(),
        media: Some(PhotoMetadata {
            dimensions: Some((width, height)),
            location: None,
            time_taken: None,
        }),
    }
}

#[derive(Default)]
pub struct FakeStorage {
    matches: HashMap<String, Vec<SearchMatch>>,
    failing: HashSet<String>,
    page_size: Option<usize>,
    thumbnails: HashMap<String, ThumbnailResult>,
    batch_fails: bool,
    searches: Mutex<Vec<SearchQuery>>,
    batches: Mutex<Vec<Vec<String>>>,
}

impl FakeStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_matches(mut self, ext: &str, matches: Vec<SearchMatch>) -> Self {
        self.matches.insert(ext.to_string(), matches);
        self
    }

    pub fn with_page_size(mut self, size: usize) -> Self {
        self.page_size = Some(size);
        self
    }

    pub fn failing_search(mut self, ext: &str) -> Self {
        self.failing.insert(ext.to_string());
        self
    }

    /// Keyed by remote path; unknown paths come back as failures
    pub fn with_thumbnail(mut self, path: &str, result: ThumbnailResult) -> Self {
        self.thumbnails.insert(path.to_string(), result);
        self
    }

    pub fn failing_batch(mut self) -> Self {
        self.batch_fails = true;
        self
    }

    pub fn search_calls(&self) -> usize {
        self.searches.lock().unwrap().len()
    }

    pub fn searched_paths(&self) -> Vec<String> {
        self.searches
            .lock()
            .unwrap()
            .iter()
            .filter_map(|q| match q {
                SearchQuery::Start { path, .. } => Some(path.clone()),
                SearchQuery::Continue { .. } => None,
            })
            .collect()
    }

    pub fn batch_requests(&self) -> Vec<Vec<String>> {
        self.batches.lock().unwrap().clone()
    }

    fn page(&self, ext: &str, offset: usize) -> Result<SearchPage> {
        if self.failing.contains(ext) {
            return Err(SyncError::Api {
                status: 409,
                body: "path/not_found/".into(),
            });
        }
        let all = self.matches.get(ext).cloned().unwrap_or_default();
        let size = self.page_size.unwrap_or(all.len().max(1));
        let end = (offset + size).min(all.len());
        let matches = all.get(offset..end).map(<[_]>::to_vec).unwrap_or_default();
        let cursor = (end < all.len()).then(|| format!("{ext}|{end}"));
        Ok(SearchPage { matches, cursor })
    }
}

impl RemoteStorage for FakeStorage {
    async fn search(&self, query: SearchQuery) -> Result<SearchPage> {
        self.searches.lock().unwrap().push(query.clone());
        match query {
            SearchQuery::Start { extension, .. } => self.page(&extension, 0),
            SearchQuery::Continue { cursor } => {
                let (ext, offset) = cursor.split_once('|').expect("fake cursor");
                self.page(ext, offset.parse().expect("fake offset"))
            }
        }
    }

    async fn thumbnail_batch(&self, paths: Vec<String>) -> Result<Vec<ThumbnailResult>> {
        self.batches.lock().unwrap().push(paths.clone());
        if self.batch_fails {
            return Err(SyncError::Api {
                status: 500,
                body: "internal".into(),
            });
        }
        Ok(paths
            .iter()
            .map(|p| self.thumbnails.get(p).cloned().unwrap_or(ThumbnailResult::Failure))
            .collect())
    }
}
