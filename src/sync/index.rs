//! Remote index: discover new photos by filename extension

use super::files::FileSet;
use crate::dropbox::{RemoteStorage, SearchPage, SearchQuery};
use crate::error::Result;
use crate::types::FileRecord;
use futures::stream::{FuturesUnordered, StreamExt};
use tracing::{debug, info, warn};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IndexOutcome {
    /// Records newly appended to the set
    pub added: usize,
    /// Search pages that failed
    pub failed_searches: usize,
    /// Stopped early because the cap was reached
    pub capped: bool,
}

impl IndexOutcome {
    /// Nothing new was found: the folder is empty, missing or unreachable
    pub fn is_empty(&self) -> bool {
        self.added == 0
    }
}

async fn search_page<S: RemoteStorage>(
    storage: &S,
    extension: String,
    query: SearchQuery,
) -> (String, Result<SearchPage>) {
    let result = storage.search(query).await;
    (extension, result)
}

/// Search `folder` once per extension and append unseen files to `files`.
///
/// Searches run concurrently and are merged as they complete. The cap is
/// checked before every append, so at most `cap` records are added no matter
/// how the searches interleave. Follow-up pages are requested while the cap
/// has room.
pub async fn discover<S: RemoteStorage>(
    storage: &S,
    files: &mut FileSet,
    folder: &str,
    extensions: &[String],
    cap: usize,
) -> IndexOutcome {
    let mut outcome = IndexOutcome::default();
    let mut pending = FuturesUnordered::new();

    for ext in extensions.iter().map(|e| e.trim()).filter(|e| !e.is_empty()) {
        let query = SearchQuery::Start {
            path: folder.to_string(),
            extension: ext.to_string(),
        };
        pending.push(search_page(storage, ext.to_string(), query));
    }

    while let Some((ext, result)) = pending.next().await {
        let page = match result {
            Ok(page) => page,
            Err(e) => {
                warn!(extension = %ext, error = %e, "Search failed");
                outcome.failed_searches += 1;
                continue;
            }
        };

        debug!(extension = %ext, matches = page.matches.len(), more = page.cursor.is_some(), "Search page received");

        for m in page.matches {
            if outcome.added >= cap {
                break;
            }
            if files.contains(&m.id) {
                continue;
            }
            let record = FileRecord::new(m.id, m.name, m.path_lower, m.size, &m.client_modified);
            if files.insert(record) {
                outcome.added += 1;
            }
        }

        if outcome.added >= cap {
            outcome.capped = true;
            break;
        }

        if let Some(cursor) = page.cursor {
            pending.push(search_page(storage, ext, SearchQuery::Continue { cursor }));
        }
    }

    info!(
        added = outcome.added,
        failed = outcome.failed_searches,
        capped = outcome.capped,
        total = files.len(),
        "Index search complete"
    );
    outcome
}
