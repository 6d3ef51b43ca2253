//! Batch thumbnail and metadata retrieval

use super::files::FileSet;
use crate::dropbox::{PhotoMetadata, RemoteStorage, ThumbnailResult};
use crate::types::{FileRecord, TimeTaken};
use tracing::{debug, info, warn};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FetchOutcome {
    pub requested: usize,
    pub loaded: usize,
    pub failed: usize,
}

fn apply_metadata(file: &mut FileRecord, media: &PhotoMetadata) {
    if let Some((width, height)) = media.dimensions {
        file.width = width;
        file.height = height;
    }
    if let Some((latitude, longitude)) = media.location {
        file.latitude = latitude;
        file.longitude = longitude;
    }
    if let Some(taken) = &media.time_taken {
        file.time_taken = TimeTaken::from_datetime(taken);
    }
}

/// Request thumbnails for up to `batch_size` files that are neither loaded
/// nor failed.
///
/// A failed entry marks its file as errored so it is never requested again.
/// A failed request leaves every file untouched.
pub async fn fetch_thumbnails<S: RemoteStorage>(
    storage: &S,
    files: &mut FileSet,
    batch_size: usize,
) -> FetchOutcome {
    let batch: Vec<(String, String)> = files
        .iter()
        .filter(|f| !f.loaded && !f.error)
        .take(batch_size)
        .map(|f| (f.id.clone(), f.path.clone()))
        .collect();

    let mut outcome = FetchOutcome {
        requested: batch.len(),
        ..Default::default()
    };

    if batch.is_empty() {
        debug!("No thumbnails to fetch");
        return outcome;
    }

    let paths = batch.iter().map(|(_, path)| path.clone()).collect();
    let results = match storage.thumbnail_batch(paths).await {
        Ok(results) => results,
        Err(e) => {
            warn!(error = %e, count = batch.len(), "Thumbnail batch failed");
            return outcome;
        }
    };

    for (i, result) in results.into_iter().enumerate() {
        match result {
            ThumbnailResult::Success { id, thumbnail, media } => {
                let Some(file) = files.get_mut(&id) else {
                    debug!(id = %id, "Thumbnail for unknown file");
                    continue;
                };
                file.loaded = true;
                file.thumbnail = Some(thumbnail);
                if let Some(media) = &media {
                    apply_metadata(file, media);
                }
                outcome.loaded += 1;
            }
            ThumbnailResult::Failure => {
                let Some(file) = batch.get(i).and_then(|(id, _)| files.get_mut(id)) else {
                    continue;
                };
                debug!(name = %file.name, "Thumbnail unavailable, excluding file");
                file.exclude();
                outcome.failed += 1;
            }
        }
    }

    info!(
        requested = outcome.requested,
        loaded = outcome.loaded,
        failed = outcome.failed,
        "Thumbnails fetched"
    );
    outcome
}
