//! Sync pipeline: index refresh, thumbnail fetch, cache write, notify

mod cache;
#[cfg(test)]
mod fake;
mod files;
mod index;
mod thumbnails;

pub use cache::cache_file_path;
use cache::ThumbnailCache;
use files::FileSet;
use index::discover;
use thumbnails::fetch_thumbnails;

use crate::constants::*;
use crate::dropbox::RemoteStorage;
use crate::error::Result;
use crate::settings::Settings;
use crate::types::{SyncCommand, SyncEvent};
use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// What the pipeline is doing right now
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Indexing,
    FetchingThumbnails,
    Saving,
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

/// Owns the file set and drives the pipeline on two timers.
///
/// The slow timer rebuilds the index from scratch; the fast timer re-runs
/// fetch and save for files already known. Re-arming a timer replaces its
/// previous deadline, so cycles never overlap.
pub struct Scheduler<S: RemoteStorage> {
    storage: S,
    settings: Settings,
    cache: ThumbnailCache,
    files: FileSet,
    stage: Stage,
    events: mpsc::UnboundedSender<SyncEvent>,
    refresh_at: Option<Instant>,
    update_at: Option<Instant>,
}

impl<S: RemoteStorage> Scheduler<S> {
    pub fn new(
        storage: S,
        settings: Settings,
        cache_dir: PathBuf,
        events: mpsc::UnboundedSender<SyncEvent>,
    ) -> Self {
        Self {
            storage,
            settings,
            cache: ThumbnailCache::new(cache_dir),
            files: FileSet::new(),
            stage: Stage::Idle,
            events,
            refresh_at: None,
            update_at: None,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn files(&self) -> &FileSet {
        &self.files
    }

    fn emit(&self, event: SyncEvent) {
        if self.events.send(event).is_err() {
            debug!("Display channel closed, dropping event");
        }
    }

    /// Run until cancelled. The first index refresh starts after the
    /// configured startup delay.
    pub async fn run(mut self, mut commands: mpsc::UnboundedReceiver<SyncCommand>, cancel: CancellationToken) {
        info!(
            delay_secs = self.settings.initial_load_delay_secs,
            folder = %self.settings.folder_path(),
            "Sync scheduler started"
        );
        self.refresh_at = Some(Instant::now() + self.settings.initial_load_delay());

        loop {
            let result = tokio::select! {
                _ = cancel.cancelled() => break,
                command = commands.recv() => match command {
                    Some(SyncCommand::Refresh) => {
                        info!("Refresh requested");
                        self.run_refresh().await
                    }
                    None => break,
                },
                _ = sleep_until(self.refresh_at) => self.run_refresh().await,
                _ = sleep_until(self.update_at) => self.run_update().await,
            };

            if let Err(e) = result {
                error!(error = %e, stage = ?self.stage, "Sync cycle failed");
                self.stage = Stage::Idle;
                if self.update_at.is_none() && !self.files.is_empty() {
                    self.update_at = Some(Instant::now() + self.settings.update_interval());
                }
            }
        }

        info!("Sync scheduler stopped");
    }

    /// Slow path: forget every file, search the folder again, then update.
    pub async fn run_refresh(&mut self) -> Result<()> {
        self.refresh_at = None;
        self.update_at = None;
        self.stage = Stage::Indexing;
        self.files.clear();

        let folder = self.settings.folder_path();
        let outcome = discover(
            &self.storage,
            &mut self.files,
            &folder,
            &self.settings.extensions,
            MAX_NEW_FILES,
        )
        .await;
        self.refresh_at = Some(Instant::now() + self.settings.refresh_interval());

        if outcome.is_empty() {
            warn!(folder = %folder, failed = outcome.failed_searches, "No photos found");
            self.stage = Stage::Idle;
            self.emit(SyncEvent::Error(EMPTY_FOLDER_MESSAGE.to_string()));
            return Ok(());
        }

        self.run_update().await
    }

    /// Fast path: sort, fetch pending thumbnails, save, notify.
    pub async fn run_update(&mut self) -> Result<()> {
        self.update_at = None;

        if self.files.is_empty() {
            self.stage = Stage::Idle;
            self.emit(SyncEvent::Error(EMPTY_FOLDER_MESSAGE.to_string()));
            return Ok(());
        }

        self.files.sort_newest_first();

        self.stage = Stage::FetchingThumbnails;
        fetch_thumbnails(&self.storage, &mut self.files, BATCH_SIZE).await;

        self.stage = Stage::Saving;
        self.cache.save_pending(&mut self.files, BATCH_SIZE).await?;

        self.stage = Stage::Idle;
        self.emit(SyncEvent::Files(self.files.snapshot()));
        self.update_at = Some(Instant::now() + self.settings.update_interval());
        debug!(files = self.files.len(), version = self.files.version(), "Files sent to display");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::fake::{photo, thumbnail_ok, FakeStorage};
    use super::*;
    use crate::types::FileRecord;
    use std::time::Duration;

    fn scenario_storage() -> FakeStorage {
        FakeStorage::new()
            .with_matches(".jpg", vec![photo("A", "a.jpg", 3), photo("B", "b.jpg", 2), photo("C", "c.jpg", 1)])
            .with_thumbnail("/a.jpg", thumbnail_ok("A", "QUFB", 240, 320))
            .with_thumbnail("/b.jpg", thumbnail_ok("B", "QkJC", 320, 240))
    }

    fn find<'a>(files: &'a [FileRecord], id: &str) -> &'a FileRecord {
        files.iter().find(|f| f.id == id).unwrap()
    }

    #[tokio::test]
    async fn refresh_runs_whole_pipeline_and_notifies() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut scheduler = Scheduler::new(scenario_storage(), Settings::default(), dir.path().to_path_buf(), tx);

        scheduler.run_refresh().await.unwrap();

        assert_eq!(scheduler.stage(), Stage::Idle);
        let Some(SyncEvent::Files(files)) = rx.recv().await else {
            panic!("expected a file list");
        };
        assert_eq!(files.len(), 3);

        for (id, name, bytes) in [("A", "a.jpg", b"AAA"), ("B", "b.jpg", b"BBB")] {
            let f = find(&files, id);
            assert!(f.saved && f.loaded && !f.error);
            assert_eq!(f.thumbnail, None);
            assert_eq!(std::fs::read(dir.path().join(name)).unwrap(), bytes);
        }
        let c = find(&files, "C");
        assert!(!c.saved && !c.loaded && c.error);
        assert!(!dir.path().join("c.jpg").exists());

        // C is never requested again
        scheduler.run_update().await.unwrap();
        assert_eq!(scheduler.storage.batch_requests().len(), 1);
    }

    #[tokio::test]
    async fn empty_folder_reports_error_once() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let storage = FakeStorage::new().failing_search(".jpg");
        let mut scheduler = Scheduler::new(storage, Settings::default(), dir.path().to_path_buf(), tx);

        scheduler.run_refresh().await.unwrap();

        match rx.try_recv() {
            Ok(SyncEvent::Error(msg)) => assert_eq!(msg, EMPTY_FOLDER_MESSAGE),
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(rx.try_recv().is_err());
        assert!(scheduler.refresh_at.is_some());
        assert!(scheduler.update_at.is_none());
        assert!(scheduler.storage.batch_requests().is_empty());
    }

    #[tokio::test]
    async fn refresh_rebuilds_the_set() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut scheduler = Scheduler::new(scenario_storage(), Settings::default(), dir.path().to_path_buf(), tx);

        scheduler.run_refresh().await.unwrap();
        scheduler.run_refresh().await.unwrap();

        assert_eq!(scheduler.files().len(), 3);
        // Rediscovered files are fetched again, but their cache files are kept
        assert_eq!(scheduler.storage.batch_requests().len(), 2);
        assert!(scheduler.files().iter().filter(|f| f.id != "C").all(|f| f.saved));
    }

    #[tokio::test]
    async fn unwritable_file_does_not_stop_notification() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let long_name = format!("{}.jpg", "l".repeat(300));
        let long_path = format!("/{long_name}");
        let storage = FakeStorage::new()
            .with_matches(".jpg", vec![photo("A", "a.jpg", 2), photo("L", &long_name, 1)])
            .with_thumbnail("/a.jpg", thumbnail_ok("A", "QUFB", 240, 320))
            .with_thumbnail(&long_path, thumbnail_ok("L", "QUFB", 240, 320));
        let mut scheduler = Scheduler::new(storage, Settings::default(), dir.path().to_path_buf(), tx);

        scheduler.run_refresh().await.unwrap();

        let Some(SyncEvent::Files(files)) = rx.recv().await else {
            panic!("expected a file list");
        };
        assert!(find(&files, "A").saved);
        let long = find(&files, "L");
        assert!(long.error && !long.saved);
        assert_eq!(scheduler.stage(), Stage::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn timers_drive_updates_and_refreshes() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let settings = Settings {
            update_interval_secs: 60,
            refresh_interval_secs: 3600,
            initial_load_delay_secs: 5,
            ..Settings::default()
        };
        let scheduler = Scheduler::new(scenario_storage(), settings, dir.path().to_path_buf(), tx);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(scheduler.run(cmd_rx, cancel.clone()));

        let start = Instant::now();
        assert!(matches!(rx.recv().await, Some(SyncEvent::Files(_))));
        assert!(start.elapsed() >= Duration::from_secs(5));

        // Fast tick
        assert!(matches!(rx.recv().await, Some(SyncEvent::Files(_))));
        assert!(start.elapsed() >= Duration::from_secs(65));

        // A manual refresh re-arms both timers
        cmd_tx.send(SyncCommand::Refresh).unwrap();
        assert!(matches!(rx.recv().await, Some(SyncEvent::Files(_))));

        cancel.cancel();
        handle.await.unwrap();
    }
}
