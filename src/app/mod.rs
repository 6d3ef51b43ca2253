//! App module - window state fed by the sync scheduler

mod thumbnails;
mod views;

use crate::dropbox::DropboxClient;
use crate::error::Result;
use crate::settings::Settings;
use crate::sync::Scheduler;
use crate::types::*;
use eframe::egui;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

// ============================================================================
// APP STATE
// ============================================================================

pub struct App {
    pub(crate) settings: Settings,
    pub(crate) data_dir: PathBuf,
    pub(crate) cache_dir: PathBuf,
    pub(crate) runtime: tokio::runtime::Runtime,
    pub(crate) cancel_token: CancellationToken,
    // Channels to the scheduler; None when sync could not start
    pub(crate) events: Option<mpsc::UnboundedReceiver<SyncEvent>>,
    pub(crate) commands: Option<mpsc::UnboundedSender<SyncCommand>>,
    // Latest snapshot from the scheduler
    pub(crate) files: Vec<FileRecord>,
    pub(crate) error_message: Option<String>,
    /// Shuffle seed of the current arrangement
    pub(crate) seed: u64,
    // Textures keyed by file name; None when the cache file would not decode
    pub(crate) thumbnail_cache: HashMap<String, Option<egui::TextureHandle>>,
    pub(crate) window_size: Option<egui::Vec2>,
    pub(crate) fullscreen: bool,
}

// ============================================================================
// APP INITIALIZATION & HELPERS
// ============================================================================

impl App {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        runtime: tokio::runtime::Runtime,
        settings: Settings,
        data_dir: PathBuf,
        access_token: Result<String>,
    ) -> Self {
        cc.egui_ctx.set_theme(egui::Theme::Dark);

        let cache_dir = settings.cache_dir_or_default(&data_dir);
        let fullscreen = settings.fullscreen;

        let mut app = Self {
            settings,
            data_dir,
            cache_dir,
            runtime,
            cancel_token: CancellationToken::new(),
            events: None,
            commands: None,
            files: Vec::new(),
            error_message: None,
            seed: fastrand::u64(..),
            thumbnail_cache: HashMap::new(),
            window_size: None,
            fullscreen,
        };

        match access_token {
            Ok(token) => app.start_sync(token),
            Err(e) => {
                error!(error = %e, "Sync not started");
                app.error_message = Some(e.to_string());
            }
        }
        app
    }

    fn start_sync(&mut self, token: String) {
        let client = DropboxClient::new(
            token,
            &self.settings.api_base_url,
            &self.settings.content_base_url,
        );
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        let scheduler = Scheduler::new(client, self.settings.clone(), self.cache_dir.clone(), event_tx);
        self.runtime
            .spawn(scheduler.run(command_rx, self.cancel_token.clone()));

        info!(cache = %self.cache_dir.display(), "Sync started");
        self.events = Some(event_rx);
        self.commands = Some(command_tx);
    }

    /// Drain scheduler events without blocking the frame
    pub fn poll_events(&mut self) {
        let Some(events) = self.events.as_mut() else {
            return;
        };

        let mut latest = None;
        while let Ok(event) = events.try_recv() {
            match event {
                SyncEvent::Files(files) => latest = Some(files),
                SyncEvent::Error(message) => {
                    warn!(message = %message, "Sync reported an error");
                    latest = None;
                    self.files.clear();
                    self.error_message = Some(message);
                }
            }
        }

        if let Some(files) = latest {
            let saved = files.iter().filter(|f| f.saved).count();
            debug!(received = files.len(), saved, "New file list");
            self.files = files;
            self.error_message = None;
            self.seed = fastrand::u64(..);
            self.prune_thumbnails();
        }
    }

    /// Ask the scheduler for an immediate index refresh
    pub fn request_refresh(&self) {
        let Some(commands) = &self.commands else {
            return;
        };
        if commands.send(SyncCommand::Refresh).is_err() {
            warn!("Scheduler is gone, refresh ignored");
        }
    }

    pub fn save_settings(&self) {
        let settings = Settings {
            window_w: self.window_size.map(|s| s.x),
            window_h: self.window_size.map(|s| s.y),
            fullscreen: self.fullscreen,
            ..self.settings.clone()
        };
        settings.save(&self.data_dir);
    }
}
