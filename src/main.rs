#![windows_subsystem = "windows"]
//! Dropbox Photo Grid - Main entry point

use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

mod app;
mod constants;
mod credentials;
mod dropbox;
mod error;
mod gallery;
mod layout;
mod settings;
mod sync;
mod types;
mod utils;

use app::App;
use constants::*;
use eframe::egui;
use settings::Settings;
use std::time::Duration;
use tracing::{error, info};
use utils::get_data_dir;

/// Initialize file logging. Returns a guard that must be held for the app lifetime.
fn init_logging(data_dir: &std::path::Path) -> tracing_appender::non_blocking::WorkerGuard {
    use tracing_subscriber::{fmt, EnvFilter, prelude::*};

    let logs_dir = data_dir.join("logs");
    std::fs::create_dir_all(&logs_dir).ok();

    let file_appender = tracing_appender::rolling::daily(&logs_dir, "dropbox-photo-grid.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,dropbox_photo_grid=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(true)
                .with_line_number(true),
        )
        .init();

    guard
}

fn main() -> eframe::Result<()> {
    let data_dir = get_data_dir();
    std::fs::create_dir_all(&data_dir).ok();

    // Initialize logging - guard must live for entire app lifetime
    let _log_guard = init_logging(&data_dir);

    info!(version = APP_VERSION, "Dropbox Photo Grid starting");

    let settings = Settings::load(&data_dir);

    let runtime = tokio::runtime::Runtime::new().map_err(|e| {
        error!(error = %e, "Failed to start async runtime");
        eframe::Error::AppCreation(Box::new(e))
    })?;

    // A bad config or missing token still opens the window, showing the error
    let access_token = settings
        .validate()
        .and_then(|_| runtime.block_on(credentials::resolve_access_token(&settings, &data_dir)));

    let win_size = match (settings.window_w, settings.window_h) {
        (Some(w), Some(h)) => egui::vec2(w, h),
        _ => egui::vec2(1280.0, 800.0),
    };

    let viewport = egui::ViewportBuilder::default()
        .with_inner_size(win_size)
        .with_fullscreen(settings.fullscreen)
        .with_title(APP_NAME);

    let options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };

    eframe::run_native(
        APP_NAME,
        options,
        Box::new(move |cc| Ok(Box::new(App::new(cc, runtime, settings, data_dir, access_token)))),
    )
}

// ============================================================================
// EFRAME APP IMPLEMENTATION
// ============================================================================

impl eframe::App for App {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Track window size for saving on exit
        ctx.input(|i| {
            if let Some(rect) = i.viewport().inner_rect {
                self.window_size = Some(rect.size());
            }
        });

        self.poll_events();

        let (refresh, toggle_fullscreen) =
            ctx.input(|i| (i.key_pressed(egui::Key::R), i.key_pressed(egui::Key::F11)));
        if refresh {
            info!("Manual refresh");
            self.request_refresh();
        }
        if toggle_fullscreen {
            self.fullscreen = !self.fullscreen;
            ctx.send_viewport_cmd(egui::ViewportCommand::Fullscreen(self.fullscreen));
        }

        egui::CentralPanel::default()
            .frame(egui::Frame::new().fill(egui::Color32::BLACK))
            .show(ctx, |ui| {
                if self.error_message.is_none() && self.has_displayable_files() {
                    self.render_grid(ui);
                } else {
                    self.render_status(ui);
                }
            });

        // Scheduler events arrive off the UI thread; poll for them
        ctx.request_repaint_after(Duration::from_secs(1));
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        info!("Application shutting down");
        self.cancel_token.cancel();
        self.save_settings();
    }
}
