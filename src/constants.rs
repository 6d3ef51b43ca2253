//! Application constants and configuration

pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const APP_NAME: &str = "Dropbox Photo Grid";

pub const DROPBOX_API_URL: &str = "https://api.dropboxapi.com";
pub const DROPBOX_CONTENT_URL: &str = "https://content.dropboxapi.com";

/// Extensions searched for when none are configured
pub const DEFAULT_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".gif"];

/// Matches requested per search page (per extension)
pub const SEARCH_PAGE_SIZE: u64 = 200;
/// New files accepted per index refresh, across all extensions
pub const MAX_NEW_FILES: usize = 200;
/// Thumbnails requested per batch and files written per save pass
pub const BATCH_SIZE: usize = 25;

/// Thumbnail box requested from Dropbox; strict mode keeps both axes within it
pub const THUMBNAIL_SIZE: &str = "w480h320";
pub const THUMBNAIL_MODE: &str = "strict";
pub const THUMBNAIL_FORMAT: &str = "jpeg";

/// Reference portrait thumbnail (240 x 320) used to derive row heights
pub const REFERENCE_WIDTH: f64 = 240.0;
pub const REFERENCE_HEIGHT: f64 = 320.0;

pub const CACHE_DIR_NAME: &str = "image_cache";
pub const CREDENTIALS_FILE: &str = "credentials.json";
pub const SETTINGS_FILE: &str = "settings.json";

pub const EMPTY_FOLDER_MESSAGE: &str =
    "The Dropbox folder you chose doesn't exist or is empty. Please try a different one.";
