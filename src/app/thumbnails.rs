//! Thumbnail texture loading from the local cache

use super::App;
use crate::sync::cache_file_path;
use eframe::egui;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, warn};

fn decode_thumbnail(path: &Path) -> image::ImageResult<egui::ColorImage> {
    let rgba = image::open(path)?.to_rgba8();
    let size = [rgba.width() as usize, rgba.height() as usize];
    let pixels = rgba.into_raw();
    Ok(egui::ColorImage::from_rgba_unmultiplied(size, &pixels))
}

impl App {
    pub fn load_thumbnail(
        &mut self,
        ctx: &egui::Context,
        name: &str,
    ) -> Option<egui::TextureHandle> {
        if let Some(cached) = self.thumbnail_cache.get(name) {
            return cached.clone();
        }

        let path = cache_file_path(&self.cache_dir, name)?;
        let texture = match decode_thumbnail(&path) {
            Ok(image) => Some(ctx.load_texture(name, image, egui::TextureOptions::LINEAR)),
            Err(e) => {
                warn!(error = %e, path = %path.display(), "Failed to load thumbnail");
                None
            }
        };
        self.thumbnail_cache
            .insert(name.to_string(), texture.clone());
        texture
    }

    /// Drop textures of files no longer in the snapshot
    pub fn prune_thumbnails(&mut self) {
        let names: HashSet<&str> = self.files.iter().map(|f| f.name.as_str()).collect();
        let before = self.thumbnail_cache.len();
        self.thumbnail_cache
            .retain(|name, _| names.contains(name.as_str()));
        let dropped = before - self.thumbnail_cache.len();
        if dropped > 0 {
            debug!(dropped, "Pruned thumbnail textures");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_cached_image_to_texture_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.png");
        image::RgbaImage::new(3, 4).save(&path).unwrap();

        let decoded = decode_thumbnail(&path).unwrap();
        assert_eq!(decoded.size, [3, 4]);
    }

    #[test]
    fn garbage_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.jpg");
        std::fs::write(&path, b"AAA").unwrap();

        assert!(decode_thumbnail(&path).is_err());
        assert!(decode_thumbnail(&dir.path().join("missing.jpg")).is_err());
    }
}
