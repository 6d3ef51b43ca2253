//! Justified photo rows.
//!
//! Thumbnails arrive strict-fit inside 480x320, so a portrait photo is usually
//! 240x320. That ratio is the reference: from the container width we derive the
//! height at which exactly N, N+1 or N-1 reference images fill a row. Each
//! candidate height is tried against the actual images, the one whose row
//! width lands closest to the container wins, and its height is then trimmed
//! so the row fits exactly.

use crate::constants::{REFERENCE_HEIGHT, REFERENCE_WIDTH};
use crate::types::FileRecord;

/// Slack for float noise before flooring or ceiling a pixel value
const PIXEL_EPSILON: f64 = 1e-9;

fn floor_px(v: f64) -> f64 {
    (v + PIXEL_EPSILON).floor()
}

fn ceil_px(v: f64) -> f64 {
    (v - PIXEL_EPSILON).ceil()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutParams {
    /// Nominal images per row
    pub images_per_row: usize,
    /// Margin on every side of an image; neighbours are 2x apart
    pub margin: u32,
    pub container_width: u32,
}

/// Images-per-row density a row was laid out with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowModel {
    Base,
    Plus,
    Minus,
}

const MODELS: [RowModel; 3] = [RowModel::Base, RowModel::Plus, RowModel::Minus];

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedImage<'a> {
    pub file: &'a FileRecord,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderRow<'a> {
    pub index: usize,
    pub images: Vec<RenderedImage<'a>>,
    pub height: u32,
    pub model: RowModel,
    /// Row spans the full container width
    pub full: bool,
    /// Source files used up by this row, shown and skipped
    pub consumed: usize,
    /// Files without dimensions passed over within `consumed`
    pub skipped: usize,
}

impl RenderRow<'_> {
    /// Rendered width including the margins between images
    pub fn width(&self, margin: u32) -> u32 {
        let gaps = self.images.len().saturating_sub(1) as u32 * margin * 2;
        self.images.iter().map(|i| i.width).sum::<u32>() + gaps
    }
}

/// Height at which `count` reference images exactly fill `width`
fn candidate_height(count: usize, margin: f64, width: f64) -> f64 {
    let image_width = (width - margin * 2.0 * (count as f64 - 1.0)) / count as f64;
    image_width * REFERENCE_HEIGHT / REFERENCE_WIDTH
}

/// Make image widths sum to `target`, starting from the last image.
///
/// Every image keeps at least one pixel, so a correction larger than the
/// last image spills over to the ones before it.
fn absorb_rounding(images: &mut [RenderedImage<'_>], target: i64) {
    let mut excess = images.iter().map(|i| i.width as i64).sum::<i64>() - target;
    for image in images.iter_mut().rev() {
        if excess == 0 {
            break;
        }
        let width = image.width as i64;
        let adjusted = (width - excess).max(1);
        excess -= width - adjusted;
        image.width = adjusted as u32;
    }
}

struct Walked<'a> {
    file: &'a FileRecord,
    /// Position relative to the row's start offset
    pos: usize,
    scaled: [f64; 3],
    fits: [bool; 3],
}

/// Lay out one row from `files[start..]`.
///
/// Returns `None` once `start` is past the end or nothing displayable is left.
/// The next row should start at `start + row.consumed`.
pub fn layout_row<'a>(
    files: &[&'a FileRecord],
    start: usize,
    index: usize,
    params: &LayoutParams,
) -> Option<RenderRow<'a>> {
    if start >= files.len() {
        return None;
    }

    let n = params.images_per_row.max(1);
    let counts = [n, n + 1, if n > 1 { n - 1 } else { 1 }];
    let margin = params.margin as f64;
    let width = params.container_width as f64;
    let heights = counts.map(|c| candidate_height(c, margin, width));

    // Outer margins are absorbed by the container
    let mut totals = [-2.0 * margin; 3];
    let mut walked: Vec<Walked<'a>> = Vec::new();

    for (pos, &file) in files[start..].iter().enumerate() {
        if file.width == 0 || file.height == 0 {
            continue;
        }
        let (fw, fh) = (file.width as f64, file.height as f64);
        let mut scaled = [0.0; 3];
        let mut fits = [false; 3];
        for k in 0..3 {
            scaled[k] = floor_px(fw * heights[k] / fh);
            totals[k] += scaled[k] + 2.0 * margin;
            // Fits when the row was still short of the container before this image
            fits[k] = totals[k] <= width + scaled[k] + 2.0 * margin;
        }
        walked.push(Walked {
            file,
            pos,
            scaled,
            fits,
        });

        if totals.iter().all(|&t| t > width) {
            break;
        }
    }

    if walked.is_empty() {
        return None;
    }

    // Closest to the container wins; ties go to base, then plus
    let mut chosen = 0;
    for k in 1..3 {
        if (totals[k] - width).abs() < (totals[chosen] - width).abs() {
            chosen = k;
        }
    }

    let shown: Vec<&Walked<'a>> = walked.iter().filter(|w| w.fits[chosen]).collect();
    let margin_total = shown.len().saturating_sub(1) as f64 * 2.0 * margin;
    let shown_total = shown.iter().map(|w| w.scaled[chosen]).sum::<f64>() + margin_total;

    let mut full = totals[chosen] >= width;
    let mut height = heights[chosen];
    if shown_total > width {
        height *= (width - margin_total) / (shown_total - margin_total);
    }
    let height = floor_px(height).max(1.0);

    let mut images: Vec<RenderedImage<'a>> = shown
        .iter()
        .map(|w| RenderedImage {
            file: w.file,
            width: ceil_px(w.file.width as f64 * height / w.file.height as f64).max(1.0) as u32,
            height: height as u32,
        })
        .collect();

    // Ceiling each width can push even a short row to the container edge;
    // such a row counts as full
    let rendered: u32 = images.iter().map(|i| i.width).sum::<u32>() + margin_total as u32;
    if rendered >= params.container_width {
        full = true;
    }
    if full {
        absorb_rounding(&mut images, params.container_width as i64 - margin_total as i64);
    }

    let consumed = shown.last().map_or(0, |w| w.pos + 1);
    let skipped = consumed - shown.len();

    Some(RenderRow {
        index,
        images,
        height: height as u32,
        model: MODELS[chosen],
        full,
        consumed,
        skipped,
    })
}
