//! Fill the configured number of rows in newest, random or hybrid order

use crate::layout::{layout_row, LayoutParams, RenderRow};
use crate::settings::RowType;
use crate::types::FileRecord;
use std::ops::Range;

/// Saved files, newest first
pub fn display_order(files: &[FileRecord]) -> Vec<&FileRecord> {
    let mut saved: Vec<&FileRecord> = files.iter().filter(|f| f.saved).collect();
    saved.sort_by(|a, b| b.time_taken.cmp(&a.time_taken));
    saved
}

fn fill_rows<'a>(files: &[&'a FileRecord], rows: Range<usize>, params: &LayoutParams) -> Vec<RenderRow<'a>> {
    let mut offset = 0;
    let mut out = Vec::new();
    for index in rows {
        let Some(row) = layout_row(files, offset, index, params) else {
            break;
        };
        offset += row.consumed;
        out.push(row);
    }
    out
}

/// Lay out up to `rows` rows from `files` (already newest first).
///
/// `seed` drives the shuffles so the same arrangement can be rebuilt, e.g.
/// after the window is resized.
pub fn arrange<'a>(
    files: &[&'a FileRecord],
    params: &LayoutParams,
    rows: usize,
    row_type: RowType,
    seed: u64,
) -> Vec<RenderRow<'a>> {
    let rows = rows.max(1);
    let mut rng = fastrand::Rng::with_seed(seed);

    match row_type {
        RowType::Newest => fill_rows(files, 0..rows, params),
        RowType::Random => {
            let mut pool = files.to_vec();
            rng.shuffle(&mut pool);
            fill_rows(&pool, 0..rows, params)
        }
        RowType::Hybrid => {
            let Some(first) = layout_row(files, 0, 0, params) else {
                return Vec::new();
            };
            // Everything after the first row, shuffled once, serves the rest
            let mut pool = files[first.consumed..].to_vec();
            rng.shuffle(&mut pool);
            let mut out = vec![first];
            out.extend(fill_rows(&pool, 1..rows, params));
            out
        }
    }
}
