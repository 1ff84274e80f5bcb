//! Spatial grid lookup: point → cell, cell → segment-id window.

use crate::chunk::Chunk;
use crate::geo::{to_local_meters, LatLon};

/// Pack a clamped `(x, y)` cell coordinate into the 32-bit cell id:
/// `(x << 16) | y`.
pub fn cell_id(x: u16, y: u16) -> u32 {
    ((x as u32) << 16) | (y as u32)
}

/// The `(cx, cy)` cell a query point falls into, clamped to the chunk's grid.
pub fn cell_for_point(chunk: &Chunk, q: LatLon) -> (u16, u16) {
    let origin = chunk.origin();
    let (dx, dy) = to_local_meters(origin, q);
    let cell_size = chunk.cell_size_meters as f64;

    let cx = (dx / cell_size).floor();
    let cy = (dy / cell_size).floor();

    let max_x = chunk.grid_width.saturating_sub(1);
    let max_y = chunk.grid_height.saturating_sub(1);

    let cx = clamp_to_u16(cx, max_x);
    let cy = clamp_to_u16(cy, max_y);
    (cx, cy)
}

fn clamp_to_u16(v: f64, max: u16) -> u16 {
    if v < 0.0 {
        0
    } else if v >= max as f64 {
        max
    } else {
        v as u16
    }
}

/// Binary search `chunk.cellEntries` for a cell id; returns the
/// `(segStart, segCount)` window if present.
pub fn lookup_cell(chunk: &Chunk, id: u32) -> Option<(u32, u16)> {
    chunk
        .cell_entries
        .binary_search_by_key(&id, |e| e.cell_id)
        .ok()
        .map(|idx| {
            let e = chunk.cell_entries[idx];
            (e.seg_start, e.seg_count)
        })
}

/// Segment indices listed for one cell:
/// `cellSegments[segStart .. segStart+segCount)`.
pub fn segments_in_cell(chunk: &Chunk, id: u32) -> &[u32] {
    match lookup_cell(chunk, id) {
        Some((start, count)) => {
            let start = start as usize;
            let end = start + count as usize;
            chunk.cell_segments.get(start..end).unwrap_or(&[])
        }
        None => &[],
    }
}

/// The 3×3 neighborhood of cell ids around `(cx, cy)`, skipping any cell
/// that falls outside the chunk's grid.
pub fn neighborhood_cell_ids(chunk: &Chunk, cx: u16, cy: u16) -> Vec<u32> {
    let mut ids = Vec::with_capacity(9);
    for dy in -1i32..=1 {
        for dx in -1i32..=1 {
            let nx = cx as i32 + dx;
            let ny = cy as i32 + dy;
            if nx < 0 || ny < 0 || nx >= chunk.grid_width as i32 || ny >= chunk.grid_height as i32
            {
                continue;
            }
            ids.push(cell_id(nx as u16, ny as u16));
        }
    }
    ids
}
