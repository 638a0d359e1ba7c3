//! Line chaining - join line strings end-to-end into longer line strings.
//!
//! Map datasets cut rivers and borders into many short pieces, and clipping
//! cuts them further. This module joins pieces whose endpoints meet (within
//! tolerance), reducing the number of paths and pen lifts for plotters.
//!
//! Unlike hatch strokes, map lines have no meaningful direction, so a piece
//! may be reversed to extend a chain.

use std::collections::{HashMap, HashSet};

use crate::geometry::{Coord, LineString};

/// Configuration for line chaining.
#[derive(Debug, Clone)]
pub struct ChainConfig {
    /// Maximum distance between endpoints to consider them connected.
    pub tolerance: f64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self { tolerance: 1e-6 }
    }
}

impl ChainConfig {
    pub fn with_tolerance(tolerance: f64) -> Self {
        Self { tolerance }
    }
}

/// Which end of a line string an index entry refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum End {
    Start,
    Finish,
}

/// Join connected line strings.
///
/// # Algorithm
///
/// 1. Build a spatial hash of all endpoints
/// 2. For each unvisited piece (in input order), start a new chain
/// 3. Extend forward from the chain's end, reversing pieces as needed
/// 4. Extend backward from the chain's start
///
/// Output order follows the first piece of each chain, so the result is
/// deterministic for a given input.
pub fn chain_line_strings(pieces: &[LineString], config: &ChainConfig) -> Vec<LineString> {
    let pieces: Vec<&LineString> = pieces.iter().filter(|ls| ls.0.len() >= 2).collect();
    if pieces.is_empty() {
        return Vec::new();
    }

    let tolerance_sq = config.tolerance * config.tolerance;
    let grid_size = config.tolerance.max(1e-9);
    let mut used = vec![false; pieces.len()];

    let mut grid: HashMap<(i64, i64), Vec<(usize, End)>> = HashMap::new();
    for (i, ls) in pieces.iter().enumerate() {
        let (first, last) = (ls.0[0], ls.0[ls.0.len() - 1]);
        grid.entry(point_to_cell(first, grid_size)).or_default().push((i, End::Start));
        grid.entry(point_to_cell(last, grid_size)).or_default().push((i, End::Finish));
    }
    // Stable candidate order regardless of insertion history
    for bucket in grid.values_mut() {
        bucket.sort_by_key(|&(i, end)| (i, end == End::Finish));
    }

    let mut chains = Vec::new();

    for start_idx in 0..pieces.len() {
        if used[start_idx] {
            continue;
        }
        used[start_idx] = true;
        let mut chain: Vec<Coord> = pieces[start_idx].0.clone();

        // A closed ring cannot be extended
        let closed = pieces[start_idx].is_closed();

        // Extend forward
        while !closed {
            let tail = chain[chain.len() - 1];
            let Some((idx, end)) = find_connecting(tail, &grid, &pieces, &used, grid_size, tolerance_sq) else {
                break;
            };
            used[idx] = true;
            match end {
                End::Start => chain.extend(pieces[idx].0.iter().skip(1).copied()),
                End::Finish => chain.extend(pieces[idx].0.iter().rev().skip(1).copied()),
            }
        }

        // Extend backward
        while !closed {
            let head = chain[0];
            let Some((idx, end)) = find_connecting(head, &grid, &pieces, &used, grid_size, tolerance_sq) else {
                break;
            };
            used[idx] = true;
            let mut prefix: Vec<Coord> = match end {
                End::Finish => pieces[idx].0.clone(),
                End::Start => pieces[idx].0.iter().rev().copied().collect(),
            };
            prefix.pop();
            prefix.extend(chain);
            chain = prefix;
        }

        chains.push(LineString::from(chain));
    }

    chains
}

/// Convert a point to a grid cell coordinate.
#[inline]
fn point_to_cell(c: Coord, grid_size: f64) -> (i64, i64) {
    ((c.x / grid_size).floor() as i64, (c.y / grid_size).floor() as i64)
}

/// Find an unused piece with an endpoint at `c`.
fn find_connecting(
    c: Coord,
    grid: &HashMap<(i64, i64), Vec<(usize, End)>>,
    pieces: &[&LineString],
    used: &[bool],
    grid_size: f64,
    tolerance_sq: f64,
) -> Option<(usize, End)> {
    let cell = point_to_cell(c, grid_size);
    let mut best: Option<(usize, End)> = None;

    // Check this cell and all 8 neighbors (endpoints might be in adjacent cells)
    for dx in -1..=1 {
        for dy in -1..=1 {
            let Some(candidates) = grid.get(&(cell.0 + dx, cell.1 + dy)) else {
                continue;
            };
            for &(idx, end) in candidates {
                if used[idx] {
                    continue;
                }
                let ls = pieces[idx];
                let p = match end {
                    End::Start => ls.0[0],
                    End::Finish => ls.0[ls.0.len() - 1],
                };
                let dist_sq = (p.x - c.x).powi(2) + (p.y - c.y).powi(2);
                if dist_sq <= tolerance_sq && best.is_none_or(|(b, _)| idx < b) {
                    best = Some((idx, end));
                }
            }
        }
    }

    best
}

/// Remove segments that appear more than once (in either direction).
///
/// Neighbouring regions share their border, so the same edge arrives once
/// per side. Coordinates are compared after rounding to `grid`. The
/// surviving segments are returned as 2-point line strings, in input order;
/// chain them afterwards to rebuild long lines. A non-positive grid compares
/// at a 1e-9 grid instead.
pub fn dedup_segments(lines: &[LineString], grid: f64) -> Vec<LineString> {
    let grid = grid.max(1e-9);
    let key = |c: Coord| -> (i64, i64) {
        ((c.x / grid).round() as i64, (c.y / grid).round() as i64)
    };

    let mut seen: HashSet<((i64, i64), (i64, i64))> = HashSet::new();
    let mut out = Vec::new();
    for ls in lines {
        for seg in ls.lines() {
            let (a, b) = (key(seg.start), key(seg.end));
            if a == b {
                continue;
            }
            let canonical = if a <= b { (a, b) } else { (b, a) };
            if seen.insert(canonical) {
                out.push(LineString::from(vec![seg.start, seg.end]));
            }
        }
    }
    out
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn ls(points: &[(f64, f64)]) -> LineString {
        LineString::from(points.to_vec())
    }

    #[test]
    fn chain_empty() {
        assert!(chain_line_strings(&[], &ChainConfig::default()).is_empty());
    }

    #[test]
    fn chain_two_connected_pieces() {
        let pieces = vec![ls(&[(0.0, 0.0), (10.0, 10.0)]), ls(&[(10.0, 10.0), (20.0, 10.0)])];
        let chains = chain_line_strings(&pieces, &ChainConfig::default());
        assert_eq!(chains.len(), 1, "Should chain into 1 line string");
        assert_eq!(chains[0].0.len(), 3);
    }

    #[test]
    fn chain_reverses_pieces() {
        // Second piece points the "wrong" way
        let pieces = vec![ls(&[(0.0, 0.0), (10.0, 0.0)]), ls(&[(20.0, 0.0), (10.0, 0.0)])];
        let chains = chain_line_strings(&pieces, &ChainConfig::default());
        assert_eq!(chains.len(), 1);
        assert_eq!(chains[0].0.last().copied(), Some(Coord { x: 20.0, y: 0.0 }));
    }

    #[test]
    fn chain_out_of_order() {
        let pieces = vec![
            ls(&[(20.0, 0.0), (30.0, 10.0)]),
            ls(&[(0.0, 0.0), (10.0, 10.0)]),
            ls(&[(10.0, 10.0), (20.0, 0.0)]),
        ];
        let chains = chain_line_strings(&pieces, &ChainConfig::default());
        assert_eq!(chains.len(), 1, "Should chain despite order");
        assert_eq!(chains[0].0.len(), 4);
    }

    #[test]
    fn chain_respects_tolerance() {
        let pieces = vec![ls(&[(0.0, 0.0), (10.0, 10.0)]), ls(&[(10.05, 10.05), (20.0, 10.0)])];
        assert_eq!(chain_line_strings(&pieces, &ChainConfig::with_tolerance(0.1)).len(), 1);
        assert_eq!(chain_line_strings(&pieces, &ChainConfig::with_tolerance(0.01)).len(), 2);
    }

    #[test]
    fn dedup_drops_shared_edge() {
        // Two unit squares sharing the edge x = 1
        let a = ls(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0), (0.0, 0.0)]);
        let b = ls(&[(1.0, 0.0), (2.0, 0.0), (2.0, 1.0), (1.0, 1.0), (1.0, 0.0)]);
        let segments = dedup_segments(&[a, b], 1e-6);
        assert_eq!(segments.len(), 7, "shared edge should appear once");
        let chained = chain_line_strings(&segments, &ChainConfig::default());
        let total: usize = chained.iter().map(|c| c.0.len() - 1).sum();
        assert_eq!(total, 7);
    }

    #[test]
    fn dedup_with_zero_grid_keeps_segments() {
        let line = ls(&[(0.0, 0.0), (1.0, 0.0), (2.0, 1.0)]);
        assert_eq!(dedup_segments(&[line.clone()], 0.0).len(), 2);
        assert_eq!(dedup_segments(&[line.clone(), line], -1.0).len(), 2);
    }
}
