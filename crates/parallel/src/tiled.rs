//! Tiled processing for large rasters

use rayon::prelude::*;

/// A rectangular window of a raster
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    /// Row offset in the source raster
    pub row_offset: usize,
    /// Column offset in the source raster
    pub col_offset: usize,
    pub rows: usize,
    pub cols: usize,
}

impl Tile {
    pub fn new(row_offset: usize, col_offset: usize, rows: usize, cols: usize) -> Self {
        Self {
            row_offset,
            col_offset,
            rows,
            cols,
        }
    }

    /// Source rows covered by this tile
    pub fn row_range(&self) -> std::ops::Range<usize> {
        self.row_offset..self.row_offset + self.rows
    }

    /// Source columns covered by this tile
    pub fn col_range(&self) -> std::ops::Range<usize> {
        self.col_offset..self.col_offset + self.cols
    }

    /// Source coordinates of every cell, row-major
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.row_range()
            .flat_map(move |r| self.col_range().map(move |c| (r, c)))
    }
}

/// Iterator over non-overlapping tiles covering a raster, row-major
pub struct TileIterator {
    total_rows: usize,
    total_cols: usize,
    tile_size: usize,
    current_row: usize,
    current_col: usize,
}

impl TileIterator {
    /// `tile_size` of zero is treated as one
    pub fn new(total_rows: usize, total_cols: usize, tile_size: usize) -> Self {
        Self {
            total_rows,
            total_cols,
            tile_size: tile_size.max(1),
            current_row: 0,
            current_col: 0,
        }
    }
}

impl Iterator for TileIterator {
    type Item = Tile;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current_row >= self.total_rows || self.total_cols == 0 {
            return None;
        }

        let rows = self.tile_size.min(self.total_rows - self.current_row);
        let cols = self.tile_size.min(self.total_cols - self.current_col);
        let tile = Tile::new(self.current_row, self.current_col, rows, cols);

        self.current_col += self.tile_size;
        if self.current_col >= self.total_cols {
            self.current_col = 0;
            self.current_row += self.tile_size;
        }

        Some(tile)
    }
}

/// Runs a per-tile function over a grid in parallel
#[derive(Debug, Clone, Copy)]
pub struct TiledProcessor {
    tile_size: usize,
}

impl TiledProcessor {
    pub fn new(tile_size: usize) -> Self {
        Self {
            tile_size: tile_size.max(1),
        }
    }

    /// Tile side derived from a base size and a scale factor, as in
    /// "tile scale 4 means tiles four times smaller per side".
    pub fn with_scale(base_tile_size: usize, tile_scale: usize) -> Self {
        Self::new(base_tile_size / tile_scale.max(1))
    }

    pub fn tile_size(&self) -> usize {
        self.tile_size
    }

    pub fn tiles(&self, rows: usize, cols: usize) -> Vec<Tile> {
        TileIterator::new(rows, cols, self.tile_size).collect()
    }

    /// Apply `f` to every tile in parallel and return the results in tile order
    pub fn map<R, F>(&self, rows: usize, cols: usize, f: F) -> Vec<R>
    where
        R: Send,
        F: Fn(&Tile) -> R + Sync + Send,
    {
        self.tiles(rows, cols).par_iter().map(|t| f(t)).collect()
    }
}

impl Default for TiledProcessor {
    fn default() -> Self {
        Self::new(256)
    }
}
