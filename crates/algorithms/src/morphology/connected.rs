//! Connected components of equal-valued cells

use std::collections::VecDeque;

use ndarray::Array2;
use irrigis_core::raster::{offset_within, Connectivity, Raster};
use irrigis_core::{Algorithm, Error, Result};

/// Parameters for small patch removal
#[derive(Debug, Clone, Copy)]
pub struct PatchFilterParams {
    /// Components with fewer cells than this are reset to 0
    pub min_size: usize,
    pub connectivity: Connectivity,
}

impl Default for PatchFilterParams {
    fn default() -> Self {
        Self {
            min_size: 4,
            connectivity: Connectivity::Four,
        }
    }
}

/// Small patch removal algorithm
#[derive(Debug, Clone, Default)]
pub struct PatchFilter;

impl Algorithm for PatchFilter {
    type Input = Raster<u8>;
    type Output = Raster<u8>;
    type Params = PatchFilterParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "PatchFilter"
    }

    fn description(&self) -> &'static str {
        "Reset connected components smaller than a minimum size to background"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        remove_small_patches(&input, params.min_size, params.connectivity)
    }
}

/// Size of the component each cell belongs to, capped at `cap`.
///
/// Components join neighbouring cells holding the same value, zero cells
/// included. Sizes larger than `cap` are reported as `cap`.
pub fn component_sizes(
    raster: &Raster<u8>,
    connectivity: Connectivity,
    cap: usize,
) -> Array2<usize> {
    let (rows, cols) = raster.shape();
    let data = raster.data();
    let offsets = connectivity.offsets();

    let mut sizes = Array2::<usize>::zeros((rows, cols));
    let mut visited = Array2::<bool>::from_elem((rows, cols), false);
    let mut queue = VecDeque::new();
    let mut members = Vec::new();

    for row in 0..rows {
        for col in 0..cols {
            if visited[(row, col)] {
                continue;
            }
            let value = data[(row, col)];
            visited[(row, col)] = true;
            queue.push_back((row, col));
            members.clear();

            while let Some((r, c)) = queue.pop_front() {
                members.push((r, c));
                for &(dr, dc) in offsets {
                    if let Some((nr, nc)) = offset_within(r, c, dr, dc, rows, cols) {
                        if !visited[(nr, nc)] && data[(nr, nc)] == value {
                            visited[(nr, nc)] = true;
                            queue.push_back((nr, nc));
                        }
                    }
                }
            }

            let size = members.len().min(cap);
            for &cell in &members {
                sizes[cell] = size;
            }
        }
    }

    sizes
}

/// Reset non-zero components with fewer than `min_size` cells to 0.
///
/// Applying the filter twice gives the same result as applying it once.
pub fn remove_small_patches(
    raster: &Raster<u8>,
    min_size: usize,
    connectivity: Connectivity,
) -> Result<Raster<u8>> {
    if min_size <= 1 {
        return Ok(raster.clone());
    }
    let sizes = component_sizes(raster, connectivity, min_size);
    let mut output = raster.clone();
    for ((r, c), v) in output.data_mut().indexed_iter_mut() {
        if *v != 0 && sizes[(r, c)] < min_size {
            *v = 0;
        }
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_raster(rows: &[&[u8]]) -> Raster<u8> {
        let cols = rows[0].len();
        let data: Vec<u8> = rows.iter().flat_map(|r| r.iter().copied()).collect();
        Raster::from_vec(data, rows.len(), cols).unwrap()
    }

    #[test]
    fn test_component_sizes_by_connectivity() {
        let r = make_raster(&[
            &[1, 0, 0],
            &[0, 1, 0],
            &[0, 0, 2],
        ]);
        let four = component_sizes(&r, Connectivity::Four, usize::MAX);
        assert_eq!(four[(0, 0)], 1);
        assert_eq!(four[(1, 1)], 1);
        assert_eq!(four[(0, 1)], 3);

        let eight = component_sizes(&r, Connectivity::Eight, usize::MAX);
        assert_eq!(eight[(0, 0)], 2);
        assert_eq!(eight[(2, 2)], 1);
        assert_eq!(eight[(0, 1)], 6);
    }

    #[test]
    fn test_sizes_are_capped() {
        let r = Raster::filled(10, 10, 3u8);
        let sizes = component_sizes(&r, Connectivity::Eight, 25);
        assert!(sizes.iter().all(|&s| s == 25));
    }

    #[test]
    fn test_small_patches_removed() {
        let r = make_raster(&[
            &[2, 2, 0, 0, 1],
            &[2, 2, 0, 0, 0],
            &[0, 0, 0, 1, 1],
            &[1, 0, 0, 1, 1],
        ]);
        let out = remove_small_patches(&r, 4, Connectivity::Four).unwrap();
        assert_eq!(out.get(0, 0).unwrap(), 2);
        assert_eq!(out.get(3, 4).unwrap(), 1);
        assert_eq!(out.get(0, 4).unwrap(), 0);
        assert_eq!(out.get(3, 0).unwrap(), 0);
    }

    #[test]
    fn test_different_classes_do_not_merge() {
        let r = make_raster(&[&[1, 1, 2, 2]]);
        let out = remove_small_patches(&r, 3, Connectivity::Eight).unwrap();
        assert_eq!(out.count_where(|v| v != 0), 0);
    }

    #[test]
    fn test_patch_filter_is_idempotent() {
        let r = make_raster(&[
            &[1, 1, 0, 2, 0, 1],
            &[1, 0, 2, 2, 0, 1],
            &[0, 0, 2, 0, 1, 1],
            &[2, 1, 0, 0, 1, 0],
            &[2, 2, 0, 1, 0, 2],
        ]);
        for conn in [Connectivity::Four, Connectivity::Eight] {
            let once = remove_small_patches(&r, 4, conn).unwrap();
            let twice = remove_small_patches(&once, 4, conn).unwrap();
            assert_eq!(once.data(), twice.data());
        }
    }

    #[test]
    fn test_algorithm_trait() {
        let r = make_raster(&[&[1, 0, 0, 0], &[0, 0, 2, 2], &[0, 0, 2, 2]]);
        let out = PatchFilter.execute_default(r).unwrap();
        assert_eq!(out.get(0, 0).unwrap(), 0);
        assert_eq!(out.get(2, 3).unwrap(), 2);
    }
}
