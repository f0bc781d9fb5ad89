//! Flow accumulation
//!
//! Number of upstream cells draining through each cell along D8 flow
//! directions.

use ndarray::Array2;
use irrigis_core::raster::{d8, offset_within, Raster};
use irrigis_core::{Algorithm, Error, Result};

/// Flow accumulation algorithm
#[derive(Debug, Clone, Default)]
pub struct FlowAccumulation;

impl Algorithm for FlowAccumulation {
    type Input = Raster<u8>;
    type Output = Raster<f64>;
    type Params = ();
    type Error = Error;

    fn name(&self) -> &'static str {
        "Flow Accumulation"
    }

    fn description(&self) -> &'static str {
        "Upstream contributing cells from D8 flow direction"
    }

    fn execute(&self, input: Self::Input, _params: Self::Params) -> Result<Self::Output> {
        flow_accumulation(&input)
    }
}

fn downstream(dir: &Array2<u8>, row: usize, col: usize) -> Option<(usize, usize)> {
    let code = dir[(row, col)] as usize;
    if code == 0 || code >= d8::OFFSETS.len() {
        return None;
    }
    let (rows, cols) = dir.dim();
    let (dr, dc) = d8::OFFSETS[code];
    offset_within(row, col, dr, dc, rows, cols)
}

/// Calculate flow accumulation from a D8 flow direction raster.
///
/// Headwater cells have accumulation 0. Cells are visited in topological
/// order (Kahn), so the pass is linear in the number of cells.
pub fn flow_accumulation(flow_dir: &Raster<u8>) -> Result<Raster<f64>> {
    let (rows, cols) = flow_dir.shape();
    let dir = flow_dir.data();

    let mut in_degree = Array2::<u32>::zeros((rows, cols));
    for row in 0..rows {
        for col in 0..cols {
            if let Some(next) = downstream(dir, row, col) {
                in_degree[next] += 1;
            }
        }
    }

    let mut queue: Vec<(usize, usize)> = (0..rows)
        .flat_map(|r| (0..cols).map(move |c| (r, c)))
        .filter(|&cell| in_degree[cell] == 0)
        .collect();
    let mut accumulation = Array2::<f64>::zeros((rows, cols));

    while let Some(cell) = queue.pop() {
        let Some(next) = downstream(dir, cell.0, cell.1) else {
            continue;
        };
        accumulation[next] += accumulation[cell] + 1.0;
        in_degree[next] = in_degree[next].saturating_sub(1);
        if in_degree[next] == 0 {
            queue.push(next);
        }
    }

    flow_dir.with_data(accumulation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hydrology::flow_direction;

    #[test]
    fn test_single_channel() {
        // One row, everything flows east
        let dir: Raster<u8> = Raster::from_vec(vec![1, 1, 1, 1, 0], 1, 5).unwrap();
        let acc = flow_accumulation(&dir).unwrap();
        let values: Vec<f64> = acc.data().iter().copied().collect();
        assert_eq!(values, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_pit_collects_everything() {
        let mut dem: Raster<f64> = Raster::filled(3, 3, 5.0);
        dem.set(1, 1, 1.0).unwrap();
        let dir = flow_direction(&dem).unwrap();
        let acc = FlowAccumulation.execute_default(dir).unwrap();
        assert_eq!(acc.get(1, 1).unwrap(), 8.0);
        assert_eq!(acc.get(0, 0).unwrap(), 0.0);
    }
}
