// argus_core/src/linalg.rs

use nalgebra::{DMatrix, DVector};

/// Stacks column vectors on top of each other.
pub fn vstack(vecs: &[DVector<f64>]) -> DVector<f64> {
    let nrows: usize = vecs.iter().map(|v| v.nrows()).sum();
    let mut out = DVector::zeros(nrows);
    let mut row = 0;
    for v in vecs {
        out.rows_mut(row, v.nrows()).copy_from(v);
        row += v.nrows();
    }
    out
}

/// Places the given matrices along the diagonal of an otherwise-zero matrix.
pub fn block_diag(blocks: &[DMatrix<f64>]) -> DMatrix<f64> {
    let nrows: usize = blocks.iter().map(|b| b.nrows()).sum();
    let ncols: usize = blocks.iter().map(|b| b.ncols()).sum();
    let mut out = DMatrix::zeros(nrows, ncols);
    let (mut row, mut col) = (0, 0);
    for b in blocks {
        out.view_mut((row, col), (b.nrows(), b.ncols())).copy_from(b);
        row += b.nrows();
        col += b.ncols();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{dmatrix, dvector};

    #[test]
    fn vstack_concatenates_in_order() {
        let out = vstack(&[dvector![1.0, 2.0], dvector![3.0]]);
        assert_eq!(out, dvector![1.0, 2.0, 3.0]);
    }

    #[test]
    fn block_diag_zero_fills_off_blocks() {
        let out = block_diag(&[dmatrix![1.0, 2.0; 3.0, 4.0], dmatrix![5.0]]);
        let expected = dmatrix![
            1.0, 2.0, 0.0;
            3.0, 4.0, 0.0;
            0.0, 0.0, 5.0
        ];
        assert_eq!(out, expected);
    }

    #[test]
    fn block_diag_handles_rectangular_blocks() {
        let out = block_diag(&[dmatrix![1.0, 1.0], dmatrix![2.0; 2.0]]);
        assert_eq!(out.nrows(), 3);
        assert_eq!(out.ncols(), 3);
        assert_eq!(out[(0, 1)], 1.0);
        assert_eq!(out[(2, 2)], 2.0);
        assert_eq!(out[(0, 2)], 0.0);
    }
}
