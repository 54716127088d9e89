// crates/ff_linalg/src/smoothers/dilu.rs

//! DILU 光顺器
//!
//! DIC 的非对称推广：分解使用 upper·lower，前代使用 lower，
//! 回代使用 upper。

use ff_runtime::RuntimeScalar;

use super::dic::factor_sweeps;
use super::{check_diagonal, LduSmoother, SmootherError};
use crate::interfaces::CoupledInterfaces;
use crate::matrix::LduMatrix;
use crate::preconditioners::IncompleteFactor;

/// DILU 光顺器
#[derive(Debug)]
pub struct DiluSmoother<'a, S: RuntimeScalar> {
    matrix: &'a LduMatrix<S>,
    factor: IncompleteFactor<S>,
    r_a: Vec<S>,
}

impl<'a, S: RuntimeScalar> DiluSmoother<'a, S> {
    /// 创建光顺器并完成分解
    pub fn new(matrix: &'a LduMatrix<S>) -> Result<Self, SmootherError> {
        check_diagonal(matrix.diag())?;
        Ok(Self {
            matrix,
            factor: IncompleteFactor::dilu(matrix)?,
            r_a: vec![S::ZERO; matrix.n_cells()],
        })
    }
}

impl<S: RuntimeScalar> LduSmoother<S> for DiluSmoother<'_, S> {
    fn name(&self) -> &'static str {
        "DILU"
    }

    fn smooth(
        &mut self,
        psi: &mut [S],
        source: &[S],
        interfaces: &mut CoupledInterfaces<S>,
        n_sweeps: usize,
    ) -> Result<(), SmootherError> {
        factor_sweeps(
            self.matrix,
            &self.factor,
            &mut self.r_a,
            psi,
            source,
            interfaces,
            n_sweeps,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addressing::LduAddressing;
    use crate::vector_ops::sum_mag;
    use std::sync::Arc;

    #[test]
    fn test_reduces_residual_on_grid() {
        let addr = Arc::new(
            LduAddressing::new(6, vec![0, 0, 1, 1, 2, 3, 4], vec![1, 3, 2, 4, 5, 4, 5]).unwrap(),
        );
        let upper = vec![-1.0, -0.5, -1.0, -0.5, -0.5, -1.0, -1.0];
        let lower = vec![-0.5, -1.0, -0.25, -1.0, -1.0, -0.5, -0.25];
        let m = LduMatrix::asymmetric(addr, vec![4.0; 6], upper, lower).unwrap();
        let source = vec![1.0, 0.0, 2.0, -1.0, 0.5, 1.0];

        let mut interfaces = CoupledInterfaces::new();
        let mut psi = vec![0.0; 6];
        let mut r = vec![0.0; 6];
        m.residual(&psi, &source, &mut interfaces, &mut r).unwrap();
        let r0 = sum_mag(&r);

        let mut smoother = DiluSmoother::new(&m).unwrap();
        smoother.smooth(&mut psi, &source, &mut interfaces, 5).unwrap();
        m.residual(&psi, &source, &mut interfaces, &mut r).unwrap();
        assert!(sum_mag(&r) < 1e-2 * r0);
    }
}
