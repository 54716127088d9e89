// crates/ff_linalg/src/smoothers/dic.rs

//! DIC 光顺器
//!
//! 每次扫描以不完全 Cholesky 分解作用于当前残差并修正：
//! ψ += (LDLᵀ)⁻¹ (b - A·ψ)。

use ff_runtime::RuntimeScalar;

use super::{check_fields, LduSmoother, SmootherError};
use crate::interfaces::CoupledInterfaces;
use crate::matrix::LduMatrix;
use crate::preconditioners::IncompleteFactor;

/// DIC 光顺器（仅对称矩阵）
#[derive(Debug)]
pub struct DicSmoother<'a, S: RuntimeScalar> {
    matrix: &'a LduMatrix<S>,
    factor: IncompleteFactor<S>,
    r_a: Vec<S>,
}

impl<'a, S: RuntimeScalar> DicSmoother<'a, S> {
    /// 创建光顺器并完成分解
    pub fn new(matrix: &'a LduMatrix<S>) -> Result<Self, SmootherError> {
        if !matrix.is_symmetric() {
            return Err(SmootherError::RequiresSymmetric { name: "DIC" });
        }
        super::check_diagonal(matrix.diag())?;
        Ok(Self {
            matrix,
            factor: IncompleteFactor::dic(matrix)?,
            r_a: vec![S::ZERO; matrix.n_cells()],
        })
    }
}

/// ψ += M⁻¹ (b - A·ψ)，DIC 与 DILU 共用
pub(crate) fn factor_sweeps<S: RuntimeScalar>(
    matrix: &LduMatrix<S>,
    factor: &IncompleteFactor<S>,
    r_a: &mut [S],
    psi: &mut [S],
    source: &[S],
    interfaces: &mut CoupledInterfaces<S>,
    n_sweeps: usize,
) -> Result<(), SmootherError> {
    check_fields(matrix, psi, source)?;
    for _ in 0..n_sweeps {
        matrix.residual(psi, source, interfaces, r_a)?;
        factor.solve_in_place(matrix.addressing(), r_a);
        for (p, &r) in psi.iter_mut().zip(r_a.iter()) {
            *p += r;
        }
    }
    Ok(())
}

impl<S: RuntimeScalar> LduSmoother<S> for DicSmoother<'_, S> {
    fn name(&self) -> &'static str {
        "DIC"
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
    use std::sync::Arc;

    #[test]
    fn test_exact_on_tridiagonal() {
        // 三对角矩阵上 DIC 即精确分解，一次扫描得到解
        let n = 6;
        let addr = Arc::new(
            LduAddressing::new(n, (0..n - 1).collect(), (1..n).collect()).unwrap(),
        );
        let m = LduMatrix::symmetric(addr, vec![2.5; n], vec![-1.0; n - 1]).unwrap();
        let x: Vec<f64> = (0..n).map(|i| (i as f64).sin()).collect();
        let mut b = vec![0.0; n];
        m.amul_faces(&x, &mut b);

        let mut smoother = DicSmoother::new(&m).unwrap();
        let mut psi = vec![0.0; n];
        smoother.smooth(&mut psi, &b, &mut CoupledInterfaces::new(), 1).unwrap();
        for (p, xi) in psi.iter().zip(&x) {
            assert!((p - xi).abs() < 1e-12);
        }
    }

    #[test]
    fn test_rejects_asymmetric() {
        let addr = Arc::new(LduAddressing::new(2, vec![0], vec![1]).unwrap());
        let m = LduMatrix::asymmetric(addr, vec![2.0; 2], vec![-1.0], vec![-0.5]).unwrap();
        assert!(matches!(
            DicSmoother::new(&m),
            Err(SmootherError::RequiresSymmetric { name: "DIC" })
        ));
    }

    #[test]
    fn test_zero_diagonal_rejected() {
        let addr = Arc::new(LduAddressing::new(3, vec![0, 1], vec![1, 2]).unwrap());
        let m = LduMatrix::symmetric(addr, vec![2.0, 0.0, 2.0], vec![-1.0; 2]).unwrap();
        assert!(matches!(
            DicSmoother::new(&m),
            Err(SmootherError::ZeroDiagonal { cell: 1 })
        ));
    }
}
