// crates/ff_linalg/src/smoothers/sym_gauss_seidel.rs

//! 对称 Gauss-Seidel 光顺器
//!
//! 每次扫描先升序再降序。降序阶段单元 c 之前的单元尚未更新，
//! 前向扫描累积的 b' 中的 lower 项正好对应其当前值。

use ff_runtime::RuntimeScalar;

use super::gauss_seidel::{backward_sweep, forward_sweep};
use super::{check_diagonal, check_fields, fold_interfaces, LduSmoother, SmootherError};
use crate::interfaces::CoupledInterfaces;
use crate::matrix::LduMatrix;

/// 对称 Gauss-Seidel 光顺器
#[derive(Debug)]
pub struct SymGaussSeidelSmoother<'a, S: RuntimeScalar> {
    matrix: &'a LduMatrix<S>,
    b_prime: Vec<S>,
}

impl<'a, S: RuntimeScalar> SymGaussSeidelSmoother<'a, S> {
    /// 创建光顺器，对角元必须全部非零
    pub fn new(matrix: &'a LduMatrix<S>) -> Result<Self, SmootherError> {
        check_diagonal(matrix.diag())?;
        Ok(Self {
            matrix,
            b_prime: vec![S::ZERO; matrix.n_cells()],
        })
    }
}

impl<S: RuntimeScalar> LduSmoother<S> for SymGaussSeidelSmoother<'_, S> {
    fn name(&self) -> &'static str {
        "symGaussSeidel"
    }

    fn smooth(
        &mut self,
        psi: &mut [S],
        source: &[S],
        interfaces: &mut CoupledInterfaces<S>,
        n_sweeps: usize,
    ) -> Result<(), SmootherError> {
        check_fields(self.matrix, psi, source)?;
        for _ in 0..n_sweeps {
            fold_interfaces(interfaces, psi, source, &mut self.b_prime)?;
            forward_sweep(self.matrix, psi, &mut self.b_prime);
            backward_sweep(self.matrix, psi, &self.b_prime);
        }
        Ok(())
    }
}
