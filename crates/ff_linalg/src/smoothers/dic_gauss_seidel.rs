// crates/ff_linalg/src/smoothers/dic_gauss_seidel.rs

//! DIC + Gauss-Seidel 组合光顺器
//!
//! 先做 n 次 DIC 扫描，再对同一 ψ 做 n 次 Gauss-Seidel 扫描。

use ff_runtime::RuntimeScalar;

use super::{DicSmoother, GaussSeidelSmoother, LduSmoother, SmootherError};
use crate::interfaces::CoupledInterfaces;
use crate::matrix::LduMatrix;

/// DIC + Gauss-Seidel 光顺器（仅对称矩阵）
#[derive(Debug)]
pub struct DicGaussSeidelSmoother<'a, S: RuntimeScalar> {
    dic: DicSmoother<'a, S>,
    gs: GaussSeidelSmoother<'a, S>,
}

impl<'a, S: RuntimeScalar> DicGaussSeidelSmoother<'a, S> {
    /// 创建组合光顺器
    pub fn new(matrix: &'a LduMatrix<S>) -> Result<Self, SmootherError> {
        Ok(Self {
            dic: DicSmoother::new(matrix)?,
            gs: GaussSeidelSmoother::new(matrix)?,
        })
    }
}

impl<S: RuntimeScalar> LduSmoother<S> for DicGaussSeidelSmoother<'_, S> {
    fn name(&self) -> &'static str {
        "DICGaussSeidel"
    }

    fn smooth(
        &mut self,
        psi: &mut [S],
        source: &[S],
        interfaces: &mut CoupledInterfaces<S>,
        n_sweeps: usize,
    ) -> Result<(), SmootherError> {
        self.dic.smooth(psi, source, interfaces, n_sweeps)?;
        self.gs.smooth(psi, source, interfaces, n_sweeps)
    }
}
