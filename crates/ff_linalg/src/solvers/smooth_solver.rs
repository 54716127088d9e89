// crates/ff_linalg/src/solvers/smooth_solver.rs

//! 光顺求解器
//!
//! 反复调用所选光顺器（每次 `n_sweeps` 次扫描），每次后重新计算残差，
//! 直到收敛或达到最大迭代次数。迭代次数按扫描次数累计。

use ff_config::LinearSolverConfig;
use ff_runtime::RuntimeScalar;

use super::{check_fields, norm_factor, Controls, LduSolver, SolverError, SolverPerformance};
use crate::interfaces::CoupledInterfaces;
use crate::matrix::LduMatrix;
use crate::smoothers::SmootherRegistry;
use crate::vector_ops::sum_mag;

/// 光顺求解器
#[derive(Debug)]
pub struct SmoothSolver<'a, S: RuntimeScalar> {
    matrix: &'a LduMatrix<S>,
    smoothers: &'a SmootherRegistry<S>,
    smoother: String,
    field_name: String,
    controls: Controls<S>,
}

impl<'a, S: RuntimeScalar> SmoothSolver<'a, S> {
    /// 创建求解器
    ///
    /// 配置先经过校验；光顺器名称在求解时才解析。
    pub fn new(
        matrix: &'a LduMatrix<S>,
        smoothers: &'a SmootherRegistry<S>,
        config: &LinearSolverConfig,
        field_name: &str,
    ) -> Result<Self, SolverError> {
        Ok(Self {
            matrix,
            smoothers,
            smoother: config.smoother.clone(),
            field_name: field_name.to_string(),
            controls: Controls::from_config(config)?,
        })
    }
}

impl<S: RuntimeScalar> LduSolver<S> for SmoothSolver<'_, S> {
    fn name(&self) -> &'static str {
        "smoothSolver"
    }

    fn solve(
        &mut self,
        psi: &mut [S],
        source: &[S],
        interfaces: &mut CoupledInterfaces<S>,
    ) -> Result<SolverPerformance<S>, SolverError> {
        let matrix = self.matrix;
        check_fields(matrix, psi, source)?;

        let n = matrix.n_cells();
        let controls = self.controls;
        let mut perf = SolverPerformance::new(self.name(), &self.field_name);

        let mut w_a = vec![S::ZERO; n];
        let mut r_a = vec![S::ZERO; n];

        matrix.amul(psi, &mut w_a, interfaces)?;
        let norm = norm_factor(matrix, psi, source, &w_a, interfaces, &mut r_a)?;
        for ((r, &b), &wa) in r_a.iter_mut().zip(source).zip(&w_a) {
            *r = b - wa;
        }
        perf.initial_residual = sum_mag(&r_a) / norm;
        perf.final_residual = perf.initial_residual;

        if controls.min_iter > 0
            || !perf.check_convergence(controls.tolerance, controls.rel_tol)
        {
            let mut smoother = self.smoothers.create(&self.smoother, matrix)?;
            loop {
                smoother.smooth(psi, source, interfaces, controls.n_sweeps)?;
                matrix.residual(psi, source, interfaces, &mut r_a)?;
                perf.final_residual = sum_mag(&r_a) / norm;
                perf.n_iterations += controls.n_sweeps;

                if let Some(res) = perf.final_residual.to_f64() {
                    log::trace!("{} iter {}: residual = {:.6e}", smoother.name(), perf.n_iterations, res);
                }
                if !controls.keep_going(&mut perf) {
                    break;
                }
            }
        }

        perf.report();
        Ok(perf)
    }
}
