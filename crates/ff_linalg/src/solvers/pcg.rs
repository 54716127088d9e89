// crates/ff_linalg/src/solvers/pcg.rs

//! 预条件共轭梯度求解器
//!
//! 适用于对称（正定）矩阵，预条件器按名称选择（`DIC`、`diagonal`、`none`）。
//! 当 |w·p| / normFactor 低于 VSMALL 时判定奇异并停止。
//!
//! 内积与残差范数只在本分区内求和，没有跨分区归约，因此只支持
//! 单分区求解。传入 [`ProcessorInterface`](crate::interfaces::ProcessorInterface)
//! 时各分区的 α、β 互不一致，求解器记录警告后按本地量继续。

use ff_config::LinearSolverConfig;
use ff_runtime::RuntimeScalar;

use super::{check_fields, norm_factor, Controls, LduSolver, SolverError, SolverPerformance};
use crate::interfaces::CoupledInterfaces;
use crate::matrix::LduMatrix;
use crate::preconditioners::create_preconditioner;
use crate::vector_ops::{axpy, sum_mag, sum_prod, xpay};

/// PCG 求解器
#[derive(Debug)]
pub struct PcgSolver<'a, S: RuntimeScalar> {
    matrix: &'a LduMatrix<S>,
    preconditioner: String,
    field_name: String,
    controls: Controls<S>,
}

impl<'a, S: RuntimeScalar> PcgSolver<'a, S> {
    /// 创建求解器，矩阵必须为对称存储
    pub fn new(
        matrix: &'a LduMatrix<S>,
        config: &LinearSolverConfig,
        field_name: &str,
    ) -> Result<Self, SolverError> {
        if !matrix.is_symmetric() {
            return Err(SolverError::RequiresSymmetric { solver: "PCG" });
        }
        Ok(Self {
            matrix,
            preconditioner: config.preconditioner.clone(),
            field_name: field_name.to_string(),
            controls: Controls::from_config(config)?,
        })
    }
}

impl<S: RuntimeScalar> LduSolver<S> for PcgSolver<'_, S> {
    fn name(&self) -> &'static str {
        "PCG"
    }

    fn solve(
        &mut self,
        psi: &mut [S],
        source: &[S],
        interfaces: &mut CoupledInterfaces<S>,
    ) -> Result<SolverPerformance<S>, SolverError> {
        let matrix = self.matrix;
        check_fields(matrix, psi, source)?;
        if interfaces.has_remote() {
            log::warn!(
                "PCG 不做跨分区归约，场 {} 的跨分区接口按本地内积处理",
                self.field_name
            );
        }

        let n = matrix.n_cells();
        let controls = self.controls;
        let mut perf = SolverPerformance::new(self.name(), &self.field_name);

        let mut w_a = vec![S::ZERO; n];
        let mut p_a = vec![S::ZERO; n];
        let mut r_a = vec![S::ZERO; n];

        // r = b - A·ψ
        matrix.amul(psi, &mut w_a, interfaces)?;
        let norm = norm_factor(matrix, psi, source, &w_a, interfaces, &mut p_a)?;
        for ((r, &b), &wa) in r_a.iter_mut().zip(source).zip(&w_a) {
            *r = b - wa;
        }
        perf.initial_residual = sum_mag(&r_a) / norm;
        perf.final_residual = perf.initial_residual;

        if controls.min_iter > 0
            || !perf.check_convergence(controls.tolerance, controls.rel_tol)
        {
            let precond = create_preconditioner(&self.preconditioner, matrix)?;
            let mut w_ar_a = S::GREAT;

            loop {
                let w_ar_a_old = w_ar_a;

                // w = M⁻¹ r
                precond.apply(&r_a, &mut w_a);
                w_ar_a = sum_prod(&w_a, &r_a);

                // p = w + β p
                if perf.n_iterations == 0 {
                    p_a.copy_from_slice(&w_a);
                } else {
                    let beta = w_ar_a / w_ar_a_old;
                    xpay(&w_a, beta, &mut p_a);
                }

                // w = A·p
                matrix.amul(&p_a, &mut w_a, interfaces)?;
                let w_ap_a = sum_prod(&w_a, &p_a);

                if perf.check_singularity(w_ap_a.abs() / norm) {
                    break;
                }

                let alpha = w_ar_a / w_ap_a;
                axpy(alpha, &p_a, psi);
                axpy(-alpha, &w_a, &mut r_a);

                perf.final_residual = sum_mag(&r_a) / norm;
                perf.n_iterations += 1;

                if let Some(res) = perf.final_residual.to_f64() {
                    log::trace!("PCG iter {}: residual = {:.6e}", perf.n_iterations, res);
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addressing::LduAddressing;
    use crate::solvers::SolverStatus;
    use std::sync::Arc;

    fn grid_laplacian(nx: usize, ny: usize) -> LduMatrix<f64> {
        let mesh = crate::mesh::BlockMesh::new(nx, ny, 1);
        let addr = Arc::new(LduAddressing::from_mesh(&mesh).unwrap());
        let n_faces = addr.n_faces();
        let mut m = LduMatrix::symmetric(addr, vec![0.0; nx * ny], vec![-1.0; n_faces]).unwrap();
        m.neg_sum_diag();
        // 固定第一个单元附近的值，使矩阵正定
        m.diag_mut()[0] += 1.0;
        m
    }

    #[test]
    fn test_pcg_solves_grid_laplacian() {
        let m = grid_laplacian(5, 4);
        let x: Vec<f64> = (0..20).map(|i| (i as f64 * 0.3).cos()).collect();
        let mut b = vec![0.0; 20];
        m.amul_faces(&x, &mut b);

        for precond in ["DIC", "diagonal", "none"] {
            let config = LinearSolverConfig::pcg(precond, 1e-12, 200);
            let mut solver = PcgSolver::new(&m, &config, "p").unwrap();
            let mut psi = vec![0.0; 20];
            let perf = solver.solve(&mut psi, &b, &mut CoupledInterfaces::new()).unwrap();
            assert_eq!(perf.status, SolverStatus::Converged, "{}", precond);
            assert!(perf.n_iterations <= 60, "{}: {}", precond, perf.n_iterations);
            for (p, xi) in psi.iter().zip(&x) {
                assert!((p - xi).abs() < 1e-8, "{}", precond);
            }
        }
    }

    #[test]
    fn test_rejects_asymmetric() {
        let addr = Arc::new(LduAddressing::new(2, vec![0], vec![1]).unwrap());
        let m = LduMatrix::asymmetric(addr, vec![2.0; 2], vec![-1.0], vec![-0.5]).unwrap();
        let config = LinearSolverConfig::pcg("DIC", 1e-6, 10);
        assert!(matches!(
            PcgSolver::new(&m, &config, "p"),
            Err(SolverError::RequiresSymmetric { solver: "PCG" })
        ));
    }

    #[test]
    fn test_singular_detected() {
        // 零矩阵：A·p = 0
        let addr = Arc::new(LduAddressing::new(3, vec![0, 1], vec![1, 2]).unwrap());
        let m = LduMatrix::symmetric(addr, vec![0.0; 3], vec![0.0; 2]).unwrap();
        let config = LinearSolverConfig::pcg("none", 1e-6, 10);
        let mut solver = PcgSolver::new(&m, &config, "p").unwrap();
        let mut psi = vec![0.0; 3];
        let perf = solver
            .solve(&mut psi, &[1.0, 1.0, 1.0], &mut CoupledInterfaces::new())
            .unwrap();
        assert_eq!(perf.status, SolverStatus::Singular);
        assert_eq!(perf.n_iterations, 0);
    }

    #[test]
    fn test_unknown_preconditioner() {
        let m = grid_laplacian(3, 3);
        let config = LinearSolverConfig::pcg("GAMG", 1e-6, 10);
        let mut solver = PcgSolver::new(&m, &config, "p").unwrap();
        let mut psi = vec![0.0; 9];
        assert!(matches!(
            solver.solve(&mut psi, &[1.0; 9], &mut CoupledInterfaces::new()),
            Err(SolverError::Preconditioner(_))
        ));
    }
}
