// crates/ff_linalg/src/solvers/mod.rs

//! LDU 迭代求解器
//!
//! 残差按与解的量级无关的方式归一化：
//!
//! ```text
//! normFactor = Σ (|A·ψ - x̄·sumA| + |b - x̄·sumA|) + 1e-20
//! residual   = Σ |b - A·ψ| / normFactor
//! ```
//!
//! 其中 x̄ 为 ψ 的平均值，sumA 为矩阵行和。收敛判据：
//! `final < tolerance` 或 `rel_tol > SMALL && final < rel_tol * initial`。
//!
//! # 求解器
//!
//! - [`SmoothSolver`] (`smoothSolver`): 反复调用光顺器直至收敛
//! - [`PcgSolver`] (`PCG`): 预条件共轭梯度，仅对称矩阵

pub mod pcg;
pub mod smooth_solver;

pub use pcg::PcgSolver;
pub use smooth_solver::SmoothSolver;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use ff_config::{ConfigError, LinearSolverConfig};
use ff_runtime::RuntimeScalar;
use serde::Serialize;
use thiserror::Error;

use crate::interfaces::CoupledInterfaces;
use crate::matrix::{LduMatrix, MatrixError};
use crate::preconditioners::PreconditionerError;
use crate::smoothers::{SmootherError, SmootherRegistry};
use crate::vector_ops::average;

// =============================================================================
// 错误类型
// =============================================================================

/// 求解器错误
#[derive(Debug, Error)]
pub enum SolverError {
    /// 未知求解器
    #[error("未知求解器 '{name}'，可用: {available:?}")]
    Unknown {
        /// 请求的名称
        name: String,
        /// 可用名称
        available: Vec<String>,
    },

    /// 求解器要求对称矩阵
    #[error("求解器 {solver} 要求对称矩阵")]
    RequiresSymmetric {
        /// 求解器名称
        solver: &'static str,
    },

    /// 控制参数无法转换为当前精度
    #[error("控制参数 {key} = {value} 无法以当前精度表示")]
    InvalidControl {
        /// 参数名
        key: &'static str,
        /// 参数值
        value: f64,
    },

    /// 配置无效
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// 矩阵运算失败
    #[error(transparent)]
    Matrix(#[from] MatrixError),

    /// 光顺器失败
    #[error(transparent)]
    Smoother(#[from] SmootherError),

    /// 预条件器失败
    #[error(transparent)]
    Preconditioner(#[from] PreconditionerError),
}

// =============================================================================
// 求解性能
// =============================================================================

/// 求解状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SolverStatus {
    /// 收敛
    Converged,
    /// 达到最大迭代次数
    MaxIterationsReached,
    /// 矩阵奇异（搜索方向退化）
    Singular,
}

/// 一次求解的性能记录
#[derive(Debug, Clone, Serialize)]
pub struct SolverPerformance<S: RuntimeScalar> {
    /// 求解器名称
    pub solver_name: String,
    /// 场名称
    pub field_name: String,
    /// 初始归一化残差
    pub initial_residual: S,
    /// 最终归一化残差
    pub final_residual: S,
    /// 迭代次数
    pub n_iterations: usize,
    /// 求解状态
    pub status: SolverStatus,
}

impl<S: RuntimeScalar> SolverPerformance<S> {
    /// 新建记录（尚未收敛）
    pub fn new(solver_name: &str, field_name: &str) -> Self {
        Self {
            solver_name: solver_name.to_string(),
            field_name: field_name.to_string(),
            initial_residual: S::ZERO,
            final_residual: S::ZERO,
            n_iterations: 0,
            status: SolverStatus::MaxIterationsReached,
        }
    }

    /// 检查收敛，收敛时更新状态
    pub fn check_convergence(&mut self, tolerance: S, rel_tol: S) -> bool {
        let converged = self.final_residual < tolerance
            || (rel_tol > S::SMALL && self.final_residual < rel_tol * self.initial_residual);
        if converged {
            self.status = SolverStatus::Converged;
        }
        converged
    }

    /// 检查奇异性，奇异时更新状态
    pub fn check_singularity(&mut self, value: S) -> bool {
        if value < S::VSMALL {
            self.status = SolverStatus::Singular;
            true
        } else {
            false
        }
    }

    /// 是否收敛
    pub fn converged(&self) -> bool {
        self.status == SolverStatus::Converged
    }

    /// 是否奇异
    pub fn singular(&self) -> bool {
        self.status == SolverStatus::Singular
    }

    /// 写入日志（未收敛时为 warn）
    pub fn report(&self) {
        if !self.converged() {
            log::warn!("{}", self);
        } else {
            log::info!("{}", self);
        }
    }
}

impl<S: RuntimeScalar> fmt::Display for SolverPerformance<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: Solving for {}, Initial residual = {:e}, Final residual = {:e}, No Iterations {}",
            self.solver_name,
            self.field_name,
            self.initial_residual.to_f64().unwrap_or(f64::NAN),
            self.final_residual.to_f64().unwrap_or(f64::NAN),
            self.n_iterations
        )?;
        if self.singular() {
            write!(f, " (singular)")?;
        }
        Ok(())
    }
}

// =============================================================================
// 公共工具
// =============================================================================

/// 求解器 trait
pub trait LduSolver<S: RuntimeScalar> {
    /// 求解器名称
    fn name(&self) -> &'static str;

    /// 求解 A·ψ = b，ψ 输入初值、输出解
    fn solve(
        &mut self,
        psi: &mut [S],
        source: &[S],
        interfaces: &mut CoupledInterfaces<S>,
    ) -> Result<SolverPerformance<S>, SolverError>;
}

/// 已转换为计算精度的收敛控制
#[derive(Debug, Clone, Copy)]
pub(crate) struct Controls<S> {
    pub tolerance: S,
    pub rel_tol: S,
    pub max_iter: usize,
    pub min_iter: usize,
    pub n_sweeps: usize,
}

impl<S: RuntimeScalar> Controls<S> {
    pub fn from_config(config: &LinearSolverConfig) -> Result<Self, SolverError> {
        config.validate()?;
        let convert = |key, value: f64| {
            S::from_config(value).ok_or(SolverError::InvalidControl { key, value })
        };
        Ok(Self {
            tolerance: convert("tolerance", config.tolerance)?,
            rel_tol: convert("rel_tol", config.rel_tol)?,
            max_iter: config.max_iter,
            min_iter: config.min_iter,
            n_sweeps: config.n_sweeps,
        })
    }

    /// 迭代是否继续
    pub fn keep_going(&self, perf: &mut SolverPerformance<S>) -> bool {
        let converged = perf.check_convergence(self.tolerance, self.rel_tol);
        (perf.n_iterations < self.max_iter && !converged) || perf.n_iterations < self.min_iter
    }
}

/// 残差归一化因子
///
/// `w_a` 为 A·ψ，`tmp` 为工作数组。
pub fn norm_factor<S: RuntimeScalar>(
    matrix: &LduMatrix<S>,
    psi: &[S],
    source: &[S],
    w_a: &[S],
    interfaces: &CoupledInterfaces<S>,
    tmp: &mut [S],
) -> Result<S, MatrixError> {
    matrix.sum_a(interfaces, tmp)?;
    let x_ref = average(psi);
    let small = S::from_config(1e-20).unwrap_or(S::VSMALL);

    let mut norm = S::ZERO;
    for ((&wa, &b), &sum_a) in w_a.iter().zip(source).zip(tmp.iter()) {
        let r = x_ref * sum_a;
        norm += (wa - r).abs() + (b - r).abs();
    }
    Ok(norm + small)
}

/// 检查 ψ 与源项长度
pub(crate) fn check_fields<S: RuntimeScalar>(
    matrix: &LduMatrix<S>,
    psi: &[S],
    source: &[S],
) -> Result<(), SolverError> {
    crate::matrix::check_len("psi", matrix.n_cells(), psi.len())?;
    crate::matrix::check_len("source", matrix.n_cells(), source.len())?;
    Ok(())
}

// =============================================================================
// 注册表
// =============================================================================

/// 求解器构造参数
pub struct SolverContext<'a, S: RuntimeScalar> {
    /// 系数矩阵
    pub matrix: &'a LduMatrix<S>,
    /// 求解器配置
    pub config: &'a LinearSolverConfig,
    /// 场名称
    pub field_name: &'a str,
    /// 光顺器注册表
    pub smoothers: &'a SmootherRegistry<S>,
}

/// 求解器工厂
pub type SolverFactory<S> = Arc<
    dyn for<'a> Fn(SolverContext<'a, S>) -> Result<Box<dyn LduSolver<S> + 'a>, SolverError>
        + Send
        + Sync,
>;

/// 按名称构造求解器的注册表
pub struct SolverRegistry<S: RuntimeScalar> {
    solvers: BTreeMap<String, SolverFactory<S>>,
    smoothers: SmootherRegistry<S>,
}

impl<S: RuntimeScalar> Default for SolverRegistry<S> {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl<S: RuntimeScalar> fmt::Debug for SolverRegistry<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SolverRegistry")
            .field("solvers", &self.solvers.keys().collect::<Vec<_>>())
            .field("smoothers", &self.smoothers)
            .finish()
    }
}

fn smooth_solver<S: RuntimeScalar>(
    ctx: SolverContext<'_, S>,
) -> Result<Box<dyn LduSolver<S> + '_>, SolverError> {
    Ok(Box::new(SmoothSolver::new(
        ctx.matrix,
        ctx.smoothers,
        ctx.config,
        ctx.field_name,
    )?))
}

fn pcg<S: RuntimeScalar>(
    ctx: SolverContext<'_, S>,
) -> Result<Box<dyn LduSolver<S> + '_>, SolverError> {
    Ok(Box::new(PcgSolver::new(ctx.matrix, ctx.config, ctx.field_name)?))
}

impl<S: RuntimeScalar> SolverRegistry<S> {
    /// 含内置求解器与光顺器的注册表
    pub fn with_defaults() -> Self {
        let mut registry = Self {
            solvers: BTreeMap::new(),
            smoothers: SmootherRegistry::with_defaults(),
        };
        registry.register("smoothSolver", smooth_solver::<S>);
        registry.register("PCG", pcg::<S>);
        registry
    }

    /// 注册求解器，同名条目被替换
    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: for<'a> Fn(SolverContext<'a, S>) -> Result<Box<dyn LduSolver<S> + 'a>, SolverError>
            + Send
            + Sync
            + 'static,
    {
        self.solvers.insert(name.to_string(), Arc::new(factory));
    }

    /// 光顺器注册表
    pub fn smoothers(&self) -> &SmootherRegistry<S> {
        &self.smoothers
    }

    /// 可变光顺器注册表
    pub fn smoothers_mut(&mut self) -> &mut SmootherRegistry<S> {
        &mut self.smoothers
    }

    /// 已注册的求解器名称
    pub fn names(&self) -> Vec<String> {
        self.solvers.keys().cloned().collect()
    }

    /// 按配置构造求解器
    pub fn create<'a>(
        &'a self,
        matrix: &'a LduMatrix<S>,
        config: &'a LinearSolverConfig,
        field_name: &'a str,
    ) -> Result<Box<dyn LduSolver<S> + 'a>, SolverError> {
        let factory = self
            .solvers
            .get(&config.solver)
            .ok_or_else(|| SolverError::Unknown {
                name: config.solver.clone(),
                available: self.names(),
            })?;
        log::debug!("构造求解器 {} (场 {})", config.solver, field_name);
        factory(SolverContext {
            matrix,
            config,
            field_name,
            smoothers: &self.smoothers,
        })
    }

    /// 构造求解器并求解
    pub fn solve(
        &self,
        matrix: &LduMatrix<S>,
        psi: &mut [S],
        source: &[S],
        interfaces: &mut CoupledInterfaces<S>,
        config: &LinearSolverConfig,
        field_name: &str,
    ) -> Result<SolverPerformance<S>, SolverError> {
        let mut solver = self.create(matrix, config, field_name)?;
        solver.solve(psi, source, interfaces)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_convergence() {
        let mut perf = SolverPerformance::<f64>::new("PCG", "p");
        perf.initial_residual = 1.0;
        perf.final_residual = 0.05;
        assert!(!perf.check_convergence(1e-6, 0.0));
        assert!(perf.check_convergence(1e-6, 0.1));
        assert!(perf.converged());

        let mut perf = SolverPerformance::<f64>::new("PCG", "p");
        perf.final_residual = 1e-8;
        assert!(perf.check_convergence(1e-6, 0.0));
    }

    #[test]
    fn test_tiny_rel_tol_ignored() {
        let mut perf = SolverPerformance::<f64>::new("PCG", "p");
        perf.initial_residual = 1.0;
        perf.final_residual = 1e-17;
        assert!(!perf.check_convergence(0.0, 1e-16));
    }

    #[test]
    fn test_check_singularity() {
        let mut perf = SolverPerformance::<f64>::new("PCG", "p");
        assert!(!perf.check_singularity(1e-10));
        assert!(perf.check_singularity(0.0));
        assert_eq!(perf.status, SolverStatus::Singular);
        assert!(perf.to_string().ends_with("(singular)"));
    }

    #[test]
    fn test_controls_from_invalid_config() {
        let config = LinearSolverConfig::default().with_sweeps(0);
        assert!(matches!(
            Controls::<f64>::from_config(&config),
            Err(SolverError::Config(_))
        ));
    }

    #[test]
    fn test_controls_f32_overflow() {
        let mut config = LinearSolverConfig::default();
        config.tolerance = 1e300;
        assert!(matches!(
            Controls::<f32>::from_config(&config),
            Err(SolverError::InvalidControl { key: "tolerance", .. })
        ));
    }

    #[test]
    fn test_serialize_performance() {
        let mut perf = SolverPerformance::<f64>::new("PCG", "p");
        perf.final_residual = 0.5;
        perf.n_iterations = 3;
        let json = serde_json::to_value(&perf).unwrap();
        assert_eq!(json["solver_name"], "PCG");
        assert_eq!(json["n_iterations"], 3);
        assert_eq!(json["final_residual"], 0.5);
        assert_eq!(json["status"], "MaxIterationsReached");
    }

    #[test]
    fn test_display_format() {
        let mut perf = SolverPerformance::<f64>::new("smoothSolver", "T");
        perf.initial_residual = 1.0;
        perf.final_residual = 1e-7;
        perf.n_iterations = 12;
        assert_eq!(
            perf.to_string(),
            "smoothSolver: Solving for T, Initial residual = 1e0, Final residual = 1e-7, No Iterations 12"
        );
    }
}
