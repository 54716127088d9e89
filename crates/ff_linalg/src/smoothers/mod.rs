// crates/ff_linalg/src/smoothers/mod.rs

//! LDU 光顺器
//!
//! 光顺器对 A·ψ = b 做固定次数的松弛扫描，原地更新 ψ。
//! 光顺器借用矩阵，构造时完成对角检查与分解，扫描时只接收接口集合。
//!
//! # 可用光顺器
//!
//! | 名称              | 对称矩阵 | 非对称矩阵 |
//! |-------------------|----------|------------|
//! | `GaussSeidel`     | ✓        | ✓          |
//! | `symGaussSeidel`  | ✓        | ✓          |
//! | `DIC`             | ✓        |            |
//! | `DICGaussSeidel`  | ✓        |            |
//! | `DILU`            |          | ✓          |
//!
//! 接口贡献在每次扫描开始时以当前 ψ 计算一次（接口处为 Jacobi 型耦合），
//! 扫描内部不再更新。

pub mod dic;
pub mod dic_gauss_seidel;
pub mod dilu;
pub mod gauss_seidel;
pub mod sym_gauss_seidel;

pub use dic::DicSmoother;
pub use dic_gauss_seidel::DicGaussSeidelSmoother;
pub use dilu::DiluSmoother;
pub use gauss_seidel::GaussSeidelSmoother;
pub use sym_gauss_seidel::SymGaussSeidelSmoother;

use std::collections::BTreeMap;
use std::sync::Arc;

use ff_runtime::RuntimeScalar;
use thiserror::Error;

use crate::interfaces::{CoupledInterfaces, InterfaceCoeffs, InterfaceError};
use crate::matrix::{LduMatrix, MatrixError};
use crate::preconditioners::PreconditionerError;

// =============================================================================
// 错误类型
// =============================================================================

/// 光顺器错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SmootherError {
    /// 对角元为零或非有限值
    #[error("单元 {cell} 的对角元为零或非有限值")]
    ZeroDiagonal {
        /// 单元索引
        cell: usize,
    },

    /// 光顺器要求对称矩阵
    #[error("光顺器 {name} 要求对称矩阵")]
    RequiresSymmetric {
        /// 光顺器名称
        name: &'static str,
    },

    /// 未知或不适用的光顺器
    #[error("{kind}矩阵没有名为 '{name}' 的光顺器，可用: {available:?}")]
    Unknown {
        /// 请求的名称
        name: String,
        /// 矩阵类别（对称 / 非对称）
        kind: &'static str,
        /// 可用名称
        available: Vec<String>,
    },

    /// 矩阵运算失败
    #[error(transparent)]
    Matrix(#[from] MatrixError),

    /// 接口交换失败
    #[error(transparent)]
    Interface(#[from] InterfaceError),

    /// 分解失败
    #[error(transparent)]
    Factor(#[from] PreconditionerError),
}

// =============================================================================
// 光顺器 trait
// =============================================================================

/// LDU 光顺器
pub trait LduSmoother<S: RuntimeScalar> {
    /// 光顺器名称
    fn name(&self) -> &'static str;

    /// 执行 `n_sweeps` 次扫描，原地更新 ψ
    fn smooth(
        &mut self,
        psi: &mut [S],
        source: &[S],
        interfaces: &mut CoupledInterfaces<S>,
        n_sweeps: usize,
    ) -> Result<(), SmootherError>;
}

/// 检查对角元全部非零且有限
pub(crate) fn check_diagonal<S: RuntimeScalar>(diag: &[S]) -> Result<(), SmootherError> {
    match diag
        .iter()
        .position(|d| !d.is_finite() || d.abs() <= S::VSMALL)
    {
        Some(cell) => Err(SmootherError::ZeroDiagonal { cell }),
        None => Ok(()),
    }
}

/// 检查 ψ 与源项长度
pub(crate) fn check_fields<S: RuntimeScalar>(
    matrix: &LduMatrix<S>,
    psi: &[S],
    source: &[S],
) -> Result<(), SmootherError> {
    let n = matrix.n_cells();
    crate::matrix::check_len("psi", n, psi.len())?;
    crate::matrix::check_len("source", n, source.len())?;
    Ok(())
}

/// b' = b + Σ bou_coeffs · ψ_nbr
pub(crate) fn fold_interfaces<S: RuntimeScalar>(
    interfaces: &mut CoupledInterfaces<S>,
    psi: &[S],
    source: &[S],
    b_prime: &mut [S],
) -> Result<(), SmootherError> {
    b_prime.copy_from_slice(source);
    interfaces.exchange(psi, InterfaceCoeffs::Boundary, S::ONE, b_prime)?;
    Ok(())
}

// =============================================================================
// 注册表
// =============================================================================

/// 光顺器工厂
pub type SmootherFactory<S> = Arc<
    dyn for<'a> Fn(&'a LduMatrix<S>) -> Result<Box<dyn LduSmoother<S> + 'a>, SmootherError>
        + Send
        + Sync,
>;

/// 光顺器适用的矩阵类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applicability {
    /// 仅对称矩阵
    Symmetric,
    /// 仅非对称矩阵
    Asymmetric,
    /// 两者皆可
    Both,
}

/// 按名称构造光顺器的注册表
///
/// 对称与非对称矩阵各有一张表，查找时按矩阵存储类别选择。
pub struct SmootherRegistry<S: RuntimeScalar> {
    symmetric: BTreeMap<String, SmootherFactory<S>>,
    asymmetric: BTreeMap<String, SmootherFactory<S>>,
}

impl<S: RuntimeScalar> Default for SmootherRegistry<S> {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl<S: RuntimeScalar> std::fmt::Debug for SmootherRegistry<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmootherRegistry")
            .field("symmetric", &self.symmetric.keys().collect::<Vec<_>>())
            .field("asymmetric", &self.asymmetric.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn gauss_seidel<S: RuntimeScalar>(
    matrix: &LduMatrix<S>,
) -> Result<Box<dyn LduSmoother<S> + '_>, SmootherError> {
    Ok(Box::new(GaussSeidelSmoother::new(matrix)?))
}

fn sym_gauss_seidel<S: RuntimeScalar>(
    matrix: &LduMatrix<S>,
) -> Result<Box<dyn LduSmoother<S> + '_>, SmootherError> {
    Ok(Box::new(SymGaussSeidelSmoother::new(matrix)?))
}

fn dic<S: RuntimeScalar>(
    matrix: &LduMatrix<S>,
) -> Result<Box<dyn LduSmoother<S> + '_>, SmootherError> {
    Ok(Box::new(DicSmoother::new(matrix)?))
}

fn dic_gauss_seidel<S: RuntimeScalar>(
    matrix: &LduMatrix<S>,
) -> Result<Box<dyn LduSmoother<S> + '_>, SmootherError> {
    Ok(Box::new(DicGaussSeidelSmoother::new(matrix)?))
}

fn dilu<S: RuntimeScalar>(
    matrix: &LduMatrix<S>,
) -> Result<Box<dyn LduSmoother<S> + '_>, SmootherError> {
    Ok(Box::new(DiluSmoother::new(matrix)?))
}

impl<S: RuntimeScalar> SmootherRegistry<S> {
    /// 空注册表
    pub fn empty() -> Self {
        Self {
            symmetric: BTreeMap::new(),
            asymmetric: BTreeMap::new(),
        }
    }

    /// 含全部内置光顺器的注册表
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register("GaussSeidel", Applicability::Both, gauss_seidel::<S>);
        registry.register("symGaussSeidel", Applicability::Both, sym_gauss_seidel::<S>);
        registry.register("DIC", Applicability::Symmetric, dic::<S>);
        registry.register("DICGaussSeidel", Applicability::Symmetric, dic_gauss_seidel::<S>);
        registry.register("DILU", Applicability::Asymmetric, dilu::<S>);
        registry
    }

    /// 注册光顺器，同名条目被替换
    pub fn register<F>(&mut self, name: &str, applicability: Applicability, factory: F)
    where
        F: for<'a> Fn(&'a LduMatrix<S>) -> Result<Box<dyn LduSmoother<S> + 'a>, SmootherError>
            + Send
            + Sync
            + 'static,
    {
        let factory: SmootherFactory<S> = Arc::new(factory);
        if applicability != Applicability::Asymmetric {
            self.symmetric.insert(name.to_string(), factory.clone());
        }
        if applicability != Applicability::Symmetric {
            self.asymmetric.insert(name.to_string(), factory);
        }
    }

    /// 适用于给定矩阵类别的光顺器名称
    pub fn names(&self, symmetric: bool) -> Vec<String> {
        let table = if symmetric { &self.symmetric } else { &self.asymmetric };
        table.keys().cloned().collect()
    }

    /// 为矩阵构造光顺器
    pub fn create<'a>(
        &self,
        name: &str,
        matrix: &'a LduMatrix<S>,
    ) -> Result<Box<dyn LduSmoother<S> + 'a>, SmootherError> {
        let symmetric = matrix.is_symmetric();
        let table = if symmetric { &self.symmetric } else { &self.asymmetric };
        match table.get(name) {
            Some(factory) => {
                log::debug!("构造光顺器 {}", name);
                factory(matrix)
            }
            None => Err(SmootherError::Unknown {
                name: name.to_string(),
                kind: if symmetric { "对称" } else { "非对称" },
                available: self.names(symmetric),
            }),
        }
    }
}
