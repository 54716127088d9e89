// crates/ff_linalg/src/preconditioners.rs

//! 预条件器
//!
//! 预条件器近似 M⁻¹ ≈ A⁻¹，用于 PCG 求解器，核心操作为
//! `apply`: w = M⁻¹ r。
//!
//! # 预条件器类型
//!
//! - [`NoPreconditioner`] (`none`): w = r
//! - [`DiagonalPreconditioner`] (`diagonal`): w = r / diag
//! - [`IncompleteFactorPreconditioner`] (`DIC` / `DILU`): 零填充不完全分解
//!
//! DIC 与 DILU 的分解共用 [`IncompleteFactor`]，DIC/DILU 光顺器也基于它。

use ff_runtime::RuntimeScalar;
use thiserror::Error;

use crate::addressing::LduAddressing;
use crate::matrix::LduMatrix;

/// 预条件器错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreconditionerError {
    /// 分解过程中出现零或非有限主元
    #[error("单元 {cell} 处主元为零或非有限值，无法构造 {name} 分解")]
    ZeroPivot {
        /// 分解名称
        name: &'static str,
        /// 单元索引
        cell: usize,
    },

    /// 未知预条件器
    #[error("未知预条件器 '{name}'，可用: {available:?}")]
    Unknown {
        /// 请求的名称
        name: String,
        /// 可用名称
        available: Vec<&'static str>,
    },
}

/// 预条件器 trait
pub trait LduPreconditioner<S: RuntimeScalar>: Send + Sync {
    /// 应用预条件器: w = M⁻¹ r
    fn apply(&self, r: &[S], w: &mut [S]);

    /// 预条件器名称
    fn name(&self) -> &'static str;
}

fn is_valid_pivot<S: RuntimeScalar>(value: S) -> bool {
    value.is_finite() && value.abs() > S::VSMALL
}

// =============================================================================
// 不完全分解
// =============================================================================

/// 零填充不完全分解 (DIC / DILU)
///
/// 保存倒数对角 rD 以及前代、回代使用的面系数：
/// `forward[f] = rD[u] * lower[f]`、`backward[f] = rD[l] * upper[f]`。
#[derive(Debug, Clone)]
pub struct IncompleteFactor<S: RuntimeScalar> {
    name: &'static str,
    r_d: Vec<S>,
    forward: Vec<S>,
    backward: Vec<S>,
}

impl<S: RuntimeScalar> IncompleteFactor<S> {
    /// 对称矩阵的不完全 Cholesky 分解
    ///
    /// rD[u] -= upper² / rD[l]；对非对称矩阵只使用上三角。
    pub fn dic(matrix: &LduMatrix<S>) -> Result<Self, PreconditionerError> {
        let upper = matrix.upper();
        Self::factorize("DIC", matrix, upper, upper)
    }

    /// 非对称矩阵的不完全 LU 分解
    ///
    /// rD[u] -= upper * lower / rD[l]
    pub fn dilu(matrix: &LduMatrix<S>) -> Result<Self, PreconditionerError> {
        Self::factorize("DILU", matrix, matrix.upper(), matrix.lower())
    }

    fn factorize(
        name: &'static str,
        matrix: &LduMatrix<S>,
        upper: &[S],
        lower: &[S],
    ) -> Result<Self, PreconditionerError> {
        let addr = matrix.addressing();
        let l = addr.lower_addr();
        let u = addr.upper_addr();

        let mut r_d = matrix.diag().to_vec();
        if let Some(cell) = r_d.iter().position(|&d| !is_valid_pivot(d)) {
            return Err(PreconditionerError::ZeroPivot { name, cell });
        }
        // 面按 owner 升序，rD[l] 在用到之前已完成消元
        for face in 0..l.len() {
            let pivot = r_d[l[face]];
            if !is_valid_pivot(pivot) {
                return Err(PreconditionerError::ZeroPivot { name, cell: l[face] });
            }
            r_d[u[face]] -= upper[face] * lower[face] / pivot;
        }
        for (cell, d) in r_d.iter_mut().enumerate() {
            if !is_valid_pivot(*d) {
                return Err(PreconditionerError::ZeroPivot { name, cell });
            }
            *d = S::ONE / *d;
        }

        let forward = (0..l.len()).map(|f| r_d[u[f]] * lower[f]).collect();
        let backward = (0..l.len()).map(|f| r_d[l[f]] * upper[f]).collect();

        log::debug!("{} 分解完成: {} 单元, {} 面", name, r_d.len(), l.len());
        Ok(Self {
            name,
            r_d,
            forward,
            backward,
        })
    }

    /// 分解名称
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// 倒数对角 rD
    pub fn reciprocal_diag(&self) -> &[S] {
        &self.r_d
    }

    /// 原地求解 (LDU)⁻¹ w
    ///
    /// w *= rD，前代 w[u] -= forward·w[l]，逆序回代 w[l] -= backward·w[u]。
    pub fn solve_in_place(&self, addressing: &LduAddressing, w: &mut [S]) {
        let l = addressing.lower_addr();
        let u = addressing.upper_addr();

        for (wi, &rd) in w.iter_mut().zip(&self.r_d) {
            *wi *= rd;
        }
        for face in 0..l.len() {
            w[u[face]] -= self.forward[face] * w[l[face]];
        }
        for face in (0..l.len()).rev() {
            w[l[face]] -= self.backward[face] * w[u[face]];
        }
    }
}

// =============================================================================
// 预条件器实现
// =============================================================================

/// 无预条件
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPreconditioner;

impl<S: RuntimeScalar> LduPreconditioner<S> for NoPreconditioner {
    fn apply(&self, r: &[S], w: &mut [S]) {
        w.copy_from_slice(r);
    }

    fn name(&self) -> &'static str {
        "none"
    }
}

/// 对角预条件
#[derive(Debug, Clone)]
pub struct DiagonalPreconditioner<S: RuntimeScalar> {
    r_diag: Vec<S>,
}

impl<S: RuntimeScalar> DiagonalPreconditioner<S> {
    /// 由矩阵对角构造
    pub fn new(matrix: &LduMatrix<S>) -> Result<Self, PreconditionerError> {
        let r_diag = matrix
            .diag()
            .iter()
            .enumerate()
            .map(|(cell, &d)| {
                if is_valid_pivot(d) {
                    Ok(S::ONE / d)
                } else {
                    Err(PreconditionerError::ZeroPivot {
                        name: "diagonal",
                        cell,
                    })
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { r_diag })
    }
}

impl<S: RuntimeScalar> LduPreconditioner<S> for DiagonalPreconditioner<S> {
    fn apply(&self, r: &[S], w: &mut [S]) {
        debug_assert_eq!(r.len(), self.r_diag.len());
        for ((wi, &ri), &rd) in w.iter_mut().zip(r).zip(&self.r_diag) {
            *wi = ri * rd;
        }
    }

    fn name(&self) -> &'static str {
        "diagonal"
    }
}

/// DIC / DILU 预条件
#[derive(Debug, Clone)]
pub struct IncompleteFactorPreconditioner<'a, S: RuntimeScalar> {
    addressing: &'a LduAddressing,
    factor: IncompleteFactor<S>,
}

impl<'a, S: RuntimeScalar> IncompleteFactorPreconditioner<'a, S> {
    /// DIC 预条件
    pub fn dic(matrix: &'a LduMatrix<S>) -> Result<Self, PreconditionerError> {
        Ok(Self {
            addressing: matrix.addressing(),
            factor: IncompleteFactor::dic(matrix)?,
        })
    }

    /// DILU 预条件
    pub fn dilu(matrix: &'a LduMatrix<S>) -> Result<Self, PreconditionerError> {
        Ok(Self {
            addressing: matrix.addressing(),
            factor: IncompleteFactor::dilu(matrix)?,
        })
    }

    /// 分解
    pub fn factor(&self) -> &IncompleteFactor<S> {
        &self.factor
    }
}

impl<S: RuntimeScalar> LduPreconditioner<S> for IncompleteFactorPreconditioner<'_, S> {
    fn apply(&self, r: &[S], w: &mut [S]) {
        w.copy_from_slice(r);
        self.factor.solve_in_place(self.addressing, w);
    }

    fn name(&self) -> &'static str {
        self.factor.name()
    }
}

/// 可用预条件器名称
pub const PRECONDITIONER_NAMES: [&str; 4] = ["DIC", "DILU", "diagonal", "none"];

/// 按名称创建预条件器
pub fn create_preconditioner<'a, S: RuntimeScalar>(
    name: &str,
    matrix: &'a LduMatrix<S>,
) -> Result<Box<dyn LduPreconditioner<S> + 'a>, PreconditionerError> {
    match name {
        "DIC" => Ok(Box::new(IncompleteFactorPreconditioner::dic(matrix)?)),
        "DILU" => Ok(Box::new(IncompleteFactorPreconditioner::dilu(matrix)?)),
        "diagonal" => Ok(Box::new(DiagonalPreconditioner::new(matrix)?)),
        "none" => Ok(Box::new(NoPreconditioner)),
        other => Err(PreconditionerError::Unknown {
            name: other.to_string(),
            available: PRECONDITIONER_NAMES.to_vec(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn line_matrix(n: usize) -> LduMatrix<f64> {
        let owner: Vec<usize> = (0..n - 1).collect();
        let neighbour: Vec<usize> = (1..n).collect();
        let addr = Arc::new(LduAddressing::new(n, owner, neighbour).unwrap());
        LduMatrix::symmetric(addr, vec![2.0; n], vec![-1.0; n - 1]).unwrap()
    }

    #[test]
    fn test_dic_exact_on_tridiagonal() {
        // 三对角矩阵的零填充分解即精确 Cholesky
        let m = line_matrix(6);
        let precond = IncompleteFactorPreconditioner::dic(&m).unwrap();
        let x = vec![1.0, -2.0, 0.5, 3.0, 1.5, -1.0];
        let mut b = vec![0.0; 6];
        m.amul_faces(&x, &mut b);
        let mut w = vec![0.0; 6];
        precond.apply(&b, &mut w);
        for (wi, xi) in w.iter().zip(&x) {
            assert!((wi - xi).abs() < 1e-12);
        }
    }

    #[test]
    fn test_dic_reciprocal_diagonal() {
        let m = line_matrix(3);
        let factor = IncompleteFactor::dic(&m).unwrap();
        // d0 = 2, d1 = 2 - 1/2 = 1.5, d2 = 2 - 1/1.5
        let rd = factor.reciprocal_diag();
        assert!((rd[0] - 0.5).abs() < 1e-14);
        assert!((rd[1] - 1.0 / 1.5).abs() < 1e-14);
        assert!((rd[2] - 1.0 / (2.0 - 1.0 / 1.5)).abs() < 1e-14);
    }

    #[test]
    fn test_dilu_exact_on_asymmetric_tridiagonal() {
        let mut m = line_matrix(5);
        m.lower_mut().copy_from_slice(&[-0.5, -0.3, -0.8, -0.2]);
        let precond = IncompleteFactorPreconditioner::dilu(&m).unwrap();
        let x = vec![1.0, 2.0, -1.0, 0.5, 0.25];
        let mut b = vec![0.0; 5];
        m.amul_faces(&x, &mut b);
        let mut w = vec![0.0; 5];
        precond.apply(&b, &mut w);
        for (wi, xi) in w.iter().zip(&x) {
            assert!((wi - xi).abs() < 1e-12);
        }
    }

    #[test]
    fn test_zero_pivot_rejected() {
        let mut m = line_matrix(4);
        m.diag_mut()[2] = 0.0;
        assert!(matches!(
            IncompleteFactor::dic(&m),
            Err(PreconditionerError::ZeroPivot { cell: 2, .. })
        ));
        assert!(matches!(
            DiagonalPreconditioner::new(&m),
            Err(PreconditionerError::ZeroPivot { cell: 2, .. })
        ));
    }

    #[test]
    fn test_create_by_name() {
        let m = line_matrix(4);
        for name in PRECONDITIONER_NAMES {
            let p = create_preconditioner(name, &m).unwrap();
            assert_eq!(p.name(), name);
        }
        assert!(matches!(
            create_preconditioner("GAMG", &m),
            Err(PreconditionerError::Unknown { .. })
        ));
    }

    #[test]
    fn test_diagonal_apply() {
        let m = line_matrix(3);
        let p = DiagonalPreconditioner::new(&m).unwrap();
        let mut w = vec![0.0; 3];
        p.apply(&[2.0, 4.0, -6.0], &mut w);
        assert_eq!(w, vec![1.0, 2.0, -3.0]);
    }
}
