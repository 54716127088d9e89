// crates/ff_linalg/src/matrix/mod.rs

//! LDU 矩阵
//!
//! 以面为单位存储的稀疏方阵：对角数组按单元，非对角系数按面。
//! `upper[f]` 位于 (lower_addr[f], upper_addr[f])，
//! `lower[f]` 位于 (upper_addr[f], lower_addr[f])。
//!
//! 对称矩阵只保存一份系数（[`OffDiagonal::Symmetric`]）；
//! 对其写入下三角会把矩阵提升为非对称存储。

pub mod operators;

use std::sync::Arc;

use ff_runtime::RuntimeScalar;
use nalgebra::DMatrix;
use thiserror::Error;

use crate::addressing::LduAddressing;
use crate::interfaces::InterfaceError;

/// 矩阵错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatrixError {
    /// 数组长度与寻址不一致
    #[error("数组 {name} 长度不匹配: 期望 {expected}, 实际 {actual}")]
    SizeMismatch {
        /// 数组名称
        name: &'static str,
        /// 期望长度
        expected: usize,
        /// 实际长度
        actual: usize,
    },

    /// 接口交换失败
    #[error(transparent)]
    Interface(#[from] InterfaceError),
}

pub(crate) fn check_len(
    name: &'static str,
    expected: usize,
    actual: usize,
) -> Result<(), MatrixError> {
    if expected == actual {
        Ok(())
    } else {
        Err(MatrixError::SizeMismatch {
            name,
            expected,
            actual,
        })
    }
}

/// 非对角系数所在三角
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaceRole {
    /// (owner, neighbour) 位置
    Upper,
    /// (neighbour, owner) 位置
    Lower,
}

/// 非对角系数存储
#[derive(Debug, Clone, PartialEq)]
pub enum OffDiagonal<S> {
    /// 对称：上下三角共用一份系数
    Symmetric(Vec<S>),
    /// 非对称
    Asymmetric {
        /// 上三角系数
        upper: Vec<S>,
        /// 下三角系数
        lower: Vec<S>,
    },
}

impl<S: RuntimeScalar> OffDiagonal<S> {
    /// 上三角系数
    pub fn upper(&self) -> &[S] {
        match self {
            Self::Symmetric(upper) => upper,
            Self::Asymmetric { upper, .. } => upper,
        }
    }

    /// 下三角系数（对称时与上三角相同）
    pub fn lower(&self) -> &[S] {
        match self {
            Self::Symmetric(upper) => upper,
            Self::Asymmetric { lower, .. } => lower,
        }
    }

    /// 是否对称存储
    pub fn is_symmetric(&self) -> bool {
        matches!(self, Self::Symmetric(_))
    }

    fn len(&self) -> (usize, usize) {
        (self.upper().len(), self.lower().len())
    }
}

/// LDU 稀疏矩阵
#[derive(Debug, Clone)]
pub struct LduMatrix<S: RuntimeScalar> {
    addressing: Arc<LduAddressing>,
    diag: Vec<S>,
    off_diag: OffDiagonal<S>,
}

impl<S: RuntimeScalar> LduMatrix<S> {
    /// 全零对称矩阵
    pub fn zeros(addressing: Arc<LduAddressing>) -> Self {
        let n_cells = addressing.n_cells();
        let n_faces = addressing.n_faces();
        Self {
            addressing,
            diag: vec![S::ZERO; n_cells],
            off_diag: OffDiagonal::Symmetric(vec![S::ZERO; n_faces]),
        }
    }

    /// 对称矩阵
    pub fn symmetric(
        addressing: Arc<LduAddressing>,
        diag: Vec<S>,
        upper: Vec<S>,
    ) -> Result<Self, MatrixError> {
        Self::from_parts(addressing, diag, OffDiagonal::Symmetric(upper))
    }

    /// 非对称矩阵
    pub fn asymmetric(
        addressing: Arc<LduAddressing>,
        diag: Vec<S>,
        upper: Vec<S>,
        lower: Vec<S>,
    ) -> Result<Self, MatrixError> {
        Self::from_parts(addressing, diag, OffDiagonal::Asymmetric { upper, lower })
    }

    /// 由对角与非对角存储构造
    pub fn from_parts(
        addressing: Arc<LduAddressing>,
        diag: Vec<S>,
        off_diag: OffDiagonal<S>,
    ) -> Result<Self, MatrixError> {
        check_len("diag", addressing.n_cells(), diag.len())?;
        let (n_upper, n_lower) = off_diag.len();
        check_len("upper", addressing.n_faces(), n_upper)?;
        check_len("lower", addressing.n_faces(), n_lower)?;
        Ok(Self {
            addressing,
            diag,
            off_diag,
        })
    }

    /// 寻址
    pub fn addressing(&self) -> &LduAddressing {
        &self.addressing
    }

    /// 共享寻址句柄
    pub fn addressing_arc(&self) -> &Arc<LduAddressing> {
        &self.addressing
    }

    /// 单元数
    #[inline]
    pub fn n_cells(&self) -> usize {
        self.diag.len()
    }

    /// 面数
    #[inline]
    pub fn n_faces(&self) -> usize {
        self.off_diag.upper().len()
    }

    /// 对角系数
    pub fn diag(&self) -> &[S] {
        &self.diag
    }

    /// 可变对角系数
    pub fn diag_mut(&mut self) -> &mut [S] {
        &mut self.diag
    }

    /// 上三角系数
    pub fn upper(&self) -> &[S] {
        self.off_diag.upper()
    }

    /// 下三角系数
    pub fn lower(&self) -> &[S] {
        self.off_diag.lower()
    }

    /// 可变上三角系数
    ///
    /// 对称矩阵上修改会同时作用于下三角。
    pub fn upper_mut(&mut self) -> &mut [S] {
        match &mut self.off_diag {
            OffDiagonal::Symmetric(upper) => upper,
            OffDiagonal::Asymmetric { upper, .. } => upper,
        }
    }

    /// 可变下三角系数
    ///
    /// 对称矩阵会先复制一份上三角并转为非对称存储。
    pub fn lower_mut(&mut self) -> &mut [S] {
        if let OffDiagonal::Symmetric(upper) = &mut self.off_diag {
            let upper = std::mem::take(upper);
            let lower = upper.clone();
            self.off_diag = OffDiagonal::Asymmetric { upper, lower };
        }
        match &mut self.off_diag {
            OffDiagonal::Asymmetric { lower, .. } => lower,
            OffDiagonal::Symmetric(upper) => upper,
        }
    }

    /// 非对角存储
    pub fn off_diag(&self) -> &OffDiagonal<S> {
        &self.off_diag
    }

    /// 是否对称存储
    pub fn is_symmetric(&self) -> bool {
        self.off_diag.is_symmetric()
    }

    /// 指定面、指定三角的系数
    #[inline]
    pub fn coeff(&self, face: usize, role: FaceRole) -> S {
        match role {
            FaceRole::Upper => self.off_diag.upper()[face],
            FaceRole::Lower => self.off_diag.lower()[face],
        }
    }

    /// 稠密表示（不含接口）
    pub fn to_dense(&self) -> DMatrix<S> {
        let n = self.n_cells();
        let l = self.addressing.lower_addr();
        let u = self.addressing.upper_addr();
        let upper = self.upper();
        let lower = self.lower();

        let mut dense = DMatrix::from_element(n, n, S::ZERO);
        for (cell, &d) in self.diag.iter().enumerate() {
            dense[(cell, cell)] = d;
        }
        for face in 0..self.n_faces() {
            dense[(l[face], u[face])] += upper[face];
            dense[(u[face], l[face])] += lower[face];
        }
        dense
    }
}
