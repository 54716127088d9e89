// crates/ff_linalg/src/dense/mod.rs

//! 小型稠密矩阵工具
//!
//! 用于张量或小规模矩阵的特征分解，基于 nalgebra 的 `DMatrix<f64>`。

pub mod eigen;

pub use eigen::{EigenError, EigenMatrix, MAX_ITERATIONS_PER_EIGENVALUE};
