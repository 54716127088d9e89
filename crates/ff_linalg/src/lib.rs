// crates/ff_linalg/src/lib.rs

//! FaceFlow Linear Algebra Layer (Layer 3)
//!
//! 有限体积离散得到的 LDU 稀疏线性系统核心。
//!
//! # 模块概览
//!
//! - [`addressing`]: 面-单元寻址与派生寻址（losort、ownerStart、带宽）
//! - [`mesh`]: 结构化块网格，提供寻址输入
//! - [`matrix`]: LDU 系数存储与矩阵运算（Amul、Tmul、残差、H 操作）
//! - [`interfaces`]: 耦合边界接口（周期、进程间）
//! - [`smoothers`]: Gauss-Seidel / DIC / DILU 系列光顺器
//! - [`preconditioners`]: 不完全分解与对角预条件器
//! - [`solvers`]: 光顺求解器与 PCG，按名称注册创建
//! - [`dense`]: 小型稠密矩阵特征分解
//! - [`vector_ops`]: 向量归约与线性组合
//!
//! # 设计原则
//!
//! 1. 寻址在 [`LduAddressing`] 中只构建一次，派生数组惰性计算后缓存，
//!    由多个矩阵通过 `Arc` 共享
//! 2. 矩阵对标量类型泛型（`S: RuntimeScalar`），f32/f64 共用一份实现
//! 3. 所有可失败操作返回 `Result`，不在库代码中 panic

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod addressing;
pub mod dense;
pub mod interfaces;
pub mod matrix;
pub mod mesh;
pub mod preconditioners;
pub mod smoothers;
pub mod solvers;
pub mod vector_ops;

/// 层级标识
pub const LAYER: u8 = 3;

pub use addressing::{AddressingError, Band, LduAddressing, LduMesh};
pub use dense::{EigenError, EigenMatrix};
pub use interfaces::{
    CoupledInterface, CoupledInterfaces, CyclicInterface, InterfaceCoeffs, InterfaceError,
    LduInterface, ProcessorInterface,
};
pub use matrix::{LduMatrix, MatrixError};
pub use mesh::BlockMesh;
pub use preconditioners::{create_preconditioner, LduPreconditioner, PreconditionerError};
pub use smoothers::{LduSmoother, SmootherError, SmootherRegistry};
pub use solvers::{
    LduSolver, SolverError, SolverPerformance, SolverRegistry, SolverStatus,
};
