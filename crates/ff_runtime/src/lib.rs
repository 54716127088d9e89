// crates/ff_runtime/src/lib.rs

//! FaceFlow Runtime Layer (Layer 1)
//!
//! 运行时抽象层，提供标量类型抽象。
//!
//! # 模块概览
//!
//! - [`scalar`]: RuntimeScalar trait（密封，仅 f32/f64 可实现）
//!
//! # 层级架构
//!
//! ```text
//! Layer 4: ff_cli      ─> SolverSettings, Box<dyn LduSolver<f64>>
//! Layer 3: ff_linalg   ─> LduAddressing, LduMatrix<S>, 光顺器, 求解器
//! Layer 2: ff_config   ─> LinearSolverConfig, SolverSettings
//! Layer 1: ff_runtime  ─> RuntimeScalar (本层)
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod scalar;

/// 层级标识
pub const LAYER: u8 = 1;

pub use scalar::RuntimeScalar;
