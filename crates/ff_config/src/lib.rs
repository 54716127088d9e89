// crates/ff_config/src/lib.rs

//! FaceFlow Config Layer (Layer 2)
//!
//! 配置层，提供线性求解器配置及其校验。
//! 本层完全无泛型，所有数值参数使用 f64，由上层按精度转换。
//!
//! # 模块概览
//!
//! - [`solver_config`]: LinearSolverConfig / SolverSettings
//! - [`error`]: 配置错误类型

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod solver_config;

/// 层级标识
pub const LAYER: u8 = 2;

pub use error::ConfigError;
pub use solver_config::{LinearSolverConfig, SolverSettings};
