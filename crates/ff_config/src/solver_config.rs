// crates/ff_config/src/solver_config.rs

//! 线性求解器配置（全 f64）
//!
//! 描述某一场方程使用的求解器、光顺器、预条件器及收敛控制参数。
//! 算法按名称选择，由 `ff_linalg` 的注册表解析；本层只负责
//! 反序列化、默认值与合法性检查。
//!
//! # JSON 示例
//!
//! ```json
//! {
//!   "solvers": {
//!     "p": { "solver": "PCG", "preconditioner": "DIC", "tolerance": 1e-8, "rel_tol": 0.01 },
//!     "U": { "solver": "smoothSolver", "smoother": "symGaussSeidel", "n_sweeps": 2 }
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::ConfigError;

/// 单个场的线性求解器配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearSolverConfig {
    /// 求解器名称（`smoothSolver`、`PCG`）
    #[serde(default = "default_solver")]
    pub solver: String,

    /// 光顺器名称（`smoothSolver` 使用）
    #[serde(default = "default_smoother")]
    pub smoother: String,

    /// 预条件器名称（`PCG` 使用）
    #[serde(default = "default_preconditioner")]
    pub preconditioner: String,

    /// 绝对收敛容差（归一化残差）
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,

    /// 相对收敛容差（相对初始残差，0 表示不使用）
    #[serde(default)]
    pub rel_tol: f64,

    /// 最大迭代次数
    #[serde(default = "default_max_iter")]
    pub max_iter: usize,

    /// 最小迭代次数
    #[serde(default)]
    pub min_iter: usize,

    /// 每次光顺的扫描次数
    #[serde(default = "default_n_sweeps")]
    pub n_sweeps: usize,
}

fn default_solver() -> String { "smoothSolver".to_string() }
fn default_smoother() -> String { "GaussSeidel".to_string() }
fn default_preconditioner() -> String { "DIC".to_string() }
fn default_tolerance() -> f64 { 1e-6 }
fn default_max_iter() -> usize { 1000 }
fn default_n_sweeps() -> usize { 1 }

impl Default for LinearSolverConfig {
    fn default() -> Self {
        Self {
            solver: default_solver(),
            smoother: default_smoother(),
            preconditioner: default_preconditioner(),
            tolerance: default_tolerance(),
            rel_tol: 0.0,
            max_iter: default_max_iter(),
            min_iter: 0,
            n_sweeps: default_n_sweeps(),
        }
    }
}

impl LinearSolverConfig {
    /// 光顺求解器配置
    pub fn smooth(smoother: &str, tolerance: f64, max_iter: usize) -> Self {
        Self {
            solver: "smoothSolver".to_string(),
            smoother: smoother.to_string(),
            tolerance,
            max_iter,
            ..Default::default()
        }
    }

    /// PCG 求解器配置
    pub fn pcg(preconditioner: &str, tolerance: f64, max_iter: usize) -> Self {
        Self {
            solver: "PCG".to_string(),
            preconditioner: preconditioner.to_string(),
            tolerance,
            max_iter,
            ..Default::default()
        }
    }

    /// 设置相对容差
    pub fn with_rel_tol(mut self, rel_tol: f64) -> Self {
        self.rel_tol = rel_tol;
        self
    }

    /// 设置扫描次数
    pub fn with_sweeps(mut self, n_sweeps: usize) -> Self {
        self.n_sweeps = n_sweeps;
        self
    }

    /// 设置最小迭代次数
    pub fn with_min_iter(mut self, min_iter: usize) -> Self {
        self.min_iter = min_iter;
        self
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.solver.trim().is_empty() {
            return Err(ConfigError::Missing("solver".to_string()));
        }
        if !(self.tolerance >= 0.0 && self.tolerance.is_finite()) {
            return Err(ConfigError::invalid(
                "tolerance",
                self.tolerance,
                "容差必须为非负有限值",
            ));
        }
        if !(0.0..1.0).contains(&self.rel_tol) {
            return Err(ConfigError::invalid(
                "rel_tol",
                self.rel_tol,
                "相对容差必须在 [0, 1) 范围内",
            ));
        }
        if self.max_iter == 0 {
            return Err(ConfigError::invalid("max_iter", self.max_iter, "必须为正"));
        }
        if self.min_iter > self.max_iter {
            return Err(ConfigError::invalid(
                "min_iter",
                self.min_iter,
                "不能大于 max_iter",
            ));
        }
        if self.n_sweeps == 0 {
            return Err(ConfigError::invalid("n_sweeps", self.n_sweeps, "必须为正"));
        }
        Ok(())
    }
}

/// 全部场的求解器配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SolverSettings {
    /// 场名 -> 求解器配置
    #[serde(default)]
    pub solvers: BTreeMap<String, LinearSolverConfig>,
}

impl SolverSettings {
    /// 从 JSON 文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&content)
    }

    /// 从 JSON 字符串解析配置
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let settings: SolverSettings =
            serde_json::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// 验证所有条目
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, config) in &self.solvers {
            config.validate().map_err(|e| match e {
                ConfigError::InvalidValue { key, value, reason } => ConfigError::InvalidValue {
                    key: format!("solvers.{}.{}", field, key),
                    value,
                    reason,
                },
                other => other,
            })?;
        }
        Ok(())
    }

    /// 获取场的求解器配置
    pub fn for_field(&self, field: &str) -> Result<&LinearSolverConfig, ConfigError> {
        self.solvers
            .get(field)
            .ok_or_else(|| ConfigError::Missing(format!("solvers.{}", field)))
    }

    /// 插入场配置
    pub fn insert(&mut self, field: impl Into<String>, config: LinearSolverConfig) {
        self.solvers.insert(field.into(), config);
    }
}
