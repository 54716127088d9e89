// apps/ff_cli/src/commands/solve.rs

//! 求解命令
//!
//! 在 nx × ny × nz 块网格上组装扩散矩阵（非对角 -1，对角为负行和，
//! 首单元对角加 1 以固定解），用已知解构造源项后求解并报告误差。

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use clap::Args;
use ff_config::{LinearSolverConfig, SolverSettings};
use ff_linalg::{BlockMesh, CoupledInterfaces, LduAddressing, LduMatrix, SolverRegistry};
use ff_runtime::RuntimeScalar;
use num_traits::ToPrimitive;
use serde::Serialize;
use tracing::{info, warn};

/// 求解参数
#[derive(Args)]
pub struct SolveArgs {
    /// 求解器配置文件（JSON，含 `solvers` 表）
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 场名称（用于在配置文件中查找条目）
    #[arg(long, default_value = "p")]
    pub field: String,

    /// x 方向单元数
    #[arg(long, default_value = "20")]
    pub nx: usize,

    /// y 方向单元数
    #[arg(long, default_value = "20")]
    pub ny: usize,

    /// z 方向单元数
    #[arg(long, default_value = "1")]
    pub nz: usize,

    /// 求解器名称（无配置文件时使用）
    #[arg(long, default_value = "PCG")]
    pub solver: String,

    /// 光顺器名称
    #[arg(long, default_value = "GaussSeidel")]
    pub smoother: String,

    /// 预条件器名称
    #[arg(long, default_value = "DIC")]
    pub preconditioner: String,

    /// 绝对容差
    #[arg(long, default_value = "1e-8")]
    pub tolerance: f64,

    /// 相对容差
    #[arg(long, default_value = "0.0")]
    pub rel_tol: f64,

    /// 最大迭代次数
    #[arg(long, default_value = "1000")]
    pub max_iter: usize,

    /// 每次光顺的扫描次数
    #[arg(long, default_value = "1")]
    pub sweeps: usize,

    /// 使用 f32 精度
    #[arg(long)]
    pub f32: bool,

    /// 以 JSON 输出求解性能
    #[arg(long)]
    pub json: bool,
}

impl SolveArgs {
    fn solver_config(&self) -> Result<LinearSolverConfig> {
        match &self.config {
            Some(path) => {
                let settings = SolverSettings::from_file(path)
                    .with_context(|| format!("加载配置失败: {}", path.display()))?;
                Ok(settings.for_field(&self.field)?.clone())
            }
            None => Ok(LinearSolverConfig {
                solver: self.solver.clone(),
                smoother: self.smoother.clone(),
                preconditioner: self.preconditioner.clone(),
                tolerance: self.tolerance,
                rel_tol: self.rel_tol,
                max_iter: self.max_iter,
                min_iter: 0,
                n_sweeps: self.sweeps,
            }),
        }
    }
}

/// 执行求解命令
pub fn execute(args: SolveArgs) -> Result<()> {
    let config = args.solver_config()?;
    config.validate()?;

    info!("=== FaceFlow 求解 ===");
    info!("网格: {} × {} × {}", args.nx, args.ny, args.nz);
    info!("求解器: {:?}", config);

    if args.f32 {
        info!("使用精度: f32");
        run::<f32>(&args, &config)
    } else {
        info!("使用精度: f64");
        run::<f64>(&args, &config)
    }
}

fn scalar<S: RuntimeScalar>(value: f64) -> Result<S> {
    S::from_config(value).ok_or_else(|| anyhow!("{} 超出当前精度范围", value))
}

fn run<S: RuntimeScalar + Serialize>(args: &SolveArgs, config: &LinearSolverConfig) -> Result<()> {
    let mesh = BlockMesh::new(args.nx, args.ny, args.nz);
    let addressing = Arc::new(LduAddressing::from_mesh(&mesh)?);
    let n_cells = addressing.n_cells();
    let n_faces = addressing.n_faces();

    let mut matrix =
        LduMatrix::symmetric(addressing, vec![S::ZERO; n_cells], vec![-S::ONE; n_faces])?;
    matrix.neg_sum_diag();
    matrix.diag_mut()[0] += S::ONE;

    // 已知解 x_i = 1 + sin(0.37 i)
    let exact = (0..n_cells)
        .map(|i| scalar::<S>(1.0 + (i as f64 * 0.37).sin()))
        .collect::<Result<Vec<S>>>()?;
    let mut source = vec![S::ZERO; n_cells];
    matrix.amul_faces(&exact, &mut source);

    let registry = SolverRegistry::<S>::with_defaults();
    let mut psi = vec![S::ZERO; n_cells];
    let start = Instant::now();
    let perf = registry.solve(
        &matrix,
        &mut psi,
        &source,
        &mut CoupledInterfaces::new(),
        config,
        &args.field,
    )?;
    let elapsed = start.elapsed();

    let max_error = psi
        .iter()
        .zip(&exact)
        .map(|(&p, &x)| (p - x).abs())
        .fold(S::ZERO, |a, b| a.max(b));

    if args.json {
        println!("{}", serde_json::to_string_pretty(&perf)?);
    } else {
        println!("{}", perf);
    }
    println!("最大误差: {:.3e}", max_error.to_f64().unwrap_or(f64::NAN));
    println!("耗时: {:.3} ms", elapsed.as_secs_f64() * 1e3);

    if !perf.converged() {
        warn!("{} 未收敛 ({:?})", args.field, perf.status);
    }
    Ok(())
}
