// apps/ff_cli/src/main.rs

//! FaceFlow 命令行界面
//!
//! 在结构化块网格的模型问题上驱动 LDU 求解器，并提供
//! 寻址带宽统计与稠密矩阵特征分解。
//!
//! # 架构层级
//!
//! 本模块属于 **Layer 4: Application**：
//! - 求解器按名称从 `SolverRegistry` 创建，得到 `Box<dyn LduSolver<S>>`
//! - 精度仅在此层通过 `--f32` 选择

mod commands;

use clap::{Parser, Subcommand};
use tracing::Level;

/// FaceFlow LDU 线性求解器命令行工具
#[derive(Parser)]
#[command(name = "ff_cli")]
#[command(author = "FaceFlow Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "FaceFlow LDU sparse linear solver toolkit", long_about = None)]
struct Cli {
    /// 日志级别 (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 在块网格扩散问题上求解
    Solve(commands::solve::SolveArgs),
    /// 显示块网格寻址的带宽与轮廓
    Band(commands::band::BandArgs),
    /// 稠密矩阵特征分解
    Eigen(commands::eigen::EigenArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // 同时接管库层 `log` 宏输出
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("初始化日志失败: {}", e))?;

    match cli.command {
        Commands::Solve(args) => commands::solve::execute(args),
        Commands::Band(args) => commands::band::execute(args),
        Commands::Eigen(args) => commands::eigen::execute(args),
    }
}
