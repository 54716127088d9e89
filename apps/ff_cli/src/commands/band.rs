// apps/ff_cli/src/commands/band.rs

//! 寻址带宽命令

use anyhow::Result;
use clap::Args;
use ff_linalg::{BlockMesh, LduAddressing};
use tracing::info;

/// 带宽统计参数
#[derive(Args)]
pub struct BandArgs {
    /// x 方向单元数
    #[arg(long, default_value = "10")]
    pub nx: usize,

    /// y 方向单元数
    #[arg(long, default_value = "10")]
    pub ny: usize,

    /// z 方向单元数
    #[arg(long, default_value = "1")]
    pub nz: usize,
}

/// 执行带宽命令
pub fn execute(args: BandArgs) -> Result<()> {
    let mesh = BlockMesh::new(args.nx, args.ny, args.nz);
    let addressing = LduAddressing::from_mesh(&mesh)?;
    let band = addressing.band();

    info!("块网格 {:?}", mesh.dims());
    println!("单元数: {}", addressing.n_cells());
    println!("内部面数: {}", addressing.n_faces());
    println!("带宽: {}", band.bandwidth);
    println!("轮廓: {}", band.profile);
    Ok(())
}
