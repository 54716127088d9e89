// apps/ff_cli/src/commands/eigen.rs

//! 特征分解命令
//!
//! 输入为 JSON 行数组，例如 `[[2, 1], [1, 2]]`。

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use ff_linalg::EigenMatrix;
use nalgebra::DMatrix;
use tracing::info;

/// 特征分解参数
#[derive(Args)]
pub struct EigenArgs {
    /// 矩阵 JSON 文件
    #[arg(short, long, conflicts_with = "inline")]
    pub matrix: Option<PathBuf>,

    /// 直接给出的矩阵 JSON
    #[arg(long)]
    pub inline: Option<String>,

    /// 强制按对称矩阵处理
    #[arg(long)]
    pub symmetric: bool,

    /// 输出特征向量
    #[arg(long)]
    pub vectors: bool,
}

fn parse_rows(content: &str) -> Result<DMatrix<f64>> {
    let rows: Vec<Vec<f64>> = serde_json::from_str(content).context("解析矩阵 JSON 失败")?;
    let n_rows = rows.len();
    let n_cols = rows.first().map_or(0, Vec::len);
    if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != n_cols) {
        bail!("第 {} 行长度 {} 与首行长度 {} 不一致", i, row.len(), n_cols);
    }
    let data: Vec<f64> = rows.into_iter().flatten().collect();
    Ok(DMatrix::from_row_slice(n_rows, n_cols, &data))
}

/// 执行特征分解命令
pub fn execute(args: EigenArgs) -> Result<()> {
    let content = match (&args.matrix, &args.inline) {
        (Some(path), _) => std::fs::read_to_string(path)
            .with_context(|| format!("读取矩阵文件失败: {}", path.display()))?,
        (None, Some(text)) => text.clone(),
        (None, None) => bail!("需要 --matrix 或 --inline"),
    };
    let a = parse_rows(&content)?;

    let eig = if args.symmetric {
        EigenMatrix::with_symmetry(&a, true)?
    } else {
        EigenMatrix::new(&a)?
    };
    info!(
        "{}×{} 矩阵，{}",
        a.nrows(),
        a.ncols(),
        if eig.is_symmetric() { "对称" } else { "非对称" }
    );

    println!("特征值:");
    for (re, im) in eig.evals_re().iter().zip(eig.evals_im().iter()) {
        if *im == 0.0 {
            println!("  {:.12e}", re);
        } else {
            println!("  {:.12e} {:+.12e}i", re, im);
        }
    }

    if args.vectors {
        println!("特征向量（按列）:");
        if eig.has_complex() {
            let cv = eig.complex_evecs();
            for i in 0..cv.nrows() {
                let row: Vec<String> = cv
                    .row(i)
                    .iter()
                    .map(|c| format!("{:.6e}{:+.6e}i", c.re, c.im))
                    .collect();
                println!("  {}", row.join("  "));
            }
        } else {
            let v = eig.evecs();
            for i in 0..v.nrows() {
                let row: Vec<String> = v.row(i).iter().map(|x| format!("{:.6e}", x)).collect();
                println!("  {}", row.join("  "));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rows() {
        let a = parse_rows("[[1, 2], [3, 4]]").unwrap();
        assert_eq!(a[(0, 1)], 2.0);
        assert_eq!(a[(1, 0)], 3.0);
    }

    #[test]
    fn test_parse_ragged_rows() {
        assert!(parse_rows("[[1, 2], [3]]").is_err());
    }
}
