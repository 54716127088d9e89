// crates/ff_linalg/src/mesh.rs

//! 结构化块网格拓扑
//!
//! 仅提供 nx × ny × nz 均匀块的单元连接关系，作为 [`LduMesh`] 的
//! 最小实现，供命令行工具和测试组装模型问题。

use crate::addressing::LduMesh;

/// 结构化块网格（仅拓扑）
///
/// 单元编号 `i + nx * (j + ny * k)`，面按 owner 升序、
/// 同一 owner 内按 +x、+y、+z 方向（neighbour 升序）排列。
#[derive(Debug, Clone)]
pub struct BlockMesh {
    dims: [usize; 3],
    owner: Vec<usize>,
    neighbour: Vec<usize>,
}

impl BlockMesh {
    /// 创建块网格，任一方向为 0 时按 1 处理
    pub fn new(nx: usize, ny: usize, nz: usize) -> Self {
        let dims = [nx.max(1), ny.max(1), nz.max(1)];
        let [nx, ny, nz] = dims;
        let n_cells = nx * ny * nz;

        let n_faces = (nx - 1) * ny * nz + nx * (ny - 1) * nz + nx * ny * (nz - 1);
        let mut owner = Vec::with_capacity(n_faces);
        let mut neighbour = Vec::with_capacity(n_faces);

        for cell in 0..n_cells {
            let i = cell % nx;
            let j = (cell / nx) % ny;
            let k = cell / (nx * ny);

            if i + 1 < nx {
                owner.push(cell);
                neighbour.push(cell + 1);
            }
            if j + 1 < ny {
                owner.push(cell);
                neighbour.push(cell + nx);
            }
            if k + 1 < nz {
                owner.push(cell);
                neighbour.push(cell + nx * ny);
            }
        }

        Self { dims, owner, neighbour }
    }

    /// 一维网格
    pub fn line(n: usize) -> Self {
        Self::new(n, 1, 1)
    }

    /// 各方向单元数
    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    /// 内部面数量
    pub fn n_faces(&self) -> usize {
        self.owner.len()
    }
}

impl LduMesh for BlockMesh {
    fn n_cells(&self) -> usize {
        self.dims.iter().product()
    }

    fn owner(&self) -> &[usize] {
        &self.owner
    }

    fn neighbour(&self) -> &[usize] {
        &self.neighbour
    }
}
