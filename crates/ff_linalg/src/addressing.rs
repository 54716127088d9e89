// crates/ff_linalg/src/addressing.rs

//! LDU 寻址
//!
//! 由内部面的 owner/neighbour 列表派生稀疏矩阵遍历所需的辅助结构。
//!
//! # 约定
//!
//! - 每个内部面 `f` 满足 `owner[f] < neighbour[f]`（上三角排序）
//! - owner 列表非递减
//! - `upper[f]` 位于 (owner[f], neighbour[f])，`lower[f]` 位于 (neighbour[f], owner[f])
//!
//! # 派生结构（按需计算，拓扑变化时由 [`LduAddressing::clear_out`] 一并失效）
//!
//! | 结构 | 长度 | 含义 |
//! |------|------|------|
//! | `owner_start` | n_cells + 1 | 单元作为 owner 的面区间起点 |
//! | `losort` | n_faces | 按 neighbour 排序的面索引置换 |
//! | `losort_start` | n_cells + 1 | 单元作为 neighbour 的 losort 区间起点 |
//! | `lower_csr_addr` | n_faces | 按行（neighbour）排列的下三角列索引 |
//!
//! # 使用示例
//!
//! ```
//! use ff_linalg::addressing::LduAddressing;
//!
//! // 2x2 网格: 0 1 / 2 3
//! let addr = LduAddressing::new(4, vec![0, 0, 1, 2], vec![1, 2, 3, 3]).unwrap();
//! assert_eq!(addr.owner_start(), &[0, 2, 3, 4, 4]);
//! assert_eq!(addr.tri_index(3, 1).unwrap(), 2);
//! ```

use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use thiserror::Error;

// =============================================================================
// 网格拓扑提供者
// =============================================================================

/// 网格拓扑提供者
///
/// 只需提供单元数与内部面的 owner/neighbour 列表。
pub trait LduMesh {
    /// 单元数量
    fn n_cells(&self) -> usize;

    /// 内部面的 owner 单元
    fn owner(&self) -> &[usize];

    /// 内部面的 neighbour 单元
    fn neighbour(&self) -> &[usize];
}

// =============================================================================
// 错误类型
// =============================================================================

/// 寻址错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressingError {
    /// owner 与 neighbour 长度不一致
    #[error("面列表长度不一致: owner={owner}, neighbour={neighbour}")]
    SizeMismatch {
        /// owner 长度
        owner: usize,
        /// neighbour 长度
        neighbour: usize,
    },

    /// 单元索引越界
    #[error("面 {face} 的单元索引 {cell} 超出范围 0..{n_cells}")]
    CellOutOfRange {
        /// 面索引
        face: usize,
        /// 单元索引
        cell: usize,
        /// 单元数量
        n_cells: usize,
    },

    /// 违反 owner < neighbour
    #[error("面 {face} 违反 owner < neighbour: owner={owner}, neighbour={neighbour}")]
    NotUpperTriangular {
        /// 面索引
        face: usize,
        /// owner 单元
        owner: usize,
        /// neighbour 单元
        neighbour: usize,
    },

    /// owner 列表未排序
    #[error("owner 列表未排序: 面 {face} 的 owner={owner} 小于前一面的 owner={previous}")]
    UnsortedOwner {
        /// 面索引
        face: usize,
        /// 当前 owner
        owner: usize,
        /// 前一面的 owner
        previous: usize,
    },

    /// 两单元不相邻
    #[error("单元 {a} 与 {b} 之间不存在面")]
    MissingFace {
        /// 单元 a
        a: usize,
        /// 单元 b
        b: usize,
    },
}

// =============================================================================
// 带宽统计
// =============================================================================

/// 矩阵带宽与轮廓
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Band {
    /// 最大行带宽
    pub bandwidth: usize,
    /// 各行带宽之和
    pub profile: usize,
}

/// 可缓存的派生结构
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressingCache {
    /// owner 起点
    OwnerStart,
    /// losort 置换
    Losort,
    /// losort 起点
    LosortStart,
    /// 下三角 CSR 列索引
    LowerCsr,
}

// =============================================================================
// LduAddressing
// =============================================================================

/// LDU 矩阵寻址
///
/// 原始数据在构造时校验；派生结构首次访问时计算并缓存，
/// 缓存是否存在即为状态本身。
#[derive(Debug, Clone)]
pub struct LduAddressing {
    n_cells: usize,
    lower_addr: Vec<usize>,
    upper_addr: Vec<usize>,
    owner_start: OnceLock<Vec<usize>>,
    losort: OnceLock<Vec<usize>>,
    losort_start: OnceLock<Vec<usize>>,
    lower_csr_addr: OnceLock<Vec<usize>>,
}

impl LduAddressing {
    /// 从 owner/neighbour 列表创建寻址
    ///
    /// # 错误
    ///
    /// - 长度不一致、索引越界
    /// - 某面 owner >= neighbour
    /// - owner 列表不是非递减的
    pub fn new(
        n_cells: usize,
        owner: Vec<usize>,
        neighbour: Vec<usize>,
    ) -> Result<Self, AddressingError> {
        Self::validate(n_cells, &owner, &neighbour)?;

        log::debug!(
            "创建 LDU 寻址: {} 单元, {} 内部面",
            n_cells,
            owner.len()
        );

        Ok(Self {
            n_cells,
            lower_addr: owner,
            upper_addr: neighbour,
            owner_start: OnceLock::new(),
            losort: OnceLock::new(),
            losort_start: OnceLock::new(),
            lower_csr_addr: OnceLock::new(),
        })
    }

    /// 从网格拓扑提供者创建寻址
    pub fn from_mesh<M: LduMesh + ?Sized>(mesh: &M) -> Result<Self, AddressingError> {
        Self::new(mesh.n_cells(), mesh.owner().to_vec(), mesh.neighbour().to_vec())
    }

    fn validate(n_cells: usize, owner: &[usize], neighbour: &[usize]) -> Result<(), AddressingError> {
        if owner.len() != neighbour.len() {
            return Err(AddressingError::SizeMismatch {
                owner: owner.len(),
                neighbour: neighbour.len(),
            });
        }

        let mut previous = 0;
        for (face, (&own, &nbr)) in owner.iter().zip(neighbour.iter()).enumerate() {
            for cell in [own, nbr] {
                if cell >= n_cells {
                    return Err(AddressingError::CellOutOfRange { face, cell, n_cells });
                }
            }
            if own >= nbr {
                return Err(AddressingError::NotUpperTriangular {
                    face,
                    owner: own,
                    neighbour: nbr,
                });
            }
            if own < previous {
                return Err(AddressingError::UnsortedOwner {
                    face,
                    owner: own,
                    previous,
                });
            }
            previous = own;
        }
        Ok(())
    }

    /// 单元数量（矩阵阶数）
    #[inline]
    pub fn n_cells(&self) -> usize {
        self.n_cells
    }

    /// 内部面数量（非对角系数个数）
    #[inline]
    pub fn n_faces(&self) -> usize {
        self.lower_addr.len()
    }

    /// 下三角寻址（owner）
    #[inline]
    pub fn lower_addr(&self) -> &[usize] {
        &self.lower_addr
    }

    /// 上三角寻址（neighbour）
    #[inline]
    pub fn upper_addr(&self) -> &[usize] {
        &self.upper_addr
    }

    /// owner 起点
    ///
    /// 面区间 `[owner_start[c], owner_start[c+1])` 恰为单元 c 拥有的面。
    pub fn owner_start(&self) -> &[usize] {
        self.owner_start.get_or_init(|| self.calc_owner_start())
    }

    /// 按 neighbour 排序的面索引置换
    pub fn losort(&self) -> &[usize] {
        self.losort.get_or_init(|| self.calc_losort())
    }

    /// losort 起点
    ///
    /// `losort[losort_start[c]..losort_start[c+1]]` 恰为 neighbour 为 c 的面。
    pub fn losort_start(&self) -> &[usize] {
        self.losort_start.get_or_init(|| self.calc_losort_start())
    }

    /// 下三角 CSR 列索引
    ///
    /// 第 k 个下三角元素（按行 = neighbour 排列）的列（owner 单元），
    /// 对应系数为 `lower[losort[k]]`。
    pub fn lower_csr_addr(&self) -> &[usize] {
        self.lower_csr_addr.get_or_init(|| self.calc_lower_csr_addr())
    }

    /// 派生结构是否已缓存
    pub fn is_cached(&self, cache: AddressingCache) -> bool {
        match cache {
            AddressingCache::OwnerStart => self.owner_start.get().is_some(),
            AddressingCache::Losort => self.losort.get().is_some(),
            AddressingCache::LosortStart => self.losort_start.get().is_some(),
            AddressingCache::LowerCsr => self.lower_csr_addr.get().is_some(),
        }
    }

    /// 清除全部派生结构（网格拓扑变化后调用）
    pub fn clear_out(&mut self) {
        self.owner_start.take();
        self.losort.take();
        self.losort_start.take();
        self.lower_csr_addr.take();
    }

    /// 替换拓扑并清除派生结构
    pub fn reset(
        &mut self,
        n_cells: usize,
        owner: Vec<usize>,
        neighbour: Vec<usize>,
    ) -> Result<(), AddressingError> {
        Self::validate(n_cells, &owner, &neighbour)?;
        self.n_cells = n_cells;
        self.lower_addr = owner;
        self.upper_addr = neighbour;
        self.clear_out();
        Ok(())
    }

    /// 查找连接单元 a 与 b 的面
    ///
    /// 在 `min(a,b)` 的 owner 区间内搜索 neighbour 为 `max(a,b)` 的面。
    pub fn tri_index(&self, a: usize, b: usize) -> Result<usize, AddressingError> {
        let own = a.min(b);
        let nbr = a.max(b);
        if nbr >= self.n_cells || own == nbr {
            return Err(AddressingError::MissingFace { a, b });
        }

        let own_start = self.owner_start();
        let start = own_start[own];
        let end = own_start[own + 1];

        self.upper_addr[start..end]
            .iter()
            .position(|&u| u == nbr)
            .map(|i| start + i)
            .ok_or(AddressingError::MissingFace { a, b })
    }

    /// 计算矩阵带宽与轮廓
    ///
    /// 行带宽取该行下三角元素的最大列距 `neighbour - owner`。
    pub fn band(&self) -> Band {
        let mut cell_bandwidth = vec![0usize; self.n_cells];

        for (&own, &nbr) in self.lower_addr.iter().zip(self.upper_addr.iter()) {
            let width = nbr - own;
            if width > cell_bandwidth[nbr] {
                cell_bandwidth[nbr] = width;
            }
        }

        Band {
            bandwidth: cell_bandwidth.iter().copied().max().unwrap_or(0),
            profile: cell_bandwidth.iter().sum(),
        }
    }

    // =========================================================================
    // 派生结构计算
    // =========================================================================

    /// 对排序后的单元键做一次扫描，生成区间起点
    fn scan_starts(&self, keys: impl Iterator<Item = usize>) -> Vec<usize> {
        let n_faces = self.n_faces();
        let mut starts = vec![0usize; self.n_cells + 1];
        let mut next = 1;

        for (pos, cell) in keys.enumerate() {
            while next <= cell {
                starts[next] = pos;
                next += 1;
            }
        }
        while next <= self.n_cells {
            starts[next] = n_faces;
            next += 1;
        }
        starts
    }

    fn calc_owner_start(&self) -> Vec<usize> {
        log::trace!("计算 owner_start: {} 单元", self.n_cells);
        self.scan_starts(self.lower_addr.iter().copied())
    }

    fn calc_losort(&self) -> Vec<usize> {
        log::trace!("计算 losort: {} 面", self.n_faces());

        // 计数排序：每个单元作为 neighbour 的面数
        let mut n_nbr_of_cell = vec![0usize; self.n_cells];
        for &nbr in &self.upper_addr {
            n_nbr_of_cell[nbr] += 1;
        }

        let mut cell_nbr_faces: Vec<Vec<usize>> = n_nbr_of_cell
            .iter()
            .map(|&n| Vec::with_capacity(n))
            .collect();
        for (face, &nbr) in self.upper_addr.iter().enumerate() {
            cell_nbr_faces[nbr].push(face);
        }

        let mut losort = Vec::with_capacity(self.n_faces());
        for faces in &cell_nbr_faces {
            losort.extend_from_slice(faces);
        }
        losort
    }

    fn calc_losort_start(&self) -> Vec<usize> {
        log::trace!("计算 losort_start: {} 单元", self.n_cells);
        let upper = &self.upper_addr;
        self.scan_starts(self.losort().iter().map(|&face| upper[face]))
    }

    fn calc_lower_csr_addr(&self) -> Vec<usize> {
        log::trace!("计算 lower_csr_addr: {} 面", self.n_faces());
        let lower = &self.lower_addr;
        self.losort().iter().map(|&face| lower[face]).collect()
    }
}

impl LduMesh for LduAddressing {
    fn n_cells(&self) -> usize {
        self.n_cells
    }

    fn owner(&self) -> &[usize] {
        &self.lower_addr
    }

    fn neighbour(&self) -> &[usize] {
        &self.upper_addr
    }
}
