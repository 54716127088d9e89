// crates/ff_linalg/src/interfaces/mod.rs

//! 耦合接口
//!
//! 处理器边界、周期边界等非局部耦合向矩阵乘积和光顺扫描提供
//! "幽灵"贡献。交换分两阶段进行：
//!
//! 1. [`LduInterface::init_interface_update`]: 发出本侧接口单元的值，
//!    返回必须被消费的 [`ExchangeHandle`]
//! 2. [`LduInterface::update_interface_matrix`]: 以句柄完成接收（阻塞等待），
//!    并累加 `result[face_cells[i]] += sign * coeffs[i] * psi_nbr[i]`
//!
//! [`CoupledInterfaces`] 先发出全部接口的发送，再逐一完成接收，
//! 使通信与本地计算重叠。
//!
//! # 系数符号约定
//!
//! 接口边界系数 `bou_coeffs` 按"源项"记号存储：矩阵乘积 A·ψ 中
//! 对应行获得 `-bou_coeffs[i] * psi_nbr[i]`。

pub mod cyclic;
pub mod processor;

pub use cyclic::CyclicInterface;
pub use processor::ProcessorInterface;

use ff_runtime::RuntimeScalar;
use thiserror::Error;

// =============================================================================
// 错误类型
// =============================================================================

/// 接口错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InterfaceError {
    /// 对端已断开
    #[error("接口 '{name}' 的对端已断开")]
    Disconnected {
        /// 接口名称
        name: String,
    },

    /// 等待对端数据超时
    #[error("接口 '{name}' 等待对端数据超时 ({timeout_ms} ms)")]
    Timeout {
        /// 接口名称
        name: String,
        /// 超时时长
        timeout_ms: u128,
    },

    /// 消息序号不匹配
    #[error("接口 '{name}' 消息序号不匹配: 期望 {expected}, 实际 {actual}")]
    TagMismatch {
        /// 接口名称
        name: String,
        /// 期望序号
        expected: u64,
        /// 实际序号
        actual: u64,
    },

    /// 数据长度不匹配
    #[error("接口 '{name}' 数据长度不匹配: 期望 {expected}, 实际 {actual}")]
    SizeMismatch {
        /// 接口名称
        name: String,
        /// 期望长度
        expected: usize,
        /// 实际长度
        actual: usize,
    },

    /// 接口单元索引越界
    #[error("接口 '{name}' 单元索引 {cell} 超出范围 0..{n_cells}")]
    CellOutOfRange {
        /// 接口名称
        name: String,
        /// 单元索引
        cell: usize,
        /// 单元数量
        n_cells: usize,
    },
}

// =============================================================================
// 交换句柄
// =============================================================================

/// 未完成的接口交换
///
/// 由 `init_interface_update` 返回，只能由同一接口的
/// `update_interface_matrix` 消费。
#[must_use = "交换句柄必须通过 update_interface_matrix 完成"]
#[derive(Debug, PartialEq, Eq)]
pub struct ExchangeHandle {
    tag: u64,
}

impl ExchangeHandle {
    pub(crate) fn new(tag: u64) -> Self {
        Self { tag }
    }

    /// 消息序号
    pub fn tag(&self) -> u64 {
        self.tag
    }
}

// =============================================================================
// 接口 trait
// =============================================================================

/// LDU 耦合接口
pub trait LduInterface<S: RuntimeScalar>: Send {
    /// 接口名称
    fn name(&self) -> &str;

    /// 与接口面相邻的本地单元
    fn face_cells(&self) -> &[usize];

    /// 是否耦合不同分区（对端数据来自其他线程或进程）
    fn is_remote(&self) -> bool {
        false
    }

    /// 第一阶段：发出本侧数据
    fn init_interface_update(&mut self, psi: &[S]) -> Result<ExchangeHandle, InterfaceError>;

    /// 第二阶段：完成交换并累加 `sign * coeffs * psi_nbr`
    fn update_interface_matrix(
        &mut self,
        handle: ExchangeHandle,
        psi: &[S],
        coeffs: &[S],
        sign: S,
        result: &mut [S],
    ) -> Result<(), InterfaceError>;
}

/// 接口单元必须落在结果向量范围内
fn check_face_cells(
    name: &str,
    face_cells: &[usize],
    n_cells: usize,
) -> Result<(), InterfaceError> {
    match face_cells.iter().find(|&&c| c >= n_cells) {
        Some(&cell) => Err(InterfaceError::CellOutOfRange {
            name: name.to_string(),
            cell,
            n_cells,
        }),
        None => Ok(()),
    }
}

/// 把接口对端值按系数累加到结果
pub(crate) fn accumulate<S: RuntimeScalar>(
    name: &str,
    face_cells: &[usize],
    coeffs: &[S],
    psi_nbr: &[S],
    sign: S,
    result: &mut [S],
) -> Result<(), InterfaceError> {
    for len in [coeffs.len(), psi_nbr.len()] {
        if len != face_cells.len() {
            return Err(InterfaceError::SizeMismatch {
                name: name.to_string(),
                expected: face_cells.len(),
                actual: len,
            });
        }
    }
    check_face_cells(name, face_cells, result.len())?;
    for ((&cell, &coeff), &pnf) in face_cells.iter().zip(coeffs).zip(psi_nbr) {
        result[cell] += sign * coeff * pnf;
    }
    Ok(())
}

// =============================================================================
// 接口集合
// =============================================================================

/// 接口系数类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterfaceCoeffs {
    /// 边界系数（A·ψ、残差、光顺）
    Boundary,
    /// 内部系数（Aᵀ·ψ）
    Internal,
}

/// 接口及其系数
pub struct CoupledInterface<S: RuntimeScalar> {
    interface: Box<dyn LduInterface<S>>,
    bou_coeffs: Vec<S>,
    int_coeffs: Vec<S>,
}

impl<S: RuntimeScalar> CoupledInterface<S> {
    /// 接口
    pub fn interface(&self) -> &dyn LduInterface<S> {
        self.interface.as_ref()
    }

    /// 边界系数
    pub fn bou_coeffs(&self) -> &[S] {
        &self.bou_coeffs
    }

    /// 内部系数
    pub fn int_coeffs(&self) -> &[S] {
        &self.int_coeffs
    }
}

/// 矩阵的全部耦合接口
pub struct CoupledInterfaces<S: RuntimeScalar> {
    entries: Vec<CoupledInterface<S>>,
}

impl<S: RuntimeScalar> Default for CoupledInterfaces<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: RuntimeScalar> std::fmt::Debug for CoupledInterfaces<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|e| e.interface.name()))
            .finish()
    }
}

impl<S: RuntimeScalar> CoupledInterfaces<S> {
    /// 空集合（无耦合）
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// 添加接口
    ///
    /// 边界与内部系数长度必须等于接口面数。
    pub fn push(
        &mut self,
        interface: Box<dyn LduInterface<S>>,
        bou_coeffs: Vec<S>,
        int_coeffs: Vec<S>,
    ) -> Result<(), InterfaceError> {
        let n = interface.face_cells().len();
        for len in [bou_coeffs.len(), int_coeffs.len()] {
            if len != n {
                return Err(InterfaceError::SizeMismatch {
                    name: interface.name().to_string(),
                    expected: n,
                    actual: len,
                });
            }
        }
        self.entries.push(CoupledInterface {
            interface,
            bou_coeffs,
            int_coeffs,
        });
        Ok(())
    }

    /// 接口数量
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 是否无接口
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 遍历接口
    pub fn iter(&self) -> impl Iterator<Item = &CoupledInterface<S>> {
        self.entries.iter()
    }

    /// 是否含有跨分区接口
    pub fn has_remote(&self) -> bool {
        self.entries.iter().any(|e| e.interface.is_remote())
    }

    /// 检查接口单元索引是否在矩阵范围内
    pub fn check_cells(&self, n_cells: usize) -> Result<(), InterfaceError> {
        for entry in &self.entries {
            check_face_cells(entry.interface.name(), entry.interface.face_cells(), n_cells)?;
        }
        Ok(())
    }

    /// 第一阶段：对全部接口发出数据
    pub fn init_matrix_interfaces(
        &mut self,
        psi: &[S],
    ) -> Result<Vec<ExchangeHandle>, InterfaceError> {
        self.entries
            .iter_mut()
            .map(|entry| entry.interface.init_interface_update(psi))
            .collect()
    }

    /// 第二阶段：按发送顺序完成全部交换
    pub fn update_matrix_interfaces(
        &mut self,
        handles: Vec<ExchangeHandle>,
        psi: &[S],
        coeffs: InterfaceCoeffs,
        sign: S,
        result: &mut [S],
    ) -> Result<(), InterfaceError> {
        debug_assert_eq!(handles.len(), self.entries.len());
        for (entry, handle) in self.entries.iter_mut().zip(handles) {
            let c = match coeffs {
                InterfaceCoeffs::Boundary => &entry.bou_coeffs,
                InterfaceCoeffs::Internal => &entry.int_coeffs,
            };
            entry
                .interface
                .update_interface_matrix(handle, psi, c, sign, result)?;
        }
        Ok(())
    }

    /// 完整交换（两个阶段连续执行）
    pub fn exchange(
        &mut self,
        psi: &[S],
        coeffs: InterfaceCoeffs,
        sign: S,
        result: &mut [S],
    ) -> Result<(), InterfaceError> {
        if self.entries.is_empty() {
            return Ok(());
        }
        let handles = self.init_matrix_interfaces(psi)?;
        self.update_matrix_interfaces(handles, psi, coeffs, sign, result)
    }

    /// 把边界系数按 `sign` 累加到接口单元
    pub fn add_bou_coeffs(&self, sign: S, result: &mut [S]) -> Result<(), InterfaceError> {
        self.check_cells(result.len())?;
        for entry in &self.entries {
            for (&cell, &coeff) in entry.interface.face_cells().iter().zip(&entry.bou_coeffs) {
                result[cell] += sign * coeff;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_size_check() {
        let mut set = CoupledInterfaces::<f64>::new();
        let (a, _b) = CyclicInterface::pair(vec![0, 1], vec![2, 3]).unwrap();
        let err = set.push(Box::new(a), vec![1.0], vec![1.0, 1.0]).unwrap_err();
        assert!(matches!(err, InterfaceError::SizeMismatch { expected: 2, actual: 1, .. }));
        assert!(set.is_empty());
    }

    #[test]
    fn test_check_cells() {
        let mut set = CoupledInterfaces::<f64>::new();
        let (a, _b) = CyclicInterface::pair(vec![0, 5], vec![2, 3]).unwrap();
        set.push(Box::new(a), vec![1.0; 2], vec![1.0; 2]).unwrap();
        assert!(set.check_cells(6).is_ok());
        assert!(matches!(
            set.check_cells(4),
            Err(InterfaceError::CellOutOfRange { cell: 5, .. })
        ));
    }

    #[test]
    fn test_exchange_accumulates_with_sign() {
        let mut set = CoupledInterfaces::<f64>::new();
        let (a, b) = CyclicInterface::pair(vec![0], vec![3]).unwrap();
        set.push(Box::new(a), vec![2.0], vec![0.5]).unwrap();
        set.push(Box::new(b), vec![2.0], vec![0.5]).unwrap();

        let psi = vec![1.0, 0.0, 0.0, 10.0];
        let mut result = vec![0.0; 4];
        set.exchange(&psi, InterfaceCoeffs::Boundary, -1.0, &mut result).unwrap();
        assert_eq!(result, vec![-20.0, 0.0, 0.0, -2.0]);

        let mut result = vec![0.0; 4];
        set.exchange(&psi, InterfaceCoeffs::Internal, 1.0, &mut result).unwrap();
        assert_eq!(result, vec![5.0, 0.0, 0.0, 0.5]);
    }

    #[test]
    fn test_add_bou_coeffs() {
        let mut set = CoupledInterfaces::<f64>::new();
        let (a, _b) = CyclicInterface::pair(vec![1, 1], vec![0, 2]).unwrap();
        set.push(Box::new(a), vec![1.5, 0.5], vec![0.0; 2]).unwrap();
        let mut result = vec![0.0; 3];
        set.add_bou_coeffs(-1.0, &mut result).unwrap();
        assert_eq!(result, vec![0.0, -2.0, 0.0]);
    }

    #[test]
    fn test_has_remote() {
        let mut set = CoupledInterfaces::<f64>::new();
        let (a, b) = CyclicInterface::pair(vec![0], vec![3]).unwrap();
        set.push(Box::new(a), vec![1.0], vec![1.0]).unwrap();
        set.push(Box::new(b), vec![1.0], vec![1.0]).unwrap();
        assert!(!set.has_remote());

        let (left, _right) = ProcessorInterface::<f64>::pair(vec![1], vec![0]).unwrap();
        set.push(Box::new(left), vec![1.0], vec![1.0]).unwrap();
        assert!(set.has_remote());
    }

    #[test]
    fn test_face_cell_out_of_range_is_error() {
        let mut set = CoupledInterfaces::<f64>::new();
        let cyclic = CyclicInterface::new("c", vec![9], vec![0]).unwrap();
        set.push(Box::new(cyclic), vec![1.0], vec![1.0]).unwrap();

        let psi = vec![1.0; 4];
        let mut result = vec![0.0; 4];
        let err = set
            .exchange(&psi, InterfaceCoeffs::Boundary, 1.0, &mut result)
            .unwrap_err();
        assert_eq!(
            err,
            InterfaceError::CellOutOfRange { name: "c".to_string(), cell: 9, n_cells: 4 }
        );
        assert!(matches!(
            set.add_bou_coeffs(1.0, &mut result),
            Err(InterfaceError::CellOutOfRange { cell: 9, .. })
        ));
        assert_eq!(result, vec![0.0; 4]);
    }
}
