// crates/ff_linalg/src/interfaces/processor.rs

//! 处理器接口
//!
//! 两个分区（通常位于不同线程）之间的耦合。发送阶段把本侧接口
//! 单元的值连同序号送入通道，不阻塞；接收阶段以超时等待对端数据，
//! 并检查序号和长度。
//!
//! 通道使用 `std::sync::mpsc`，两端均先发后收，不会互相等待。

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

use ff_runtime::RuntimeScalar;

use super::{accumulate, ExchangeHandle, InterfaceError, LduInterface};

/// 默认接收超时
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// 接口消息
#[derive(Debug)]
struct InterfaceMessage<S> {
    tag: u64,
    values: Vec<S>,
}

/// 处理器接口的一侧
pub struct ProcessorInterface<S: RuntimeScalar> {
    name: String,
    face_cells: Vec<usize>,
    sender: Sender<InterfaceMessage<S>>,
    receiver: Receiver<InterfaceMessage<S>>,
    next_tag: u64,
    timeout: Duration,
}

impl<S: RuntimeScalar> std::fmt::Debug for ProcessorInterface<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessorInterface")
            .field("name", &self.name)
            .field("n_faces", &self.face_cells.len())
            .field("next_tag", &self.next_tag)
            .finish()
    }
}

impl<S: RuntimeScalar> ProcessorInterface<S> {
    /// 创建一对相连的处理器接口
    ///
    /// `cells_a[i]` 与 `cells_b[i]` 通过同一个接口面耦合。
    pub fn pair(
        cells_a: Vec<usize>,
        cells_b: Vec<usize>,
    ) -> Result<(Self, Self), InterfaceError> {
        if cells_a.len() != cells_b.len() {
            return Err(InterfaceError::SizeMismatch {
                name: "processor".to_string(),
                expected: cells_a.len(),
                actual: cells_b.len(),
            });
        }
        let (tx_ab, rx_ab) = mpsc::channel();
        let (tx_ba, rx_ba) = mpsc::channel();

        let a = Self {
            name: "processor_a_to_b".to_string(),
            face_cells: cells_a,
            sender: tx_ab,
            receiver: rx_ba,
            next_tag: 0,
            timeout: DEFAULT_TIMEOUT,
        };
        let b = Self {
            name: "processor_b_to_a".to_string(),
            face_cells: cells_b,
            sender: tx_ba,
            receiver: rx_ab,
            next_tag: 0,
            timeout: DEFAULT_TIMEOUT,
        };
        Ok((a, b))
    }

    /// 设置名称
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// 设置接收超时
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// 接收超时
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl<S: RuntimeScalar> LduInterface<S> for ProcessorInterface<S> {
    fn name(&self) -> &str {
        &self.name
    }

    fn face_cells(&self) -> &[usize] {
        &self.face_cells
    }

    fn is_remote(&self) -> bool {
        true
    }

    fn init_interface_update(&mut self, psi: &[S]) -> Result<ExchangeHandle, InterfaceError> {
        if let Some(&cell) = self.face_cells.iter().find(|&&c| c >= psi.len()) {
            return Err(InterfaceError::CellOutOfRange {
                name: self.name.clone(),
                cell,
                n_cells: psi.len(),
            });
        }
        let tag = self.next_tag;
        self.next_tag += 1;

        let values = self.face_cells.iter().map(|&c| psi[c]).collect();
        self.sender
            .send(InterfaceMessage { tag, values })
            .map_err(|_| InterfaceError::Disconnected {
                name: self.name.clone(),
            })?;

        log::trace!("接口 {} 发送 #{}", self.name, tag);
        Ok(ExchangeHandle::new(tag))
    }

    fn update_interface_matrix(
        &mut self,
        handle: ExchangeHandle,
        _psi: &[S],
        coeffs: &[S],
        sign: S,
        result: &mut [S],
    ) -> Result<(), InterfaceError> {
        let message = self.receiver.recv_timeout(self.timeout).map_err(|e| match e {
            RecvTimeoutError::Timeout => InterfaceError::Timeout {
                name: self.name.clone(),
                timeout_ms: self.timeout.as_millis(),
            },
            RecvTimeoutError::Disconnected => InterfaceError::Disconnected {
                name: self.name.clone(),
            },
        })?;

        if message.tag != handle.tag() {
            return Err(InterfaceError::TagMismatch {
                name: self.name.clone(),
                expected: handle.tag(),
                actual: message.tag,
            });
        }
        if message.values.len() != self.face_cells.len() {
            return Err(InterfaceError::SizeMismatch {
                name: self.name.clone(),
                expected: self.face_cells.len(),
                actual: message.values.len(),
            });
        }

        log::trace!("接口 {} 接收 #{}", self.name, message.tag);
        accumulate(&self.name, &self.face_cells, coeffs, &message.values, sign, result)
    }
}
