// crates/ff_linalg/src/interfaces/cyclic.rs

//! 周期（本地）接口
//!
//! 两侧位于同一分区，对端值直接从同一个 ψ 中读取，交换立即完成。

use ff_runtime::RuntimeScalar;

use super::{accumulate, ExchangeHandle, InterfaceError, LduInterface};

/// 周期接口的一侧
#[derive(Debug, Clone)]
pub struct CyclicInterface {
    name: String,
    face_cells: Vec<usize>,
    nbr_face_cells: Vec<usize>,
    next_tag: u64,
}

impl CyclicInterface {
    /// 创建一侧接口
    ///
    /// `nbr_face_cells[i]` 是与 `face_cells[i]` 耦合的对侧单元。
    pub fn new(
        name: impl Into<String>,
        face_cells: Vec<usize>,
        nbr_face_cells: Vec<usize>,
    ) -> Result<Self, InterfaceError> {
        let name = name.into();
        if face_cells.len() != nbr_face_cells.len() {
            return Err(InterfaceError::SizeMismatch {
                name,
                expected: face_cells.len(),
                actual: nbr_face_cells.len(),
            });
        }
        Ok(Self {
            name,
            face_cells,
            nbr_face_cells,
            next_tag: 0,
        })
    }

    /// 创建一对互为对端的接口
    ///
    /// 两侧面数不同时返回 [`InterfaceError::SizeMismatch`]。
    pub fn pair(
        cells_a: Vec<usize>,
        cells_b: Vec<usize>,
    ) -> Result<(Self, Self), InterfaceError> {
        let a = Self::new("cyclic_a", cells_a.clone(), cells_b.clone())?;
        let b = Self::new("cyclic_b", cells_b, cells_a)?;
        Ok((a, b))
    }

    /// 对侧单元
    pub fn nbr_face_cells(&self) -> &[usize] {
        &self.nbr_face_cells
    }
}

impl<S: RuntimeScalar> LduInterface<S> for CyclicInterface {
    fn name(&self) -> &str {
        &self.name
    }

    fn face_cells(&self) -> &[usize] {
        &self.face_cells
    }

    fn init_interface_update(&mut self, _psi: &[S]) -> Result<ExchangeHandle, InterfaceError> {
        let tag = self.next_tag;
        self.next_tag += 1;
        Ok(ExchangeHandle::new(tag))
    }

    fn update_interface_matrix(
        &mut self,
        handle: ExchangeHandle,
        psi: &[S],
        coeffs: &[S],
        sign: S,
        result: &mut [S],
    ) -> Result<(), InterfaceError> {
        let expected = self.next_tag.wrapping_sub(1);
        if handle.tag() != expected {
            return Err(InterfaceError::TagMismatch {
                name: self.name.clone(),
                expected,
                actual: handle.tag(),
            });
        }
        if let Some(&cell) = self.nbr_face_cells.iter().find(|&&c| c >= psi.len()) {
            return Err(InterfaceError::CellOutOfRange {
                name: self.name.clone(),
                cell,
                n_cells: psi.len(),
            });
        }
        let psi_nbr: Vec<S> = self.nbr_face_cells.iter().map(|&c| psi[c]).collect();
        accumulate(&self.name, &self.face_cells, coeffs, &psi_nbr, sign, result)
    }
}
