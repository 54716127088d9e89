// crates/ff_linalg/src/matrix/operators.rs

//! LDU 矩阵算子
//!
//! - [`LduMatrix::amul`]: result = A·ψ（含接口）
//! - [`LduMatrix::tmul`]: result = Aᵀ·ψ（含接口）
//! - [`LduMatrix::residual`]: r = b - A·ψ（含接口）
//! - [`LduMatrix::sum_a`]: 行和（含接口边界系数）
//! - [`LduMatrix::sum_mag_off_diag`]: 非对角绝对值行和
//! - [`LduMatrix::neg_sum_diag`]: 对角减去非对角行和
//! - [`LduMatrix::h`]: H 算子 -Σ_offdiag a·ψ
//!
//! 启用 `parallel` 特性且单元数不小于 [`PARALLEL_THRESHOLD`] 时，
//! A·ψ 的本地部分按行并行计算：每行读取 owner 区间的上三角和
//! losort 区间的下三角，行之间无写冲突。

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use ff_runtime::RuntimeScalar;

use super::{check_len, LduMatrix, MatrixError};
use crate::interfaces::{CoupledInterfaces, InterfaceCoeffs};

/// 按行并行的最小单元数
pub const PARALLEL_THRESHOLD: usize = 4096;

impl<S: RuntimeScalar> LduMatrix<S> {
    /// result = A·ψ
    ///
    /// 接口贡献 `-bou_coeffs * psi_nbr` 累加到接口单元。
    pub fn amul(
        &self,
        psi: &[S],
        result: &mut [S],
        interfaces: &mut CoupledInterfaces<S>,
    ) -> Result<(), MatrixError> {
        let n = self.n_cells();
        check_len("psi", n, psi.len())?;
        check_len("result", n, result.len())?;

        // 先发出接口数据，再做本地乘积
        let handles = interfaces.init_matrix_interfaces(psi)?;

        if cfg!(feature = "parallel") && n >= PARALLEL_THRESHOLD {
            self.amul_rows(psi, result);
        } else {
            self.amul_faces(psi, result);
        }

        interfaces.update_matrix_interfaces(
            handles,
            psi,
            InterfaceCoeffs::Boundary,
            -S::ONE,
            result,
        )?;
        Ok(())
    }

    /// 本地 A·ψ，按面循环
    pub fn amul_faces(&self, psi: &[S], result: &mut [S]) {
        let l = self.addressing.lower_addr();
        let u = self.addressing.upper_addr();
        let upper = self.upper();
        let lower = self.lower();

        for ((r, &d), &p) in result.iter_mut().zip(&self.diag).zip(psi) {
            *r = d * p;
        }
        for face in 0..l.len() {
            result[u[face]] += lower[face] * psi[l[face]];
            result[l[face]] += upper[face] * psi[u[face]];
        }
    }

    /// 本地 A·ψ，按行计算（启用 `parallel` 时并行）
    pub fn amul_rows(&self, psi: &[S], result: &mut [S]) {
        let addr = &*self.addressing;
        let u = addr.upper_addr();
        let owner_start = addr.owner_start();
        let losort = addr.losort();
        let losort_start = addr.losort_start();
        let lower_csr = addr.lower_csr_addr();
        let upper = self.upper();
        let lower = self.lower();
        let diag = &self.diag;

        let row = |cell: usize| -> S {
            let mut sum = diag[cell] * psi[cell];
            for face in owner_start[cell]..owner_start[cell + 1] {
                sum += upper[face] * psi[u[face]];
            }
            for k in losort_start[cell]..losort_start[cell + 1] {
                sum += lower[losort[k]] * psi[lower_csr[k]];
            }
            sum
        };

        #[cfg(feature = "parallel")]
        result
            .par_iter_mut()
            .enumerate()
            .for_each(|(cell, r)| *r = row(cell));

        #[cfg(not(feature = "parallel"))]
        for (cell, r) in result.iter_mut().enumerate() {
            *r = row(cell);
        }
    }

    /// result = Aᵀ·ψ
    ///
    /// 接口使用内部系数。
    pub fn tmul(
        &self,
        psi: &[S],
        result: &mut [S],
        interfaces: &mut CoupledInterfaces<S>,
    ) -> Result<(), MatrixError> {
        let n = self.n_cells();
        check_len("psi", n, psi.len())?;
        check_len("result", n, result.len())?;

        let handles = interfaces.init_matrix_interfaces(psi)?;

        let l = self.addressing.lower_addr();
        let u = self.addressing.upper_addr();
        let upper = self.upper();
        let lower = self.lower();
        for ((r, &d), &p) in result.iter_mut().zip(&self.diag).zip(psi) {
            *r = d * p;
        }
        for face in 0..l.len() {
            result[u[face]] += upper[face] * psi[l[face]];
            result[l[face]] += lower[face] * psi[u[face]];
        }

        interfaces.update_matrix_interfaces(
            handles,
            psi,
            InterfaceCoeffs::Internal,
            -S::ONE,
            result,
        )?;
        Ok(())
    }

    /// r = b - A·ψ
    pub fn residual(
        &self,
        psi: &[S],
        source: &[S],
        interfaces: &mut CoupledInterfaces<S>,
        r: &mut [S],
    ) -> Result<(), MatrixError> {
        let n = self.n_cells();
        check_len("psi", n, psi.len())?;
        check_len("source", n, source.len())?;
        check_len("residual", n, r.len())?;

        let handles = interfaces.init_matrix_interfaces(psi)?;

        let l = self.addressing.lower_addr();
        let u = self.addressing.upper_addr();
        let upper = self.upper();
        let lower = self.lower();
        for cell in 0..n {
            r[cell] = source[cell] - self.diag[cell] * psi[cell];
        }
        for face in 0..l.len() {
            r[u[face]] -= lower[face] * psi[l[face]];
            r[l[face]] -= upper[face] * psi[u[face]];
        }

        // A·ψ 中接口项为 -bou·ψ_nbr，残差取反
        interfaces.update_matrix_interfaces(
            handles,
            psi,
            InterfaceCoeffs::Boundary,
            S::ONE,
            r,
        )?;
        Ok(())
    }

    /// 行和 Σ_j A_ij，接口单元减去边界系数
    pub fn sum_a(&self, interfaces: &CoupledInterfaces<S>, result: &mut [S]) -> Result<(), MatrixError> {
        check_len("result", self.n_cells(), result.len())?;

        let l = self.addressing.lower_addr();
        let u = self.addressing.upper_addr();
        let upper = self.upper();
        let lower = self.lower();
        result.copy_from_slice(&self.diag);
        for face in 0..l.len() {
            result[l[face]] += upper[face];
            result[u[face]] += lower[face];
        }
        interfaces.add_bou_coeffs(-S::ONE, result)?;
        Ok(())
    }

    /// 非对角绝对值行和 Σ_{j≠i} |A_ij|
    pub fn sum_mag_off_diag(&self, result: &mut [S]) -> Result<(), MatrixError> {
        check_len("result", self.n_cells(), result.len())?;

        let l = self.addressing.lower_addr();
        let u = self.addressing.upper_addr();
        let upper = self.upper();
        let lower = self.lower();
        result.fill(S::ZERO);
        for face in 0..l.len() {
            result[l[face]] += upper[face].abs();
            result[u[face]] += lower[face].abs();
        }
        Ok(())
    }

    /// 对角减去非对角行和
    ///
    /// 用于由通量系数组装守恒型矩阵：调用后每行之和为零。
    pub fn neg_sum_diag(&mut self) {
        let l = self.addressing.lower_addr();
        let u = self.addressing.upper_addr();
        let upper = self.off_diag.upper();
        let lower = self.off_diag.lower();
        for face in 0..l.len() {
            self.diag[l[face]] -= upper[face];
            self.diag[u[face]] -= lower[face];
        }
    }

    /// H 算子：H(ψ)_i = -Σ_{j≠i} A_ij ψ_j
    pub fn h(&self, psi: &[S]) -> Result<Vec<S>, MatrixError> {
        check_len("psi", self.n_cells(), psi.len())?;

        let l = self.addressing.lower_addr();
        let u = self.addressing.upper_addr();
        let upper = self.upper();
        let lower = self.lower();
        let mut h = vec![S::ZERO; self.n_cells()];
        for face in 0..l.len() {
            h[u[face]] -= lower[face] * psi[l[face]];
            h[l[face]] -= upper[face] * psi[u[face]];
        }
        Ok(h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addressing::LduAddressing;
    use crate::interfaces::{CyclicInterface, InterfaceError};
    use std::sync::Arc;

    fn asym_grid() -> LduMatrix<f64> {
        let addr = Arc::new(
            LduAddressing::new(6, vec![0, 0, 1, 1, 2, 3, 4], vec![1, 3, 2, 4, 5, 4, 5]).unwrap(),
        );
        let upper = vec![-1.0, -2.0, -0.5, -1.5, -1.0, -0.25, -0.75];
        let lower = vec![-0.5, -1.0, -2.0, -0.5, -0.25, -1.0, -1.5];
        let diag = vec![5.0, 6.0, 4.0, 3.0, 4.5, 3.5];
        LduMatrix::asymmetric(addr, diag, upper, lower).unwrap()
    }

    fn dense_mul(m: &LduMatrix<f64>, psi: &[f64]) -> Vec<f64> {
        let d = m.to_dense();
        (0..psi.len())
            .map(|i| (0..psi.len()).map(|j| d[(i, j)] * psi[j]).sum())
            .collect()
    }

    #[test]
    fn test_amul_matches_dense() {
        let m = asym_grid();
        let psi = vec![1.0, -2.0, 0.5, 3.0, -1.0, 2.0];
        let mut result = vec![0.0; 6];
        m.amul(&psi, &mut result, &mut CoupledInterfaces::new()).unwrap();
        for (a, b) in result.iter().zip(dense_mul(&m, &psi)) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_rows_equal_faces() {
        let m = asym_grid();
        let psi = vec![0.3, 1.7, -0.2, 0.9, 2.2, -1.1];
        let mut by_faces = vec![0.0; 6];
        let mut by_rows = vec![0.0; 6];
        m.amul_faces(&psi, &mut by_faces);
        m.amul_rows(&psi, &mut by_rows);
        for (a, b) in by_faces.iter().zip(&by_rows) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_tmul_is_transpose() {
        let m = asym_grid();
        let psi = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let mut result = vec![0.0; 6];
        m.tmul(&psi, &mut result, &mut CoupledInterfaces::new()).unwrap();
        let d = m.to_dense().transpose();
        for i in 0..6 {
            let expected: f64 = (0..6).map(|j| d[(i, j)] * psi[j]).sum();
            assert!((result[i] - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn test_residual_zero_at_solution() {
        let m = asym_grid();
        let psi = vec![1.0, 2.0, -1.0, 0.5, 0.0, 1.5];
        let source = dense_mul(&m, &psi);
        let mut r = vec![1.0; 6];
        m.residual(&psi, &source, &mut CoupledInterfaces::new(), &mut r).unwrap();
        assert!(r.iter().all(|v| v.abs() < 1e-12));
    }

    #[test]
    fn test_sum_a_and_neg_sum_diag() {
        let mut m = asym_grid();
        let mut sum = vec![0.0; 6];
        m.sum_a(&CoupledInterfaces::new(), &mut sum).unwrap();
        let ones = vec![1.0; 6];
        for (a, b) in sum.iter().zip(dense_mul(&m, &ones)) {
            assert!((a - b).abs() < 1e-12);
        }

        m.diag_mut().fill(0.0);
        m.neg_sum_diag();
        m.sum_a(&CoupledInterfaces::new(), &mut sum).unwrap();
        assert!(sum.iter().all(|v| v.abs() < 1e-12));
    }

    #[test]
    fn test_sum_mag_off_diag() {
        let m = asym_grid();
        let mut mag = vec![0.0; 6];
        m.sum_mag_off_diag(&mut mag).unwrap();
        // 单元 0: upper[0], upper[1]
        assert!((mag[0] - 3.0).abs() < 1e-12);
        // 单元 5: lower[4], lower[6]
        assert!((mag[5] - 1.75).abs() < 1e-12);
    }

    #[test]
    fn test_h_operator() {
        let m = asym_grid();
        let psi = vec![1.0, -1.0, 2.0, 0.0, 3.0, 1.0];
        let h = m.h(&psi).unwrap();
        let ax = dense_mul(&m, &psi);
        for cell in 0..6 {
            let expected = m.diag()[cell] * psi[cell] - ax[cell];
            assert!((h[cell] - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn test_amul_with_cyclic_interface() {
        // 周期一维 Laplace：单元 0 与 3 通过接口耦合
        let addr = Arc::new(LduAddressing::new(4, vec![0, 1, 2], vec![1, 2, 3]).unwrap());
        let m = LduMatrix::<f64>::symmetric(addr, vec![2.5; 4], vec![-1.0; 3]).unwrap();
        let (a, b) = CyclicInterface::pair(vec![0], vec![3]).unwrap();
        let mut interfaces = CoupledInterfaces::new();
        interfaces.push(Box::new(a), vec![1.0], vec![1.0]).unwrap();
        interfaces.push(Box::new(b), vec![1.0], vec![1.0]).unwrap();

        let psi = vec![1.0, 2.0, 3.0, 4.0];
        let mut result = vec![0.0; 4];
        m.amul(&psi, &mut result, &mut interfaces).unwrap();
        assert!((result[0] - (2.5 - 2.0 - 4.0)).abs() < 1e-12);
        assert!((result[3] - (10.0 - 3.0 - 1.0)).abs() < 1e-12);

        let mut sum = vec![0.0; 4];
        m.sum_a(&interfaces, &mut sum).unwrap();
        assert!((sum[0] - 0.5).abs() < 1e-12);
        assert!((sum[1] - 0.5).abs() < 1e-12);

        let source = result.clone();
        let mut r = vec![0.0; 4];
        m.residual(&psi, &source, &mut interfaces, &mut r).unwrap();
        assert!(r.iter().all(|v| v.abs() < 1e-12));
    }

    #[test]
    fn test_interface_cell_out_of_range() {
        let addr = Arc::new(LduAddressing::new(4, vec![0, 1, 2], vec![1, 2, 3]).unwrap());
        let m = LduMatrix::<f64>::symmetric(addr, vec![2.0; 4], vec![-1.0; 3]).unwrap();
        let cyclic = CyclicInterface::new("c", vec![9], vec![0]).unwrap();
        let mut interfaces = CoupledInterfaces::new();
        interfaces.push(Box::new(cyclic), vec![1.0], vec![1.0]).unwrap();

        let psi = vec![1.0; 4];
        let mut out = vec![0.0; 4];
        let out_of_range = |e: MatrixError| {
            matches!(
                e,
                MatrixError::Interface(InterfaceError::CellOutOfRange { cell: 9, n_cells: 4, .. })
            )
        };
        assert!(out_of_range(m.sum_a(&interfaces, &mut out).unwrap_err()));
        assert!(out_of_range(m.amul(&psi, &mut out, &mut interfaces).unwrap_err()));
        assert!(out_of_range(m.tmul(&psi, &mut out, &mut interfaces).unwrap_err()));
        assert!(out_of_range(m.residual(&psi, &psi, &mut interfaces, &mut out).unwrap_err()));
    }
}
