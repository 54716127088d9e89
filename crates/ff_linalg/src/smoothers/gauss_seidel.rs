// crates/ff_linalg/src/smoothers/gauss_seidel.rs

//! Gauss-Seidel 光顺器
//!
//! 按单元升序扫描。单元 c 的新值
//!
//! ```text
//! ψ_c = (b'_c - Σ_{f ∈ owner(c)} upper[f]·ψ[u[f]]) / diag[c]
//! ```
//!
//! 求得后立即把 `-lower[f]·ψ_c` 分发到 neighbour 的 b'，
//! 使后续单元看到已更新的值。

use ff_runtime::RuntimeScalar;

use super::{check_diagonal, check_fields, fold_interfaces, LduSmoother, SmootherError};
use crate::interfaces::CoupledInterfaces;
use crate::matrix::LduMatrix;

/// 升序扫描
pub(crate) fn forward_sweep<S: RuntimeScalar>(
    matrix: &LduMatrix<S>,
    psi: &mut [S],
    b_prime: &mut [S],
) {
    let addr = matrix.addressing();
    let u = addr.upper_addr();
    let owner_start = addr.owner_start();
    let diag = matrix.diag();
    let upper = matrix.upper();
    let lower = matrix.lower();

    let mut f_end = owner_start[0];
    for cell in 0..diag.len() {
        let f_start = f_end;
        f_end = owner_start[cell + 1];

        let mut psii = b_prime[cell];
        for face in f_start..f_end {
            psii -= upper[face] * psi[u[face]];
        }
        psii /= diag[cell];

        for face in f_start..f_end {
            b_prime[u[face]] -= lower[face] * psii;
        }
        psi[cell] = psii;
    }
}

/// 降序扫描
///
/// 使用前向扫描累积后的 b'：其中已包含全部 lower 贡献，
/// 只需重新扣除 owner 面的 upper 项。
pub(crate) fn backward_sweep<S: RuntimeScalar>(
    matrix: &LduMatrix<S>,
    psi: &mut [S],
    b_prime: &[S],
) {
    let addr = matrix.addressing();
    let u = addr.upper_addr();
    let owner_start = addr.owner_start();
    let diag = matrix.diag();
    let upper = matrix.upper();

    for cell in (0..diag.len()).rev() {
        let mut psii = b_prime[cell];
        for face in owner_start[cell]..owner_start[cell + 1] {
            psii -= upper[face] * psi[u[face]];
        }
        psi[cell] = psii / diag[cell];
    }
}

/// Gauss-Seidel 光顺器
#[derive(Debug)]
pub struct GaussSeidelSmoother<'a, S: RuntimeScalar> {
    matrix: &'a LduMatrix<S>,
    b_prime: Vec<S>,
}

impl<'a, S: RuntimeScalar> GaussSeidelSmoother<'a, S> {
    /// 创建光顺器，对角元必须全部非零
    pub fn new(matrix: &'a LduMatrix<S>) -> Result<Self, SmootherError> {
        check_diagonal(matrix.diag())?;
        Ok(Self {
            matrix,
            b_prime: vec![S::ZERO; matrix.n_cells()],
        })
    }
}

impl<S: RuntimeScalar> LduSmoother<S> for GaussSeidelSmoother<'_, S> {
    fn name(&self) -> &'static str {
        "GaussSeidel"
    }

    fn smooth(
        &mut self,
        psi: &mut [S],
        source: &[S],
        interfaces: &mut CoupledInterfaces<S>,
        n_sweeps: usize,
    ) -> Result<(), SmootherError> {
        check_fields(self.matrix, psi, source)?;
        for _ in 0..n_sweeps {
            fold_interfaces(interfaces, psi, source, &mut self.b_prime)?;
            forward_sweep(self.matrix, psi, &mut self.b_prime);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addressing::LduAddressing;
    use std::sync::Arc;

    fn tridiag(n: usize) -> LduMatrix<f64> {
        let addr = Arc::new(
            LduAddressing::new(n, (0..n - 1).collect(), (1..n).collect()).unwrap(),
        );
        LduMatrix::symmetric(addr, vec![2.0; n], vec![-1.0; n - 1]).unwrap()
    }

    #[test]
    fn test_single_sweep_by_hand() {
        // [2 -1 0; -1 2 -1; 0 -1 2] ψ = [1, 0, 1], ψ0 = 0
        let m = tridiag(3);
        let mut gs = GaussSeidelSmoother::new(&m).unwrap();
        let mut psi = vec![0.0; 3];
        gs.smooth(&mut psi, &[1.0, 0.0, 1.0], &mut CoupledInterfaces::new(), 1)
            .unwrap();
        // ψ0 = 0.5, ψ1 = 0.25, ψ2 = 0.625
        assert!((psi[0] - 0.5).abs() < 1e-14);
        assert!((psi[1] - 0.25).abs() < 1e-14);
        assert!((psi[2] - 0.625).abs() < 1e-14);
    }

    #[test]
    fn test_exact_solution_is_fixed_point() {
        let m = tridiag(5);
        let x = vec![1.0, 2.0, 3.0, 2.0, 1.0];
        let mut b = vec![0.0; 5];
        m.amul_faces(&x, &mut b);
        let mut psi = x.clone();
        let mut gs = GaussSeidelSmoother::new(&m).unwrap();
        gs.smooth(&mut psi, &b, &mut CoupledInterfaces::new(), 3).unwrap();
        for (p, xi) in psi.iter().zip(&x) {
            assert!((p - xi).abs() < 1e-13);
        }
    }

    #[test]
    fn test_zero_sweeps_is_noop() {
        let m = tridiag(4);
        let mut gs = GaussSeidelSmoother::new(&m).unwrap();
        let mut psi = vec![1.0, -1.0, 2.0, 0.5];
        gs.smooth(&mut psi, &[0.0; 4], &mut CoupledInterfaces::new(), 0).unwrap();
        assert_eq!(psi, vec![1.0, -1.0, 2.0, 0.5]);
    }

    #[test]
    fn test_zero_diagonal_rejected() {
        let mut m = tridiag(4);
        m.diag_mut()[3] = 0.0;
        assert!(matches!(
            GaussSeidelSmoother::new(&m),
            Err(SmootherError::ZeroDiagonal { cell: 3 })
        ));
    }

    #[test]
    fn test_interface_cell_out_of_range() {
        use crate::interfaces::{CyclicInterface, InterfaceError};

        let m = tridiag(4);
        let mut interfaces = CoupledInterfaces::new();
        let cyclic = CyclicInterface::new("c", vec![9], vec![0]).unwrap();
        interfaces.push(Box::new(cyclic), vec![1.0], vec![1.0]).unwrap();
        let mut gs = GaussSeidelSmoother::new(&m).unwrap();
        let mut psi = vec![0.0; 4];
        let err = gs.smooth(&mut psi, &[1.0; 4], &mut interfaces, 1).unwrap_err();
        assert!(matches!(
            err,
            SmootherError::Interface(InterfaceError::CellOutOfRange { cell: 9, .. })
        ));
        assert_eq!(psi, vec![0.0; 4]);
    }

    #[test]
    fn test_size_mismatch() {
        let m = tridiag(4);
        let mut gs = GaussSeidelSmoother::new(&m).unwrap();
        let mut psi = vec![0.0; 3];
        assert!(gs
            .smooth(&mut psi, &[0.0; 4], &mut CoupledInterfaces::new(), 1)
            .is_err());
    }
}
