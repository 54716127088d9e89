//! 光顺器收敛测试
//!
//! 1-D Poisson（两端 Dirichlet 型对角增强）上各光顺器的收敛行为，
//! 以及按进程划分后经处理器接口耦合的 Gauss-Seidel。

use std::sync::Arc;

use ff_linalg::smoothers::{GaussSeidelSmoother, LduSmoother};
use ff_linalg::vector_ops::sum_mag;
use ff_linalg::{
    CoupledInterfaces, LduAddressing, LduMatrix, ProcessorInterface, SmootherRegistry,
};

fn chain(n: usize) -> Arc<LduAddressing> {
    Arc::new(LduAddressing::new(n, (0..n - 1).collect(), (1..n).collect()).unwrap())
}

/// 端部对角为 3、内部为 2、非对角为 -1
fn poisson_diag(n: usize, first_end: bool, last_end: bool) -> Vec<f64> {
    let mut diag = vec![2.0; n];
    if first_end {
        diag[0] = 3.0;
    }
    if last_end {
        diag[n - 1] = 3.0;
    }
    diag
}

fn poisson(n: usize) -> LduMatrix<f64> {
    LduMatrix::symmetric(chain(n), poisson_diag(n, true, true), vec![-1.0; n - 1]).unwrap()
}

fn exact_solution(m: &LduMatrix<f64>, b: &[f64]) -> Vec<f64> {
    let a = m.to_dense();
    let rhs = nalgebra::DVector::from_column_slice(b);
    let x = a.lu().solve(&rhs).unwrap();
    x.iter().copied().collect()
}

fn residual_norm(m: &LduMatrix<f64>, psi: &[f64], b: &[f64]) -> f64 {
    let mut r = vec![0.0; psi.len()];
    m.residual(psi, b, &mut CoupledInterfaces::new(), &mut r).unwrap();
    sum_mag(&r)
}

#[test]
fn gauss_seidel_residual_decreases_monotonically() {
    let m = poisson(10);
    let b = vec![1.0; 10];
    let exact = exact_solution(&m, &b);

    let mut gs = GaussSeidelSmoother::new(&m).unwrap();
    let mut interfaces = CoupledInterfaces::new();
    let mut psi = vec![0.0; 10];
    let r0 = residual_norm(&m, &psi, &b);
    // 低于该值后残差停在舍入误差水平，不再要求单调
    let floor = 1e-12 * r0;
    let mut previous = r0;
    let mut sweeps = 0;

    while previous > floor {
        assert!(sweeps < 500, "500 次扫描后残差仍为 {}", previous);
        gs.smooth(&mut psi, &b, &mut interfaces, 1).unwrap();
        sweeps += 1;
        let current = residual_norm(&m, &psi, &b);
        assert!(
            current <= previous,
            "第 {} 次扫描残差上升: {} -> {}",
            sweeps,
            previous,
            current
        );
        previous = current;
    }

    // 继续扫描不会离开舍入误差水平
    gs.smooth(&mut psi, &b, &mut interfaces, 200).unwrap();
    assert!(residual_norm(&m, &psi, &b) < 1e3 * floor);
    for (p, x) in psi.iter().zip(&exact) {
        assert!((p - x).abs() < 1e-10);
    }
}

#[test]
fn every_registered_smoother_reduces_residual() {
    let registry = SmootherRegistry::<f64>::with_defaults();
    let b: Vec<f64> = (0..12).map(|i| (i as f64 * 0.7).sin()).collect();

    let sym = poisson(12);
    for name in registry.names(true) {
        let mut smoother = registry.create(&name, &sym).unwrap();
        let mut psi = vec![0.0; 12];
        let r0 = residual_norm(&sym, &psi, &b);
        smoother.smooth(&mut psi, &b, &mut CoupledInterfaces::new(), 20).unwrap();
        let r = residual_norm(&sym, &psi, &b);
        assert!(r < 0.5 * r0, "{}: {} -> {}", name, r0, r);
    }

    let asym = LduMatrix::asymmetric(
        chain(12),
        poisson_diag(12, true, true),
        vec![-1.0; 11],
        vec![-0.6; 11],
    )
    .unwrap();
    for name in registry.names(false) {
        let mut smoother = registry.create(&name, &asym).unwrap();
        let mut psi = vec![0.0; 12];
        let r0 = residual_norm(&asym, &psi, &b);
        smoother.smooth(&mut psi, &b, &mut CoupledInterfaces::new(), 20).unwrap();
        let r = residual_norm(&asym, &psi, &b);
        assert!(r < 0.5 * r0, "{}: {} -> {}", name, r0, r);
    }
}

#[test]
fn partitioned_gauss_seidel_matches_single_domain() {
    // 10 单元一维问题拆为 [0,5) 与 [5,10)，在面 (4,5) 处经处理器接口耦合
    let n = 10;
    let b: Vec<f64> = (0..n).map(|i| 1.0 + 0.1 * i as f64).collect();
    let exact = exact_solution(&poisson(n), &b);

    let half = n / 2;
    let left = LduMatrix::symmetric(chain(half), poisson_diag(half, true, false), vec![-1.0; half - 1])
        .unwrap();
    let right = LduMatrix::symmetric(chain(half), poisson_diag(half, false, true), vec![-1.0; half - 1])
        .unwrap();

    let (to_right, to_left) = ProcessorInterface::<f64>::pair(vec![half - 1], vec![0]).unwrap();

    // 全局 A 中 row 4 的耦合为 -1·ψ5，即边界系数 1
    let mut left_interfaces = CoupledInterfaces::new();
    left_interfaces
        .push(Box::new(to_right), vec![1.0], vec![1.0])
        .unwrap();
    let mut right_interfaces = CoupledInterfaces::new();
    right_interfaces
        .push(Box::new(to_left), vec![1.0], vec![1.0])
        .unwrap();

    let sweeps = 1000;
    let (psi_left, psi_right) = std::thread::scope(|s| {
        let right_task = s.spawn(|| {
            let mut gs = GaussSeidelSmoother::new(&right).unwrap();
            let mut psi = vec![0.0; half];
            gs.smooth(&mut psi, &b[half..], &mut right_interfaces, sweeps).unwrap();
            psi
        });

        let mut gs = GaussSeidelSmoother::new(&left).unwrap();
        let mut psi = vec![0.0; half];
        gs.smooth(&mut psi, &b[..half], &mut left_interfaces, sweeps).unwrap();
        (psi, right_task.join().unwrap())
    });

    let combined: Vec<f64> = psi_left.into_iter().chain(psi_right).collect();
    for (i, (p, x)) in combined.iter().zip(&exact).enumerate() {
        assert!((p - x).abs() < 1e-9, "cell {}: {} vs {}", i, p, x);
    }
}
