// crates/ff_linalg/src/dense/eigen.rs

//! 小型稠密矩阵特征分解
//!
//! - 对称矩阵：Householder 三对角化 (`tred2`) + 隐式 QL (`tql2`)，
//!   特征值升序，虚部恒为零，特征向量正交
//! - 非对称矩阵：Householder 化为上 Hessenberg 形 (`orthes`) +
//!   带位移的实 Schur QR 迭代与回代 (`hqr2`)
//!
//! 非对称情形下复共轭特征值对 λ ± iμ（μ > 0，位于 j, j+1）的特征向量以
//! 实数形式存储：第 j 列为实部，第 j+1 列为虚部，满足
//!
//! ```text
//! A·V = V·D，D 的 2×2 块为 [[λ, μ], [-μ, λ]]
//! ```
//!
//! [`EigenMatrix::complex_evecs`] 将其展开为真正的复特征向量。
//!
//! 每个特征值的迭代次数上限为 [`MAX_ITERATIONS_PER_EIGENVALUE`]，
//! 超出时返回 [`EigenError::NoConvergence`]。

use std::sync::OnceLock;

use nalgebra::{DMatrix, DVector};
use num_complex::Complex64;
use thiserror::Error;

/// 单个特征值的最大迭代次数
pub const MAX_ITERATIONS_PER_EIGENVALUE: usize = 100;

/// 特征分解错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EigenError {
    /// 非方阵
    #[error("特征分解要求方阵，实际为 {rows}×{cols}")]
    NotSquare {
        /// 行数
        rows: usize,
        /// 列数
        cols: usize,
    },

    /// 空矩阵
    #[error("特征分解要求非空矩阵")]
    Empty,

    /// 含 NaN 或无穷
    #[error("矩阵 ({row}, {col}) 处含非有限值")]
    NonFinite {
        /// 行
        row: usize,
        /// 列
        col: usize,
    },

    /// 迭代未收敛
    #[error("第 {index} 个特征值在 {iterations} 次迭代内未收敛")]
    NoConvergence {
        /// 特征值索引
        index: usize,
        /// 已执行的迭代次数
        iterations: usize,
    },
}

/// 特征分解结果
#[derive(Debug, Clone)]
pub struct EigenMatrix {
    symmetric: bool,
    evals_re: DVector<f64>,
    evals_im: DVector<f64>,
    evecs: DMatrix<f64>,
    complex_evecs: OnceLock<DMatrix<Complex64>>,
}

impl EigenMatrix {
    /// 特征分解，按元素精确比较判断对称性
    pub fn new(a: &DMatrix<f64>) -> Result<Self, EigenError> {
        check_input(a)?;
        let n = a.nrows();
        let symmetric = (0..n).all(|j| (0..j).all(|i| a[(i, j)] == a[(j, i)]));
        Self::decompose(a, symmetric, MAX_ITERATIONS_PER_EIGENVALUE)
    }

    /// 特征分解，由调用方声明对称性（不再检查）
    pub fn with_symmetry(a: &DMatrix<f64>, symmetric: bool) -> Result<Self, EigenError> {
        check_input(a)?;
        Self::decompose(a, symmetric, MAX_ITERATIONS_PER_EIGENVALUE)
    }

    fn decompose(
        a: &DMatrix<f64>,
        symmetric: bool,
        max_iterations: usize,
    ) -> Result<Self, EigenError> {
        let mut ws = Workspace::new(a);
        if symmetric {
            ws.tred2();
            ws.tql2(max_iterations)?;
        } else {
            ws.orthes();
            ws.hqr2(max_iterations)?;
        }
        log::trace!(
            "特征分解完成: n = {}, {}",
            ws.n,
            if symmetric { "对称" } else { "非对称" }
        );

        Ok(Self {
            symmetric,
            evals_re: DVector::from_vec(ws.d),
            evals_im: DVector::from_vec(ws.e),
            evecs: ws.v,
            complex_evecs: OnceLock::new(),
        })
    }

    /// 矩阵阶数
    pub fn n(&self) -> usize {
        self.evals_re.len()
    }

    /// 是否按对称路径分解
    pub fn is_symmetric(&self) -> bool {
        self.symmetric
    }

    /// 特征值实部
    pub fn evals_re(&self) -> &DVector<f64> {
        &self.evals_re
    }

    /// 特征值虚部
    pub fn evals_im(&self) -> &DVector<f64> {
        &self.evals_im
    }

    /// 实数形式的特征向量（按列）
    pub fn evecs(&self) -> &DMatrix<f64> {
        &self.evecs
    }

    /// 是否存在复特征值
    pub fn has_complex(&self) -> bool {
        self.evals_im.iter().any(|&im| im != 0.0)
    }

    /// 复特征值
    pub fn evals(&self) -> Vec<Complex64> {
        self.evals_re
            .iter()
            .zip(self.evals_im.iter())
            .map(|(&re, &im)| Complex64::new(re, im))
            .collect()
    }

    /// 复特征向量（首次调用时展开）
    ///
    /// 第 j 列对应特征值 `evals_re[j] + i·evals_im[j]`。
    pub fn complex_evecs(&self) -> &DMatrix<Complex64> {
        self.complex_evecs.get_or_init(|| self.unpack_complex())
    }

    fn unpack_complex(&self) -> DMatrix<Complex64> {
        let n = self.n();
        let v = &self.evecs;
        let mut cv = DMatrix::from_element(n, n, Complex64::new(0.0, 0.0));

        let mut j = 0;
        while j < n {
            if self.evals_im[j] > 0.0 && j + 1 < n {
                for i in 0..n {
                    cv[(i, j)] = Complex64::new(v[(i, j)], v[(i, j + 1)]);
                    cv[(i, j + 1)] = Complex64::new(v[(i, j)], -v[(i, j + 1)]);
                }
                j += 2;
            } else {
                for i in 0..n {
                    cv[(i, j)] = Complex64::new(v[(i, j)], 0.0);
                }
                j += 1;
            }
        }
        cv
    }

    /// 块对角特征值矩阵 D，满足 A·V = V·D
    pub fn block_diagonal(&self) -> DMatrix<f64> {
        let n = self.n();
        let mut d = DMatrix::from_diagonal(&self.evals_re);
        for i in 0..n {
            let im = self.evals_im[i];
            if im > 0.0 && i + 1 < n {
                d[(i, i + 1)] = im;
            } else if im < 0.0 && i > 0 {
                d[(i, i - 1)] = im;
            }
        }
        d
    }
}

fn check_input(a: &DMatrix<f64>) -> Result<(), EigenError> {
    let (rows, cols) = a.shape();
    if rows != cols {
        return Err(EigenError::NotSquare { rows, cols });
    }
    if rows == 0 {
        return Err(EigenError::Empty);
    }
    for col in 0..cols {
        for row in 0..rows {
            if !a[(row, col)].is_finite() {
                return Err(EigenError::NonFinite { row, col });
            }
        }
    }
    Ok(())
}

/// 稳健复数除法 (xr + i·xi) / (yr + i·yi)
fn cdiv(xr: f64, xi: f64, yr: f64, yi: f64) -> (f64, f64) {
    if yr.abs() > yi.abs() {
        let r = yi / yr;
        let d = yr + r * yi;
        ((xr + r * xi) / d, (xi - r * xr) / d)
    } else {
        let r = yr / yi;
        let d = yi + r * yr;
        ((r * xr + xi) / d, (r * xi - xr) / d)
    }
}

// =============================================================================
// 分解工作区
// =============================================================================

struct Workspace {
    n: usize,
    d: Vec<f64>,
    e: Vec<f64>,
    v: DMatrix<f64>,
    h: DMatrix<f64>,
    ort: Vec<f64>,
}

impl Workspace {
    fn new(a: &DMatrix<f64>) -> Self {
        let n = a.nrows();
        Self {
            n,
            d: vec![0.0; n],
            e: vec![0.0; n],
            v: a.clone(),
            h: a.clone(),
            ort: vec![0.0; n],
        }
    }

    /// 对称 Householder 三对角化
    ///
    /// 结束时 d 为对角，e[1..] 为次对角，v 为累积的正交变换。
    fn tred2(&mut self) {
        let n = self.n;
        let (d, e, v) = (&mut self.d, &mut self.e, &mut self.v);

        for j in 0..n {
            d[j] = v[(n - 1, j)];
        }

        for i in (1..n).rev() {
            let scale: f64 = d[..i].iter().map(|x| x.abs()).sum();
            let mut h = 0.0;

            if scale == 0.0 {
                e[i] = d[i - 1];
                for j in 0..i {
                    d[j] = v[(i - 1, j)];
                    v[(i, j)] = 0.0;
                    v[(j, i)] = 0.0;
                }
            } else {
                // 生成 Householder 向量
                for k in 0..i {
                    d[k] /= scale;
                    h += d[k] * d[k];
                }
                let mut f = d[i - 1];
                let mut g = h.sqrt();
                if f > 0.0 {
                    g = -g;
                }
                e[i] = scale * g;
                h -= f * g;
                d[i - 1] = f - g;
                for ej in e[..i].iter_mut() {
                    *ej = 0.0;
                }

                // 对剩余子矩阵做相似变换
                for j in 0..i {
                    f = d[j];
                    v[(j, i)] = f;
                    g = e[j] + v[(j, j)] * f;
                    for k in (j + 1)..i {
                        g += v[(k, j)] * d[k];
                        e[k] += v[(k, j)] * f;
                    }
                    e[j] = g;
                }
                f = 0.0;
                for j in 0..i {
                    e[j] /= h;
                    f += e[j] * d[j];
                }
                let hh = f / (h + h);
                for j in 0..i {
                    e[j] -= hh * d[j];
                }
                for j in 0..i {
                    f = d[j];
                    g = e[j];
                    for k in j..i {
                        v[(k, j)] -= f * e[k] + g * d[k];
                    }
                    d[j] = v[(i - 1, j)];
                    v[(i, j)] = 0.0;
                }
            }
            d[i] = h;
        }

        // 累积变换
        for i in 0..n.saturating_sub(1) {
            v[(n - 1, i)] = v[(i, i)];
            v[(i, i)] = 1.0;
            let h = d[i + 1];
            if h != 0.0 {
                for k in 0..=i {
                    d[k] = v[(k, i + 1)] / h;
                }
                for j in 0..=i {
                    let mut g = 0.0;
                    for k in 0..=i {
                        g += v[(k, i + 1)] * v[(k, j)];
                    }
                    for k in 0..=i {
                        v[(k, j)] -= g * d[k];
                    }
                }
            }
            for k in 0..=i {
                v[(k, i + 1)] = 0.0;
            }
        }
        for j in 0..n {
            d[j] = v[(n - 1, j)];
            v[(n - 1, j)] = 0.0;
        }
        v[(n - 1, n - 1)] = 1.0;
        e[0] = 0.0;
    }

    /// 对称三对角隐式 QL，结束时特征值升序排列
    fn tql2(&mut self, max_iterations: usize) -> Result<(), EigenError> {
        let n = self.n;
        let (d, e, v) = (&mut self.d, &mut self.e, &mut self.v);

        for i in 1..n {
            e[i - 1] = e[i];
        }
        e[n - 1] = 0.0;

        let mut f = 0.0;
        let mut tst1: f64 = 0.0;
        let eps = f64::EPSILON;

        for l in 0..n {
            // 寻找可忽略的次对角元
            tst1 = tst1.max(d[l].abs() + e[l].abs());
            let mut m = l;
            while m < n - 1 && e[m].abs() > eps * tst1 {
                m += 1;
            }

            if m > l {
                let mut iter = 0;
                loop {
                    iter += 1;
                    if iter > max_iterations {
                        return Err(EigenError::NoConvergence {
                            index: l,
                            iterations: max_iterations,
                        });
                    }

                    // 隐式位移
                    let mut g = d[l];
                    let mut p = (d[l + 1] - g) / (2.0 * e[l]);
                    let mut r = p.hypot(1.0);
                    if p < 0.0 {
                        r = -r;
                    }
                    d[l] = e[l] / (p + r);
                    d[l + 1] = e[l] * (p + r);
                    let dl1 = d[l + 1];
                    let mut h = g - d[l];
                    for di in d[(l + 2)..n].iter_mut() {
                        *di -= h;
                    }
                    f += h;

                    // 隐式 QL 变换
                    p = d[m];
                    let mut c = 1.0;
                    let mut c2 = c;
                    let mut c3 = c;
                    let el1 = e[l + 1];
                    let mut s = 0.0;
                    let mut s2 = 0.0;
                    for i in (l..m).rev() {
                        c3 = c2;
                        c2 = c;
                        s2 = s;
                        g = c * e[i];
                        h = c * p;
                        r = p.hypot(e[i]);
                        e[i + 1] = s * r;
                        s = e[i] / r;
                        c = p / r;
                        p = c * d[i] - s * g;
                        d[i + 1] = h + s * (c * g + s * d[i]);

                        for k in 0..n {
                            h = v[(k, i + 1)];
                            v[(k, i + 1)] = s * v[(k, i)] + c * h;
                            v[(k, i)] = c * v[(k, i)] - s * h;
                        }
                    }
                    p = -s * s2 * c3 * el1 * e[l] / dl1;
                    e[l] = s * p;
                    d[l] = c * p;

                    if e[l].abs() <= eps * tst1 {
                        break;
                    }
                }
            }
            d[l] += f;
            e[l] = 0.0;
        }

        // 选择排序，特征向量随之交换
        for i in 0..n.saturating_sub(1) {
            let mut k = i;
            let mut p = d[i];
            for (j, &dj) in d.iter().enumerate().skip(i + 1) {
                if dj < p {
                    k = j;
                    p = dj;
                }
            }
            if k != i {
                d[k] = d[i];
                d[i] = p;
                v.swap_columns(i, k);
            }
        }
        Ok(())
    }

    /// 非对称 Householder 化为上 Hessenberg 形
    fn orthes(&mut self) {
        let n = self.n;
        let (h, v, ort) = (&mut self.h, &mut self.v, &mut self.ort);
        let low = 0;
        let high = n - 1;

        for m in (low + 1)..high {
            let scale: f64 = (m..=high).map(|i| h[(i, m - 1)].abs()).sum();
            if scale == 0.0 {
                continue;
            }

            let mut hh = 0.0;
            for i in (m..=high).rev() {
                ort[i] = h[(i, m - 1)] / scale;
                hh += ort[i] * ort[i];
            }
            let mut g = hh.sqrt();
            if ort[m] > 0.0 {
                g = -g;
            }
            hh -= ort[m] * g;
            ort[m] -= g;

            // H = (I - u·uᵀ/h) H (I - u·uᵀ/h)
            for j in m..n {
                let mut f = 0.0;
                for i in (m..=high).rev() {
                    f += ort[i] * h[(i, j)];
                }
                f /= hh;
                for i in m..=high {
                    h[(i, j)] -= f * ort[i];
                }
            }
            for i in 0..=high {
                let mut f = 0.0;
                for j in (m..=high).rev() {
                    f += ort[j] * h[(i, j)];
                }
                f /= hh;
                for j in m..=high {
                    h[(i, j)] -= f * ort[j];
                }
            }
            ort[m] *= scale;
            h[(m, m - 1)] = scale * g;
        }

        // 累积变换
        v.fill_with_identity();
        for m in ((low + 1)..high).rev() {
            if h[(m, m - 1)] == 0.0 {
                continue;
            }
            for i in (m + 1)..=high {
                ort[i] = h[(i, m - 1)];
            }
            for j in m..=high {
                let mut g = 0.0;
                for i in m..=high {
                    g += ort[i] * v[(i, j)];
                }
                // 两次除法避免下溢
                g = (g / ort[m]) / h[(m, m - 1)];
                for i in m..=high {
                    v[(i, j)] += g * ort[i];
                }
            }
        }
    }

    /// Hessenberg 实 Schur 分解与特征向量回代
    fn hqr2(&mut self, max_iterations: usize) -> Result<(), EigenError> {
        let nn = self.n;
        let (d, e, v, h) = (&mut self.d, &mut self.e, &mut self.v, &mut self.h);
        let low = 0usize;
        let high = nn - 1;
        let eps = f64::EPSILON;
        let mut exshift = 0.0;
        // r、s、z 在回代中跨行保留，需要初值
        let (mut r, mut s, mut z) = (0.0f64, 0.0f64, 0.0f64);
        let mut p: f64;
        let mut q: f64;
        let mut w: f64;
        let mut x: f64;
        let mut y: f64;

        // 矩阵范数
        let mut norm = 0.0;
        for i in 0..nn {
            for j in i.saturating_sub(1)..nn {
                norm += h[(i, j)].abs();
            }
        }

        // 外层循环：逐个（或成对）收敛特征值
        let mut iter = 0;
        let mut top = nn as isize - 1;
        while top >= low as isize {
            let n = top as usize;

            // 寻找单个可忽略的次对角元
            let mut l = n;
            while l > low {
                s = h[(l - 1, l - 1)].abs() + h[(l, l)].abs();
                if s == 0.0 {
                    s = norm;
                }
                if h[(l, l - 1)].abs() < eps * s {
                    break;
                }
                l -= 1;
            }

            if l == n {
                // 单个实根
                h[(n, n)] += exshift;
                d[n] = h[(n, n)];
                e[n] = 0.0;
                top -= 1;
                iter = 0;
            } else if l + 1 == n {
                // 一对根
                w = h[(n, n - 1)] * h[(n - 1, n)];
                p = (h[(n - 1, n - 1)] - h[(n, n)]) / 2.0;
                q = p * p + w;
                z = q.abs().sqrt();
                h[(n, n)] += exshift;
                h[(n - 1, n - 1)] += exshift;
                x = h[(n, n)];

                if q >= 0.0 {
                    // 实根对
                    z = if p >= 0.0 { p + z } else { p - z };
                    d[n - 1] = x + z;
                    d[n] = d[n - 1];
                    if z != 0.0 {
                        d[n] = x - w / z;
                    }
                    e[n - 1] = 0.0;
                    e[n] = 0.0;
                    x = h[(n, n - 1)];
                    s = x.abs() + z.abs();
                    p = x / s;
                    q = z / s;
                    r = (p * p + q * q).sqrt();
                    p /= r;
                    q /= r;

                    for j in (n - 1)..nn {
                        z = h[(n - 1, j)];
                        h[(n - 1, j)] = q * z + p * h[(n, j)];
                        h[(n, j)] = q * h[(n, j)] - p * z;
                    }
                    for i in 0..=n {
                        z = h[(i, n - 1)];
                        h[(i, n - 1)] = q * z + p * h[(i, n)];
                        h[(i, n)] = q * h[(i, n)] - p * z;
                    }
                    for i in low..=high {
                        z = v[(i, n - 1)];
                        v[(i, n - 1)] = q * z + p * v[(i, n)];
                        v[(i, n)] = q * v[(i, n)] - p * z;
                    }
                } else {
                    // 复共轭对
                    d[n - 1] = x + p;
                    d[n] = x + p;
                    e[n - 1] = z;
                    e[n] = -z;
                }
                top -= 2;
                iter = 0;
            } else {
                // 尚未收敛：构造位移
                x = h[(n, n)];
                y = 0.0;
                w = 0.0;
                if l < n {
                    y = h[(n - 1, n - 1)];
                    w = h[(n, n - 1)] * h[(n - 1, n)];
                }

                // Wilkinson 特殊位移
                if iter == 10 {
                    exshift += x;
                    for i in low..=n {
                        h[(i, i)] -= x;
                    }
                    s = h[(n, n - 1)].abs() + h[(n - 1, n - 2)].abs();
                    x = 0.75 * s;
                    y = x;
                    w = -0.4375 * s * s;
                }

                // 第二种特殊位移
                if iter == 30 {
                    s = (y - x) / 2.0;
                    s = s * s + w;
                    if s > 0.0 {
                        s = s.sqrt();
                        if y < x {
                            s = -s;
                        }
                        s = x - w / ((y - x) / 2.0 + s);
                        for i in low..=n {
                            h[(i, i)] -= s;
                        }
                        exshift += s;
                        x = 0.964;
                        y = x;
                        w = x;
                    }
                }

                iter += 1;
                if iter > max_iterations {
                    return Err(EigenError::NoConvergence {
                        index: n,
                        iterations: max_iterations,
                    });
                }

                // 寻找两个相邻的可忽略次对角元
                let mut m = n - 2;
                loop {
                    z = h[(m, m)];
                    r = x - z;
                    s = y - z;
                    p = (r * s - w) / h[(m + 1, m)] + h[(m, m + 1)];
                    q = h[(m + 1, m + 1)] - z - r - s;
                    r = h[(m + 2, m + 1)];
                    s = p.abs() + q.abs() + r.abs();
                    p /= s;
                    q /= s;
                    r /= s;
                    if m == l {
                        break;
                    }
                    if h[(m, m - 1)].abs() * (q.abs() + r.abs())
                        < eps * (p.abs() * (h[(m - 1, m - 1)].abs() + z.abs() + h[(m + 1, m + 1)].abs()))
                    {
                        break;
                    }
                    m -= 1;
                }

                for i in (m + 2)..=n {
                    h[(i, i - 2)] = 0.0;
                    if i > m + 2 {
                        h[(i, i - 3)] = 0.0;
                    }
                }

                // 行 l..n、列 m..n 上的双位移 QR 步
                for k in m..n {
                    let notlast = k != n - 1;
                    if k != m {
                        p = h[(k, k - 1)];
                        q = h[(k + 1, k - 1)];
                        r = if notlast { h[(k + 2, k - 1)] } else { 0.0 };
                        x = p.abs() + q.abs() + r.abs();
                        if x == 0.0 {
                            continue;
                        }
                        p /= x;
                        q /= x;
                        r /= x;
                    }

                    s = (p * p + q * q + r * r).sqrt();
                    if p < 0.0 {
                        s = -s;
                    }
                    if s == 0.0 {
                        continue;
                    }

                    if k != m {
                        h[(k, k - 1)] = -s * x;
                    } else if l != m {
                        h[(k, k - 1)] = -h[(k, k - 1)];
                    }
                    p += s;
                    x = p / s;
                    y = q / s;
                    z = r / s;
                    q /= p;
                    r /= p;

                    // 行变换
                    for j in k..nn {
                        p = h[(k, j)] + q * h[(k + 1, j)];
                        if notlast {
                            p += r * h[(k + 2, j)];
                            h[(k + 2, j)] -= p * z;
                        }
                        h[(k, j)] -= p * x;
                        h[(k + 1, j)] -= p * y;
                    }

                    // 列变换
                    for i in 0..=n.min(k + 3) {
                        p = x * h[(i, k)] + y * h[(i, k + 1)];
                        if notlast {
                            p += z * h[(i, k + 2)];
                            h[(i, k + 2)] -= p * r;
                        }
                        h[(i, k)] -= p;
                        h[(i, k + 1)] -= p * q;
                    }

                    // 累积变换
                    for i in low..=high {
                        p = x * v[(i, k)] + y * v[(i, k + 1)];
                        if notlast {
                            p += z * v[(i, k + 2)];
                            v[(i, k + 2)] -= p * r;
                        }
                        v[(i, k)] -= p;
                        v[(i, k + 1)] -= p * q;
                    }
                }
            }
        }

        if norm == 0.0 {
            return Ok(());
        }

        // 上三角形式的回代
        for n in (0..nn).rev() {
            p = d[n];
            q = e[n];

            if q == 0.0 {
                // 实向量
                let mut l = n;
                h[(n, n)] = 1.0;
                for i in (0..n).rev() {
                    w = h[(i, i)] - p;
                    r = 0.0;
                    for j in l..=n {
                        r += h[(i, j)] * h[(j, n)];
                    }
                    if e[i] < 0.0 {
                        z = w;
                        s = r;
                    } else {
                        l = i;
                        if e[i] == 0.0 {
                            h[(i, n)] = if w != 0.0 { -r / w } else { -r / (eps * norm) };
                        } else {
                            // 实方程组
                            x = h[(i, i + 1)];
                            y = h[(i + 1, i)];
                            q = (d[i] - p) * (d[i] - p) + e[i] * e[i];
                            let t = (x * s - z * r) / q;
                            h[(i, n)] = t;
                            h[(i + 1, n)] = if x.abs() > z.abs() {
                                (-r - w * t) / x
                            } else {
                                (-s - y * t) / z
                            };
                        }

                        // 溢出控制
                        let t = h[(i, n)].abs();
                        if (eps * t) * t > 1.0 {
                            for j in i..=n {
                                h[(j, n)] /= t;
                            }
                        }
                    }
                }
            } else if q < 0.0 {
                // 复向量（n-1 列为实部，n 列为虚部）
                let mut l = n - 1;

                // 最后一个分量为虚数，矩阵呈三角形
                if h[(n, n - 1)].abs() > h[(n - 1, n)].abs() {
                    h[(n - 1, n - 1)] = q / h[(n, n - 1)];
                    h[(n - 1, n)] = -(h[(n, n)] - p) / h[(n, n - 1)];
                } else {
                    let (cr, ci) = cdiv(0.0, -h[(n - 1, n)], h[(n - 1, n - 1)] - p, q);
                    h[(n - 1, n - 1)] = cr;
                    h[(n - 1, n)] = ci;
                }
                h[(n, n - 1)] = 0.0;
                h[(n, n)] = 1.0;

                for i in (0..n.saturating_sub(1)).rev() {
                    let mut ra = 0.0;
                    let mut sa = 0.0;
                    for j in l..=n {
                        ra += h[(i, j)] * h[(j, n - 1)];
                        sa += h[(i, j)] * h[(j, n)];
                    }
                    w = h[(i, i)] - p;

                    if e[i] < 0.0 {
                        z = w;
                        r = ra;
                        s = sa;
                    } else {
                        l = i;
                        if e[i] == 0.0 {
                            let (cr, ci) = cdiv(-ra, -sa, w, q);
                            h[(i, n - 1)] = cr;
                            h[(i, n)] = ci;
                        } else {
                            // 复方程组
                            x = h[(i, i + 1)];
                            y = h[(i + 1, i)];
                            let mut vr = (d[i] - p) * (d[i] - p) + e[i] * e[i] - q * q;
                            let vi = (d[i] - p) * 2.0 * q;
                            if vr == 0.0 && vi == 0.0 {
                                vr = eps
                                    * norm
                                    * (w.abs() + q.abs() + x.abs() + y.abs() + z.abs());
                            }
                            let (cr, ci) = cdiv(
                                x * r - z * ra + q * sa,
                                x * s - z * sa - q * ra,
                                vr,
                                vi,
                            );
                            h[(i, n - 1)] = cr;
                            h[(i, n)] = ci;
                            if x.abs() > z.abs() + q.abs() {
                                h[(i + 1, n - 1)] =
                                    (-ra - w * h[(i, n - 1)] + q * h[(i, n)]) / x;
                                h[(i + 1, n)] = (-sa - w * h[(i, n)] - q * h[(i, n - 1)]) / x;
                            } else {
                                let (cr, ci) =
                                    cdiv(-r - y * h[(i, n - 1)], -s - y * h[(i, n)], z, q);
                                h[(i + 1, n - 1)] = cr;
                                h[(i + 1, n)] = ci;
                            }
                        }

                        // 溢出控制
                        let t = h[(i, n - 1)].abs().max(h[(i, n)].abs());
                        if (eps * t) * t > 1.0 {
                            for j in i..=n {
                                h[(j, n - 1)] /= t;
                                h[(j, n)] /= t;
                            }
                        }
                    }
                }
            }
        }

        // 回变换得到原矩阵的特征向量
        for j in (low..nn).rev() {
            for i in low..=high {
                z = 0.0;
                for k in low..=j.min(high) {
                    z += v[(i, k)] * h[(k, j)];
                }
                v[(i, j)] = z;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_errors() {
        assert_eq!(
            EigenMatrix::new(&DMatrix::zeros(2, 3)).unwrap_err(),
            EigenError::NotSquare { rows: 2, cols: 3 }
        );
        assert_eq!(EigenMatrix::new(&DMatrix::zeros(0, 0)).unwrap_err(), EigenError::Empty);
        let mut a = DMatrix::identity(2, 2);
        a[(1, 0)] = f64::INFINITY;
        assert_eq!(
            EigenMatrix::new(&a).unwrap_err(),
            EigenError::NonFinite { row: 1, col: 0 }
        );
    }

    #[test]
    fn test_one_by_one() {
        let a = DMatrix::from_element(1, 1, -3.5);
        let eig = EigenMatrix::new(&a).unwrap();
        assert!(eig.is_symmetric());
        assert_eq!(eig.evals_re()[0], -3.5);
        assert_eq!(eig.evecs()[(0, 0)].abs(), 1.0);
    }

    #[test]
    fn test_symmetric_2x2_sorted() {
        let a = DMatrix::from_row_slice(2, 2, &[2.0, 1.0, 1.0, 2.0]);
        let eig = EigenMatrix::new(&a).unwrap();
        assert!((eig.evals_re()[0] - 1.0).abs() < 1e-14);
        assert!((eig.evals_re()[1] - 3.0).abs() < 1e-14);
        assert!(eig.evals_im().iter().all(|&im| im == 0.0));
        assert!(!eig.has_complex());
    }

    #[test]
    fn test_diagonal_matrix() {
        let a = DMatrix::from_diagonal(&DVector::from_vec(vec![3.0, -1.0, 2.0]));
        let eig = EigenMatrix::new(&a).unwrap();
        let re: Vec<f64> = eig.evals_re().iter().copied().collect();
        assert_eq!(re, vec![-1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_rotation_complex_pair() {
        // 90° 旋转：特征值 ±i
        let a = DMatrix::from_row_slice(2, 2, &[0.0, -1.0, 1.0, 0.0]);
        let eig = EigenMatrix::new(&a).unwrap();
        assert!(!eig.is_symmetric());
        assert!(eig.has_complex());
        let mut im: Vec<f64> = eig.evals_im().iter().copied().collect();
        im.sort_by(|a, b| a.total_cmp(b));
        assert!((im[0] + 1.0).abs() < 1e-14);
        assert!((im[1] - 1.0).abs() < 1e-14);
        assert!(eig.evals_re().iter().all(|re| re.abs() < 1e-14));
    }

    #[test]
    fn test_nonsymmetric_real_eigenvalues() {
        // 上三角：特征值即对角元
        let a = DMatrix::from_row_slice(3, 3, &[1.0, 2.0, 3.0, 0.0, 4.0, 5.0, 0.0, 0.0, 6.0]);
        let eig = EigenMatrix::new(&a).unwrap();
        let mut re: Vec<f64> = eig.evals_re().iter().copied().collect();
        re.sort_by(|a, b| a.total_cmp(b));
        for (got, want) in re.iter().zip([1.0, 4.0, 6.0]) {
            assert!((got - want).abs() < 1e-12);
        }
        // A·V = V·D
        let residual = &a * eig.evecs() - eig.evecs() * eig.block_diagonal();
        assert!(residual.amax() < 1e-12);
    }

    #[test]
    fn test_complex_evecs_cached() {
        let a = DMatrix::from_row_slice(2, 2, &[1.0, -2.0, 3.0, 1.0]);
        let eig = EigenMatrix::new(&a).unwrap();
        assert!(std::ptr::eq(eig.complex_evecs(), eig.complex_evecs()));
        let cv = eig.complex_evecs();
        let lambda = Complex64::new(eig.evals_re()[0], eig.evals_im()[0]);
        let a_c = a.map(|x| Complex64::new(x, 0.0));
        let av = &a_c * cv.column(0);
        let lv = cv.column(0) * lambda;
        assert!((av - lv).iter().all(|c| c.norm() < 1e-12));
    }

    #[test]
    fn test_with_symmetry_skips_check() {
        let a = DMatrix::from_row_slice(2, 2, &[2.0, 1.0, 1.0, 2.0]);
        let eig = EigenMatrix::with_symmetry(&a, false).unwrap();
        assert!(!eig.is_symmetric());
        let mut re: Vec<f64> = eig.evals_re().iter().copied().collect();
        re.sort_by(|a, b| a.total_cmp(b));
        assert!((re[0] - 1.0).abs() < 1e-13);
        assert!((re[1] - 3.0).abs() < 1e-13);
    }

    #[test]
    fn test_iteration_cap_reports_no_convergence() {
        let sym = DMatrix::from_row_slice(3, 3, &[2.0, 1.0, 0.0, 1.0, 2.0, 1.0, 0.0, 1.0, 2.0]);
        assert_eq!(
            EigenMatrix::decompose(&sym, true, 0).unwrap_err(),
            EigenError::NoConvergence { index: 0, iterations: 0 }
        );

        let general =
            DMatrix::from_row_slice(3, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 10.0]);
        assert!(matches!(
            EigenMatrix::decompose(&general, false, 0),
            Err(EigenError::NoConvergence { iterations: 0, .. })
        ));

        // 默认上限下两者都能收敛
        assert!(EigenMatrix::new(&sym).is_ok());
        assert!(EigenMatrix::new(&general).is_ok());
    }

    #[test]
    fn test_cdiv() {
        // (1 + 2i) / (3 - 4i) = (-5 + 10i) / 25
        let (r, i) = cdiv(1.0, 2.0, 3.0, -4.0);
        assert!((r + 0.2).abs() < 1e-15);
        assert!((i - 0.4).abs() < 1e-15);
    }
}
