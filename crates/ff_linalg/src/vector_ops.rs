// crates/ff_linalg/src/vector_ops.rs

//! 向量运算（BLAS Level 1 风格）
//!
//! 迭代求解器与残差归一化使用的基础归约与更新操作。
//!
//! # 函数列表
//!
//! - [`sum_prod`]: 点积 x·y
//! - [`sum_mag`]: 一范数 Σ|x|
//! - [`average`]: 算术平均
//! - [`axpy`]: y = α*x + y
//! - [`xpay`]: y = x + α*y

use ff_runtime::RuntimeScalar;

/// 点积 x·y
#[inline]
pub fn sum_prod<S: RuntimeScalar>(x: &[S], y: &[S]) -> S {
    debug_assert_eq!(x.len(), y.len());
    x.iter().zip(y.iter()).map(|(&xi, &yi)| xi * yi).sum()
}

/// 一范数 Σ|x|
#[inline]
pub fn sum_mag<S: RuntimeScalar>(x: &[S]) -> S {
    x.iter().map(|v| v.abs()).sum()
}

/// 算术平均（空向量返回 0）
#[inline]
pub fn average<S: RuntimeScalar>(x: &[S]) -> S {
    if x.is_empty() {
        return S::ZERO;
    }
    let n = S::from_usize(x.len()).unwrap_or(S::ONE);
    x.iter().copied().sum::<S>() / n
}

/// AXPY: y = α*x + y
#[inline]
pub fn axpy<S: RuntimeScalar>(alpha: S, x: &[S], y: &mut [S]) {
    debug_assert_eq!(x.len(), y.len());
    for (yi, &xi) in y.iter_mut().zip(x.iter()) {
        *yi += alpha * xi;
    }
}

/// XPAY: y = x + α*y
#[inline]
pub fn xpay<S: RuntimeScalar>(x: &[S], alpha: S, y: &mut [S]) {
    debug_assert_eq!(x.len(), y.len());
    for (yi, &xi) in y.iter_mut().zip(x.iter()) {
        *yi = xi + alpha * *yi;
    }
}
