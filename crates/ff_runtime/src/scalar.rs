// crates/ff_runtime/src/scalar.rs

//! RuntimeScalar - 密封的标量类型抽象
//!
//! 线性代数核心（矩阵、光顺器、求解器）统一以 `S: RuntimeScalar` 为泛型边界，
//! 在 f32 与 f64 之间零成本切换。
//!
//! # 设计原则
//!
//! 1. **密封 Trait**: 只有 f32 和 f64 可以实现（通过 private::Sealed）
//! 2. **零成本抽象**: `#[inline]` + 编译期单态化
//! 3. **从配置转换**: `from_config(f64)` 用于从配置层（全 f64）转换
//!
//! # 使用规范
//!
//! ```rust
//! use ff_runtime::RuntimeScalar;
//!
//! fn relax<S: RuntimeScalar>(old: S, new: S, alpha: S) -> S {
//!     old + alpha * (new - old)
//! }
//!
//! assert_eq!(relax(1.0f64, 3.0, 0.5), 2.0);
//! ```

use std::fmt::{Debug, Display};
use std::iter::Sum;

use bytemuck::Pod;
use num_traits::{Float, FromPrimitive, NumAssign};

/// 密封模块，禁止外部实现
mod private {
    /// 密封 trait
    pub trait Sealed {}
    impl Sealed for f32 {}
    impl Sealed for f64 {}
}

/// 运行时标量类型（密封，仅 f32/f64 可实现）
///
/// # 实现类型
///
/// - `f32`: 单精度，内存占用减半
/// - `f64`: 双精度（默认），用于验证与收敛性测试
pub trait RuntimeScalar:
    private::Sealed
    + Pod
    + Float
    + FromPrimitive
    + NumAssign
    + Debug
    + Display
    + Send
    + Sync
    + Sum
    + Default
    + 'static
{
    /// 零值
    const ZERO: Self;
    /// 一
    const ONE: Self;
    /// 小量（残差归一化、相对容差判据）
    const SMALL: Self;
    /// 极小量（奇异性判据）
    const VSMALL: Self;
    /// 大量
    const GREAT: Self;

    /// 从配置层的 f64 转换
    ///
    /// 超出目标精度表示范围时返回 `None`。
    #[inline]
    fn from_config(value: f64) -> Option<Self> {
        let v = Self::from_f64(value)?;
        if value.is_finite() && !v.is_finite() {
            None
        } else {
            Some(v)
        }
    }
}

// =============================================================================
// f32 实现
// =============================================================================

impl RuntimeScalar for f32 {
    const ZERO: f32 = 0.0;
    const ONE: f32 = 1.0;
    const SMALL: f32 = 1.0e-6;
    const VSMALL: f32 = 1.0e-37;
    const GREAT: f32 = 1.0e6;
}

// =============================================================================
// f64 实现
// =============================================================================

impl RuntimeScalar for f64 {
    const ZERO: f64 = 0.0;
    const ONE: f64 = 1.0;
    const SMALL: f64 = 1.0e-15;
    const VSMALL: f64 = 1.0e-300;
    const GREAT: f64 = 1.0e15;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_f32_constants() {
        assert_eq!(f32::ZERO, 0.0f32);
        assert_eq!(f32::ONE, 1.0f32);
    }

    #[test]
    fn test_f64_constants() {
        assert_eq!(f64::ZERO, 0.0f64);
        assert_eq!(f64::ONE, 1.0f64);
        assert!(f64::VSMALL < f64::SMALL);
        assert!(f64::SMALL < f64::EPSILON);
    }

    #[test]
    fn test_from_config() {
        assert_eq!(<f32 as RuntimeScalar>::from_config(9.81), Some(9.81f32));
        assert_eq!(<f64 as RuntimeScalar>::from_config(9.81), Some(9.81f64));
        // 超出 f32 范围
        assert_eq!(<f32 as RuntimeScalar>::from_config(1e300), None);
    }
}
