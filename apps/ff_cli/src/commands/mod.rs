// apps/ff_cli/src/commands/mod.rs

//! 子命令实现

pub mod band;
pub mod eigen;
pub mod solve;
