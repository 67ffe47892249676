//! # 工具函数模块
//!
//! 提供美化输出、进度条、库路径拼接、数值格式化、Slurm 命令封装等工具。
//!
//! ## 依赖关系
//! - 被 `commands/` 模块使用
//! - 子模块: output, progress, envpath, numfmt, slurm

pub mod envpath;
pub mod numfmt;
pub mod output;
pub mod progress;
pub mod slurm;
