//! # 物理换算模块
//!
//! ## 依赖关系
//! - 被 `commands/multipole.rs` 使用
//! - 子模块: multipole

pub mod multipole;
