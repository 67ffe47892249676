//! # 解析器模块
//!
//! 提供 ELEGANT 相关文件格式的解析器。
//!
//! ## 依赖关系
//! - 被 `commands/`、`archive/` 和 `physics/` 模块使用
//! - 使用 `models/` 数据模型
//! - 子模块: lte, sdds

pub mod lte;
pub mod sdds;
