//! # 归档模块
//!
//! ## 依赖关系
//! - 被 `commands/lte.rs` 使用
//! - 子模块: ltezip

pub mod ltezip;

pub use ltezip::{unzip_lte, zip_lte, Manifest, UnzipSummary, ZipSummary};
