//! # ELEGANT `.ele` 输入文件构建
//!
//! `EleContents` 按顺序累积 namelist、注释和空行，最后渲染为 ELEGANT
//! 可读取的命令文件；`document` 子模块从 TOML 文档加载同样的内容。
//!
//! ## 依赖关系
//! - 被 `commands/ele.rs` 使用
//! - 使用 `utils/numfmt.rs`
//! - 子模块: namelist, document

pub mod document;
pub mod namelist;

pub use document::EleDocument;
pub use namelist::{EleContents, NamelistValue};
