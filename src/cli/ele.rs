//! # ele 子命令 CLI 定义
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/ele.rs`

use clap::{Args, Subcommand};
use std::path::PathBuf;

/// ele 主命令参数
#[derive(Args, Debug)]
pub struct EleArgs {
    #[command(subcommand)]
    pub command: EleCommands,
}

/// ele 子命令
#[derive(Subcommand, Debug)]
pub enum EleCommands {
    /// Render a TOML document into an ELEGANT .ele file
    Build(BuildArgs),
}

/// build 参数
#[derive(Args, Debug)]
pub struct BuildArgs {
    /// TOML document with precision and [[block]] entries
    pub input: PathBuf,

    /// Output .ele file (default: print to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}
