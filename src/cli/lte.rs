//! # lte 子命令 CLI 定义
//!
//! - `zip`: 打包晶格及其引用文件（单文件或目录批量）
//! - `unzip`: 解包 `.ltezip`
//! - `report`: 晶格统计报告
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/lte.rs` 和 `commands/report.rs`

use clap::{Args, Subcommand};
use std::path::PathBuf;

/// lte 主命令参数
#[derive(Args, Debug)]
pub struct LteArgs {
    #[command(subcommand)]
    pub command: LteCommands,
}

/// lte 子命令
#[derive(Subcommand, Debug)]
pub enum LteCommands {
    /// Pack a lattice file and every file it references into a .ltezip archive
    Zip(ZipArgs),

    /// Unpack a .ltezip archive
    Unzip(UnzipArgs),

    /// Print element statistics, beamline length and file references
    Report(ReportArgs),
}

/// zip 参数
#[derive(Args, Debug)]
pub struct ZipArgs {
    /// Lattice file, or directory for batch mode
    pub input: PathBuf,

    /// Output archive (single-file mode only; default: <input>.ltezip)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Keep going when a referenced file does not exist
    #[arg(long, default_value_t = false)]
    pub allow_missing: bool,

    /// File pattern in batch mode (comma separated)
    #[arg(short, long, default_value = "*.lte")]
    pub pattern: String,

    /// Search subdirectories in batch mode
    #[arg(short, long, default_value_t = false)]
    pub recursive: bool,

    /// Skip lattices whose archive already exists
    #[arg(long, default_value_t = false)]
    pub skip_existing: bool,

    /// Number of parallel jobs (0 = all CPUs)
    #[arg(short, long, default_value_t = 0)]
    pub jobs: usize,
}

/// unzip 参数
#[derive(Args, Debug)]
pub struct UnzipArgs {
    /// Archive to unpack
    pub archive: PathBuf,

    /// Destination directory (default: archive name without extension)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Rewrite file references in the lattice back to their original paths
    #[arg(long, default_value_t = false)]
    pub restore_paths: bool,

    /// Only print the archive manifest
    #[arg(short, long, default_value_t = false)]
    pub list: bool,
}

/// report 参数
#[derive(Args, Debug)]
pub struct ReportArgs {
    /// Lattice file
    pub input: PathBuf,

    /// Beamline to analyse (default: USE target, else last defined line)
    #[arg(long)]
    pub line: Option<String>,

    /// Also write the element-type counts to a CSV file
    #[arg(long)]
    pub csv: Option<PathBuf>,
}
