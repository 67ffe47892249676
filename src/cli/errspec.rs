//! # errspec 子命令 CLI 定义
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/errspec.rs`

use crate::models::error_spec::Facility;

use clap::{Args, Subcommand, ValueEnum};
use std::path::PathBuf;

/// errspec 主命令参数
#[derive(Args, Debug)]
pub struct ErrspecArgs {
    #[command(subcommand)]
    pub command: ErrspecCommands,
}

/// errspec 子命令
#[derive(Subcommand, Debug)]
pub enum ErrspecCommands {
    /// Print every error entry of a facility preset
    Show(ShowArgs),

    /// Write a facility preset to a TOML file
    Export(ExportArgs),

    /// Load and validate an error specification file
    Validate(ValidateArgs),

    /// Draw random errors for one entry
    Sample(SampleArgs),
}

/// 设施预设
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum FacilityArg {
    /// NSLS-II storage ring
    Nsls2,
    /// NSLS-II upgrade lattice
    Nsls2u,
    /// NSLS-II complex bend lattice
    Nsls2cb,
}

impl From<FacilityArg> for Facility {
    fn from(arg: FacilityArg) -> Self {
        match arg {
            FacilityArg::Nsls2 => Facility::Nsls2,
            FacilityArg::Nsls2u => Facility::Nsls2u,
            FacilityArg::Nsls2cb => Facility::Nsls2cb,
        }
    }
}

/// show 参数
#[derive(Args, Debug)]
pub struct ShowArgs {
    #[arg(short, long, value_enum)]
    pub facility: FacilityArg,
}

/// export 参数
#[derive(Args, Debug)]
pub struct ExportArgs {
    #[arg(short, long, value_enum)]
    pub facility: FacilityArg,

    /// Output TOML file
    #[arg(short, long)]
    pub output: PathBuf,
}

/// validate 参数
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Error specification TOML file
    pub file: PathBuf,
}

/// sample 参数
#[derive(Args, Debug)]
pub struct SampleArgs {
    /// Error specification TOML file
    #[arg(required_unless_present = "facility")]
    pub file: Option<PathBuf>,

    /// Use a facility preset instead of a file
    #[arg(short, long, value_enum, conflicts_with = "file")]
    pub facility: Option<FacilityArg>,

    /// Dotted entry path, e.g. bpms.offset.x or magnets.QUAD.main_fse
    #[arg(long)]
    pub path: String,

    /// Number of samples
    #[arg(short = 'n', long = "count", default_value_t = 10)]
    pub count: usize,

    /// Random seed for reproducible draws
    #[arg(long)]
    pub seed: Option<u64>,
}
