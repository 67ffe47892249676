//! # multipole 子命令 CLI 定义
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/multipole.rs`

use crate::physics::multipole::CsbendForm;

use clap::{Args, Subcommand, ValueEnum};
use std::path::PathBuf;

/// multipole 主命令参数
#[derive(Args, Debug)]
pub struct MultipoleArgs {
    #[command(subcommand)]
    pub command: MultipoleCommands,
}

/// multipole 子命令
#[derive(Subcommand, Debug)]
pub enum MultipoleCommands {
    /// Convert a systematic multipole table (.MULT) into CSBEND K/b parameters
    Csbend(CsbendArgs),
}

/// 输出形式
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum FormArg {
    /// K1..K8 (1/m^(n+1))
    K,
    /// b1..b8 (1/m^n), for USE_BN=1
    B,
}

impl From<FormArg> for CsbendForm {
    fn from(arg: FormArg) -> Self {
        match arg {
            FormArg::K => CsbendForm::K,
            FormArg::B => CsbendForm::B,
        }
    }
}

/// csbend 参数
#[derive(Args, Debug)]
pub struct CsbendArgs {
    /// SDDS multipole table
    pub input: PathBuf,

    /// Arc length L of the CSBEND (m)
    #[arg(short = 'L', long)]
    pub length: f64,

    /// Bending angle (rad)
    #[arg(short, long, allow_hyphen_values = true)]
    pub angle: f64,

    /// SDDS page to read (1-based)
    #[arg(long, default_value_t = 1)]
    pub page: usize,

    /// Output form
    #[arg(long, value_enum, default_value = "k")]
    pub form: FormArg,

    /// Highest order to emit
    #[arg(long, default_value_t = 8)]
    pub max_order: u32,

    /// Also write the result to a CSV file
    #[arg(long)]
    pub csv: Option<PathBuf>,
}
