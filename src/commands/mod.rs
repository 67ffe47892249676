//! # 命令执行模块
//!
//! 实现各子命令的业务逻辑。
//!
//! ## 依赖关系
//! - 被 `main.rs` 调用
//! - 使用 `cli/`, `parsers/`, `models/`, `archive/`, `physics/`, `elebuilder/`, `utils/`
//! - 子模块: env, lte, report, slurm, errspec, multipole, ele

pub mod ele;
pub mod env;
pub mod errspec;
pub mod lte;
pub mod multipole;
pub mod report;
pub mod slurm;

use crate::cli::Commands;
use crate::error::Result;

/// 执行命令
pub fn run(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Env(args) => env::execute(args),
        Commands::Lte(args) => lte::execute(args),
        Commands::Slurm(args) => slurm::execute(args),
        Commands::Errspec(args) => errspec::execute(args),
        Commands::Multipole(args) => multipole::execute(args),
        Commands::Ele(args) => ele::execute(args),
    }
}
