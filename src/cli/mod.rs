//! # CLI 模块
//!
//! 使用 `clap` 定义命令行参数和子命令。
//!
//! ## 命令结构
//! - `env`: 环境激活、工具表、安装配置、远程后端（嵌套子命令）
//! - `lte`: 晶格压缩/解压/报告（嵌套子命令）
//! - `slurm`: 集群队列、负载、取消、空闲核心（嵌套子命令）
//! - `errspec`: 误差规格（嵌套子命令）
//! - `multipole`: 多极误差换算（嵌套子命令）
//! - `ele`: `.ele` 输入文件构建（嵌套子命令）
//!
//! ## 依赖关系
//! - 被 `main.rs` 使用
//! - 子模块: env, lte, slurm, errspec, multipole, ele

pub mod ele;
pub mod env;
pub mod errspec;
pub mod lte;
pub mod multipole;
pub mod slurm;

use clap::{ArgAction, Parser, Subcommand};

/// elekit - ELEGANT 配套工具箱
#[derive(Parser)]
#[command(name = "elekit")]
#[command(version)]
#[command(about = "Companion toolkit for the ELEGANT accelerator code", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace); ELEKIT_LOG overrides
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// 可用的子命令
#[derive(Subcommand)]
pub enum Commands {
    /// Environment activation, console tools, install profiles and remote backend
    Env(env::EnvArgs),

    /// Pack, unpack and report on ELEGANT lattice (.lte) files
    Lte(lte::LteArgs),

    /// Inspect and manage Slurm jobs and partitions
    Slurm(slurm::SlurmArgs),

    /// Show, export, validate and sample error specifications
    Errspec(errspec::ErrspecArgs),

    /// Convert systematic multipole tables for CSBEND elements
    Multipole(multipole::MultipoleArgs),

    /// Build ELEGANT command (.ele) files
    Ele(ele::EleArgs),
}
