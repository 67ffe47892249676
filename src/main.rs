//! # elekit - ELEGANT 配套工具箱
//!
//! 把 ELEGANT 周边的环境配置、晶格文件处理和集群管理脚本用 Rust 重构，
//! 统一成单一可执行文件。
//!
//! ## 子命令
//! - `env` - 环境激活、工具与安装配置、远程后端
//! - `lte` - 晶格打包 / 解包 / 报告
//! - `slurm` - 队列、负载、按名取消、空闲核心监视
//! - `errspec` - 误差规格
//! - `multipole` - 系统多极误差换算为 CSBEND 参数
//! - `ele` - 构建 `.ele` 命令文件
//!
//! ## 依赖关系
//! ```text
//! main.rs
//!   ├── cli/        (命令行参数定义)
//!   ├── commands/   (命令执行逻辑)
//!   │     ├── parsers/    (LTE / SDDS 解析器)
//!   │     ├── models/     (晶格、误差规格、安装配置)
//!   │     ├── archive/    (.ltezip 归档)
//!   │     ├── physics/    (多极误差换算)
//!   │     ├── elebuilder/ (.ele 构建)
//!   │     ├── batch/      (批量并行处理)
//!   │     └── remote.rs   (远程后端选择)
//!   ├── utils/      (工具函数)
//!   └── error.rs    (错误处理)
//! ```

mod archive;
mod batch;
mod cli;
mod commands;
mod elebuilder;
mod error;
mod models;
mod parsers;
mod physics;
mod remote;
mod utils;

use clap::Parser;
use cli::Cli;
use tracing_subscriber::EnvFilter;

/// 日志过滤环境变量
const LOG_ENV: &str = "ELEKIT_LOG";

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(level));

    // 日志写到 stderr，stdout 留给 `env activate` 等可被 eval 的输出
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    // Initialize colored output for Windows compatibility
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = commands::run(cli.command) {
        utils::output::print_error(&format!("{}", e));
        std::process::exit(1);
    }
}
