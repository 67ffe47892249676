//! # env 子命令 CLI 定义
//!
//! - `activate`: 输出库搜索路径导出语句
//! - `tools`: 列出命令行工具
//! - `profiles`: 列出安装配置，或检查某个配置所需程序
//! - `remote`: 解析远程后端
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/env.rs`

use crate::models::profile::InstallProfile;
use crate::utils::envpath::ShellKind;

use clap::{Args, Subcommand, ValueEnum};

/// env 主命令参数
#[derive(Args, Debug)]
pub struct EnvArgs {
    #[command(subcommand)]
    pub command: EnvCommands,
}

/// env 子命令
#[derive(Subcommand, Debug)]
pub enum EnvCommands {
    /// Print the shell statement that prepends ~/.local/lib to LD_LIBRARY_PATH
    Activate(ActivateArgs),

    /// List the console tools and the elekit subcommands that provide them
    Tools(ToolsArgs),

    /// List install profiles, or check the executables one of them needs
    Profiles(ProfilesArgs),

    /// Show how $PYELEGANT_REMOTE resolves
    Remote(RemoteArgs),
}

/// 目标 shell
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum ShellArg {
    /// POSIX sh / bash / zsh
    Sh,
    /// fish
    Fish,
}

impl From<ShellArg> for ShellKind {
    fn from(arg: ShellArg) -> Self {
        match arg {
            ShellArg::Sh => ShellKind::Sh,
            ShellArg::Fish => ShellKind::Fish,
        }
    }
}

/// activate 参数
#[derive(Args, Debug)]
pub struct ActivateArgs {
    /// Shell syntax of the emitted statement
    #[arg(long, value_enum, default_value = "sh")]
    pub shell: ShellArg,

    /// Home directory
    #[arg(long, env = "HOME")]
    pub home: String,

    /// Library path before activation
    #[arg(long, env = "LD_LIBRARY_PATH")]
    pub prior: Option<String>,
}

/// tools 参数
#[derive(Args, Debug)]
pub struct ToolsArgs {
    /// Only show this tool (e.g. pyele_zip_lte)
    pub name: Option<String>,
}

/// 安装配置选择
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum ProfileArg {
    Default,
    Parallel,
    Genreport,
    All,
    Dev,
}

impl From<ProfileArg> for InstallProfile {
    fn from(arg: ProfileArg) -> Self {
        match arg {
            ProfileArg::Default => InstallProfile::Default,
            ProfileArg::Parallel => InstallProfile::Parallel,
            ProfileArg::Genreport => InstallProfile::Genreport,
            ProfileArg::All => InstallProfile::All,
            ProfileArg::Dev => InstallProfile::Dev,
        }
    }
}

/// profiles 参数
#[derive(Args, Debug)]
pub struct ProfilesArgs {
    /// Check which executables this profile needs and whether they are on PATH
    #[arg(long, value_enum)]
    pub check: Option<ProfileArg>,
}

/// remote 参数
#[derive(Args, Debug)]
pub struct RemoteArgs {
    /// Remote backend name
    #[arg(long, env = "PYELEGANT_REMOTE")]
    pub name: Option<String>,
}
