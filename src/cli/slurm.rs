//! # slurm 子命令 CLI 定义
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/slurm.rs`

use clap::{Args, Subcommand};

/// slurm 主命令参数
#[derive(Args, Debug)]
pub struct SlurmArgs {
    #[command(subcommand)]
    pub command: SlurmCommands,
}

/// slurm 子命令
#[derive(Subcommand, Debug)]
pub enum SlurmCommands {
    /// Print the job queue
    Queue(QueueArgs),

    /// Print CPU usage per partition
    Load(LoadArgs),

    /// Cancel jobs whose name matches a regular expression
    Cancel(CancelArgs),

    /// Watch the number of idle cores and report every change
    Nfree(NfreeArgs),
}

/// queue 参数
#[derive(Args, Debug)]
pub struct QueueArgs {
    /// Only show jobs of this user
    #[arg(short, long, env = "USER")]
    pub user: Option<String>,

    /// Show jobs of all users
    #[arg(short, long, default_value_t = false)]
    pub all: bool,

    /// Print CSV instead of a table
    #[arg(long, default_value_t = false)]
    pub csv: bool,
}

/// load 参数
#[derive(Args, Debug)]
pub struct LoadArgs {
    /// Only show this partition
    #[arg(short, long)]
    pub partition: Option<String>,
}

/// cancel 参数
#[derive(Args, Debug)]
pub struct CancelArgs {
    /// Regular expression matched against job names
    pub pattern: String,

    /// Owner of the jobs to cancel
    #[arg(short, long, env = "USER")]
    pub user: String,

    /// List the matching jobs without cancelling them
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

/// nfree 参数
#[derive(Args, Debug)]
pub struct NfreeArgs {
    /// Only count idle cores in this partition
    #[arg(short, long)]
    pub partition: Option<String>,

    /// Seconds between polls
    #[arg(short, long, default_value_t = 10)]
    pub interval: u64,

    /// Stop after this many polls (0 = forever)
    #[arg(short, long, default_value_t = 0)]
    pub count: u64,
}
