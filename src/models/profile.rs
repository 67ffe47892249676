//! # 安装配置与命令行工具目录
//!
//! 记录原始发行版提供的安装配置 (profile) 及其依赖分组，
//! 以及各命令行工具名与 elekit 子命令的对应关系。
//!
//! ## 依赖关系
//! - 被 `commands/env.rs` 使用
//! - 无外部模块依赖

use std::fmt;

/// 可选依赖分组
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DependencyGroup {
    Jupyter,
    Parallel,
    Genreport,
    Gui,
    Dev,
}

impl DependencyGroup {
    /// 分组所需的外部可执行程序
    pub fn executables(&self) -> &'static [&'static str] {
        match self {
            DependencyGroup::Jupyter => &["elegant"],
            DependencyGroup::Parallel => &["Pelegant", "mpirun", "sbatch", "squeue", "sinfo", "scancel"],
            DependencyGroup::Genreport => &["elegant"],
            DependencyGroup::Gui => &[],
            DependencyGroup::Dev => &[],
        }
    }
}

impl fmt::Display for DependencyGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DependencyGroup::Jupyter => write!(f, "jupyter"),
            DependencyGroup::Parallel => write!(f, "parallel"),
            DependencyGroup::Genreport => write!(f, "genreport"),
            DependencyGroup::Gui => write!(f, "gui"),
            DependencyGroup::Dev => write!(f, "dev"),
        }
    }
}

/// 安装配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallProfile {
    Default,
    Parallel,
    Genreport,
    All,
    Dev,
}

impl InstallProfile {
    pub const ALL: [InstallProfile; 5] = [
        InstallProfile::Default,
        InstallProfile::Parallel,
        InstallProfile::Genreport,
        InstallProfile::All,
        InstallProfile::Dev,
    ];

    /// 该配置选中的依赖分组
    pub fn groups(&self) -> Vec<DependencyGroup> {
        use DependencyGroup::*;
        match self {
            InstallProfile::Default => vec![Jupyter],
            InstallProfile::Parallel => vec![Jupyter, Parallel],
            InstallProfile::Genreport => vec![Jupyter, Genreport],
            InstallProfile::All => vec![Jupyter, Parallel, Genreport, Gui],
            InstallProfile::Dev => vec![Jupyter, Parallel, Genreport, Gui, Dev],
        }
    }

    /// 该配置需要的外部程序（去重、保持首次出现顺序）
    pub fn executables(&self) -> Vec<&'static str> {
        let mut out: Vec<&'static str> = Vec::new();
        for group in self.groups() {
            for exe in group.executables() {
                if !out.contains(exe) {
                    out.push(exe);
                }
            }
        }
        out
    }

    pub fn description(&self) -> &'static str {
        match self {
            InstallProfile::Default => "Core tools with notebook support",
            InstallProfile::Parallel => "MPI-parallel ELEGANT runs on a Slurm cluster",
            InstallProfile::Genreport => "Lattice report generation",
            InstallProfile::All => "Every optional feature",
            InstallProfile::Dev => "Everything plus development and testing tools",
        }
    }
}

impl fmt::Display for InstallProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstallProfile::Default => write!(f, "default"),
            InstallProfile::Parallel => write!(f, "parallel"),
            InstallProfile::Genreport => write!(f, "genreport"),
            InstallProfile::All => write!(f, "all"),
            InstallProfile::Dev => write!(f, "dev"),
        }
    }
}

/// 原始命令行工具
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsoleTool {
    /// 原始入口名
    pub name: &'static str,
    /// 对应的 elekit 子命令；GUI 工具为 None
    pub subcommand: Option<&'static str>,
    pub summary: &'static str,
}

/// 全部命令行工具
pub const CONSOLE_TOOLS: &[ConsoleTool] = &[
    ConsoleTool {
        name: "pyele_zip_lte",
        subcommand: Some("lte zip"),
        summary: "Pack a lattice file with its supplementary files",
    },
    ConsoleTool {
        name: "pyele_unzip_lte",
        subcommand: Some("lte unzip"),
        summary: "Unpack a lattice archive",
    },
    ConsoleTool {
        name: "pyele_report",
        subcommand: Some("lte report"),
        summary: "Generate a lattice report",
    },
    ConsoleTool {
        name: "pyele_slurm_print_queue",
        subcommand: Some("slurm queue"),
        summary: "Show the Slurm job queue",
    },
    ConsoleTool {
        name: "pyele_slurm_print_load",
        subcommand: Some("slurm load"),
        summary: "Show per-partition CPU load",
    },
    ConsoleTool {
        name: "pyele_slurm_scancel_regex_jobname",
        subcommand: Some("slurm cancel"),
        summary: "Cancel jobs whose name matches a regex",
    },
    ConsoleTool {
        name: "pyele_slurm_nfree_change",
        subcommand: Some("slurm nfree"),
        summary: "Watch the number of idle cores",
    },
    ConsoleTool {
        name: "pyele_gui_slurm",
        subcommand: None,
        summary: "Slurm GUI (not provided)",
    },
    ConsoleTool {
        name: "pyele_gui_report_wiz",
        subcommand: None,
        summary: "Report wizard GUI (not provided)",
    },
];

/// 按原始入口名查找
pub fn find_tool(name: &str) -> Option<&'static ConsoleTool> {
    CONSOLE_TOOLS.iter().find(|t| t.name == name)
}
