//! # 库搜索路径拼接
//!
//! 激活环境时把 `${HOME}/.local/lib` 前置到 `LD_LIBRARY_PATH`，
//! 供 MPI 运行时找到用户目录下的共享库。
//!
//! ## 依赖关系
//! - 被 `commands/env.rs` 使用
//! - 无外部模块依赖

/// 库搜索路径环境变量名
pub const LIBRARY_PATH_VAR: &str = "LD_LIBRARY_PATH";

/// 组合新的库搜索路径
///
/// 原值为空（或未设置）时不追加分隔符。
pub fn compose_library_path(home: &str, prior: Option<&str>) -> String {
    let local_lib = format!("{}/.local/lib", home);
    match prior {
        Some(p) if !p.is_empty() => format!("{}:{}", local_lib, p),
        _ => local_lib,
    }
}

/// 目标 shell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellKind {
    Sh,
    Fish,
}

/// 生成导出语句
pub fn export_statement(shell: ShellKind, var: &str, value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    match shell {
        ShellKind::Sh => format!("export {}=\"{}\"", var, escaped),
        ShellKind::Fish => format!("set -gx {} \"{}\"", var, escaped),
    }
}
