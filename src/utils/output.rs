//! # 美化输出工具
//!
//! 提供统一的终端输出样式。警告与错误写到 stderr，
//! stdout 只留给命令结果（如 `ele build` 的渲染文本）。
//!
//! ## 依赖关系
//! - 被所有 `commands/` 模块使用
//! - 使用 `colored` crate

use colored::Colorize;
use std::io::{self, Write};

/// 打印成功消息
pub fn print_success(msg: &str) {
    println!("{} {}", "[OK]".green().bold(), msg);
}

/// 打印错误消息
pub fn print_error(msg: &str) {
    eprintln!("{} {}", "[ERR]".red().bold(), msg);
}

/// 打印警告消息
pub fn print_warning(msg: &str) {
    let _ = write_warning(&mut io::stderr().lock(), msg);
}

fn write_warning<W: Write>(w: &mut W, msg: &str) -> io::Result<()> {
    writeln!(w, "{} {}", "[WARN]".yellow().bold(), msg)
}

/// 打印信息消息
pub fn print_info(msg: &str) {
    println!("{} {}", "[*]".blue().bold(), msg);
}

/// 打印跳过消息
pub fn print_skip(msg: &str) {
    println!("{} {}", "[SKIP]".dimmed(), msg);
}

/// 打印完成消息
pub fn print_done(msg: &str) {
    println!("{} {}", "[DONE]".green().bold(), msg);
}

/// 打印打包/解包消息 (源 -> 目标)
pub fn print_transfer(from: &str, to: &str) {
    println!(
        "{} {} {} {}",
        "[OK]".green().bold(),
        from.dimmed(),
        "->".cyan(),
        to
    );
}

/// 打印键值对
pub fn print_kv(key: &str, value: &str) {
    println!("  {:<24} {}", key.bold(), value);
}

/// 打印标题栏
pub fn print_header(title: &str) {
    let line = "─".repeat(60);
    println!("\n{}", line.dimmed());
    println!("  {}", title.bold());
    println!("{}\n", line.dimmed());
}

/// 打印分隔线
pub fn print_separator() {
    println!("{}", "─".repeat(60).dimmed());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warning_line() {
        colored::control::set_override(false);
        let mut buf = Vec::new();
        write_warning(&mut buf, "Document contains no blocks").unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "[WARN] Document contains no blocks\n"
        );
    }
}
