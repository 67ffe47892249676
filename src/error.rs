//! # 统一错误处理模块
//!
//! 定义 elekit 的所有错误类型，使用 `thiserror` 派生。
//!
//! ## 依赖关系
//! - 被所有其他模块使用
//! - 无外部模块依赖

use thiserror::Error;

/// elekit 统一错误类型
#[derive(Error, Debug)]
pub enum ElekitError {
    // ─────────────────────────────────────────────────────────────
    // I/O 错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to read file: {path}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}")]
    FileWriteError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: String },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    // ─────────────────────────────────────────────────────────────
    // 解析错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to parse {format} file: {path}\nReason: {reason}")]
    ParseError {
        format: String,
        path: String,
        reason: String,
    },

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    // ─────────────────────────────────────────────────────────────
    // 晶格 / 物理量错误
    // ─────────────────────────────────────────────────────────────
    #[error("Unknown beamline or element: {0}")]
    UnknownElement(String),

    #[error("Beamline '{0}' nests too deeply (recursive definition?)")]
    RecursionLimit(String),

    #[error("Beamline '{line}' expands to more than {limit} elements")]
    LineTooLong { line: String, limit: usize },

    #[error("Invalid value for '{field}': {reason}")]
    Validation { field: String, reason: String },

    // ─────────────────────────────────────────────────────────────
    // 归档错误
    // ─────────────────────────────────────────────────────────────
    #[error("Archive error ({path}): {reason}")]
    ArchiveError { path: String, reason: String },

    // ─────────────────────────────────────────────────────────────
    // 外部命令错误
    // ─────────────────────────────────────────────────────────────
    #[error("External command '{command}' not found in PATH")]
    CommandNotFound { command: String },

    #[error("External command failed: {command}\n{stderr}")]
    CommandFailed { command: String, stderr: String },

    // ─────────────────────────────────────────────────────────────
    // 参数错误
    // ─────────────────────────────────────────────────────────────
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // ─────────────────────────────────────────────────────────────
    // 序列化错误
    // ─────────────────────────────────────────────────────────────
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("TOML parse error: {0}")]
    TomlDeError(#[from] toml::de::Error),

    #[error("TOML write error: {0}")]
    TomlSerError(#[from] toml::ser::Error),

    // ─────────────────────────────────────────────────────────────
    // 其他
    // ─────────────────────────────────────────────────────────────
    #[error("No matching files found with pattern: {pattern}")]
    NoFilesFound { pattern: String },

    #[error("{failed} of {total} file(s) failed")]
    BatchFailed { failed: usize, total: usize },
}

impl ElekitError {
    /// 便捷构造校验错误
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ElekitError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Result 类型别名
pub type Result<T> = std::result::Result<T, ElekitError>;
