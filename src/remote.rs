//! # 远程后端选择
//!
//! 环境变量 `PYELEGANT_REMOTE` 指定 ELEGANT 任务提交到哪个集群后端。
//! 未设置、名称无效或缺少并行依赖时一律退回本地运行，并给出警告。
//!
//! ## 依赖关系
//! - 被 `commands/env.rs` 使用
//! - 使用 `which` 检查可执行文件

use std::fmt;
use std::str::FromStr;

/// 环境变量名
pub const REMOTE_VAR: &str = "PYELEGANT_REMOTE";

/// 远程后端需要的可执行文件
pub const PARALLEL_EXECUTABLES: &[&str] = &["sbatch", "squeue", "mpirun"];

/// 已知远程后端
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteBackend {
    Nsls2ApCluster,
    Nsls2Pluto,
}

impl RemoteBackend {
    pub const ALL: [RemoteBackend; 2] = [RemoteBackend::Nsls2ApCluster, RemoteBackend::Nsls2Pluto];

    pub fn name(&self) -> &'static str {
        match self {
            RemoteBackend::Nsls2ApCluster => "nsls2apcluster",
            RemoteBackend::Nsls2Pluto => "nsls2pluto",
        }
    }
}

impl fmt::Display for RemoteBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RemoteBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RemoteBackend::ALL
            .into_iter()
            .find(|b| b.name() == s)
            .ok_or_else(|| s.to_string())
    }
}

/// 退回本地运行的原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalReason {
    NotConfigured,
    Invalid(String),
    MissingParallel { name: String, missing: Vec<String> },
}

/// 解析结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteStatus {
    Remote(RemoteBackend),
    Local(LocalReason),
}

impl RemoteStatus {
    /// 用户可见的警告文本（每行一条）；远程可用时为空
    pub fn warning_lines(&self) -> Vec<String> {
        const LOCAL_ONLY: &str = "All ELEGANT commands will only be run locally.";
        match self {
            RemoteStatus::Remote(_) => Vec::new(),
            RemoteStatus::Local(LocalReason::NotConfigured) => {
                vec![format!("${} not set. {}", REMOTE_VAR, LOCAL_ONLY)]
            }
            RemoteStatus::Local(LocalReason::Invalid(name)) => {
                vec![format!("Invalid ${}: '{}'. {}", REMOTE_VAR, name, LOCAL_ONLY)]
            }
            RemoteStatus::Local(LocalReason::MissingParallel { name, missing }) => vec![
                format!(
                    "Cannot load remote backend '{}': missing {}",
                    name,
                    missing.join(", ")
                ),
                "Missing parallel dependencies. Install the 'parallel' or 'all' profile.".to_string(),
                LOCAL_ONLY.to_string(),
            ],
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, RemoteStatus::Remote(_))
    }
}

/// 解析后端名称；`probe` 判断某个可执行文件是否可用
pub fn resolve_remote<P>(name: Option<&str>, probe: P) -> RemoteStatus
where
    P: Fn(&str) -> bool,
{
    // 名称按原样比较，不做裁剪或大小写转换
    let name = name.unwrap_or("");
    if name.is_empty() {
        return RemoteStatus::Local(LocalReason::NotConfigured);
    }

    let backend = match name.parse::<RemoteBackend>() {
        Ok(b) => b,
        Err(_) => return RemoteStatus::Local(LocalReason::Invalid(name.to_string())),
    };

    let missing: Vec<String> = PARALLEL_EXECUTABLES
        .iter()
        .filter(|exe| !probe(exe))
        .map(|exe| exe.to_string())
        .collect();

    if missing.is_empty() {
        RemoteStatus::Remote(backend)
    } else {
        RemoteStatus::Local(LocalReason::MissingParallel {
            name: name.to_string(),
            missing,
        })
    }
}

/// 在 PATH 中查找可执行文件
pub fn on_path(executable: &str) -> bool {
    which::which(executable).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_configured() {
        let status = resolve_remote(None, |_| true);
        assert_eq!(status, RemoteStatus::Local(LocalReason::NotConfigured));
        assert_eq!(resolve_remote(Some(""), |_| true), status);
        assert_eq!(
            status.warning_lines(),
            vec!["$PYELEGANT_REMOTE not set. All ELEGANT commands will only be run locally."]
        );
    }

    #[test]
    fn test_invalid_name() {
        let status = resolve_remote(Some("mars"), |_| true);
        assert_eq!(status, RemoteStatus::Local(LocalReason::Invalid("mars".into())));
        assert_eq!(
            status.warning_lines(),
            vec!["Invalid $PYELEGANT_REMOTE: 'mars'. All ELEGANT commands will only be run locally."]
        );
    }

    #[test]
    fn test_name_compared_verbatim() {
        assert_eq!(
            resolve_remote(Some("  "), |_| true),
            RemoteStatus::Local(LocalReason::Invalid("  ".into()))
        );
        assert_eq!(
            resolve_remote(Some(" nsls2pluto"), |_| true),
            RemoteStatus::Local(LocalReason::Invalid(" nsls2pluto".into()))
        );
        assert_eq!(
            resolve_remote(Some("NSLS2Pluto"), |_| true),
            RemoteStatus::Local(LocalReason::Invalid("NSLS2Pluto".into()))
        );
    }

    #[test]
    fn test_missing_parallel() {
        let status = resolve_remote(Some("nsls2pluto"), |exe| exe != "mpirun");
        match &status {
            RemoteStatus::Local(LocalReason::MissingParallel { name, missing }) => {
                assert_eq!(name, "nsls2pluto");
                assert_eq!(missing, &vec!["mpirun".to_string()]);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(status.warning_lines().len(), 3);
    }

    #[test]
    fn test_remote_ok() {
        let status = resolve_remote(Some("nsls2apcluster"), |_| true);
        assert_eq!(status, RemoteStatus::Remote(RemoteBackend::Nsls2ApCluster));
        assert!(status.is_remote());
        assert!(status.warning_lines().is_empty());
    }
}
