//! # Slurm 命令封装
//!
//! 调用 `squeue` / `sinfo` / `scancel` 并解析其输出。
//!
//! ## 依赖关系
//! - 被 `commands/slurm.rs` 使用
//! - 使用 `tabled` 派生表格行

use crate::error::{ElekitError, Result};

use regex::Regex;
use std::process::Command;
use tabled::Tabled;

/// squeue 输出格式：作业号|分区|作业名|用户|状态|运行时间|节点数|CPU 数|原因/节点列表
pub const SQUEUE_FORMAT: &str = "%i|%P|%j|%u|%T|%M|%D|%C|%R";

/// sinfo 输出格式：分区|CPU 统计 (A/I/O/T)
pub const SINFO_FORMAT: &str = "%P|%C";

const SQUEUE_FIELDS: usize = 9;

/// 队列中的单个作业
#[derive(Debug, Clone, PartialEq, Eq, Tabled)]
pub struct SlurmJob {
    #[tabled(rename = "JobID")]
    pub job_id: String,
    #[tabled(rename = "Partition")]
    pub partition: String,
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "User")]
    pub user: String,
    #[tabled(rename = "State")]
    pub state: String,
    #[tabled(rename = "Time")]
    pub elapsed: String,
    #[tabled(rename = "Nodes")]
    pub nodes: u32,
    #[tabled(rename = "CPUs")]
    pub cpus: u32,
    #[tabled(rename = "Reason/NodeList")]
    pub reason: String,
}

/// 分区 CPU 负载
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionLoad {
    pub partition: String,
    pub is_default: bool,
    pub allocated: u32,
    pub idle: u32,
    pub other: u32,
    pub total: u32,
}

impl PartitionLoad {
    /// 已分配 CPU 占比 (0.0 - 1.0)
    pub fn utilization(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.allocated as f64 / self.total as f64
        }
    }
}

/// 运行外部命令并返回 stdout
pub fn run_command(program: &str, args: &[&str]) -> Result<String> {
    tracing::debug!(program, ?args, "running external command");

    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|_| ElekitError::CommandNotFound {
            command: program.to_string(),
        })?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    } else {
        Err(ElekitError::CommandFailed {
            command: format!("{} {}", program, args.join(" ")),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

/// 解析 `squeue --noheader -o SQUEUE_FORMAT` 的输出
pub fn parse_squeue(text: &str) -> Result<Vec<SlurmJob>> {
    let mut jobs = Vec::new();

    for line in text.lines() {
        let line = line.trim_end();
        if line.trim().is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split('|').collect();
        if fields.len() < SQUEUE_FIELDS {
            return Err(ElekitError::ParseError {
                format: "squeue".to_string(),
                path: "<stdout>".to_string(),
                reason: format!("Expected {} fields, got: {}", SQUEUE_FIELDS, line),
            });
        }

        // 作业名中可能含有 '|'，多出的字段并回作业名
        let n = fields.len();
        let name = fields[2..n - 6].join("|");

        jobs.push(SlurmJob {
            job_id: fields[0].trim().to_string(),
            partition: fields[1].trim().to_string(),
            name,
            user: fields[n - 6].trim().to_string(),
            state: fields[n - 5].trim().to_string(),
            elapsed: fields[n - 4].trim().to_string(),
            nodes: parse_count(fields[n - 3], "nodes")?,
            cpus: parse_count(fields[n - 2], "cpus")?,
            reason: fields[n - 1].trim().to_string(),
        });
    }

    Ok(jobs)
}

/// 解析 `sinfo --noheader -o SINFO_FORMAT` 的输出
pub fn parse_sinfo_cpus(text: &str) -> Result<Vec<PartitionLoad>> {
    let mut loads = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let (partition, counts) = line.split_once('|').ok_or_else(|| ElekitError::ParseError {
            format: "sinfo".to_string(),
            path: "<stdout>".to_string(),
            reason: format!("Missing '|' separator: {}", line),
        })?;

        let counts: Vec<&str> = counts.split('/').collect();
        if counts.len() != 4 {
            return Err(ElekitError::ParseError {
                format: "sinfo".to_string(),
                path: "<stdout>".to_string(),
                reason: format!("Expected A/I/O/T CPU counts: {}", line),
            });
        }

        let is_default = partition.ends_with('*');
        loads.push(PartitionLoad {
            partition: partition.trim_end_matches('*').to_string(),
            is_default,
            allocated: parse_count(counts[0], "allocated")?,
            idle: parse_count(counts[1], "idle")?,
            other: parse_count(counts[2], "other")?,
            total: parse_count(counts[3], "total")?,
        });
    }

    Ok(loads)
}

fn parse_count(s: &str, what: &str) -> Result<u32> {
    s.trim().parse().map_err(|_| ElekitError::ParseError {
        format: "slurm".to_string(),
        path: "<stdout>".to_string(),
        reason: format!("Invalid {} count: '{}'", what, s.trim()),
    })
}

/// 查询作业队列
pub fn query_queue(user: Option<&str>) -> Result<Vec<SlurmJob>> {
    let mut args = vec!["--noheader", "-o", SQUEUE_FORMAT];
    if let Some(u) = user {
        args.push("-u");
        args.push(u);
    }
    let stdout = run_command("squeue", &args)?;
    parse_squeue(&stdout)
}

/// 查询分区 CPU 负载
pub fn query_load(partition: Option<&str>) -> Result<Vec<PartitionLoad>> {
    let mut args = vec!["--noheader", "-o", SINFO_FORMAT];
    if let Some(p) = partition {
        args.push("-p");
        args.push(p);
    }
    let stdout = run_command("sinfo", &args)?;
    parse_sinfo_cpus(&stdout)
}

/// 按作业名正则筛选作业
pub fn select_by_name<'a>(jobs: &'a [SlurmJob], pattern: &Regex) -> Vec<&'a SlurmJob> {
    jobs.iter().filter(|j| pattern.is_match(&j.name)).collect()
}

/// 取消指定作业（单次 scancel 调用）
pub fn cancel_jobs(job_ids: &[&str]) -> Result<()> {
    if job_ids.is_empty() {
        return Ok(());
    }
    run_command("scancel", job_ids)?;
    Ok(())
}

/// 汇总空闲核数
pub fn total_idle(loads: &[PartitionLoad]) -> u32 {
    loads.iter().map(|l| l.idle).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SQUEUE_SAMPLE: &str = "\
1001|normal|fma_xy_run|alice|RUNNING|1:02:03|2|64|node[01-02]
1002|short|twiss|bob|PENDING|0:00|1|8|(Priority)
";

    #[test]
    fn test_parse_squeue() {
        let jobs = parse_squeue(SQUEUE_SAMPLE).unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].job_id, "1001");
        assert_eq!(jobs[0].name, "fma_xy_run");
        assert_eq!(jobs[0].cpus, 64);
        assert_eq!(jobs[1].state, "PENDING");
        assert_eq!(jobs[1].reason, "(Priority)");
    }

    #[test]
    fn test_parse_squeue_name_with_separator() {
        let jobs = parse_squeue("7|debug|a|b|carol|RUNNING|5:00|1|4|node07\n").unwrap();
        assert_eq!(jobs[0].name, "a|b");
        assert_eq!(jobs[0].user, "carol");
    }

    #[test]
    fn test_parse_squeue_rejects_short_line() {
        assert!(parse_squeue("1001|normal|x\n").is_err());
    }

    #[test]
    fn test_parse_sinfo() {
        let loads = parse_sinfo_cpus("normal*|120/8/0/128\nlong|10/50/4/64\n").unwrap();
        assert_eq!(loads.len(), 2);
        assert_eq!(loads[0].partition, "normal");
        assert!(loads[0].is_default);
        assert_eq!(loads[0].idle, 8);
        assert!((loads[0].utilization() - 120.0 / 128.0).abs() < 1e-12);
        assert!(!loads[1].is_default);
        assert_eq!(total_idle(&loads), 58);
    }

    #[test]
    fn test_parse_sinfo_bad_counts() {
        assert!(parse_sinfo_cpus("normal|1/2/3\n").is_err());
        assert!(parse_sinfo_cpus("normal 1/2/3/4\n").is_err());
    }

    #[test]
    fn test_select_by_name() {
        let jobs = parse_squeue(SQUEUE_SAMPLE).unwrap();
        let re = Regex::new("^fma_").unwrap();
        let selected = select_by_name(&jobs, &re);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].job_id, "1001");
    }

    #[test]
    fn test_zero_total_utilization() {
        let load = PartitionLoad {
            partition: "empty".to_string(),
            is_default: false,
            allocated: 0,
            idle: 0,
            other: 0,
            total: 0,
        };
        assert_eq!(load.utilization(), 0.0);
    }
}
