//! # slurm 子命令实现
//!
//! ## 功能
//! - `queue`: 作业队列表格 / CSV
//! - `load`: 各分区 CPU 占用，按终端宽度绘制条形图
//! - `cancel`: 按作业名正则批量取消
//! - `nfree`: 轮询空闲核数，变化时输出
//!
//! ## 依赖关系
//! - 使用 `cli/slurm.rs` 定义的参数
//! - 使用 `utils/slurm.rs` 调用 squeue / sinfo / scancel
//! - 使用 `console` 获取终端宽度，`indicatif` 显示轮询状态

use crate::cli::slurm::{CancelArgs, LoadArgs, NfreeArgs, QueueArgs, SlurmArgs, SlurmCommands};
use crate::error::{ElekitError, Result};
use crate::utils::slurm::{self, PartitionLoad, SlurmJob};
use crate::utils::{output, progress};

use colored::Colorize;
use console::Term;
use regex::Regex;
use std::collections::BTreeMap;
use std::io;
use std::thread;
use std::time::Duration;
use tabled::Table;
use tracing::debug;

/// 条形图之外的固定列宽
const LOAD_LABEL_WIDTH: usize = 44;
const MIN_BAR_WIDTH: usize = 10;

/// 执行 slurm 子命令
pub fn execute(args: SlurmArgs) -> Result<()> {
    match args.command {
        SlurmCommands::Queue(a) => queue(a),
        SlurmCommands::Load(a) => load(a),
        SlurmCommands::Cancel(a) => cancel(a),
        SlurmCommands::Nfree(a) => nfree(a),
    }
}

// ─────────────────────────────────────────────────────────────
// queue
// ─────────────────────────────────────────────────────────────

fn queue(args: QueueArgs) -> Result<()> {
    let user = if args.all { None } else { args.user.as_deref() };
    let jobs = slurm::query_queue(user)?;

    if args.csv {
        return write_jobs_csv(&jobs, io::stdout());
    }

    match user {
        Some(u) => output::print_header(&format!("Slurm Queue ({})", u)),
        None => output::print_header("Slurm Queue (all users)"),
    }
    if jobs.is_empty() {
        output::print_info("No jobs in queue");
        return Ok(());
    }

    println!("{}", Table::new(&jobs));
    let states = state_summary(&jobs)
        .into_iter()
        .map(|(s, n)| format!("{} {}", n, s))
        .collect::<Vec<_>>()
        .join(", ");
    output::print_info(&format!("{} job(s): {}", jobs.len(), states));
    Ok(())
}

fn write_jobs_csv<W: io::Write>(jobs: &[SlurmJob], writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record([
        "job_id", "partition", "name", "user", "state", "elapsed", "nodes", "cpus", "reason",
    ])?;
    for j in jobs {
        let nodes = j.nodes.to_string();
        let cpus = j.cpus.to_string();
        wtr.write_record([
            j.job_id.as_str(),
            j.partition.as_str(),
            j.name.as_str(),
            j.user.as_str(),
            j.state.as_str(),
            j.elapsed.as_str(),
            nodes.as_str(),
            cpus.as_str(),
            j.reason.as_str(),
        ])?;
    }
    wtr.flush().map_err(|e| ElekitError::FileWriteError {
        path: "<stdout>".to_string(),
        source: e,
    })?;
    Ok(())
}

/// 按状态统计作业数
fn state_summary(jobs: &[SlurmJob]) -> BTreeMap<String, usize> {
    let mut out = BTreeMap::new();
    for j in jobs {
        *out.entry(j.state.clone()).or_insert(0) += 1;
    }
    out
}

// ─────────────────────────────────────────────────────────────
// load
// ─────────────────────────────────────────────────────────────

fn load(args: LoadArgs) -> Result<()> {
    let loads = slurm::query_load(args.partition.as_deref())?;
    output::print_header("Partition Load");
    if loads.is_empty() {
        output::print_info("No partitions reported");
        return Ok(());
    }

    let (_, cols) = Term::stdout().size();
    let bar_width = (cols as usize).saturating_sub(LOAD_LABEL_WIDTH).max(MIN_BAR_WIDTH);

    println!(
        "{:<14} {:>7} {:>7} {:>7} {:>7} {:>6}",
        "Partition", "Alloc", "Idle", "Other", "Total", "Use%"
    );
    for l in &loads {
        println!("{} {}", format_load_row(l), colored_bar(l.utilization(), bar_width));
    }

    let idle = slurm::total_idle(&loads);
    output::print_info(&format!("{} idle core(s) in total", idle));
    Ok(())
}

fn format_load_row(l: &PartitionLoad) -> String {
    let name = if l.is_default {
        format!("{}*", l.partition)
    } else {
        l.partition.clone()
    };
    format!(
        "{:<14} {:>7} {:>7} {:>7} {:>7} {:>5.1}%",
        name,
        l.allocated,
        l.idle,
        l.other,
        l.total,
        l.utilization() * 100.0
    )
}

/// 纯文本条形图，`fraction` 截断到 [0, 1]
fn render_bar(fraction: f64, width: usize) -> (String, String) {
    let fraction = if fraction.is_finite() { fraction.clamp(0.0, 1.0) } else { 0.0 };
    let filled = (fraction * width as f64).round() as usize;
    ("█".repeat(filled), "░".repeat(width - filled))
}

fn colored_bar(fraction: f64, width: usize) -> String {
    let (filled, empty) = render_bar(fraction, width);
    let filled = if fraction >= 0.9 {
        filled.as_str().red()
    } else if fraction >= 0.6 {
        filled.as_str().yellow()
    } else {
        filled.as_str().green()
    };
    format!("{}{}", filled, empty.as_str().dimmed())
}

// ─────────────────────────────────────────────────────────────
// cancel
// ─────────────────────────────────────────────────────────────

fn cancel(args: CancelArgs) -> Result<()> {
    let pattern = Regex::new(&args.pattern)
        .map_err(|e| ElekitError::InvalidArgument(format!("invalid regex '{}': {}", args.pattern, e)))?;

    let jobs = slurm::query_queue(Some(&args.user))?;
    let matched = slurm::select_by_name(&jobs, &pattern);

    if matched.is_empty() {
        output::print_info(&format!(
            "No jobs of '{}' match '{}'",
            args.user, args.pattern
        ));
        return Ok(());
    }

    output::print_header(&format!("{} matching job(s)", matched.len()));
    for j in &matched {
        println!("  {:>10}  {:<10}  {}", j.job_id, j.state, j.name);
    }

    if args.dry_run {
        output::print_skip("Dry run, nothing cancelled");
        return Ok(());
    }

    let ids: Vec<&str> = matched.iter().map(|j| j.job_id.as_str()).collect();
    slurm::cancel_jobs(&ids)?;
    output::print_success(&format!("Cancelled {} job(s)", ids.len()));
    Ok(())
}

// ─────────────────────────────────────────────────────────────
// nfree
// ─────────────────────────────────────────────────────────────

fn nfree(args: NfreeArgs) -> Result<()> {
    if args.interval == 0 {
        return Err(ElekitError::InvalidArgument("--interval must be > 0".to_string()));
    }

    let spinner = progress::create_spinner("Watching idle cores (Ctrl-C to stop)");
    let mut previous: Option<u32> = None;
    let mut polls: u64 = 0;

    loop {
        let loads = match slurm::query_load(args.partition.as_deref()) {
            Ok(l) => l,
            Err(e) => {
                spinner.finish_and_clear();
                return Err(e);
            }
        };
        let idle = slurm::total_idle(&loads);
        debug!(idle, poll = polls, "polled idle cores");

        if let Some(line) = describe_change(previous, idle) {
            spinner.println(line);
        }
        previous = Some(idle);
        polls += 1;

        if args.count != 0 && polls >= args.count {
            break;
        }
        thread::sleep(Duration::from_secs(args.interval));
    }

    spinner.finish_and_clear();
    Ok(())
}

/// 空闲核数变化描述；未变化时返回 None
fn describe_change(previous: Option<u32>, now: u32) -> Option<String> {
    match previous {
        None => Some(format!("Idle cores: {}", now)),
        Some(p) if p == now => None,
        Some(p) => {
            let delta = i64::from(now) - i64::from(p);
            Some(format!("Idle cores: {} ({:+})", now, delta))
        }
    }
}
