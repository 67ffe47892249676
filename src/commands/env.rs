//! # env 子命令实现
//!
//! ## 依赖关系
//! - 使用 `cli/env.rs` 定义的参数
//! - 使用 `utils/envpath.rs`、`models/profile.rs` 和 `remote.rs`

use crate::cli::env::{ActivateArgs, EnvArgs, EnvCommands, ProfilesArgs, RemoteArgs, ToolsArgs};
use crate::error::{ElekitError, Result};
use crate::models::profile::{find_tool, ConsoleTool, InstallProfile, CONSOLE_TOOLS};
use crate::remote::{self, RemoteStatus};
use crate::utils::envpath::{compose_library_path, export_statement, LIBRARY_PATH_VAR};
use crate::utils::output;

use tabled::{Table, Tabled};
use tracing::debug;

#[derive(Tabled)]
struct ToolRow {
    #[tabled(rename = "Tool")]
    name: &'static str,
    #[tabled(rename = "elekit command")]
    command: String,
    #[tabled(rename = "Description")]
    summary: &'static str,
}

#[derive(Tabled)]
struct ProfileRow {
    #[tabled(rename = "Profile")]
    name: String,
    #[tabled(rename = "Groups")]
    groups: String,
    #[tabled(rename = "Description")]
    description: &'static str,
}

#[derive(Tabled)]
struct ExecutableRow {
    #[tabled(rename = "Executable")]
    name: &'static str,
    #[tabled(rename = "Status")]
    status: String,
}

/// 执行 env 子命令
pub fn execute(args: EnvArgs) -> Result<()> {
    match args.command {
        EnvCommands::Activate(a) => activate(a),
        EnvCommands::Tools(a) => tools(a),
        EnvCommands::Profiles(a) => profiles(a),
        EnvCommands::Remote(a) => remote_status(a),
    }
}

fn activate(args: ActivateArgs) -> Result<()> {
    let value = compose_library_path(&args.home, args.prior.as_deref());
    debug!(value = %value, "composed library path");
    // 只输出语句本身，便于 eval
    println!("{}", export_statement(args.shell.into(), LIBRARY_PATH_VAR, &value));
    Ok(())
}

fn tools(args: ToolsArgs) -> Result<()> {
    let selected: Vec<&ConsoleTool> = match &args.name {
        Some(name) => {
            let tool = find_tool(name)
                .ok_or_else(|| ElekitError::InvalidArgument(format!("unknown tool '{}'", name)))?;
            vec![tool]
        }
        None => CONSOLE_TOOLS.iter().collect(),
    };

    output::print_header("Console Tools");
    let rows: Vec<ToolRow> = selected
        .into_iter()
        .map(|t| ToolRow {
            name: t.name,
            command: t
                .subcommand
                .map(|s| format!("elekit {}", s))
                .unwrap_or_else(|| "(not provided)".to_string()),
            summary: t.summary,
        })
        .collect();
    println!("{}", Table::new(&rows));
    Ok(())
}

fn profiles(args: ProfilesArgs) -> Result<()> {
    let Some(profile) = args.check.map(InstallProfile::from) else {
        output::print_header("Install Profiles");
        let rows: Vec<ProfileRow> = InstallProfile::ALL
            .iter()
            .map(|p| ProfileRow {
                name: p.to_string(),
                groups: p
                    .groups()
                    .iter()
                    .map(|g| g.to_string())
                    .collect::<Vec<_>>()
                    .join(", "),
                description: p.description(),
            })
            .collect();
        println!("{}", Table::new(&rows));
        return Ok(());
    };

    output::print_header(&format!("Profile '{}'", profile));
    let exes = profile.executables();
    if exes.is_empty() {
        output::print_info("No external executables required");
        return Ok(());
    }

    let mut missing = 0;
    let rows: Vec<ExecutableRow> = exes
        .into_iter()
        .map(|name| {
            let status = match which::which(name) {
                Ok(path) => path.display().to_string(),
                Err(_) => {
                    missing += 1;
                    "missing".to_string()
                }
            };
            ExecutableRow { name, status }
        })
        .collect();
    println!("{}", Table::new(&rows));

    if missing == 0 {
        output::print_success("All required executables found");
    } else {
        output::print_warning(&format!("{} executable(s) not found in PATH", missing));
    }
    Ok(())
}

fn remote_status(args: RemoteArgs) -> Result<()> {
    let status = remote::resolve_remote(args.name.as_deref(), remote::on_path);
    if let RemoteStatus::Remote(backend) = &status {
        output::print_success(&format!("Remote backend: {}", backend));
    }
    for line in status.warning_lines() {
        output::print_warning(&line);
    }
    if !status.is_remote() {
        debug!(?status, "falling back to local execution");
    }
    Ok(())
}
