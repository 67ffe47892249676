//! # multipole 子命令实现
//!
//! ## 依赖关系
//! - 使用 `cli/multipole.rs` 定义的参数
//! - 使用 `parsers/sdds.rs` 读取 `.MULT` 表
//! - 使用 `physics/multipole.rs` 换算

use crate::cli::multipole::{CsbendArgs, MultipoleArgs, MultipoleCommands};
use crate::error::{ElekitError, Result};
use crate::parsers::sdds::parse_sdds_file;
use crate::physics::multipole::{from_sdds_page, sorted_entries, MultColumns};
use crate::utils::numfmt::format_g;
use crate::utils::output;

use std::path::Path;
use tabled::{Table, Tabled};

#[derive(Tabled)]
struct ParamRow {
    #[tabled(rename = "Parameter")]
    name: String,
    #[tabled(rename = "Value")]
    value: String,
}

/// 执行 multipole 子命令
pub fn execute(args: MultipoleArgs) -> Result<()> {
    match args.command {
        MultipoleCommands::Csbend(a) => csbend(a),
    }
}

fn csbend(args: CsbendArgs) -> Result<()> {
    let file = parse_sdds_file(&args.input)?;
    if args.page == 0 || args.page > file.pages.len() {
        return Err(ElekitError::InvalidArgument(format!(
            "page {} out of range (file has {} page(s))",
            args.page,
            file.pages.len()
        )));
    }
    let page = &file.pages[args.page - 1];

    let values = from_sdds_page(
        page,
        &MultColumns::default(),
        args.length,
        args.angle,
        args.max_order,
        args.form.into(),
    )?;

    output::print_header(&format!("CSBEND multipoles from {}", args.input.display()));
    output::print_kv("L (m)", &format_g(args.length, 12));
    output::print_kv("ANGLE (rad)", &format_g(args.angle, 12));

    let rows: Vec<ParamRow> = sorted_entries(&values)
        .into_iter()
        .map(|(name, v)| ParamRow {
            name: name.to_string(),
            value: format_g(v, 12),
        })
        .collect();

    if rows.is_empty() {
        output::print_warning("No multipole orders within range");
        return Ok(());
    }
    println!("{}", Table::new(&rows));

    if let Some(path) = &args.csv {
        save_params_csv(&rows, path)?;
        output::print_success(&format!("Parameters saved to '{}'", path.display()));
    }
    Ok(())
}

fn save_params_csv(rows: &[ParamRow], path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(["parameter", "value"])?;
    for r in rows {
        wtr.write_record([r.name.as_str(), r.value.as_str()])?;
    }
    wtr.flush().map_err(|e| ElekitError::FileWriteError {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(())
}
