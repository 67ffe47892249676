//! # errspec 子命令实现
//!
//! ## 依赖关系
//! - 使用 `cli/errspec.rs` 定义的参数
//! - 使用 `models/error_spec.rs`
//! - 使用 `rand` 抽样

use crate::cli::errspec::{ErrspecArgs, ErrspecCommands, ExportArgs, SampleArgs, ShowArgs, ValidateArgs};
use crate::error::{ElekitError, Result};
use crate::models::error_spec::{Facility, FacilityErrorSpec};
use crate::utils::numfmt::format_g;
use crate::utils::output;

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fs;
use tabled::{Table, Tabled};

#[derive(Tabled)]
struct EntryRow {
    #[tabled(rename = "Entry")]
    path: String,
    #[tabled(rename = "RMS")]
    rms: String,
    #[tabled(rename = "Unit")]
    unit: String,
    #[tabled(rename = "Cutoff (σ)")]
    cutoff: String,
    #[tabled(rename = "Mean")]
    mean: String,
}

/// 执行 errspec 子命令
pub fn execute(args: ErrspecArgs) -> Result<()> {
    match args.command {
        ErrspecCommands::Show(a) => show(a),
        ErrspecCommands::Export(a) => export(a),
        ErrspecCommands::Validate(a) => validate(a),
        ErrspecCommands::Sample(a) => sample(a),
    }
}

fn entry_rows(spec: &FacilityErrorSpec) -> Vec<EntryRow> {
    spec.entries()
        .into_iter()
        .map(|(path, t)| EntryRow {
            path,
            rms: format_g(t.rms, 6),
            unit: t.rms_unit.clone(),
            cutoff: format_g(t.cutoff, 6),
            mean: format_g(t.mean, 6),
        })
        .collect()
}

fn show(args: ShowArgs) -> Result<()> {
    let facility = Facility::from(args.facility);
    let spec = FacilityErrorSpec::preset(facility);
    output::print_header(&format!("Error Specification: {}", facility));
    println!("{}", Table::new(entry_rows(&spec)));
    if !spec.girders.chain_constraints.is_empty() {
        for chain in &spec.girders.chain_constraints {
            output::print_kv("Girder chain", &chain.join(" - "));
        }
    }
    Ok(())
}

fn export(args: ExportArgs) -> Result<()> {
    let facility = Facility::from(args.facility);
    let text = FacilityErrorSpec::preset(facility).to_toml_string()?;
    fs::write(&args.output, text).map_err(|e| ElekitError::FileWriteError {
        path: args.output.display().to_string(),
        source: e,
    })?;
    output::print_success(&format!(
        "Preset '{}' written to '{}'",
        facility,
        args.output.display()
    ));
    Ok(())
}

fn validate(args: ValidateArgs) -> Result<()> {
    let spec = FacilityErrorSpec::from_toml_file(&args.file)?;
    output::print_success(&format!(
        "'{}' is valid ({} facility, {} entries, {} magnet types)",
        args.file.display(),
        spec.facility,
        spec.entries().len(),
        spec.magnets.len()
    ));
    Ok(())
}

fn sample(args: SampleArgs) -> Result<()> {
    let spec = match (&args.file, args.facility) {
        (Some(file), _) => FacilityErrorSpec::from_toml_file(file)?,
        (None, Some(f)) => FacilityErrorSpec::preset(f.into()),
        (None, None) => {
            return Err(ElekitError::InvalidArgument(
                "either a file or --facility is required".to_string(),
            ))
        }
    };

    let tges = spec.lookup(&args.path).ok_or_else(|| {
        ElekitError::InvalidArgument(format!(
            "unknown entry '{}' (see `elekit errspec show`)",
            args.path
        ))
    })?;

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    for v in tges.sample(&mut rng, args.count) {
        println!("{}", format_g(v, 12));
    }
    Ok(())
}
