//! # lte 子命令实现
//!
//! ## 功能
//! - 单文件打包 / 目录批量打包（并行）
//! - 解包，可选恢复原始引用路径
//!
//! ## 依赖关系
//! - 使用 `cli/lte.rs` 定义的参数
//! - 使用 `archive/` 模块进行打包
//! - 使用 `batch/` 模块进行批量处理
//! - `report` 子命令转交 `commands/report.rs`

use super::report;
use crate::archive::ltezip::{self, default_archive_path};
use crate::batch::{BatchRunner, FileCollector, ProcessResult};
use crate::cli::lte::{LteArgs, LteCommands, UnzipArgs, ZipArgs};
use crate::error::{ElekitError, Result};
use crate::utils::output;

use std::path::{Path, PathBuf};
use tabled::{Table, Tabled};

#[derive(Tabled)]
struct ManifestRow {
    #[tabled(rename = "Archive path")]
    archive_path: String,
    #[tabled(rename = "Original path")]
    original_path: String,
}

/// 执行 lte 子命令
pub fn execute(args: LteArgs) -> Result<()> {
    match args.command {
        LteCommands::Zip(a) => zip(a),
        LteCommands::Unzip(a) => unzip(a),
        LteCommands::Report(a) => report::execute(a),
    }
}

fn zip(args: ZipArgs) -> Result<()> {
    output::print_header("Packing Lattice Files");

    if args.input.is_file() {
        zip_single(&args)
    } else if args.input.is_dir() {
        zip_batch(&args)
    } else {
        Err(ElekitError::FileNotFound {
            path: args.input.display().to_string(),
        })
    }
}

fn zip_single(args: &ZipArgs) -> Result<()> {
    let out = args
        .output
        .clone()
        .unwrap_or_else(|| default_archive_path(&args.input));

    let summary = ltezip::zip_lte(&args.input, &out, args.allow_missing)?;
    for path in &summary.missing {
        output::print_warning(&format!("Referenced file not found: {}", path));
    }
    output::print_transfer(&args.input.display().to_string(), &out.display().to_string());
    output::print_success(&format!("{} supplementary file(s) stored", summary.stored));
    Ok(())
}

fn zip_batch(args: &ZipArgs) -> Result<()> {
    output::print_info(&format!("Batch mode: directory '{}'", args.input.display()));
    if args.output.is_some() {
        output::print_warning("--output is ignored in batch mode; archives are written next to each lattice");
    }

    let files = FileCollector::new(args.input.clone())
        .with_pattern(&args.pattern)
        .recursive(args.recursive)
        .collect();

    if files.is_empty() {
        return Err(ElekitError::NoFilesFound {
            pattern: args.pattern.clone(),
        });
    }
    output::print_info(&format!("Found {} lattice files", files.len()));

    let allow_missing = args.allow_missing;
    let skip_existing = args.skip_existing;
    let runner = BatchRunner::new(args.jobs);
    let result = runner.run(files, |file| zip_one(file, allow_missing, skip_existing));

    output::print_separator();
    output::print_done(&format!(
        "Batch complete: {} packed, {} skipped, {} failed",
        result.success, result.skipped, result.failed
    ));

    if !result.failures.is_empty() {
        output::print_warning("Failed files:");
        for (path, err) in result.failures.iter().take(10) {
            output::print_error(&format!("  {}: {}", path, err));
        }
        if result.failures.len() > 10 {
            output::print_warning(&format!("  ... and {} more", result.failures.len() - 10));
        }
        return Err(ElekitError::BatchFailed {
            failed: result.failed,
            total: result.total(),
        });
    }
    Ok(())
}

fn zip_one(input: &PathBuf, allow_missing: bool, skip_existing: bool) -> ProcessResult {
    let out = default_archive_path(input);
    if skip_existing && out.exists() {
        return ProcessResult::Skipped(format!("Archive exists: {}", out.display()));
    }
    match ltezip::zip_lte(input, &out, allow_missing) {
        Ok(summary) => ProcessResult::Success(format!(
            "{} -> {} ({} files)",
            input.display(),
            out.display(),
            summary.stored
        )),
        Err(e) => ProcessResult::Failed(input.display().to_string(), e.to_string()),
    }
}

/// 默认解包目录：去掉扩展名的归档路径
fn default_unzip_dir(archive: &Path) -> PathBuf {
    archive.with_extension("")
}

fn unzip(args: UnzipArgs) -> Result<()> {
    output::print_header("Unpacking Lattice Archive");

    if !args.archive.is_file() {
        return Err(ElekitError::FileNotFound {
            path: args.archive.display().to_string(),
        });
    }
    if args.list {
        return list_archive(&args.archive);
    }

    let dest = args
        .output
        .clone()
        .unwrap_or_else(|| default_unzip_dir(&args.archive));

    let summary = ltezip::unzip_lte(&args.archive, &dest, args.restore_paths)?;
    output::print_transfer(&args.archive.display().to_string(), &dest.display().to_string());
    output::print_kv("Lattice", &summary.lattice.display().to_string());
    output::print_kv("Entries", &summary.extracted.to_string());
    if args.restore_paths {
        output::print_kv("Restored references", &summary.restored.to_string());
    }
    output::print_success("Archive unpacked");
    Ok(())
}

fn list_archive(archive: &Path) -> Result<()> {
    let manifest = ltezip::read_manifest(archive)?;
    output::print_kv("Lattice", &manifest.lattice);
    output::print_kv("Created by", &manifest.created_by);
    let rows: Vec<ManifestRow> = manifest
        .files
        .into_iter()
        .map(|e| ManifestRow {
            archive_path: e.archive_path,
            original_path: e.original_path,
        })
        .collect();
    if rows.is_empty() {
        output::print_info("No supplementary files");
    } else {
        println!("{}", Table::new(&rows));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_unzip_dir() {
        assert_eq!(
            default_unzip_dir(Path::new("run/ring.ltezip")),
            PathBuf::from("run/ring")
        );
    }

    fn zip_args(input: &Path) -> ZipArgs {
        ZipArgs {
            input: input.to_path_buf(),
            output: None,
            allow_missing: false,
            pattern: "*.lte".to_string(),
            recursive: false,
            skip_existing: false,
            jobs: 2,
        }
    }

    fn unzip_args(archive: &Path, output: &Path) -> UnzipArgs {
        UnzipArgs {
            archive: archive.to_path_buf(),
            output: Some(output.to_path_buf()),
            restore_paths: false,
            list: false,
        }
    }

    fn lattice_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("mult")).unwrap();
        std::fs::write(dir.path().join("mult/Q1.MULT"), "SDDS1\n").unwrap();
        std::fs::write(
            dir.path().join("ring.lte"),
            "Q1: KQUAD, L=0.2, SYSTEMATIC_MULTIPOLES=\"mult/Q1.MULT\"\nRING: LINE=(Q1)\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("cell.lte"), "D1: DRIF, L=1\nCELL: LINE=(D1)\n").unwrap();
        dir
    }

    #[test]
    fn test_batch_zip_packs_every_lattice() {
        let dir = lattice_dir();
        zip(zip_args(dir.path())).unwrap();
        assert!(dir.path().join("ring.ltezip").is_file());
        assert!(dir.path().join("cell.ltezip").is_file());

        let mut args = zip_args(dir.path());
        args.skip_existing = true;
        zip(args).unwrap();
    }

    #[test]
    fn test_batch_zip_reports_failures() {
        let dir = lattice_dir();
        std::fs::write(
            dir.path().join("bad.lte"),
            "Q9: KQUAD, L=0.2, SYSTEMATIC_MULTIPOLES=\"gone.MULT\"\n",
        )
        .unwrap();

        let err = zip(zip_args(dir.path())).unwrap_err();
        assert!(matches!(err, ElekitError::BatchFailed { failed: 1, total: 3 }));
        assert!(dir.path().join("ring.ltezip").is_file());
        assert!(!dir.path().join("bad.ltezip").exists());

        let mut args = zip_args(dir.path());
        args.allow_missing = true;
        zip(args).unwrap();
        assert!(dir.path().join("bad.ltezip").is_file());
    }

    #[test]
    fn test_batch_zip_no_match() {
        let dir = lattice_dir();
        let mut args = zip_args(dir.path());
        args.pattern = "*.ele".to_string();
        assert!(matches!(zip(args), Err(ElekitError::NoFilesFound { .. })));
    }

    #[test]
    fn test_unzip_list_and_restore() {
        let dir = lattice_dir();
        let lte = dir.path().join("ring.lte");
        zip(zip_args(&lte)).unwrap();
        let archive = dir.path().join("ring.ltezip");

        let dest = dir.path().join("listed");
        let mut args = unzip_args(&archive, &dest);
        args.list = true;
        unzip(args).unwrap();
        assert!(!dest.exists());

        let dest = dir.path().join("restored");
        let mut args = unzip_args(&archive, &dest);
        args.restore_paths = true;
        unzip(args).unwrap();
        let text = std::fs::read_to_string(dest.join("ring.lte")).unwrap();
        assert!(text.contains("\"mult/Q1.MULT\""));
        assert!(dest.join("lte_suppl/sys_mpole/Q1.MULT").is_file());
    }

    #[test]
    fn test_unzip_missing_archive() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("nope.ltezip");
        assert!(matches!(
            unzip(unzip_args(&archive, dir.path())),
            Err(ElekitError::FileNotFound { .. })
        ));
    }
}
