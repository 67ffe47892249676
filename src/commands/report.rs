//! # lte report 子命令实现
//!
//! 统计晶格中各元件类型的定义数与在束线中的出现次数，
//! 以及束线长度和外部文件引用数。
//!
//! ## 依赖关系
//! - 使用 `cli/lte.rs` 定义的 ReportArgs
//! - 使用 `parsers/lte.rs` 和 `models/lattice.rs`

use crate::cli::lte::ReportArgs;
use crate::error::{ElekitError, Result};
use crate::models::lattice::Lattice;
use crate::parsers::lte::parse_lte_file;
use crate::utils::output;

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use tabled::{Table, Tabled};

/// 单个元件类型的统计
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Tabled)]
pub struct KindCount {
    #[tabled(rename = "Type")]
    pub kind: String,
    #[tabled(rename = "Definitions")]
    pub definitions: usize,
    #[tabled(rename = "Occurrences")]
    pub occurrences: usize,
}

/// 晶格报告
#[derive(Debug, Clone)]
pub struct LatticeReport {
    pub line: String,
    pub element_count: usize,
    pub length: f64,
    pub unresolved_lengths: Vec<String>,
    pub kinds: Vec<KindCount>,
    pub file_references: usize,
}

/// 生成报告；`line` 为空时使用默认束线
pub fn build_report(lattice: &Lattice, line: Option<&str>) -> Result<LatticeReport> {
    let line = match line {
        Some(l) => l.to_string(),
        None => lattice
            .default_line()
            .map(str::to_string)
            .ok_or_else(|| ElekitError::InvalidArgument("lattice defines no beamline".to_string()))?,
    };

    // 重复定义以最后一次为准
    let mut definitions: BTreeMap<String, String> = BTreeMap::new();
    for e in lattice.elements() {
        definitions.insert(e.name.to_uppercase(), e.kind.clone());
    }

    let mut counts: BTreeMap<String, (usize, usize)> = BTreeMap::new();
    for kind in definitions.values() {
        counts.entry(kind.clone()).or_default().0 += 1;
    }

    let sequence = lattice.expand_line(&line)?;
    for name in &sequence {
        if let Some(e) = lattice.element(name) {
            counts.entry(e.kind.clone()).or_default().1 += 1;
        }
    }

    let summary = lattice.total_length(&line)?;

    Ok(LatticeReport {
        line,
        element_count: sequence.len(),
        length: summary.length,
        unresolved_lengths: summary.unresolved,
        kinds: counts
            .into_iter()
            .map(|(kind, (definitions, occurrences))| KindCount {
                kind,
                definitions,
                occurrences,
            })
            .collect(),
        file_references: lattice.file_references().len(),
    })
}

fn save_kinds_csv(kinds: &[KindCount], path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for row in kinds {
        wtr.serialize(row)?;
    }
    wtr.flush().map_err(|e| ElekitError::FileWriteError {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(())
}

/// 执行 report
pub fn execute(args: ReportArgs) -> Result<()> {
    output::print_header(&format!("Lattice Report: {}", args.input.display()));

    let lattice = parse_lte_file(&args.input)?;
    let report = build_report(&lattice, args.line.as_deref())?;

    output::print_kv("Beamline", &report.line);
    output::print_kv("Elements in line", &report.element_count.to_string());
    output::print_kv("Length (m)", &format!("{:.6}", report.length));
    output::print_kv("File references", &report.file_references.to_string());
    if !report.unresolved_lengths.is_empty() {
        output::print_warning(&format!(
            "Non-numeric length excluded for: {}",
            report.unresolved_lengths.join(", ")
        ));
    }

    println!();
    println!("{}", Table::new(&report.kinds));

    if let Some(path) = &args.csv {
        save_kinds_csv(&report.kinds, path)?;
        output::print_success(&format!("Element counts saved to '{}'", path.display()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::lte::parse_lte_content;

    const LATTICE: &str = "\
D1: DRIF, L=1.5
D2: DRIF, L=0.5
Q1: KQUAD, L=0.25, K1=1.2, SYSTEMATIC_MULTIPOLES=\"Q1.MULT\"
M1: MARK
CELL: LINE=(D1, Q1, D2, Q1, M1)
RING: LINE=(2*CELL)
";

    #[test]
    fn test_report_default_line() {
        let lattice = parse_lte_content(LATTICE).unwrap();
        let report = build_report(&lattice, None).unwrap();
        assert_eq!(report.line, "RING");
        assert_eq!(report.element_count, 10);
        assert!((report.length - 5.0).abs() < 1e-12);
        assert_eq!(report.file_references, 1);

        let drif = report.kinds.iter().find(|k| k.kind == "DRIF").unwrap();
        assert_eq!(drif.definitions, 2);
        assert_eq!(drif.occurrences, 4);
        let quad = report.kinds.iter().find(|k| k.kind == "KQUAD").unwrap();
        assert_eq!(quad.occurrences, 4);
    }

    #[test]
    fn test_report_explicit_line() {
        let lattice = parse_lte_content(LATTICE).unwrap();
        let report = build_report(&lattice, Some("CELL")).unwrap();
        assert_eq!(report.element_count, 5);
        assert!((report.length - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_report_unused_kind_has_zero_occurrences() {
        let text = format!("{}S1: KSEXT, L=0.2\n", LATTICE);
        let lattice = parse_lte_content(&text).unwrap();
        let report = build_report(&lattice, Some("CELL")).unwrap();
        let sext = report.kinds.iter().find(|k| k.kind == "KSEXT").unwrap();
        assert_eq!((sext.definitions, sext.occurrences), (1, 0));
    }

    #[test]
    fn test_report_without_beamline() {
        let lattice = parse_lte_content("D1: DRIF, L=1\n").unwrap();
        assert!(build_report(&lattice, None).is_err());
    }

    #[test]
    fn test_save_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kinds.csv");
        let kinds = vec![KindCount {
            kind: "DRIF".into(),
            definitions: 2,
            occurrences: 4,
        }];
        save_kinds_csv(&kinds, &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "kind,definitions,occurrences\nDRIF,2,4\n");
    }
}
