//! # Namelist 块与渲染
//!
//! ## 输出格式
//! ```text
//! &run_setup
//!   lattice = "lattice3.lte",
//!   p_central_mev = 3000,
//! &end
//!
//! ! Ask for twiss parameters
//! &run_control &end
//! ```

use crate::error::{ElekitError, Result};
use crate::utils::numfmt::format_g;

use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// ELEGANT 识别的命令名
pub const KNOWN_NAMELISTS: &[&str] = &[
    "alter_elements",
    "amplification_factors",
    "analyze_map",
    "aperture_data",
    "bunched_beam",
    "change_particle",
    "chromaticity",
    "closed_orbit",
    "correct",
    "correction_matrix_output",
    "correct_tunes",
    "coupled_twiss_output",
    "divide_elements",
    "error_control",
    "error_element",
    "find_aperture",
    "floor_coordinates",
    "frequency_map",
    "global_settings",
    "ignore_elements",
    "insert_elements",
    "insert_sceffects",
    "linear_chromatic_tracking_setup",
    "link_control",
    "link_elements",
    "load_parameters",
    "matrix_output",
    "modulate_elements",
    "moments_output",
    "momentum_aperture",
    "optimize",
    "optimization_constraint",
    "optimization_covariable",
    "optimization_setup",
    "optimization_term",
    "optimization_variable",
    "parallel_optimization_setup",
    "print_dictionary",
    "ramp_elements",
    "rf_setup",
    "rpn_expression",
    "rpn_load",
    "run_control",
    "run_setup",
    "sasefel",
    "save_lattice",
    "sdds_beam",
    "semaphores",
    "set_reference_particle_output",
    "slice_analysis",
    "steering_element",
    "subprocess",
    "touschek_scatter",
    "transmute_elements",
    "twiss_analysis",
    "twiss_output",
    "track",
    "tune_footprint",
    "vary_element",
];

/// 是否为已知命令
pub fn is_known_namelist(name: &str) -> bool {
    KNOWN_NAMELISTS.contains(&name)
}

/// namelist 字段值
#[derive(Debug, Clone, PartialEq)]
pub enum NamelistValue {
    Int(i64),
    Float(f64),
    Str(String),
}

impl NamelistValue {
    /// 渲染为 ELEGANT 字面量
    pub fn render(&self, precision: usize) -> String {
        match self {
            NamelistValue::Int(v) => v.to_string(),
            NamelistValue::Float(v) => format_g(*v, precision),
            NamelistValue::Str(s) => format!("\"{}\"", escape(s)),
        }
    }
}

/// 转义反斜杠和双引号
fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if c == '\\' || c == '"' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

impl From<i64> for NamelistValue {
    fn from(v: i64) -> Self {
        NamelistValue::Int(v)
    }
}

impl From<i32> for NamelistValue {
    fn from(v: i32) -> Self {
        NamelistValue::Int(i64::from(v))
    }
}

impl From<f64> for NamelistValue {
    fn from(v: f64) -> Self {
        NamelistValue::Float(v)
    }
}

impl From<&str> for NamelistValue {
    fn from(v: &str) -> Self {
        NamelistValue::Str(v.to_string())
    }
}

impl From<String> for NamelistValue {
    fn from(v: String) -> Self {
        NamelistValue::Str(v)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Block {
    Namelist {
        name: String,
        fields: Vec<(String, NamelistValue)>,
    },
    Comment(String),
    Newline,
}

/// `.ele` 文件内容
#[derive(Debug, Clone)]
pub struct EleContents {
    precision: usize,
    blocks: Vec<Block>,
}

impl Default for EleContents {
    fn default() -> Self {
        EleContents::new(12)
    }
}

impl EleContents {
    /// `precision` 为浮点数的有效位数
    pub fn new(precision: usize) -> Self {
        EleContents {
            precision,
            blocks: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// 追加一个 namelist；未知命令名只记录警告，仍然输出
    pub fn namelist<K, V, I>(&mut self, name: &str, fields: I) -> &mut Self
    where
        K: Into<String>,
        V: Into<NamelistValue>,
        I: IntoIterator<Item = (K, V)>,
    {
        if !is_known_namelist(name) {
            warn!(namelist = name, "unknown ELEGANT namelist, emitting anyway");
        }
        let fields = fields
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.blocks.push(Block::Namelist {
            name: name.to_string(),
            fields,
        });
        self
    }

    pub fn comment(&mut self, text: &str) -> &mut Self {
        self.blocks.push(Block::Comment(text.to_string()));
        self
    }

    pub fn newline(&mut self) -> &mut Self {
        self.blocks.push(Block::Newline);
        self
    }

    /// 渲染完整文本
    pub fn render(&self) -> String {
        let mut out = String::new();
        for block in &self.blocks {
            match block {
                Block::Namelist { name, fields } if fields.is_empty() => {
                    let _ = writeln!(out, "&{} &end", name);
                }
                Block::Namelist { name, fields } => {
                    let _ = writeln!(out, "&{}", name);
                    for (key, value) in fields {
                        let _ = writeln!(out, "  {} = {},", key, value.render(self.precision));
                    }
                    out.push_str("&end\n");
                }
                Block::Comment(text) => {
                    if text.starts_with('!') {
                        let _ = writeln!(out, "{}", text);
                    } else {
                        let _ = writeln!(out, "! {}", text);
                    }
                }
                Block::Newline => out.push('\n'),
            }
        }
        out
    }

    /// 写入文件
    pub fn write(&self, path: &Path) -> Result<()> {
        debug!(path = %path.display(), blocks = self.blocks.len(), "writing .ele file");
        fs::write(path, self.render()).map_err(|e| ElekitError::FileWriteError {
            path: path.display().to_string(),
            source: e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_run_setup() {
        let mut eb = EleContents::new(12);
        eb.namelist(
            "run_setup",
            [
                ("lattice", NamelistValue::from("lattice3.lte")),
                ("p_central_mev", NamelistValue::from(3e3)),
                ("default_order", NamelistValue::from(2)),
            ],
        );
        assert_eq!(
            eb.render(),
            "&run_setup\n  lattice = \"lattice3.lte\",\n  p_central_mev = 3000,\n  default_order = 2,\n&end\n"
        );
    }

    #[test]
    fn test_empty_namelist() {
        let mut eb = EleContents::default();
        eb.namelist::<&str, i64, _>("run_control", []);
        assert_eq!(eb.render(), "&run_control &end\n");
    }

    #[test]
    fn test_comments_and_newlines() {
        let mut eb = EleContents::default();
        eb.comment("! Dipole angles").newline().comment("plain note");
        assert_eq!(eb.render(), "! Dipole angles\n\n! plain note\n");
        assert_eq!(eb.len(), 3);
    }

    #[test]
    fn test_float_precision() {
        let mut eb = EleContents::new(12);
        eb.namelist(
            "parallel_optimization_setup",
            [("target", 1e-6), ("tolerance", 1e-14)],
        );
        let text = eb.render();
        assert!(text.contains("  target = 1e-06,\n"));
        assert!(text.contains("  tolerance = 1e-14,\n"));
    }

    #[test]
    fn test_string_quotes_escaped() {
        let v = NamelistValue::from("say \"hi\"");
        assert_eq!(v.render(12), "\"say \\\"hi\\\"\"");
    }

    #[test]
    fn test_backslash_escaped() {
        let v = NamelistValue::from(r"C:\runs\ring.lte");
        assert_eq!(v.render(12), r#""C:\\runs\\ring.lte""#);
        let v = NamelistValue::from(r#"end\""#);
        assert_eq!(v.render(12), r#""end\\\"""#);
    }

    #[test]
    fn test_unknown_namelist_still_emitted() {
        let mut eb = EleContents::default();
        eb.namelist("not_a_command", [("x", 1)]);
        assert!(eb.render().starts_with("&not_a_command\n"));
        assert!(!is_known_namelist("not_a_command"));
        assert!(is_known_namelist("twiss_output"));
    }

    #[test]
    fn test_write_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.ele");
        let mut eb = EleContents::default();
        eb.namelist("track", [("n_passes", 1)]);
        eb.write(&path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "&track\n  n_passes = 1,\n&end\n");
    }
}
