//! # TOML 文档 → `.ele`
//!
//! ```toml
//! precision = 12
//!
//! [[block]]
//! kind = "namelist"
//! name = "run_setup"
//! [block.fields]
//! lattice = "lattice3.lte"
//! p_central_mev = 3e3
//!
//! [[block]]
//! kind = "newline"
//!
//! [[block]]
//! kind = "comment"
//! text = "! Ask for twiss parameters"
//! ```
//!
//! 字段顺序按文档中的顺序保留。布尔值写为 0/1。

use super::namelist::{EleContents, NamelistValue};
use crate::error::{ElekitError, Result};

use serde::Deserialize;
use std::fs;
use std::path::Path;

fn default_precision() -> usize {
    12
}

/// 文档中的单个块
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DocBlock {
    Namelist {
        name: String,
        #[serde(default)]
        fields: toml::Table,
    },
    Comment {
        text: String,
    },
    Newline,
}

/// `.ele` 文档
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EleDocument {
    #[serde(default = "default_precision")]
    pub precision: usize,
    #[serde(default, rename = "block")]
    pub blocks: Vec<DocBlock>,
}

impl EleDocument {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| ElekitError::FileReadError {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_toml_str(&text)
    }

    /// 转换为 `EleContents`
    pub fn to_contents(&self) -> Result<EleContents> {
        let mut contents = EleContents::new(self.precision);
        for block in &self.blocks {
            match block {
                DocBlock::Namelist { name, fields } => {
                    let mut values = Vec::with_capacity(fields.len());
                    for (key, value) in fields {
                        values.push((key.clone(), convert_value(name, key, value)?));
                    }
                    contents.namelist(name, values);
                }
                DocBlock::Comment { text } => {
                    contents.comment(text);
                }
                DocBlock::Newline => {
                    contents.newline();
                }
            }
        }
        Ok(contents)
    }
}

fn convert_value(namelist: &str, key: &str, value: &toml::Value) -> Result<NamelistValue> {
    match value {
        toml::Value::Integer(v) => Ok(NamelistValue::Int(*v)),
        toml::Value::Float(v) => Ok(NamelistValue::Float(*v)),
        toml::Value::String(s) => Ok(NamelistValue::Str(s.clone())),
        toml::Value::Boolean(b) => Ok(NamelistValue::Int(i64::from(*b))),
        other => Err(ElekitError::validation(
            format!("{}.{}", namelist, key),
            format!("unsupported value type '{}'", other.type_str()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"
precision = 12

[[block]]
kind = "namelist"
name = "run_setup"
[block.fields]
lattice = "lattice3.lte"
p_central_mev = 3e3
semaphore_file = "%s.done"
default_order = 2

[[block]]
kind = "newline"

[[block]]
kind = "comment"
text = "! Load solution from previous optimization"

[[block]]
kind = "namelist"
name = "load_parameters"
[block.fields]
filename = "cbiiMatch02.param"
change_defined_values = true

[[block]]
kind = "namelist"
name = "run_control"
"#;

    #[test]
    fn test_document_renders_in_order() {
        let doc = EleDocument::from_toml_str(DOC).unwrap();
        assert_eq!(doc.blocks.len(), 5);
        let text = doc.to_contents().unwrap().render();
        let expected = "&run_setup\n  lattice = \"lattice3.lte\",\n  p_central_mev = 3000,\n  semaphore_file = \"%s.done\",\n  default_order = 2,\n&end\n\n! Load solution from previous optimization\n&load_parameters\n  filename = \"cbiiMatch02.param\",\n  change_defined_values = 1,\n&end\n&run_control &end\n";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_default_precision() {
        let doc = EleDocument::from_toml_str("[[block]]\nkind = \"newline\"\n").unwrap();
        assert_eq!(doc.precision, 12);
    }

    #[test]
    fn test_unsupported_value_type() {
        let doc = EleDocument::from_toml_str(
            "[[block]]\nkind = \"namelist\"\nname = \"track\"\n[block.fields]\nx = [1, 2]\n",
        )
        .unwrap();
        assert!(doc.to_contents().is_err());
    }

    #[test]
    fn test_unknown_kind_rejected() {
        assert!(EleDocument::from_toml_str("[[block]]\nkind = \"macro\"\n").is_err());
    }
}
