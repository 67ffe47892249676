//! # SDDS ASCII 格式解析器
//!
//! 读取 ELEGANT 使用的 SDDS1 ASCII 文件（如 `.MULT` 多极误差表）。
//!
//! ## SDDS ASCII 格式说明
//! ```text
//! SDDS1
//! &parameter name=referenceRadius, type=double, units=m, &end
//! &column name=order, type=long, &end
//! &column name=normal, type=double, &end
//! &data mode=ascii, &end
//! ! page number 1
//! 0.01          <- 每个参数一行
//! 2             <- 行数
//! 1 0.0 0.0
//! 2 1.5e-4 0.0
//! ```
//!
//! 仅支持 ASCII 模式；二进制模式和 `&array` 返回错误。
//!
//! ## 依赖关系
//! - 被 `physics/multipole.rs` 和 `commands/multipole.rs` 使用

use crate::error::{ElekitError, Result};
use std::fs;
use std::path::Path;

const FORMAT: &str = "sdds";

/// SDDS 数据类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SddsType {
    Double,
    Long,
    Str,
}

impl SddsType {
    fn from_name(name: &str) -> std::result::Result<Self, String> {
        match name.to_lowercase().as_str() {
            "double" | "float" | "longdouble" => Ok(SddsType::Double),
            "long" | "short" | "ulong" | "ushort" | "long64" | "ulong64" => Ok(SddsType::Long),
            "string" | "character" => Ok(SddsType::Str),
            other => Err(format!("unsupported data type '{}'", other)),
        }
    }
}

/// 单个取值
#[derive(Debug, Clone, PartialEq)]
pub enum SddsValue {
    Double(f64),
    Long(i64),
    Str(String),
}

impl SddsValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SddsValue::Double(v) => Some(*v),
            SddsValue::Long(v) => Some(*v as f64),
            SddsValue::Str(s) => s.trim().parse().ok(),
        }
    }

    fn parse(kind: SddsType, token: &str) -> std::result::Result<Self, String> {
        match kind {
            SddsType::Double => token
                .parse()
                .map(SddsValue::Double)
                .map_err(|_| format!("invalid double '{}'", token)),
            SddsType::Long => token
                .parse()
                .map(SddsValue::Long)
                .map_err(|_| format!("invalid integer '{}'", token)),
            SddsType::Str => Ok(SddsValue::Str(token.to_string())),
        }
    }
}

/// 参数或列的定义
#[derive(Debug, Clone, PartialEq)]
pub struct SddsDefinition {
    pub name: String,
    pub kind: SddsType,
    pub units: Option<String>,
    pub fixed_value: Option<String>,
}

/// 一页数据
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SddsPage {
    pub parameters: Vec<(String, SddsValue)>,
    /// 按列存储，与 `SddsFile::columns` 同序
    pub columns: Vec<(String, Vec<SddsValue>)>,
}

impl SddsPage {
    pub fn parameter(&self, name: &str) -> Option<&SddsValue> {
        self.parameters.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn column(&self, name: &str) -> Option<&[SddsValue]> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_slice())
    }

    /// 数值列
    pub fn column_f64(&self, name: &str) -> Result<Vec<f64>> {
        let values = self
            .column(name)
            .ok_or_else(|| ElekitError::validation(name, "column not found"))?;
        values
            .iter()
            .map(|v| {
                v.as_f64()
                    .ok_or_else(|| ElekitError::validation(name, "column is not numeric"))
            })
            .collect()
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map(|(_, v)| v.len()).unwrap_or(0)
    }
}

/// 完整 SDDS 文件
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SddsFile {
    pub description: Option<String>,
    pub parameters: Vec<SddsDefinition>,
    pub columns: Vec<SddsDefinition>,
    pub pages: Vec<SddsPage>,
}

/// 解析 SDDS 文件
pub fn parse_sdds_file(path: &Path) -> Result<SddsFile> {
    let content = fs::read_to_string(path).map_err(|e| ElekitError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_sdds_content(&content).map_err(|reason| ElekitError::ParseError {
        format: FORMAT.to_string(),
        path: path.display().to_string(),
        reason,
    })
}

/// 从字符串内容解析 SDDS ASCII
pub fn parse_sdds_content(content: &str) -> std::result::Result<SddsFile, String> {
    let mut lines = content.lines();

    let first = lines.next().map(str::trim).unwrap_or("");
    if !first.starts_with("SDDS") {
        return Err("missing SDDS header line".to_string());
    }

    let mut file = SddsFile::default();
    let mut no_row_counts = false;
    let mut buffer = String::new();
    let mut found_data = false;

    // ── 头部 ──
    for line in lines.by_ref() {
        let trimmed = line.trim();
        if buffer.is_empty() && (trimmed.is_empty() || trimmed.starts_with('!')) {
            continue;
        }
        buffer.push_str(trimmed);
        buffer.push(' ');
        if !contains_unquoted(&buffer, "&end") {
            continue;
        }

        let (command, fields) = parse_command(&buffer)?;
        buffer.clear();

        match command.as_str() {
            "description" => file.description = lookup(&fields, "text").map(str::to_string),
            "parameter" => file.parameters.push(definition(&fields)?),
            "column" => file.columns.push(definition(&fields)?),
            "array" => return Err("&array data is not supported".to_string()),
            "include" | "associate" => {}
            "data" => {
                let mode = lookup(&fields, "mode").unwrap_or("binary");
                if !mode.eq_ignore_ascii_case("ascii") {
                    return Err(format!("data mode '{}' is not supported", mode));
                }
                no_row_counts = lookup(&fields, "no_row_counts").is_some_and(|v| v.trim() != "0");
                found_data = true;
                break;
            }
            other => return Err(format!("unknown header command '&{}'", other)),
        }
    }

    if !found_data {
        return Err("missing &data command".to_string());
    }

    // ── 数据 ──
    let data: Vec<&str> = lines.collect();
    let mut pos = 0;

    loop {
        let mut page = SddsPage::default();

        // 参数
        let mut started = false;
        for def in &file.parameters {
            let value = match &def.fixed_value {
                Some(fixed) => fixed.clone(),
                None => {
                    let line = next_content_line(&data, &mut pos).ok_or_else(|| {
                        format!("unexpected end of data reading parameter '{}'", def.name)
                    })?;
                    started = true;
                    match def.kind {
                        SddsType::Str => unquote(line.trim()),
                        _ => line.split_whitespace().next().unwrap_or("").to_string(),
                    }
                }
            };
            page.parameters
                .push((def.name.clone(), SddsValue::parse(def.kind, &value)?));
        }

        // 行数
        let rows = if no_row_counts {
            None
        } else {
            match next_content_line(&data, &mut pos) {
                Some(line) => Some(
                    line.trim()
                        .parse::<usize>()
                        .map_err(|_| format!("invalid row count '{}'", line.trim()))?,
                ),
                None if started => return Err("unexpected end of data reading row count".to_string()),
                None => break,
            }
        };

        if rows.is_none() && !started && !has_more_content(&data, pos) {
            break;
        }

        // 行数据
        let ncols = file.columns.len();
        let mut columns: Vec<Vec<SddsValue>> = vec![Vec::new(); ncols];
        let mut tokens: Vec<String> = Vec::new();
        let mut row = 0;

        while rows.map_or(true, |r| row < r) && ncols > 0 {
            if tokens.len() < ncols {
                let line = if no_row_counts {
                    // 空行结束一页
                    match data.get(pos) {
                        Some(line) if line.trim().is_empty() => {
                            pos += 1;
                            break;
                        }
                        Some(line) => {
                            pos += 1;
                            if line.trim_start().starts_with('!') {
                                continue;
                            }
                            *line
                        }
                        None => break,
                    }
                } else {
                    next_content_line(&data, &mut pos)
                        .ok_or_else(|| format!("unexpected end of data at row {}", row + 1))?
                };
                tokens.extend(tokenize(line));
                // 一行可以续到下一行，但不能跨越行边界
                if tokens.len() > ncols {
                    return Err(format!(
                        "row {} has {} values, expected {}",
                        row + 1,
                        tokens.len(),
                        ncols
                    ));
                }
                continue;
            }

            for (c, token) in tokens.drain(..).enumerate() {
                columns[c].push(SddsValue::parse(file.columns[c].kind, &token)?);
            }
            row += 1;
        }

        if !tokens.is_empty() {
            return Err(format!(
                "incomplete row {}: {} of {} values",
                row + 1,
                tokens.len(),
                ncols
            ));
        }

        page.columns = file
            .columns
            .iter()
            .map(|d| d.name.clone())
            .zip(columns)
            .collect();
        file.pages.push(page);

        if !has_more_content(&data, pos) {
            break;
        }
    }

    Ok(file)
}

/// 下一条非空、非注释行
fn next_content_line<'a>(data: &[&'a str], pos: &mut usize) -> Option<&'a str> {
    while let Some(line) = data.get(*pos) {
        *pos += 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('!') {
            continue;
        }
        return Some(line);
    }
    None
}

fn has_more_content(data: &[&str], pos: usize) -> bool {
    data[pos.min(data.len())..]
        .iter()
        .any(|l| !l.trim().is_empty() && !l.trim_start().starts_with('!'))
}

fn contains_unquoted(s: &str, needle: &str) -> bool {
    let mut in_quote = false;
    let bytes = s.as_bytes();
    for i in 0..bytes.len() {
        if bytes[i] == b'"' {
            in_quote = !in_quote;
        } else if !in_quote && bytes[i..].starts_with(needle.as_bytes()) {
            return true;
        }
    }
    false
}

/// 解析 `&cmd key=value, key="value", &end`
fn parse_command(text: &str) -> std::result::Result<(String, Vec<(String, String)>), String> {
    let text = text.trim();
    let body = text
        .strip_prefix('&')
        .ok_or_else(|| format!("expected header command, got: {}", text))?;

    let (command, rest) = match body.find(|c: char| c.is_whitespace() || c == ',') {
        Some(i) => (&body[..i], &body[i..]),
        None => (body, ""),
    };

    let mut fields = Vec::new();
    for part in split_fields(rest) {
        let part = part.trim();
        if part.is_empty() || part.eq_ignore_ascii_case("&end") {
            continue;
        }
        let part = part.trim_end_matches("&end").trim();
        if part.is_empty() {
            continue;
        }
        let (key, value) = part
            .split_once('=')
            .ok_or_else(|| format!("expected key=value in &{}: {}", command, part))?;
        fields.push((key.trim().to_lowercase(), unquote(value.trim())));
    }

    Ok((command.to_lowercase(), fields))
}

fn split_fields(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quote = false;
    let mut last = 0;
    for (i, c) in s.char_indices() {
        match c {
            '"' => in_quote = !in_quote,
            ',' if !in_quote => {
                parts.push(&s[last..i]);
                last = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&s[last..]);
    parts
}

fn lookup<'a>(fields: &'a [(String, String)], key: &str) -> Option<&'a str> {
    fields.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
}

fn definition(fields: &[(String, String)]) -> std::result::Result<SddsDefinition, String> {
    let name = lookup(fields, "name").ok_or("definition without name")?;
    let kind = SddsType::from_name(lookup(fields, "type").unwrap_or("double"))?;
    Ok(SddsDefinition {
        name: name.to_string(),
        kind,
        units: lookup(fields, "units").map(str::to_string),
        fixed_value: lookup(fields, "fixed_value").map(str::to_string),
    })
}

fn unquote(s: &str) -> String {
    s.strip_prefix('"')
        .and_then(|r| r.strip_suffix('"'))
        .unwrap_or(s)
        .replace("\\\"", "\"")
}

/// 按空白切分，双引号内的空白保留
fn tokenize(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quote = false;
    let mut has_token = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' if in_quote => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            '"' => {
                in_quote = !in_quote;
                has_token = true;
            }
            c if c.is_whitespace() && !in_quote => {
                if has_token {
                    tokens.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            c => {
                current.push(c);
                has_token = true;
            }
        }
    }
    if has_token {
        tokens.push(current);
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    const MULT: &str = r#"SDDS1
&description text="systematic multipoles", &end
&parameter name=referenceRadius, type=double, units=m, &end
&parameter name=magnet, type=string, &end
&column name=order, type=long, &end
&column name=normal, type=double, &end
&column name=skew, type=double, &end
&data mode=ascii, &end
! page number 1
0.01
"CB1 dipole"
3
1 1.0e-4 0.0
2 -2.5e-4 1e-5
3 0 0
! page number 2
0.02
B2
1
2 3e-4 0
"#;

    #[test]
    fn test_parse_header() {
        let file = parse_sdds_content(MULT).unwrap();
        assert_eq!(file.description.as_deref(), Some("systematic multipoles"));
        assert_eq!(file.parameters.len(), 2);
        assert_eq!(file.parameters[0].units.as_deref(), Some("m"));
        assert_eq!(file.columns.len(), 3);
        assert_eq!(file.columns[0].kind, SddsType::Long);
    }

    #[test]
    fn test_parse_pages() {
        let file = parse_sdds_content(MULT).unwrap();
        assert_eq!(file.pages.len(), 2);

        let p1 = &file.pages[0];
        assert_eq!(p1.parameter("referenceRadius"), Some(&SddsValue::Double(0.01)));
        assert_eq!(
            p1.parameter("magnet"),
            Some(&SddsValue::Str("CB1 dipole".to_string()))
        );
        assert_eq!(p1.row_count(), 3);
        assert_eq!(p1.column_f64("normal").unwrap(), vec![1.0e-4, -2.5e-4, 0.0]);
        assert_eq!(p1.column("order").unwrap()[2], SddsValue::Long(3));

        let p2 = &file.pages[1];
        assert_eq!(p2.row_count(), 1);
        assert_eq!(p2.parameter("referenceRadius").unwrap().as_f64(), Some(0.02));
    }

    #[test]
    fn test_fixed_value_parameter() {
        let text = "SDDS1\n&parameter name=R, type=double, fixed_value=0.015, &end\n&column name=x, type=double, &end\n&data mode=ascii, &end\n2\n1.0\n2.0\n";
        let file = parse_sdds_content(text).unwrap();
        assert_eq!(file.pages.len(), 1);
        assert_eq!(file.pages[0].parameter("R").unwrap().as_f64(), Some(0.015));
        assert_eq!(file.pages[0].column_f64("x").unwrap(), vec![1.0, 2.0]);
    }

    #[test]
    fn test_no_row_counts() {
        let text = "SDDS1\n&column name=a, type=long, &end\n&column name=b, type=string, &end\n&data mode=ascii, no_row_counts=1, &end\n1 \"x y\"\n2 z\n\n3 w\n";
        let file = parse_sdds_content(text).unwrap();
        assert_eq!(file.pages.len(), 2);
        assert_eq!(file.pages[0].row_count(), 2);
        assert_eq!(
            file.pages[0].column("b").unwrap()[0],
            SddsValue::Str("x y".to_string())
        );
        assert_eq!(file.pages[1].row_count(), 1);
    }

    #[test]
    fn test_row_with_extra_value_rejected() {
        let text = "SDDS1\n&column name=a, type=long, &end\n&column name=b, type=long, &end\n&data mode=ascii, &end\n2\n1 2 99\n3 4\n";
        let err = parse_sdds_content(text).unwrap_err();
        assert!(err.contains("row 1 has 3 values"), "{}", err);
    }

    #[test]
    fn test_row_continued_on_next_line() {
        let text = "SDDS1\n&column name=a, type=long, &end\n&column name=b, type=long, &end\n&data mode=ascii, &end\n2\n1\n2\n3 4\n";
        let file = parse_sdds_content(text).unwrap();
        let page = &file.pages[0];
        assert_eq!(page.column("a"), Some(&[SddsValue::Long(1), SddsValue::Long(3)][..]));
        assert_eq!(page.column("b"), Some(&[SddsValue::Long(2), SddsValue::Long(4)][..]));
    }

    #[test]
    fn test_blank_line_inside_row_rejected() {
        let text = "SDDS1\n&column name=a, type=long, &end\n&column name=b, type=long, &end\n&data mode=ascii, no_row_counts=1, &end\n1 2\n3\n\n4 5\n";
        let err = parse_sdds_content(text).unwrap_err();
        assert!(err.contains("incomplete row 2"), "{}", err);
    }

    #[test]
    fn test_truncated_last_row_rejected() {
        let text = "SDDS1\n&column name=a, type=long, &end\n&column name=b, type=long, &end\n&data mode=ascii, no_row_counts=1, &end\n1 2\n3\n";
        assert!(parse_sdds_content(text).unwrap_err().contains("incomplete row 2"));
    }

    #[test]
    fn test_binary_rejected() {
        let text = "SDDS1\n&column name=a, type=long, &end\n&data mode=binary, &end\n";
        assert!(parse_sdds_content(text).unwrap_err().contains("binary"));
    }

    #[test]
    fn test_missing_header() {
        assert!(parse_sdds_content("hello\n").is_err());
    }

    #[test]
    fn test_tokenize_quoted() {
        assert_eq!(tokenize(r#"1 "a b" "" c"#), vec!["1", "a b", "", "c"]);
    }
}
