//! # ELEGANT .lte 格式解析器
//!
//! ## .lte 格式说明
//! ```text
//! ! 注释
//! D1: DRIF, L=1.5
//! Q1: KQUAD, L=0.25, K1=1.2, &
//!     SYSTEMATIC_MULTIPOLES="sys/Q1.MULT"
//! CELL: LINE=(D1, Q1, -D1)
//! RING: LINE=(15*CELL, 2*(D1, Q1))
//! USE, RING
//! RETURN
//! ```
//!
//! ## 依赖关系
//! - 被 `archive/ltezip.rs` 和 `commands/report.rs` 使用
//! - 使用 `models/lattice.rs`

use crate::error::{ElekitError, Result};
use crate::models::lattice::{
    Beamline, Element, Lattice, LineItem, PropValue, Property, Statement,
};
use std::fs;
use std::path::Path;

const FORMAT: &str = "lte";
const WRAP_WIDTH: usize = 80;

/// 解析 .lte 文件
pub fn parse_lte_file(path: &Path) -> Result<Lattice> {
    let content = fs::read_to_string(path).map_err(|e| ElekitError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_lte_content(&content).map_err(|e| match e {
        ElekitError::ParseError { format, reason, .. } => ElekitError::ParseError {
            format,
            path: path.display().to_string(),
            reason,
        },
        other => other,
    })
}

/// 从字符串内容解析 .lte 格式
pub fn parse_lte_content(content: &str) -> Result<Lattice> {
    let mut lattice = Lattice::default();

    for (line_no, stmt) in logical_lines(content) {
        if stmt.trim().is_empty() {
            continue;
        }
        let parsed = parse_statement(&stmt).map_err(|reason| ElekitError::ParseError {
            format: FORMAT.to_string(),
            path: "<string>".to_string(),
            reason: format!("line {}: {}", line_no, reason),
        })?;
        let is_return = matches!(parsed, Statement::Return);
        lattice.statements.push(parsed);
        // RETURN 之后的内容不再读取
        if is_return {
            break;
        }
    }

    tracing::debug!(statements = lattice.statements.len(), "parsed lattice");
    Ok(lattice)
}

/// 去注释并合并续行，返回 (起始行号, 语句文本)
fn logical_lines(content: &str) -> Vec<(usize, String)> {
    let mut out = Vec::new();
    let mut buffer = String::new();
    let mut start = 0;

    for (i, raw) in content.lines().enumerate() {
        let line = strip_comment(raw).trim_end();
        if buffer.is_empty() {
            start = i + 1;
        }
        if let Some(body) = line.strip_suffix('&') {
            buffer.push_str(body);
            buffer.push(' ');
            continue;
        }
        buffer.push_str(line);
        out.push((start, std::mem::take(&mut buffer)));
    }
    if !buffer.trim().is_empty() {
        out.push((start, buffer));
    }

    out
}

/// 去掉引号外的 `!` 注释
fn strip_comment(line: &str) -> &str {
    let mut in_quote = false;
    for (i, c) in line.char_indices() {
        match c {
            '"' => in_quote = !in_quote,
            '!' if !in_quote => return &line[..i],
            _ => {}
        }
    }
    line
}

/// 在引号和括号之外按分隔符切分
fn split_top_level(s: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut in_quote = false;
    let mut last = 0;

    for (i, c) in s.char_indices() {
        match c {
            '"' => in_quote = !in_quote,
            '(' if !in_quote => depth += 1,
            ')' if !in_quote => depth -= 1,
            c if c == sep && !in_quote && depth == 0 => {
                parts.push(&s[last..i]);
                last = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&s[last..]);
    parts
}

/// 查找引号外的第一个字符
fn find_unquoted(s: &str, target: char) -> Option<usize> {
    let mut in_quote = false;
    for (i, c) in s.char_indices() {
        if c == '"' {
            in_quote = !in_quote;
        } else if c == target && !in_quote {
            return Some(i);
        }
    }
    None
}

fn parse_name(raw: &str) -> std::result::Result<String, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err("empty name".to_string());
    }
    if let Some(inner) = raw.strip_prefix('"') {
        let inner = inner
            .strip_suffix('"')
            .ok_or_else(|| format!("unterminated quoted name: {}", raw))?;
        return Ok(inner.to_string());
    }
    Ok(raw.to_uppercase())
}

fn parse_value(raw: &str) -> std::result::Result<PropValue, String> {
    let raw = raw.trim();
    if let Some(inner) = raw.strip_prefix('"') {
        let inner = inner
            .strip_suffix('"')
            .ok_or_else(|| format!("unterminated string: {}", raw))?;
        Ok(PropValue::Quoted(inner.to_string()))
    } else if raw.is_empty() {
        Err("missing property value".to_string())
    } else {
        Ok(PropValue::Bare(raw.to_string()))
    }
}

fn parse_statement(stmt: &str) -> std::result::Result<Statement, String> {
    let text = stmt.trim();

    if let Some(rpn) = text.strip_prefix('%') {
        return Ok(Statement::Rpn(rpn.trim().to_string()));
    }

    if text.eq_ignore_ascii_case("RETURN") {
        return Ok(Statement::Return);
    }
    if text.get(..3).is_some_and(|k| k.eq_ignore_ascii_case("USE")) {
        if let Some(rest) = text[3..].trim_start().strip_prefix(',') {
            return Ok(Statement::Use(parse_name(rest)?));
        }
    }

    let colon = find_unquoted(text, ':').ok_or_else(|| format!("expected 'NAME: TYPE', got: {}", text))?;
    let name = parse_name(&text[..colon])?;
    let body = text[colon + 1..].trim();

    let parts = split_top_level(body, ',');
    let head = parts[0].trim();

    if is_line_keyword(head) {
        let rhs = head[4..]
            .trim_start()
            .strip_prefix('=')
            .ok_or_else(|| format!("malformed LINE definition for {}", name))?
            .trim();
        let inner = rhs
            .strip_prefix('(')
            .and_then(|r| r.strip_suffix(')'))
            .ok_or_else(|| format!("LINE for {} must be parenthesised", name))?;
        if parts.len() > 1 {
            return Err(format!("unexpected text after LINE definition for {}", name));
        }
        return Ok(Statement::Line(Beamline {
            name,
            items: parse_line_items(inner)?,
        }));
    }

    if head.is_empty() {
        return Err(format!("missing element type for {}", name));
    }

    let mut properties = Vec::new();
    for part in &parts[1..] {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let eq = find_unquoted(part, '=').ok_or_else(|| format!("expected PROP=VALUE, got: {}", part))?;
        properties.push(Property {
            name: part[..eq].trim().to_uppercase(),
            value: parse_value(&part[eq + 1..])?,
        });
    }

    Ok(Statement::Element(Element {
        name,
        kind: head.to_uppercase(),
        properties,
    }))
}

/// 首个单词恰好为 `LINE`（`LINEARX` 之类的类型名不算）
fn is_line_keyword(head: &str) -> bool {
    match head.get(..4) {
        Some(keyword) if keyword.eq_ignore_ascii_case("LINE") => !head[4..]
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_'),
        _ => false,
    }
}

fn parse_line_items(inner: &str) -> std::result::Result<Vec<LineItem>, String> {
    let mut items = Vec::new();
    for token in split_top_level(inner, ',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        items.push(parse_line_item(token)?);
    }
    Ok(items)
}

fn parse_line_item(token: &str) -> std::result::Result<LineItem, String> {
    let mut rest = token.trim();
    let mut reversed = false;
    let mut repeat = 1u32;

    if let Some(r) = rest.strip_prefix('-') {
        reversed = true;
        rest = r.trim_start();
    }

    if let Some(star) = find_unquoted(rest, '*') {
        let count = rest[..star].trim();
        if !count.is_empty() && count.chars().all(|c| c.is_ascii_digit()) {
            repeat = count
                .parse()
                .map_err(|_| format!("invalid repeat count: {}", token))?;
            rest = rest[star + 1..].trim_start();
            if let Some(r) = rest.strip_prefix('-') {
                reversed = !reversed;
                rest = r.trim_start();
            }
        }
    }

    if let Some(group) = rest.strip_prefix('(') {
        let group = group
            .strip_suffix(')')
            .ok_or_else(|| format!("unbalanced parentheses: {}", token))?;
        return Ok(LineItem::Group {
            items: parse_line_items(group)?,
            reversed,
            repeat,
        });
    }

    Ok(LineItem::Ref {
        name: parse_name(rest)?,
        reversed,
        repeat,
    })
}

// ─────────────────────────────────────────────────────────────
// 输出
// ─────────────────────────────────────────────────────────────

fn format_name(name: &str) -> String {
    let plain = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || matches!(c, '_' | '.' | '$'));
    if plain {
        name.to_string()
    } else {
        format!("\"{}\"", name)
    }
}

fn format_value(value: &PropValue) -> String {
    match value {
        PropValue::Quoted(s) => format!("\"{}\"", s),
        PropValue::Bare(s) => s.clone(),
    }
}

fn format_line_item(item: &LineItem) -> String {
    let (body, reversed, repeat) = match item {
        LineItem::Ref {
            name,
            reversed,
            repeat,
        } => (format_name(name), *reversed, *repeat),
        LineItem::Group {
            items,
            reversed,
            repeat,
        } => (
            format!(
                "({})",
                items.iter().map(format_line_item).collect::<Vec<_>>().join(", ")
            ),
            *reversed,
            *repeat,
        ),
    };

    let mut s = String::new();
    if reversed {
        s.push('-');
    }
    if repeat != 1 {
        s.push_str(&format!("{}*", repeat));
    }
    s.push_str(&body);
    s
}

/// 把若干片段以 ", " 连接，超宽时使用 `&` 续行
fn join_wrapped(head: &str, pieces: &[String]) -> String {
    let mut out = head.to_string();
    let mut current_len = out.len();

    for (i, piece) in pieces.iter().enumerate() {
        let sep = if i == 0 { "" } else { ", " };
        if i > 0 && current_len + sep.len() + piece.len() > WRAP_WIDTH {
            out.push_str(", &\n  ");
            current_len = 2;
        } else {
            out.push_str(sep);
            current_len += sep.len();
        }
        out.push_str(piece);
        current_len += piece.len();
    }
    out
}

/// 生成 .lte 格式字符串
pub fn to_lte_string(lattice: &Lattice) -> String {
    let mut result = String::new();

    for stmt in &lattice.statements {
        let line = match stmt {
            Statement::Element(e) => {
                let mut pieces = vec![e.kind.clone()];
                pieces.extend(
                    e.properties
                        .iter()
                        .map(|p| format!("{}={}", p.name, format_value(&p.value))),
                );
                join_wrapped(&format!("{}: ", format_name(&e.name)), &pieces)
            }
            Statement::Line(l) => {
                let pieces: Vec<String> = l.items.iter().map(format_line_item).collect();
                let mut s = join_wrapped(&format!("{}: LINE=(", format_name(&l.name)), &pieces);
                s.push(')');
                s
            }
            Statement::Use(name) => format!("USE, {}", format_name(name)),
            Statement::Rpn(text) => format!("% {}", text),
            Statement::Return => "RETURN".to_string(),
        };
        result.push_str(&line);
        result.push('\n');
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
! Simple cell
% 0.25 sto LQ
D1: DRIF, L=1.5   ! drift
Q1: KQUAD, L=0.25, K1=1.2, &
    SYSTEMATIC_MULTIPOLES="sys/Q1.MULT"
"B:1": CSBEND, L=0.1, ANGLE=0.005550718042358
CELL: LINE=(D1, Q1, "B:1", -D1)
RING: LINE=(2*CELL, -CELL, 3*(D1, Q1))
USE, RING
RETURN
IGNORED: DRIF, L=9
"#;

    #[test]
    fn test_parse_statements() {
        let lat = parse_lte_content(SAMPLE).unwrap();
        assert_eq!(lat.elements().count(), 3);
        assert_eq!(lat.beamlines().count(), 2);
        assert_eq!(lat.use_target(), Some("RING"));
        assert!(matches!(lat.statements[0], Statement::Rpn(_)));
        assert!(lat.element("IGNORED").is_none());
    }

    #[test]
    fn test_continuation_and_quoted_values() {
        let lat = parse_lte_content(SAMPLE).unwrap();
        let q1 = lat.element("q1").unwrap();
        assert_eq!(q1.kind, "KQUAD");
        assert_eq!(
            q1.property("SYSTEMATIC_MULTIPOLES"),
            Some(&PropValue::Quoted("sys/Q1.MULT".to_string()))
        );
        assert_eq!(q1.property("K1").and_then(|v| v.as_f64()), Some(1.2));
    }

    #[test]
    fn test_quoted_name_is_kept() {
        let lat = parse_lte_content(SAMPLE).unwrap();
        assert!(lat.element("B:1").is_some());
    }

    #[test]
    fn test_type_starting_with_line_is_element() {
        let lat = parse_lte_content("X1: LINEARX, L=0.5\nL1: line = (X1)\n").unwrap();
        let x1 = lat.element("X1").unwrap();
        assert_eq!(x1.kind, "LINEARX");
        assert_eq!(x1.length(), Some(0.5));
        assert_eq!(lat.beamline("L1").unwrap().items.len(), 1);

        assert!(parse_lte_content("B: LINE (X1)\n").is_err());
        assert!(is_line_keyword("LINE=(A)"));
        assert!(is_line_keyword("line = (A)"));
        assert!(!is_line_keyword("LINEARX"));
        assert!(!is_line_keyword("LINE_MARKER"));
    }

    #[test]
    fn test_line_items() {
        let lat = parse_lte_content(SAMPLE).unwrap();
        let ring = lat.beamline("RING").unwrap();
        assert_eq!(ring.items.len(), 3);
        assert!(matches!(
            &ring.items[1],
            LineItem::Ref { reversed: true, repeat: 1, .. }
        ));
        assert!(matches!(&ring.items[2], LineItem::Group { repeat: 3, .. }));

        let seq = lat.expand_line("RING").unwrap();
        // 2*4 + 4 + 3*2
        assert_eq!(seq.len(), 18);
        assert_eq!(&seq[8..12], &["D1", "B:1", "Q1", "D1"]);
    }

    #[test]
    fn test_comment_inside_string_is_kept() {
        let lat = parse_lte_content("W: WAKE, INPUTFILE=\"a!b.sdds\"\n").unwrap();
        let w = lat.element("W").unwrap();
        assert_eq!(w.property("INPUTFILE").unwrap().text(), "a!b.sdds");
    }

    #[test]
    fn test_parse_error_has_line_number() {
        let err = parse_lte_content("D1: DRIF, L=1\nthis is not valid\n").unwrap_err();
        match err {
            ElekitError::ParseError { reason, .. } => assert!(reason.contains("line 2")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_lte_round_trip() {
        let lat = parse_lte_content(SAMPLE).unwrap();
        let text = to_lte_string(&lat);
        let reparsed = parse_lte_content(&text).unwrap();
        assert_eq!(reparsed, lat);
    }

    #[test]
    fn test_long_line_is_wrapped() {
        let items: Vec<String> = (0..40).map(|i| format!("D{}", i)).collect();
        let mut src = String::new();
        for name in &items {
            src.push_str(&format!("{}: DRIF, L=0.1\n", name));
        }
        src.push_str(&format!("L: LINE=({})\n", items.join(", ")));
        let lat = parse_lte_content(&src).unwrap();
        let text = to_lte_string(&lat);
        assert!(text.lines().all(|l| l.len() <= WRAP_WIDTH + 4));
        assert_eq!(parse_lte_content(&text).unwrap(), lat);
    }
}
