//! # 晶格数据模型
//!
//! ELEGANT `.lte` 文件的内存表示：元件定义、束线定义及其他语句，
//! 保持原始顺序以便重新输出。
//!
//! ## 依赖关系
//! - 被 `parsers/lte.rs`、`archive/` 和 `commands/report.rs` 使用
//! - 无外部模块依赖

use crate::error::{ElekitError, Result};

use std::collections::HashMap;

/// 束线展开的最大嵌套深度
pub const MAX_LINE_DEPTH: usize = 64;

/// 束线展开后的最大元件数
pub const MAX_EXPANDED_ELEMENTS: usize = 10_000_000;

/// 属性值
#[derive(Debug, Clone, PartialEq)]
pub enum PropValue {
    /// 双引号字符串（不含引号）
    Quoted(String),
    /// 裸值（数字或标识符）
    Bare(String),
}

impl PropValue {
    pub fn text(&self) -> &str {
        match self {
            PropValue::Quoted(s) | PropValue::Bare(s) => s,
        }
    }

    /// 数值形式；引号内的 RPN 表达式返回 None
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropValue::Bare(s) => s.parse().ok(),
            PropValue::Quoted(s) => s.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub name: String,
    pub value: PropValue,
}

/// 元件定义 `NAME: TYPE, PROP=VALUE, ...`
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub name: String,
    pub kind: String,
    pub properties: Vec<Property>,
}

impl Element {
    pub fn property(&self, name: &str) -> Option<&PropValue> {
        self.properties
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .map(|p| &p.value)
    }

    /// 元件长度 (m)，未定义时为 0
    pub fn length(&self) -> Option<f64> {
        match self.property("L") {
            Some(v) => v.as_f64(),
            None => Some(0.0),
        }
    }
}

/// 束线条目
#[derive(Debug, Clone, PartialEq)]
pub enum LineItem {
    /// 引用元件或束线：`NAME`, `-NAME`, `N*NAME`
    Ref {
        name: String,
        reversed: bool,
        repeat: u32,
    },
    /// 括号分组：`N*(A, B)`, `-(A, B)`
    Group {
        items: Vec<LineItem>,
        reversed: bool,
        repeat: u32,
    },
}

/// 束线定义 `NAME: LINE=(...)`
#[derive(Debug, Clone, PartialEq)]
pub struct Beamline {
    pub name: String,
    pub items: Vec<LineItem>,
}

/// `.lte` 文件中的一条语句
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Element(Element),
    Line(Beamline),
    /// `USE, NAME`
    Use(String),
    /// `% ...` RPN 语句，保持原文
    Rpn(String),
    Return,
}

/// 外部文件引用
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReference {
    pub element: String,
    pub property: String,
    pub path: String,
}

/// 长度统计
#[derive(Debug, Clone, PartialEq)]
pub struct LengthSummary {
    pub length: f64,
    /// 长度无法按数值解析的元件
    pub unresolved: Vec<String>,
}

/// 判断属性是否指向外部文件
pub fn is_file_property(name: &str) -> bool {
    let upper = name.to_uppercase();
    matches!(
        upper.as_str(),
        "FILENAME" | "INPUT_FILE" | "WAKEFILE" | "TRWAKEFILE" | "ZWAKEFILE" | "FIELD_MAP"
    ) || upper.ends_with("_FILE")
        || upper.ends_with("MULTIPOLES")
        || upper.ends_with("WAKEFILE")
}

struct Expansion<'a> {
    root: &'a str,
    out: Vec<String>,
}

/// 完整晶格
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Lattice {
    pub statements: Vec<Statement>,
}

impl Lattice {
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.statements.iter().filter_map(|s| match s {
            Statement::Element(e) => Some(e),
            _ => None,
        })
    }

    pub fn beamlines(&self) -> impl Iterator<Item = &Beamline> {
        self.statements.iter().filter_map(|s| match s {
            Statement::Line(l) => Some(l),
            _ => None,
        })
    }

    /// 按名称查找元件（不区分大小写，后定义者优先）
    pub fn element(&self, name: &str) -> Option<&Element> {
        self.elements()
            .filter(|e| e.name.eq_ignore_ascii_case(name))
            .last()
    }

    pub fn beamline(&self, name: &str) -> Option<&Beamline> {
        self.beamlines()
            .filter(|l| l.name.eq_ignore_ascii_case(name))
            .last()
    }

    /// `USE` 语句指定的束线
    pub fn use_target(&self) -> Option<&str> {
        self.statements.iter().rev().find_map(|s| match s {
            Statement::Use(name) => Some(name.as_str()),
            _ => None,
        })
    }

    /// 默认束线：`USE` 目标，否则为最后定义的束线
    pub fn default_line(&self) -> Option<&str> {
        self.use_target()
            .or_else(|| self.beamlines().last().map(|l| l.name.as_str()))
    }

    /// 展开束线为元件名序列
    pub fn expand_line(&self, name: &str) -> Result<Vec<String>> {
        self.expand_line_limited(name, MAX_EXPANDED_ELEMENTS)
    }

    /// 展开束线，元件数超过 `limit` 时报错
    pub fn expand_line_limited(&self, name: &str, limit: usize) -> Result<Vec<String>> {
        let count = self.expanded_len(name)?;
        if count > limit {
            return Err(ElekitError::LineTooLong {
                line: name.to_string(),
                limit,
            });
        }

        let mut expansion = Expansion {
            root: name,
            out: Vec::with_capacity(count),
        };
        let item = LineItem::Ref {
            name: name.to_string(),
            reversed: false,
            repeat: 1,
        };
        self.expand_item(&item, false, 0, &mut expansion)?;
        Ok(expansion.out)
    }

    /// 展开后的元件数，不实际生成序列；溢出时饱和
    pub fn expanded_len(&self, name: &str) -> Result<usize> {
        let item = LineItem::Ref {
            name: name.to_string(),
            reversed: false,
            repeat: 1,
        };
        let mut memo = HashMap::new();
        self.count_item(&item, 0, name, &mut memo)
    }

    fn count_item(
        &self,
        item: &LineItem,
        depth: usize,
        root: &str,
        memo: &mut HashMap<String, usize>,
    ) -> Result<usize> {
        if depth > MAX_LINE_DEPTH {
            return Err(ElekitError::RecursionLimit(root.to_string()));
        }

        let (per_repeat, repeat) = match item {
            LineItem::Ref { name, repeat, .. } => {
                let key = name.to_uppercase();
                let n = if let Some(n) = memo.get(&key) {
                    *n
                } else if let Some(line) = self.beamline(name) {
                    let n = self.count_items(&line.items, depth + 1, root, memo)?;
                    memo.insert(key, n);
                    n
                } else if self.element(name).is_some() {
                    1
                } else {
                    return Err(ElekitError::UnknownElement(name.clone()));
                };
                (n, *repeat)
            }
            LineItem::Group { items, repeat, .. } => {
                (self.count_items(items, depth + 1, root, memo)?, *repeat)
            }
        };
        Ok(per_repeat.saturating_mul(repeat as usize))
    }

    fn count_items(
        &self,
        items: &[LineItem],
        depth: usize,
        root: &str,
        memo: &mut HashMap<String, usize>,
    ) -> Result<usize> {
        items.iter().try_fold(0usize, |acc, item| {
            Ok(acc.saturating_add(self.count_item(item, depth, root, memo)?))
        })
    }

    fn expand_item(
        &self,
        item: &LineItem,
        reversed_ctx: bool,
        depth: usize,
        exp: &mut Expansion<'_>,
    ) -> Result<()> {
        if depth > MAX_LINE_DEPTH {
            return Err(ElekitError::RecursionLimit(exp.root.to_string()));
        }

        match item {
            LineItem::Ref {
                name,
                reversed,
                repeat,
            } => {
                let reversed = *reversed != reversed_ctx;
                if let Some(line) = self.beamline(name) {
                    self.repeat_items(&line.items, *repeat, reversed, depth + 1, exp)?;
                } else if let Some(elem) = self.element(name) {
                    exp.out
                        .extend(std::iter::repeat(elem.name.clone()).take(*repeat as usize));
                } else {
                    return Err(ElekitError::UnknownElement(name.clone()));
                }
            }
            LineItem::Group {
                items,
                reversed,
                repeat,
            } => {
                let reversed = *reversed != reversed_ctx;
                self.repeat_items(items, *repeat, reversed, depth + 1, exp)?;
            }
        }
        Ok(())
    }

    fn repeat_items(
        &self,
        items: &[LineItem],
        repeat: u32,
        reversed: bool,
        depth: usize,
        exp: &mut Expansion<'_>,
    ) -> Result<()> {
        for i in 0..repeat {
            let before = exp.out.len();
            self.expand_items(items, reversed, depth, exp)?;
            // 空束线重复多少次结果都一样
            if i == 0 && exp.out.len() == before {
                break;
            }
        }
        Ok(())
    }

    fn expand_items(
        &self,
        items: &[LineItem],
        reversed: bool,
        depth: usize,
        exp: &mut Expansion<'_>,
    ) -> Result<()> {
        if reversed {
            for item in items.iter().rev() {
                self.expand_item(item, true, depth, exp)?;
            }
        } else {
            for item in items {
                self.expand_item(item, false, depth, exp)?;
            }
        }
        Ok(())
    }

    /// 束线总长度
    pub fn total_length(&self, line: &str) -> Result<LengthSummary> {
        let sequence = self.expand_line(line)?;
        let mut summary = LengthSummary {
            length: 0.0,
            unresolved: Vec::new(),
        };

        for name in &sequence {
            let elem = self
                .element(name)
                .ok_or_else(|| ElekitError::UnknownElement(name.clone()))?;
            match elem.length() {
                Some(l) => summary.length += l,
                None => {
                    if !summary.unresolved.contains(name) {
                        summary.unresolved.push(name.clone());
                    }
                }
            }
        }

        Ok(summary)
    }

    /// 所有指向外部文件的属性
    pub fn file_references(&self) -> Vec<FileReference> {
        self.elements()
            .flat_map(|e| {
                e.properties
                    .iter()
                    .filter(|p| is_file_property(&p.name) && !p.value.text().is_empty())
                    .map(move |p| FileReference {
                        element: e.name.clone(),
                        property: p.name.clone(),
                        path: p.value.text().to_string(),
                    })
            })
            .collect()
    }

    /// 替换文件引用；返回被替换的属性个数
    pub fn rewrite_file_references<F>(&mut self, mut map: F) -> usize
    where
        F: FnMut(&FileReference) -> Option<String>,
    {
        let mut count = 0;
        for stmt in &mut self.statements {
            if let Statement::Element(e) = stmt {
                for p in &mut e.properties {
                    if !is_file_property(&p.name) || p.value.text().is_empty() {
                        continue;
                    }
                    let reference = FileReference {
                        element: e.name.clone(),
                        property: p.name.clone(),
                        path: p.value.text().to_string(),
                    };
                    if let Some(new_path) = map(&reference) {
                        p.value = PropValue::Quoted(new_path);
                        count += 1;
                    }
                }
            }
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn elem(name: &str, kind: &str, l: Option<&str>) -> Statement {
        let properties = l
            .map(|v| {
                vec![Property {
                    name: "L".to_string(),
                    value: PropValue::Bare(v.to_string()),
                }]
            })
            .unwrap_or_default();
        Statement::Element(Element {
            name: name.to_string(),
            kind: kind.to_string(),
            properties,
        })
    }

    fn r(name: &str) -> LineItem {
        LineItem::Ref {
            name: name.to_string(),
            reversed: false,
            repeat: 1,
        }
    }

    fn sample() -> Lattice {
        Lattice {
            statements: vec![
                elem("D1", "DRIF", Some("1.5")),
                elem("Q1", "KQUAD", Some("0.25")),
                elem("M", "MARK", None),
                Statement::Line(Beamline {
                    name: "CELL".to_string(),
                    items: vec![r("D1"), r("Q1"), r("M")],
                }),
                Statement::Line(Beamline {
                    name: "RING".to_string(),
                    items: vec![
                        LineItem::Ref {
                            name: "CELL".to_string(),
                            reversed: false,
                            repeat: 2,
                        },
                        LineItem::Ref {
                            name: "CELL".to_string(),
                            reversed: true,
                            repeat: 1,
                        },
                    ],
                }),
            ],
        }
    }

    #[test]
    fn test_expand_line_with_repeat_and_reverse() {
        let lat = sample();
        let seq = lat.expand_line("RING").unwrap();
        assert_eq!(
            seq,
            vec!["D1", "Q1", "M", "D1", "Q1", "M", "M", "Q1", "D1"]
        );
    }

    #[test]
    fn test_total_length() {
        let lat = sample();
        let summary = lat.total_length("ring").unwrap();
        assert!((summary.length - 5.25).abs() < 1e-12);
        assert!(summary.unresolved.is_empty());
    }

    #[test]
    fn test_unknown_element() {
        let mut lat = sample();
        lat.statements.push(Statement::Line(Beamline {
            name: "BAD".to_string(),
            items: vec![r("NOPE")],
        }));
        assert!(matches!(
            lat.expand_line("BAD"),
            Err(ElekitError::UnknownElement(_))
        ));
    }

    #[test]
    fn test_recursive_line_detected() {
        let lat = Lattice {
            statements: vec![Statement::Line(Beamline {
                name: "LOOP".to_string(),
                items: vec![r("LOOP")],
            })],
        };
        assert!(matches!(
            lat.expand_line("LOOP"),
            Err(ElekitError::RecursionLimit(_))
        ));
    }

    #[test]
    fn test_expansion_size_limited() {
        let mut lat = sample();
        // 每层 1000 倍，4 层即 10^12 个元件
        let mut inner = "D1".to_string();
        for name in ["A", "B", "C", "X"] {
            lat.statements.push(Statement::Line(Beamline {
                name: name.to_string(),
                items: vec![LineItem::Ref {
                    name: inner.clone(),
                    reversed: false,
                    repeat: 1000,
                }],
            }));
            inner = name.to_string();
        }
        assert_eq!(lat.expand_line_limited("A", 1000).unwrap().len(), 1000);
        assert_eq!(lat.expanded_len("X").unwrap(), 1_000_000_000_000);
        assert!(matches!(
            lat.expand_line_limited("B", 5000),
            Err(ElekitError::LineTooLong { limit: 5000, .. })
        ));
        assert!(matches!(
            lat.expand_line("X"),
            Err(ElekitError::LineTooLong { .. })
        ));
    }

    #[test]
    fn test_repeated_empty_line() {
        let mut lat = sample();
        lat.statements.push(Statement::Line(Beamline {
            name: "EMPTY".to_string(),
            items: vec![],
        }));
        lat.statements.push(Statement::Line(Beamline {
            name: "MANY".to_string(),
            items: vec![
                LineItem::Ref {
                    name: "EMPTY".to_string(),
                    reversed: false,
                    repeat: u32::MAX,
                },
                r("D1"),
            ],
        }));
        assert_eq!(lat.expand_line("MANY").unwrap(), vec!["D1".to_string()]);
    }

    #[test]
    fn test_default_line() {
        let mut lat = sample();
        assert_eq!(lat.default_line(), Some("RING"));
        lat.statements.push(Statement::Use("CELL".to_string()));
        assert_eq!(lat.default_line(), Some("CELL"));
    }

    #[test]
    fn test_is_file_property() {
        assert!(is_file_property("systematic_multipoles"));
        assert!(is_file_property("INPUT_FILE"));
        assert!(is_file_property("TRWAKEFILE"));
        assert!(is_file_property("FILENAME"));
        assert!(!is_file_property("L"));
        assert!(!is_file_property("K1"));
    }
}
