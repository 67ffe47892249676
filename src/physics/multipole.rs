//! # 系统多极误差 → CSBEND 多极参数
//!
//! 把 SDDS `.MULT` 表中的 normal/skew 分量（参考半径处的相对场误差）
//! 换算为 ELEGANT CSBEND 元件的 K1..K8 或 b1..b8 参数。
//!
//! ## 换算关系
//! ```text
//! By = B0 * (1 + Σ (K_n * rho / n!) x^n)
//! By = B0 * (1 + Σ (b_n / n!) x^n)        [USE_BN != 0]
//! a_n = (b_n / n!) * Rref^n
//! => b_n = a_n * n! / Rref^n,  K_n = b_n / rho,  rho = L / angle
//! ```
//!
//! ## 依赖关系
//! - 被 `commands/multipole.rs` 使用
//! - 使用 `parsers/sdds.rs`

use crate::error::{ElekitError, Result};
use crate::parsers::sdds::SddsPage;

use std::collections::BTreeMap;

/// CSBEND 实际支持的最高阶
pub const DEFAULT_MAX_ORDER: u32 = 8;

/// 输出形式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsbendForm {
    /// K1..K8 (1/m^(n+1))
    K,
    /// b1..b8 (1/m^n)，对应 USE_BN=1
    B,
}

impl CsbendForm {
    fn prefixes(&self) -> (&'static str, &'static str) {
        match self {
            CsbendForm::K => ("K", "KS"),
            CsbendForm::B => ("b", "bs"),
        }
    }
}

/// CSBEND 几何与换算选项
#[derive(Debug, Clone, Copy)]
pub struct CsbendGeometry {
    /// 弧长 L (m)
    pub length: f64,
    /// 偏转角 (rad)
    pub angle: f64,
    /// 参考半径 (m)
    pub reference_radius: f64,
    pub max_order: u32,
    pub form: CsbendForm,
}

/// SDDS 列名配置
#[derive(Debug, Clone)]
pub struct MultColumns {
    pub order: String,
    pub normal: String,
    pub skew: String,
    pub reference_radius: String,
}

impl Default for MultColumns {
    fn default() -> Self {
        MultColumns {
            order: "order".to_string(),
            normal: "normal".to_string(),
            skew: "skew".to_string(),
            reference_radius: "referenceRadius".to_string(),
        }
    }
}

fn factorial(n: u32) -> f64 {
    (1..=n).map(f64::from).product()
}

/// 换算系统多极误差
///
/// 同名参数出现多次时，后出现的行覆盖先前的值。
pub fn sysmult_to_csbend(
    order: &[i64],
    normal: &[f64],
    skew: Option<&[f64]>,
    geometry: &CsbendGeometry,
) -> Result<BTreeMap<String, f64>> {
    if !(geometry.reference_radius > 0.0) {
        return Err(ElekitError::validation("reference_radius", "must be > 0"));
    }
    if !(geometry.length > 0.0) {
        return Err(ElekitError::validation("L", "must be > 0"));
    }
    if geometry.angle == 0.0 {
        return Err(ElekitError::validation("angle", "must be nonzero (rho = L/angle)"));
    }
    if order.len() != normal.len() {
        return Err(ElekitError::validation(
            "normal",
            "order and normal must have the same length",
        ));
    }
    if let Some(s) = skew {
        if s.len() != order.len() {
            return Err(ElekitError::validation(
                "skew",
                "skew must have the same length as order/normal",
            ));
        }
    }

    let rho = geometry.length / geometry.angle;
    let r = geometry.reference_radius;
    let (normal_prefix, skew_prefix) = geometry.form.prefixes();
    let mut out = BTreeMap::new();

    let mut emit = |values: &[f64], prefix: &str| -> Result<()> {
        for (&n, &a_n) in order.iter().zip(values) {
            if n < 1 || n > i64::from(geometry.max_order) {
                continue;
            }
            let (n, exp) = match (u32::try_from(n), i32::try_from(n)) {
                (Ok(n), Ok(exp)) => (n, exp),
                _ => {
                    return Err(ElekitError::validation(
                        "order",
                        format!("order {} is out of range", n),
                    ))
                }
            };
            let b_n = a_n * factorial(n) / r.powi(exp);
            let value = match geometry.form {
                CsbendForm::B => b_n,
                CsbendForm::K => b_n / rho,
            };
            out.insert(format!("{}{}", prefix, n), value);
        }
        Ok(())
    };

    emit(normal, normal_prefix)?;
    if let Some(s) = skew {
        emit(s, skew_prefix)?;
    }

    Ok(out)
}

/// 阶数列必须是整数值
fn order_from_f64(column: &str, v: f64) -> Result<i64> {
    if !v.is_finite() || v.fract() != 0.0 || v.abs() > i32::MAX as f64 {
        return Err(ElekitError::validation(
            column,
            format!("order {} is not a valid integer", v),
        ));
    }
    Ok(v as i64)
}

/// 从一页 SDDS 数据换算；参考半径取自页参数
pub fn from_sdds_page(
    page: &SddsPage,
    columns: &MultColumns,
    length: f64,
    angle: f64,
    max_order: u32,
    form: CsbendForm,
) -> Result<BTreeMap<String, f64>> {
    let reference_radius = page
        .parameter(&columns.reference_radius)
        .and_then(|v| v.as_f64())
        .ok_or_else(|| {
            ElekitError::validation(&columns.reference_radius, "numeric parameter not found")
        })?;

    let order = page
        .column_f64(&columns.order)?
        .into_iter()
        .map(|v| order_from_f64(&columns.order, v))
        .collect::<Result<Vec<i64>>>()?;
    let normal = page.column_f64(&columns.normal)?;
    let skew = match page.column(&columns.skew) {
        Some(_) => Some(page.column_f64(&columns.skew)?),
        None => None,
    };

    let geometry = CsbendGeometry {
        length,
        angle,
        reference_radius,
        max_order,
        form,
    };
    sysmult_to_csbend(&order, &normal, skew.as_deref(), &geometry)
}

/// 排序：先按名称长度，再按字典序（K2 排在 K10 之前，K8 排在 KS1 之前）
pub fn sorted_entries(values: &BTreeMap<String, f64>) -> Vec<(&str, f64)> {
    let mut entries: Vec<(&str, f64)> = values.iter().map(|(k, v)| (k.as_str(), *v)).collect();
    entries.sort_by(|a, b| (a.0.len(), a.0).cmp(&(b.0.len(), b.0)));
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::sdds::parse_sdds_content;

    fn geometry(form: CsbendForm) -> CsbendGeometry {
        CsbendGeometry {
            length: 0.1,
            angle: 0.005550718042358,
            reference_radius: 0.01,
            max_order: DEFAULT_MAX_ORDER,
            form,
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-12 * b.abs().max(1.0)
    }

    #[test]
    fn test_b_form() {
        let out = sysmult_to_csbend(&[1, 2], &[1e-4, 2e-4], None, &geometry(CsbendForm::B)).unwrap();
        // b1 = 1e-4 * 1 / 0.01; b2 = 2e-4 * 2 / 1e-4
        assert!(close(out["b1"], 1e-2));
        assert!(close(out["b2"], 4.0));
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_k_form_divides_by_rho() {
        let g = geometry(CsbendForm::K);
        let rho = g.length / g.angle;
        let out = sysmult_to_csbend(&[2], &[2e-4], Some(&[1e-4]), &g).unwrap();
        assert!(close(out["K2"], 4.0 / rho));
        assert!(close(out["KS2"], 2.0 / rho));
    }

    #[test]
    fn test_orders_outside_range_are_skipped() {
        let out = sysmult_to_csbend(&[0, 9, 3], &[1.0, 1.0, 1e-6], None, &geometry(CsbendForm::B)).unwrap();
        assert_eq!(out.keys().collect::<Vec<_>>(), vec!["b3"]);
    }

    #[test]
    fn test_order_beyond_i32_rejected() {
        let mut g = geometry(CsbendForm::B);
        g.max_order = u32::MAX;
        let err = sysmult_to_csbend(&[1i64 << 31], &[1.0], None, &g).unwrap_err();
        assert!(matches!(err, ElekitError::Validation { .. }));
        assert!(sysmult_to_csbend(&[-3], &[1.0], None, &g).unwrap().is_empty());
    }

    #[test]
    fn test_non_integer_order_column_rejected() {
        let text = "SDDS1\n&parameter name=referenceRadius, type=double, &end\n&column name=order, type=double, &end\n&column name=normal, type=double, &end\n&data mode=ascii, &end\n0.01\n1\n1.5 1e-4\n";
        let file = parse_sdds_content(text).unwrap();
        let err = from_sdds_page(&file.pages[0], &MultColumns::default(), 0.1, 0.01, 8, CsbendForm::B)
            .unwrap_err();
        assert!(matches!(err, ElekitError::Validation { .. }));
        assert!(order_from_f64("order", f64::NAN).is_err());
        assert!(order_from_f64("order", 1e12).is_err());
        assert_eq!(order_from_f64("order", 3.0).unwrap(), 3);
    }

    #[test]
    fn test_later_rows_overwrite() {
        let out = sysmult_to_csbend(&[1, 1], &[1e-4, 3e-4], None, &geometry(CsbendForm::B)).unwrap();
        assert!(close(out["b1"], 3e-2));
    }

    #[test]
    fn test_invalid_inputs() {
        let mut g = geometry(CsbendForm::K);
        g.reference_radius = 0.0;
        assert!(sysmult_to_csbend(&[1], &[1.0], None, &g).is_err());

        let mut g = geometry(CsbendForm::K);
        g.length = -1.0;
        assert!(sysmult_to_csbend(&[1], &[1.0], None, &g).is_err());

        let mut g = geometry(CsbendForm::K);
        g.angle = 0.0;
        assert!(sysmult_to_csbend(&[1], &[1.0], None, &g).is_err());

        let g = geometry(CsbendForm::K);
        assert!(sysmult_to_csbend(&[1, 2], &[1.0], None, &g).is_err());
        assert!(sysmult_to_csbend(&[1], &[1.0], Some(&[1.0, 2.0]), &g).is_err());
    }

    #[test]
    fn test_from_sdds_page() {
        let text = "SDDS1\n&parameter name=referenceRadius, type=double, &end\n&column name=order, type=long, &end\n&column name=normal, type=double, &end\n&column name=skew, type=double, &end\n&data mode=ascii, &end\n0.01\n2\n1 1e-4 0\n2 2e-4 1e-4\n";
        let file = parse_sdds_content(text).unwrap();
        let out = from_sdds_page(
            &file.pages[0],
            &MultColumns::default(),
            0.1,
            0.005550718042358,
            8,
            CsbendForm::B,
        )
        .unwrap();
        assert!(close(out["b1"], 1e-2));
        assert!(close(out["bs2"], 2.0));
        assert!(close(out["bs1"], 0.0));
    }

    #[test]
    fn test_sorted_entries() {
        let mut m = BTreeMap::new();
        for k in ["KS1", "K8", "K2", "K10"] {
            m.insert(k.to_string(), 0.0);
        }
        let names: Vec<&str> = sorted_entries(&m).into_iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["K2", "K8", "K10", "KS1"]);
    }
}
