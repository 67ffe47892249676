//! # 数值格式化
//!
//! ELEGANT 输入文件中的浮点数按 C 语言 `%.Ng` 规则输出。
//!
//! ## 依赖关系
//! - 被 `elebuilder/` 和 `commands/multipole.rs` 使用
//! - 无外部模块依赖

/// 按 `%.{precision}g` 格式化浮点数
///
/// 有效位数为 0 时按 1 处理，与 C 库行为一致。
pub fn format_g(value: f64, precision: usize) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    let p = precision.max(1);

    // 先按科学计数法舍入，得到舍入后的指数
    let sci = format!("{:.*e}", p - 1, value);
    let (mantissa, exp_str) = match sci.split_once('e') {
        Some(parts) => parts,
        None => return sci,
    };
    let exp: i32 = exp_str.parse().unwrap_or(0);

    if exp < -4 || exp >= p as i32 {
        let mantissa = strip_trailing_zeros(mantissa);
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", mantissa, sign, exp.abs())
    } else {
        let decimals = (p as i32 - 1 - exp).max(0) as usize;
        let fixed = format!("{:.*}", decimals, value);
        strip_trailing_zeros(&fixed).to_string()
    }
}

fn strip_trailing_zeros(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_g_fixed() {
        assert_eq!(format_g(3e3, 12), "3000");
        assert_eq!(format_g(0.1, 12), "0.1");
        assert_eq!(format_g(-0.01, 12), "-0.01");
        assert_eq!(format_g(0.0001, 12), "0.0001");
        assert_eq!(format_g(25.0, 12), "25");
        assert_eq!(format_g(1.5, 6), "1.5");
    }

    #[test]
    fn test_format_g_scientific() {
        assert_eq!(format_g(1e-6, 12), "1e-06");
        assert_eq!(format_g(1e-14, 12), "1e-14");
        assert_eq!(format_g(1e-5, 12), "1e-05");
        assert_eq!(format_g(1234567890123456.0, 12), "1.23456789012e+15");
        assert_eq!(format_g(123456.0, 3), "1.23e+05");
    }

    #[test]
    fn test_format_g_rounding_promotes_exponent() {
        // 6 位有效数字下进位到 10
        assert_eq!(format_g(9.9999999, 6), "10");
        assert_eq!(format_g(9999999.0, 6), "1e+07");
    }

    #[test]
    fn test_format_g_zero_and_specials() {
        assert_eq!(format_g(0.0, 12), "0");
        assert_eq!(format_g(f64::INFINITY, 12), "inf");
        assert_eq!(format_g(f64::NAN, 12), "nan");
    }
}
