//! printf-compatible float rendering.
//!
//! Rust's `{:e}` omits the exponent sign and padding (`1e0`), while the
//! exposition output uses the C form (`1.000000e+00`).

/// Render `v` like `%.<precision>e`.
pub fn fmt_exp(v: f64, precision: usize) -> String {
    if let Some(s) = non_finite(v) {
        return s.into();
    }
    let s = format!("{:.*e}", precision, v);
    c_exponent(&s)
}

/// Render `v` like Go's `%g`: shortest digits, exponent form when the
/// decimal exponent is below -4 or at least 6.
pub fn fmt_general(v: f64) -> String {
    if let Some(s) = non_finite(v) {
        return s.into();
    }
    if v == 0.0 {
        return "0".into();
    }
    let s = format!("{:e}", v);
    let exp = s
        .split_once('e')
        .and_then(|(_, e)| e.parse::<i32>().ok())
        .unwrap_or(0);
    if !(-4..6).contains(&exp) {
        c_exponent(&s)
    } else {
        format!("{v}")
    }
}

fn non_finite(v: f64) -> Option<&'static str> {
    if v.is_nan() {
        Some("NaN")
    } else if v == f64::INFINITY {
        Some("+Inf")
    } else if v == f64::NEG_INFINITY {
        Some("-Inf")
    } else {
        None
    }
}

/// `2.5e-7` -> `2.5e-07`, `1.0e3` -> `1.0e+03`.
fn c_exponent(s: &str) -> String {
    let Some((mantissa, exp)) = s.split_once('e') else {
        return s.to_string();
    };
    let (sign, digits) = match exp.strip_prefix('-') {
        Some(d) => ('-', d),
        None => ('+', exp),
    };
    format!("{mantissa}e{sign}{digits:0>2}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exp_matches_printf() {
        assert_eq!(fmt_exp(1.0, 6), "1.000000e+00");
        assert_eq!(fmt_exp(23.0, 6), "2.300000e+01");
        assert_eq!(fmt_exp(0.00012, 6), "1.200000e-04");
        assert_eq!(fmt_exp(1e-9, 3), "1.000e-09");
        assert_eq!(fmt_exp(1e18, 3), "1.000e+18");
        assert_eq!(fmt_exp(1e100, 2), "1.00e+100");
        assert_eq!(fmt_exp(0.0, 6), "0.000000e+00");
        assert_eq!(fmt_exp(f64::INFINITY, 6), "+Inf");
    }

    #[test]
    fn general_matches_go() {
        assert_eq!(fmt_general(0.0), "0");
        assert_eq!(fmt_general(23.0), "23");
        assert_eq!(fmt_general(123456.0), "123456");
        assert_eq!(fmt_general(1234567.0), "1.234567e+06");
        assert_eq!(fmt_general(0.0001), "0.0001");
        assert_eq!(fmt_general(0.00001), "1e-05");
        assert_eq!(fmt_general(2.5), "2.5");
    }
}
