//! Transformation module.
//!
//! - Proficiency: campus STAAR records to district rates
//! - Finance: wide PEIMS table to curated district columns
//! - Pipeline: read inputs, run both transforms, validate, write outputs

pub mod finance;
pub mod pipeline;
pub mod proficiency;

pub use finance::{reshape_finance, FinanceOutput};
pub use pipeline::*;
pub use proficiency::{aggregate_proficiency, ProficiencyOutput};

/// Parse a year cell; `2019` and `2019.0` are the same year.
pub(crate) fn parse_year(value: &str) -> Option<i64> {
    let value = value.trim();
    value.parse::<i64>().ok().or_else(|| {
        value
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite() && f.fract() == 0.0)
            .map(|f| f as i64)
    })
}

/// Parse a count cell. Empty cells count as zero, like a skip-missing sum.
pub(crate) fn parse_count(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Some(0.0);
    }
    trimmed.parse::<f64>().ok().filter(|f| f.is_finite())
}

/// Round to `decimals` places, ties to even.
pub(crate) fn round_half_even(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    let scaled = value * factor;
    let rounded = scaled.round();
    let tie = (scaled - scaled.trunc()).abs() == 0.5;
    let result = if tie { 2.0 * (scaled / 2.0).round() } else { rounded };
    result / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_year() {
        assert_eq!(parse_year("2019"), Some(2019));
        assert_eq!(parse_year(" 2019.0 "), Some(2019));
        assert_eq!(parse_year("2019.5"), None);
        assert_eq!(parse_year("FY19"), None);
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count(""), Some(0.0));
        assert_eq!(parse_count("12"), Some(12.0));
        assert_eq!(parse_count(" 12.5 "), Some(12.5));
        assert_eq!(parse_count("NaN"), None);
        assert_eq!(parse_count("x"), None);
    }

    #[test]
    fn test_round_half_even() {
        assert_eq!(round_half_even(15.000000000000002, 2), 15.0);
        assert_eq!(round_half_even(33.333333, 2), 33.33);
        assert_eq!(round_half_even(0.125, 2), 0.12);
        assert_eq!(round_half_even(0.375, 2), 0.38);
        assert_eq!(round_half_even(66.666666, 2), 66.67);
    }
}
