pub mod calculator;
pub mod dimensions;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use calculator::{
    estimate_cost, CostCalculator, DeterministicCostCalculator, EstimateInput,
    FALLBACK_COST_PER_KG, RESIN_DENSITY_G_PER_CM3,
};
pub use dimensions::{Dimensions, SIZE_DELIMITER};

pub const CURRENCY_SUFFIX: &str = "บาท";

/// Derived figures for one questionnaire, kept at full precision.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CostEstimate {
    pub volume_cm3: f64,
    pub weight_kg: f64,
    pub unit_cost_per_kg: f64,
    pub total_cost: f64,
}

impl CostEstimate {
    pub fn display_volume(&self) -> String {
        format_fixed(self.volume_cm3)
    }

    pub fn display_weight(&self) -> String {
        format_fixed(self.weight_kg)
    }

    pub fn display_total(&self) -> String {
        format!("{} {CURRENCY_SUFFIX}", format_amount(self.total_cost))
    }
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum EstimateError {
    #[error("size `{raw}` must have exactly three dimensions, found {found}")]
    DimensionCount { raw: String, found: usize },
    #[error("size `{raw}` has an invalid dimension `{token}`")]
    InvalidDimension { raw: String, token: String },
}

pub fn format_fixed(value: f64) -> String {
    format!("{value:.2}")
}

/// Two decimals with comma thousands separators, e.g. `12,345.60`.
pub fn format_amount(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (integer, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (index, digit) in integer.chars().enumerate() {
        if index > 0 && (integer.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if value < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{sign}{grouped}.{fraction}")
}

#[cfg(test)]
mod tests {
    use super::{format_amount, format_fixed, CostEstimate};

    #[test]
    fn amount_formatting_groups_thousands() {
        assert_eq!(format_amount(0.0), "0.00");
        assert_eq!(format_amount(630.0), "630.00");
        assert_eq!(format_amount(1_234.5), "1,234.50");
        assert_eq!(format_amount(1_234_567.891), "1,234,567.89");
        assert_eq!(format_amount(100_000.0), "100,000.00");
        assert_eq!(format_amount(-2_500.0), "-2,500.00");
    }

    #[test]
    fn estimate_display_keeps_stored_precision() {
        let estimate = CostEstimate {
            volume_cm3: 141.75,
            weight_kg: 0.148_837_5,
            unit_cost_per_kg: 120.0,
            total_cost: 1_786.25,
        };

        assert_eq!(estimate.display_volume(), "141.75");
        assert_eq!(estimate.display_weight(), "0.15");
        assert_eq!(estimate.display_total(), "1,786.25 บาท");
        assert_eq!(estimate.weight_kg, 0.148_837_5);
        assert_eq!(format_fixed(2.0), "2.00");
    }
}
