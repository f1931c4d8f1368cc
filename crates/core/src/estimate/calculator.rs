use crate::domain::material::MaterialPriceTable;
use crate::estimate::{CostEstimate, Dimensions, EstimateError};

/// Density of the default resin family, in g/cm³.
pub const RESIN_DENSITY_G_PER_CM3: f64 = 1.05;
/// Rate applied when a material is missing from the price table.
pub const FALLBACK_COST_PER_KG: f64 = 150.0;

#[derive(Clone, Copy, Debug)]
pub struct EstimateInput<'a> {
    pub material: &'a str,
    pub size: &'a str,
    pub quantity: u32,
}

pub trait CostCalculator: Send + Sync {
    fn estimate(
        &self,
        input: EstimateInput<'_>,
        prices: &MaterialPriceTable,
    ) -> Result<CostEstimate, EstimateError>;
}

#[derive(Clone, Debug, Default)]
pub struct DeterministicCostCalculator;

impl CostCalculator for DeterministicCostCalculator {
    fn estimate(
        &self,
        input: EstimateInput<'_>,
        prices: &MaterialPriceTable,
    ) -> Result<CostEstimate, EstimateError> {
        estimate_cost(input, prices)
    }
}

pub fn estimate_cost(
    input: EstimateInput<'_>,
    prices: &MaterialPriceTable,
) -> Result<CostEstimate, EstimateError> {
    let dimensions = input.size.parse::<Dimensions>()?;
    let volume_cm3 = dimensions.volume_cm3();
    let weight_kg = (volume_cm3 * RESIN_DENSITY_G_PER_CM3) / 1000.0;
    let unit_cost_per_kg = prices.get(input.material).unwrap_or(FALLBACK_COST_PER_KG);
    let total_cost = weight_kg * f64::from(input.quantity) * unit_cost_per_kg;

    Ok(CostEstimate { volume_cm3, weight_kg, unit_cost_per_kg, total_cost })
}

#[cfg(test)]
mod tests {
    use crate::domain::material::table_from_rows;
    use crate::estimate::{
        calculator::{
            estimate_cost, CostCalculator, DeterministicCostCalculator, EstimateInput,
            FALLBACK_COST_PER_KG,
        },
        EstimateError,
    };

    fn prices() -> crate::domain::material::MaterialPriceTable {
        table_from_rows(vec![vec!["ABS", "120"], vec!["PC", "185.5"]])
    }

    #[test]
    fn abs_reference_quote_matches_expected_totals() {
        let estimate = DeterministicCostCalculator
            .estimate(EstimateInput { material: "ABS", size: "10x5x2", quantity: 50 }, &prices())
            .expect("valid estimate");

        assert_eq!(estimate.volume_cm3, 100.0);
        assert!((estimate.weight_kg - 0.105).abs() < 1e-12);
        assert!((estimate.total_cost - 630.0).abs() < 1e-9);
        assert_eq!(estimate.unit_cost_per_kg, 120.0);
        assert_eq!(estimate.display_total(), "630.00 บาท");
    }

    #[test]
    fn total_follows_closed_form_and_is_deterministic() {
        let table = prices();
        let cases = [("ABS", 10.5, 4.5, 3.0, 100_u32), ("PC", 2.0, 2.0, 2.0, 7), ("PC", 0.5, 40.0, 1.25, 1)];

        for (material, w, l, h, quantity) in cases {
            let size = format!("{w}x{l}x{h}");
            let input = EstimateInput { material, size: &size, quantity };
            let first = estimate_cost(input, &table).expect("first run");
            let second = estimate_cost(input, &table).expect("second run");

            let price = table.get(material).expect("known material");
            let expected = ((w * l * h * 1.05) / 1000.0) * f64::from(quantity) * price;
            assert_eq!(first, second);
            assert!((first.total_cost - expected).abs() < 1e-9, "{material} {size}");
        }
    }

    #[test]
    fn unknown_material_uses_fallback_rate() {
        let estimate = estimate_cost(
            EstimateInput { material: "Titanium", size: "10x10x10", quantity: 2 },
            &prices(),
        )
        .expect("fallback applies");

        assert_eq!(estimate.unit_cost_per_kg, FALLBACK_COST_PER_KG);
        assert!((estimate.total_cost - 1.05 * 2.0 * 150.0).abs() < 1e-9);
    }

    #[test]
    fn malformed_size_is_reported_not_panicked() {
        let error =
            estimate_cost(EstimateInput { material: "ABS", size: "10x5", quantity: 1 }, &prices())
                .expect_err("two tokens");

        assert!(matches!(error, EstimateError::DimensionCount { found: 2, .. }));
    }
}
