use std::sync::Arc;

use moldquote_core::config::{AppConfig, LoadOptions};
use moldquote_core::estimate::{estimate_cost, EstimateInput};
use moldquote_sheets::{configured_source, SheetsClient};

use crate::commands::{runtime, CommandResult};

const COMMAND: &str = "estimate";

/// Prices one part the way the questionnaire does, using the configured
/// price source. Unknown materials fall back to the default rate.
pub fn run(material: &str, size: &str, quantity: u32) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match runtime() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let client = SheetsClient::from_config(&config.sheets).map(Arc::new);
    let prices = runtime.block_on(async {
        let source = configured_source(&config, client)?;
        source.load().await
    });
    let prices = match prices {
        Ok(prices) => prices,
        Err(error) => return CommandResult::failure(COMMAND, "pricing", error.to_string(), 6),
    };

    let input = EstimateInput { material: material.trim(), size: size.trim(), quantity };
    match estimate_cost(input, &prices) {
        Ok(estimate) => {
            let listed = if prices.get(input.material).is_some() { "" } else { " (fallback rate)" };
            CommandResult::success(
                COMMAND,
                format!(
                    "material {material}{listed}, size {size} cm, quantity {quantity}: \
                     volume {volume} cm³, weight {weight} kg, total {total}",
                    material = input.material,
                    size = input.size,
                    volume = estimate.display_volume(),
                    weight = estimate.display_weight(),
                    total = estimate.display_total(),
                ),
            )
        }
        Err(error) => CommandResult::failure(COMMAND, "invalid_input", error.to_string(), 7),
    }
}
