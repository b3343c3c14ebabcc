use precivox_core::pricing::{PricingInput, SmartPricingEngine};
use precivox_core::random::EngineRng;
use precivox_core::telemetry::Telemetry;

use crate::commands::{build_runtime, load_config, CommandResult};

#[derive(Debug, Clone)]
pub struct PriceArgs {
    pub product_id: String,
    pub current_price: f64,
    pub unit_id: Option<String>,
    pub cost: Option<f64>,
}

/// Pricing reads nothing from storage, so no database is opened.
pub fn run(args: PriceArgs) -> CommandResult {
    let config = match load_config("price") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match build_runtime("price") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let engine = SmartPricingEngine::new(
        Telemetry::from_config(&config.engines),
        EngineRng::from_seed_option(config.engines.rng_seed),
    );
    let mut input = PricingInput::new(args.product_id, args.current_price);
    if let Some(unit_id) = args.unit_id {
        input = input.with_unit(unit_id);
    }
    if let Some(cost) = args.cost {
        input = input.with_cost(cost);
    }

    let result = runtime.block_on(engine.analyze(input));
    CommandResult::envelope("price", &result)
}
