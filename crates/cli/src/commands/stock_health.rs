use precivox_core::stock_health::StockHealthInput;

use crate::commands::{with_engine_suite, CommandResult};

#[derive(Debug, Clone)]
pub struct StockHealthArgs {
    pub unit_id: String,
    /// Falls back to `engines.default_market_id`.
    pub market_id: Option<String>,
    pub categories: Vec<String>,
}

pub fn run(args: StockHealthArgs) -> CommandResult {
    with_engine_suite("stock-health", |suite, config| async move {
        let market_id = args.market_id.unwrap_or(config.engines.default_market_id);
        let input = StockHealthInput::new(args.unit_id, market_id).with_categories(args.categories);
        let result = suite.stock_health.analyze(input).await;
        CommandResult::envelope("stock-health", &result)
    })
}
