use precivox_core::demand::DemandInput;

use crate::commands::{with_engine_suite, CommandResult};

#[derive(Debug, Clone)]
pub struct ForecastArgs {
    pub product_id: String,
    pub unit_id: String,
    pub horizon_days: u32,
    pub history_days: u32,
}

pub fn run(args: ForecastArgs) -> CommandResult {
    with_engine_suite("forecast", |suite, _config| async move {
        let input = DemandInput::new(args.product_id, args.unit_id)
            .with_history_window(args.history_days)
            .with_horizon(args.horizon_days);
        let result = suite.demand.predict(input).await;
        CommandResult::envelope("forecast", &result)
    })
}
