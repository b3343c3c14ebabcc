pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgGroup, Parser, Subcommand};

use commands::forecast::ForecastArgs;
use commands::price::PriceArgs;
use commands::recommend::RecommendSource;
use commands::stock_health::StockHealthArgs;

#[derive(Debug, Parser)]
#[command(
    name = "precivox",
    about = "Precivox operator CLI",
    long_about = "Operate the Precivox analytics core: migrations, demo data, config inspection, and one-off engine runs.",
    after_help = "Examples:\n  precivox doctor --json\n  precivox seed\n  precivox forecast --product prod-arroz-5kg --unit unit-centro --horizon 14\n  precivox price --product prod-cafe-500g --price 17.90"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the deterministic demo market, catalog and sales history")]
    Seed,
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Validate config, engine settings, and DB connectivity")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Forecast daily demand for one product at one store unit")]
    Forecast {
        #[arg(long)]
        product: String,
        #[arg(long)]
        unit: String,
        #[arg(long, default_value_t = 7, help = "Forecast horizon in days (1-365)")]
        horizon: u32,
        #[arg(long, default_value_t = 30, help = "Sales history window in days")]
        history: u32,
    },
    #[command(about = "Score stock health for a store unit and store its alerts")]
    StockHealth {
        #[arg(long)]
        unit: String,
        #[arg(long, help = "Market of the unit; defaults to engines.default_market_id")]
        market: Option<String>,
        #[arg(long = "category", help = "Restrict the analysis to a category (repeatable)")]
        categories: Vec<String>,
    },
    #[command(about = "Suggest a price for a product from its current price")]
    Price {
        #[arg(long)]
        product: String,
        #[arg(long)]
        price: f64,
        #[arg(long)]
        unit: Option<String>,
        #[arg(long)]
        cost: Option<f64>,
    },
    #[command(about = "Recommend products and a shopping route for a shopping list given as JSON")]
    #[command(group(ArgGroup::new("source").required(true).args(["file", "json"])))]
    Recommend {
        #[arg(long, help = "Path to a JSON shopping list")]
        file: Option<PathBuf>,
        #[arg(long, help = "Inline JSON shopping list")]
        json: Option<String>,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::Forecast { product, unit, horizon, history } => {
            commands::forecast::run(ForecastArgs {
                product_id: product,
                unit_id: unit,
                horizon_days: horizon,
                history_days: history,
            })
        }
        Command::StockHealth { unit, market, categories } => {
            commands::stock_health::run(StockHealthArgs { unit_id: unit, market_id: market, categories })
        }
        Command::Price { product, price, unit, cost } => commands::price::run(PriceArgs {
            product_id: product,
            current_price: price,
            unit_id: unit,
            cost,
        }),
        Command::Recommend { file, json } => {
            let source = match (file, json) {
                (Some(path), _) => RecommendSource::File(path),
                (None, Some(raw)) => RecommendSource::Inline(raw),
                (None, None) => RecommendSource::Inline(String::new()),
            };
            commands::recommend::run(source)
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
