use std::sync::Arc;

use serde::Serialize;

use crate::config::EngineConfig;
use crate::demand::DemandPredictor;
use crate::ports::{AlertRepository, SalesRepository, StockRepository};
use crate::pricing::SmartPricingEngine;
use crate::random::EngineRng;
use crate::recommendation::GroocRecommendationEngine;
use crate::services::{SalesDataService, StockDataService};
use crate::stock_health::StockHealthEngine;
use crate::telemetry::Telemetry;
use crate::{demand, pricing, recommendation, stock_health};

/// Name and version an engine stamps on its envelopes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct EngineDescriptor {
    pub name: &'static str,
    pub version: &'static str,
}

/// Port implementations shared by every engine.
#[derive(Clone)]
pub struct EngineRepositories {
    pub sales: Arc<dyn SalesRepository>,
    pub stock: Arc<dyn StockRepository>,
    pub alerts: Arc<dyn AlertRepository>,
}

/// The four engines plus the sales and stock data services, wired to one telemetry
/// handle and one random source.
#[derive(Clone)]
pub struct EngineSuite {
    pub demand: DemandPredictor,
    pub stock_health: StockHealthEngine,
    pub pricing: SmartPricingEngine,
    pub grooc: GroocRecommendationEngine,
    pub sales: SalesDataService,
    pub stock: StockDataService,
    telemetry: Telemetry,
}

impl EngineSuite {
    pub fn new(
        repositories: EngineRepositories,
        telemetry: Telemetry,
        rng: EngineRng,
        config: &EngineConfig,
    ) -> Self {
        let demand = DemandPredictor::new(
            Arc::clone(&repositories.sales),
            Arc::clone(&repositories.stock),
            telemetry.clone(),
            rng.clone(),
        )
        .with_batch_concurrency(config.batch_concurrency);
        let stock_health = StockHealthEngine::new(
            Arc::clone(&repositories.stock),
            Arc::clone(&repositories.alerts),
            telemetry.clone(),
            rng.clone(),
        )
        .with_alert_policy(config.alert_persist_limit, config.alert_ttl_days);
        let pricing = SmartPricingEngine::new(telemetry.clone(), rng.clone());
        let grooc = GroocRecommendationEngine::new(
            Arc::clone(&repositories.stock),
            telemetry.clone(),
            rng,
            config.default_market_id.clone(),
        );
        let stock = StockDataService::new(repositories.stock, telemetry.clone());
        let sales = SalesDataService::new(repositories.sales, telemetry.clone());

        Self { demand, stock_health, pricing, grooc, sales, stock, telemetry }
    }

    /// Builds the suite from configuration: telemetry sized by the config and the
    /// random source seeded from `rng_seed` when present.
    pub fn from_config(repositories: EngineRepositories, config: &EngineConfig) -> Self {
        Self::new(
            repositories,
            Telemetry::from_config(config),
            EngineRng::from_seed_option(config.rng_seed),
            config,
        )
    }

    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    pub fn engines(&self) -> [EngineDescriptor; 4] {
        [
            EngineDescriptor { name: demand::ENGINE_NAME, version: demand::ENGINE_VERSION },
            EngineDescriptor {
                name: stock_health::ENGINE_NAME,
                version: stock_health::ENGINE_VERSION,
            },
            EngineDescriptor { name: pricing::ENGINE_NAME, version: pricing::ENGINE_VERSION },
            EngineDescriptor {
                name: recommendation::ENGINE_NAME,
                version: recommendation::ENGINE_VERSION,
            },
        ]
    }
}
