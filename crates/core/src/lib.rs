pub mod config;
pub mod demand;
pub mod domain;
pub mod envelope;
pub mod errors;
pub mod ports;
pub mod pricing;
pub mod random;
pub mod recommendation;
pub mod services;
pub mod stock_health;
pub mod suite;
pub mod telemetry;

#[cfg(test)]
mod testing;

pub use config::{AppConfig, ConfigError, ConfigOverrides, EngineConfig, LoadOptions};
pub use demand::{DemandForecast, DemandInput, DemandPredictor};
pub use domain::{
    AlertPriority, AlertType, ForecastRollup, MarketId, MovementKind, PersistedAlert,
    ProductCorrelation, ProductId, ProductSnapshot, SalesRecord, StockAlert, StockMovement, Trend,
    UnitId,
};
pub use envelope::{EngineMetadata, EngineResult, ExecutionTimer};
pub use errors::{ApplicationError, DomainError, InterfaceError, InterfaceErrorKind};
pub use ports::{AlertRepository, SalesRepository, StockRepository};
pub use pricing::{PricingInput, PricingRecommendation, SmartPricingEngine};
pub use random::EngineRng;
pub use recommendation::{GroocRecommendationEngine, RecommendationInput, RecommendationOutput};
pub use services::{SalesDataService, SalesInsights, StockDataService, StockHistory};
pub use stock_health::{StockHealthEngine, StockHealthInput, StockHealthReport};
pub use suite::{EngineDescriptor, EngineRepositories, EngineSuite};
pub use telemetry::{LogBuffer, LogFilter, LogLevel, MetricsCollector, Telemetry};
