pub mod alert;
pub mod movement;
pub mod product;
pub mod sales;

pub use alert::{
    AlertMetadata, AlertPriority, AlertType, AlertUrgency, PersistedAlert, StockAlert,
};
pub use movement::{MovementKind, StockMovement};
pub use product::{ForecastRollup, MarketId, ProductId, ProductSnapshot, UnitId};
pub use sales::{ProductCorrelation, SalesRecord, Trend};
