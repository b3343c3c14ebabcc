use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use precivox_core::errors::ApplicationError;

pub mod alert;
pub mod memory;
pub mod sales;
pub mod stock;

pub use alert::SqlAlertRepository;
pub use memory::{InMemoryAlertRepository, InMemorySalesRepository, InMemoryStockRepository};
pub use sales::SqlSalesRepository;
pub use stock::SqlStockRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<RepositoryError> for ApplicationError {
    fn from(error: RepositoryError) -> Self {
        ApplicationError::Persistence(error.to_string())
    }
}

pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";

pub(crate) fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub(crate) fn parse_date(column: &str, value: &str) -> Result<NaiveDate, RepositoryError> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|error| {
        RepositoryError::Decode(format!("invalid date in `{column}`: `{value}` ({error})"))
    })
}

pub(crate) fn parse_timestamp(column: &str, value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value).map(|timestamp| timestamp.with_timezone(&Utc)).map_err(
        |error| {
            RepositoryError::Decode(format!("invalid timestamp in `{column}`: `{value}` ({error})"))
        },
    )
}

pub(crate) fn parse_quantity(column: &str, value: i64) -> Result<u32, RepositoryError> {
    u32::try_from(value).map_err(|_| {
        RepositoryError::Decode(format!("quantity out of range in `{column}`: {value}"))
    })
}

/// First day of a trailing window of `days` days ending on `end` (inclusive).
pub(crate) fn window_start(end: NaiveDate, days: u32) -> NaiveDate {
    end - chrono::Duration::days(i64::from(days.saturating_sub(1)))
}
