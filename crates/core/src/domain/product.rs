use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($name:ident) => {
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(ProductId);
string_id!(UnitId);
string_id!(MarketId);

/// Current on-hand state of one product at one store unit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    pub price: f64,
    #[serde(default)]
    pub promo_price: Option<f64>,
    pub quantity: u32,
    pub unit_id: UnitId,
    pub market_id: MarketId,
    #[serde(default)]
    pub barcode: Option<String>,
    #[serde(default)]
    pub unit_of_measure: Option<String>,
}

impl ProductSnapshot {
    pub fn is_on_promotion(&self) -> bool {
        self.promo_price.is_some()
    }

    pub fn inventory_value(&self) -> f64 {
        f64::from(self.quantity) * self.price
    }

    pub fn has_brand(&self) -> bool {
        self.brand.as_deref().is_some_and(|brand| !brand.is_empty())
    }
}

/// Forecast totals written back onto the product record after a demand prediction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForecastRollup {
    pub forecast_7d: u32,
    pub forecast_30d: u32,
}

#[cfg(test)]
mod tests {
    use super::{MarketId, ProductId, ProductSnapshot, UnitId};

    fn snapshot() -> ProductSnapshot {
        ProductSnapshot {
            id: ProductId::from("prod-1"),
            name: "Arroz".to_string(),
            category: Some("Mercearia".to_string()),
            brand: Some(String::new()),
            price: 10.0,
            promo_price: None,
            quantity: 12,
            unit_id: UnitId::from("unit-1"),
            market_id: MarketId::from("market-1"),
            barcode: None,
            unit_of_measure: None,
        }
    }

    #[test]
    fn ids_serialize_as_plain_strings() {
        let json = serde_json::to_string(&ProductId::from("prod-9")).expect("serialize");
        assert_eq!(json, "\"prod-9\"");
    }

    #[test]
    fn empty_brand_is_not_a_brand() {
        let product = snapshot();
        assert!(!product.has_brand());
        assert_eq!(product.inventory_value(), 120.0);
        assert!(!product.is_on_promotion());
    }
}
