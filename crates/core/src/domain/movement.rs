use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementKind {
    Inbound,
    Outbound,
}

impl MovementKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Inbound => "INBOUND",
            Self::Outbound => "OUTBOUND",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "INBOUND" => Some(Self::Inbound),
            "OUTBOUND" => Some(Self::Outbound),
            _ => None,
        }
    }
}

/// A receipt into or a removal from one unit's stock of one product.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    pub date: NaiveDate,
    pub kind: MovementKind,
    pub quantity: u32,
}

impl StockMovement {
    pub fn new(date: NaiveDate, kind: MovementKind, quantity: u32) -> Self {
        Self { date, kind, quantity }
    }
}

#[cfg(test)]
mod tests {
    use super::MovementKind;

    #[test]
    fn kinds_use_their_stored_labels() {
        for kind in [MovementKind::Inbound, MovementKind::Outbound] {
            assert_eq!(MovementKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(MovementKind::parse("ENTRADA"), None);
        assert_eq!(
            serde_json::to_string(&MovementKind::Outbound).expect("serialize"),
            "\"OUTBOUND\""
        );
    }
}
