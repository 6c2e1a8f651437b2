//! Custom serde deserializers for flexible type handling
//!
//! The listing API is not consistent about how it encodes prices, flags and
//! timestamps. These deserializers accept each of the shapes seen in practice.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, de};

/// A price as reported by the listing API
#[derive(Debug, Clone, PartialEq)]
pub struct PriceAmount {
    /// Numeric amount
    pub amount: f64,
    /// Currency, when the API attached one to the price itself
    pub currency: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FlexibleNumber {
    Float(f64),
    String(String),
}

impl FlexibleNumber {
    fn into_f64<E: de::Error>(self) -> Result<f64, E> {
        match self {
            Self::Float(value) => Ok(value),
            Self::String(s) => s
                .trim()
                .parse()
                .map_err(|_| E::custom(format!("invalid number: {}", s))),
        }
    }
}

/// Deserialize a price that can be:
/// - a JSON number: `12.5`
/// - a numeric string: `"12.5"`
/// - an object: `{"amount": 12.5, "currency": "EUR"}` (amount may be a string)
pub fn deserialize_flexible_price<'de, D>(deserializer: D) -> Result<Option<PriceAmount>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum FlexiblePrice {
        Object {
            amount: FlexibleNumber,
            #[serde(default)]
            currency: Option<String>,
        },
        Plain(FlexibleNumber),
    }

    let value: Option<FlexiblePrice> = Option::deserialize(deserializer)?;

    match value {
        None => Ok(None),
        Some(FlexiblePrice::Plain(number)) => Ok(Some(PriceAmount {
            amount: number.into_f64()?,
            currency: None,
        })),
        Some(FlexiblePrice::Object { amount, currency }) => Ok(Some(PriceAmount {
            amount: amount.into_f64()?,
            currency,
        })),
    }
}

/// Deserialize a reserved marker that can be:
/// - JSON boolean: `true`, `false`
/// - Integer: `0` (false), any positive integer (true)
/// - Object: `{"flag": true}`
pub fn deserialize_reserved_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum FlexibleFlag {
        Bool(bool),
        Int(i64),
        Object {
            #[serde(default)]
            flag: bool,
        },
    }

    let value: Option<FlexibleFlag> = Option::deserialize(deserializer)?;

    Ok(match value {
        None => false,
        Some(FlexibleFlag::Bool(b)) => b,
        Some(FlexibleFlag::Int(i)) => i > 0,
        Some(FlexibleFlag::Object { flag }) => flag,
    })
}

/// Deserialize a timestamp that can be:
/// - an RFC 3339 string: `"2024-05-01T10:00:00Z"`
/// - a timestamp without offset, read as UTC: `"2024-05-01T10:00:00.5"`
/// - epoch milliseconds: `1714557600000` (number or numeric string)
/// - epoch seconds: `1714557600`
pub fn deserialize_flexible_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum FlexibleTimestamp {
        Int(i64),
        String(String),
    }

    let value: Option<FlexibleTimestamp> = Option::deserialize(deserializer)?;

    let epoch = match value {
        None => return Ok(None),
        Some(FlexibleTimestamp::Int(i)) => i,
        Some(FlexibleTimestamp::String(s)) => {
            let s = s.trim();
            if s.is_empty() {
                return Ok(None);
            }
            if let Ok(parsed) = DateTime::parse_from_rfc3339(s) {
                return Ok(Some(parsed.with_timezone(&Utc)));
            }
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
                return Ok(Some(naive.and_utc()));
            }
            s.parse()
                .map_err(|_| de::Error::custom(format!("invalid timestamp: {}", s)))?
        }
    };

    // In seconds this would be past the year 5000, so it is milliseconds
    let parsed = if epoch.abs() >= 100_000_000_000 {
        DateTime::from_timestamp_millis(epoch)
    } else {
        DateTime::from_timestamp(epoch, 0)
    };
    parsed
        .map(Some)
        .ok_or_else(|| de::Error::custom(format!("timestamp out of range: {}", epoch)))
}
