//! Product model and price adjustment rule

use super::serde_helpers::{
    PriceAmount, deserialize_flexible_price, deserialize_flexible_timestamp, deserialize_reserved_flag,
};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Status assigned to listings flagged as reserved
pub const RESERVED_STATUS: &str = "reserved";

/// One of the user's listings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Product {
    /// Listing identifier
    pub id: String,
    /// Listing title
    pub name: String,
    /// Current price
    pub price: f64,
    /// Price currency
    pub currency: String,
    /// Listing status as reported by the API
    pub status: Option<String>,
    /// Whether the listing is reserved for a buyer
    pub reserved: bool,
    /// Last modification reported by the API
    pub last_modified: Option<DateTime<Utc>>,
}

/// Listing entry as the API sends it
#[derive(Debug, Deserialize)]
struct ApiItem {
    #[serde(default)]
    id: serde_json::Value,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_flexible_price")]
    price: Option<PriceAmount>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default, deserialize_with = "deserialize_reserved_flag")]
    reserved: bool,
    #[serde(default, deserialize_with = "deserialize_flexible_timestamp")]
    modified_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "deserialize_flexible_timestamp")]
    updated_at: Option<DateTime<Utc>>,
}

impl Product {
    /// Normalize one listing entry
    ///
    /// `default_currency` applies when neither the price nor the item names one.
    pub fn from_api_item(item: serde_json::Value, default_currency: &str) -> Result<Self> {
        let item: ApiItem = serde_json::from_value(item)?;

        let id = match item.id {
            serde_json::Value::String(id) if !id.trim().is_empty() => id,
            serde_json::Value::Number(id) => id.to_string(),
            other => return Err(Error::internal(format!("listing without usable id: {}", other))),
        };

        let (price, price_currency) = item
            .price
            .map(|p| (p.amount, p.currency))
            .unwrap_or((0.0, None));
        let currency = price_currency
            .or(item.currency)
            .unwrap_or_else(|| default_currency.to_string());

        let status = if item.reserved {
            Some(RESERVED_STATUS.to_string())
        } else {
            item.status
        };

        Ok(Self {
            id,
            name: item.title.or(item.name).unwrap_or_default(),
            price,
            currency,
            status,
            reserved: item.reserved,
            last_modified: item.modified_date.or(item.updated_at),
        })
    }

    /// Whether the listing has been sold
    pub fn is_sold(&self) -> bool {
        self.status
            .as_deref()
            .is_some_and(|status| status.eq_ignore_ascii_case("sold"))
    }
}

/// How a product's price changes on each run
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Adjustment {
    /// Leave the price alone
    #[default]
    Keep,
    /// Multiply the price by this factor
    Multiplier(f64),
}

impl Adjustment {
    /// Build a multiplier, rejecting non-positive or non-finite factors
    pub fn multiplier(factor: f64) -> Result<Self> {
        if factor.is_finite() && factor > 0.0 {
            Ok(Self::Multiplier(factor))
        } else {
            Err(Error::catalog(format!("adjustment must be a positive number, got {}", factor)))
        }
    }

    /// Whether this is the no-op adjustment
    pub fn is_keep(&self) -> bool {
        matches!(self, Self::Keep)
    }
}

impl fmt::Display for Adjustment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Keep => f.write_str("keep"),
            Self::Multiplier(factor) => write!(f, "{}", factor),
        }
    }
}

impl FromStr for Adjustment {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("keep") {
            return Ok(Self::Keep);
        }
        let factor: f64 = s
            .parse()
            .map_err(|_| Error::catalog(format!("invalid adjustment: {}", s)))?;
        Self::multiplier(factor)
    }
}

impl Serialize for Adjustment {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Keep => serializer.serialize_str("keep"),
            Self::Multiplier(factor) => serializer.serialize_f64(*factor),
        }
    }
}

impl<'de> Deserialize<'de> for Adjustment {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Number(f64),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Number(factor) => Self::multiplier(factor).map_err(serde::de::Error::custom),
            Repr::Text(text) => text.parse().map_err(serde::de::Error::custom),
        }
    }
}
