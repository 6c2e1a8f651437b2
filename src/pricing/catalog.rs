//! Product configuration store
//!
//! A JSON file mapping listing ids to their adjustment rule, the last price
//! applied and when it was applied, plus global scheduling settings.

use crate::types::serde_helpers::deserialize_flexible_timestamp;
use crate::types::{Adjustment, Product};
use crate::utils::fs::write_atomic;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Days between two adjustments of the same product, unless configured
pub const DEFAULT_DELAY_DAYS: u32 = 1;

/// Per-product configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductConfig {
    /// Listing title, refreshed from the API
    pub name: String,
    /// Rule applied on each run
    #[serde(default)]
    pub adjustment: Adjustment,
    /// When the price was last changed by an adjustment
    #[serde(default, deserialize_with = "deserialize_flexible_timestamp")]
    pub last_modified: Option<DateTime<Utc>>,
    /// Last known price
    #[serde(default)]
    pub current_price: f64,
}

/// Global scheduling settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogSettings {
    /// Minimum days between two adjustments of one product; 0 adjusts on every run
    #[serde(default = "default_delay_days")]
    pub delay_days: u32,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            delay_days: DEFAULT_DELAY_DAYS,
        }
    }
}

fn default_delay_days() -> u32 {
    DEFAULT_DELAY_DAYS
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    products: BTreeMap<String, ProductConfig>,
    #[serde(default)]
    settings: CatalogSettings,
}

/// The product configuration file and its in-memory contents
#[derive(Debug, Clone)]
pub struct Catalog {
    path: PathBuf,
    data: CatalogFile,
}

impl Catalog {
    /// Empty catalog that will be written to `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            data: CatalogFile::default(),
        }
    }

    /// Read the catalog; a missing file yields an empty one
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No product configuration at {:?}; starting empty", path);
                return Ok(Self::new(path));
            }
            Err(e) => return Err(e.into()),
        };

        let data = serde_json::from_str(&raw)
            .map_err(|e| Error::catalog(format!("Invalid product configuration {:?}: {}", path, e)))?;
        Ok(Self { path, data })
    }

    /// Write the catalog back atomically
    pub async fn save(&self) -> Result<()> {
        write_atomic(&self.path, &serde_json::to_vec_pretty(&self.data)?).await?;
        debug!("Product configuration saved to {:?}", self.path);
        Ok(())
    }

    /// File backing this catalog
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All tracked products keyed by listing id
    pub fn products(&self) -> &BTreeMap<String, ProductConfig> {
        &self.data.products
    }

    /// Configuration of one product
    pub fn product(&self, id: &str) -> Option<&ProductConfig> {
        self.data.products.get(id)
    }

    /// Track new listings and refresh names and prices of known ones
    ///
    /// New products start with [`Adjustment::Keep`]; existing adjustments are
    /// preserved. Returns the number of newly tracked products.
    pub fn update_products(&mut self, products: &[Product]) -> usize {
        let mut added = 0;
        for product in products {
            match self.data.products.get_mut(&product.id) {
                Some(config) => {
                    config.name = product.name.clone();
                    config.current_price = product.price;
                }
                None => {
                    self.data.products.insert(
                        product.id.clone(),
                        ProductConfig {
                            name: product.name.clone(),
                            adjustment: Adjustment::Keep,
                            last_modified: None,
                            current_price: product.price,
                        },
                    );
                    added += 1;
                }
            }
        }
        if added > 0 {
            info!("Tracking {} new products", added);
        }
        added
    }

    /// Drop products that no longer appear among the active listings
    ///
    /// Returns the names of the removed products.
    pub fn remove_sold_products(&mut self, active: &[Product]) -> Vec<String> {
        let active_ids: HashSet<&str> = active.iter().map(|p| p.id.as_str()).collect();
        let sold: Vec<String> = self
            .data
            .products
            .keys()
            .filter(|id| !active_ids.contains(id.as_str()))
            .cloned()
            .collect();

        sold.into_iter()
            .filter_map(|id| self.data.products.remove(&id))
            .map(|config| config.name)
            .collect()
    }

    /// Minimum days between adjustments
    pub fn delay_days(&self) -> u32 {
        self.data.settings.delay_days
    }

    /// Change the minimum days between adjustments
    pub fn set_delay_days(&mut self, days: u32) {
        self.data.settings.delay_days = days;
    }

    /// Change the rule of a tracked product
    pub fn set_adjustment(&mut self, id: &str, adjustment: Adjustment) -> Result<()> {
        let config = self
            .data
            .products
            .get_mut(id)
            .ok_or_else(|| Error::catalog(format!("unknown product {}", id)))?;
        config.adjustment = adjustment;
        Ok(())
    }

    /// Record an applied price change
    pub fn record_price(&mut self, id: &str, price: f64, at: DateTime<Utc>) -> Result<()> {
        let config = self
            .data
            .products
            .get_mut(id)
            .ok_or_else(|| Error::catalog(format!("unknown product {}", id)))?;
        config.current_price = price;
        config.last_modified = Some(at);
        Ok(())
    }
}
