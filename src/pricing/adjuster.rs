//! Price adjustment rules

use super::catalog::Catalog;
use crate::Result;
use crate::types::{Adjustment, Product};
use chrono::{Duration, Utc};
use tracing::{debug, info};

/// Something that can change a listing's price
#[async_trait::async_trait]
pub trait PriceUpdater: Send + Sync {
    /// Set the price of `product_id` to `new_price`
    async fn update_price(&self, product_id: &str, new_price: f64) -> Result<()>;
}

/// What happened to one product during a run
#[derive(Debug, Clone, PartialEq)]
pub enum AdjustOutcome {
    /// The price was changed
    Updated { old_price: f64, new_price: f64 },
    /// The product's rule is `keep`
    Kept,
    /// The delay since the last change has not elapsed
    NotDue,
    /// The rule produced the same price
    Unchanged,
    /// The product is not in the catalog
    NotTracked,
}

/// Apply `adjustment` to `price`
///
/// Multipliers round to cents and never go below `minimum_price`.
pub fn calculate_new_price(price: f64, adjustment: Adjustment, minimum_price: f64) -> f64 {
    match adjustment {
        Adjustment::Keep => price,
        Adjustment::Multiplier(factor) => {
            let rounded = (price * factor * 100.0).round() / 100.0;
            rounded.max(minimum_price)
        }
    }
}

/// Applies catalog rules to listings
#[derive(Debug)]
pub struct PriceAdjuster<'a> {
    catalog: &'a mut Catalog,
    minimum_price: f64,
}

impl<'a> PriceAdjuster<'a> {
    /// Create an adjuster over `catalog`
    pub fn new(catalog: &'a mut Catalog, minimum_price: f64) -> Self {
        Self {
            catalog,
            minimum_price,
        }
    }

    /// New price for `price` under `adjustment`
    pub fn calculate_new_price(&self, price: f64, adjustment: Adjustment) -> f64 {
        calculate_new_price(price, adjustment, self.minimum_price)
    }

    /// Whether enough time has passed since the product was last adjusted
    pub fn should_update_price(&self, product_id: &str) -> bool {
        let delay_days = self.catalog.delay_days();
        if delay_days == 0 {
            return true;
        }
        let Some(last_modified) = self.catalog.product(product_id).and_then(|p| p.last_modified) else {
            return true;
        };
        Utc::now().signed_duration_since(last_modified) >= Duration::days(i64::from(delay_days))
    }

    /// Adjust one listing through `updater` and record the result
    pub async fn adjust_product(&mut self, product: &Product, updater: &dyn PriceUpdater) -> Result<AdjustOutcome> {
        let Some(config) = self.catalog.product(&product.id) else {
            return Ok(AdjustOutcome::NotTracked);
        };
        let adjustment = config.adjustment;

        if adjustment.is_keep() {
            return Ok(AdjustOutcome::Kept);
        }
        if !self.should_update_price(&product.id) {
            debug!("{}: adjusted less than {} days ago", product.name, self.catalog.delay_days());
            return Ok(AdjustOutcome::NotDue);
        }

        let new_price = self.calculate_new_price(product.price, adjustment);
        if (new_price - product.price).abs() < f64::EPSILON {
            return Ok(AdjustOutcome::Unchanged);
        }

        updater.update_price(&product.id, new_price).await?;
        self.catalog.record_price(&product.id, new_price, Utc::now())?;
        info!("{}: {:.2} -> {:.2}", product.name, product.price, new_price);

        Ok(AdjustOutcome::Updated {
            old_price: product.price,
            new_price,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingUpdater {
        calls: Mutex<Vec<(String, f64)>>,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl PriceUpdater for RecordingUpdater {
        async fn update_price(&self, product_id: &str, new_price: f64) -> Result<()> {
            if self.fail {
                return Err(Error::api(500, "update rejected"));
            }
            self.calls.lock().unwrap().push((product_id.to_string(), new_price));
            Ok(())
        }
    }

    fn product(id: &str, price: f64) -> Product {
        Product {
            id: id.to_string(),
            name: format!("Product {}", id),
            price,
            currency: "EUR".to_string(),
            status: None,
            reserved: false,
            last_modified: None,
        }
    }

    fn catalog_with(id: &str, price: f64, adjustment: Adjustment) -> Catalog {
        let mut catalog = Catalog::new("unused.json");
        catalog.update_products(&[product(id, price)]);
        catalog.set_adjustment(id, adjustment).unwrap();
        catalog
    }

    #[test]
    fn test_calculate_new_price() {
        assert_eq!(calculate_new_price(10.0, Adjustment::Keep, 1.0), 10.0);
        assert_eq!(calculate_new_price(10.0, Adjustment::Multiplier(1.1), 1.0), 11.0);
        assert_eq!(calculate_new_price(10.01, Adjustment::Multiplier(1.005), 1.0), 10.06);
        assert_eq!(calculate_new_price(1.2, Adjustment::Multiplier(0.5), 1.0), 1.0);
        // Keep never applies the floor
        assert_eq!(calculate_new_price(0.5, Adjustment::Keep, 1.0), 0.5);
    }

    #[test]
    fn test_should_update_price() {
        let mut catalog = catalog_with("p1", 10.0, Adjustment::Keep);
        catalog.update_products(&[product("p2", 10.0)]);
        catalog.record_price("p1", 10.0, Utc::now()).unwrap();
        catalog.record_price("p2", 10.0, Utc::now() - Duration::days(2)).unwrap();

        let adjuster = PriceAdjuster::new(&mut catalog, 1.0);
        assert!(!adjuster.should_update_price("p1"));
        assert!(adjuster.should_update_price("p2"));
        assert!(adjuster.should_update_price("never-adjusted"));
    }

    #[test]
    fn test_zero_delay_always_updates() {
        let mut catalog = catalog_with("p1", 10.0, Adjustment::Keep);
        catalog.record_price("p1", 10.0, Utc::now()).unwrap();
        catalog.set_delay_days(0);

        assert!(PriceAdjuster::new(&mut catalog, 1.0).should_update_price("p1"));
    }

    #[tokio::test]
    async fn test_adjust_product_updates_and_records() {
        let mut catalog = catalog_with("p1", 20.0, Adjustment::Multiplier(0.9));
        let updater = RecordingUpdater::default();

        let outcome = PriceAdjuster::new(&mut catalog, 1.0)
            .adjust_product(&product("p1", 20.0), &updater)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            AdjustOutcome::Updated {
                old_price: 20.0,
                new_price: 18.0
            }
        );
        assert_eq!(*updater.calls.lock().unwrap(), vec![("p1".to_string(), 18.0)]);
        let config = catalog.product("p1").unwrap();
        assert_eq!(config.current_price, 18.0);
        assert!(config.last_modified.is_some());
    }

    #[tokio::test]
    async fn test_adjust_product_skips() {
        let updater = RecordingUpdater::default();

        let mut keep = catalog_with("p1", 20.0, Adjustment::Keep);
        let outcome = PriceAdjuster::new(&mut keep, 1.0)
            .adjust_product(&product("p1", 20.0), &updater)
            .await
            .unwrap();
        assert_eq!(outcome, AdjustOutcome::Kept);

        let mut recent = catalog_with("p1", 20.0, Adjustment::Multiplier(0.9));
        recent.record_price("p1", 20.0, Utc::now()).unwrap();
        let outcome = PriceAdjuster::new(&mut recent, 1.0)
            .adjust_product(&product("p1", 20.0), &updater)
            .await
            .unwrap();
        assert_eq!(outcome, AdjustOutcome::NotDue);

        let mut floored = catalog_with("p1", 1.0, Adjustment::Multiplier(0.5));
        let outcome = PriceAdjuster::new(&mut floored, 1.0)
            .adjust_product(&product("p1", 1.0), &updater)
            .await
            .unwrap();
        assert_eq!(outcome, AdjustOutcome::Unchanged);

        let mut empty = Catalog::new("unused.json");
        let outcome = PriceAdjuster::new(&mut empty, 1.0)
            .adjust_product(&product("p1", 1.0), &updater)
            .await
            .unwrap();
        assert_eq!(outcome, AdjustOutcome::NotTracked);

        assert!(updater.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_update_is_not_recorded() {
        let mut catalog = catalog_with("p1", 20.0, Adjustment::Multiplier(0.9));
        let updater = RecordingUpdater {
            fail: true,
            ..Default::default()
        };

        let result = PriceAdjuster::new(&mut catalog, 1.0)
            .adjust_product(&product("p1", 20.0), &updater)
            .await;

        assert!(result.is_err());
        assert!(catalog.product("p1").unwrap().last_modified.is_none());
    }
}
