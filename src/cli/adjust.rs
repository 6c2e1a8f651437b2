//! `run`: adjust the prices of all tracked listings

use crate::market::MarketplaceClient;
use crate::pricing::{AdjustOutcome, Catalog, PriceAdjuster, PriceUpdater};
use crate::session::SessionManager;
use crate::{Error, Settings};
use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

/// Counters reported at the end of a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Listings that got a new price
    pub updated: usize,
    /// Listings left alone (keep rule, delay, reserved, unchanged price)
    pub skipped: usize,
    /// Listings whose update failed
    pub failed: usize,
    /// Catalog entries dropped because the listing is gone
    pub removed: Vec<String>,
    /// Listings tracked for the first time
    pub added: usize,
}

/// Updater that only reports what it would do
#[derive(Debug)]
struct DryRunUpdater;

#[async_trait::async_trait]
impl PriceUpdater for DryRunUpdater {
    async fn update_price(&self, product_id: &str, new_price: f64) -> crate::Result<()> {
        println!("[dry run] would set {} to {:.2}", product_id, new_price);
        Ok(())
    }
}

/// Run one adjustment pass
pub async fn run_adjust(settings: Settings, dry_run: bool) -> Result<RunSummary> {
    let minimum_price = settings.pricing.minimum_price;
    let products_file = settings.products_file_path();

    let manager = Arc::new(SessionManager::new(settings)?);
    if !manager.restore().await {
        return Err(Error::unauthenticated("no saved session; run `login` first").into());
    }
    let client = MarketplaceClient::new(Arc::clone(&manager));

    let listings = client.list_products().await?;
    let active: Vec<_> = listings.into_iter().filter(|p| !p.is_sold()).collect();
    info!("{} active listings", active.len());

    let mut catalog = Catalog::load(&products_file).await?;
    let mut summary = RunSummary {
        removed: catalog.remove_sold_products(&active),
        added: catalog.update_products(&active),
        ..RunSummary::default()
    };
    for name in &summary.removed {
        println!("Removed sold listing: {}", name);
    }

    let updater: &dyn PriceUpdater = if dry_run { &DryRunUpdater } else { &client };
    let mut adjuster = PriceAdjuster::new(&mut catalog, minimum_price);
    let mut aborted = None;

    for product in &active {
        if product.reserved {
            summary.skipped += 1;
            continue;
        }
        match adjuster.adjust_product(product, updater).await {
            Ok(AdjustOutcome::Updated { old_price, new_price }) => {
                println!("{}: {:.2} -> {:.2} {}", product.name, old_price, new_price, product.currency);
                summary.updated += 1;
            }
            Ok(_) => summary.skipped += 1,
            Err(e @ Error::AuthenticationExpired { .. }) => {
                aborted = Some(e);
                break;
            }
            Err(e) => {
                warn!("Failed to update {}: {}", product.name, e);
                summary.failed += 1;
            }
        }
    }

    // Updates applied before an abort are persisted
    if dry_run {
        println!("Dry run: product configuration not saved.");
    } else {
        catalog.save().await?;
    }
    if let Some(e) = aborted {
        return Err(e.into());
    }

    println!(
        "Updated {}, skipped {}, failed {}, new {}, removed {}.",
        summary.updated,
        summary.skipped,
        summary.failed,
        summary.added,
        summary.removed.len()
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::cookies::{CSRF_TOKEN, SESSION_TOKEN};
    use crate::types::Adjustment;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::collections::HashMap;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn prepared(server: &MockServer, dir: &TempDir) -> Settings {
        let mut settings = Settings::default();
        settings.backend.web_url = server.uri();
        settings.backend.api_url = server.uri();
        settings.session.dir = dir.path().to_path_buf();

        let manager = SessionManager::new(settings.clone()).unwrap();
        let raw: HashMap<String, String> = [(SESSION_TOKEN, "s"), (CSRF_TOKEN, "c")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        manager.load_from_cookie_mapping(&raw).await.unwrap();
        manager.save().await.unwrap();

        Mock::given(method("GET"))
            .and(path("/api/auth/federated-session"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "TOKEN"})))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v3/user/items"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": [
                {"id": "a", "title": "Bike", "price": 100.0},
                {"id": "b", "title": "Lamp", "price": 20.0, "reserved": {"flag": true}},
                {"id": "c", "title": "Sold", "price": 5.0, "status": "sold"}
            ]})))
            .mount(server)
            .await;
        settings
    }

    #[tokio::test]
    async fn test_run_without_session_fails() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        let mut settings = Settings::default();
        settings.session.dir = dir.path().to_path_buf();
        settings.backend.web_url = server.uri();

        let err = run_adjust(settings, false).await.unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::Unauthenticated(_))));
    }

    #[tokio::test]
    async fn test_first_run_tracks_products_with_keep() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        let settings = prepared(&server, &dir).await;

        let summary = run_adjust(settings.clone(), false).await.unwrap();

        assert_eq!(summary.added, 2);
        assert_eq!(summary.updated, 0);
        let catalog = Catalog::load(settings.products_file_path()).await.unwrap();
        assert_eq!(catalog.products().len(), 2);
        assert_eq!(catalog.product("a").unwrap().adjustment, Adjustment::Keep);
        assert!(catalog.product("c").is_none());
    }

    #[tokio::test]
    async fn test_run_updates_configured_products() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        let settings = prepared(&server, &dir).await;
        Mock::given(method("GET"))
            .and(path("/api/v3/items/a/edit"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"taxonomy": [{"id": "1"}]})))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/api/v3/items/a"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        run_adjust(settings.clone(), false).await.unwrap();
        let mut catalog = Catalog::load(settings.products_file_path()).await.unwrap();
        catalog.set_adjustment("a", Adjustment::Multiplier(0.9)).unwrap();
        catalog.set_adjustment("b", Adjustment::Multiplier(0.9)).unwrap();
        catalog.save().await.unwrap();

        let summary = run_adjust(settings.clone(), false).await.unwrap();

        assert_eq!(summary.updated, 1);
        assert_eq!(summary.skipped, 1);
        let catalog = Catalog::load(settings.products_file_path()).await.unwrap();
        assert_eq!(catalog.product("a").unwrap().current_price, 90.0);
        assert!(catalog.product("a").unwrap().last_modified.is_some());
    }

    #[tokio::test]
    async fn test_expired_session_keeps_applied_prices() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        let settings = prepared(&server, &dir).await;
        Mock::given(method("GET"))
            .and(path("/api/v3/user/items"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": [
                {"id": "a", "title": "Bike", "price": 100.0},
                {"id": "d", "title": "Desk", "price": 50.0}
            ]})))
            .with_priority(1)
            .mount(&server)
            .await;
        for id in ["a", "d"] {
            Mock::given(method("GET"))
                .and(path(format!("/api/v3/items/{}/edit", id)))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({"taxonomy": [{"id": "1"}]})))
                .mount(&server)
                .await;
        }
        Mock::given(method("PUT"))
            .and(path("/api/v3/items/a"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/api/v3/items/d"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        run_adjust(settings.clone(), false).await.unwrap();
        let mut catalog = Catalog::load(settings.products_file_path()).await.unwrap();
        catalog.set_adjustment("a", Adjustment::Multiplier(0.9)).unwrap();
        catalog.set_adjustment("d", Adjustment::Multiplier(0.9)).unwrap();
        catalog.save().await.unwrap();

        let err = run_adjust(settings.clone(), false).await.unwrap_err();

        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::AuthenticationExpired { .. })
        ));
        let catalog = Catalog::load(settings.products_file_path()).await.unwrap();
        let bike = catalog.product("a").unwrap();
        assert_eq!(bike.current_price, 90.0);
        assert!(bike.last_modified.is_some());
        assert!(catalog.product("d").unwrap().last_modified.is_none());
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        let settings = prepared(&server, &dir).await;

        let summary = run_adjust(settings.clone(), true).await.unwrap();

        assert_eq!(summary.added, 2);
        assert!(!settings.products_file_path().exists());
    }
}
