//! Listing and price update calls

use crate::pricing::PriceUpdater;
use crate::session::{RequestOptions, SessionManager};
use crate::session::network::join_url;
use crate::types::Product;
use crate::{Error, Result};
use reqwest::{Method, Response, StatusCode};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Accept header the upload endpoints expect for edits
const UPLOAD_ACCEPT: &str = "application/vnd.upload-v2+json";

/// Longest response excerpt carried in an error
const ERROR_EXCERPT_LEN: usize = 200;

/// Client for the user's listings
#[derive(Debug, Clone)]
pub struct MarketplaceClient {
    session: Arc<SessionManager>,
}

impl MarketplaceClient {
    /// Create a client on top of an authenticated session
    pub fn new(session: Arc<SessionManager>) -> Self {
        Self { session }
    }

    /// The underlying session
    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    fn api_url(&self, path: &str) -> String {
        join_url(&self.session.settings().backend.api_url, path)
    }

    fn base_options(&self) -> Result<RequestOptions> {
        let referer = format!("{}/", self.session.settings().backend.web_url.trim_end_matches('/'));
        RequestOptions::new()
            .with_header("X-DeviceOS", "0")?
            .with_header("Referer", &referer)
    }

    /// Authenticated call; a 401 that survived the refresh ends the session
    async fn call(&self, method: Method, url: &str, options: RequestOptions) -> Result<Response> {
        let response = self.session.authenticated_request(method, url, options).await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            warn!("Credential rejected after refresh for {}; clearing session", url);
            if let Err(e) = self.session.reset().await {
                warn!("Failed to clear session: {}", e);
            }
            return Err(Error::authentication_expired(url));
        }
        Ok(response)
    }

    /// All of the user's listings
    pub async fn list_products(&self) -> Result<Vec<Product>> {
        let url = self.api_url(&self.session.settings().backend.items_path);
        let response = ensure_success(self.call(Method::GET, &url, self.base_options()?).await?).await?;
        let body: Value = response.json().await?;

        let items = match body {
            Value::Array(items) => items,
            Value::Object(mut object) => match object.remove("items").or_else(|| object.remove("data")) {
                Some(Value::Array(items)) => items,
                _ => Vec::new(),
            },
            _ => Vec::new(),
        };

        let currency = &self.session.settings().pricing.currency;
        let mut products = Vec::with_capacity(items.len());
        for item in items {
            match Product::from_api_item(item, currency) {
                Ok(product) => products.push(product),
                Err(e) => warn!("Skipping unreadable listing: {}", e),
            }
        }
        debug!("Fetched {} listings", products.len());
        Ok(products)
    }

    /// Listing in edit format
    pub async fn product_details(&self, product_id: &str) -> Result<Value> {
        let url = self.api_url(&format!("/api/v3/items/{}/edit", product_id));
        let options = self.base_options()?.with_query("language", "es");
        let response = ensure_success(self.call(Method::GET, &url, options).await?).await?;
        Ok(response.json().await?)
    }

    /// Change the price of one listing
    pub async fn update_price(&self, product_id: &str, new_price: f64) -> Result<()> {
        let details = self.product_details(product_id).await?;
        let category = details
            .get("taxonomy")
            .and_then(Value::as_array)
            .and_then(|taxonomy| taxonomy.last())
            .and_then(|leaf| leaf.get("id"))
            .cloned()
            .unwrap_or(Value::Null);

        let payload = json!({
            "category_leaf_id": category,
            "price": {
                "cash_amount": new_price,
                "currency": self.session.settings().pricing.currency,
                "apply_discount": false,
            },
        });

        let url = self.api_url(&format!("/api/v3/items/{}", product_id));
        let options = self
            .base_options()?
            .with_header("Accept", UPLOAD_ACCEPT)?
            .with_json(payload);
        ensure_success(self.call(Method::PUT, &url, options).await?).await?;

        info!("Updated price of {} to {:.2}", product_id, new_price);
        Ok(())
    }
}

#[async_trait::async_trait]
impl PriceUpdater for MarketplaceClient {
    async fn update_price(&self, product_id: &str, new_price: f64) -> Result<()> {
        MarketplaceClient::update_price(self, product_id, new_price).await
    }
}

/// Turn a non-2xx response into an API error carrying a body excerpt
async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let excerpt: String = body.chars().take(ERROR_EXCERPT_LEN).collect();
    Err(Error::api(status.as_u16(), excerpt))
}
