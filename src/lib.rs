//! Wallapop Auto Adjust
//!
//! Automated price adjustment for Wallapop listings. The interesting part is
//! the session subsystem: long-lived identity cookies are normalized and
//! persisted, exchanged for short-lived bearer tokens through a cascade of
//! fallback strategies, and every API call is retried once after a fresh
//! token when the backend answers 401.
//!
//! # Architecture
//!
//! - [`session`]: cookie jar, token cascade, request wrapper, persistence
//! - [`market`]: listing and price update calls on top of the session
//! - [`pricing`]: adjustment rules and the product configuration store
//! - [`cli`]: the `wallapop-adjust` subcommands
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use wallapop_auto_adjust::{MarketplaceClient, SessionManager, Settings};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let manager = Arc::new(SessionManager::new(Settings::default())?);
//! if manager.restore().await {
//!     let client = MarketplaceClient::new(manager);
//!     for product in client.list_products().await? {
//!         println!("{}: {:.2}", product.name, product.price);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod market;
pub mod pricing;
pub mod session;
pub mod types;
pub mod utils;

pub use config::Settings;
pub use error::{Error, FailureStage, Result};
pub use market::MarketplaceClient;
pub use session::SessionManager;
pub use types::{Adjustment, Product};
