//! Marketplace API client
//!
//! Every call goes through the session's authenticated request wrapper.

pub mod client;

pub use client::MarketplaceClient;
