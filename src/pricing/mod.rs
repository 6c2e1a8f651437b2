//! Price adjustment and the product configuration store

pub mod adjuster;
pub mod catalog;

pub use adjuster::{AdjustOutcome, PriceAdjuster, PriceUpdater, calculate_new_price};
pub use catalog::{Catalog, ProductConfig};
