//! Type definitions shared by the marketplace client and the pricing layer
//!
//! This module contains the product model and the flexible deserializers used
//! to read the listing API.

pub mod product;
pub mod serde_helpers;

pub use product::{Adjustment, Product};
