//! Configuration, pricing rules and settings-form state for the special
//! discount.
//!
//! The discount function reads [`DiscountConfig`] from the discount's
//! metafield on every cart evaluation; the settings form writes it.

pub mod config;
pub mod rules;
pub mod settings;

pub use config::DiscountConfig;
