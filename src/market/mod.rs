//! Market Layer
//!
//! Catalog lookup, price fetching and quote formatting.

pub mod catalog;
pub mod client;
pub mod quote;

pub use catalog::{Catalog, CatalogEntry};
pub use client::{MarketClient, MarketError, OrderBook, PriceSource};
pub use quote::{format_price_line, PriceQuote};

/// An item that made it through every stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedItem {
    /// Resolved text, as looked up in the catalog
    pub text: String,
    pub entry: CatalogEntry,
    pub quote: PriceQuote,
}

impl PricedItem {
    /// Console line for this item
    pub fn display_line(&self) -> String {
        format_price_line(&self.text, &self.quote, self.entry.vaulted)
    }
}
