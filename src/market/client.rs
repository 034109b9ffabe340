//! Market HTTP client
//!
//! Loads the item catalog and fetches order prices. Requests run on a
//! private tokio runtime so callers stay synchronous.

use reqwest::header::{HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tokio::runtime::Runtime;
use tracing::{debug, info};

use super::catalog::{Catalog, CatalogEntry};
use crate::config::MarketSettings;

/// Market lookup failures
#[derive(Debug, Error)]
pub enum MarketError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },
    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Invalid market settings: {0}")]
    Config(String),
    #[error("Failed to start async runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

/// Unordered order prices for one item
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderBook {
    pub sell: Vec<u32>,
    pub buy: Vec<u32>,
}

/// Anything that can price an item by slug
pub trait PriceSource: Send {
    fn fetch_orders(&self, slug: &str) -> Result<OrderBook, MarketError>;
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    payload: T,
}

#[derive(Debug, Deserialize)]
struct ItemsPayload {
    items: Vec<ItemRecord>,
}

#[derive(Debug, Deserialize)]
struct ItemRecord {
    url_name: String,
    item_name: String,
    #[serde(default)]
    vaulted: bool,
}

#[derive(Debug, Deserialize)]
struct OrdersPayload {
    orders: Vec<OrderRecord>,
}

#[derive(Debug, Deserialize)]
struct OrderRecord {
    platinum: f64,
    order_type: String,
    #[serde(default = "default_visible")]
    visible: bool,
    #[serde(default)]
    user: Option<OrderUser>,
}

#[derive(Debug, Deserialize)]
struct OrderUser {
    status: String,
}

fn default_visible() -> bool {
    true
}

/// Client for the market REST API
pub struct MarketClient {
    runtime: Runtime,
    http: reqwest::Client,
    base_url: String,
    online_only: bool,
}

impl MarketClient {
    pub fn new(settings: &MarketSettings) -> Result<Self, MarketError> {
        let mut headers = HeaderMap::new();
        headers.insert("Platform", header_value(&settings.platform)?);
        headers.insert("Language", header_value(&settings.language)?);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        Ok(Self {
            runtime,
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            online_only: settings.online_only,
        })
    }

    /// Download the full item listing
    pub fn fetch_catalog(&self) -> Result<Catalog, MarketError> {
        let url = format!("{}/items", self.base_url);
        let body = self.get_text(&url)?;
        let catalog = parse_catalog(&body)?;
        info!("Loaded {} catalog items", catalog.len());
        Ok(catalog)
    }

    fn get_text(&self, url: &str) -> Result<String, MarketError> {
        debug!("GET {}", url);
        self.runtime.block_on(async {
            let response = self.http.get(url).send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(MarketError::Status {
                    url: url.to_string(),
                    status: status.as_u16(),
                });
            }
            Ok::<_, MarketError>(response.text().await?)
        })
    }
}

impl PriceSource for MarketClient {
    fn fetch_orders(&self, slug: &str) -> Result<OrderBook, MarketError> {
        let url = format!("{}/items/{}/orders", self.base_url, slug);
        let body = self.get_text(&url)?;
        parse_orders(&body, self.online_only)
    }
}

fn header_value(value: &str) -> Result<HeaderValue, MarketError> {
    HeaderValue::from_str(value).map_err(|e| MarketError::Config(format!("{:?}: {}", value, e)))
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, MarketError> {
    let envelope: Envelope<T> = serde_json::from_str(body)?;
    Ok(envelope.payload)
}

fn parse_catalog(body: &str) -> Result<Catalog, MarketError> {
    let payload: ItemsPayload = decode(body)?;
    Ok(Catalog::from_entries(payload.items.into_iter().map(|item| {
        (
            item.item_name,
            CatalogEntry {
                slug: item.url_name,
                vaulted: item.vaulted,
            },
        )
    })))
}

fn parse_orders(body: &str, online_only: bool) -> Result<OrderBook, MarketError> {
    let payload: OrdersPayload = decode(body)?;
    let mut book = OrderBook::default();

    for order in payload.orders {
        if !order.visible {
            continue;
        }
        if online_only && order.user.as_ref().map(|u| u.status.as_str()) != Some("ingame") {
            continue;
        }
        let price = order.platinum.round().max(0.0) as u32;
        match order.order_type.as_str() {
            "sell" => book.sell.push(price),
            "buy" => book.buy.push(price),
            _ => {}
        }
    }

    Ok(book)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ITEMS: &str = r#"{"payload":{"items":[
        {"id":"1","url_name":"braton_prime_barrel","item_name":"Braton Prime Barrel","thumb":"a.png"},
        {"id":"2","url_name":"ash_prime_systems_blueprint","item_name":"Ash Prime Systems Blueprint","vaulted":true}
    ]}}"#;

    const ORDERS: &str = r#"{"payload":{"orders":[
        {"platinum":12,"order_type":"sell","visible":true,"user":{"status":"ingame"}},
        {"platinum":9,"order_type":"sell","visible":true,"user":{"status":"offline"}},
        {"platinum":15,"order_type":"sell","visible":false,"user":{"status":"ingame"}},
        {"platinum":7.0,"order_type":"buy","visible":true,"user":{"status":"ingame"}},
        {"platinum":6,"order_type":"buy","user":{"status":"online"}}
    ]}}"#;

    #[test]
    fn test_parse_catalog() {
        let catalog = parse_catalog(ITEMS).unwrap();

        assert_eq!(catalog.len(), 2);
        let entry = catalog.lookup("braton prime barrel").unwrap();
        assert_eq!(entry.slug, "braton_prime_barrel");
        assert!(!entry.vaulted);
        assert!(catalog.lookup("ash prime systems blueprint").unwrap().vaulted);
    }

    #[test]
    fn test_parse_orders_online_only() {
        let book = parse_orders(ORDERS, true).unwrap();

        assert_eq!(book.sell, vec![12]);
        assert_eq!(book.buy, vec![7]);
    }

    #[test]
    fn test_parse_orders_all_users() {
        let book = parse_orders(ORDERS, false).unwrap();

        assert_eq!(book.sell, vec![12, 9]);
        assert_eq!(book.buy, vec![7, 6]);
    }

    #[test]
    fn test_malformed_payload_is_decode_error() {
        let err = parse_orders(r#"{"payload":{"orders":"nope"}}"#, true).unwrap_err();
        assert!(matches!(err, MarketError::Decode(_)));

        let err = parse_catalog("<html>").unwrap_err();
        assert!(matches!(err, MarketError::Decode(_)));
    }

    #[test]
    fn test_invalid_header_is_config_error() {
        let settings = MarketSettings {
            platform: "pc\n".to_string(),
            ..Default::default()
        };

        assert!(matches!(MarketClient::new(&settings), Err(MarketError::Config(_))));
    }

    #[test]
    fn test_unreachable_host_is_http_error() {
        let settings = MarketSettings {
            base_url: "http://127.0.0.1:9/v1/".to_string(),
            request_timeout_secs: 2,
            ..Default::default()
        };
        let client = MarketClient::new(&settings).unwrap();

        assert!(matches!(client.fetch_orders("forma_blueprint"), Err(MarketError::Http(_))));
    }
}
