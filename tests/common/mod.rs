//! Shared helpers: an in-memory `ProductSource` and gateway builders.

#![allow(dead_code)]

use async_trait::async_trait;
use barcode_gateway::cache::ResponseCache;
use barcode_gateway::models::{ProductEnvelope, SearchEnvelope};
use barcode_gateway::rate_limiter::{Limit, RateLimiter, RateLimits};
use barcode_gateway::upstream::ProductSource;
use barcode_gateway::{LookupGateway, UpstreamError};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type ProductHandler = Box<dyn Fn(&str) -> Result<ProductEnvelope, UpstreamError> + Send + Sync>;
type SearchHandler =
    Box<dyn Fn(&str, u32, u32) -> Result<SearchEnvelope, UpstreamError> + Send + Sync>;

pub struct FakeSource {
    product: ProductHandler,
    search: SearchHandler,
    delay: Option<Duration>,
    product_calls: AtomicUsize,
    search_calls: AtomicUsize,
    requested: Mutex<Vec<String>>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self {
            product: Box::new(|_| Ok(envelope(serde_json::json!({"status": 0})))),
            search: Box::new(|_, _, _| Ok(SearchEnvelope::default())),
            delay: None,
            product_calls: AtomicUsize::new(0),
            search_calls: AtomicUsize::new(0),
            requested: Mutex::new(Vec::new()),
        }
    }

    pub fn with_product<F>(mut self, handler: F) -> Self
    where
        F: Fn(&str) -> Result<ProductEnvelope, UpstreamError> + Send + Sync + 'static,
    {
        self.product = Box::new(handler);
        self
    }

    pub fn with_search<F>(mut self, handler: F) -> Self
    where
        F: Fn(&str, u32, u32) -> Result<SearchEnvelope, UpstreamError> + Send + Sync + 'static,
    {
        self.search = Box::new(handler);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn product_calls(&self) -> usize {
        self.product_calls.load(Ordering::SeqCst)
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProductSource for FakeSource {
    async fn fetch_product(&self, barcode: &str) -> Result<ProductEnvelope, UpstreamError> {
        self.product_calls.fetch_add(1, Ordering::SeqCst);
        self.requested.lock().unwrap().push(barcode.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.product)(barcode)
    }

    async fn search(
        &self,
        query: &str,
        page: u32,
        page_size: u32,
    ) -> Result<SearchEnvelope, UpstreamError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.search)(query, page, page_size)
    }
}

pub fn envelope(value: Value) -> ProductEnvelope {
    serde_json::from_value(value).unwrap()
}

pub fn search_envelope(value: Value) -> SearchEnvelope {
    serde_json::from_value(value).unwrap()
}

pub fn found(product: Value) -> ProductEnvelope {
    envelope(serde_json::json!({"status": 1, "product": product}))
}

pub fn test_limits() -> RateLimits {
    RateLimits {
        product: Limit {
            max_requests: 3,
            window: Duration::from_secs(60),
        },
        search: Limit {
            max_requests: 2,
            window: Duration::from_secs(60),
        },
        facet: Limit::per_minute(2),
    }
}

pub fn gateway_with(source: Arc<FakeSource>) -> LookupGateway {
    LookupGateway::new(
        source,
        RateLimiter::new(test_limits()),
        ResponseCache::default(),
        Duration::from_secs(10),
    )
}
