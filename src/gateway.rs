// Orchestrateur : normalisation -> cache -> quota -> appel amont -> transformation -> cache.
use crate::barcode;
use crate::cache::ResponseCache;
use crate::config::Config;
use crate::error::{GatewayError, Result, UpstreamCall, UpstreamError};
use crate::models::{RateLimitStatus, SearchResults, SimplifiedProduct};
use crate::rate_limiter::{Category, RateLimiter};
use crate::transform::transform_product;
use crate::upstream::{OpenFoodFactsClient, ProductSource};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

pub const MAX_PAGE_SIZE: u32 = 100;

pub struct LookupGateway {
    source: Arc<dyn ProductSource>,
    limiter: RateLimiter,
    cache: ResponseCache,
    upstream_timeout: Duration,
}

impl LookupGateway {
    pub fn new(
        source: Arc<dyn ProductSource>,
        limiter: RateLimiter,
        cache: ResponseCache,
        upstream_timeout: Duration,
    ) -> Self {
        Self {
            source,
            limiter,
            cache,
            upstream_timeout,
        }
    }

    // Construit la passerelle complète (client HTTP compris) à partir de la configuration.
    pub fn from_config(config: &Config) -> std::result::Result<Self, UpstreamError> {
        let client = OpenFoodFactsClient::new(
            config.upstream_base_url.clone(),
            &config.upstream_user_agent,
            config.upstream_timeout,
        )?;

        Ok(Self::new(
            Arc::new(client),
            RateLimiter::new(config.rate_limits),
            ResponseCache::new(config.cache_ttl, config.cache_sweep_threshold),
            config.upstream_timeout,
        ))
    }

    pub async fn lookup_by_barcode(&self, raw_barcode: &str) -> Result<SimplifiedProduct> {
        // --- Étape 1: Normalisation et validation ---
        let barcode = barcode::normalize(raw_barcode);
        if !barcode::is_valid(&barcode) {
            return Err(GatewayError::InvalidInput(format!(
                "Invalid barcode format: {}",
                raw_barcode
            )));
        }

        // --- Étape 2: Cache (un "cache hit" ne consomme pas de quota) ---
        if let Some(product) = self.cache.get(&barcode).await {
            debug!("Product found in cache: {}", barcode);
            return Ok(product);
        }

        // --- Étape 3: Quota local ---
        // Vérification et comptabilisation en une seule opération : un appel amont qui échoue
        // compte quand même contre le quota.
        self.acquire(Category::Product).await?;

        // --- Étape 4: Appel amont, borné dans le temps ---
        let envelope = self
            .bounded(self.source.fetch_product(&barcode))
            .await
            .map_err(|e| {
                error!("Error fetching product {}: {}", barcode, e);
                GatewayError::from_upstream(e, UpstreamCall::Product(&barcode))
            })?;

        let raw = envelope
            .into_product()
            .ok_or_else(|| GatewayError::NotFound(barcode.clone()))?;

        // --- Étape 5: Transformation et mise en cache ---
        let product = transform_product(&raw, &barcode);
        self.cache.put(barcode.clone(), product.clone()).await;

        info!("Product retrieved successfully: {}", barcode);
        Ok(product)
    }

    // Les paramètres de pagination sont supposés déjà validés (voir `validate_search`).
    pub async fn search_products(
        &self,
        query: &str,
        page: u32,
        page_size: u32,
    ) -> Result<SearchResults> {
        self.acquire(Category::Search).await?;

        let envelope = self
            .bounded(self.source.search(query, page, page_size))
            .await
            .map_err(|e| {
                error!("Error searching products with query {:?}: {}", query, e);
                GatewayError::from_upstream(e, UpstreamCall::Search)
            })?;

        // Un enregistrement sans code-barres ne peut pas être consulté ensuite : on l'écarte.
        let products = envelope
            .products
            .iter()
            .filter_map(|raw| raw.text("code").map(|code| transform_product(raw, code)))
            .collect();

        Ok(SearchResults {
            products,
            total_count: envelope.count.unwrap_or(0),
        })
    }

    pub async fn rate_limit_status(&self) -> RateLimitStatus {
        self.limiter.status().await
    }

    pub async fn clear_cache(&self) {
        self.cache.clear().await;
        info!("OpenFoodFacts cache cleared");
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    async fn acquire(&self, category: Category) -> Result<()> {
        self.limiter
            .try_acquire(category)
            .await
            .map_err(|retry_after| GatewayError::RateLimited {
                category: category.as_str(),
                retry_after,
            })
    }

    // Au-delà du délai, l'appel est abandonné et traité comme une indisponibilité.
    async fn bounded<T, F>(&self, call: F) -> std::result::Result<T, UpstreamError>
    where
        F: Future<Output = std::result::Result<T, UpstreamError>>,
    {
        tokio::time::timeout(self.upstream_timeout, call)
            .await
            .unwrap_or(Err(UpstreamError::Timeout))
    }
}

// Validation à la frontière HTTP : requête non vide, `page >= 1`, `1 <= page_size <= 100`.
pub fn validate_search(query: &str, page: u32, page_size: u32) -> Result<()> {
    if query.trim().is_empty() {
        return Err(GatewayError::InvalidInput(
            "Query parameter is required".to_string(),
        ));
    }
    if page < 1 {
        return Err(GatewayError::InvalidInput(
            "Invalid page parameter".to_string(),
        ));
    }
    if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
        return Err(GatewayError::InvalidInput(format!(
            "Invalid limit parameter (must be between 1 and {})",
            MAX_PAGE_SIZE
        )));
    }
    Ok(())
}
