// Client de la base produits OpenFoodFacts.
use crate::error::UpstreamError;
use crate::models::{ProductEnvelope, SearchEnvelope};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use std::time::Duration;
use tracing::{debug, error};

// Champs demandés à l'API produit : exactement ceux que lit la transformation.
pub const PRODUCT_FIELDS: &[&str] = &[
    "product_name",
    "brands",
    "image_front_url",
    "categories_tags",
    "ingredients_text",
    "allergens_tags",
    "nutrition_grades",
    "nova_group",
    "ecoscore_grade",
    "ecoscore_score",
    "nutriments",
    "nutriscore_data",
    "nutriscore_grade",
    "nutriscore_score",
];

pub const DEFAULT_BASE_URL: &str = "https://world.openfoodfacts.org";
pub const DEFAULT_USER_AGENT: &str =
    "BarcodeGateway/0.1.0 - food scanning backend";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[async_trait]
pub trait ProductSource: Send + Sync {
    async fn fetch_product(&self, barcode: &str) -> Result<ProductEnvelope, UpstreamError>;

    // Recherche plein texte, `page` commence à 1.
    async fn search(
        &self,
        query: &str,
        page: u32,
        page_size: u32,
    ) -> Result<SearchEnvelope, UpstreamError>;
}

pub struct OpenFoodFactsClient {
    base_url: String,
    client: reqwest::Client,
}

impl OpenFoodFactsClient {
    pub fn new(
        base_url: impl Into<String>,
        user_agent: &str,
        timeout: Duration,
    ) -> Result<Self, UpstreamError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(user_agent)
                .map_err(|e| UpstreamError::Transport(format!("invalid user agent: {}", e)))?,
        );

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, UpstreamError> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| {
                error!("OpenFoodFacts API call failed: {}: {}", url, e);
                UpstreamError::from(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            error!("OpenFoodFacts API call failed: {} (status {})", url, status);
            return Err(UpstreamError::Status(status.as_u16()));
        }

        debug!("OpenFoodFacts API call successful: {}", url);

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| UpstreamError::Decode(e.to_string()))
    }
}

#[async_trait]
impl ProductSource for OpenFoodFactsClient {
    async fn fetch_product(&self, barcode: &str) -> Result<ProductEnvelope, UpstreamError> {
        self.get_json(
            &format!("/api/v2/product/{}", barcode),
            &[("fields", PRODUCT_FIELDS.join(","))],
        )
        .await
    }

    async fn search(
        &self,
        query: &str,
        page: u32,
        page_size: u32,
    ) -> Result<SearchEnvelope, UpstreamError> {
        self.get_json(
            "/api/v2/search",
            &[
                ("search_terms", query.to_string()),
                ("page", page.to_string()),
                ("page_size", page_size.to_string()),
            ],
        )
        .await
    }
}
