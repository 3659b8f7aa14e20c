// Couche HTTP mince : extraction des paramètres, délégation à la passerelle, mise en forme des réponses.
use crate::app_state::AppState;
use crate::error::GatewayError;
use crate::gateway::validate_search;
use crate::models::{
    current_timestamp, ApiEndpoints, ApiInfo, ApiResponse, DetailedHealth, HealthStatus,
    Pagination, RateLimitStatus, ServiceHealth, SimplifiedProduct, SystemInfo,
};
use axum::{
    extract::{Path, Query, State},
    http::{Method, Uri},
    routing::{delete, get},
    Json, Router,
};
use serde::Deserialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

const DEFAULT_PAGE: u32 = 1;
const DEFAULT_LIMIT: u32 = 20;

// Construit le routeur complet du service.
pub fn router(state: AppState) -> Router {
    let barcode_routes = Router::new()
        .route("/health", get(barcode_health_handler))
        .route("/rate-limits", get(rate_limits_handler))
        .route("/product/{barcode}", get(product_handler))
        .route("/search", get(search_handler))
        .route("/cache", delete(clear_cache_handler));

    Router::new()
        .route("/health", get(health_check))
        .route("/health/detailed", get(detailed_health_check))
        .route("/api/v1", get(api_info_handler))
        .nest("/api/v1/barcode", barcode_routes)
        .fallback(not_found_handler)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

// Handler pour GET `/health` : état de santé du processus.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "success",
        message: "Barcode gateway is healthy".to_string(),
        timestamp: current_timestamp(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        version: env!("CARGO_PKG_VERSION"),
    })
}

// Handler pour GET `/health/detailed` : ajoute l'état du processus.
pub async fn detailed_health_check(State(state): State<AppState>) -> Json<DetailedHealth> {
    info!("Detailed health check requested");

    Json(DetailedHealth {
        status: "success",
        message: "Detailed health check".to_string(),
        timestamp: current_timestamp(),
        system: SystemInfo {
            uptime_secs: state.started_at.elapsed().as_secs(),
            platform: std::env::consts::OS,
            arch: std::env::consts::ARCH,
            pid: std::process::id(),
            cache_entries: state.gateway.cache().len().await,
        },
        version: env!("CARGO_PKG_VERSION"),
    })
}

// Handler pour GET `/api/v1` : points d'entrée de l'API.
pub async fn api_info_handler() -> Json<ApiInfo> {
    Json(ApiInfo {
        message: "Barcode gateway API v1",
        status: "success",
        timestamp: current_timestamp(),
        endpoints: ApiEndpoints {
            barcode: "/api/v1/barcode",
            health: "/health",
        },
    })
}

// Toute route inconnue reçoit l'enveloppe d'erreur habituelle.
pub async fn not_found_handler(method: Method, uri: Uri) -> GatewayError {
    warn!("Route not found: {} {}", method, uri);
    GatewayError::RouteNotFound {
        method: method.to_string(),
        path: uri.to_string(),
    }
}

// Handler pour GET `/api/v1/barcode/health` : état du service produit et de ses quotas.
pub async fn barcode_health_handler(
    State(state): State<AppState>,
) -> Json<ApiResponse<ServiceHealth>> {
    let rate_limits = state.gateway.rate_limit_status().await;
    Json(ApiResponse::success(
        "Barcode service is healthy",
        ServiceHealth {
            service: "OpenFoodFacts",
            rate_limits,
        },
    ))
}

// Handler pour GET `/api/v1/barcode/rate-limits`.
pub async fn rate_limits_handler(
    State(state): State<AppState>,
) -> Json<ApiResponse<RateLimitStatus>> {
    Json(ApiResponse::success(
        "Rate limit status retrieved successfully",
        state.gateway.rate_limit_status().await,
    ))
}

// Handler pour GET `/api/v1/barcode/product/{barcode}`.
pub async fn product_handler(
    State(state): State<AppState>,
    Path(barcode): Path<String>,
) -> Result<Json<ApiResponse<SimplifiedProduct>>, GatewayError> {
    info!("Product lookup requested for barcode: {}", barcode);

    let product = state.gateway.lookup_by_barcode(&barcode).await?;

    info!(
        "Product found for barcode {}: {}",
        barcode,
        product.name.as_deref().unwrap_or("Unknown name")
    );
    Ok(Json(ApiResponse::success(
        "Product found successfully",
        product,
    )))
}

// Paramètres bruts : l'analyse est faite ici pour renvoyer nos propres erreurs 400.
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

// Handler pour GET `/api/v1/barcode/search?q=..&page=..&limit=..`.
pub async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<ApiResponse<Vec<SimplifiedProduct>>>, GatewayError> {
    let query = params.q.unwrap_or_default();
    let page = parse_number(params.page.as_deref(), DEFAULT_PAGE, "Invalid page parameter")?;
    let limit = parse_number(
        params.limit.as_deref(),
        DEFAULT_LIMIT,
        "Invalid limit parameter (must be between 1 and 100)",
    )?;
    validate_search(&query, page, limit)?;

    info!("Product search requested for query: {:?}", query);

    let results = state.gateway.search_products(&query, page, limit).await?;

    info!(
        "Product search completed for query {:?}: {} results returned",
        query,
        results.products.len()
    );

    let pagination = Pagination::new(page, limit, results.total_count);
    Ok(Json(
        ApiResponse::success(
            format!("Found {} products", results.total_count),
            results.products,
        )
        .with_pagination(pagination),
    ))
}

// Handler pour DELETE `/api/v1/barcode/cache` : vide le cache des réponses.
pub async fn clear_cache_handler(State(state): State<AppState>) -> Json<ApiResponse<()>> {
    state.gateway.clear_cache().await;
    Json(ApiResponse::message_only("Cache cleared successfully"))
}

fn parse_number(raw: Option<&str>, default: u32, message: &str) -> Result<u32, GatewayError> {
    match raw {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| GatewayError::InvalidInput(message.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number(None, 20, "bad").unwrap(), 20);
        assert_eq!(parse_number(Some(" 3 "), 20, "bad").unwrap(), 3);
        assert!(matches!(
            parse_number(Some("-1"), 20, "bad"),
            Err(GatewayError::InvalidInput(msg)) if msg == "bad"
        ));
        assert!(parse_number(Some("abc"), 20, "bad").is_err());
    }
}
